use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures a caller of the URL service can observe.
///
/// Raw `sqlx::Error`s never leave the service layer: they are logged where
/// they happen and collapsed into `Persistence` or `Renumbering`.
#[derive(Debug, Error)]
pub enum AppError {
    /// Malformed or unreachable input URL.
    #[error("{0}")]
    Validation(String),

    #[error("Could not generate a unique code. Please try again.")]
    CodeExhaustion,

    #[error("Not found")]
    NotFound,

    /// Datastore failure; carries the message shown to the user.
    #[error("{0}")]
    Persistence(&'static str),

    #[error("Failed to renumber the remaining URLs")]
    Renumbering,
}

impl AppError {
    /// Log a datastore error and downgrade it to a generic `Persistence`.
    pub fn persistence(context: &str) -> impl FnOnce(sqlx::Error) -> AppError + '_ {
        Self::persistence_as(context, "Database error, please try again")
    }

    /// Like [`AppError::persistence`], with a caller-chosen user message.
    pub fn persistence_as<'a>(
        context: &'a str,
        message: &'static str,
    ) -> impl FnOnce(sqlx::Error) -> AppError + 'a {
        move |e| {
            tracing::error!("Database error while {}: {:?}", context, e);
            AppError::Persistence(message)
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::CodeExhaustion => StatusCode::SERVICE_UNAVAILABLE,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::Persistence(_) | AppError::Renumbering => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "success": false,
            "error": self.to_string(),
        }));

        (self.status(), body).into_response()
    }
}
