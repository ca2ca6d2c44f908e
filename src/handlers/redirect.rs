use crate::{config::StatsFailurePolicy, error::AppError, AppState};
use askama::Template;
use axum::{
    extract::{Path, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;

#[derive(Template)]
#[template(path = "not_found.html")]
struct NotFoundTemplate {
    code: String,
}

/// GET /:code
///
/// 1. Resolve the short code and count the visit.
/// 2. If the visit could not be recorded, apply the configured policy.
/// 3. Return a 307 redirect to the original URL.
pub async fn redirect(State(state): State<Arc<AppState>>, Path(code): Path<String>) -> Response {
    let resolved = match state.urls.resolve(&code).await {
        Ok(r) => r,
        Err(AppError::NotFound) => {
            return (StatusCode::NOT_FOUND, NotFoundTemplate { code }).into_response();
        }
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response();
        }
    };

    if !resolved.visit_recorded && state.config.stats_failure_policy == StatsFailurePolicy::Fail {
        return (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response();
    }

    // Hand-written rows may hold bytes a header can't carry.
    match HeaderValue::try_from(resolved.mapping.original.as_str()) {
        Ok(location) => {
            (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, location)]).into_response()
        }
        Err(_) => {
            tracing::error!(
                "Mapping '{}' holds a URL that can't be sent as Location: {:?}",
                code,
                resolved.mapping.original
            );
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal error").into_response()
        }
    }
}
