use crate::{error::AppError, models::MappingRow, AppState};
use askama::Template;
use axum::{
    extract::{Form, Path, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    CookieJar,
};
use serde::Deserialize;
use std::sync::Arc;

// ── Templates ──────────────────────────────────────────────────────────────

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    rows: Vec<MappingRow>,
    flash_success: Option<String>,
    flash_error: Option<String>,
    last_short_url: Option<String>,
}

#[derive(Deserialize)]
pub struct CreateUrlForm {
    url: String,
}

// ── Handlers ───────────────────────────────────────────────────────────────

/// GET /
/// Creation form plus the dashboard of every mapping.
pub async fn index(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    let flash_success = jar.get("flash_success").map(|c| c.value().to_owned());
    let flash_error = jar.get("flash_error").map(|c| c.value().to_owned());
    let last_short_url = jar.get("last_short_url").map(|c| c.value().to_owned());

    let mappings = match state.urls.list_all().await {
        Ok(m) => m,
        Err(_) => {
            return (StatusCode::INTERNAL_SERVER_ERROR, "Failed to load URLs").into_response();
        }
    };

    let tmpl = IndexTemplate {
        rows: mappings
            .into_iter()
            .map(|m| MappingRow::new(m, &state.config.base_url))
            .collect(),
        flash_success,
        flash_error,
        last_short_url,
    };

    let jar = jar
        .remove(Cookie::build("flash_success").path("/"))
        .remove(Cookie::build("flash_error").path("/"))
        .remove(Cookie::build("last_short_url").path("/"));

    (jar, tmpl).into_response()
}

/// POST /urls
pub async fn create_url(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<CreateUrlForm>,
) -> Response {
    match state.urls.create(&form.url).await {
        Ok(mapping) => {
            let short_url = format!("{}/{}", state.config.base_url, mapping.short);
            set_flash_and_redirect(
                jar.add(short_lived("last_short_url", short_url.clone())),
                Some(&format!("Short URL generated: {short_url}")),
                None,
            )
        }
        Err(e) => set_flash_and_redirect(jar, None, Some(&e.to_string())),
    }
}

/// POST /urls/:id/delete
pub async fn delete_url(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Path(id): Path<i64>,
) -> Response {
    match state.urls.delete(id).await {
        Ok(mapping) => set_flash_and_redirect(
            jar,
            Some(&format!("Deleted {} (ID {}).", mapping.short, mapping.id)),
            None,
        ),
        Err(e) => {
            if !matches!(e, AppError::NotFound) {
                tracing::error!("Delete of id {} failed: {}", id, e);
            }
            set_flash_and_redirect(jar, None, Some("Failed to delete URL"))
        }
    }
}

// ── Private helpers ────────────────────────────────────────────────────────

/// Set a flash cookie and redirect back to the dashboard.
fn set_flash_and_redirect(jar: CookieJar, success: Option<&str>, error: Option<&str>) -> Response {
    let mut jar = jar;

    for (name, msg) in [("flash_success", success), ("flash_error", error)] {
        if let Some(msg) = msg {
            jar = jar.add(short_lived(name, msg.to_owned()));
        }
    }

    (jar, Redirect::to("/")).into_response()
}

/// Cookie that survives one redirect back to the dashboard.
fn short_lived(name: &'static str, value: String) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(30))
        .build()
}
