use crate::{error::AppError, models::UrlMapping, AppState};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

#[derive(Deserialize)]
pub struct CreateUrlRequest {
    url: String,
}

/// GET /api/urls
pub async fn list_urls(State(state): State<Arc<AppState>>) -> Result<Json<Vec<UrlMapping>>, AppError> {
    Ok(Json(state.urls.list_all().await?))
}

/// POST /api/urls
pub async fn create_url(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateUrlRequest>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let mapping = state.urls.create(&req.url).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "data": mapping })),
    ))
}

/// DELETE /api/urls/:id
pub async fn delete_url(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Value>, AppError> {
    state.urls.delete(id).await?;
    Ok(Json(json!({ "success": true })))
}
