use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod db;
mod error;
mod handlers;
mod models;
mod probe;
mod service;
mod shortcode;

use probe::HttpProbe;
use service::UrlService;

// ── Shared application state ───────────────────────────────────────────────

pub struct AppState {
    pub config: config::AppConfig,
    pub urls: UrlService,
}

// ── Entry point ────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present; env vars may already be set
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "snip=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::AppConfig::from_env()?;
    tracing::info!("Starting snip on {}:{}", config.host, config.port);
    tracing::info!("Base URL: {}", config.base_url);
    tracing::info!(
        "Liveness timeout {:?}, stats failure policy {:?}",
        config.probe_timeout,
        config.stats_failure_policy
    );

    let db = db::connect(&config.database_url).await?;
    let probe = HttpProbe::new(config.probe_timeout)?;

    let bind_addr = format!("{}:{}", config.host, config.port);
    let state = Arc::new(AppState {
        urls: UrlService::new(db, Arc::new(probe)),
        config,
    });

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, router(state)).await?;

    Ok(())
}

// ── Router ─────────────────────────────────────────────────────────────────

pub fn router(state: Arc<AppState>) -> Router {
    let api_router = Router::new()
        .route(
            "/urls",
            get(handlers::api::list_urls).post(handlers::api::create_url),
        )
        .route("/urls/:id", axum::routing::delete(handlers::api::delete_url));

    Router::new()
        .route("/", get(handlers::web::index))
        .route("/health", get(|| async { axum::http::StatusCode::OK }))
        .route("/urls", post(handlers::web::create_url))
        .route("/urls/:id/delete", post(handlers::web::delete_url))
        .nest("/api", api_router)
        // Short-code redirect goes LAST so fixed paths take priority
        .route("/:code", get(handlers::redirect::redirect))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
