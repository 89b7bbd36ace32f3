use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

pub mod auth;
pub mod config;
pub mod db;
pub mod dto;
pub mod error;
pub mod handlers;
pub mod llm;
pub mod models;
pub mod services;

use auth::rate_limit::RateLimitState;
use config::Config;
use db::LogStore;
use llm::LanguageModel;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn LogStore>,
    pub model: Arc<dyn LanguageModel>,
    pub config: Arc<Config>,
    pub rate_limiter: RateLimitState,
}

fn cors_layer(config: &Config) -> CorsLayer {
    let mut origins = Vec::new();
    let configured = std::iter::once(&config.frontend_url).chain(&config.cors_extra_origins);
    for origin in configured.filter(|o| !o.is_empty()) {
        match origin.parse::<axum::http::HeaderValue>() {
            Ok(hv) => origins.push(hv),
            Err(_) => tracing::warn!(origin = %origin, "Ignoring invalid CORS origin"),
        }
    }

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::AUTHORIZATION,
            axum::http::header::CONTENT_TYPE,
            axum::http::header::ACCEPT,
        ])
        .allow_credentials(true)
}

pub fn app(state: AppState) -> Router {
    let chat_routes = Router::new()
        .route("/dailyLogChat", post(handlers::chat::daily_log_chat))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::rate_limit::rate_limit_chat,
        ));

    let public_routes = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/readyz", get(handlers::health::readyz));

    let protected_routes = Router::new()
        .route("/dailyLogs", get(handlers::daily_logs::list_daily_logs))
        .route(
            "/weeklyCards",
            post(handlers::cards::generate_weekly_cards).get(handlers::cards::get_weekly_cards),
        )
        .merge(chat_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::middleware::require_auth,
        ));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(cors_layer(&state.config))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
