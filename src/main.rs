use std::sync::Arc;
use std::time::Duration;

use dailylog_api::auth::rate_limit::RateLimitState;
use dailylog_api::config::Config;
use dailylog_api::db::{self, PgStore};
use dailylog_api::llm::ClaudeClient;
use dailylog_api::{app, AppState};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dailylog_api=debug,tower_http=debug".into()),
        )
        .json()
        .init();

    let config = Arc::new(Config::from_env());

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to run database migrations");

    tracing::info!("Database migrations applied");

    if config.claude_api_key.is_empty() {
        tracing::warn!("CLAUDE_API_KEY is empty, model calls will fail");
    }
    let model = ClaudeClient::new(&config).expect("Failed to build model client");

    let rate_limiter = RateLimitState::new();
    {
        let limiter = rate_limiter.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(Duration::from_secs(300));
            loop {
                ticker.tick().await;
                limiter.cleanup().await;
            }
        });
    }

    let state = AppState {
        store: Arc::new(PgStore::new(pool)),
        model: Arc::new(model),
        config: config.clone(),
        rate_limiter,
    };

    let addr = config.listen_addr();
    tracing::info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listen address");
    // Connect info gives the rate limiter the client IP
    axum::serve(
        listener,
        app(state).into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .expect("Server error");
}
