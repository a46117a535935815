mod ai;
mod app;
mod auth;
mod config;
mod error;
mod jobs;
mod mailer;
mod media;
mod profile;
mod state;
mod storage;

use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "homefix=debug,axum=info,tower_http=info".to_string());
    let json_logs = std::env::var("LOG_FORMAT")
        .map(|v| v == "json")
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(env_filter).init();
    }

    let app_state = AppState::init().await?;

    sqlx::migrate!("./migrations").run(&app_state.db).await?;

    if app_state.config.return_debug_tokens {
        tracing::warn!("RETURN_DEBUG_TOKENS is enabled; raw tokens appear in API responses");
    }

    let app = app::build_app(app_state);
    app::serve(app).await
}
