mod analytics;
mod app;
mod auth;
mod catalog;
mod config;
mod db;
mod error;
mod images;
mod jobs;
mod meals;
mod recommendations;
mod state;
mod storage;
mod users;
mod vlogs;
mod workouts;

#[cfg(test)]
mod testing;

use crate::config::AppConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "fittrack=debug,axum=info,tower_http=info".to_string());
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

    let config = AppConfig::from_env()?;
    let app_state = AppState::init(config).await?;
    db::migrate(&app_state.db).await?;

    jobs::spawn_daily_rollup(app_state.clone());

    let app = app::build_app(app_state);
    app::serve(app).await
}
