use crate::state::AppState;
use axum::Router;

pub mod engine;
pub mod handlers;
pub mod store;
pub mod types;

pub use engine::AnalyticsEngine;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::analytics_routes())
}
