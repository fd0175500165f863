use crate::state::AppState;
use axum::Router;

pub mod handlers;
pub mod scoring;
pub mod services;
pub mod store;
pub mod types;

pub use services::RecommendationService;

pub fn router() -> Router<AppState> {
    Router::new().merge(handlers::recommendation_routes())
}
