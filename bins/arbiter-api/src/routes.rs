use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::handlers;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/languages", get(handlers::list_languages))
        .route("/metrics", get(handlers::metrics))
        .route("/run", post(handlers::run_code))
        .route("/test", post(handlers::run_test))
        .route("/evaluate", post(handlers::evaluate))
}
