use crate::{handlers, AppState};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(handlers::root))
        .route("/generate_solution", post(handlers::generate_solution))
        .route("/results/:run_id", get(handlers::get_result))
        .route("/runs", get(handlers::list_runs))
}
