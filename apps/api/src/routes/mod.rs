pub mod health;

use axum::{
    routing::{get, post},
    Router,
};

use crate::matching::handlers;
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Matching API
        .route("/api/v1/jobs/match", post(handlers::handle_match_jobs))
        .route(
            "/api/v1/jobs/match/score",
            get(handlers::handle_score_pair),
        )
        .route(
            "/api/v1/jobs/match/criteria",
            post(handlers::handle_extract_criteria),
        )
        .with_state(state)
}
