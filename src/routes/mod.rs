pub mod health;
pub mod public;

use axum::{
    routing::{get, patch, post},
    Router,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::AppState;

pub fn create_router(state: AppState) -> Router {
    let quiz_api = Router::new()
        .route("/api/quiz/sessions", post(public::start_quiz))
        .route("/api/quiz/sessions/:token", get(public::get_status))
        .route("/api/quiz/sessions/:token/draft", patch(public::save_draft))
        .route("/api/quiz/sessions/:token/answer", patch(public::save_answer))
        .route("/api/quiz/sessions/:token/navigate", post(public::navigate))
        .route("/api/quiz/sessions/:token/code", post(public::submit_code))
        .route("/api/quiz/sessions/:token/submit", post(public::submit_quiz))
        .route("/api/quiz/sessions/:token/leave", post(public::leave_quiz))
        .route("/api/quiz/sessions/:token/result", get(public::get_result))
        .route("/api/quiz/score", post(public::score_quiz));

    Router::new()
        .route("/health", get(health::health))
        .merge(quiz_api)
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}
