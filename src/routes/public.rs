use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use validator::Validate;

use crate::dto::public_dto::{
    DraftRequest, LeaveResponse, NavigateRequest, SaveAnswerRequest, SaveAnswerResponse,
    ScoreRequest, StartQuizRequest, SubmitCodeRequest, SubmitCodeResponse,
};
use crate::models::answer::{is_answered, AnswerStatus};
use crate::models::question::validate_question_ids;
use crate::services::scoring_service::ScoringService;
use crate::AppState;

#[axum::debug_handler]
pub async fn start_quiz(
    State(state): State<AppState>,
    Json(req): Json<StartQuizRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let started = state
        .session_service
        .start(req.questions, req.test_duration_seconds)
        .await?;
    Ok((StatusCode::CREATED, Json(started)).into_response())
}

#[axum::debug_handler]
pub async fn get_status(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> crate::error::Result<Response> {
    let status = state.session_service.status(&token).await?;
    Ok(Json(status).into_response())
}

#[axum::debug_handler]
pub async fn save_draft(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<DraftRequest>,
) -> crate::error::Result<Response> {
    let status = state.session_service.edit_draft(&token, req.answer).await?;
    Ok(Json(status).into_response())
}

#[axum::debug_handler]
pub async fn save_answer(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<SaveAnswerRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let answered = is_answered(req.answer.as_ref());
    let saved = state
        .session_service
        .record_answer(&token, &req.question_id, req.answer)
        .await?;
    Ok(Json(SaveAnswerResponse {
        saved,
        question_id: req.question_id,
        status: if answered {
            AnswerStatus::Answered
        } else {
            AnswerStatus::NotAnswered
        },
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn navigate(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<NavigateRequest>,
) -> crate::error::Result<Response> {
    let status = state
        .session_service
        .navigate(&token, req.target_index)
        .await?;
    Ok(Json(status).into_response())
}

#[axum::debug_handler]
pub async fn submit_code(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(req): Json<SubmitCodeRequest>,
) -> crate::error::Result<Response> {
    req.validate()?;
    let (answer, judged) = state
        .session_service
        .submit_code(&token, &req.question_id, req.code, req.language)
        .await?;
    Ok(Json(SubmitCodeResponse {
        question_id: req.question_id,
        answer,
        judged,
    })
    .into_response())
}

#[axum::debug_handler]
pub async fn submit_quiz(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> crate::error::Result<Response> {
    let submission = state.session_service.submit(&token).await?;
    Ok(Json(submission).into_response())
}

#[axum::debug_handler]
pub async fn leave_quiz(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> crate::error::Result<Response> {
    let persisted = state.session_service.leave(&token).await?;
    Ok(Json(LeaveResponse { persisted }).into_response())
}

#[axum::debug_handler]
pub async fn get_result(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> crate::error::Result<Response> {
    let submission = state.session_service.result(&token).await?;
    Ok(Json(submission).into_response())
}

/// Scores a finished attempt without a live session, e.g. to rebuild a report.
#[axum::debug_handler]
pub async fn score_quiz(Json(req): Json<ScoreRequest>) -> crate::error::Result<Response> {
    req.validate()?;
    validate_question_ids(&req.questions)?;
    let result = ScoringService::score(&req.questions, &req.answers, req.time_taken);
    Ok(Json(result).into_response())
}
