use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use crate::error::AppError;

use super::domain::{QuestionId, RawAnswer, UserId};
use super::service::QuestionnaireService;
use super::session::{QuestionnaireSession, SessionError, SessionView};

/// Header carrying the identity-provider user id.
pub const USER_HEADER: &str = "x-user-id";

#[derive(Debug, Deserialize)]
pub struct JumpRequest {
    pub step: usize,
}

/// Router exposing the questionnaire to the onboarding client.
pub fn questionnaire_router(service: Arc<QuestionnaireService>) -> Router {
    Router::new()
        .route("/api/v1/questionnaire/schema", get(schema_handler))
        .route("/api/v1/questionnaire/session", get(session_handler))
        .route(
            "/api/v1/questionnaire/answers/:question_id",
            put(answer_handler),
        )
        .route("/api/v1/questionnaire/next", post(next_handler))
        .route("/api/v1/questionnaire/prev", post(prev_handler))
        .route("/api/v1/questionnaire/jump", post(jump_handler))
        .route("/api/v1/questionnaire/submit", post(submit_handler))
        .route("/api/v1/questionnaire/reset", post(reset_handler))
        .with_state(service)
}

pub(crate) async fn schema_handler(State(service): State<Arc<QuestionnaireService>>) -> Response {
    let questions = service.schema().all_questions();
    (StatusCode::OK, Json(json!({ "questions": questions }))).into_response()
}

pub(crate) async fn session_handler(
    State(service): State<Arc<QuestionnaireService>>,
    headers: HeaderMap,
) -> Response {
    match session_for(&service, &headers) {
        Ok(session) => (StatusCode::OK, Json(session.view())).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn answer_handler(
    State(service): State<Arc<QuestionnaireService>>,
    headers: HeaderMap,
    Path(question_id): Path<String>,
    Json(answer): Json<RawAnswer>,
) -> Response {
    match session_for(&service, &headers) {
        Ok(session) => view_response(session.answer(QuestionId(question_id), answer)),
        Err(response) => response,
    }
}

pub(crate) async fn next_handler(
    State(service): State<Arc<QuestionnaireService>>,
    headers: HeaderMap,
) -> Response {
    match session_for(&service, &headers) {
        Ok(session) => view_response(session.next()),
        Err(response) => response,
    }
}

pub(crate) async fn prev_handler(
    State(service): State<Arc<QuestionnaireService>>,
    headers: HeaderMap,
) -> Response {
    match session_for(&service, &headers) {
        Ok(session) => view_response(session.prev()),
        Err(response) => response,
    }
}

pub(crate) async fn jump_handler(
    State(service): State<Arc<QuestionnaireService>>,
    headers: HeaderMap,
    Json(request): Json<JumpRequest>,
) -> Response {
    match session_for(&service, &headers) {
        Ok(session) => view_response(session.jump(request.step)),
        Err(response) => response,
    }
}

pub(crate) async fn reset_handler(
    State(service): State<Arc<QuestionnaireService>>,
    headers: HeaderMap,
) -> Response {
    match session_for(&service, &headers) {
        Ok(session) => view_response(session.reset()),
        Err(response) => response,
    }
}

pub(crate) async fn submit_handler(
    State(service): State<Arc<QuestionnaireService>>,
    headers: HeaderMap,
) -> Response {
    let session = match session_for(&service, &headers) {
        Ok(session) => session,
        Err(response) => return response,
    };

    match session.submit().await {
        Ok(submitted) => {
            let payload = json!({
                "state": session.state().label(),
                "normalized_profile": submitted.payload.normalized_profile,
                "reference": submitted.receipt.reference,
                "matches": submitted.receipt.matches,
            });
            (StatusCode::ACCEPTED, Json(payload)).into_response()
        }
        Err(error) => AppError::from(error).into_response(),
    }
}

fn session_for(
    service: &QuestionnaireService,
    headers: &HeaderMap,
) -> Result<Arc<QuestionnaireSession>, Response> {
    let user_id = current_user(headers).ok_or_else(|| {
        let payload = json!({
            "error": format!("missing `{USER_HEADER}` header"),
        });
        (StatusCode::UNAUTHORIZED, Json(payload)).into_response()
    })?;
    Ok(service.session(&user_id))
}

fn current_user(headers: &HeaderMap) -> Option<UserId> {
    headers
        .get(USER_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(|value| UserId(value.to_string()))
}

fn view_response(result: Result<SessionView, SessionError>) -> Response {
    match result {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => AppError::from(error).into_response(),
    }
}
