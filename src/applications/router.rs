use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use super::domain::{ApplicationId, Submitter};
use super::repository::{ApplicationRepository, EventPublisher, RepositoryError};
use super::service::{AnswerUpdate, ApplicationService, ApplicationServiceError};
use crate::applicants::ApplicantId;
use crate::programs::ProgramId;

/// Router builder exposing the applicant-facing intake endpoints.
pub fn application_router<R, P>(service: Arc<ApplicationService<R, P>>) -> Router
where
    R: ApplicationRepository + 'static,
    P: EventPublisher + 'static,
{
    Router::new()
        .route("/api/v1/programs", get(programs_handler::<R, P>))
        .route(
            "/api/v1/programs/:program_id/applicants/:applicant_id/progress",
            get(progress_handler::<R, P>),
        )
        .route(
            "/api/v1/programs/:program_id/applicants/:applicant_id/blocks/:block_id",
            put(update_block_handler::<R, P>),
        )
        .route(
            "/api/v1/programs/:program_id/applicants/:applicant_id/submit",
            post(submit_handler::<R, P>),
        )
        .route(
            "/api/v1/applications/:application_id",
            get(status_handler::<R, P>),
        )
        .with_state(service)
}

#[derive(Debug, Deserialize)]
pub(crate) struct BlockUpdateRequest {
    pub answers: Vec<AnswerUpdate>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct SubmitRequest {
    #[serde(default)]
    pub submitter: Option<Submitter>,
}

pub(crate) async fn programs_handler<R, P>(
    State(service): State<Arc<ApplicationService<R, P>>>,
) -> Response
where
    R: ApplicationRepository + 'static,
    P: EventPublisher + 'static,
{
    (StatusCode::OK, axum::Json(service.program_cards())).into_response()
}

pub(crate) async fn progress_handler<R, P>(
    State(service): State<Arc<ApplicationService<R, P>>>,
    Path((program_id, applicant_id)): Path<(ProgramId, ApplicantId)>,
) -> Response
where
    R: ApplicationRepository + 'static,
    P: EventPublisher + 'static,
{
    match service.progress(applicant_id, program_id, Utc::now()) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn update_block_handler<R, P>(
    State(service): State<Arc<ApplicationService<R, P>>>,
    Path((program_id, applicant_id, block_id)): Path<(ProgramId, ApplicantId, String)>,
    axum::Json(request): axum::Json<BlockUpdateRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    P: EventPublisher + 'static,
{
    match service.update_block_answers(
        applicant_id,
        program_id,
        &block_id,
        request.answers,
        Utc::now(),
    ) {
        Ok(outcome) if outcome.errors.is_empty() => {
            (StatusCode::OK, axum::Json(outcome)).into_response()
        }
        Ok(outcome) => (StatusCode::UNPROCESSABLE_ENTITY, axum::Json(outcome)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn submit_handler<R, P>(
    State(service): State<Arc<ApplicationService<R, P>>>,
    Path((program_id, applicant_id)): Path<(ProgramId, ApplicantId)>,
    axum::Json(request): axum::Json<SubmitRequest>,
) -> Response
where
    R: ApplicationRepository + 'static,
    P: EventPublisher + 'static,
{
    let submitter = request.submitter.unwrap_or(Submitter::Applicant);
    match service.submit(applicant_id, program_id, submitter, Utc::now()) {
        Ok(receipt) => (StatusCode::CREATED, axum::Json(receipt)).into_response(),
        Err(error) => error_response(error),
    }
}

pub(crate) async fn status_handler<R, P>(
    State(service): State<Arc<ApplicationService<R, P>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    P: EventPublisher + 'static,
{
    match service.status(&ApplicationId(application_id)) {
        Ok(view) => (StatusCode::OK, axum::Json(view)).into_response(),
        Err(error) => error_response(error),
    }
}

fn error_response(error: ApplicationServiceError) -> Response {
    let status = match &error {
        ApplicationServiceError::UnknownProgram(_)
        | ApplicationServiceError::UnknownBlock(_)
        | ApplicationServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        ApplicationServiceError::NoDraft
        | ApplicationServiceError::Incomplete { .. }
        | ApplicationServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
        ApplicationServiceError::Repository(RepositoryError::Unavailable(_))
        | ApplicationServiceError::Event(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    let payload = json!({ "error": error.to_string() });
    (status, axum::Json(payload)).into_response()
}
