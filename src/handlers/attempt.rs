// src/handlers/attempt.rs

use axum::{
    Extension, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::attempt::{AttemptListParams, StartAttemptRequest, SubmitAttemptRequest},
    services::attempts::AttemptService,
    utils::jwt::Claims,
};

/// Starts a new attempt for the caller.
pub async fn start_attempt(
    State(service): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<StartAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = claims.user_id()?;
    let attempt = service.start_attempt(user_id, payload.quiz_id).await?;

    Ok((StatusCode::CREATED, Json(attempt)))
}

/// Submits answers for an in-progress attempt.
/// Only the attempt's owner (or an admin) may submit.
pub async fn submit_attempt(
    State(service): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = service.get_attempt(id).await?;
    claims.ensure_owner_or_admin(attempt.user_id)?;

    let attempt = service.submit_attempt(id, payload.answer_sheet()).await?;

    Ok(Json(attempt))
}

pub async fn get_attempt(
    State(service): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let attempt = service.get_attempt(id).await?;
    claims.ensure_owner_or_admin(attempt.user_id)?;

    Ok(Json(attempt))
}

/// Lists attempts on a quiz, most recent first.
/// Defaults to the caller; another `user_id` requires admin.
pub async fn list_attempts(
    State(service): State<AttemptService>,
    Extension(claims): Extension<Claims>,
    Query(params): Query<AttemptListParams>,
) -> Result<impl IntoResponse, AppError> {
    let user_id = match params.user_id {
        Some(user_id) => {
            claims.ensure_owner_or_admin(user_id)?;
            user_id
        }
        None => claims.user_id()?,
    };

    let attempts = service.list_attempts(user_id, params.quiz_id).await?;

    Ok(Json(attempts))
}
