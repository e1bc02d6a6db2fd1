// src/handlers/reward.rs

use axum::{Extension, Json, extract::State, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError,
    models::reward::UpdateProgressRequest,
    services::{badges::BadgeEvaluator, rewards::RewardService},
    utils::jwt::Claims,
};

/// Reports completed lessons/courses for the caller and returns the new
/// counters, the points earned and any badge awarded by this call.
pub async fn update_progress(
    State(service): State<RewardService>,
    Extension(claims): Extension<Claims>,
    Json(payload): Json<UpdateProgressRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let update = payload
        .into_update(claims.user_id()?)
        .map_err(AppError::BadRequest)?;

    let response = service.update_progress_and_award_badges(update).await?;

    Ok(Json(response))
}

/// Badges held by the caller.
pub async fn list_my_badges(
    State(badges): State<BadgeEvaluator>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let earned = badges.earned_badges(claims.user_id()?).await?;

    Ok(Json(earned))
}

/// All milestone badges, ordered by name.
pub async fn list_milestones(State(badges): State<BadgeEvaluator>) -> Result<impl IntoResponse, AppError> {
    let catalog = badges.catalog().await?;

    Ok(Json(catalog))
}
