// src/handlers/quiz.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    response::IntoResponse,
};

use crate::{error::AppError, models::quiz::PublicQuiz, store::QuizCatalog};

/// Returns a quiz for taking it. Answer keys are stripped.
pub async fn get_quiz(
    State(catalog): State<Arc<dyn QuizCatalog>>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, AppError> {
    let quiz = catalog
        .find_quiz(id)
        .await?
        .ok_or(AppError::NotFound(format!("Quiz {} not found", id)))?;

    Ok(Json(PublicQuiz::from(quiz)))
}
