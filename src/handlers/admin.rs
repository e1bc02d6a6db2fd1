// src/handlers/admin.rs

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{error::AppError, models::quiz::CreateQuizRequest, store::QuizCatalog};

/// Creates a quiz with its questions and answer keys.
/// Admin only. Returns the full definition, answer keys included.
pub async fn create_quiz(
    State(catalog): State<Arc<dyn QuizCatalog>>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;

    let quiz = catalog.insert_quiz(&payload).await?;
    tracing::info!(
        "Created quiz {} '{}' with {} questions",
        quiz.id,
        quiz.title,
        quiz.questions.len()
    );

    Ok((StatusCode::CREATED, Json(quiz)))
}
