// src/services/attempts.rs

use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::CoreError,
    models::attempt::{AnswerSheet, AttemptStatus, QuizAttempt},
    services::scoring::score_attempt,
    store::{AttemptStore, QuizCatalog, StoreError},
};

/// Starts, submits and reads quiz attempts.
#[derive(Clone)]
pub struct AttemptService {
    catalog: Arc<dyn QuizCatalog>,
    attempts: Arc<dyn AttemptStore>,
}

impl AttemptService {
    pub fn new(catalog: Arc<dyn QuizCatalog>, attempts: Arc<dyn AttemptStore>) -> Self {
        Self { catalog, attempts }
    }

    /// Opens a new attempt for the user, if the quiz still allows one.
    pub async fn start_attempt(&self, user_id: i64, quiz_id: i64) -> Result<QuizAttempt, CoreError> {
        let quiz = self
            .catalog
            .find_quiz(quiz_id)
            .await?
            .ok_or(CoreError::QuizNotFound(quiz_id))?;

        let previous = self.attempts.count_attempts(user_id, quiz_id).await?;
        if previous >= i64::from(quiz.max_attempts) {
            return Err(CoreError::AttemptLimitExceeded {
                max_attempts: quiz.max_attempts,
            });
        }

        let attempt = QuizAttempt::begin(user_id, quiz_id, previous, Utc::now());

        match self.attempts.insert_attempt(&attempt).await {
            Ok(()) => {}
            Err(StoreError::UniqueViolation(_)) => {
                // Another request took this attempt number first.
                let now_taken = self.attempts.count_attempts(user_id, quiz_id).await?;
                if now_taken >= i64::from(quiz.max_attempts) {
                    return Err(CoreError::AttemptLimitExceeded {
                        max_attempts: quiz.max_attempts,
                    });
                }
                return Err(CoreError::Conflict(
                    "Another attempt was started at the same time, please retry".to_string(),
                ));
            }
            Err(e) => return Err(e.into()),
        }

        tracing::info!(
            "User {} started attempt {} (#{}) on quiz {}",
            user_id,
            attempt.id,
            attempt.attempt_number,
            quiz_id
        );

        Ok(attempt)
    }

    /// Closes an in-progress attempt.
    ///
    /// Past the quiz's time limit the attempt is forfeit: it becomes
    /// `TimedOut` with score 0. Otherwise it is graded and `Completed`.
    pub async fn submit_attempt(
        &self,
        attempt_id: Uuid,
        answers: AnswerSheet,
    ) -> Result<QuizAttempt, CoreError> {
        let mut attempt = self.get_attempt(attempt_id).await?;

        if attempt.status != AttemptStatus::InProgress {
            return Err(CoreError::AlreadySubmitted);
        }

        let quiz = self
            .catalog
            .find_quiz(attempt.quiz_id)
            .await?
            .ok_or(CoreError::QuizNotFound(attempt.quiz_id))?;

        let now = Utc::now();
        let timed_out = quiz
            .time_limit()
            .is_some_and(|limit| now - attempt.start_time > limit);

        if timed_out {
            attempt.status = AttemptStatus::TimedOut;
            attempt.score = 0.0;
            attempt.is_passed = false;
        } else {
            let card = score_attempt(&quiz, &answers);
            attempt.status = AttemptStatus::Completed;
            attempt.score = card.score;
            attempt.is_passed = card.passed;
        }
        attempt.answers = answers;
        attempt.end_time = Some(now);

        if !self.attempts.finish_attempt(&attempt).await? {
            // A concurrent submit closed it between our read and write.
            return Err(CoreError::AlreadySubmitted);
        }

        if timed_out {
            tracing::info!("Attempt {} timed out on quiz {}", attempt.id, quiz.id);
        } else {
            tracing::info!(
                "Attempt {} completed on quiz {}: score {:.1}, passed {}",
                attempt.id,
                quiz.id,
                attempt.score,
                attempt.is_passed
            );
        }

        Ok(attempt)
    }

    /// Returns the attempt as stored. Does not evaluate the time limit.
    pub async fn get_attempt(&self, attempt_id: Uuid) -> Result<QuizAttempt, CoreError> {
        self.attempts
            .find_attempt(attempt_id)
            .await?
            .ok_or(CoreError::AttemptNotFound(attempt_id))
    }

    /// All attempts of the user on the quiz, most recent first.
    pub async fn list_attempts(&self, user_id: i64, quiz_id: i64) -> Result<Vec<QuizAttempt>, CoreError> {
        Ok(self.attempts.list_attempts(user_id, quiz_id).await?)
    }
}
