// src/models/attempt.rs

use std::{collections::HashMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{prelude::FromRow, types::Json};
use uuid::Uuid;

/// Submitted answers.
/// Key: Question ID (i64)
/// Value: every option the user selected for that question
pub type AnswerSheet = HashMap<i64, Vec<String>>;

/// Attempt lifecycle: `InProgress` moves exactly once to one of the two
/// terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    TimedOut,
}

impl AttemptStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AttemptStatus::InProgress => "in_progress",
            AttemptStatus::Completed => "completed",
            AttemptStatus::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for AttemptStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttemptStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in_progress" => Ok(AttemptStatus::InProgress),
            "completed" => Ok(AttemptStatus::Completed),
            "timed_out" => Ok(AttemptStatus::TimedOut),
            other => Err(format!("unknown attempt status '{}'", other)),
        }
    }
}

/// One timed, scored run of a user through a quiz.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub user_id: i64,
    pub quiz_id: i64,

    /// 1-based, counted per (user, quiz).
    pub attempt_number: i32,

    /// Percentage 0-100. Stays 0 until the attempt is scored.
    pub score: f64,
    pub is_passed: bool,
    pub status: AttemptStatus,
    pub answers: AnswerSheet,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl QuizAttempt {
    /// A fresh attempt, numbered after `previous_attempts`.
    pub fn begin(user_id: i64, quiz_id: i64, previous_attempts: i64, start_time: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            quiz_id,
            attempt_number: i32::try_from(previous_attempts + 1).unwrap_or(i32::MAX),
            score: 0.0,
            is_passed: false,
            status: AttemptStatus::InProgress,
            answers: AnswerSheet::new(),
            start_time,
            end_time: None,
        }
    }
}

/// Represents a row of the 'quiz_attempts' table.
#[derive(Debug, FromRow)]
pub struct AttemptRow {
    pub id: Uuid,
    pub user_id: i64,
    pub quiz_id: i64,
    pub attempt_number: i32,
    pub score: f64,
    pub is_passed: bool,
    pub status: String,
    pub answers: Json<AnswerSheet>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
}

impl TryFrom<AttemptRow> for QuizAttempt {
    type Error = String;

    fn try_from(row: AttemptRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            user_id: row.user_id,
            quiz_id: row.quiz_id,
            attempt_number: row.attempt_number,
            score: row.score,
            is_passed: row.is_passed,
            status: row.status.parse()?,
            answers: row.answers.0,
            start_time: row.start_time,
            end_time: row.end_time,
        })
    }
}

/// DTO for starting an attempt. The user comes from the token.
#[derive(Debug, Deserialize)]
pub struct StartAttemptRequest {
    pub quiz_id: i64,
}

/// DTO for submitting an attempt.
/// Keys are question ids as JSON object keys; anything else is accepted
/// here and dropped by `answer_sheet`.
#[derive(Debug, Deserialize)]
pub struct SubmitAttemptRequest {
    #[serde(default)]
    pub answers: HashMap<String, Vec<String>>,
}

impl SubmitAttemptRequest {
    /// Answers keyed by question id. Keys that are not ids cannot match a
    /// question, so they are ignored like any other unknown question.
    pub fn answer_sheet(self) -> AnswerSheet {
        self.answers
            .into_iter()
            .filter_map(|(key, picked)| key.trim().parse::<i64>().ok().map(|id| (id, picked)))
            .collect()
    }
}

/// Query parameters for listing attempts.
#[derive(Debug, Deserialize)]
pub struct AttemptListParams {
    pub quiz_id: i64,
    /// Only admins may list someone else's attempts.
    pub user_id: Option<i64>,
}
