// src/store/mod.rs

//! Storage collaborators of the attempt and reward engines.
//!
//! Each concern is a small async trait so the services can run against
//! PostgreSQL in production and against `MemoryStore` in tests. Both
//! implementations enforce the same uniqueness constraints; a
//! `UniqueViolation` is how a lost check-then-write race becomes visible.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::{
    attempt::QuizAttempt,
    badge::{Badge, EarnedBadge},
    quiz::{CreateQuizRequest, QuizDefinition},
    reward::{ActivityType, ProgressDelta, RewardHistoryEntry},
    user::UserProgress,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(sqlx::Error),

    #[error("unique constraint violated: {0}")]
    UniqueViolation(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("corrupt row: {0}")]
    Decode(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let Some(db_err) = err.as_database_error() {
            if db_err.is_unique_violation() {
                return StoreError::UniqueViolation(db_err.message().to_string());
            }
            // A write pointing at a user or quiz row that does not exist.
            if db_err.is_foreign_key_violation() {
                let constraint = db_err.constraint().unwrap_or("foreign key");
                return StoreError::NotFound(format!("row referenced by {}", constraint));
            }
        }
        StoreError::Database(err)
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Read access to quiz definitions, plus admin authoring.
#[async_trait]
pub trait QuizCatalog: Send + Sync {
    async fn find_quiz(&self, quiz_id: i64) -> StoreResult<Option<QuizDefinition>>;

    async fn insert_quiz(&self, quiz: &CreateQuizRequest) -> StoreResult<QuizDefinition>;
}

#[async_trait]
pub trait AttemptStore: Send + Sync {
    async fn count_attempts(&self, user_id: i64, quiz_id: i64) -> StoreResult<i64>;

    /// Fails with `UniqueViolation` when the attempt number is already
    /// taken for this (user, quiz).
    async fn insert_attempt(&self, attempt: &QuizAttempt) -> StoreResult<()>;

    async fn find_attempt(&self, attempt_id: Uuid) -> StoreResult<Option<QuizAttempt>>;

    /// Most recent attempt first.
    async fn list_attempts(&self, user_id: i64, quiz_id: i64) -> StoreResult<Vec<QuizAttempt>>;

    /// Writes the terminal state of `attempt` only if the stored row is
    /// still in progress. Returns whether a row was written.
    async fn finish_attempt(&self, attempt: &QuizAttempt) -> StoreResult<bool>;
}

/// Record of activities that have already been paid out.
#[async_trait]
pub trait RewardLedger: Send + Sync {
    async fn has_awarded(
        &self,
        user_id: i64,
        activity_type: ActivityType,
        activity_id: &str,
    ) -> StoreResult<bool>;

    /// Inserts `entry` and applies `delta` to the user's counters as one
    /// unit. Returns `false` and writes nothing if the activity was
    /// already rewarded.
    async fn record_award(&self, entry: &RewardHistoryEntry, delta: &ProgressDelta) -> StoreResult<bool>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    async fn find_progress(&self, user_id: i64) -> StoreResult<Option<UserProgress>>;

    /// Adds `delta` to all three counters in one write. Fails with
    /// `NotFound` for an unknown user, leaving every counter untouched.
    async fn apply(&self, user_id: i64, delta: &ProgressDelta) -> StoreResult<()>;
}

#[async_trait]
pub trait BadgeStore: Send + Sync {
    async fn find_badge_by_key(&self, key: &str) -> StoreResult<Option<Badge>>;

    /// Fails with `UniqueViolation` if the key exists.
    async fn insert_badge(&self, badge: &Badge) -> StoreResult<()>;

    async fn update_badge_display(&self, badge: &Badge) -> StoreResult<()>;

    /// Badges whose key is in `keys`, ordered by name.
    async fn list_badges(&self, keys: &[String]) -> StoreResult<Vec<Badge>>;

    /// Badges held by the user, oldest award first.
    async fn earned_badges(&self, user_id: i64) -> StoreResult<Vec<EarnedBadge>>;

    /// Fails with `UniqueViolation` if the user already holds the badge.
    async fn insert_user_badge(
        &self,
        user_id: i64,
        badge_id: Uuid,
        awarded_at: DateTime<Utc>,
    ) -> StoreResult<()>;
}
