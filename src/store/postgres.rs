// src/store/postgres.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgExecutor, PgPool, types::Json};
use uuid::Uuid;

use crate::{
    config::DEFAULT_PASSING_SCORE,
    models::{
        attempt::{AttemptRow, AttemptStatus, QuizAttempt},
        badge::{Badge, EarnedBadge, EarnedBadgeRow},
        quiz::{CreateQuizRequest, QuizDefinition, QuizQuestion},
        reward::{ActivityType, ProgressDelta, RewardHistoryEntry},
        user::UserProgress,
    },
    store::{
        AttemptStore, BadgeStore, QuizCatalog, RewardLedger, StoreError, StoreResult, UserStore,
    },
};

/// PostgreSQL-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(FromRow)]
struct QuizRow {
    id: i64,
    title: String,
    description: Option<String>,
    passing_score: f64,
    time_limit_minutes: Option<i32>,
    max_attempts: i32,
}

#[derive(FromRow)]
struct QuestionRow {
    id: i64,
    content: String,
    options: Json<Vec<String>>,
    correct_answers: Json<Vec<String>>,
}

impl From<QuestionRow> for QuizQuestion {
    fn from(row: QuestionRow) -> Self {
        Self {
            id: row.id,
            content: row.content,
            options: row.options.0,
            correct_answers: row.correct_answers.0,
        }
    }
}

fn assemble_quiz(row: QuizRow, questions: Vec<QuestionRow>) -> QuizDefinition {
    QuizDefinition {
        id: row.id,
        title: row.title,
        description: row.description,
        questions: questions.into_iter().map(QuizQuestion::from).collect(),
        passing_score: row.passing_score,
        time_limit_minutes: row.time_limit_minutes,
        max_attempts: row.max_attempts,
    }
}

/// Relative update of all three counters in one statement.
/// Returns whether the user row exists.
async fn add_progress<'e, E>(executor: E, user_id: i64, delta: &ProgressDelta) -> StoreResult<bool>
where
    E: PgExecutor<'e>,
{
    let result = sqlx::query(
        r#"
        UPDATE users SET
            lessons_completed = lessons_completed + $2,
            courses_completed = courses_completed + $3,
            points = points + $4
        WHERE id = $1
        "#,
    )
    .bind(user_id)
    .bind(delta.lessons_completed.max(0))
    .bind(delta.courses_completed.max(0))
    .bind(delta.points.max(0))
    .execute(executor)
    .await?;

    Ok(result.rows_affected() == 1)
}

fn decode_attempt(row: AttemptRow) -> StoreResult<QuizAttempt> {
    QuizAttempt::try_from(row).map_err(StoreError::Decode)
}

const ATTEMPT_COLUMNS: &str = "id, user_id, quiz_id, attempt_number, score, is_passed, status, answers, start_time, end_time";

#[async_trait]
impl QuizCatalog for PgStore {
    async fn find_quiz(&self, quiz_id: i64) -> StoreResult<Option<QuizDefinition>> {
        let quiz = sqlx::query_as::<_, QuizRow>(
            r#"
            SELECT id, title, description, passing_score, time_limit_minutes, max_attempts
            FROM quizzes
            WHERE id = $1
            "#,
        )
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(quiz) = quiz else {
            return Ok(None);
        };

        let questions = sqlx::query_as::<_, QuestionRow>(
            r#"
            SELECT id, content, options, correct_answers
            FROM quiz_questions
            WHERE quiz_id = $1
            ORDER BY position ASC, id ASC
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(assemble_quiz(quiz, questions)))
    }

    async fn insert_quiz(&self, quiz: &CreateQuizRequest) -> StoreResult<QuizDefinition> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, QuizRow>(
            r#"
            INSERT INTO quizzes (title, description, passing_score, time_limit_minutes, max_attempts)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, title, description, passing_score, time_limit_minutes, max_attempts
            "#,
        )
        .bind(&quiz.title)
        .bind(&quiz.description)
        .bind(quiz.passing_score.unwrap_or(DEFAULT_PASSING_SCORE))
        .bind(quiz.time_limit_minutes)
        .bind(quiz.max_attempts)
        .fetch_one(&mut *tx)
        .await?;

        let mut questions = Vec::with_capacity(quiz.questions.len());
        for (position, q) in quiz.questions.iter().enumerate() {
            let question = sqlx::query_as::<_, QuestionRow>(
                r#"
                INSERT INTO quiz_questions (quiz_id, position, content, options, correct_answers)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING id, content, options, correct_answers
                "#,
            )
            .bind(row.id)
            .bind(position as i32)
            .bind(&q.content)
            .bind(Json(&q.options))
            .bind(Json(&q.correct_answers))
            .fetch_one(&mut *tx)
            .await?;
            questions.push(question);
        }

        tx.commit().await?;

        Ok(assemble_quiz(row, questions))
    }
}

#[async_trait]
impl AttemptStore for PgStore {
    async fn count_attempts(&self, user_id: i64, quiz_id: i64) -> StoreResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM quiz_attempts WHERE user_id = $1 AND quiz_id = $2",
        )
        .bind(user_id)
        .bind(quiz_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    async fn insert_attempt(&self, attempt: &QuizAttempt) -> StoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO quiz_attempts
                (id, user_id, quiz_id, attempt_number, score, is_passed, status, answers, start_time, end_time)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(attempt.id)
        .bind(attempt.user_id)
        .bind(attempt.quiz_id)
        .bind(attempt.attempt_number)
        .bind(attempt.score)
        .bind(attempt.is_passed)
        .bind(attempt.status.as_str())
        .bind(Json(&attempt.answers))
        .bind(attempt.start_time)
        .bind(attempt.end_time)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn find_attempt(&self, attempt_id: Uuid) -> StoreResult<Option<QuizAttempt>> {
        let row = sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {} FROM quiz_attempts WHERE id = $1",
            ATTEMPT_COLUMNS
        ))
        .bind(attempt_id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(decode_attempt).transpose()
    }

    async fn list_attempts(&self, user_id: i64, quiz_id: i64) -> StoreResult<Vec<QuizAttempt>> {
        let rows = sqlx::query_as::<_, AttemptRow>(&format!(
            "SELECT {} FROM quiz_attempts WHERE user_id = $1 AND quiz_id = $2 ORDER BY attempt_number DESC",
            ATTEMPT_COLUMNS
        ))
        .bind(user_id)
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(decode_attempt).collect()
    }

    async fn finish_attempt(&self, attempt: &QuizAttempt) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE quiz_attempts
            SET score = $2, is_passed = $3, status = $4, answers = $5, end_time = $6
            WHERE id = $1 AND status = $7
            "#,
        )
        .bind(attempt.id)
        .bind(attempt.score)
        .bind(attempt.is_passed)
        .bind(attempt.status.as_str())
        .bind(Json(&attempt.answers))
        .bind(attempt.end_time)
        .bind(AttemptStatus::InProgress.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl RewardLedger for PgStore {
    async fn has_awarded(
        &self,
        user_id: i64,
        activity_type: ActivityType,
        activity_id: &str,
    ) -> StoreResult<bool> {
        let existing = sqlx::query_scalar::<_, i32>(
            r#"
            SELECT 1 FROM reward_history
            WHERE user_id = $1 AND activity_type = $2 AND activity_id = $3
            "#,
        )
        .bind(user_id)
        .bind(activity_type.as_str())
        .bind(activity_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(existing.is_some())
    }

    async fn record_award(&self, entry: &RewardHistoryEntry, delta: &ProgressDelta) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;

        // The unique (user_id, activity_type, activity_id) index decides
        // which of two concurrent callers gets paid.
        let inserted = sqlx::query(
            r#"
            INSERT INTO reward_history (id, user_id, activity_type, activity_id, points, awarded_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (user_id, activity_type, activity_id) DO NOTHING
            "#,
        )
        .bind(entry.id)
        .bind(entry.user_id)
        .bind(entry.activity_type.as_str())
        .bind(&entry.activity_id)
        .bind(entry.points)
        .bind(entry.awarded_at)
        .execute(&mut *tx)
        .await?
        .rows_affected()
            == 1;

        if !inserted {
            tx.rollback().await?;
            return Ok(false);
        }

        if !add_progress(&mut *tx, entry.user_id, delta).await? {
            tx.rollback().await?;
            return Err(StoreError::NotFound(format!("user {}", entry.user_id)));
        }

        tx.commit().await?;
        Ok(true)
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn find_progress(&self, user_id: i64) -> StoreResult<Option<UserProgress>> {
        let progress = sqlx::query_as::<_, UserProgress>(
            "SELECT lessons_completed, courses_completed, points FROM users WHERE id = $1",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(progress)
    }

    async fn apply(&self, user_id: i64, delta: &ProgressDelta) -> StoreResult<()> {
        if !add_progress(&self.pool, user_id, delta).await? {
            return Err(StoreError::NotFound(format!("user {}", user_id)));
        }
        Ok(())
    }
}

#[async_trait]
impl BadgeStore for PgStore {
    async fn find_badge_by_key(&self, key: &str) -> StoreResult<Option<Badge>> {
        let badge = sqlx::query_as::<_, Badge>(
            "SELECT id, key, name, description, icon FROM badges WHERE key = $1",
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(badge)
    }

    async fn insert_badge(&self, badge: &Badge) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO badges (id, key, name, description, icon) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(badge.id)
        .bind(&badge.key)
        .bind(&badge.name)
        .bind(&badge.description)
        .bind(&badge.icon)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_badge_display(&self, badge: &Badge) -> StoreResult<()> {
        sqlx::query(
            r#"
            UPDATE badges
            SET name = $2, description = $3, icon = $4, updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(badge.id)
        .bind(&badge.name)
        .bind(&badge.description)
        .bind(&badge.icon)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn list_badges(&self, keys: &[String]) -> StoreResult<Vec<Badge>> {
        let badges = sqlx::query_as::<_, Badge>(
            r#"
            SELECT id, key, name, description, icon
            FROM badges
            WHERE key = ANY($1)
            ORDER BY name ASC
            "#,
        )
        .bind(keys)
        .fetch_all(&self.pool)
        .await?;

        Ok(badges)
    }

    async fn earned_badges(&self, user_id: i64) -> StoreResult<Vec<EarnedBadge>> {
        let rows = sqlx::query_as::<_, EarnedBadgeRow>(
            r#"
            SELECT b.id, b.key, b.name, b.description, b.icon, ub.awarded_at
            FROM user_badges ub
            JOIN badges b ON ub.badge_id = b.id
            WHERE ub.user_id = $1
            ORDER BY ub.awarded_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(EarnedBadge::from).collect())
    }

    async fn insert_user_badge(
        &self,
        user_id: i64,
        badge_id: Uuid,
        awarded_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        sqlx::query("INSERT INTO user_badges (user_id, badge_id, awarded_at) VALUES ($1, $2, $3)")
            .bind(user_id)
            .bind(badge_id)
            .bind(awarded_at)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
