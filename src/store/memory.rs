// src/store/memory.rs

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
    config::DEFAULT_PASSING_SCORE,
    models::{
        attempt::{AttemptStatus, QuizAttempt},
        badge::{Badge, EarnedBadge},
        quiz::{CreateQuizRequest, QuizDefinition, QuizQuestion},
        reward::{ActivityType, ProgressDelta, RewardHistoryEntry},
        user::UserProgress,
    },
    store::{
        AttemptStore, BadgeStore, QuizCatalog, RewardLedger, StoreError, StoreResult, UserStore,
    },
};

#[derive(Default)]
struct Tables {
    quizzes: HashMap<i64, QuizDefinition>,
    next_quiz_id: i64,
    next_question_id: i64,
    attempts: HashMap<Uuid, QuizAttempt>,
    users: HashMap<i64, UserProgress>,
    rewards: Vec<RewardHistoryEntry>,
    badges: Vec<Badge>,
    user_badges: Vec<(i64, Uuid, DateTime<Utc>)>,
}

/// Process-local store. Every operation holds one lock, which gives each
/// call the atomicity a database transaction would.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user with zeroed counters. Existing users are left alone.
    pub async fn insert_user(&self, user_id: i64) {
        self.tables.lock().await.users.entry(user_id).or_default();
    }

    pub async fn reward_history(&self, user_id: i64) -> Vec<RewardHistoryEntry> {
        self.tables
            .lock()
            .await
            .rewards
            .iter()
            .filter(|r| r.user_id == user_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl QuizCatalog for MemoryStore {
    async fn find_quiz(&self, quiz_id: i64) -> StoreResult<Option<QuizDefinition>> {
        Ok(self.tables.lock().await.quizzes.get(&quiz_id).cloned())
    }

    async fn insert_quiz(&self, quiz: &CreateQuizRequest) -> StoreResult<QuizDefinition> {
        let mut tables = self.tables.lock().await;

        tables.next_quiz_id += 1;
        let id = tables.next_quiz_id;

        let mut questions = Vec::with_capacity(quiz.questions.len());
        for q in &quiz.questions {
            tables.next_question_id += 1;
            questions.push(QuizQuestion {
                id: tables.next_question_id,
                content: q.content.clone(),
                options: q.options.clone(),
                correct_answers: q.correct_answers.clone(),
            });
        }

        let definition = QuizDefinition {
            id,
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            questions,
            passing_score: quiz.passing_score.unwrap_or(DEFAULT_PASSING_SCORE),
            time_limit_minutes: quiz.time_limit_minutes,
            max_attempts: quiz.max_attempts,
        };
        tables.quizzes.insert(id, definition.clone());

        Ok(definition)
    }
}

#[async_trait]
impl AttemptStore for MemoryStore {
    async fn count_attempts(&self, user_id: i64, quiz_id: i64) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        let count = tables
            .attempts
            .values()
            .filter(|a| a.user_id == user_id && a.quiz_id == quiz_id)
            .count();
        Ok(count as i64)
    }

    async fn insert_attempt(&self, attempt: &QuizAttempt) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;

        let taken = tables.attempts.values().any(|a| {
            a.user_id == attempt.user_id
                && a.quiz_id == attempt.quiz_id
                && a.attempt_number == attempt.attempt_number
        });
        if taken || tables.attempts.contains_key(&attempt.id) {
            return Err(StoreError::UniqueViolation(format!(
                "attempt {} of user {} on quiz {}",
                attempt.attempt_number, attempt.user_id, attempt.quiz_id
            )));
        }

        tables.attempts.insert(attempt.id, attempt.clone());
        Ok(())
    }

    async fn find_attempt(&self, attempt_id: Uuid) -> StoreResult<Option<QuizAttempt>> {
        Ok(self.tables.lock().await.attempts.get(&attempt_id).cloned())
    }

    async fn list_attempts(&self, user_id: i64, quiz_id: i64) -> StoreResult<Vec<QuizAttempt>> {
        let tables = self.tables.lock().await;
        let mut attempts: Vec<QuizAttempt> = tables
            .attempts
            .values()
            .filter(|a| a.user_id == user_id && a.quiz_id == quiz_id)
            .cloned()
            .collect();
        attempts.sort_by(|a, b| b.attempt_number.cmp(&a.attempt_number));
        Ok(attempts)
    }

    async fn finish_attempt(&self, attempt: &QuizAttempt) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        match tables.attempts.get_mut(&attempt.id) {
            Some(stored) if stored.status == AttemptStatus::InProgress => {
                *stored = attempt.clone();
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(StoreError::NotFound(format!("quiz attempt {}", attempt.id))),
        }
    }
}

#[async_trait]
impl RewardLedger for MemoryStore {
    async fn has_awarded(
        &self,
        user_id: i64,
        activity_type: ActivityType,
        activity_id: &str,
    ) -> StoreResult<bool> {
        let tables = self.tables.lock().await;
        Ok(tables.rewards.iter().any(|r| {
            r.user_id == user_id && r.activity_type == activity_type && r.activity_id == activity_id
        }))
    }

    async fn record_award(&self, entry: &RewardHistoryEntry, delta: &ProgressDelta) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;

        let exists = tables.rewards.iter().any(|r| {
            r.user_id == entry.user_id
                && r.activity_type == entry.activity_type
                && r.activity_id == entry.activity_id
        });
        if exists {
            return Ok(false);
        }

        let progress = tables
            .users
            .get_mut(&entry.user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", entry.user_id)))?;
        progress.apply(delta);

        tables.rewards.push(entry.clone());
        Ok(true)
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_progress(&self, user_id: i64) -> StoreResult<Option<UserProgress>> {
        Ok(self.tables.lock().await.users.get(&user_id).copied())
    }

    async fn apply(&self, user_id: i64, delta: &ProgressDelta) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        let progress = tables
            .users
            .get_mut(&user_id)
            .ok_or_else(|| StoreError::NotFound(format!("user {}", user_id)))?;
        progress.apply(delta);
        Ok(())
    }
}

#[async_trait]
impl BadgeStore for MemoryStore {
    async fn find_badge_by_key(&self, key: &str) -> StoreResult<Option<Badge>> {
        let tables = self.tables.lock().await;
        Ok(tables.badges.iter().find(|b| b.key == key).cloned())
    }

    async fn insert_badge(&self, badge: &Badge) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        if tables.badges.iter().any(|b| b.key == badge.key || b.id == badge.id) {
            return Err(StoreError::UniqueViolation(format!("badge key {}", badge.key)));
        }
        tables.badges.push(badge.clone());
        Ok(())
    }

    async fn update_badge_display(&self, badge: &Badge) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        let stored = tables
            .badges
            .iter_mut()
            .find(|b| b.id == badge.id)
            .ok_or_else(|| StoreError::NotFound(format!("badge {}", badge.id)))?;
        stored.name = badge.name.clone();
        stored.description = badge.description.clone();
        stored.icon = badge.icon.clone();
        Ok(())
    }

    async fn list_badges(&self, keys: &[String]) -> StoreResult<Vec<Badge>> {
        let tables = self.tables.lock().await;
        let mut badges: Vec<Badge> = tables
            .badges
            .iter()
            .filter(|b| keys.contains(&b.key))
            .cloned()
            .collect();
        badges.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(badges)
    }

    async fn earned_badges(&self, user_id: i64) -> StoreResult<Vec<EarnedBadge>> {
        let tables = self.tables.lock().await;
        let mut earned: Vec<EarnedBadge> = tables
            .user_badges
            .iter()
            .filter(|(uid, _, _)| *uid == user_id)
            .filter_map(|(_, badge_id, awarded_at)| {
                tables
                    .badges
                    .iter()
                    .find(|b| b.id == *badge_id)
                    .map(|badge| EarnedBadge {
                        badge: badge.clone(),
                        awarded_at: *awarded_at,
                    })
            })
            .collect();
        earned.sort_by_key(|e| e.awarded_at);
        Ok(earned)
    }

    async fn insert_user_badge(
        &self,
        user_id: i64,
        badge_id: Uuid,
        awarded_at: DateTime<Utc>,
    ) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        if !tables.badges.iter().any(|b| b.id == badge_id) {
            return Err(StoreError::NotFound(format!("badge {}", badge_id)));
        }
        if tables
            .user_badges
            .iter()
            .any(|(uid, bid, _)| *uid == user_id && *bid == badge_id)
        {
            return Err(StoreError::UniqueViolation(format!(
                "badge {} already awarded to user {}",
                badge_id, user_id
            )));
        }
        tables.user_badges.push((user_id, badge_id, awarded_at));
        Ok(())
    }
}
