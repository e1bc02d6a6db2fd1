// src/services/badges.rs

use std::{collections::HashSet, sync::Arc};

use chrono::Utc;

use crate::{
    error::CoreError,
    models::{
        badge::{Badge, BadgeMilestone, EarnedBadge, MilestoneType},
        user::UserProgress,
    },
    store::{BadgeStore, StoreError},
};

/// Whether `progress` reaches the milestone's threshold.
pub fn qualifies(milestone: &BadgeMilestone, progress: &UserProgress) -> bool {
    match milestone.kind {
        MilestoneType::LessonsCompleted => progress.lessons_completed >= milestone.threshold,
        MilestoneType::CoursesCompleted => progress.courses_completed >= milestone.threshold,
    }
}

/// Milestones reached by `progress` whose badge the user does not hold yet.
pub fn newly_qualified<'a>(
    progress: &UserProgress,
    milestones: &'a [BadgeMilestone],
    earned_keys: &HashSet<String>,
) -> Vec<&'a BadgeMilestone> {
    milestones
        .iter()
        .filter(|m| !earned_keys.contains(m.key))
        .filter(|m| qualifies(m, progress))
        .collect()
}

/// Keeps the badge catalog in line with the milestone list and hands out
/// badges as counters cross thresholds.
#[derive(Clone)]
pub struct BadgeEvaluator {
    badges: Arc<dyn BadgeStore>,
    milestones: &'static [BadgeMilestone],
}

impl BadgeEvaluator {
    pub fn new(badges: Arc<dyn BadgeStore>, milestones: &'static [BadgeMilestone]) -> Self {
        Self { badges, milestones }
    }

    fn milestone_keys(&self) -> Vec<String> {
        self.milestones.iter().map(|m| m.key.to_string()).collect()
    }

    /// Creates missing badge rows and rewrites drifted display fields.
    /// Rows are never deleted.
    pub async fn ensure_catalog(&self) -> Result<(), CoreError> {
        for milestone in self.milestones {
            match self.badges.find_badge_by_key(milestone.key).await? {
                None => match self.badges.insert_badge(&Badge::from_milestone(milestone)).await {
                    Ok(()) => tracing::info!("Created badge '{}'", milestone.key),
                    // Someone else created it concurrently.
                    Err(StoreError::UniqueViolation(_)) => {}
                    Err(e) => return Err(e.into()),
                },
                Some(existing) if existing.drifted_from(milestone) => {
                    let updated = Badge {
                        name: milestone.name.to_string(),
                        description: milestone.description.to_string(),
                        icon: milestone.icon.map(str::to_string),
                        ..existing
                    };
                    self.badges.update_badge_display(&updated).await?;
                    tracing::info!("Updated badge '{}' to match its milestone", milestone.key);
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    /// The milestone badges, ordered by name.
    pub async fn catalog(&self) -> Result<Vec<Badge>, CoreError> {
        self.ensure_catalog().await?;
        Ok(self.badges.list_badges(&self.milestone_keys()).await?)
    }

    /// Badges held by the user, oldest award first.
    pub async fn earned_badges(&self, user_id: i64) -> Result<Vec<EarnedBadge>, CoreError> {
        Ok(self.badges.earned_badges(user_id).await?)
    }

    /// Awards every badge `progress` qualifies for that the user lacks.
    ///
    /// Returns only the badges inserted by this call. A failed insert
    /// (typically a concurrent award of the same badge) drops that badge
    /// from the result instead of failing the evaluation.
    pub async fn evaluate(&self, user_id: i64, progress: &UserProgress) -> Result<Vec<Badge>, CoreError> {
        self.ensure_catalog().await?;

        let catalog = self.badges.list_badges(&self.milestone_keys()).await?;
        let earned_keys: HashSet<String> = self
            .badges
            .earned_badges(user_id)
            .await?
            .into_iter()
            .map(|e| e.badge.key)
            .collect();

        let mut newly_awarded = Vec::new();
        for milestone in newly_qualified(progress, self.milestones, &earned_keys) {
            let Some(badge) = catalog.iter().find(|b| b.key == milestone.key) else {
                continue;
            };

            match self.badges.insert_user_badge(user_id, badge.id, Utc::now()).await {
                Ok(()) => {
                    tracing::info!("User {} earned badge '{}'", user_id, badge.key);
                    newly_awarded.push(badge.clone());
                }
                Err(e) => {
                    tracing::warn!("Skipping badge '{}' for user {}: {}", badge.key, user_id, e);
                }
            }
        }

        Ok(newly_awarded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{models::badge::BADGE_MILESTONES, store::MemoryStore};

    const FAST_LEARNER: &[BadgeMilestone] = &[BadgeMilestone {
        key: "fast-learner",
        name: "Fast Learner",
        description: "Complete 5 lessons.",
        icon: None,
        kind: MilestoneType::LessonsCompleted,
        threshold: 5,
    }];

    fn progress(lessons: i64, courses: i64) -> UserProgress {
        UserProgress {
            lessons_completed: lessons,
            courses_completed: courses,
            points: 0,
        }
    }

    #[test]
    fn test_qualifies_by_counter() {
        let lessons_5 = &BADGE_MILESTONES[1];
        let courses_1 = &BADGE_MILESTONES[3];

        assert!(!qualifies(lessons_5, &progress(4, 9)));
        assert!(qualifies(lessons_5, &progress(5, 0)));
        assert!(!qualifies(courses_1, &progress(10, 0)));
        assert!(qualifies(courses_1, &progress(0, 1)));
    }

    #[test]
    fn test_newly_qualified_skips_earned() {
        let earned: HashSet<String> = ["lessons_1".to_string()].into_iter().collect();
        let keys: Vec<&str> = newly_qualified(&progress(5, 1), BADGE_MILESTONES, &earned)
            .iter()
            .map(|m| m.key)
            .collect();
        assert_eq!(keys, vec!["lessons_5", "courses_1"]);
    }

    #[tokio::test]
    async fn test_catalog_is_created_and_sorted_by_name() {
        let store = MemoryStore::new();
        let evaluator = BadgeEvaluator::new(Arc::new(store), BADGE_MILESTONES);

        let catalog = evaluator.catalog().await.unwrap();
        assert_eq!(catalog.len(), BADGE_MILESTONES.len());
        let names: Vec<&str> = catalog.iter().map(|b| b.name.as_str()).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);

        // Idempotent.
        assert_eq!(evaluator.catalog().await.unwrap(), catalog);
    }

    #[tokio::test]
    async fn test_catalog_heals_drifted_display_fields() {
        let store = MemoryStore::new();
        let stale = Badge {
            name: "Old name".to_string(),
            icon: None,
            ..Badge::from_milestone(&FAST_LEARNER[0])
        };
        store.insert_badge(&stale).await.unwrap();

        let evaluator = BadgeEvaluator::new(Arc::new(store.clone()), FAST_LEARNER);
        evaluator.ensure_catalog().await.unwrap();

        let healed = store.find_badge_by_key("fast-learner").await.unwrap().unwrap();
        assert_eq!(healed.id, stale.id);
        assert_eq!(healed.name, "Fast Learner");
    }

    #[tokio::test]
    async fn test_evaluate_awards_once() {
        let store = MemoryStore::new();
        let evaluator = BadgeEvaluator::new(Arc::new(store.clone()), FAST_LEARNER);

        assert!(evaluator.evaluate(1, &progress(4, 0)).await.unwrap().is_empty());

        let awarded = evaluator.evaluate(1, &progress(5, 0)).await.unwrap();
        assert_eq!(awarded.len(), 1);
        assert_eq!(awarded[0].key, "fast-learner");

        assert!(evaluator.evaluate(1, &progress(6, 0)).await.unwrap().is_empty());
        assert_eq!(evaluator.earned_badges(1).await.unwrap().len(), 1);
    }

    /// Reads earned badges from a snapshot taken before a concurrent award.
    struct StaleReads(MemoryStore);

    #[async_trait::async_trait]
    impl BadgeStore for StaleReads {
        async fn find_badge_by_key(&self, key: &str) -> crate::store::StoreResult<Option<Badge>> {
            self.0.find_badge_by_key(key).await
        }
        async fn insert_badge(&self, badge: &Badge) -> crate::store::StoreResult<()> {
            self.0.insert_badge(badge).await
        }
        async fn update_badge_display(&self, badge: &Badge) -> crate::store::StoreResult<()> {
            self.0.update_badge_display(badge).await
        }
        async fn list_badges(&self, keys: &[String]) -> crate::store::StoreResult<Vec<Badge>> {
            self.0.list_badges(keys).await
        }
        async fn earned_badges(&self, _user_id: i64) -> crate::store::StoreResult<Vec<EarnedBadge>> {
            Ok(vec![])
        }
        async fn insert_user_badge(
            &self,
            user_id: i64,
            badge_id: uuid::Uuid,
            awarded_at: chrono::DateTime<Utc>,
        ) -> crate::store::StoreResult<()> {
            self.0.insert_user_badge(user_id, badge_id, awarded_at).await
        }
    }

    #[tokio::test]
    async fn test_lost_award_race_is_not_fatal() {
        let store = MemoryStore::new();
        let evaluator = BadgeEvaluator::new(Arc::new(StaleReads(store.clone())), FAST_LEARNER);
        evaluator.ensure_catalog().await.unwrap();

        // A concurrent evaluation already inserted the badge.
        let badge = store.find_badge_by_key("fast-learner").await.unwrap().unwrap();
        store.insert_user_badge(1, badge.id, Utc::now()).await.unwrap();

        let awarded = evaluator.evaluate(1, &progress(5, 0)).await.unwrap();
        assert!(awarded.is_empty());
        assert_eq!(store.earned_badges(1).await.unwrap().len(), 1);
    }
}
