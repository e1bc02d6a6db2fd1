// src/services/rewards.rs

use std::sync::Arc;

use crate::{
    error::CoreError,
    models::{
        reward::{ActivityType, ProgressDelta, ProgressResponse, ProgressUpdate, RewardHistoryEntry},
        user::UserProgress,
    },
    services::badges::BadgeEvaluator,
    store::{RewardLedger, UserStore},
};

/// Applies completed lessons/courses to a user's counters, pays out points
/// and hands over to the badge evaluator.
#[derive(Clone)]
pub struct RewardService {
    ledger: Arc<dyn RewardLedger>,
    users: Arc<dyn UserStore>,
    badges: BadgeEvaluator,
}

impl RewardService {
    pub fn new(ledger: Arc<dyn RewardLedger>, users: Arc<dyn UserStore>, badges: BadgeEvaluator) -> Self {
        Self {
            ledger,
            users,
            badges,
        }
    }

    /// Two paths:
    /// * with an activity, the ledger makes the call idempotent: the first
    ///   report of an activity earns its fixed points (and one completed
    ///   unit unless a delta was given), repeats earn nothing;
    /// * without one, the deltas are trusted as-is and paid per unit.
    pub async fn update_progress_and_award_badges(
        &self,
        update: ProgressUpdate,
    ) -> Result<ProgressResponse, CoreError> {
        let user_id = update.user_id;
        self.find_progress(user_id).await?;

        let mut delta = ProgressDelta {
            lessons_completed: update.lessons_completed_delta.max(0),
            courses_completed: update.courses_completed_delta.max(0),
            points: 0,
        };

        match &update.activity {
            Some(activity) => {
                let already = self
                    .ledger
                    .has_awarded(user_id, activity.activity_type, &activity.activity_id)
                    .await?;

                if already {
                    delta = ProgressDelta::default();
                } else {
                    delta.points = activity.activity_type.points();
                    match activity.activity_type {
                        ActivityType::Lesson if delta.lessons_completed == 0 => delta.lessons_completed = 1,
                        ActivityType::Course if delta.courses_completed == 0 => delta.courses_completed = 1,
                        _ => {}
                    }

                    let entry = RewardHistoryEntry::new(user_id, activity, delta.points);
                    if self.ledger.record_award(&entry, &delta).await? {
                        tracing::info!(
                            "User {} earned {} points for {} '{}'",
                            user_id,
                            delta.points,
                            activity.activity_type,
                            activity.activity_id
                        );
                    } else {
                        // A concurrent request recorded it first.
                        delta = ProgressDelta::default();
                    }
                }

                if delta.is_empty() {
                    tracing::debug!(
                        "Ignoring repeated {} '{}' for user {}",
                        activity.activity_type,
                        activity.activity_id,
                        user_id
                    );
                }
            }
            None => {
                delta.points = delta.lessons_completed * ActivityType::Lesson.points()
                    + delta.courses_completed * ActivityType::Course.points();

                self.users.apply(user_id, &delta).await?;

                tracing::info!(
                    "User {} progress adjusted: +{} lessons, +{} courses, +{} points",
                    user_id,
                    delta.lessons_completed,
                    delta.courses_completed,
                    delta.points
                );
            }
        }

        let progress = self.find_progress(user_id).await?;
        let newly_awarded = self.badges.evaluate(user_id, &progress).await?;

        Ok(ProgressResponse {
            progress,
            newly_awarded,
            points_earned: delta.points,
        })
    }

    async fn find_progress(&self, user_id: i64) -> Result<UserProgress, CoreError> {
        self.users
            .find_progress(user_id)
            .await?
            .ok_or(CoreError::UserNotFound(user_id))
    }
}
