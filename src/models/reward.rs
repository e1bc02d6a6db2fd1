// src/models/reward.rs

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    config::{POINTS_PER_COURSE, POINTS_PER_LESSON},
    models::{badge::Badge, user::UserProgress},
};

/// Kind of completed activity that earns points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityType {
    Lesson,
    Course,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::Lesson => "lesson",
            ActivityType::Course => "course",
        }
    }

    /// Fixed reward for one completion of this kind.
    pub fn points(&self) -> i64 {
        match self {
            ActivityType::Lesson => POINTS_PER_LESSON,
            ActivityType::Course => POINTS_PER_COURSE,
        }
    }
}

impl fmt::Display for ActivityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identifies one specific lesson or course completion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ActivityRef {
    pub activity_type: ActivityType,
    pub activity_id: String,
}

/// Represents the 'reward_history' table.
/// At most one row exists per (user_id, activity_type, activity_id).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RewardHistoryEntry {
    pub id: Uuid,
    pub user_id: i64,
    pub activity_type: ActivityType,
    pub activity_id: String,
    pub points: i64,
    pub awarded_at: DateTime<Utc>,
}

impl RewardHistoryEntry {
    pub fn new(user_id: i64, activity: &ActivityRef, points: i64) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            activity_type: activity.activity_type,
            activity_id: activity.activity_id.clone(),
            points,
            awarded_at: Utc::now(),
        }
    }
}

/// Relative increments applied to a user's counters in one go.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressDelta {
    pub lessons_completed: i64,
    pub courses_completed: i64,
    pub points: i64,
}

impl ProgressDelta {
    pub fn is_empty(&self) -> bool {
        self.lessons_completed <= 0 && self.courses_completed <= 0 && self.points <= 0
    }
}

/// Input of the progress/reward service.
#[derive(Debug, Clone)]
pub struct ProgressUpdate {
    pub user_id: i64,
    pub lessons_completed_delta: i64,
    pub courses_completed_delta: i64,
    pub activity: Option<ActivityRef>,
}

/// DTO for reporting progress.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProgressRequest {
    #[validate(range(min = 0, max = 1000))]
    pub lessons_completed_delta: Option<i64>,
    #[validate(range(min = 0, max = 1000))]
    pub courses_completed_delta: Option<i64>,
    #[validate(length(min = 1, max = 255))]
    pub activity_id: Option<String>,
    pub activity_type: Option<ActivityType>,
}

impl UpdateProgressRequest {
    /// Checks that the request asks for something and turns it into a
    /// service input for `user_id`.
    pub fn into_update(self, user_id: i64) -> Result<ProgressUpdate, String> {
        let lessons = self.lessons_completed_delta.unwrap_or(0);
        let courses = self.courses_completed_delta.unwrap_or(0);

        let activity = match (self.activity_id, self.activity_type) {
            (Some(activity_id), Some(activity_type)) => Some(ActivityRef {
                activity_type,
                activity_id,
            }),
            (Some(_), None) => {
                return Err("activity_type is required together with activity_id".to_string());
            }
            (None, _) => None,
        };

        if lessons <= 0 && courses <= 0 && activity.is_none() {
            return Err(
                "Provide lessons_completed_delta, courses_completed_delta > 0, or an activity_id"
                    .to_string(),
            );
        }

        Ok(ProgressUpdate {
            user_id,
            lessons_completed_delta: lessons,
            courses_completed_delta: courses,
            activity,
        })
    }
}

/// Result of a progress update.
#[derive(Debug, Serialize)]
pub struct ProgressResponse {
    pub progress: UserProgress,
    pub newly_awarded: Vec<Badge>,
    pub points_earned: i64,
}
