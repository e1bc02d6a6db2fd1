// src/models/badge.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Represents the 'badges' table.
/// `key` is the stable identity; name, description and icon follow the
/// milestone definition and may be rewritten.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Badge {
    pub id: Uuid,
    pub key: String,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
}

impl Badge {
    pub fn from_milestone(milestone: &BadgeMilestone) -> Self {
        Self {
            id: Uuid::new_v4(),
            key: milestone.key.to_string(),
            name: milestone.name.to_string(),
            description: milestone.description.to_string(),
            icon: milestone.icon.map(str::to_string),
        }
    }

    /// True when the display fields differ from the milestone definition.
    pub fn drifted_from(&self, milestone: &BadgeMilestone) -> bool {
        self.name != milestone.name
            || self.description != milestone.description
            || self.icon.as_deref() != milestone.icon
    }
}

/// A badge a user holds, with the time it was awarded.
#[derive(Debug, Clone, Serialize)]
pub struct EarnedBadge {
    pub badge: Badge,
    pub awarded_at: DateTime<Utc>,
}

/// Joined row from `user_badges` and `badges`.
#[derive(Debug, FromRow)]
pub struct EarnedBadgeRow {
    pub id: Uuid,
    pub key: String,
    pub name: String,
    pub description: String,
    pub icon: Option<String>,
    pub awarded_at: DateTime<Utc>,
}

impl From<EarnedBadgeRow> for EarnedBadge {
    fn from(row: EarnedBadgeRow) -> Self {
        Self {
            badge: Badge {
                id: row.id,
                key: row.key,
                name: row.name,
                description: row.description,
                icon: row.icon,
            },
            awarded_at: row.awarded_at,
        }
    }
}

/// Counter a milestone is measured against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneType {
    LessonsCompleted,
    CoursesCompleted,
}

/// Static rule: reaching `threshold` on the counter earns the badge `key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BadgeMilestone {
    pub key: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: Option<&'static str>,
    pub kind: MilestoneType,
    pub threshold: i64,
}

pub const BADGE_MILESTONES: &[BadgeMilestone] = &[
    BadgeMilestone {
        key: "lessons_1",
        name: "First Lesson",
        description: "Complete your first lesson.",
        icon: Some("📘"),
        kind: MilestoneType::LessonsCompleted,
        threshold: 1,
    },
    BadgeMilestone {
        key: "lessons_5",
        name: "Lesson Explorer",
        description: "Complete 5 lessons.",
        icon: Some("🧭"),
        kind: MilestoneType::LessonsCompleted,
        threshold: 5,
    },
    BadgeMilestone {
        key: "lessons_10",
        name: "Lesson Apprentice",
        description: "Complete 10 lessons.",
        icon: Some("🧠"),
        kind: MilestoneType::LessonsCompleted,
        threshold: 10,
    },
    BadgeMilestone {
        key: "courses_1",
        name: "First Course",
        description: "Complete your first course.",
        icon: Some("🎓"),
        kind: MilestoneType::CoursesCompleted,
        threshold: 1,
    },
    BadgeMilestone {
        key: "courses_3",
        name: "Course Collector",
        description: "Complete 3 courses.",
        icon: Some("🏅"),
        kind: MilestoneType::CoursesCompleted,
        threshold: 3,
    },
    BadgeMilestone {
        key: "courses_5",
        name: "Course Master",
        description: "Complete 5 courses.",
        icon: Some("👑"),
        kind: MilestoneType::CoursesCompleted,
        threshold: 5,
    },
];
