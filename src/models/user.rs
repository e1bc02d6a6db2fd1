// src/models/user.rs

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::reward::ProgressDelta;

/// Cumulative progress counters kept on the 'users' table.
/// Only ever incremented, never overwritten.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct UserProgress {
    pub lessons_completed: i64,
    pub courses_completed: i64,
    pub points: i64,
}

impl UserProgress {
    /// Relative increment of every counter. Negative components are ignored.
    pub(crate) fn apply(&mut self, delta: &ProgressDelta) {
        self.lessons_completed += delta.lessons_completed.max(0);
        self.courses_completed += delta.courses_completed.max(0);
        self.points += delta.points.max(0);
    }
}
