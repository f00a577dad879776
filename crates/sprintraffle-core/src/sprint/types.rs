use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Lifecycle status as carried on a sprint snapshot.
///
/// `Drawing` and `Completed` only ever come from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SprintStatus {
    Upcoming,
    Active,
    Ended,
    Drawing,
    Completed,
}

/// Time-derived phase of a sprint occurrence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Upcoming,
    Active,
    Ended,
}

impl From<Phase> for SprintStatus {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Upcoming => SprintStatus::Upcoming,
            Phase::Active => SprintStatus::Active,
            Phase::Ended => SprintStatus::Ended,
        }
    }
}

fn default_duration() -> u32 {
    60
}

/// One scheduled ad-watching window, as returned by the sprint endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sprint {
    pub id: String,
    /// 0 = Sunday .. 6 = Saturday. Not range-checked; see [`crate::sprint::day_name`].
    pub day_of_week: i32,
    /// Wall-clock "HH:mm".
    pub start_time: String,
    pub end_time: String,
    /// Minutes.
    #[serde(default = "default_duration")]
    pub duration: u32,
    #[serde(default)]
    pub category: Option<String>,
    pub status: SprintStatus,
    /// Absolute bounds of the current occurrence.
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[serde(default)]
    pub active_ads: Vec<String>,
    #[serde(default)]
    pub total_views: u64,
    #[serde(default)]
    pub total_participants: u64,
    #[serde(default)]
    pub raffle_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Sprint {
    /// Reject snapshots whose end is not after their start.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.end_date <= self.start_date {
            return Err(ValidationError::InvalidTimeRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        Ok(())
    }

    /// Copy of this sprint with only `status` replaced.
    pub fn with_status(&self, status: SprintStatus) -> Sprint {
        Sprint {
            status,
            ..self.clone()
        }
    }

    /// "17:00 - 18:00"
    pub fn schedule_label(&self) -> String {
        format!("{} - {}", self.start_time, self.end_time)
    }
}

/// Derived schedule metadata published alongside the sprint it describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SprintSchedule {
    pub sprint: Sprint,
    #[serde(default)]
    pub next_sprint: Option<Sprint>,
    /// Milliseconds; absent once the start has passed.
    #[serde(default)]
    pub time_until_start: Option<i64>,
    /// Milliseconds; absent once the end has passed.
    #[serde(default)]
    pub time_until_end: Option<i64>,
    pub is_active: bool,
}
