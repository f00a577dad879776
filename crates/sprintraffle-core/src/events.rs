use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::sprint::{Phase, SprintStatus};

/// Every state change in a session produces an Event.
/// Front ends render them; the CLI prints them as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Event {
    /// An authoritative sprint snapshot replaced the local one.
    SprintFetched {
        sprint_id: Option<String>,
        next_sprint_id: Option<String>,
        at: DateTime<Utc>,
    },
    /// A sprint response arrived after a newer one and was dropped.
    SprintFetchStale {
        seq: u64,
        at: DateTime<Utc>,
    },
    /// Status flipped locally because the countdown ran out.
    SprintStatusChanged {
        sprint_id: String,
        status: SprintStatus,
        at: DateTime<Utc>,
    },
    TicketsConfirmed {
        tickets: u64,
        multiplier: f64,
        at: DateTime<Utc>,
    },
    /// Optimistic increment after a confirmed ad view.
    TicketsIncremented {
        request_id: Uuid,
        delta: u64,
        my_tickets: u64,
        at: DateTime<Utc>,
    },
    /// Ad view accepted by the server without a ticket.
    AdViewCounted {
        request_id: Uuid,
        at: DateTime<Utc>,
    },
    AdViewRejected {
        request_id: Option<Uuid>,
        reason: String,
        at: DateTime<Utc>,
    },
    Tick {
        sprint_id: Option<String>,
        phase: Option<Phase>,
        status: Option<SprintStatus>,
        remaining_ms: i64,
        countdown: String,
        at: DateTime<Utc>,
    },
}
