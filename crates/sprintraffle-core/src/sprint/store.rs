//! Last-known sprint snapshots.
//!
//! Every mutation swaps an `Arc`, so a reader holding a sprint keeps a
//! consistent object no matter what happens to the store afterwards.

use chrono::{DateTime, Utc};
use std::sync::Arc;

use super::clock::derive_phase;
use super::types::{Phase, Sprint, SprintSchedule, SprintStatus};
use crate::sequence::{FetchOutcome, FetchSequencer, FetchTicket};

#[derive(Debug, Default)]
pub struct SprintStore {
    current: Option<Arc<Sprint>>,
    next: Option<Arc<Sprint>>,
    schedule: Option<Arc<SprintSchedule>>,
    current_fetches: FetchSequencer,
    next_fetches: FetchSequencer,
}

impl SprintStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn current(&self) -> Option<Arc<Sprint>> {
        self.current.clone()
    }

    pub fn next(&self) -> Option<Arc<Sprint>> {
        self.next.clone()
    }

    pub fn schedule(&self) -> Option<Arc<SprintSchedule>> {
        self.schedule.clone()
    }

    // ── Mutations ────────────────────────────────────────────────────

    pub fn set_current_sprint(&mut self, sprint: Option<Sprint>) {
        self.current = sprint.map(Arc::new);
    }

    pub fn set_next_sprint(&mut self, sprint: Option<Sprint>) {
        self.next = sprint.map(Arc::new);
    }

    /// Replace schedule metadata. The schedule carries its own copy of the
    /// sprint it was computed from, so the pair is always consistent.
    pub fn set_schedule(&mut self, schedule: SprintSchedule) {
        self.schedule = Some(Arc::new(schedule));
    }

    pub fn clear_schedule(&mut self) {
        self.schedule = None;
    }

    /// Replace only the status of the current sprint. No-op without one.
    ///
    /// Returns whether a sprint was updated.
    pub fn update_sprint_status(&mut self, status: SprintStatus) -> bool {
        match self.current.as_deref() {
            Some(sprint) => {
                self.current = Some(Arc::new(sprint.with_status(status)));
                true
            }
            None => false,
        }
    }

    /// Local countdown expiry: flip a still-running status to `Ended` once
    /// the window has passed. Returns the sprint id when a flip happened.
    pub fn expire_if_elapsed(&mut self, now: DateTime<Utc>) -> Option<String> {
        let sprint = self.current.as_deref()?;
        let still_running = matches!(sprint.status, SprintStatus::Upcoming | SprintStatus::Active);
        if !still_running || derive_phase(sprint, now) != Phase::Ended {
            return None;
        }
        let id = sprint.id.clone();
        self.update_sprint_status(SprintStatus::Ended);
        tracing::debug!(sprint_id = %id, "sprint window elapsed, status set to ended locally");
        Some(id)
    }

    // ── Authoritative fetches ────────────────────────────────────────

    pub fn begin_current_fetch(&mut self) -> FetchTicket {
        self.current_fetches.begin()
    }

    pub fn begin_next_fetch(&mut self) -> FetchTicket {
        self.next_fetches.begin()
    }

    /// Apply a current-sprint fetch result unless a later fetch already landed.
    ///
    /// An invalid snapshot is treated the same as "no active sprint".
    pub fn apply_current_fetch(&mut self, ticket: FetchTicket, sprint: Option<Sprint>) -> FetchOutcome {
        let outcome = self.current_fetches.admit(ticket);
        if outcome == FetchOutcome::Applied {
            self.set_current_sprint(sprint.and_then(accept));
        } else {
            tracing::debug!(seq = ticket.seq(), "dropping stale current sprint response");
        }
        outcome
    }

    pub fn apply_next_fetch(&mut self, ticket: FetchTicket, sprint: Option<Sprint>) -> FetchOutcome {
        let outcome = self.next_fetches.admit(ticket);
        if outcome == FetchOutcome::Applied {
            self.set_next_sprint(sprint.and_then(accept));
        } else {
            tracing::debug!(seq = ticket.seq(), "dropping stale next sprint response");
        }
        outcome
    }
}

fn accept(sprint: Sprint) -> Option<Sprint> {
    match sprint.validate() {
        Ok(()) => Some(sprint),
        Err(e) => {
            tracing::warn!(sprint_id = %sprint.id, error = %e, "ignoring invalid sprint snapshot");
            None
        }
    }
}
