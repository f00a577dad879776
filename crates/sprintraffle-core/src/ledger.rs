//! Client mirror of the user's raffle-ticket standing.
//!
//! The server owns the ticket count. Locally the ledger keeps the last
//! confirmed count plus a pending delta from ad views confirmed since then;
//! the next authoritative read replaces both.

use serde::{Deserialize, Serialize};

use crate::ads::AdViewEvent;
use crate::error::ValidationError;
use crate::sequence::{FetchOutcome, FetchSequencer, FetchTicket};

pub const DEFAULT_MULTIPLIER: f64 = 1.0;

fn default_multiplier() -> f64 {
    DEFAULT_MULTIPLIER
}

/// Body of `GET /raffle/my-tickets`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketSnapshot {
    pub ticket_count: u64,
    #[serde(default = "default_multiplier")]
    pub multiplier: f64,
    #[serde(default)]
    pub ad_views: u64,
}

/// What an ad-view confirmation did to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum AdViewOutcome {
    /// View counted and `tickets` added to the pending delta.
    Credited { tickets: u64 },
    /// View counted, no ticket.
    Counted,
    /// Server did not accept the view.
    NotEarned,
}

/// Read-only view for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LedgerView {
    pub my_tickets: u64,
    pub confirmed: u64,
    pub pending: u64,
    pub multiplier: f64,
    pub ad_views: u64,
    pub effective_tickets: u64,
}

#[derive(Debug)]
pub struct TicketLedger {
    confirmed: u64,
    pending: u64,
    multiplier: f64,
    ad_views: u64,
    fetches: FetchSequencer,
}

impl Default for TicketLedger {
    fn default() -> Self {
        Self::new(DEFAULT_MULTIPLIER)
    }
}

impl TicketLedger {
    /// Fresh ledger for a new session. An invalid multiplier falls back to the default.
    pub fn new(multiplier: f64) -> Self {
        Self {
            confirmed: 0,
            pending: 0,
            multiplier: if valid_multiplier(multiplier) {
                multiplier
            } else {
                DEFAULT_MULTIPLIER
            },
            ad_views: 0,
            fetches: FetchSequencer::default(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Displayed ticket count: confirmed plus optimistic delta.
    pub fn my_tickets(&self) -> u64 {
        self.confirmed.saturating_add(self.pending)
    }

    pub fn confirmed(&self) -> u64 {
        self.confirmed
    }

    pub fn pending(&self) -> u64 {
        self.pending
    }

    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    pub fn ad_views(&self) -> u64 {
        self.ad_views
    }

    /// `round(ad_views * multiplier)`.
    pub fn effective_tickets(&self) -> u64 {
        (self.ad_views as f64 * self.multiplier).round() as u64
    }

    pub fn view(&self) -> LedgerView {
        LedgerView {
            my_tickets: self.my_tickets(),
            confirmed: self.confirmed,
            pending: self.pending,
            multiplier: self.multiplier,
            ad_views: self.ad_views,
            effective_tickets: self.effective_tickets(),
        }
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Authoritative replace. Drops any optimistic delta.
    pub fn set_my_tickets(&mut self, tickets: u64) {
        self.confirmed = tickets;
        self.pending = 0;
    }

    /// Optimistic local add, pending the next authoritative read.
    pub fn increment_tickets(&mut self, delta: u64) {
        self.pending = self.pending.saturating_add(delta);
        tracing::debug!(delta, pending = self.pending, "optimistic ticket increment");
    }

    pub fn set_my_multiplier(&mut self, multiplier: f64) -> Result<(), ValidationError> {
        if !valid_multiplier(multiplier) {
            return Err(ValidationError::InvalidValue {
                field: "multiplier".into(),
                message: format!("must be a positive number, got {multiplier}"),
            });
        }
        self.multiplier = multiplier;
        Ok(())
    }

    /// Apply a server-confirmed ad view.
    ///
    /// Tickets are added only for `success && raffle_ticket_earned`, and only
    /// by the amount the server reported for this event.
    pub fn apply_ad_view(&mut self, event: &AdViewEvent) -> AdViewOutcome {
        if !event.counted() {
            return AdViewOutcome::NotEarned;
        }
        self.ad_views = self.ad_views.saturating_add(1);
        if event.ticket_earned() {
            let tickets = event.tickets_earned();
            self.increment_tickets(tickets);
            AdViewOutcome::Credited { tickets }
        } else {
            AdViewOutcome::Counted
        }
    }

    // ── Authoritative fetches ────────────────────────────────────────

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.fetches.begin()
    }

    /// Replace count, multiplier and view count from a server read, unless a
    /// later-started read has already been applied.
    pub fn apply_fetch(&mut self, ticket: FetchTicket, snapshot: &TicketSnapshot) -> FetchOutcome {
        let outcome = self.fetches.admit(ticket);
        match outcome {
            FetchOutcome::Applied => self.apply_authoritative(snapshot),
            FetchOutcome::Stale => {
                tracing::debug!(seq = ticket.seq(), "dropping stale ticket response");
            }
        }
        outcome
    }

    pub fn apply_authoritative(&mut self, snapshot: &TicketSnapshot) {
        self.set_my_tickets(snapshot.ticket_count);
        self.ad_views = snapshot.ad_views;
        if let Err(e) = self.set_my_multiplier(snapshot.multiplier) {
            tracing::warn!(error = %e, "server sent an invalid multiplier, keeping {}", self.multiplier);
        }
    }
}

fn valid_multiplier(m: f64) -> bool {
    m.is_finite() && m > 0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ads::AdViewResponse;
    use uuid::Uuid;

    fn event(success: bool, earned: bool, tickets: u64) -> AdViewEvent {
        AdViewEvent::confirmed(
            Uuid::new_v4(),
            AdViewResponse {
                success,
                raffle_ticket_earned: earned,
                tickets_earned: tickets,
                multiplier: 1.0,
                message: None,
            },
        )
    }

    #[test]
    fn starts_empty() {
        let ledger = TicketLedger::default();
        assert_eq!(ledger.my_tickets(), 0);
        assert_eq!(ledger.multiplier(), 1.0);
        assert_eq!(ledger.ad_views(), 0);
    }

    #[test]
    fn increment_then_authoritative_overwrite() {
        let mut ledger = TicketLedger::default();
        ledger.set_my_tickets(5);
        ledger.increment_tickets(3);
        assert_eq!(ledger.my_tickets(), 8);
        assert_eq!(ledger.pending(), 3);

        ledger.set_my_tickets(20);
        assert_eq!(ledger.my_tickets(), 20);
        assert_eq!(ledger.pending(), 0);
    }

    #[test]
    fn multiplier_must_be_positive() {
        let mut ledger = TicketLedger::default();
        assert!(ledger.set_my_multiplier(0.0).is_err());
        assert!(ledger.set_my_multiplier(-1.5).is_err());
        assert!(ledger.set_my_multiplier(f64::NAN).is_err());
        assert_eq!(ledger.multiplier(), 1.0);
        ledger.set_my_multiplier(1.25).unwrap();
        assert_eq!(ledger.multiplier(), 1.25);
    }

    #[test]
    fn new_ignores_invalid_multiplier() {
        assert_eq!(TicketLedger::new(0.0).multiplier(), DEFAULT_MULTIPLIER);
        assert_eq!(TicketLedger::new(1.1).multiplier(), 1.1);
    }

    #[test]
    fn effective_tickets_rounds() {
        let mut ledger = TicketLedger::default();
        ledger.apply_authoritative(&TicketSnapshot {
            ticket_count: 3,
            multiplier: 1.25,
            ad_views: 3,
        });
        // 3 * 1.25 = 3.75
        assert_eq!(ledger.effective_tickets(), 4);
        ledger.set_my_multiplier(1.1).unwrap();
        // 3.3
        assert_eq!(ledger.effective_tickets(), 3);
    }

    #[test]
    fn ad_view_credits_reported_amount_only() {
        let mut ledger = TicketLedger::default();
        ledger.set_my_multiplier(3.0).unwrap();
        assert_eq!(ledger.apply_ad_view(&event(true, true, 1)), AdViewOutcome::Credited { tickets: 1 });
        assert_eq!(ledger.my_tickets(), 1);
        assert_eq!(ledger.ad_views(), 1);
    }

    #[test]
    fn ad_view_without_ticket_counts_view() {
        let mut ledger = TicketLedger::default();
        assert_eq!(ledger.apply_ad_view(&event(true, false, 4)), AdViewOutcome::Counted);
        assert_eq!(ledger.my_tickets(), 0);
        assert_eq!(ledger.ad_views(), 1);

        assert_eq!(ledger.apply_ad_view(&event(false, true, 4)), AdViewOutcome::NotEarned);
        assert_eq!(ledger.my_tickets(), 0);
        assert_eq!(ledger.ad_views(), 1);
    }

    #[test]
    fn skipped_ad_view_changes_nothing() {
        let mut ledger = TicketLedger::default();
        let skipped = AdViewEvent::skipped(Uuid::new_v4(), ledger.multiplier());
        assert_eq!(ledger.apply_ad_view(&skipped), AdViewOutcome::NotEarned);
        assert_eq!(ledger.my_tickets(), 0);
        assert_eq!(ledger.ad_views(), 0);
    }

    #[test]
    fn fetch_started_before_increment_still_replaces() {
        let mut ledger = TicketLedger::default();
        let ticket = ledger.begin_fetch();
        ledger.apply_ad_view(&event(true, true, 1));
        assert_eq!(ledger.my_tickets(), 1);

        // Server snapshot already includes the view.
        let snapshot = TicketSnapshot { ticket_count: 1, multiplier: 1.0, ad_views: 1 };
        assert_eq!(ledger.apply_fetch(ticket, &snapshot), FetchOutcome::Applied);
        assert_eq!(ledger.my_tickets(), 1);
        assert_eq!(ledger.pending(), 0);
    }

    #[test]
    fn stale_fetch_does_not_overwrite_newer() {
        let mut ledger = TicketLedger::default();
        let older = ledger.begin_fetch();
        let newer = ledger.begin_fetch();
        ledger.apply_fetch(newer, &TicketSnapshot { ticket_count: 9, multiplier: 1.0, ad_views: 9 });
        let outcome = ledger.apply_fetch(older, &TicketSnapshot { ticket_count: 2, multiplier: 1.0, ad_views: 2 });
        assert_eq!(outcome, FetchOutcome::Stale);
        assert_eq!(ledger.my_tickets(), 9);
    }

    #[test]
    fn authoritative_snapshot_keeps_multiplier_when_invalid() {
        let mut ledger = TicketLedger::new(1.5);
        ledger.apply_authoritative(&TicketSnapshot { ticket_count: 4, multiplier: 0.0, ad_views: 2 });
        assert_eq!(ledger.my_tickets(), 4);
        assert_eq!(ledger.multiplier(), 1.5);
    }

    #[test]
    fn snapshot_deserializes_with_defaults() {
        let snap: TicketSnapshot = serde_json::from_str(r#"{"ticketCount":12}"#).unwrap();
        assert_eq!(snap.ticket_count, 12);
        assert_eq!(snap.multiplier, 1.0);
        assert_eq!(snap.ad_views, 0);
    }
}
