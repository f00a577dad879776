//! Request sequencing for authoritative fetches.
//!
//! A fetch started earlier may complete later. Each fetch takes a ticket when
//! it starts; a result is only applied if no later-started fetch has already
//! been applied.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct FetchTicket(u64);

impl FetchTicket {
    pub fn seq(self) -> u64 {
        self.0
    }
}

/// Whether an authoritative result made it into local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FetchOutcome {
    Applied,
    Stale,
}

#[derive(Debug, Default)]
pub struct FetchSequencer {
    issued: u64,
    applied: Option<u64>,
}

impl FetchSequencer {
    pub fn begin(&mut self) -> FetchTicket {
        self.issued += 1;
        FetchTicket(self.issued)
    }

    /// Record `ticket` as applied if it is newer than anything applied so far.
    pub fn admit(&mut self, ticket: FetchTicket) -> FetchOutcome {
        match self.applied {
            Some(last) if ticket.0 <= last => FetchOutcome::Stale,
            _ => {
                self.applied = Some(ticket.0);
                FetchOutcome::Applied
            }
        }
    }

    pub fn last_applied(&self) -> Option<FetchTicket> {
        self.applied.map(FetchTicket)
    }
}
