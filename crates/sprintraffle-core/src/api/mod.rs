//! The backend contract consumed by a session.
//!
//! The session only ever talks to a [`RaffleApi`]; [`HttpApi`] is the real
//! implementation, tests plug in fakes.

mod http;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::future::Future;

use crate::ads::{Ad, AdViewRequest, AdViewResponse};
use crate::error::{ApiError, Result};
use crate::ledger::TicketSnapshot;
use crate::sprint::Sprint;

pub use http::HttpApi;

pub trait RaffleApi: Send + Sync {
    /// `None` when there is no active sprint.
    fn current_sprint(&self) -> impl Future<Output = Result<Option<Sprint>>> + Send;

    fn next_sprint(&self) -> impl Future<Output = Result<Option<Sprint>>> + Send;

    fn my_tickets(&self) -> impl Future<Output = Result<TicketSnapshot>> + Send;

    fn record_ad_view(
        &self,
        request: &AdViewRequest,
    ) -> impl Future<Output = Result<AdViewResponse>> + Send;

    /// Ads scheduled for a sprint, playable or not.
    fn active_ads(&self, sprint_id: &str) -> impl Future<Output = Result<Vec<Ad>>> + Send;

    fn server_time(&self) -> impl Future<Output = Result<DateTime<Utc>>> + Send;
}

/// One event of the server time stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTimeEvent {
    pub iso: String,
    /// Milliseconds since the epoch, sent as a string.
    pub epoch: String,
}

impl ServerTimeEvent {
    pub fn instant(&self) -> Result<DateTime<Utc>, ApiError> {
        if let Some(at) = self
            .epoch
            .parse::<i64>()
            .ok()
            .and_then(DateTime::from_timestamp_millis)
        {
            return Ok(at);
        }
        DateTime::parse_from_rfc3339(&self.iso)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| ApiError::Malformed(format!("server time: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_time_prefers_epoch() {
        let event = ServerTimeEvent {
            iso: "2000-01-01T00:00:00Z".into(),
            epoch: "1792328400000".into(),
        };
        assert_eq!(event.instant().unwrap().timestamp_millis(), 1_792_328_400_000);
    }

    #[test]
    fn server_time_falls_back_to_iso() {
        let event = ServerTimeEvent {
            iso: "2026-10-18T12:00:00Z".into(),
            epoch: "soon".into(),
        };
        assert_eq!(event.instant().unwrap().to_rfc3339(), "2026-10-18T12:00:00+00:00");
    }

    #[test]
    fn server_time_rejects_garbage() {
        let event = ServerTimeEvent {
            iso: "yesterday".into(),
            epoch: "".into(),
        };
        assert!(matches!(event.instant(), Err(ApiError::Malformed(_))));
    }
}
