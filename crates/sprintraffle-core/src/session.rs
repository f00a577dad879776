//! One signed-in user's raffle state.
//!
//! A [`RaffleSession`] is built at sign-in and passed to whatever needs it.
//! It owns the sprint store, the ticket ledger and the ad-view guard; every
//! operation returns the [`Event`]s it produced. API failures leave the
//! previous snapshots untouched and come back as errors.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::ads::{pick_next_ad, Ad, AdViewEvent, AdViewGuard, AdViewPolicy, AdViewRequest};
use crate::api::RaffleApi;
use crate::error::{AdViewError, ApiError, CoreError, Result};
use crate::events::Event;
use crate::ledger::{AdViewOutcome, LedgerView, TicketLedger};
use crate::locale::Locale;
use crate::sequence::{FetchOutcome, FetchTicket};
use crate::sprint::{
    build_schedule, derive_phase, Clock, ServerClock, Sprint, SprintSchedule, SprintStatus,
    SprintStore, SprintTicker, SystemClock, TickSnapshot, COUNTDOWN_PLACEHOLDER,
    MAX_CLOCK_OFFSET_DAYS,
};
use crate::storage::Config;

/// Tickets for one in-progress sprint refresh.
#[derive(Debug, Clone, Copy)]
pub struct SprintRefresh {
    current: FetchTicket,
    next: FetchTicket,
}

pub struct RaffleSession {
    clock: Arc<dyn Clock>,
    locale: Locale,
    tick_interval: Duration,
    policy: AdViewPolicy,
    default_multiplier: f64,
    sprints: SprintStore,
    ledger: TicketLedger,
    guard: AdViewGuard,
    /// Confirmed views per sprint id.
    views: HashMap<String, u32>,
    last_ad_view: Option<AdViewEvent>,
}

impl RaffleSession {
    pub fn start(config: &Config, clock: Arc<dyn Clock>) -> Self {
        tracing::debug!(locale = %config.ui.locale, "raffle session started");
        Self {
            clock,
            locale: config.ui.locale,
            tick_interval: config.tick_interval(),
            policy: config.ad_view_policy(),
            default_multiplier: config.raffle.default_multiplier,
            sprints: SprintStore::new(),
            ledger: TicketLedger::new(config.raffle.default_multiplier),
            guard: AdViewGuard::default(),
            views: HashMap::new(),
            last_ad_view: None,
        }
    }

    /// Drop all in-memory state, as on sign-out.
    pub fn end(&mut self) {
        self.sprints = SprintStore::new();
        self.ledger = TicketLedger::new(self.default_multiplier);
        self.guard = AdViewGuard::default();
        self.views.clear();
        self.last_ad_view = None;
        tracing::debug!("raffle session ended");
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn current_sprint(&self) -> Option<Arc<Sprint>> {
        self.sprints.current()
    }

    pub fn next_sprint(&self) -> Option<Arc<Sprint>> {
        self.sprints.next()
    }

    pub fn schedule(&self) -> Option<Arc<SprintSchedule>> {
        self.sprints.schedule()
    }

    pub fn ledger(&self) -> &TicketLedger {
        &self.ledger
    }

    pub fn tickets(&self) -> LedgerView {
        self.ledger.view()
    }

    /// Confirmed ad views for the current sprint.
    pub fn views_this_sprint(&self) -> u32 {
        self.sprints
            .current()
            .and_then(|s| self.views.get(&s.id).copied())
            .unwrap_or(0)
    }

    /// The most recent completed or skipped playback.
    pub fn last_ad_view(&self) -> Option<&AdViewEvent> {
        self.last_ad_view.as_ref()
    }

    /// Countdown state of the current sprint, without side effects.
    pub fn snapshot(&self) -> Option<TickSnapshot> {
        self.sprints
            .current()
            .map(|s| TickSnapshot::capture(&s, self.clock.now()))
    }

    // ── Ticking ──────────────────────────────────────────────────────

    /// Start a UI refresh ticker. Must be called inside a tokio runtime;
    /// the ticker stops when dropped.
    pub fn ticker(&self) -> SprintTicker {
        SprintTicker::start(self.tick_interval)
    }

    /// One refresh: expire the current sprint locally if its window has
    /// passed, recompute the schedule, then report the countdown.
    pub fn tick(&mut self) -> Vec<Event> {
        let now = self.clock.now();
        let mut events = Vec::new();
        if let Some(sprint_id) = self.sprints.expire_if_elapsed(now) {
            events.push(Event::SprintStatusChanged {
                sprint_id,
                status: SprintStatus::Ended,
                at: now,
            });
        }
        self.rebuild_schedule(now);
        let event = match self.sprints.current() {
            Some(sprint) => {
                let snap = TickSnapshot::capture(&sprint, now);
                Event::Tick {
                    sprint_id: Some(snap.sprint_id),
                    phase: Some(snap.phase),
                    status: Some(snap.status),
                    remaining_ms: snap.remaining_ms,
                    countdown: snap.countdown,
                    at: now,
                }
            }
            None => Event::Tick {
                sprint_id: None,
                phase: None,
                status: None,
                remaining_ms: 0,
                countdown: COUNTDOWN_PLACEHOLDER.to_string(),
                at: now,
            },
        };
        events.push(event);
        events
    }

    // ── Sprints ──────────────────────────────────────────────────────

    /// Fetch current and next sprint and apply both.
    pub async fn refresh_sprints<A: RaffleApi>(&mut self, api: &A) -> Result<Vec<Event>> {
        let refresh = self.begin_sprint_refresh();
        let (current, next) = tokio::join!(api.current_sprint(), api.next_sprint());
        self.finish_sprint_refresh(refresh, current, next)
    }

    /// Issue sequence tickets for a refresh whose requests run elsewhere.
    pub fn begin_sprint_refresh(&mut self) -> SprintRefresh {
        SprintRefresh {
            current: self.sprints.begin_current_fetch(),
            next: self.sprints.begin_next_fetch(),
        }
    }

    /// Apply the results of a refresh started with [`begin_sprint_refresh`].
    ///
    /// A failed current-sprint fetch changes nothing. A failed next-sprint
    /// fetch keeps the previous next sprint.
    ///
    /// [`begin_sprint_refresh`]: Self::begin_sprint_refresh
    pub fn finish_sprint_refresh(
        &mut self,
        refresh: SprintRefresh,
        current: Result<Option<Sprint>>,
        next: Result<Option<Sprint>>,
    ) -> Result<Vec<Event>> {
        let current = current?;
        let now = self.clock.now();

        if self.sprints.apply_current_fetch(refresh.current, current) == FetchOutcome::Stale {
            return Ok(vec![Event::SprintFetchStale {
                seq: refresh.current.seq(),
                at: now,
            }]);
        }
        match next {
            Ok(next) => {
                self.sprints.apply_next_fetch(refresh.next, next);
            }
            Err(e) => tracing::warn!(error = %e, "next sprint fetch failed, keeping previous"),
        }

        self.rebuild_schedule(now);
        let current = self.sprints.current();
        let next = self.sprints.next();
        self.forget_other_sprints(current.as_deref().map(|s| s.id.as_str()));
        tracing::info!(
            sprint_id = current.as_deref().map(|s| s.id.as_str()),
            next_sprint_id = next.as_deref().map(|s| s.id.as_str()),
            "sprints refreshed"
        );
        Ok(vec![Event::SprintFetched {
            sprint_id: current.map(|s| s.id.clone()),
            next_sprint_id: next.map(|s| s.id.clone()),
            at: now,
        }])
    }

    /// Schedule for the current snapshot pair as seen at `now`.
    fn rebuild_schedule(&mut self, now: DateTime<Utc>) {
        let current = self.sprints.current();
        let next = self.sprints.next();
        match current.as_deref() {
            Some(sprint) => self
                .sprints
                .set_schedule(build_schedule(sprint, next.as_deref(), now)),
            None => self.sprints.clear_schedule(),
        }
    }

    /// Per-sprint view counts and settled request ids only matter while
    /// their sprint is current.
    fn forget_other_sprints(&mut self, current: Option<&str>) {
        self.views.retain(|sprint_id, _| Some(sprint_id.as_str()) == current);
        self.guard.retain_sprint(current);
    }

    // ── Tickets ──────────────────────────────────────────────────────

    /// Replace the ledger with the server's figures.
    pub async fn refresh_tickets<A: RaffleApi>(&mut self, api: &A) -> Result<Vec<Event>> {
        let ticket = self.ledger.begin_fetch();
        let snapshot = api.my_tickets().await?;
        if self.ledger.apply_fetch(ticket, &snapshot) == FetchOutcome::Stale {
            return Ok(Vec::new());
        }
        Ok(vec![Event::TicketsConfirmed {
            tickets: self.ledger.my_tickets(),
            multiplier: self.ledger.multiplier(),
            at: self.clock.now(),
        }])
    }

    // ── Ads ──────────────────────────────────────────────────────────

    /// Pick the next ad to play during the current sprint, uniformly among
    /// the playable ones. `None` without a sprint or a playable ad.
    pub async fn next_ad<A: RaffleApi>(&self, api: &A) -> Result<Option<Ad>> {
        let Some(sprint) = self.sprints.current() else {
            return Ok(None);
        };
        let ads = api.active_ads(&sprint.id).await?;
        let picked = pick_next_ad(&ads, self.clock.now(), &mut rand::thread_rng()).cloned();
        tracing::debug!(
            sprint_id = %sprint.id,
            offered = ads.len(),
            ad_id = picked.as_ref().map(|ad| ad.id.as_str()),
            "next ad picked"
        );
        Ok(picked)
    }

    /// Report a finished ad playback.
    ///
    /// The same `request_id` is accepted once; a second completion fails
    /// with [`AdViewError::Duplicate`] without touching the ledger.
    pub async fn record_ad_view<A: RaffleApi>(
        &mut self,
        api: &A,
        ad_id: &str,
        view_duration_secs: u64,
        request_id: Option<Uuid>,
    ) -> Result<Vec<Event>> {
        let request_id = request_id.unwrap_or_else(Uuid::new_v4);
        self.guard.begin(request_id)?;

        let now = self.clock.now();
        let sprint = self.sprints.current();
        let phase = sprint.as_deref().map(|s| derive_phase(s, now));
        let preflight = self
            .policy
            .check(phase, view_duration_secs, self.views_this_sprint());
        let sprint = match (preflight, sprint) {
            (Ok(()), Some(sprint)) => sprint,
            (Err(e @ AdViewError::TooShort { .. }), _) => {
                self.last_ad_view = Some(AdViewEvent::skipped(request_id, self.ledger.multiplier()));
                return Err(self.reject_early(request_id, e));
            }
            (Err(e), _) => return Err(self.reject_early(request_id, e)),
            (Ok(()), None) => return Err(self.reject_early(request_id, AdViewError::SprintNotActive)),
        };

        let request = AdViewRequest {
            request_id,
            sprint_id: sprint.id.clone(),
            ad_id: ad_id.to_string(),
            view_duration_secs,
        };
        let response = match api.record_ad_view(&request).await {
            Ok(response) => response,
            Err(e) => {
                self.guard.abandon(request_id);
                return Err(e);
            }
        };
        self.guard.settle(request_id, &sprint.id);

        let view = AdViewEvent::confirmed(request_id, response);
        let at = self.clock.now();
        let outcome = self.ledger.apply_ad_view(&view);
        if outcome != AdViewOutcome::NotEarned {
            *self.views.entry(sprint.id.clone()).or_insert(0) += 1;
        }
        let event = match outcome {
            AdViewOutcome::Credited { tickets } => {
                tracing::info!(%request_id, tickets, my_tickets = self.ledger.my_tickets(), "ad view credited");
                Event::TicketsIncremented {
                    request_id,
                    delta: tickets,
                    my_tickets: self.ledger.my_tickets(),
                    at,
                }
            }
            AdViewOutcome::Counted => Event::AdViewCounted { request_id, at },
            AdViewOutcome::NotEarned => Event::AdViewRejected {
                request_id: Some(request_id),
                reason: view
                    .response
                    .as_ref()
                    .and_then(|r| r.message.clone())
                    .unwrap_or_else(|| "ad view was not accepted".to_string()),
                at,
            },
        };
        self.last_ad_view = Some(view);
        Ok(vec![event])
    }

    fn reject_early(&mut self, request_id: Uuid, reason: AdViewError) -> CoreError {
        self.guard.abandon(request_id);
        tracing::debug!(%request_id, %reason, "ad view rejected before sending");
        reason.into()
    }

    // ── Server time ──────────────────────────────────────────────────

    /// Correct the session clock by the server's time. Returns the offset.
    pub async fn sync_clock<A: RaffleApi>(&mut self, api: &A) -> Result<chrono::Duration> {
        let server_now = api.server_time().await?;
        let clock = ServerClock::from_observation(server_now, SystemClock.now());
        let offset_days = clock.offset().num_days();
        if offset_days.abs() > MAX_CLOCK_OFFSET_DAYS {
            return Err(ApiError::Malformed(format!(
                "server time {server_now} is {offset_days} days away from the device clock"
            ))
            .into());
        }
        tracing::debug!(offset_ms = clock.offset().num_milliseconds(), "clock synced with server");
        self.clock = Arc::new(clock);
        Ok(clock.offset())
    }
}
