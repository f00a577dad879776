//! Sprint clock: pure projections from `(sprint, now)` to what the UI shows.
//!
//! Nothing here owns a timer. The 1-second refresh lives in
//! [`super::ticker::SprintTicker`], which calls back into these functions.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use super::types::{Phase, Sprint, SprintSchedule, SprintStatus};
use crate::locale::Locale;

/// Placeholder rendered instead of a countdown when nothing remains.
pub const COUNTDOWN_PLACEHOLDER: &str = "--:--";

/// Largest server/device clock offset accepted from a time sync.
pub const MAX_CLOCK_OFFSET_DAYS: i64 = 366;

/// Source of "now" for the clock.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock of this device.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Device clock corrected by the offset observed against server time.
#[derive(Debug, Clone, Copy)]
pub struct ServerClock {
    offset: Duration,
}

impl ServerClock {
    pub fn new(offset: Duration) -> Self {
        Self { offset }
    }

    /// Offset = server time minus the local time at which it was observed.
    pub fn from_observation(server_now: DateTime<Utc>, local_now: DateTime<Utc>) -> Self {
        Self::new(server_now - local_now)
    }

    pub fn offset(&self) -> Duration {
        self.offset
    }
}

impl Clock for ServerClock {
    /// Falls back to the device clock if the offset would leave chrono's range.
    fn now(&self) -> DateTime<Utc> {
        let local = Utc::now();
        local.checked_add_signed(self.offset).unwrap_or(local)
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock().unwrap_or_else(|e| e.into_inner()) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut guard = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *guard += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Phase of the sprint occurrence at `now`.
///
/// `[start, end)` is active; the end instant already counts as ended.
pub fn derive_phase(sprint: &Sprint, now: DateTime<Utc>) -> Phase {
    if now < sprint.start_date {
        Phase::Upcoming
    } else if now < sprint.end_date {
        Phase::Active
    } else {
        Phase::Ended
    }
}

/// Time until the next boundary, never negative.
pub fn time_remaining(sprint: &Sprint, now: DateTime<Utc>) -> Duration {
    let remaining = match derive_phase(sprint, now) {
        Phase::Upcoming => sprint.start_date - now,
        Phase::Active => sprint.end_date - now,
        Phase::Ended => Duration::zero(),
    };
    remaining.max(Duration::zero())
}

/// `M:SS` below one hour, `H:MM:SS` from one hour on. Non-positive input is `0:00`.
pub fn format_countdown(ms: i64) -> String {
    let total_secs = ms.max(0) / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    }
}

/// Name of a day-of-week index; empty for anything outside `0..=6`.
pub fn day_name(day_of_week: i32, locale: Locale) -> &'static str {
    usize::try_from(day_of_week)
        .ok()
        .and_then(|i| locale.day_names().get(i).copied())
        .unwrap_or("")
}

/// Status to display for a sprint.
///
/// The time-derived phase always wins for upcoming/active/ended, so a stale
/// server `active` past `end_date` shows as ended. Server-only states
/// (`drawing`, `completed`) are honored once the window has ended.
pub fn display_status(sprint: &Sprint, now: DateTime<Utc>) -> SprintStatus {
    match derive_phase(sprint, now) {
        Phase::Ended => match sprint.status {
            s @ (SprintStatus::Drawing | SprintStatus::Completed) => s,
            _ => SprintStatus::Ended,
        },
        phase => phase.into(),
    }
}

/// Countdown text, or [`COUNTDOWN_PLACEHOLDER`] when nothing remains.
pub fn countdown_label(sprint: &Sprint, now: DateTime<Utc>) -> String {
    let remaining = time_remaining(sprint, now).num_milliseconds();
    if remaining > 0 {
        format_countdown(remaining)
    } else {
        COUNTDOWN_PLACEHOLDER.to_string()
    }
}

/// Schedule metadata for `current` as seen at `now`.
pub fn build_schedule(current: &Sprint, next: Option<&Sprint>, now: DateTime<Utc>) -> SprintSchedule {
    let until = |at: DateTime<Utc>| {
        let ms = (at - now).num_milliseconds();
        (ms > 0).then_some(ms)
    };
    SprintSchedule {
        sprint: current.clone(),
        next_sprint: next.cloned(),
        time_until_start: until(current.start_date),
        time_until_end: until(current.end_date),
        is_active: derive_phase(current, now) == Phase::Active,
    }
}

/// When winners are announced: `delay` after the end of the window.
pub fn announcement_time(sprint: &Sprint, delay: Duration) -> DateTime<Utc> {
    sprint.end_date.checked_add_signed(delay).unwrap_or(sprint.end_date)
}

/// Everything one UI refresh needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickSnapshot {
    pub sprint_id: String,
    pub phase: Phase,
    pub status: SprintStatus,
    pub remaining_ms: i64,
    pub countdown: String,
    pub at: DateTime<Utc>,
}

impl TickSnapshot {
    pub fn capture(sprint: &Sprint, now: DateTime<Utc>) -> Self {
        Self {
            sprint_id: sprint.id.clone(),
            phase: derive_phase(sprint, now),
            status: display_status(sprint, now),
            remaining_ms: time_remaining(sprint, now).num_milliseconds(),
            countdown: countdown_label(sprint, now),
            at: now,
        }
    }
}
