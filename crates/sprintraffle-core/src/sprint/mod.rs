mod clock;
mod store;
mod ticker;
mod types;

pub use clock::{
    announcement_time, build_schedule, countdown_label, day_name, derive_phase, display_status,
    format_countdown, time_remaining, Clock, FixedClock, ServerClock, SystemClock, TickSnapshot,
    COUNTDOWN_PLACEHOLDER, MAX_CLOCK_OFFSET_DAYS,
};
pub use store::SprintStore;
pub use ticker::{SprintTicker, TICK_PERIOD};
pub use types::{Phase, Sprint, SprintSchedule, SprintStatus};

#[cfg(test)]
pub(crate) use types::fixtures;
