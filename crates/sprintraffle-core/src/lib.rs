//! # Sprintraffle Core Library
//!
//! Client-side logic for a time-boxed ad-watching raffle: users watch ads
//! during recurring "sprints" and earn raffle tickets for each confirmed view.
//! The `sprintraffle` CLI is a thin layer over this crate.
//!
//! ## Architecture
//!
//! - **Sprint Clock**: pure projections from `(sprint, now)` to phase,
//!   remaining time and countdown text, plus a scoped 1-second ticker
//! - **Sprint Store**: last-known sprint snapshots, replaced wholesale
//! - **Ticket Ledger**: server-confirmed tickets plus an optimistic delta
//! - **Session**: the injected context tying the above to a [`RaffleApi`]
//! - **Storage**: SQLite key-value credentials and TOML configuration
//!
//! ## Key Components
//!
//! - [`RaffleSession`]: per-user state container
//! - [`HttpApi`]: reqwest client for the raffle backend
//! - [`Config`]: application configuration management
//! - [`Event`]: what every session operation reports

pub mod ads;
pub mod api;
pub mod error;
pub mod events;
pub mod ledger;
pub mod locale;
pub mod sequence;
pub mod session;
pub mod sprint;
pub mod storage;

pub use ads::{Ad, AdType, AdViewEvent, AdViewGuard, AdViewPolicy, AdViewRequest, AdViewResponse};
pub use api::{HttpApi, RaffleApi, ServerTimeEvent};
pub use error::{Alert, AdViewError, ApiError, ConfigError, CoreError, DatabaseError, ValidationError};
pub use events::Event;
pub use ledger::{AdViewOutcome, LedgerView, TicketLedger, TicketSnapshot};
pub use locale::Locale;
pub use sequence::{FetchOutcome, FetchTicket};
pub use session::{RaffleSession, SprintRefresh};
pub use sprint::{
    Clock, FixedClock, Phase, ServerClock, Sprint, SprintSchedule, SprintStatus, SprintStore,
    SprintTicker, SystemClock, TickSnapshot,
};
pub use storage::{Config, CredentialStore, Database, User, UserRole};
