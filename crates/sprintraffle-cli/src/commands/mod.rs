pub mod ad;
pub mod auth;
pub mod config;
pub mod format;
pub mod sprint;
pub mod tickets;

use serde::Serialize;
use std::error::Error;
use std::future::Future;
use std::sync::Arc;

use sprintraffle_core::{Config, CoreError, CredentialStore, Event, HttpApi, RaffleSession, SystemClock};

pub type CliResult<T = ()> = Result<T, Box<dyn Error>>;

/// Everything a networked command needs: config, API client and a fresh session.
pub struct Context {
    pub config: Config,
    pub api: HttpApi,
    pub session: RaffleSession,
}

impl Context {
    pub fn open() -> CliResult<Self> {
        let config = Config::load()?;
        let credentials = CredentialStore::open()?;
        let api = HttpApi::from_config(&config, credentials)?;
        let session = RaffleSession::start(&config, Arc::new(SystemClock));
        Ok(Self {
            config,
            api,
            session,
        })
    }
}

/// Run a future to completion on a single-threaded runtime.
pub fn block_on<F: Future>(future: F) -> CliResult<F::Output> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    Ok(runtime.block_on(future))
}

pub fn print_json<T: Serialize>(value: &T) -> CliResult {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// One event per line.
pub fn print_events(events: &[Event]) -> CliResult {
    for event in events {
        println!("{}", serde_json::to_string(event)?);
    }
    Ok(())
}

/// Text shown for a failed command: the alert message for core errors,
/// the plain error otherwise.
pub fn error_message(err: &(dyn Error + 'static)) -> String {
    match err.downcast_ref::<CoreError>() {
        Some(core) => core.alert(Config::load_or_default().ui.locale).message,
        None => err.to_string(),
    }
}
