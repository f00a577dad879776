//! The 1-second UI refresh tick.
//!
//! A [`SprintTicker`] is acquired by whatever view shows a countdown and is
//! released with it: dropping the ticker aborts the interval task, so no tick
//! outlives the view that asked for it.

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Default refresh period.
pub const TICK_PERIOD: Duration = Duration::from_millis(1000);

pub struct SprintTicker {
    rx: mpsc::Receiver<u64>,
    handle: Option<JoinHandle<()>>,
    alive: Weak<()>,
}

impl SprintTicker {
    /// Spawn the interval task on the current tokio runtime.
    ///
    /// The first tick fires immediately so a view can render before the first
    /// period has elapsed.
    pub fn start(period: Duration) -> Self {
        let (tx, rx) = mpsc::channel(1);
        let token = Arc::new(());
        let alive = Arc::downgrade(&token);

        let handle = tokio::spawn(async move {
            let _token = token;
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            let mut seq: u64 = 0;
            loop {
                interval.tick().await;
                seq += 1;
                match tx.try_send(seq) {
                    // A slow consumer only ever needs the latest tick.
                    Ok(()) | Err(mpsc::error::TrySendError::Full(_)) => {}
                    Err(mpsc::error::TrySendError::Closed(_)) => break,
                }
            }
        });

        tracing::debug!(period_ms = period.as_millis() as u64, "sprint ticker started");
        Self {
            rx,
            handle: Some(handle),
            alive,
        }
    }

    /// Wait for the next tick. Returns the tick sequence number, or `None`
    /// once the ticker has been stopped.
    pub async fn tick(&mut self) -> Option<u64> {
        self.rx.recv().await
    }

    pub fn is_running(&self) -> bool {
        self.alive.strong_count() > 0
    }

    /// Stop and wait until the interval task is gone.
    pub async fn stop(mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            let _ = handle.await;
        }
    }

    #[cfg(test)]
    fn liveness(&self) -> Weak<()> {
        self.alive.clone()
    }
}

impl Drop for SprintTicker {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
            tracing::debug!("sprint ticker released");
        }
    }
}
