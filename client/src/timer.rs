//! Repeating tasks with guaranteed cancellation: dropping the handle aborts
//! the underlying task, so a ticker can never outlive the room session that
//! created it.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// A repeating callback on a fixed period. The first invocation happens one
/// full period after creation.
pub struct Ticker {
    handle: JoinHandle<()>,
}

impl Ticker {
    pub fn every<F>(period: Duration, mut tick: F) -> Self
    where
        F: FnMut() + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            let mut timer = interval(period);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // interval fires immediately once; swallow that so the first
            // callback lands a full period in.
            timer.tick().await;
            loop {
                timer.tick().await;
                tick();
            }
        });
        Self { handle }
    }
}

impl Drop for Ticker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
