//! Interval scheduler for automatic syncs.
//!
//! One task owns the ticker. Interval changes re-arm it through a watch
//! channel, which drops the old ticker before the new one is created, so a
//! replaced cadence can never fire again. Arming (and re-arming) fires an
//! immediate first tick.

use tokio::sync::watch;
use tokio::time::{interval, MissedTickBehavior};

use chrono::{DateTime, Duration, Utc};

use crate::settings::SyncInterval;
use crate::sync::SyncEngine;

/// Handle for re-arming the ticker and reading the next expected run.
#[derive(Clone)]
pub struct SchedulerHandle {
    interval_tx: watch::Sender<SyncInterval>,
    next_run_rx: watch::Receiver<Option<DateTime<Utc>>>,
}

impl SchedulerHandle {
    /// Point the ticker at a new cadence; takes effect immediately.
    pub fn rearm(&self, interval: SyncInterval) {
        // Only fails when the scheduler task is gone, i.e. at shutdown
        let _ = self.interval_tx.send(interval);
    }

    /// When the next automatic run is expected, once the timer has fired at
    /// least once.
    pub fn next_run(&self) -> Option<DateTime<Utc>> {
        *self.next_run_rx.borrow()
    }
}

/// Spawn the scheduler task armed with `initial`.
pub fn spawn(engine: SyncEngine, initial: SyncInterval) -> SchedulerHandle {
    let (interval_tx, interval_rx) = watch::channel(initial);
    let (next_run_tx, next_run_rx) = watch::channel(None);
    tokio::spawn(run(engine, interval_rx, next_run_tx));
    SchedulerHandle {
        interval_tx,
        next_run_rx,
    }
}

async fn run(
    engine: SyncEngine,
    mut interval_rx: watch::Receiver<SyncInterval>,
    next_run_tx: watch::Sender<Option<DateTime<Utc>>>,
) {
    loop {
        let period = interval_rx.borrow_and_update().period();
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        log::info!("Sync timer armed, period {} seconds", period.as_secs());

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let next = Utc::now() + Duration::seconds(period.as_secs() as i64);
                    let _ = next_run_tx.send(Some(next));
                    engine.run_scheduled_sync().await;
                }
                changed = interval_rx.changed() => {
                    match changed {
                        // Re-arm with the new interval
                        Ok(()) => break,
                        // All handles dropped, shut down
                        Err(_) => return,
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
