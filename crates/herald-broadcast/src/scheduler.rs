//! Minute-tick schedule evaluation.
//!
//! A match is pure string equality of the current `"HH:MM"` (in the
//! configured fixed UTC offset) against the weekday slot's target. No
//! state is kept between ticks, so if the process is down — or the loop
//! is delayed past the boundary — during the matching minute, that day's
//! trigger is missed. Known limitation, kept for simplicity; there is no
//! catch-up.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, FixedOffset, Utc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use herald_config::BroadcastStore;
use herald_types::{BroadcastConfig, DayClass};

use crate::confirm::ConfirmationGate;

/// Evaluates the schedule once per minute and asks the gate for
/// confirmation on an exact match.
pub struct Scheduler {
    store: BroadcastStore,
    gate: Arc<ConfirmationGate>,
    offset: FixedOffset,
}

impl Scheduler {
    pub fn new(store: BroadcastStore, gate: Arc<ConfirmationGate>, offset: FixedOffset) -> Self {
        Self { store, gate, offset }
    }

    /// Run the evaluation loop, aligned to minute boundaries. Config is
    /// re-read every tick; a corrupt config skips the tick rather than
    /// killing the loop. Exits on cancellation.
    pub async fn run(&self, cancel: CancellationToken) {
        info!(offset = %self.offset, "Scheduler started");
        loop {
            let wait = until_next_minute(Utc::now().with_timezone(&self.offset));
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(wait) => {}
            }

            let now = Utc::now().with_timezone(&self.offset);
            let config = match self.store.load() {
                Ok(config) => config,
                Err(e) => {
                    error!("Skipping tick, cannot load broadcast config: {e}");
                    continue;
                }
            };

            debug!(stamp = %minute_stamp(now), "Scheduler tick");

            if should_trigger(&config, now) {
                info!(stamp = %minute_stamp(now), "Schedule matched, requesting confirmation");
                self.gate.request_confirmation().await;
            }
        }
        info!("Scheduler stopped");
    }
}

/// The `"HH:MM"` stamp of the current minute.
fn minute_stamp(now: DateTime<FixedOffset>) -> String {
    now.format("%H:%M").to_string()
}

/// Whether `now` exactly matches the slot for its weekday.
fn should_trigger(config: &BroadcastConfig, now: DateTime<FixedOffset>) -> bool {
    let class = DayClass::for_weekday(now.weekday());
    config.schedule.target_for(class).matches(&minute_stamp(now))
}

/// Time until the next minute boundary. Never zero: exactly on a
/// boundary the full minute is returned, since the current minute was
/// just evaluated.
fn until_next_minute(now: DateTime<FixedOffset>) -> Duration {
    let into_minute = now.timestamp().rem_euclid(60) as u64;
    Duration::from_secs(60 - into_minute)
}
