//! Loop control shared between the tick loop and whoever may stop it.
//!
//! The tick loop checks the stop flag before every tick and races its nap
//! against [`LoopControl::stopped`], so a stop request interrupts the sleep
//! and no further tick begins. The engine binary requests a stop on Ctrl-C.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;

/// Reason the tick loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LoopEndReason {
    /// A stop was requested (shutdown signal).
    StopRequested,
    /// Reached the configured `max_ticks` bound.
    MaxTicksReached,
}

/// Shared stop state for a running personality.
///
/// Wrap in an `Arc` and hand a clone to the shutdown handler.
#[derive(Debug)]
pub struct LoopControl {
    stop_requested: AtomicBool,
    stop_notify: Notify,
    started_at: DateTime<Utc>,
}

impl LoopControl {
    /// Create a control in the running state.
    pub fn new() -> Self {
        Self {
            stop_requested: AtomicBool::new(false),
            stop_notify: Notify::new(),
            started_at: Utc::now(),
        }
    }

    /// Request that the loop stop before its next tick.
    pub fn request_stop(&self) {
        self.stop_requested.store(true, Ordering::Release);
        // notify_one stores a permit if the loop is not currently napping.
        self.stop_notify.notify_one();
    }

    /// Check whether a stop has been requested.
    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::Acquire)
    }

    /// Resolve once a stop has been requested.
    pub async fn stopped(&self) {
        while !self.is_stop_requested() {
            self.stop_notify.notified().await;
        }
    }

    /// Sleep for `duration` unless a stop arrives first.
    ///
    /// Returns `true` if the full duration elapsed, `false` if the sleep was
    /// cut short (or never started) because of a stop request.
    pub async fn nap(&self, duration: Duration) -> bool {
        if self.is_stop_requested() {
            return false;
        }
        tokio::select! {
            () = tokio::time::sleep(duration) => true,
            () = self.stopped() => false,
        }
    }

    /// Wall-clock time the control was created.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }
}

impl Default for LoopControl {
    fn default() -> Self {
        Self::new()
    }
}
