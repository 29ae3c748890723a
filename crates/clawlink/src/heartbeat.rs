//! Per-connection heartbeat timer.
//!
//! A [`Heartbeat`] is created when a connection reaches `Ready` and dropped
//! with it, so there is never more than one timer per connection and no
//! timer outlives its socket.

use std::time::Duration;

use tokio::time::{self, Instant, Interval, MissedTickBehavior};

pub(crate) struct Heartbeat {
    interval: Interval,
    beats: u64,
}

impl Heartbeat {
    /// Starts a timer whose first beat is one full `period` from now.
    ///
    /// `period` must be non-zero (`ClientConfig::validated` guarantees it).
    pub(crate) fn start(period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        // A stalled task should send one heartbeat when it wakes, not a burst.
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        tracing::trace!(?period, "heartbeat started");
        Self { interval, beats: 0 }
    }

    /// Waits for the next beat and returns its 1-based sequence number.
    ///
    /// Cancel-safe, so it can sit in a `tokio::select!` branch.
    pub(crate) async fn tick(&mut self) -> u64 {
        self.interval.tick().await;
        self.beats += 1;
        self.beats
    }
}
