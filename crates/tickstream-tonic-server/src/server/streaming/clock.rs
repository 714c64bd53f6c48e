use chrono::{DateTime, Local};
use core::time::Duration;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// A source of periodic ticks.
///
/// Each session owns exactly one clock; dropping it releases the underlying
/// timer.
pub trait ClockSource: Send {
    /// Waits for the next tick and returns the wall-clock time it fired at.
    fn tick(&mut self) -> impl Future<Output = DateTime<Local>> + Send;
}

/// A [`ClockSource`] backed by a [`tokio::time::Interval`].
///
/// The first tick fires one full period after construction. The monotonic
/// interval only paces the ticks; each one reports the system wall clock read
/// when it fires.
///
/// A consumer that falls behind skips missed ticks instead of receiving a
/// burst of stale ones.
#[derive(Debug)]
pub struct IntervalClock {
    interval: Interval,
}

impl IntervalClock {
    /// # Panics
    ///
    /// Panics if `period` is zero.
    pub fn new(period: Duration) -> Self {
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Self { interval }
    }
}

impl ClockSource for IntervalClock {
    async fn tick(&mut self) -> DateTime<Local> {
        self.interval.tick().await;
        Local::now()
    }
}
