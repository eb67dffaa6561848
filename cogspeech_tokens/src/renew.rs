//! Timers driving background token renewal

use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{self, Instant, Interval, MissedTickBehavior};

/// A recurring schedule on which renewal is attempted
#[async_trait]
pub trait RenewTimer: Send + 'static {
    /// Waits until the next renewal is due
    ///
    /// Returns `false` once the schedule has ended and no more ticks will follow.
    async fn tick(&mut self) -> bool;
}

/// A renewal timer backed by a tokio interval
///
/// The first tick is due one full period after the timer is created.
#[derive(Debug)]
pub struct IntervalTimer {
    interval: Interval,
}

impl IntervalTimer {
    /// Constructs a timer that ticks every `period`
    ///
    /// Must be called from within a tokio runtime. Periods shorter than one millisecond
    /// are rounded up.
    pub fn new(period: Duration) -> Self {
        let period = period.max(Duration::from_millis(1));
        let mut interval = time::interval_at(Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self { interval }
    }

    /// The time between ticks
    pub fn period(&self) -> Duration {
        self.interval.period()
    }
}

#[async_trait]
impl RenewTimer for IntervalTimer {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}
