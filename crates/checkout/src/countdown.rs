//! Retry-window countdown.
//!
//! The payment-failure screen shows how long the retry action remains on
//! offer. [`RetryCountdown::remaining_at`] is the pure derived-state half;
//! [`RetryCountdown::run`] ticks once per second and returns exactly once
//! when the window lapses, at which point the caller navigates away.
//! Dropping the future cancels the timer; nothing keeps ticking against a
//! stale deadline.

use chrono::{DateTime, Utc};
use std::time::Duration;

/// Time left in the retry window, for display as `MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRemaining {
    pub minutes: u64,
    pub seconds: u64,
}

impl TimeRemaining {
    /// Build from a whole number of seconds.
    #[must_use]
    pub const fn from_secs(total_seconds: u64) -> Self {
        Self {
            minutes: total_seconds / 60,
            seconds: total_seconds % 60,
        }
    }

    /// The total number of seconds remaining.
    #[must_use]
    pub const fn total_seconds(&self) -> u64 {
        self.minutes * 60 + self.seconds
    }
}

impl std::fmt::Display for TimeRemaining {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:02}:{:02}", self.minutes, self.seconds)
    }
}

/// Countdown toward a retry-window deadline.
#[derive(Debug, Clone, Copy)]
pub struct RetryCountdown {
    deadline: DateTime<Utc>,
}

impl RetryCountdown {
    /// Create a countdown toward `deadline`.
    #[must_use]
    pub const fn new(deadline: DateTime<Utc>) -> Self {
        Self { deadline }
    }

    /// Time remaining at `now`, or `None` once the deadline has passed.
    #[must_use]
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Option<TimeRemaining> {
        let seconds = (self.deadline - now).num_seconds();
        u64::try_from(seconds)
            .ok()
            .filter(|&s| s > 0)
            .map(TimeRemaining::from_secs)
    }

    /// Tick once per second, invoking `on_tick` with the remaining time, and
    /// return once the window lapses. The final tick is `00:00`; the return
    /// is the navigate-away signal and happens exactly once.
    pub async fn run<F>(self, mut on_tick: F)
    where
        F: FnMut(TimeRemaining),
    {
        let Some(initial) = self.remaining_at(Utc::now()) else {
            return;
        };
        let mut seconds_left = initial.total_seconds();

        let mut interval = tokio::time::interval(Duration::from_secs(1));
        // The first tick of a tokio interval completes immediately.
        interval.tick().await;

        while seconds_left > 0 {
            interval.tick().await;
            seconds_left -= 1;
            on_tick(TimeRemaining::from_secs(seconds_left));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    #[test]
    fn test_remaining_at_computes_minutes_and_seconds() {
        let now = Utc::now();
        let countdown = RetryCountdown::new(now + ChronoDuration::seconds(90));
        let remaining = countdown.remaining_at(now).expect("window still open");
        assert_eq!(remaining.minutes, 1);
        assert_eq!(remaining.seconds, 30);
        assert_eq!(remaining.to_string(), "01:30");
    }

    #[test]
    fn test_remaining_at_none_once_elapsed() {
        let now = Utc::now();
        let countdown = RetryCountdown::new(now - ChronoDuration::seconds(1));
        assert_eq!(countdown.remaining_at(now), None);

        let at_deadline = RetryCountdown::new(now);
        assert_eq!(at_deadline.remaining_at(now), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_down_and_finishes_once() {
        let countdown = RetryCountdown::new(Utc::now() + ChronoDuration::seconds(90));

        let mut ticks = Vec::new();
        countdown.run(|remaining| ticks.push(remaining.to_string())).await;

        assert_eq!(ticks.len(), 90);
        assert_eq!(ticks.first().map(String::as_str), Some("01:29"));
        assert_eq!(ticks.get(1).map(String::as_str), Some("01:28"));
        assert_eq!(ticks.last().map(String::as_str), Some("00:00"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_returns_immediately_when_already_elapsed() {
        let countdown = RetryCountdown::new(Utc::now() - ChronoDuration::seconds(5));
        let mut ticked = false;
        countdown.run(|_| ticked = true).await;
        assert!(!ticked);
    }
}
