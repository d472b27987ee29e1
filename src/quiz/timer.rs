// src/quiz/timer.rs

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Monotonic time source for countdowns and autosave scheduling.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset_ms: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset_ms: AtomicU64::new(0),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.offset_ms
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + Duration::from_millis(self.offset_ms.load(Ordering::SeqCst))
    }
}

/// Quiz countdown. Only time spent running counts against the limit.
#[derive(Debug, Clone, PartialEq)]
pub struct Countdown {
    limit: Duration,
    consumed: Duration,
    running_since: Option<Instant>,
}

impl Countdown {
    pub fn new(limit_secs: u64) -> Self {
        Self {
            limit: Duration::from_secs(limit_secs),
            consumed: Duration::ZERO,
            running_since: None,
        }
    }

    /// A stopped countdown with `time_left` of `limit_secs` remaining.
    pub fn resumed(limit_secs: u64, time_left: u64) -> Self {
        let limit = Duration::from_secs(limit_secs.max(time_left));
        Self {
            consumed: limit - Duration::from_secs(time_left),
            limit,
            running_since: None,
        }
    }

    pub fn start(&mut self, now: Instant) {
        if self.running_since.is_none() {
            self.running_since = Some(now);
        }
    }

    pub fn stop(&mut self, now: Instant) {
        if let Some(since) = self.running_since.take() {
            self.consumed += now.saturating_duration_since(since);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn limit_secs(&self) -> u64 {
        self.limit.as_secs()
    }

    fn elapsed(&self, now: Instant) -> Duration {
        let live = self
            .running_since
            .map(|since| now.saturating_duration_since(since))
            .unwrap_or_default();
        (self.consumed + live).min(self.limit)
    }

    /// Whole seconds left, rounded up so a fresh countdown shows its full limit.
    pub fn remaining_secs(&self, now: Instant) -> u64 {
        let left = self.limit - self.elapsed(now);
        let secs = left.as_secs();
        if left.subsec_nanos() > 0 { secs + 1 } else { secs }
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        self.elapsed(now) >= self.limit
    }

    /// Seconds used so far: limit minus what is left.
    pub fn spent_secs(&self, now: Instant) -> u64 {
        self.limit_secs() - self.remaining_secs(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_down_only_while_running() {
        let clock = ManualClock::new();
        let mut countdown = Countdown::new(1800);
        assert_eq!(countdown.remaining_secs(clock.now()), 1800);

        countdown.start(clock.now());
        clock.advance(Duration::from_secs(30));
        assert_eq!(countdown.remaining_secs(clock.now()), 1770);

        countdown.stop(clock.now());
        clock.advance(Duration::from_secs(10));
        assert_eq!(countdown.remaining_secs(clock.now()), 1770);

        countdown.start(clock.now());
        clock.advance(Duration::from_secs(5));
        assert_eq!(countdown.remaining_secs(clock.now()), 1765);
        assert_eq!(countdown.spent_secs(clock.now()), 35);
    }

    #[test]
    fn expires_at_zero_and_never_goes_negative() {
        let clock = ManualClock::new();
        let mut countdown = Countdown::new(3);
        countdown.start(clock.now());
        clock.advance(Duration::from_secs(2));
        assert!(!countdown.is_expired(clock.now()));

        clock.advance(Duration::from_secs(5));
        assert!(countdown.is_expired(clock.now()));
        assert_eq!(countdown.remaining_secs(clock.now()), 0);
    }

    #[test]
    fn partial_seconds_round_up() {
        let clock = ManualClock::new();
        let mut countdown = Countdown::new(10);
        countdown.start(clock.now());
        clock.advance(Duration::from_millis(400));
        assert_eq!(countdown.remaining_secs(clock.now()), 10);
    }

    #[test]
    fn resumed_keeps_remaining_time() {
        let clock = ManualClock::new();
        let countdown = Countdown::resumed(1800, 1200);
        assert_eq!(countdown.remaining_secs(clock.now()), 1200);
        assert_eq!(countdown.spent_secs(clock.now()), 600);
        assert!(!countdown.is_running());
    }
}
