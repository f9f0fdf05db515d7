use std::time::{Duration, Instant};
use tracing::debug;

const WINDOW: Duration = Duration::from_secs(60);

/// Result of asking the limiter for a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    /// The ceiling was hit. `first_in_window` is set for the first rejection
    /// of the current window only, so callers warn once per overflow episode.
    Rejected { first_in_window: bool },
}

/// Fixed one-minute window counter.
#[derive(Debug)]
pub struct RateLimiter {
    ceiling: u32,
    count: u32,
    dropped: u64,
    deadline: Instant,
}

impl RateLimiter {
    pub fn new(ceiling: u32, now: Instant) -> Self {
        RateLimiter {
            ceiling,
            count: 0,
            dropped: 0,
            deadline: now + WINDOW,
        }
    }

    pub fn allow(&mut self, now: Instant) -> bool {
        self.check(now) == RateDecision::Allowed
    }

    pub fn check(&mut self, now: Instant) -> RateDecision {
        if now >= self.deadline {
            self.roll_over(now);
        }

        if self.count < self.ceiling {
            self.count += 1;
            return RateDecision::Allowed;
        }

        self.dropped += 1;
        RateDecision::Rejected {
            first_in_window: self.dropped == 1,
        }
    }

    /// Events accepted in the current window.
    pub fn count(&self) -> u32 {
        self.count
    }

    /// Events rejected in the current window.
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    fn roll_over(&mut self, now: Instant) {
        if self.dropped > 0 {
            debug!(
                dropped = self.dropped,
                ceiling = self.ceiling,
                "rate limit window closed with dropped events"
            );
        }

        // Skip whole windows that elapsed without any traffic.
        while self.deadline <= now {
            self.deadline += WINDOW;
        }
        self.count = 0;
        self.dropped = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_first_rejection_is_flagged() {
        let start = Instant::now();
        let mut limiter = RateLimiter::new(1, start);

        assert_eq!(limiter.check(start), RateDecision::Allowed);
        assert_eq!(
            limiter.check(start),
            RateDecision::Rejected { first_in_window: true }
        );
        assert_eq!(
            limiter.check(start),
            RateDecision::Rejected { first_in_window: false }
        );

        let next = start + WINDOW;
        assert_eq!(limiter.check(next), RateDecision::Allowed);
        assert_eq!(
            limiter.check(next),
            RateDecision::Rejected { first_in_window: true }
        );
    }

    #[test]
    fn idle_windows_are_skipped() {
        let start = Instant::now();
        let mut limiter = RateLimiter::new(5, start);
        limiter.allow(start);

        let later = start + WINDOW * 3 + Duration::from_secs(1);
        assert!(limiter.allow(later));
        assert_eq!(limiter.count(), 1);
        assert_eq!(limiter.deadline, start + WINDOW * 4);
    }
}
