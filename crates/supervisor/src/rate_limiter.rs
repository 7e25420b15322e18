//! Drop-based outbound rate limiting
//!
//! Frames faster than the target interval are discarded, never queued or
//! delayed. A source slower than the interval passes through untouched.

use std::time::Duration;

use tokio::time::Instant;

/// Default minimum spacing between forwarded frames (1/60 s)
pub const DEFAULT_FRAME_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / 60);

/// Stateless acceptance policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimiter {
    interval: Duration,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_FRAME_INTERVAL)
    }
}

impl RateLimiter {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    /// Target rate expressed as frames per second
    pub fn per_second(fps: u32) -> Self {
        Self::new(Duration::from_secs(1) / fps.max(1))
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// `true` iff `now >= last_sent + interval`. The boundary is inclusive.
    pub fn accept(&self, now: Instant, last_sent: Instant) -> bool {
        now.saturating_duration_since(last_sent) >= self.interval
    }
}

/// Limiter plus the last-forward timestamp of one session
#[derive(Debug, Clone)]
pub struct Throttle {
    limiter: RateLimiter,
    last_sent: Option<Instant>,
}

impl Default for Throttle {
    fn default() -> Self {
        Self::new(RateLimiter::default())
    }
}

impl Throttle {
    pub fn new(limiter: RateLimiter) -> Self {
        Self {
            limiter,
            last_sent: None,
        }
    }

    /// Whether a frame arriving at `now` may be forwarded.
    ///
    /// Nothing forwarded yet means the frame is always due.
    pub fn is_due(&self, now: Instant) -> bool {
        self.last_sent
            .map_or(true, |last| self.limiter.accept(now, last))
    }

    /// Record a forward at `now`. Never moves the timestamp backwards.
    pub fn mark(&mut self, now: Instant) {
        self.last_sent = Some(self.last_sent.map_or(now, |last| last.max(now)));
    }

    pub fn last_sent(&self) -> Option<Instant> {
        self.last_sent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_interval() {
        assert_eq!(RateLimiter::default().interval(), Duration::from_secs(1) / 60);
        assert_eq!(RateLimiter::per_second(60), RateLimiter::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_arrival_sequence() {
        // T = 16.6ms; arrivals at 0, 5ms, 20ms.
        let mut throttle = Throttle::new(RateLimiter::new(Duration::from_micros(16_600)));
        let start = Instant::now();

        assert!(throttle.is_due(start));
        throttle.mark(start);

        let at_5 = start + Duration::from_millis(5);
        assert!(!throttle.is_due(at_5));

        let at_20 = start + Duration::from_millis(20);
        assert!(throttle.is_due(at_20));
        throttle.mark(at_20);
        assert_eq!(throttle.last_sent(), Some(at_20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_boundary_is_inclusive() {
        let limiter = RateLimiter::new(Duration::from_millis(10));
        let last = Instant::now();

        assert!(!limiter.accept(last + Duration::from_micros(9_999), last));
        assert!(limiter.accept(last + Duration::from_millis(10), last));
        assert!(limiter.accept(last + Duration::from_millis(11), last));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_source_is_never_dropped() {
        let mut throttle = Throttle::default();
        let mut now = Instant::now();
        for _ in 0..10 {
            assert!(throttle.is_due(now));
            throttle.mark(now);
            now += Duration::from_millis(50);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejection_leaves_timestamp() {
        let mut throttle = Throttle::default();
        let start = Instant::now();
        throttle.mark(start);

        assert!(!throttle.is_due(start + Duration::from_millis(1)));
        assert_eq!(throttle.last_sent(), Some(start));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mark_is_monotonic() {
        let mut throttle = Throttle::default();
        let start = Instant::now();
        throttle.mark(start + Duration::from_millis(30));
        throttle.mark(start);
        assert_eq!(throttle.last_sent(), Some(start + Duration::from_millis(30)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_burst_accepts_every_other_frame() {
        // 120 Hz arrivals against a 60 Hz limiter
        let mut throttle = Throttle::default();
        let start = Instant::now();
        let step = Duration::from_secs(1) / 120;

        let accepted = (0..120u32)
            .map(|i| start + step * i)
            .filter(|&now| {
                let due = throttle.is_due(now);
                if due {
                    throttle.mark(now);
                }
                due
            })
            .count();

        assert!((59..=61).contains(&accepted), "accepted {accepted}");
    }
}
