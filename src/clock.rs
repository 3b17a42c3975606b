use std::time::{Duration, Instant};

/// Upper bound on catch-up ticks after a stall (a suspended terminal, a
/// debugger). Anything beyond this is dropped instead of replayed.
const MAX_BACKLOG: u32 = 32;

/// A fixed-rate clock polled from the main loop.
pub struct Pacer {
    period: Duration,
    next: Instant,
}

impl Pacer {
    pub fn new(hz: u64, start: Instant) -> Self {
        let period = Duration::from_secs_f64(1.0 / hz.max(1) as f64);
        Pacer {
            period,
            next: start + period,
        }
    }

    /// Number of periods that have ended since the previous poll.
    pub fn due(&mut self, now: Instant) -> u32 {
        let mut ticks = 0;
        while self.next <= now {
            ticks += 1;
            self.next += self.period;
            if ticks == MAX_BACKLOG {
                self.next = now + self.period;
                break;
            }
        }
        ticks
    }

    /// How long until the next period ends.
    pub fn until_next(&self, now: Instant) -> Duration {
        self.next.saturating_duration_since(now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nothing_is_due_before_the_first_period() {
        let start = Instant::now();
        let mut pacer = Pacer::new(60, start);
        assert_eq!(pacer.due(start), 0);
        assert_eq!(pacer.due(start + Duration::from_millis(10)), 0);
    }

    #[test]
    fn counts_elapsed_periods_once() {
        let start = Instant::now();
        let mut pacer = Pacer::new(100, start);
        assert_eq!(pacer.due(start + Duration::from_millis(35)), 3);
        assert_eq!(pacer.due(start + Duration::from_millis(35)), 0);
        assert_eq!(pacer.due(start + Duration::from_millis(40)), 1);
    }

    #[test]
    fn two_rates_run_independently() {
        let start = Instant::now();
        let mut instructions = Pacer::new(500, start);
        let mut frames = Pacer::new(50, start);
        let now = start + Duration::from_millis(100);
        assert_eq!(instructions.due(now), MAX_BACKLOG);
        assert_eq!(frames.due(now), 5);
    }

    #[test]
    fn long_stalls_are_not_replayed() {
        let start = Instant::now();
        let mut pacer = Pacer::new(1000, start);
        let now = start + Duration::from_secs(5);
        assert_eq!(pacer.due(now), MAX_BACKLOG);
        assert_eq!(pacer.due(now), 0);
        assert_eq!(pacer.until_next(now), Duration::from_millis(1));
    }
}
