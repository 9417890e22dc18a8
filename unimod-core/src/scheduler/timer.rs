//! Tick-driven interval timer

/// Fires once per `period_ms` of accumulated tick time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct IntervalTimer {
    period_ms: u32,
    elapsed_ms: u32,
}

impl IntervalTimer {
    /// First fire after one full period
    pub const fn new(period_ms: u32) -> Self {
        Self {
            period_ms,
            elapsed_ms: 0,
        }
    }

    /// First fire on the first tick
    pub const fn primed(period_ms: u32) -> Self {
        Self {
            period_ms,
            elapsed_ms: period_ms,
        }
    }

    /// Advance by `dt_ms`; returns true when the period has elapsed
    ///
    /// Long ticks fire once, never in bursts.
    pub fn tick(&mut self, dt_ms: u32) -> bool {
        self.elapsed_ms = self.elapsed_ms.saturating_add(dt_ms);
        if self.elapsed_ms >= self.period_ms {
            self.elapsed_ms = 0;
            true
        } else {
            false
        }
    }

    pub fn period_ms(&self) -> u32 {
        self.period_ms
    }

    /// Start a fresh period
    pub fn reset(&mut self) {
        self.elapsed_ms = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fires_each_period() {
        let mut timer = IntervalTimer::new(100);
        assert!(!timer.tick(60));
        assert!(timer.tick(40));
        assert!(!timer.tick(99));
        assert!(timer.tick(1));
    }

    #[test]
    fn test_primed_fires_immediately() {
        let mut timer = IntervalTimer::primed(1000);
        assert!(timer.tick(0));
        assert!(!timer.tick(500));
    }

    #[test]
    fn test_long_tick_fires_once() {
        let mut timer = IntervalTimer::new(10);
        assert!(timer.tick(35));
        assert!(!timer.tick(5));
    }

    #[test]
    fn test_reset() {
        let mut timer = IntervalTimer::new(10);
        timer.tick(9);
        timer.reset();
        assert!(!timer.tick(9));
        assert_eq!(timer.period_ms(), 10);
    }
}
