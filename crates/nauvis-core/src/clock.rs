//! Simulated tick clock.
//!
//! The clock is the single source of truth for simulated time in the
//! emitter. It starts at tick 0, advances by a fixed step once per loop
//! iteration, and derives the stats cycle from the tick counter.
//!
//! # Design Principles
//!
//! - The tick never decreases and is never reset within a run.
//! - All arithmetic is checked; overflow is an error, never a wrap.
//! - The stats schedule is computed from the tick, never stored.

use crate::config::TimingConfig;

/// Errors that can occur during clock operations.
#[derive(Debug, thiserror::Error)]
pub enum ClockError {
    /// Tick counter would overflow.
    #[error("tick counter overflow: cannot advance {tick} by {step}")]
    TickOverflow {
        /// Tick before the failed advance.
        tick: u64,
        /// Step that would have been added.
        step: u64,
    },

    /// Invalid timing configuration (e.g. zero step).
    #[error("invalid timing configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// Simulated clock with a fixed step and stats period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TickClock {
    /// Current tick.
    tick: u64,

    /// Ticks added per advance.
    step: u64,

    /// Stats are due whenever `tick % stats_period == 0`.
    stats_period: u64,
}

impl TickClock {
    /// Create a clock at tick 0 from the timing configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if the step or the stats period
    /// is zero.
    pub fn new(config: &TimingConfig) -> Result<Self, ClockError> {
        Self::from_parts(0, config.ticks_per_step, config.stats_period_ticks)
    }

    /// Create a clock from explicit parameters.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if `step` or `stats_period`
    /// is zero.
    pub fn from_parts(tick: u64, step: u64, stats_period: u64) -> Result<Self, ClockError> {
        if step == 0 {
            return Err(ClockError::InvalidConfig {
                reason: "ticks_per_step must be at least 1".to_owned(),
            });
        }
        if stats_period == 0 {
            return Err(ClockError::InvalidConfig {
                reason: "stats_period_ticks must be at least 1".to_owned(),
            });
        }
        Ok(Self {
            tick,
            step,
            stats_period,
        })
    }

    /// Advance the clock by one step. Returns the new tick.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::TickOverflow`] if the tick would exceed
    /// `u64::MAX`. The clock is left unchanged in that case.
    pub fn advance(&mut self) -> Result<u64, ClockError> {
        self.tick = self
            .tick
            .checked_add(self.step)
            .ok_or(ClockError::TickOverflow {
                tick: self.tick,
                step: self.step,
            })?;
        Ok(self.tick)
    }

    /// Return the current tick.
    pub const fn tick(&self) -> u64 {
        self.tick
    }

    /// Return the configured step.
    pub const fn step(&self) -> u64 {
        self.step
    }

    /// Return the configured stats period.
    pub const fn stats_period(&self) -> u64 {
        self.stats_period
    }

    /// Whether a stats record is due at the current tick.
    pub fn stats_due(&self) -> bool {
        self.tick.checked_rem(self.stats_period) == Some(0)
    }

    /// Stats cycle for the current tick (`tick / stats_period`).
    pub fn cycle(&self) -> u64 {
        self.tick.checked_div(self.stats_period).unwrap_or(0)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn default_clock() -> TickClock {
        TickClock::new(&TimingConfig::default()).unwrap()
    }

    #[test]
    fn clock_starts_at_tick_zero() {
        let clock = default_clock();
        assert_eq!(clock.tick(), 0);
        assert_eq!(clock.step(), 30);
        assert_eq!(clock.stats_period(), 120);
    }

    #[test]
    fn advance_adds_step() {
        let mut clock = default_clock();
        assert_eq!(clock.advance().unwrap(), 30);
        assert_eq!(clock.advance().unwrap(), 60);
        assert_eq!(clock.tick(), 60);
    }

    #[test]
    fn stats_due_on_multiples_of_period() {
        let mut clock = default_clock();
        let mut due = Vec::new();
        for _ in 0..10 {
            let tick = clock.advance().unwrap();
            if clock.stats_due() {
                due.push((tick, clock.cycle()));
            }
        }
        // ticks 30..=300 step 30: stats at 120 and 240
        assert_eq!(due, vec![(120, 1), (240, 2)]);
    }

    #[test]
    fn tick_150_is_not_a_stats_tick() {
        let clock = TickClock::from_parts(150, 30, 120).unwrap();
        assert!(!clock.stats_due());
        assert_eq!(clock.cycle(), 1);
    }

    #[test]
    fn overflow_is_an_error_and_leaves_tick_unchanged() {
        let mut clock = TickClock::from_parts(u64::MAX - 10, 30, 120).unwrap();
        let result = clock.advance();
        assert!(matches!(result, Err(ClockError::TickOverflow { .. })));
        assert_eq!(clock.tick(), u64::MAX - 10);
    }

    #[test]
    fn invalid_config_zero_step() {
        assert!(TickClock::from_parts(0, 0, 120).is_err());
    }

    #[test]
    fn invalid_config_zero_period() {
        let cfg = TimingConfig {
            tick_interval_ms: 500,
            ticks_per_step: 30,
            stats_period_ticks: 0,
        };
        assert!(TickClock::new(&cfg).is_err());
    }
}
