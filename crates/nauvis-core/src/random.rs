//! Pluggable random source.
//!
//! Every probabilistic choice the emitter makes (event selection, field
//! values, stats inclusion, the session suffix) is drawn through the
//! [`RandomSource`] trait. Production runs use [`RngSource`] over a `rand`
//! generator, seeded from the OS or from a fixed seed; tests can inject a
//! [`ScriptedSource`] that replays an exact sequence of samples.
//!
//! All derived draws are built on a single primitive, [`next_unit`], so a
//! scripted sequence maps onto choices in an easily predictable way.
//!
//! [`next_unit`]: RandomSource::next_unit

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Errors that can occur when creating a random source.
#[derive(Debug, thiserror::Error)]
pub enum RandomError {
    /// The operating system entropy source could not be read.
    #[error("OS randomness source unavailable: {message}")]
    Unavailable {
        /// Description of the underlying failure.
        message: String,
    },
}

/// A source of uniformly distributed samples.
pub trait RandomSource {
    /// Next sample, uniformly distributed in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// `true` with the given probability.
    ///
    /// A probability of `0.0` never fires and `1.0` always fires.
    fn chance(&mut self, probability: f64) -> bool {
        self.next_unit() < probability
    }

    /// Sample uniformly from `[low, high)`.
    fn uniform(&mut self, low: f64, high: f64) -> f64 {
        (high - low).mul_add(self.next_unit(), low)
    }

    /// Sample an index in `0..len`. Returns 0 when `len` is 0.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn index(&mut self, len: usize) -> usize {
        let Some(last) = len.checked_sub(1) else {
            return 0;
        };
        let scaled = (self.next_unit() * len as f64).floor() as usize;
        scaled.min(last)
    }

    /// Sample an integer from the inclusive range `low..=high`.
    ///
    /// If `high < low` the bounds are swapped.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    fn int_inclusive(&mut self, low: u32, high: u32) -> u32 {
        let (low, high) = if high < low { (high, low) } else { (low, high) };
        let span = u64::from(high)
            .saturating_sub(u64::from(low))
            .saturating_add(1);
        let offset = ((self.next_unit() * span as f64).floor() as u64).min(span.saturating_sub(1));
        u32::try_from(u64::from(low).saturating_add(offset)).unwrap_or(high)
    }

    /// Pick one entry of `items`, or `None` if it is empty.
    fn pick<'a>(&mut self, items: &'a [String]) -> Option<&'a str> {
        if items.is_empty() {
            return None;
        }
        let idx = self.index(items.len());
        items.get(idx).map(String::as_str)
    }
}

impl<R: RandomSource + ?Sized> RandomSource for Box<R> {
    fn next_unit(&mut self) -> f64 {
        (**self).next_unit()
    }
}

/// [`RandomSource`] backed by any `rand` generator.
#[derive(Debug, Clone)]
pub struct RngSource<R> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    /// Wrap an existing generator.
    pub const fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl RngSource<StdRng> {
    /// Deterministic source: the same seed yields the same sequence.
    pub fn seeded(seed: u64) -> Self {
        Self::new(StdRng::seed_from_u64(seed))
    }

    /// Source seeded from OS entropy.
    ///
    /// # Errors
    ///
    /// Returns [`RandomError::Unavailable`] if the OS entropy source cannot
    /// be read.
    pub fn from_os() -> Result<Self, RandomError> {
        StdRng::try_from_os_rng()
            .map(Self::new)
            .map_err(|e| RandomError::Unavailable {
                message: e.to_string(),
            })
    }

    /// Seeded source if `seed` is set, otherwise OS entropy.
    ///
    /// # Errors
    ///
    /// Returns [`RandomError::Unavailable`] if no seed is given and the OS
    /// entropy source cannot be read.
    pub fn from_seed_or_os(seed: Option<u64>) -> Result<Self, RandomError> {
        seed.map_or_else(Self::from_os, |s| Ok(Self::seeded(s)))
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn next_unit(&mut self) -> f64 {
        self.rng.random::<f64>()
    }
}

/// Replays a fixed sequence of unit samples, cycling when exhausted.
///
/// Values are clamped into `[0, 1)`. An empty script always yields `0.0`.
#[derive(Debug, Clone, Default)]
pub struct ScriptedSource {
    samples: Vec<f64>,
    cursor: usize,
}

impl ScriptedSource {
    /// Largest value strictly below 1.0.
    const BELOW_ONE: f64 = 1.0 - f64::EPSILON;

    /// Create a source that replays `samples` in order.
    pub fn new(samples: impl Into<Vec<f64>>) -> Self {
        Self {
            samples: samples.into(),
            cursor: 0,
        }
    }

    /// Number of samples drawn so far.
    pub const fn drawn(&self) -> usize {
        self.cursor
    }
}

impl RandomSource for ScriptedSource {
    fn next_unit(&mut self) -> f64 {
        if self.samples.is_empty() {
            return 0.0;
        }
        let idx = self.cursor.checked_rem(self.samples.len()).unwrap_or(0);
        self.cursor = self.cursor.saturating_add(1);
        let raw = self.samples.get(idx).copied().unwrap_or(0.0);
        if raw.is_nan() {
            return 0.0;
        }
        raw.clamp(0.0, Self::BELOW_ONE)
    }
}
