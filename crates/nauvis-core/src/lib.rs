//! Tick clock, record synthesis, and pipe emission for the Nauvis mock
//! telemetry stream.
//!
//! This crate owns the loop that stands in for a running game: it advances
//! a tick counter on a fixed cadence, invents plausible gameplay events and
//! production statistics, and writes them as NDJSON to a named pipe.
//!
//! # Modules
//!
//! - [`clock`] -- Tick counter, step size, and stats-cycle derivation.
//! - [`config`] -- Configuration loading from `nauvis-mock.yaml` into
//!   strongly-typed structs, with environment overrides.
//! - [`emitter`] -- The emission loop and its stop conditions.
//! - [`random`] -- [`RandomSource`] trait, seeded and scripted sources.
//! - [`session`] -- Per-run session identity.
//! - [`synth`] -- Event and stats record synthesis.
//! - [`transport`] -- Output path selection, pipe creation, and opening.
//! - [`writer`] -- Line-at-a-time record writer with per-record flush.
//!
//! [`RandomSource`]: random::RandomSource

pub mod clock;
pub mod config;
pub mod emitter;
pub mod random;
pub mod session;
pub mod synth;
pub mod transport;
pub mod writer;
