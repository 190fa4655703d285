//! The record emission loop.
//!
//! [`Emitter::run`] drives the stream:
//!
//! 1. Write the `session_init` marker (if enabled)
//! 2. Sleep for the tick interval (or stop, if shutdown fires first)
//! 3. Advance the clock by one step
//! 4. With the configured probability, write an event record
//! 5. If the tick is a multiple of the stats period, write a stats record
//! 6. Stop if the tick limit is reached, otherwise repeat from 2
//!
//! A reader closing the pipe and the shutdown future both end the run
//! cleanly. Any other failure ends it with an [`EmitError`]. Nothing is
//! retried.

use std::future::Future;
use std::io::Write;
use std::time::Duration;

use nauvis_types::Record;
use tracing::{debug, info, warn};

use crate::clock::{ClockError, TickClock};
use crate::config::EmitterConfig;
use crate::random::RandomSource;
use crate::session::Session;
use crate::synth::{self, SynthError};
use crate::writer::{RecordWriter, WriteError};

/// Errors that end a run abnormally.
#[derive(Debug, thiserror::Error)]
pub enum EmitError {
    /// The tick clock could not be built or advanced.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// A record could not be synthesized.
    #[error("synthesis error: {source}")]
    Synth {
        /// The underlying synthesis error.
        #[from]
        source: SynthError,
    },

    /// A record could not be written.
    #[error("write error: {source}")]
    Write {
        /// The underlying write error.
        #[from]
        source: WriteError,
    },
}

/// Why a run ended cleanly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The shutdown future completed (e.g. Ctrl-C).
    Interrupted,
    /// The reader closed its end of the pipe.
    ReaderClosed,
    /// `limits.max_ticks` was reached.
    TickLimitReached,
}

/// Outcome of a clean run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Why the run ended.
    pub stop_reason: StopReason,
    /// Tick the clock had reached.
    pub final_tick: u64,
    /// Event records written.
    pub events_written: u64,
    /// Stats records written.
    pub stats_written: u64,
    /// All records written, including the session marker.
    pub records_written: u64,
}

/// Produces the record stream for one session.
#[derive(Debug)]
pub struct Emitter<R> {
    config: EmitterConfig,
    session: Session,
    clock: TickClock,
    random: R,
    events_written: u64,
    stats_written: u64,
}

impl<R: RandomSource> Emitter<R> {
    /// Create an emitter at tick 0.
    ///
    /// # Errors
    ///
    /// Returns [`EmitError::Clock`] if the timing configuration is invalid.
    pub fn new(config: EmitterConfig, session: Session, random: R) -> Result<Self, EmitError> {
        let clock = TickClock::new(&config.timing)?;
        Ok(Self {
            config,
            session,
            clock,
            random,
            events_written: 0,
            stats_written: 0,
        })
    }

    /// The session every record belongs to.
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Current tick.
    pub const fn tick(&self) -> u64 {
        self.clock.tick()
    }

    /// The configuration the emitter was built with.
    pub const fn config(&self) -> &EmitterConfig {
        &self.config
    }

    /// Run one iteration without sleeping: advance the clock and return the
    /// records due at the new tick, event first.
    ///
    /// # Errors
    ///
    /// Returns [`EmitError::Clock`] on tick overflow or
    /// [`EmitError::Synth`] if an event cannot be built.
    pub fn step(&mut self) -> Result<Vec<Record>, EmitError> {
        let tick = self.clock.advance()?;
        let mut records = Vec::with_capacity(2);

        if self.random.chance(self.config.emission.event_probability) {
            let event =
                synth::synthesize_event(&self.config, self.session.id(), tick, &mut self.random)?;
            records.push(Record::Event(event));
        }

        if self.clock.stats_due() {
            let stats = synth::synthesize_stats(
                &self.config,
                self.session.id(),
                tick,
                self.clock.cycle(),
                &mut self.random,
            );
            records.push(Record::Stats(stats));
        }

        Ok(records)
    }

    /// Whether the configured tick limit has been reached.
    pub const fn tick_limit_reached(&self) -> bool {
        let max = self.config.limits.max_ticks;
        max > 0 && self.clock.tick() >= max
    }

    /// Run until `shutdown` completes, the reader goes away, or the tick
    /// limit is reached.
    ///
    /// `shutdown` is raced against every sleep, so it is observed within one
    /// tick interval at most.
    ///
    /// # Errors
    ///
    /// Returns [`EmitError`] on any failure other than a closed reader.
    pub async fn run<W, F>(
        &mut self,
        writer: &mut RecordWriter<W>,
        shutdown: F,
    ) -> Result<RunSummary, EmitError>
    where
        W: Write,
        F: Future<Output = ()>,
    {
        let mut shutdown = std::pin::pin!(shutdown);
        let interval = Duration::from_millis(self.config.timing.tick_interval_ms);

        info!(
            session_id = %self.session.id(),
            tick_interval_ms = self.config.timing.tick_interval_ms,
            ticks_per_step = self.clock.step(),
            stats_period_ticks = self.clock.stats_period(),
            max_ticks = self.config.limits.max_ticks,
            "Emitter starting"
        );

        if self.config.emission.session_init {
            let marker = self.session.init_record();
            if let Some(reason) = self.emit(writer, &marker)? {
                return Ok(self.summary(reason, writer));
            }
        }

        loop {
            tokio::select! {
                biased;
                () = &mut shutdown => {
                    info!(tick = self.clock.tick(), "Shutdown requested");
                    return Ok(self.summary(StopReason::Interrupted, writer));
                }
                () = tokio::time::sleep(interval) => {}
            }

            for record in self.step()? {
                if let Some(reason) = self.emit(writer, &record)? {
                    return Ok(self.summary(reason, writer));
                }
            }

            if self.tick_limit_reached() {
                info!(
                    tick = self.clock.tick(),
                    max_ticks = self.config.limits.max_ticks,
                    "Tick limit reached"
                );
                return Ok(self.summary(StopReason::TickLimitReached, writer));
            }
        }
    }

    /// Write one record. A closed reader becomes a stop reason rather than
    /// an error.
    fn emit<W: Write>(
        &mut self,
        writer: &mut RecordWriter<W>,
        record: &Record,
    ) -> Result<Option<StopReason>, EmitError> {
        match writer.write(record) {
            Ok(()) => {}
            Err(WriteError::ReaderClosed) => {
                warn!(tick = record.tick(), "Pipe closed by reader");
                return Ok(Some(StopReason::ReaderClosed));
            }
            Err(source) => return Err(EmitError::Write { source }),
        }

        match record {
            Record::SessionInit(init) => {
                info!(
                    session_id = %init.session_id,
                    level_name = %init.level_name,
                    "Session init written"
                );
            }
            Record::Event(event) => {
                self.events_written = self.events_written.saturating_add(1);
                info!(tick = event.tick, event = event.event.name(), "Event");
            }
            Record::Stats(stats) => {
                self.stats_written = self.stats_written.saturating_add(1);
                info!(tick = stats.tick, cycle = stats.cycle, "Stats");
                debug!(
                    produced = stats.products_production.len(),
                    consumed = stats.materials_consumption.len(),
                    "Stats contents"
                );
            }
        }
        Ok(None)
    }

    fn summary<W>(&self, stop_reason: StopReason, writer: &RecordWriter<W>) -> RunSummary {
        RunSummary {
            stop_reason,
            final_tick: self.clock.tick(),
            events_written: self.events_written,
            stats_written: self.stats_written,
            records_written: writer.written(),
        }
    }
}
