//! Mock telemetry emitter for the Nauvis pipeline.
//!
//! Stands in for a running game: it writes a session marker followed by
//! synthetic gameplay events and periodic production statistics, one JSON
//! object per line, to a named pipe that the real consumer reads from.
//!
//! # Startup Sequence
//!
//! 1. Load configuration (`NAUVIS_CONFIG`, else `nauvis-mock.yaml`, else
//!    defaults) and apply environment overrides
//! 2. Initialize structured logging (tracing)
//! 3. Seed the random source and start the session
//! 4. Resolve the output path and create the named pipe if missing
//! 5. Wait for a reader to open the pipe
//! 6. Run the emitter until Ctrl-C, the reader goes away, or the tick limit
//! 7. Log the result

mod error;

use std::path::PathBuf;

use chrono::Utc;
use nauvis_core::config::EmitterConfig;
use nauvis_core::emitter::Emitter;
use nauvis_core::random::RngSource;
use nauvis_core::session::Session;
use nauvis_core::transport::{self, OutputStatus};
use nauvis_core::writer::RecordWriter;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::MockError;

/// Environment variable naming the configuration file.
const CONFIG_PATH_ENV: &str = "NAUVIS_CONFIG";

/// Configuration file looked up in the working directory.
const DEFAULT_CONFIG_FILE: &str = "nauvis-mock.yaml";

/// Where the configuration came from.
enum ConfigSource {
    File(PathBuf),
    Defaults,
}

/// Application entry point for the mock emitter.
///
/// # Errors
///
/// Returns an error if startup fails or the emission loop ends abnormally.
/// A reader closing the pipe, Ctrl-C, and the tick limit are clean exits.
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Load configuration.
    let (config, source) = load_config()?;

    // 2. Initialize structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .or_else(|_| EnvFilter::try_new(&config.logging.level))
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    info!("nauvis-mock starting");
    match &source {
        ConfigSource::File(path) => info!(path = %path.display(), "Configuration loaded"),
        ConfigSource::Defaults => info!("Config file not found, using defaults"),
    }

    if let Err(e) = run(config).await {
        error!(error = %e, "nauvis-mock failed");
        return Err(e.into());
    }
    Ok(())
}

/// Everything after logging is up.
async fn run(config: EmitterConfig) -> Result<(), MockError> {
    // 3. Random source and session.
    let mut random = RngSource::from_seed_or_os(config.random.seed)?;
    info!(
        seeded = config.random.seed.is_some(),
        "Random source initialized"
    );

    let session = Session::start(&config.session.level_name, Utc::now(), &mut random);
    info!(
        session_id = %session.id(),
        level_name = session.level_name(),
        "Session started"
    );

    // 4. Output path and named pipe.
    let path = transport::resolve_output_path(&config.output)?;
    match transport::prepare_output(&path, config.output.create_fifo) {
        Ok(OutputStatus::Created) => info!(path = %path.display(), "Created named pipe"),
        Ok(OutputStatus::Existing { is_fifo: true }) => {
            info!(path = %path.display(), "Using existing named pipe");
        }
        Ok(OutputStatus::Existing { is_fifo: false }) => {
            warn!(path = %path.display(), "Output exists but is not a named pipe, appending");
        }
        Ok(OutputStatus::Missing) => {
            info!(path = %path.display(), "Output missing, will create a regular file");
        }
        Err(e) => warn!(error = %e, "Could not create named pipe, trying to open anyway"),
    }

    // 5. Wait for a reader.
    info!(path = %path.display(), "Waiting for a reader to open the pipe");
    let file = tokio::select! {
        result = transport::open_output_blocking(path.clone()) => result?,
        () = ctrl_c() => {
            info!("Interrupted before a reader connected");
            transport::release_pending_open(&path);
            return Ok(());
        }
    };
    info!(path = %path.display(), "Reader connected, streaming records");

    // 6. Emit.
    let mut writer = RecordWriter::new(file);
    let mut emitter = Emitter::new(config, session, random)?;
    let summary = emitter.run(&mut writer, ctrl_c()).await?;

    // 7. Log results.
    info!(
        stop_reason = ?summary.stop_reason,
        final_tick = summary.final_tick,
        events_written = summary.events_written,
        stats_written = summary.stats_written,
        records_written = summary.records_written,
        "nauvis-mock shutdown complete"
    );
    Ok(())
}

/// Resolves once Ctrl-C is received. If the handler cannot be installed the
/// future never resolves, leaving the other stop conditions in charge.
async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

/// Load configuration from `NAUVIS_CONFIG` or `nauvis-mock.yaml`, falling
/// back to defaults with environment overrides applied.
///
/// A file named by `NAUVIS_CONFIG` must exist.
fn load_config() -> Result<(EmitterConfig, ConfigSource), MockError> {
    if let Some(explicit) = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from) {
        let config = EmitterConfig::from_file(&explicit)?;
        return Ok((config, ConfigSource::File(explicit)));
    }

    let config_path = PathBuf::from(DEFAULT_CONFIG_FILE);
    if config_path.exists() {
        let config = EmitterConfig::from_file(&config_path)?;
        Ok((config, ConfigSource::File(config_path)))
    } else {
        let mut config = EmitterConfig::default();
        config.apply_env_overrides()?;
        config.validate()?;
        Ok((config, ConfigSource::Defaults))
    }
}
