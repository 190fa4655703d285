//! Configuration loading and typed config structures for the mock emitter.
//!
//! The configuration lives in an optional `nauvis-mock.yaml` file. Every
//! field has a default matching the behaviour of the stock generator, so an
//! empty or missing file yields a fully working emitter. The resulting
//! [`EmitterConfig`] is built once at startup and passed by reference into
//! the emitter; nothing reads configuration from global state afterwards.

use std::path::Path;

use serde::Deserialize;

/// Environment variable that pins the output path and bypasses probing.
pub const PIPE_PATH_ENV: &str = "FACTORIO_PIPE_PATH";

/// Environment variable that fixes the random seed.
pub const SEED_ENV: &str = "NAUVIS_SEED";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// The configuration parsed but holds an unusable value.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level emitter configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct EmitterConfig {
    /// Session identity settings.
    #[serde(default)]
    pub session: SessionConfig,

    /// Real-time and simulated-time cadence.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Emission probabilities and optional record parts.
    #[serde(default)]
    pub emission: EmissionConfig,

    /// Names that record fields are drawn from.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Output transport settings.
    #[serde(default)]
    pub output: OutputConfig,

    /// Run bounds.
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Random source settings.
    #[serde(default)]
    pub random: RandomConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EmitterConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// Environment variables override file values:
    /// - `FACTORIO_PIPE_PATH` overrides `output.path`
    /// - `NAUVIS_SEED` overrides `random.seed`
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Yaml`] if the content is not valid YAML, or
    /// [`ConfigError::Invalid`] if an override or value is unusable.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let mut config: Self = serde_yml::from_str(&contents)?;
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from a YAML string.
    ///
    /// Environment overrides are not applied.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML, or
    /// [`ConfigError::Invalid`] if a value is unusable.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply `FACTORIO_PIPE_PATH` and `NAUVIS_SEED` from the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `NAUVIS_SEED` is not a `u64`.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(
            std::env::var(PIPE_PATH_ENV).ok(),
            std::env::var(SEED_ENV).ok(),
        )
    }

    /// Apply explicit override values. Empty strings are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `seed` is not a `u64`.
    pub fn apply_overrides(
        &mut self,
        pipe_path: Option<String>,
        seed: Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(path) = pipe_path.filter(|p| !p.trim().is_empty()) {
            self.output.path = Some(path);
        }
        if let Some(raw) = seed.filter(|s| !s.trim().is_empty()) {
            let parsed = raw.trim().parse::<u64>().map_err(|e| ConfigError::Invalid {
                reason: format!("{SEED_ENV} must be an unsigned integer: {e}"),
            })?;
            self.random.seed = Some(parsed);
        }
        Ok(())
    }

    /// Check cross-field constraints that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first violation.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timing.ticks_per_step == 0 {
            return Err(invalid("timing.ticks_per_step must be at least 1"));
        }
        if self.timing.stats_period_ticks == 0 {
            return Err(invalid("timing.stats_period_ticks must be at least 1"));
        }

        for (name, p) in [
            ("emission.event_probability", self.emission.event_probability),
            ("emission.item_probability", self.emission.item_probability),
            ("emission.fluid_probability", self.emission.fluid_probability),
        ] {
            if !(0.0..=1.0).contains(&p) {
                return Err(ConfigError::Invalid {
                    reason: format!("{name} must be within [0, 1], got {p}"),
                });
            }
        }

        if self.session.level_name.trim().is_empty() {
            return Err(invalid("session.level_name must not be empty"));
        }
        if self.catalog.entities.is_empty() {
            return Err(invalid("catalog.entities must not be empty"));
        }
        if self.catalog.technologies.is_empty() {
            return Err(invalid("catalog.technologies must not be empty"));
        }
        if self.catalog.craftables.is_empty() {
            return Err(invalid("catalog.craftables must not be empty"));
        }
        if self.catalog.max_tech_level == 0 {
            return Err(invalid("catalog.max_tech_level must be at least 1"));
        }
        if self.output.path.is_none() && self.output.candidate_paths.is_empty() {
            return Err(invalid(
                "output.candidate_paths must not be empty when output.path is unset",
            ));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.to_owned(),
    }
}

/// Session identity configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SessionConfig {
    /// Level name, used as the session id prefix and in the init record.
    #[serde(default = "default_level_name")]
    pub level_name: String,

    /// Player index stamped on every event.
    #[serde(default = "default_player_index")]
    pub player_index: u32,

    /// Surface name used for construction events and player snapshots.
    #[serde(default = "default_surface")]
    pub surface: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            level_name: default_level_name(),
            player_index: default_player_index(),
            surface: default_surface(),
        }
    }
}

/// Cadence configuration.
///
/// With the defaults the emitter advances 30 ticks every 500 ms, i.e. 60
/// simulated ticks per wall-clock second, and writes stats every 120 ticks.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimingConfig {
    /// Real-time milliseconds slept before each iteration.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Ticks added to the counter per iteration.
    #[serde(default = "default_ticks_per_step")]
    pub ticks_per_step: u64,

    /// A stats record is written whenever the tick is a multiple of this.
    #[serde(default = "default_stats_period_ticks")]
    pub stats_period_ticks: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval_ms(),
            ticks_per_step: default_ticks_per_step(),
            stats_period_ticks: default_stats_period_ticks(),
        }
    }
}

/// Emission probabilities and optional record parts.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct EmissionConfig {
    /// Whether a `session_init` record is written before the loop.
    #[serde(default = "default_true")]
    pub session_init: bool,

    /// Chance per iteration of writing an event record.
    #[serde(default = "default_event_probability")]
    pub event_probability: f64,

    /// Chance that a catalog item appears in each stats quantity map.
    #[serde(default = "default_item_probability")]
    pub item_probability: f64,

    /// Chance that a catalog fluid appears in the production map.
    #[serde(default = "default_fluid_probability")]
    pub fluid_probability: f64,

    /// Whether stats records carry a player snapshot.
    #[serde(default = "default_true")]
    pub player_snapshot: bool,

    /// Whether stats records carry a screenshot path.
    #[serde(default)]
    pub screenshots: bool,
}

impl Default for EmissionConfig {
    fn default() -> Self {
        Self {
            session_init: true,
            event_probability: default_event_probability(),
            item_probability: default_item_probability(),
            fluid_probability: default_fluid_probability(),
            player_snapshot: true,
            screenshots: false,
        }
    }
}

/// Prototype names that record fields are drawn from.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CatalogConfig {
    /// Entities for build and mine events.
    #[serde(default = "default_entities")]
    pub entities: Vec<String>,

    /// Technologies for research events.
    #[serde(default = "default_technologies")]
    pub technologies: Vec<String>,

    /// Highest technology level drawn for research events.
    #[serde(default = "default_max_tech_level")]
    pub max_tech_level: u32,

    /// Items for craft events. The recipe carries the same name.
    #[serde(default = "default_craftables")]
    pub craftables: Vec<String>,

    /// Items tracked in stats production and consumption.
    #[serde(default = "default_items")]
    pub items: Vec<String>,

    /// Fluids tracked in stats production.
    #[serde(default = "default_fluids")]
    pub fluids: Vec<String>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            entities: default_entities(),
            technologies: default_technologies(),
            max_tech_level: default_max_tech_level(),
            craftables: default_craftables(),
            items: default_items(),
            fluids: default_fluids(),
        }
    }
}

/// Output transport configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct OutputConfig {
    /// Fixed output path. When set, candidate probing is skipped.
    #[serde(default)]
    pub path: Option<String>,

    /// Ordered candidates; the first whose parent directory exists wins,
    /// otherwise the last one is used. A leading `~` expands to `$HOME`.
    #[serde(default = "default_candidate_paths")]
    pub candidate_paths: Vec<String>,

    /// Whether to create a named pipe when the selected path is missing.
    #[serde(default = "default_true")]
    pub create_fifo: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: None,
            candidate_paths: default_candidate_paths(),
            create_fifo: true,
        }
    }
}

/// Run bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LimitsConfig {
    /// Stop once the tick counter reaches this value (0 = unlimited).
    #[serde(default)]
    pub max_ticks: u64,
}

/// Random source configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RandomConfig {
    /// Fixed seed for reproducible streams. Absent means OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` wins if set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

fn default_level_name() -> String {
    "nauvis".to_owned()
}

const fn default_player_index() -> u32 {
    1
}

fn default_surface() -> String {
    "nauvis".to_owned()
}

const fn default_tick_interval_ms() -> u64 {
    500
}

const fn default_ticks_per_step() -> u64 {
    30
}

const fn default_stats_period_ticks() -> u64 {
    120
}

const fn default_event_probability() -> f64 {
    0.2
}

const fn default_item_probability() -> f64 {
    0.7
}

const fn default_fluid_probability() -> f64 {
    0.5
}

fn names(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| (*s).to_owned()).collect()
}

fn default_entities() -> Vec<String> {
    names(&[
        "assembling-machine-1",
        "inserter",
        "transport-belt",
        "iron-chest",
        "stone-furnace",
    ])
}

fn default_technologies() -> Vec<String> {
    names(&["automation", "logistics", "steel-processing", "electronics"])
}

const fn default_max_tech_level() -> u32 {
    3
}

fn default_craftables() -> Vec<String> {
    names(&[
        "iron-gear-wheel",
        "electronic-circuit",
        "transport-belt",
        "inserter",
        "pipe",
    ])
}

fn default_items() -> Vec<String> {
    names(&[
        "iron-plate",
        "copper-plate",
        "electronic-circuit",
        "coal",
        "stone",
    ])
}

fn default_fluids() -> Vec<String> {
    names(&["water", "crude-oil", "petroleum-gas"])
}

fn default_candidate_paths() -> Vec<String> {
    names(&[
        "~/Library/Application Support/factorio/script-output/events.pipe",
        "/tmp/events.pipe",
    ])
}

fn default_log_level() -> String {
    "info".to_owned()
}

const fn default_true() -> bool {
    true
}
