//! Session identity.
//!
//! One session per process run. The identifier is built once from the
//! level name, the start time, and a six-digit random suffix, and every
//! record of the run carries it.

use chrono::{DateTime, Utc};
use nauvis_types::{Record, SessionId, SessionInitRecord};

use crate::random::RandomSource;

/// Smallest session suffix.
pub const SUFFIX_MIN: u32 = 100_000;

/// Largest session suffix.
pub const SUFFIX_MAX: u32 = 999_999;

/// Identity of the current run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: SessionId,
    level_name: String,
    started_at: DateTime<Utc>,
}

impl Session {
    /// Start a session at `now`, drawing the suffix from `random`.
    pub fn start(level_name: &str, now: DateTime<Utc>, random: &mut dyn RandomSource) -> Self {
        let suffix = random.int_inclusive(SUFFIX_MIN, SUFFIX_MAX);
        Self::from_parts(level_name, now, suffix)
    }

    /// Build a session from explicit parts.
    pub fn from_parts(level_name: &str, started_at: DateTime<Utc>, suffix: u32) -> Self {
        Self {
            id: SessionId::compose(level_name, started_at.timestamp(), suffix),
            level_name: level_name.to_owned(),
            started_at,
        }
    }

    /// Session identifier.
    pub const fn id(&self) -> &SessionId {
        &self.id
    }

    /// Level name the session runs on.
    pub fn level_name(&self) -> &str {
        &self.level_name
    }

    /// Wall-clock start time.
    pub const fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    /// The `session_init` marker for this session (tick 0).
    pub fn init_record(&self) -> Record {
        Record::SessionInit(SessionInitRecord {
            session_id: self.id.clone(),
            tick: 0,
            level_name: self.level_name.clone(),
        })
    }
}
