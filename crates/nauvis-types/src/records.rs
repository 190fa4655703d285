//! Record shapes written to the telemetry stream.
//!
//! Every line is a [`Record`], internally tagged by `type`:
//!
//! ```text
//! {"type":"session_init","session_id":"nauvis_..","tick":0,"level_name":"nauvis"}
//! {"type":"event","session_id":"nauvis_..","tick":90,"player_index":1,"event_name":"on_built_entity",...}
//! {"type":"stats","session_id":"nauvis_..","cycle":1,"tick":120,...}
//! ```
//!
//! Event variant fields are carried by [`GameEvent`], which is tagged by
//! `event_name` and flattened into [`EventRecord`]. A record therefore
//! cannot carry fields from two variants at once.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::session::SessionId;

/// Surface assumed for legacy construction events that omit it.
const DEFAULT_SURFACE: &str = "nauvis";

// ---------------------------------------------------------------------------
// Top-level record
// ---------------------------------------------------------------------------

/// One line of the telemetry stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Record {
    /// Marks the start of a session. Written once, before anything else.
    SessionInit(SessionInitRecord),
    /// A discrete gameplay event.
    Event(EventRecord),
    /// Periodic production and consumption statistics.
    Stats(StatsRecord),
}

impl Record {
    /// The wire value of the `type` tag.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::SessionInit(_) => "session_init",
            Self::Event(_) => "event",
            Self::Stats(_) => "stats",
        }
    }

    /// Tick at which the record was produced.
    pub const fn tick(&self) -> u64 {
        match self {
            Self::SessionInit(r) => r.tick,
            Self::Event(r) => r.tick,
            Self::Stats(r) => r.tick,
        }
    }

    /// Session the record belongs to.
    pub const fn session_id(&self) -> &SessionId {
        match self {
            Self::SessionInit(r) => &r.session_id,
            Self::Event(r) => &r.session_id,
            Self::Stats(r) => &r.session_id,
        }
    }
}

/// Session start marker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInitRecord {
    /// Session identifier.
    pub session_id: SessionId,
    /// Always 0 for the marker written by the emitter.
    pub tick: u64,
    /// Level (map) name the session runs on.
    pub level_name: String,
}

// ---------------------------------------------------------------------------
// Events
// ---------------------------------------------------------------------------

/// A gameplay event with its variant-specific payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Session identifier.
    pub session_id: SessionId,
    /// Tick at which the event fired.
    pub tick: u64,
    /// Index of the player that caused the event.
    pub player_index: u32,
    /// The event name together with its fields.
    #[serde(flatten)]
    pub event: GameEvent,
}

/// A 2D map position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    /// Horizontal tile coordinate.
    pub x: f64,
    /// Vertical tile coordinate.
    pub y: f64,
}

/// Event payload, tagged by `event_name`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_name")]
pub enum GameEvent {
    /// A technology started researching.
    #[serde(rename = "on_research_started")]
    ResearchStarted {
        /// Technology prototype name.
        tech_name: String,
        /// Technology level.
        #[serde(default = "default_tech_level")]
        tech_level: u32,
    },

    /// A technology finished researching.
    #[serde(rename = "on_research_finished")]
    ResearchFinished {
        /// Technology prototype name.
        tech_name: String,
        /// Technology level.
        #[serde(default = "default_tech_level")]
        tech_level: u32,
        /// How long the research took, in seconds.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration: Option<f64>,
    },

    /// The player finished hand-crafting an item.
    #[serde(rename = "on_player_crafted_item")]
    ItemCrafted {
        /// Item prototype name.
        item: String,
        /// Number of items produced.
        count: u32,
        /// Recipe used.
        recipe: String,
    },

    /// The player placed an entity.
    #[serde(rename = "on_built_entity")]
    EntityBuilt {
        /// Entity prototype name.
        entity: String,
        /// Where it was placed.
        position: Position,
        /// Surface it was placed on.
        #[serde(default = "default_surface")]
        surface: String,
    },

    /// The player mined (removed) an entity.
    #[serde(rename = "on_player_mined_entity")]
    EntityMined {
        /// Entity prototype name.
        entity: String,
        /// Where it stood.
        position: Position,
        /// Surface it stood on.
        #[serde(default = "default_surface")]
        surface: String,
    },
}

impl GameEvent {
    /// The [`EventKind`] of this payload.
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::ResearchStarted { .. } => EventKind::ResearchStarted,
            Self::ResearchFinished { .. } => EventKind::ResearchFinished,
            Self::ItemCrafted { .. } => EventKind::ItemCrafted,
            Self::EntityBuilt { .. } => EventKind::EntityBuilt,
            Self::EntityMined { .. } => EventKind::EntityMined,
        }
    }

    /// The wire value of the `event_name` tag.
    pub const fn name(&self) -> &'static str {
        self.kind().as_str()
    }
}

/// Payload-free discriminant of [`GameEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    /// `on_research_started`
    ResearchStarted,
    /// `on_research_finished`
    ResearchFinished,
    /// `on_player_crafted_item`
    ItemCrafted,
    /// `on_built_entity`
    EntityBuilt,
    /// `on_player_mined_entity`
    EntityMined,
}

impl EventKind {
    /// Every event kind, in selection order.
    pub const ALL: [Self; 5] = [
        Self::EntityBuilt,
        Self::EntityMined,
        Self::ResearchStarted,
        Self::ResearchFinished,
        Self::ItemCrafted,
    ];

    /// The wire value of the `event_name` tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ResearchStarted => "on_research_started",
            Self::ResearchFinished => "on_research_finished",
            Self::ItemCrafted => "on_player_crafted_item",
            Self::EntityBuilt => "on_built_entity",
            Self::EntityMined => "on_player_mined_entity",
        }
    }
}

impl core::fmt::Display for EventKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Stats
// ---------------------------------------------------------------------------

/// Snapshot of the player character attached to a stats record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    /// Character position.
    pub position: Position,
    /// Surface the character is on.
    pub surface: String,
    /// Character health.
    pub health: f64,
}

/// Periodic production statistics.
///
/// Quantity maps are keyed by item or fluid name and ordered by key so the
/// serialized form is deterministic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsRecord {
    /// Session identifier.
    pub session_id: SessionId,
    /// `tick / stats_period`.
    pub cycle: u64,
    /// Tick at which the snapshot was taken.
    pub tick: u64,
    /// Player snapshot, if one was taken.
    #[serde(default)]
    pub player: Option<PlayerInfo>,
    /// Path of the screenshot captured with this snapshot.
    #[serde(default)]
    pub screenshot_path: Option<String>,
    /// Produced quantity per item or fluid.
    pub products_production: BTreeMap<String, f64>,
    /// Consumed quantity per item.
    pub materials_consumption: BTreeMap<String, f64>,
}

// ---------------------------------------------------------------------------
// Default value functions (serde default requires named functions)
// ---------------------------------------------------------------------------

const fn default_tech_level() -> u32 {
    1
}

fn default_surface() -> String {
    DEFAULT_SURFACE.to_owned()
}
