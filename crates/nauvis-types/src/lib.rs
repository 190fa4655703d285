//! Shared record definitions for the Nauvis mock telemetry stream.
//!
//! This crate is the single source of truth for the shape of every line the
//! emitter writes to the named pipe. Records are serialized as one JSON
//! object per line, tagged by a `type` field.
//!
//! # Modules
//!
//! - [`session`] -- The per-run [`SessionId`] token
//! - [`records`] -- The three record shapes (`session_init`, `event`, `stats`)
//! - [`codec`] -- Line encoding and tolerant line decoding

pub mod codec;
pub mod records;
pub mod session;

// Re-export all public types at crate root for convenience.
pub use codec::{DecodeError, decode_line, encode_line};
pub use records::{
    EventKind, EventRecord, GameEvent, PlayerInfo, Position, Record, SessionInitRecord,
    StatsRecord,
};
pub use session::SessionId;
