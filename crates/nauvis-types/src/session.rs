//! Session identity token.
//!
//! A session is one run of the emitter. Its identifier is composed once at
//! startup from the level name, the wall-clock start time, and a random
//! suffix, and is carried unchanged by every record of the run.

use serde::{Deserialize, Serialize};

/// Identifier shared by every record written during one emitter run.
///
/// Serialized as a bare JSON string, e.g. `"nauvis_1718000000_482913"`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Compose an identifier as `{level_name}_{started_at}_{suffix}`.
    ///
    /// `started_at` is the session start time in Unix seconds.
    pub fn compose(level_name: &str, started_at: i64, suffix: u32) -> Self {
        Self(format!("{level_name}_{started_at}_{suffix}"))
    }

    /// Borrow the identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl core::fmt::Display for SessionId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn compose_joins_parts_with_underscores() {
        let id = SessionId::compose("nauvis", 1_718_000_000, 482_913);
        assert_eq!(id.as_str(), "nauvis_1718000000_482913");
        assert_eq!(id.to_string(), "nauvis_1718000000_482913");
    }

    #[test]
    fn serializes_as_bare_string() {
        let id = SessionId::from("vulcanus_1_100000");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"vulcanus_1_100000\"");

        let back: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
