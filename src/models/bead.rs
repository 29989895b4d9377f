//! Bead identity
//!
//! A bead is identified by its name (which may change when the archive is
//! renamed), its kind (stable across versions), its content id (hash of the
//! frozen content) and its freeze time (orders versions sharing a name).

use super::timestamp::{serde_timestamp, Timestamp};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Read access to the identity of anything that represents a bead
///
/// Implemented by stored archives, sketch nodes and plain identities, so that
/// time resolution works the same way over all of them.
pub trait Bead {
    fn name(&self) -> &str;

    fn kind(&self) -> &str;

    fn content_id(&self) -> &str;

    fn freeze_time(&self) -> Timestamp;

    /// Name of the box the bead was found in, empty when not known
    fn box_name(&self) -> &str {
        ""
    }

    fn identity(&self) -> BeadIdentity {
        BeadIdentity {
            name: self.name().to_string(),
            kind: self.kind().to_string(),
            content_id: self.content_id().to_string(),
            freeze_time: self.freeze_time(),
        }
    }
}

/// Plain value form of a bead identity
///
/// Ordering is by freeze time first, then name, content id and kind, so that
/// sorting a version history puts the oldest version first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BeadIdentity {
    pub name: String,
    pub kind: String,
    pub content_id: String,
    #[serde(with = "serde_timestamp")]
    pub freeze_time: Timestamp,
}

impl BeadIdentity {
    pub fn new(
        name: impl Into<String>,
        kind: impl Into<String>,
        content_id: impl Into<String>,
        freeze_time: Timestamp,
    ) -> Self {
        Self {
            name: name.into(),
            kind: kind.into(),
            content_id: content_id.into(),
            freeze_time,
        }
    }
}

impl Bead for BeadIdentity {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        &self.kind
    }

    fn content_id(&self) -> &str {
        &self.content_id
    }

    fn freeze_time(&self) -> Timestamp {
        self.freeze_time
    }
}

impl PartialOrd for BeadIdentity {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for BeadIdentity {
    fn cmp(&self, other: &Self) -> Ordering {
        self.freeze_time
            .cmp(&other.freeze_time)
            .then_with(|| self.name.cmp(&other.name))
            .then_with(|| self.content_id.cmp(&other.content_id))
            .then_with(|| self.kind.cmp(&other.kind))
    }
}

/// A declared input of a bead, as recorded at freeze time
///
/// The nickname is the key of the map holding these, the referenced bead's
/// name lives in the separate, mutable input map.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputSpec {
    pub kind: String,
    pub content_id: String,
    #[serde(with = "serde_timestamp")]
    pub freeze_time: Timestamp,
}

impl InputSpec {
    pub fn new(kind: impl Into<String>, content_id: impl Into<String>, freeze_time: Timestamp) -> Self {
        Self {
            kind: kind.into(),
            content_id: content_id.into(),
            freeze_time,
        }
    }

    /// Identity of the referenced bead, given the name it is looked up by
    pub fn identity_as(&self, name: &str) -> BeadIdentity {
        BeadIdentity::new(name, &self.kind, &self.content_id, self.freeze_time)
    }
}
