//! Bead metadata as stored in `meta/bead` and `.bead-meta/bead`

use crate::models::timestamp::serde_timestamp;
use crate::models::{InputSpec, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Version tag of the metadata format
pub const META_VERSION: &str = "aaa947a6-1f7a-11e6-ba3a-0021cc73492e";

/// path -> digest of every code/ and data/ entry
pub type Manifest = BTreeMap<String, String>;

/// nickname -> name of the bead the input is loaded from
pub type InputMap = BTreeMap<String, String>;

/// Bead metadata
///
/// Workspaces carry the same structure without a freeze time; packing sets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeadMeta {
    pub meta_version: String,
    pub kind: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "serde_timestamp::option"
    )]
    pub freeze_time: Option<Timestamp>,
    #[serde(default)]
    pub inputs: BTreeMap<String, InputSpec>,
}

impl BeadMeta {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            meta_version: META_VERSION.to_string(),
            kind: kind.into(),
            freeze_time: None,
            inputs: BTreeMap::new(),
        }
    }

    pub fn frozen_at(&self, freeze_time: Timestamp) -> Self {
        Self {
            freeze_time: Some(freeze_time),
            ..self.clone()
        }
    }
}
