use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a sketch node is backed by a discovered bead
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Freshness {
    /// a bead with this name and content was found
    #[default]
    Real,
    /// only known from an input reference that no longer resolves by name
    Phantom,
}

impl Freshness {
    pub fn is_phantom(self) -> bool {
        self == Freshness::Phantom
    }
}

impl fmt::Display for Freshness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Freshness::Real => write!(f, "real"),
            Freshness::Phantom => write!(f, "phantom"),
        }
    }
}
