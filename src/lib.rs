//! Bead: frozen, content addressed computations
//!
//! A bead is a computation frozen into a zip archive together with the
//! references to the beads it consumed. Archives live in boxes; a bead
//! version is found by name, kind or content id and a point in time.
//! The `web` module works on the dependency graph between beads.

pub mod archive;
pub mod error;
pub mod infrastructure;
pub mod models;
pub mod storage;
pub mod web;
pub mod workspace;

pub use archive::Archive;
pub use error::{BeadError, Result};
pub use infrastructure::{init_logging, BeadConfig};
pub use models::{Bead, InputSpec, Timestamp};
pub use storage::{BeadBox, QueryCondition, UnionBox};
pub use web::{Freshness, Sketch};
pub use workspace::Workspace;
