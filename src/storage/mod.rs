//! Bead storage
//!
//! Content hashing, boxes of archives and the time based resolution of bead
//! versions across one or more boxes.

pub mod bead_box;
pub mod context;
pub mod hash;
pub mod naming;
pub mod query;
pub mod union;

pub use bead_box::{BeadBox, BoxScan, NameMatches, ARCHIVE_COMMENT};
pub use context::{make_context, merge_contexts, BeadContext};
pub use query::QueryCondition;
pub use union::UnionBox;
