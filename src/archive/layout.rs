//! Entry layout of a bead archive
//!
//! ```text
//! meta/bead        bead metadata (kind, freeze time, declared inputs)
//! meta/manifest    path -> digest for every code/ and data/ file
//! meta/input.map   nickname -> bead name, mutable, not part of the content id
//! code/...         source files
//! data/...         output files
//! ```

pub const META: &str = "meta";
pub const CODE: &str = "code";
pub const DATA: &str = "data";

pub const BEAD_META: &str = "meta/bead";
pub const MANIFEST: &str = "meta/manifest";

// volatile content, not included in the content id
pub const INPUT_MAP: &str = "meta/input.map";

/// Whether an entry belongs to the hashed code/data trees
pub fn is_content_entry(name: &str) -> bool {
    name.starts_with("code/") || name.starts_with("data/")
}

/// Whether an entry is one of the known metadata files
pub fn is_meta_entry(name: &str) -> bool {
    name == BEAD_META || name == MANIFEST || name == INPUT_MAP
}
