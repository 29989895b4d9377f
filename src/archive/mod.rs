/**
 * Bead archive module
 *
 * On-disk container of a frozen bead: layout constants, the metadata
 * documents and the `Archive` accessor.
 */
pub mod bead_archive;
pub mod layout;
pub mod meta;

pub use bead_archive::Archive;
pub use meta::{BeadMeta, InputMap, Manifest, META_VERSION};
