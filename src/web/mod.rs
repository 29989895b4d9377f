/**
 * Bead web: dependency graph tooling
 *
 * Sketches built from boxes or snapshots, freshness of their nodes,
 * rewiring of broken input references, reachability filtering and DOT
 * output.
 */
pub mod dot;
pub mod filter;
pub mod freshness;
pub mod rewire;
pub mod sketch;
#[cfg(test)]
pub(crate) mod sketcher;

pub use dot::to_dot;
pub use filter::filter;
pub use freshness::Freshness;
pub use rewire::{
    apply_rewire, auto_rewire, compute_rewire_options, rewire_sketch, RewireEntry, RewireOptions,
    RewireReport, RewireSelection,
};
pub use sketch::{BeadKey, Cluster, Edge, Sketch, SketchBead};
