//! Reachability bounded sub-sketches
//!
//! Reachability is computed between clusters: reaching any version of a bead
//! reaches its whole version history, so a path may enter a cluster through
//! one version and leave it through another.

use super::sketch::Sketch;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

type ClusterLinks = BTreeMap<String, BTreeSet<String>>;

/**
 * Part of `sketch` between the `sources` and `sinks` clusters
 *
 * # Arguments
 *
 * * `sources` - Cluster names to start from, empty means every cluster
 * * `sinks` - Cluster names to end at, empty means every cluster
 *
 * # Returns
 *
 * Every node of the clusters both reachable from a source and reaching a
 * sink, with the edges between them. Unknown names reach nothing.
 */
pub fn filter(sketch: &Sketch, sources: &BTreeSet<String>, sinks: &BTreeSet<String>) -> Sketch {
    let clusters: BTreeSet<String> = sketch.beads().iter().map(|b| b.name.clone()).collect();

    let mut forward_links = ClusterLinks::new();
    let mut backward_links = ClusterLinks::new();
    for edge in sketch.edges() {
        forward_links
            .entry(edge.src.name.clone())
            .or_default()
            .insert(edge.dest.name.clone());
        backward_links
            .entry(edge.dest.name.clone())
            .or_default()
            .insert(edge.src.name.clone());
    }

    let forward = if sources.is_empty() {
        clusters.clone()
    } else {
        reachable(&forward_links, sources, &clusters)
    };
    let backward = if sinks.is_empty() {
        clusters.clone()
    } else {
        reachable(&backward_links, sinks, &clusters)
    };

    let kept: BTreeSet<String> = forward.intersection(&backward).cloned().collect();
    debug!(
        sources = ?sources,
        sinks = ?sinks,
        kept = ?kept,
        "Filtered sketch"
    );
    sketch.retain_beads(|bead| kept.contains(&bead.name))
}

// breadth first, every cluster is expanded at most once
fn reachable(
    links: &ClusterLinks,
    starts: &BTreeSet<String>,
    clusters: &BTreeSet<String>,
) -> BTreeSet<String> {
    let mut visited: BTreeSet<String> = BTreeSet::new();
    let mut queue: VecDeque<&str> = VecDeque::new();

    for start in starts.iter().filter(|name| clusters.contains(*name)) {
        if visited.insert(start.clone()) {
            queue.push_back(start);
        }
    }

    while let Some(cluster) = queue.pop_front() {
        let Some(neighbours) = links.get(cluster) else {
            continue;
        };
        for neighbour in neighbours {
            if visited.insert(neighbour.clone()) {
                queue.push_back(neighbour);
            }
        }
    }
    visited
}
