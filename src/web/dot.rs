//! Graphviz DOT rendering of sketches

use super::sketch::{BeadKey, Sketch};
use crate::models::format_timestamp;
use std::collections::HashMap;
use std::fmt::Write;

const SHORT_CONTENT_ID: usize = 8;

/// DOT text of `sketch`, one subgraph per cluster, phantoms dashed
pub fn to_dot(sketch: &Sketch) -> String {
    let mut ids: HashMap<BeadKey, String> = HashMap::new();
    for (index, bead) in sketch.beads().iter().enumerate() {
        ids.insert(bead.key(), format!("bead_{}", index));
    }

    let mut dot = String::new();
    dot.push_str("digraph {\n");
    dot.push_str("  rankdir=\"LR\";\n");
    dot.push_str("  node [shape=\"box\"];\n");

    for (cluster_index, cluster) in sketch.cluster_by_name().values().enumerate() {
        let _ = writeln!(dot, "  subgraph cluster_{} {{", cluster_index);
        let _ = writeln!(dot, "    label=\"{}\";", escape(&cluster.name));
        for bead in &cluster.beads {
            let Some(id) = ids.get(&bead.key()) else {
                continue;
            };
            let content_id: String = bead.content_id.chars().take(SHORT_CONTENT_ID).collect();
            let style = if bead.is_not_phantom() { "solid" } else { "dashed" };
            let _ = writeln!(
                dot,
                "    {} [label=\"{}\\n{}\\n{}\", style=\"{}\"];",
                id,
                escape(&bead.name),
                format_timestamp(&bead.freeze_time),
                escape(&content_id),
                style
            );
        }
        dot.push_str("  }\n");
    }

    for edge in sketch.edges() {
        if let (Some(src), Some(dest)) = (ids.get(&edge.src), ids.get(&edge.dest)) {
            let _ = writeln!(dot, "  {} -> {} [label=\"{}\"];", src, dest, escape(&edge.label));
        }
    }

    dot.push_str("}\n");
    dot
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}
