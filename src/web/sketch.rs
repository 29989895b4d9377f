//! Dependency graph of beads
//!
//! Nodes are bead versions, edges point from an input bead to the bead
//! consuming it and carry the input nickname. Inputs are resolved by the
//! name in the consumer's input map and the content id recorded at freeze
//! time; references that resolve to no known node produce phantom nodes.

use super::freshness::Freshness;
use crate::archive::{Archive, InputMap};
use crate::error::{BeadError, Result};
use crate::models::timestamp::serde_timestamp;
use crate::models::{Bead, InputSpec, Timestamp};
use crate::storage::{BeadBox, UnionBox};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

/// Identifies a node: a bead version
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BeadKey {
    pub name: String,
    pub content_id: String,
    #[serde(with = "serde_timestamp")]
    pub freeze_time: Timestamp,
}

/// Node of a sketch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SketchBead {
    pub name: String,
    pub kind: String,
    pub content_id: String,
    #[serde(with = "serde_timestamp")]
    pub freeze_time: Timestamp,
    #[serde(default)]
    pub box_name: String,
    #[serde(default)]
    pub inputs: BTreeMap<String, InputSpec>,
    #[serde(default)]
    pub input_map: InputMap,
    #[serde(default)]
    pub freshness: Freshness,
}

impl SketchBead {
    pub fn from_archive(archive: &Archive) -> Result<Self> {
        Ok(Self {
            name: archive.name().to_string(),
            kind: archive.kind().to_string(),
            content_id: archive.try_content_id()?.to_string(),
            freeze_time: archive.freeze_time(),
            box_name: archive.box_name().to_string(),
            inputs: archive.inputs().clone(),
            input_map: archive.input_map(),
            freshness: Freshness::Real,
        })
    }

    /// Stand-in for an input reference that resolves to nothing known
    pub fn phantom(name: &str, spec: &InputSpec, box_name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: spec.kind.clone(),
            content_id: spec.content_id.clone(),
            freeze_time: spec.freeze_time,
            box_name: box_name.to_string(),
            inputs: BTreeMap::new(),
            input_map: InputMap::new(),
            freshness: Freshness::Phantom,
        }
    }

    pub fn key(&self) -> BeadKey {
        BeadKey {
            name: self.name.clone(),
            content_id: self.content_id.clone(),
            freeze_time: self.freeze_time,
        }
    }

    pub fn is_not_phantom(&self) -> bool {
        !self.freshness.is_phantom()
    }

    /// Name the input `input_nick` is looked up by
    pub fn input_bead_name<'a>(&'a self, input_nick: &'a str) -> &'a str {
        self.input_map
            .get(input_nick)
            .map(String::as_str)
            .unwrap_or(input_nick)
    }
}

impl Bead for SketchBead {
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

    fn box_name(&self) -> &str {
        &self.box_name
    }
}

/// `src` is input `label` of `dest`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Edge {
    pub src: BeadKey,
    pub dest: BeadKey,
    pub label: String,
}

/// Versions of one logical bead, oldest first
#[derive(Debug, Clone)]
pub struct Cluster<'a> {
    pub name: String,
    pub beads: Vec<&'a SketchBead>,
}

impl<'a> Cluster<'a> {
    /// Newest version
    pub fn head(&self) -> Option<&'a SketchBead> {
        self.beads.last().copied()
    }

    pub fn len(&self) -> usize {
        self.beads.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beads.is_empty()
    }
}

/**
 * Bead dependency graph
 *
 * Node order is discovery order and is preserved by every transformation
 * and by the snapshot format.
 */
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sketch {
    beads: Vec<SketchBead>,
    edges: Vec<Edge>,
}

impl Sketch {
    /**
     * Sketch from explicit nodes and edges
     *
     * # Errors
     *
     * `InvalidSketch` for duplicate nodes or edges with unknown endpoints.
     */
    pub fn new(beads: Vec<SketchBead>, edges: Vec<Edge>) -> Result<Self> {
        let sketch = Self { beads, edges };
        sketch.validate()?;
        Ok(sketch)
    }

    /**
     * Sketch of `beads` with edges resolved from their inputs
     *
     * Duplicate versions are kept once. Every input reference without a
     * matching node adds a phantom node.
     */
    pub fn from_beads(beads: impl IntoIterator<Item = SketchBead>) -> Self {
        let mut nodes: Vec<SketchBead> = Vec::new();
        let mut seen: HashSet<BeadKey> = HashSet::new();
        for bead in beads {
            if seen.insert(bead.key()) {
                nodes.push(bead);
            } else {
                debug!(bead = %bead.name, "Dropping duplicate bead version");
            }
        }

        // (name, content_id) -> key
        let mut by_name_and_content: HashMap<(String, String), BeadKey> = HashMap::new();
        for bead in &nodes {
            by_name_and_content
                .entry((bead.name.clone(), bead.content_id.clone()))
                .or_insert_with(|| bead.key());
        }

        let mut phantoms: Vec<SketchBead> = Vec::new();
        let mut edges = Vec::new();
        for bead in &nodes {
            for (input_nick, spec) in &bead.inputs {
                let target_name = bead.input_bead_name(input_nick);
                let lookup = (target_name.to_string(), spec.content_id.clone());
                let src = match by_name_and_content.get(&lookup) {
                    Some(key) => key.clone(),
                    None => {
                        let phantom = SketchBead::phantom(target_name, spec, &bead.box_name);
                        let key = phantom.key();
                        debug!(bead = %bead.name, input = %input_nick, target = %target_name, "Input resolves to a phantom");
                        by_name_and_content.insert(lookup, key.clone());
                        phantoms.push(phantom);
                        key
                    }
                };
                edges.push(Edge {
                    src,
                    dest: bead.key(),
                    label: input_nick.clone(),
                });
            }
        }

        nodes.extend(phantoms);
        Self {
            beads: nodes,
            edges,
        }
    }

    /// Sketch of every readable bead in `boxes`
    pub fn from_boxes(boxes: &[BeadBox]) -> Self {
        let beads = boxes.iter().flat_map(BeadBox::all_beads);
        Self::from_archives(beads)
    }

    pub fn from_union_box(union_box: &UnionBox) -> Self {
        Self::from_archives(union_box.all_beads())
    }

    fn from_archives(archives: impl Iterator<Item = Archive>) -> Self {
        let beads = archives.filter_map(|archive| match SketchBead::from_archive(&archive) {
            Ok(bead) => Some(bead),
            Err(e) => {
                warn!(archive = %archive.archive_path().display(), error = %e, "Skipping bead");
                None
            }
        });
        Self::from_beads(beads)
    }

    pub fn beads(&self) -> &[SketchBead] {
        &self.beads
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn is_empty(&self) -> bool {
        self.beads.is_empty()
    }

    pub fn beads_by_key(&self) -> HashMap<BeadKey, &SketchBead> {
        self.beads.iter().map(|bead| (bead.key(), bead)).collect()
    }

    /// Clusters by bead name, versions ordered by freeze time
    pub fn cluster_by_name(&self) -> BTreeMap<String, Cluster<'_>> {
        let mut clusters: BTreeMap<String, Cluster<'_>> = BTreeMap::new();
        for bead in &self.beads {
            clusters
                .entry(bead.name.clone())
                .or_insert_with(|| Cluster {
                    name: bead.name.clone(),
                    beads: Vec::new(),
                })
                .beads
                .push(bead);
        }
        for cluster in clusters.values_mut() {
            cluster.beads.sort_by_key(|bead| bead.freeze_time);
        }
        clusters
    }

    /**
     * Only the newest version of each cluster
     *
     * Edges are moved onto the heads of their endpoint clusters; duplicates
     * and edges inside a single cluster are dropped.
     */
    pub fn heads(&self) -> Sketch {
        let head_of: HashMap<String, BeadKey> = self
            .cluster_by_name()
            .into_values()
            .filter_map(|cluster| cluster.head().map(|head| (cluster.name, head.key())))
            .collect();

        let beads: Vec<SketchBead> = self
            .beads
            .iter()
            .filter(|bead| head_of.get(&bead.name) == Some(&bead.key()))
            .cloned()
            .collect();

        let mut seen = HashSet::new();
        let mut edges = Vec::new();
        for edge in &self.edges {
            let (Some(src), Some(dest)) = (head_of.get(&edge.src.name), head_of.get(&edge.dest.name))
            else {
                continue;
            };
            if src == dest {
                continue;
            }
            let edge = Edge {
                src: src.clone(),
                dest: dest.clone(),
                label: edge.label.clone(),
            };
            if seen.insert(edge.clone()) {
                edges.push(edge);
            }
        }

        Sketch { beads, edges }
    }

    /// Sub-sketch of the nodes accepted by `keep`, with edges between them
    pub fn retain_beads(&self, keep: impl Fn(&SketchBead) -> bool) -> Sketch {
        let beads: Vec<SketchBead> = self.beads.iter().filter(|b| keep(b)).cloned().collect();
        let keys: HashSet<BeadKey> = beads.iter().map(SketchBead::key).collect();
        let edges = self
            .edges
            .iter()
            .filter(|edge| keys.contains(&edge.src) && keys.contains(&edge.dest))
            .cloned()
            .collect();
        Sketch { beads, edges }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let sketch: Sketch = serde_json::from_str(json)?;
        sketch.validate()?;
        Ok(sketch)
    }

    pub fn to_file(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    fn validate(&self) -> Result<()> {
        let mut keys = HashSet::new();
        for bead in &self.beads {
            if !keys.insert(bead.key()) {
                return Err(BeadError::InvalidSketch(format!(
                    "duplicate bead {} ({})",
                    bead.name, bead.content_id
                )));
            }
        }
        for edge in &self.edges {
            for endpoint in [&edge.src, &edge.dest] {
                if !keys.contains(endpoint) {
                    return Err(BeadError::InvalidSketch(format!(
                        "edge {} refers to unknown bead {}",
                        edge.label, endpoint.name
                    )));
                }
            }
        }
        Ok(())
    }
}
