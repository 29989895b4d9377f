//! Repair of input references broken by renames
//!
//! When an archive is renamed, beads referring to it by name get a phantom
//! input. Its recorded content id still identifies the data, so every real
//! bead sharing that content id is a candidate for the new name. Selection
//! always takes the first candidate, candidates being in discovery order;
//! that is deterministic but not necessarily the intended bead, so every
//! ambiguous selection is logged.

use super::sketch::{BeadKey, Sketch, SketchBead};
use crate::error::Result;
use crate::models::timestamp::serde_timestamp;
use crate::models::{Bead, Timestamp};
use crate::storage::BeadBox;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Rewire choices for one bead version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewireEntry {
    pub name: String,
    pub content_id: String,
    #[serde(with = "serde_timestamp")]
    pub freeze_time: Timestamp,
    /// nickname -> candidate names, preferred first
    pub input_map: BTreeMap<String, Vec<String>>,
}

impl RewireEntry {
    fn matches(&self, bead: &dyn Bead) -> bool {
        self.name == bead.name()
            && self.freeze_time == bead.freeze_time()
            && self.content_id == bead.content_id()
    }
}

/// Rewire choices by box name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RewireOptions(pub BTreeMap<String, Vec<RewireEntry>>);

impl RewireOptions {
    pub fn entries_for(&self, box_name: &str) -> &[RewireEntry] {
        self.0.get(box_name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.0.values().all(Vec::is_empty)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_file(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)?;
        Ok(())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }
}

/// One applied choice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RewireSelection {
    pub bead: BeadKey,
    pub input_nick: String,
    pub selected: String,
    pub candidates: Vec<String>,
}

impl RewireSelection {
    pub fn is_ambiguous(&self) -> bool {
        self.candidates.len() > 1
    }
}

/// What an application of rewire options did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewireReport {
    pub selections: Vec<RewireSelection>,
    /// archives whose input map was rewritten
    pub patched: Vec<PathBuf>,
}

impl RewireReport {
    pub fn ambiguous(&self) -> impl Iterator<Item = &RewireSelection> {
        self.selections.iter().filter(|s| s.is_ambiguous())
    }
}

/**
 * Candidate names for every input not resolving to a real bead
 *
 * Every real bead with such an input gets an entry under its box, listing
 * for each broken nickname the distinct names of the real beads with the
 * recorded content id. An empty candidate list leaves the input broken.
 */
pub fn compute_rewire_options(sketch: &Sketch) -> RewireOptions {
    let real: Vec<&SketchBead> = sketch.beads().iter().filter(|b| b.is_not_phantom()).collect();
    let resolvable: HashSet<(&str, &str)> = real
        .iter()
        .map(|bead| (bead.name.as_str(), bead.content_id.as_str()))
        .collect();

    let mut options = RewireOptions::default();
    for bead in &real {
        let mut input_map = BTreeMap::new();
        for (input_nick, spec) in &bead.inputs {
            let target = bead.input_bead_name(input_nick);
            if resolvable.contains(&(target, spec.content_id.as_str())) {
                continue;
            }
            input_map.insert(input_nick.clone(), candidate_names(&real, &spec.content_id));
        }
        if input_map.is_empty() {
            continue;
        }
        options
            .0
            .entry(bead.box_name.clone())
            .or_default()
            .push(RewireEntry {
                name: bead.name.clone(),
                content_id: bead.content_id.clone(),
                freeze_time: bead.freeze_time,
                input_map,
            });
    }
    options
}

// distinct names holding `content_id`, first seen first
fn candidate_names(real: &[&SketchBead], content_id: &str) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for bead in real.iter().filter(|bead| bead.content_id == content_id) {
        if !names.contains(&bead.name) {
            names.push(bead.name.clone());
        }
    }
    names
}

// first candidate of every nickname with one
fn select(entry: &RewireEntry) -> Vec<RewireSelection> {
    let bead = BeadKey {
        name: entry.name.clone(),
        content_id: entry.content_id.clone(),
        freeze_time: entry.freeze_time,
    };
    let mut selections = Vec::new();
    for (input_nick, candidates) in &entry.input_map {
        let Some(selected) = candidates.first() else {
            debug!(bead = %entry.name, input = %input_nick, "No candidate for input");
            continue;
        };
        if candidates.len() > 1 {
            warn!(
                bead = %entry.name,
                input = %input_nick,
                candidates = ?candidates,
                "Input {} of {} has {} candidates. Selected name '{}'",
                input_nick,
                entry.name,
                candidates.len(),
                selected
            );
        }
        selections.push(RewireSelection {
            bead: bead.clone(),
            input_nick: input_nick.clone(),
            selected: selected.clone(),
            candidates: candidates.clone(),
        });
    }
    selections
}

/**
 * Apply rewire options to a sketch
 *
 * Matching beads get their input maps updated, then edges and phantoms are
 * recomputed from the real beads.
 */
pub fn rewire_sketch(sketch: &Sketch, options: &RewireOptions) -> (Sketch, RewireReport) {
    let mut report = RewireReport::default();
    let mut beads: Vec<SketchBead> = Vec::new();

    for bead in sketch.beads().iter().filter(|b| b.is_not_phantom()) {
        let mut bead = bead.clone();
        let entry = options
            .entries_for(&bead.box_name)
            .iter()
            .find(|entry| entry.matches(&bead));
        if let Some(entry) = entry {
            for selection in select(entry) {
                bead.input_map
                    .insert(selection.input_nick.clone(), selection.selected.clone());
                report.selections.push(selection);
            }
        }
        beads.push(bead);
    }

    (Sketch::from_beads(beads), report)
}

/// `compute_rewire_options` then `rewire_sketch`
pub fn auto_rewire(sketch: &Sketch) -> (Sketch, RewireReport) {
    let options = compute_rewire_options(sketch);
    rewire_sketch(sketch, &options)
}

/**
 * Apply rewire options to the archives of a box
 *
 * Only archives matching an entry for this box by name, freeze time and
 * content id are touched, and only their input map changes. Entries
 * without a matching archive are ignored.
 *
 * # Errors
 *
 * Failure to rewrite a matching archive.
 */
pub fn apply_rewire(bead_box: &BeadBox, options: &RewireOptions) -> Result<RewireReport> {
    let mut report = RewireReport::default();
    let entries = options.entries_for(bead_box.name());
    if entries.is_empty() {
        return Ok(report);
    }

    for archive in bead_box.all_beads() {
        // name and time are cheap, the content id is only computed for candidates
        let entry = entries
            .iter()
            .filter(|e| e.name == archive.name() && e.freeze_time == archive.freeze_time())
            .find(|e| e.matches(&archive));
        let Some(entry) = entry else {
            continue;
        };

        let selections = select(entry);
        let mut input_map = archive.input_map();
        let mut changed = false;
        for selection in &selections {
            let previous = input_map.insert(selection.input_nick.clone(), selection.selected.clone());
            changed |= previous.as_deref() != Some(selection.selected.as_str());
        }
        report.selections.extend(selections);

        if changed {
            archive.save_input_map(&input_map)?;
            info!(
                box_name = %bead_box.name(),
                archive = %archive.archive_path().display(),
                "Rewired input map"
            );
            report.patched.push(archive.archive_path().to_path_buf());
        }
    }
    Ok(report)
}
