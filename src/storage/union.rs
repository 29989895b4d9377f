use super::bead_box::{BeadBox, NameMatches};
use super::context::{merge_contexts, BeadContext};
use super::query::QueryCondition;
use crate::archive::Archive;
use crate::error::{BeadError, Result};
use crate::models::Timestamp;
use tracing::debug;

/**
 * Several boxes searched as one
 *
 * Box order matters only for equally good candidates: earlier boxes win.
 */
#[derive(Debug, Clone, Default)]
pub struct UnionBox {
    boxes: Vec<BeadBox>,
}

impl UnionBox {
    pub fn new(boxes: impl IntoIterator<Item = BeadBox>) -> Self {
        Self {
            boxes: boxes.into_iter().collect(),
        }
    }

    pub fn boxes(&self) -> &[BeadBox] {
        &self.boxes
    }

    pub fn get_box(&self, name: &str) -> Option<&BeadBox> {
        self.boxes.iter().find(|bead_box| bead_box.name() == name)
    }

    /**
     * Merged context of every box
     *
     * Boxes without a candidate are skipped, any other failure is returned.
     *
     * # Errors
     *
     * `NotFound` only if no box has a candidate.
     */
    pub fn get_context(
        &self,
        condition: &QueryCondition,
        time: Timestamp,
    ) -> Result<BeadContext<Archive>> {
        let mut contexts = Vec::new();
        for bead_box in &self.boxes {
            match bead_box.get_context(condition, time) {
                Ok(context) => contexts.push(context),
                Err(e) if e.is_not_found() => {
                    debug!(box_name = %bead_box.name(), "No candidate in box");
                }
                Err(e) => return Err(e),
            }
        }
        if contexts.is_empty() {
            return Err(BeadError::not_found(format!("{:?} in any box", condition)));
        }
        merge_contexts(contexts)
    }

    pub fn get_at(&self, condition: &QueryCondition, time: Timestamp) -> Result<Archive> {
        Ok(self.get_context(condition, time)?.into_best())
    }

    /// Every readable archive of every box, box by box
    pub fn all_beads(&self) -> impl Iterator<Item = Archive> + '_ {
        self.boxes.iter().flat_map(BeadBox::all_beads)
    }

    pub fn find_bead(&self, name: &str, content_id: &str) -> Option<Archive> {
        self.boxes
            .iter()
            .find_map(|bead_box| bead_box.find_bead(name, content_id))
    }

    /// `BeadBox::find_names` over all boxes: the first exact match wins,
    /// the best guess is the closest over all boxes
    pub fn find_names(&self, kind: &str, content_id: &str, timestamp: Timestamp) -> NameMatches {
        let mut matches = NameMatches::default();
        let kind_condition = [QueryCondition::ByKind(kind.to_string())];
        for bead_box in &self.boxes {
            for bead in bead_box.beads(&kind_condition) {
                matches.observe(&bead, content_id, timestamp);
            }
        }
        matches
    }
}

impl From<Vec<BeadBox>> for UnionBox {
    fn from(boxes: Vec<BeadBox>) -> Self {
        Self { boxes }
    }
}
