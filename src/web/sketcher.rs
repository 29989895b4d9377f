//! Sketch builder for unit tests
//!
//! Beads are defined by short references like `a1`: the letters are the bead
//! name, the whole reference is the version. Freeze times follow definition
//! order, one day apart from 2000-01-01. Links are drawn as arrows:
//!
//! ```text
//! sketcher.define("a1 b1 c1");
//! sketcher.compile("a1 -> b1 -> c1   a1 ---> c1");
//! ```
//!
//! Referring to an undefined bead panics.

use super::freshness::Freshness;
use super::sketch::{Sketch, SketchBead};
use crate::models::{InputSpec, Timestamp};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

pub const SKETCH_BOX: &str = "main";

#[derive(Debug, Default)]
pub struct Sketcher {
    // reference -> bead, in definition order
    beads: Vec<(String, SketchBead)>,
}

impl Sketcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define beads from whitespace separated references
    pub fn define(&mut self, references: &str) {
        for reference in references.split_whitespace() {
            let name = reference.trim_end_matches(|c: char| c.is_ascii_digit());
            let freeze_time = day(self.beads.len() as i64 + 1);
            let bead = SketchBead {
                name: name.to_string(),
                kind: format!("kind_{}", name),
                content_id: format!("content_id_{}", reference),
                freeze_time,
                box_name: SKETCH_BOX.to_string(),
                inputs: BTreeMap::new(),
                input_map: BTreeMap::new(),
                freshness: Freshness::Real,
            };
            self.beads.push((reference.to_string(), bead));
        }
    }

    /// Add links drawn as `src -> dest` chains; any dash count makes an arrow
    pub fn compile(&mut self, drawing: &str) {
        let mut previous: Option<&str> = None;
        let mut arrow = false;
        for token in drawing.split_whitespace() {
            if token.ends_with('>') && token.trim_end_matches('>').chars().all(|c| c == '-') {
                arrow = true;
                continue;
            }
            if let (Some(src), true) = (previous, arrow) {
                self.link(src, token);
            }
            previous = Some(token);
            arrow = false;
        }
    }

    /// Make `dest` take `src` as input, nicknamed after the name of `src`
    pub fn link(&mut self, src: &str, dest: &str) {
        let source = self.bead(src).clone();
        let spec = InputSpec::new(&source.kind, &source.content_id, source.freeze_time);
        let target = self.bead_mut(dest);
        target.inputs.insert(source.name.clone(), spec);
        target
            .input_map
            .insert(source.name.clone(), source.name.clone());
    }

    /// Mark a defined bead as no longer present under its name
    pub fn phantom(&mut self, reference: &str) {
        self.bead_mut(reference).freshness = Freshness::Phantom;
    }

    /// Copy a bead under a new name, keeping content, time and inputs
    pub fn clone_bead(&mut self, reference: &str, new_name: &str) {
        let mut copy = self.bead(reference).clone();
        copy.name = new_name.to_string();
        copy.freshness = Freshness::Real;
        self.beads.push((new_name.to_string(), copy));
    }

    /// # Panics
    ///
    /// Panics if `reference` was never defined.
    pub fn bead(&self, reference: &str) -> &SketchBead {
        self.beads
            .iter()
            .find(|(r, _)| r == reference)
            .map(|(_, bead)| bead)
            .unwrap_or_else(|| panic!("undefined bead reference {}", reference))
    }

    fn bead_mut(&mut self, reference: &str) -> &mut SketchBead {
        self.beads
            .iter_mut()
            .find(|(r, _)| r == reference)
            .map(|(_, bead)| bead)
            .unwrap_or_else(|| panic!("undefined bead reference {}", reference))
    }

    pub fn sketch(&self) -> Sketch {
        Sketch::from_beads(self.beads.iter().map(|(_, bead)| bead.clone()))
    }
}

fn day(n: i64) -> Timestamp {
    let start = NaiveDate::from_ymd_opt(2000, 1, 1)
        .and_then(|date| date.and_hms_opt(1, 0, 0))
        .unwrap_or_default();
    (start + Duration::days(n - 1)).and_utc().fixed_offset()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::format_timestamp;

    #[test]
    fn test_define_numbers_days() {
        let mut sketcher = Sketcher::new();
        sketcher.define("a1 b1 c1 d1 e1 f1");
        let f1 = sketcher.bead("f1");
        assert_eq!(f1.name, "f");
        assert_eq!(f1.content_id, "content_id_f1");
        assert_eq!(format_timestamp(&f1.freeze_time), "20000106T010000000000+0000");
    }

    #[test]
    fn test_compile_multiline_drawing() {
        let mut sketcher = Sketcher::new();
        sketcher.define("a1 b1 c1 d1 e1 f1");
        sketcher.compile(
            "
            a1 -> b1 -> c1 -> d1

                  b1 ------------> e1 -> f1
            ",
        );
        let sketch = sketcher.sketch();
        assert_eq!(sketch.edges().len(), 5);
        assert!(sketcher.bead("e1").inputs.contains_key("b"));
        assert!(sketcher.bead("a1").inputs.is_empty());
    }

    #[test]
    fn test_long_arrow_links_like_short_one() {
        let mut sketcher = Sketcher::new();
        sketcher.define("a1 b1 c1");
        sketcher.compile("a1 -> b1 -> c1   a1 ---> c1");
        assert_eq!(sketcher.sketch().edges().len(), 3);
        assert!(sketcher.bead("c1").inputs.contains_key("a"));
    }

    #[test]
    #[should_panic(expected = "undefined bead reference x9")]
    fn test_undefined_reference_panics() {
        let mut sketcher = Sketcher::new();
        sketcher.define("a1");
        sketcher.phantom("x9");
    }

    #[test]
    fn test_clone_copies_inputs() {
        let mut sketcher = Sketcher::new();
        sketcher.define("a1 b1");
        sketcher.compile("a1 -> b1");
        sketcher.clone_bead("b1", "other_b");

        let copy = sketcher.bead("other_b");
        assert_eq!(copy.content_id, "content_id_b1");
        assert!(copy.inputs.contains_key("a"));
        assert_eq!(sketcher.sketch().edges().len(), 2);
    }
}
