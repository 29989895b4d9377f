//! Time scoped bead resolution
//!
//! A `BeadContext` holds, for a query time, the bead frozen exactly at that
//! time (if any) and the closest versions before and after it.

use crate::error::{BeadError, Result};
use crate::models::{format_timestamp, Bead, Timestamp};

#[derive(Debug, Clone, Copy)]
enum Slot {
    Exact,
    Prev,
    Next,
}

#[derive(Debug, Clone)]
pub struct BeadContext<B> {
    time: Timestamp,
    exact_match: Option<B>,
    prev: Option<B>,
    next: Option<B>,
}

impl<B: Bead> BeadContext<B> {
    /**
     * Create a context, checking its invariants
     *
     * # Errors
     *
     * `Invariant` if a bead is on the wrong side of `time` or if all three
     * are missing.
     */
    pub fn new(
        time: Timestamp,
        exact_match: Option<B>,
        prev: Option<B>,
        next: Option<B>,
    ) -> Result<Self> {
        if exact_match.as_ref().is_some_and(|b| b.freeze_time() != time) {
            return Err(BeadError::invariant("exact match is not frozen at the query time"));
        }
        if prev.as_ref().is_some_and(|b| b.freeze_time() >= time) {
            return Err(BeadError::invariant("previous bead is not before the query time"));
        }
        if next.as_ref().is_some_and(|b| b.freeze_time() <= time) {
            return Err(BeadError::invariant("next bead is not after the query time"));
        }
        if exact_match.is_none() && prev.is_none() && next.is_none() {
            return Err(BeadError::invariant("empty bead context"));
        }
        Ok(Self {
            time,
            exact_match,
            prev,
            next,
        })
    }

    pub fn time(&self) -> Timestamp {
        self.time
    }

    pub fn exact_match(&self) -> Option<&B> {
        self.exact_match.as_ref()
    }

    pub fn prev(&self) -> Option<&B> {
        self.prev.as_ref()
    }

    pub fn next(&self) -> Option<&B> {
        self.next.as_ref()
    }

    /// The exact match, else the temporally closer neighbour; ties go to the later one
    pub fn best(&self) -> &B {
        let best = match self.best_slot() {
            Slot::Exact => &self.exact_match,
            Slot::Prev => &self.prev,
            Slot::Next => &self.next,
        };
        // `new` rules out an empty context
        best.as_ref().unwrap_or_else(|| unreachable!("empty bead context"))
    }

    pub fn into_best(self) -> B {
        let best = match self.best_slot() {
            Slot::Exact => self.exact_match,
            Slot::Prev => self.prev,
            Slot::Next => self.next,
        };
        best.unwrap_or_else(|| unreachable!("empty bead context"))
    }

    fn best_slot(&self) -> Slot {
        match (&self.exact_match, &self.prev, &self.next) {
            (Some(_), _, _) => Slot::Exact,
            (None, Some(prev), Some(next)) => {
                if self.time - prev.freeze_time() < next.freeze_time() - self.time {
                    Slot::Prev
                } else {
                    Slot::Next
                }
            }
            (None, Some(_), None) => Slot::Prev,
            (None, None, _) => Slot::Next,
        }
    }

    fn into_beads(self) -> impl Iterator<Item = B> {
        self.exact_match.into_iter().chain(self.prev).chain(self.next)
    }
}

/**
 * Build the context of `time` from candidate beads
 *
 * For equally close neighbours the first one seen is kept.
 *
 * # Errors
 *
 * * `NotFound` - no candidates at all
 * * `Invariant` - two beads frozen at `time` with different content
 */
pub fn make_context<B, I>(time: Timestamp, beads: I) -> Result<BeadContext<B>>
where
    B: Bead,
    I: IntoIterator<Item = B>,
{
    let mut exact_match: Option<B> = None;
    let mut prev: Option<B> = None;
    let mut next: Option<B> = None;

    for bead in beads {
        let freeze_time = bead.freeze_time();
        if freeze_time < time {
            if prev.as_ref().map_or(true, |p| p.freeze_time() < freeze_time) {
                prev = Some(bead);
            }
        } else if freeze_time > time {
            if next.as_ref().map_or(true, |n| freeze_time < n.freeze_time()) {
                next = Some(bead);
            }
        } else if let Some(existing) = &exact_match {
            if existing.content_id() != bead.content_id() {
                return Err(BeadError::invariant(format!(
                    "multiple beads with same freeze time {}: {} and {}",
                    format_timestamp(&time),
                    existing.name(),
                    bead.name()
                )));
            }
        } else {
            exact_match = Some(bead);
        }
    }

    if exact_match.is_none() && prev.is_none() && next.is_none() {
        return Err(BeadError::not_found(format!(
            "no bead around {}",
            format_timestamp(&time)
        )));
    }
    BeadContext::new(time, exact_match, prev, next)
}

/**
 * Merge contexts of the same query time
 *
 * Beads of earlier contexts win over equally good ones of later contexts.
 *
 * # Errors
 *
 * `NotFound` for an empty input, `Invariant` if the query times differ.
 */
pub fn merge_contexts<B, I>(contexts: I) -> Result<BeadContext<B>>
where
    B: Bead,
    I: IntoIterator<Item = BeadContext<B>>,
{
    let mut time: Option<Timestamp> = None;
    let mut beads = Vec::new();
    for context in contexts {
        match time {
            None => time = Some(context.time),
            Some(t) if t != context.time => {
                return Err(BeadError::invariant("merging contexts of different times"))
            }
            Some(_) => {}
        }
        beads.extend(context.into_beads());
    }
    let time = time.ok_or_else(|| BeadError::not_found("no bead context to merge"))?;
    make_context(time, beads)
}
