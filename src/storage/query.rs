//! Box query conditions
//!
//! The set of condition kinds is closed, so conditions are a plain enum and
//! each kind maps to its predicate through a lookup table. A list of
//! conditions matches when every condition matches.

use crate::models::Bead;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum QueryCondition {
    ByName(String),
    ByKind(String),
    ByContentPrefix(String),
}

type Predicate = fn(&dyn Bead, &str) -> bool;

fn has_name(bead: &dyn Bead, name: &str) -> bool {
    bead.name() == name
}

fn has_kind(bead: &dyn Bead, kind: &str) -> bool {
    bead.kind() == kind
}

fn has_content_prefix(bead: &dyn Bead, prefix: &str) -> bool {
    bead.content_id().starts_with(prefix)
}

// 条件类型 -> 判定函数
const CHECKERS: [Predicate; 3] = [has_name, has_kind, has_content_prefix];

impl QueryCondition {
    fn checker(&self) -> (Predicate, &str) {
        match self {
            QueryCondition::ByName(value) => (CHECKERS[0], value.as_str()),
            QueryCondition::ByKind(value) => (CHECKERS[1], value.as_str()),
            QueryCondition::ByContentPrefix(value) => (CHECKERS[2], value.as_str()),
        }
    }

    /// Whether checking the condition needs the bead's content id
    pub fn needs_content(&self) -> bool {
        matches!(self, QueryCondition::ByContentPrefix(_))
    }

    pub fn matches(&self, bead: &dyn Bead) -> bool {
        let (predicate, value) = self.checker();
        predicate(bead, value)
    }
}

/// Whether `bead` satisfies every condition; an empty list matches anything
pub fn matches_all(conditions: &[QueryCondition], bead: &dyn Bead) -> bool {
    conditions.iter().all(|condition| condition.matches(bead))
}

/// Directory listing pruning derived from the name conditions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameFilter {
    /// No name condition, scan every archive
    Any,
    /// Exactly one requested name, only its archive files need opening
    Exact(String),
    /// Conflicting names, nothing can match
    Nothing,
}

impl NameFilter {
    pub fn from_conditions(conditions: &[QueryCondition]) -> Self {
        let mut names = conditions.iter().filter_map(|condition| match condition {
            QueryCondition::ByName(name) => Some(name.as_str()),
            _ => None,
        });
        let Some(first) = names.next() else {
            return NameFilter::Any;
        };
        if names.all(|name| name == first) {
            NameFilter::Exact(first.to_string())
        } else {
            NameFilter::Nothing
        }
    }
}
