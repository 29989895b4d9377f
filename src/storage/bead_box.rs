use super::context::{make_context, BeadContext};
use super::naming::{archive_file_name, is_archive_of};
use super::query::{matches_all, NameFilter, QueryCondition};
use crate::archive::Archive;
use crate::error::{BeadError, Result};
use crate::models::{Bead, Timestamp};
use crate::workspace::Workspace;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Comment embedded in every archive stored through a box
pub const ARCHIVE_COMMENT: &str = "
This file is a BEAD zip archive.

It is a normal zip file that stores a discrete computation of the form

    output = code(*inputs)

The archive contains

- inputs as part of metadata file: references (content_id) to other BEADs
- code   as files
- output as files
- extra metadata to support
  - linking different versions of the same computation
  - determining the newest version
  - reproducing multi-BEAD computation sequences built by a distributed team

----

";

/**
 * Names known for a kind, as found by `BeadBox::find_names`
 */
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NameMatches {
    /// name of a bead with matching kind and content id
    pub exact_match: Option<String>,
    /// name of the bead of matching kind frozen closest to the query time
    pub best_guess: Option<String>,
    pub best_guess_freeze_time: Option<Timestamp>,
    /// every name of the kind
    pub names: BTreeSet<String>,
}

impl NameMatches {
    /// Fold another bead of the queried kind into the result
    pub(crate) fn observe(&mut self, bead: &dyn Bead, content_id: &str, timestamp: Timestamp) {
        if self.exact_match.is_none() && bead.content_id() == content_id {
            self.exact_match = Some(bead.name().to_string());
        }

        let freeze_time = bead.freeze_time();
        let distance = time_distance(freeze_time, timestamp);
        let better = match self.best_guess_freeze_time {
            None => true,
            Some(best_time) => {
                let best_distance = time_distance(best_time, timestamp);
                distance < best_distance || (distance == best_distance && freeze_time > best_time)
            }
        };
        if better {
            self.best_guess = Some(bead.name().to_string());
            self.best_guess_freeze_time = Some(freeze_time);
        }

        self.names.insert(bead.name().to_string());
    }
}

fn time_distance(a: Timestamp, b: Timestamp) -> chrono::Duration {
    if a > b {
        a - b
    } else {
        b - a
    }
}

/**
 * A directory storing bead archives
 *
 * Archives are discovered by listing the directory, nothing is cached.
 */
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BeadBox {
    name: String,
    directory: PathBuf,
}

impl BeadBox {
    pub fn new(name: impl Into<String>, directory: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            directory: directory.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /**
     * Freeze a workspace into this box
     *
     * # Arguments
     *
     * * `workspace` - Workspace to pack, its name becomes the bead name
     * * `freeze_time` - Must be unique for the name, archives are not deduplicated
     *
     * # Returns
     *
     * Path of the new archive
     *
     * # Errors
     *
     * `Storage` if the box directory is missing or is not a directory.
     */
    pub fn store(&self, workspace: &Workspace, freeze_time: Timestamp) -> Result<PathBuf> {
        if !self.directory.exists() {
            return Err(BeadError::storage_error(
                &self.name,
                format!("directory {} does not exist", self.directory.display()),
            ));
        }
        if !self.directory.is_dir() {
            return Err(BeadError::storage_error(
                &self.name,
                format!("{} is not a directory", self.directory.display()),
            ));
        }

        let archive_path = self
            .directory
            .join(archive_file_name(&workspace.name(), &freeze_time));
        workspace.pack(&archive_path, freeze_time, ARCHIVE_COMMENT)?;
        info!(
            box_name = %self.name,
            archive = %archive_path.display(),
            "Stored bead"
        );
        Ok(archive_path)
    }

    /// Every readable archive in the box, in file name order
    pub fn all_beads(&self) -> BoxScan {
        self.scan(&NameFilter::Any)
    }

    /**
     * Archives matching every condition
     *
     * When a condition looks at the content id, archives whose content id
     * cannot be computed are skipped.
     */
    pub fn beads<'a>(
        &self,
        conditions: &'a [QueryCondition],
    ) -> impl Iterator<Item = Archive> + 'a {
        let needs_content = conditions.iter().any(QueryCondition::needs_content);
        self.scan(&NameFilter::from_conditions(conditions))
            .filter(move |archive| {
                if !needs_content {
                    return true;
                }
                match archive.try_content_id() {
                    Ok(_) => true,
                    Err(e) => {
                        debug!(archive = %archive.archive_path().display(), error = %e, "Skipping archive without content id");
                        false
                    }
                }
            })
            .filter(move |archive| matches_all(conditions, archive))
    }

    /// First bead called `name` whose content id starts with `content_id`
    pub fn find_bead(&self, name: &str, content_id: &str) -> Option<Archive> {
        let conditions = [
            QueryCondition::ByName(name.to_string()),
            QueryCondition::ByContentPrefix(content_id.to_string()),
        ];
        let mut matching = self.beads(&conditions);
        matching.next()
    }

    /**
     * Names used for beads of `kind`
     *
     * Tracks an exact content match and, independently, the name frozen
     * closest to `timestamp` (the later one on ties). A missing box directory
     * gives an empty result.
     */
    pub fn find_names(&self, kind: &str, content_id: &str, timestamp: Timestamp) -> NameMatches {
        let mut matches = NameMatches::default();
        let kind_condition = [QueryCondition::ByKind(kind.to_string())];
        for bead in self.beads(&kind_condition) {
            matches.observe(&bead, content_id, timestamp);
        }
        matches
    }

    /**
     * Versions around `time` of the beads matching `condition`
     *
     * # Errors
     *
     * `NotFound` if no bead matches in either direction.
     */
    pub fn get_context(
        &self,
        condition: &QueryCondition,
        time: Timestamp,
    ) -> Result<BeadContext<Archive>> {
        let conditions = std::slice::from_ref(condition);
        make_context(time, self.beads(conditions)).map_err(|e| {
            if e.is_not_found() {
                BeadError::not_found(format!("{:?} in box {}", condition, self.name))
            } else {
                e
            }
        })
    }

    /// Best version for `time`, see `BeadContext::best`
    pub fn get_at(&self, condition: &QueryCondition, time: Timestamp) -> Result<Archive> {
        Ok(self.get_context(condition, time)?.into_best())
    }

    fn scan(&self, filter: &NameFilter) -> BoxScan {
        let paths = match filter {
            NameFilter::Nothing => Vec::new(),
            NameFilter::Any => self.list_files(|_| true),
            NameFilter::Exact(name) => self.list_files(|file_name| is_archive_of(file_name, name)),
        };
        BoxScan {
            box_name: self.name.clone(),
            paths: paths.into_iter(),
        }
    }

    // snapshot of the directory listing taken now
    fn list_files(&self, accept: impl Fn(&str) -> bool) -> Vec<PathBuf> {
        let entries = match fs::read_dir(&self.directory) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(box_name = %self.name, error = %e, "Box directory not readable");
                return Vec::new();
            }
        };
        let mut paths: Vec<PathBuf> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .filter(|entry| accept(&entry.file_name().to_string_lossy()))
            .map(|entry| entry.path())
            .collect();
        paths.sort();
        paths
    }
}

/**
 * Lazy scan over a box directory snapshot
 *
 * Files that vanished or can not be opened as archives are skipped.
 */
#[derive(Debug)]
pub struct BoxScan {
    box_name: String,
    paths: std::vec::IntoIter<PathBuf>,
}

impl Iterator for BoxScan {
    type Item = Archive;

    fn next(&mut self) -> Option<Archive> {
        for path in self.paths.by_ref() {
            match Archive::open(&path, &self.box_name) {
                Ok(archive) => return Some(archive),
                Err(e) => {
                    debug!(box_name = %self.box_name, path = %path.display(), error = %e, "Skipping unreadable archive");
                }
            }
        }
        None
    }
}
