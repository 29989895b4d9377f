//! Bead Test Helper Functions
//!
//! Builds boxes and frozen beads through real workspaces, so integration
//! tests exercise the same packing path as production code.

#![allow(dead_code)]

use bead::archive::Archive;
use bead::models::{time_from_timestamp, Timestamp};
use bead::storage::BeadBox;
use bead::workspace::Workspace;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub type BeadTestResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Freeze time of day `n` of January 2000, 01:00 UTC
pub fn day(n: u32) -> Timestamp {
    time_from_timestamp(&format!("200001{:02}T010000000000+0000", n)).unwrap()
}

/// A temporary tree holding boxes
pub struct BoxTestEnv {
    pub temp_dir: TempDir,
}

impl BoxTestEnv {
    pub fn new() -> Self {
        Self {
            temp_dir: TempDir::new().unwrap(),
        }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// A box with its directory created
    pub fn make_box(&self, name: &str) -> BeadBox {
        let directory = self.path().join("boxes").join(name);
        fs::create_dir_all(&directory).unwrap();
        BeadBox::new(name, directory)
    }
}

/// What goes into a bead before it is frozen
pub struct BeadSpec<'a> {
    pub name: &'a str,
    pub kind: &'a str,
    /// workspace relative path -> content; `output/...` becomes data
    pub files: Vec<(&'a str, &'a str)>,
    /// input nickname -> archive loaded under it
    pub inputs: Vec<(&'a str, &'a Archive)>,
}

impl<'a> BeadSpec<'a> {
    pub fn new(name: &'a str, kind: &'a str) -> Self {
        Self {
            name,
            kind,
            files: vec![("main.py", "print('hello')\n")],
            inputs: Vec::new(),
        }
    }

    pub fn file(mut self, path: &'a str, content: &'a str) -> Self {
        self.files.push((path, content));
        self
    }

    pub fn input(mut self, input_nick: &'a str, archive: &'a Archive) -> Self {
        self.inputs.push((input_nick, archive));
        self
    }
}

/// Write a workspace for `spec` under `parent`, with inputs loaded
pub fn make_workspace(parent: &Path, spec: &BeadSpec<'_>) -> Workspace {
    let workspace = Workspace::new(parent.join(spec.name));
    workspace.create(spec.kind).unwrap();
    for (path, content) in &spec.files {
        let file = workspace.directory().join(path);
        fs::create_dir_all(file.parent().unwrap()).unwrap();
        fs::write(file, content).unwrap();
    }
    for (input_nick, archive) in &spec.inputs {
        workspace.load(input_nick, archive).unwrap();
    }
    workspace
}

/// Freeze `spec` into `bead_box` at `freeze_time` and open the result
pub fn store_bead(bead_box: &BeadBox, spec: &BeadSpec<'_>, freeze_time: Timestamp) -> Archive {
    let scratch = TempDir::new().unwrap();
    let workspace = make_workspace(scratch.path(), spec);
    let archive_path = bead_box.store(&workspace, freeze_time).unwrap();
    for (input_nick, _) in &spec.inputs {
        workspace.unload(input_nick).unwrap();
    }
    Archive::open(archive_path, bead_box.name()).unwrap()
}

/// Rename an archive file, changing the bead name it carries
pub fn rename_archive(archive: &Archive, new_name: &str) -> PathBuf {
    let file_name = archive.archive_path().file_name().unwrap().to_string_lossy().to_string();
    let suffix = file_name.rsplit_once('_').map(|(_, suffix)| suffix).unwrap();
    let new_path = archive
        .archive_path()
        .with_file_name(format!("{}_{}", new_name, suffix));
    fs::rename(archive.archive_path(), &new_path).unwrap();
    new_path
}
