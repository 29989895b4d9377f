//! Workspace
//!
//! A mutable directory that becomes a bead when packed. Layout:
//!
//! ```text
//! <workspace>/
//!   .bead-meta/bead        kind and declared inputs
//!   .bead-meta/input.map   nickname -> bead name
//!   input/<nick>/          loaded input data, read-only
//!   output/                packed as data/
//!   temp/                  never packed
//!   ...                    everything else is packed as code/
//! ```

pub mod permissions;

use crate::archive::{layout, Archive, BeadMeta, InputMap, Manifest};
use crate::error::{BeadError, Result};
use crate::models::{Bead, InputSpec, Timestamp};
use crate::storage::hash::hash_path;
use permissions::{archive_temp_file, make_readonly_recursive, make_writable_recursive};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

pub const INPUT: &str = "input";
pub const OUTPUT: &str = "output";
pub const TEMP: &str = "temp";
pub const META: &str = ".bead-meta";

const BEAD_META: &str = "bead";
const INPUT_MAP: &str = "input.map";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    directory: PathBuf,
}

impl Workspace {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
        }
    }

    /**
     * The workspace containing the current working directory
     *
     * Walks up from the working directory; when no ancestor is a valid
     * workspace, the working directory itself is returned.
     */
    pub fn for_current_working_directory() -> Result<Self> {
        let cwd = dunce::canonicalize(std::env::current_dir()?)?;
        let found = cwd
            .ancestors()
            .map(Workspace::new)
            .find(Workspace::is_valid);
        Ok(found.unwrap_or_else(|| Workspace::new(cwd)))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Workspace name, the last component of its directory
    pub fn name(&self) -> String {
        self.directory
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    pub fn is_valid(&self) -> bool {
        self.directory.is_dir() && self.meta().is_ok()
    }

    /**
     * Create an empty workspace of `kind`
     *
     * # Errors
     *
     * `Workspace` if the directory already holds a workspace.
     */
    pub fn create(&self, kind: &str) -> Result<()> {
        if self.is_valid() {
            return Err(BeadError::workspace_error(format!(
                "{} is already a workspace",
                self.directory.display()
            )));
        }
        for subdirectory in [INPUT, OUTPUT, TEMP, META] {
            fs::create_dir_all(self.directory.join(subdirectory))?;
        }
        self.save_meta(&BeadMeta::new(kind))?;
        self.save_input_map(&InputMap::new())?;
        info!(workspace = %self.directory.display(), kind = %kind, "Created workspace");
        Ok(())
    }

    pub fn meta(&self) -> Result<BeadMeta> {
        let bytes = fs::read(self.meta_path(BEAD_META))?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    fn save_meta(&self, meta: &BeadMeta) -> Result<()> {
        fs::write(self.meta_path(BEAD_META), serde_json::to_vec_pretty(meta)?)?;
        Ok(())
    }

    pub fn kind(&self) -> Result<String> {
        Ok(self.meta()?.kind)
    }

    pub fn inputs(&self) -> Result<BTreeMap<String, InputSpec>> {
        Ok(self.meta()?.inputs)
    }

    pub fn has_input(&self, input_nick: &str) -> bool {
        self.meta()
            .map(|meta| meta.inputs.contains_key(input_nick))
            .unwrap_or(false)
    }

    pub fn is_loaded(&self, input_nick: &str) -> bool {
        self.input_directory(input_nick).is_dir()
    }

    /// Declare (or redeclare) an input
    pub fn add_input(
        &self,
        input_nick: &str,
        kind: &str,
        content_id: &str,
        freeze_time: Timestamp,
    ) -> Result<()> {
        let mut meta = self.meta()?;
        meta.inputs.insert(
            input_nick.to_string(),
            InputSpec::new(kind, content_id, freeze_time),
        );
        self.save_meta(&meta)
    }

    /// Forget an input, unloading its data
    pub fn delete_input(&self, input_nick: &str) -> Result<()> {
        if self.is_loaded(input_nick) {
            self.unload(input_nick)?;
        }
        let mut meta = self.meta()?;
        meta.inputs.remove(input_nick);
        self.save_meta(&meta)?;

        let mut input_map = self.input_map();
        if input_map.remove(input_nick).is_some() {
            self.save_input_map(&input_map)?;
        }
        Ok(())
    }

    /// Current input map, empty when missing or unreadable
    pub fn input_map(&self) -> InputMap {
        fs::read(self.meta_path(INPUT_MAP))
            .ok()
            .and_then(|bytes| serde_json::from_slice(&bytes).ok())
            .unwrap_or_default()
    }

    fn save_input_map(&self, input_map: &InputMap) -> Result<()> {
        fs::write(
            self.meta_path(INPUT_MAP),
            serde_json::to_vec_pretty(input_map)?,
        )?;
        Ok(())
    }

    pub fn get_input_bead_name(&self, input_nick: &str) -> String {
        self.input_map()
            .get(input_nick)
            .cloned()
            .unwrap_or_else(|| input_nick.to_string())
    }

    pub fn set_input_bead_name(&self, input_nick: &str, bead_name: &str) -> Result<()> {
        let mut input_map = self.input_map();
        input_map.insert(input_nick.to_string(), bead_name.to_string());
        self.save_input_map(&input_map)
    }

    /**
     * Load the data of `archive` as input `input_nick`
     *
     * Replaces previously loaded data, declares the input and records the
     * archive's name in the input map. Loaded files are read-only.
     */
    pub fn load(&self, input_nick: &str, archive: &Archive) -> Result<()> {
        if self.is_loaded(input_nick) {
            self.unload(input_nick)?;
        }
        let destination = self.input_directory(input_nick);
        archive.unpack_data_to(&destination)?;
        make_readonly_recursive(&destination)?;

        self.add_input(
            input_nick,
            archive.kind(),
            archive.try_content_id()?,
            archive.freeze_time(),
        )?;
        self.set_input_bead_name(input_nick, archive.name())?;
        info!(
            workspace = %self.directory.display(),
            input = %input_nick,
            bead = %archive.name(),
            "Loaded input"
        );
        Ok(())
    }

    /// Remove loaded data of an input, keeping its declaration
    pub fn unload(&self, input_nick: &str) -> Result<()> {
        let directory = self.input_directory(input_nick);
        if directory.exists() {
            make_writable_recursive(&directory)?;
            fs::remove_dir_all(&directory)?;
            debug!(input = %input_nick, "Unloaded input");
        }
        Ok(())
    }

    /**
     * Freeze the workspace into an archive at `destination`
     *
     * Written to a temporary file next to `destination` and moved into
     * place when complete.
     *
     * # Arguments
     *
     * * `destination` - Path of the archive to create
     * * `freeze_time` - Freeze time recorded in the bead meta
     * * `comment` - Container comment
     */
    pub fn pack(&self, destination: &Path, freeze_time: Timestamp, comment: &str) -> Result<()> {
        let meta = self.meta()?.frozen_at(freeze_time);
        let input_map = self.input_map();
        let files = self.packed_files()?;

        let directory = destination
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = archive_temp_file(directory)?;

        {
            let mut writer = ZipWriter::new(temp.as_file_mut());
            writer.set_comment(comment.to_string());
            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);

            let mut manifest = Manifest::new();
            for (archive_name, path) in &files {
                manifest.insert(archive_name.clone(), hash_path(path)?);
                writer.start_file(archive_name.as_str(), options)?;
                io::copy(&mut File::open(path)?, &mut writer)?;
            }

            writer.start_file(layout::MANIFEST, options)?;
            writer.write_all(&serde_json::to_vec_pretty(&manifest)?)?;
            writer.start_file(layout::BEAD_META, options)?;
            writer.write_all(&serde_json::to_vec_pretty(&meta)?)?;
            writer.start_file(layout::INPUT_MAP, options)?;
            writer.write_all(&serde_json::to_vec_pretty(&input_map)?)?;
            writer.finish()?;
        }

        temp.persist(destination)
            .map_err(|e| BeadError::Io(e.error))?;
        info!(
            workspace = %self.directory.display(),
            archive = %destination.display(),
            files = files.len(),
            "Packed workspace"
        );
        Ok(())
    }

    // (archive entry name, file on disk), sorted by entry name
    fn packed_files(&self) -> Result<Vec<(String, PathBuf)>> {
        let mut files = Vec::new();
        let walker = WalkDir::new(&self.directory)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() != 1 || {
                    let name = entry.file_name();
                    name != INPUT && name != TEMP && name != META
                }
            });

        for entry in walker {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&self.directory)
                .map_err(|e| BeadError::workspace_error(e.to_string()))?;
            let parts: Vec<String> = relative
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();

            let archive_name = match parts.split_first() {
                Some((top, rest)) if top == OUTPUT => format!("{}/{}", layout::DATA, rest.join("/")),
                _ => format!("{}/{}", layout::CODE, parts.join("/")),
            };
            files.push((archive_name, entry.path().to_path_buf()));
        }
        files.sort();
        Ok(files)
    }

    fn meta_path(&self, file_name: &str) -> PathBuf {
        self.directory.join(META).join(file_name)
    }

    fn input_directory(&self, input_nick: &str) -> PathBuf {
        self.directory.join(INPUT).join(input_nick)
    }
}
