use super::layout;
use super::meta::{BeadMeta, InputMap, Manifest};
use crate::error::{BeadError, Result};
use crate::models::{Bead, InputSpec, Timestamp};
use crate::storage::hash::{hash_file, hash_tree};
use crate::storage::naming::bead_name_from_file_path;
use crate::workspace::permissions::archive_temp_file;
use once_cell::sync::OnceCell;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{self, BufReader, Read, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};
use zip::result::ZipError;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

type ZipReader = ZipArchive<BufReader<File>>;

/// Upper bound for `meta/bead` and `meta/input.map`
const META_ENTRY_LIMIT: u64 = 1 << 20;
const MANIFEST_LIMIT: u64 = 64 << 20;

/**
 * A frozen bead stored in a box
 *
 * Opening only checks that the container is readable and carries bead
 * metadata. The content id is computed on first use and cached; `validate`
 * performs the full manifest check.
 */
#[derive(Debug, Clone)]
pub struct Archive {
    archive_path: PathBuf,
    box_name: String,
    name: String,
    meta: BeadMeta,
    freeze_time: Timestamp,
    content_id: OnceCell<String>,
}

impl Archive {
    /**
     * Open an archive file
     *
     * # Arguments
     *
     * * `archive_path` - Path of the `.zip` file
     * * `box_name` - Name of the box the archive was found in
     *
     * # Errors
     *
     * `InvalidArchive` if the file is not a readable container with a
     * parseable `meta/bead` holding a freeze time.
     */
    pub fn open(archive_path: impl AsRef<Path>, box_name: &str) -> Result<Self> {
        let archive_path = archive_path.as_ref().to_path_buf();
        let mut zip = open_zip(&archive_path)?;

        let bytes = read_entry(&mut zip, layout::BEAD_META, META_ENTRY_LIMIT)
            .map_err(|e| BeadError::invalid_archive(&archive_path, e.to_string()))?
            .ok_or_else(|| BeadError::invalid_archive(&archive_path, "missing meta/bead"))?;
        let meta: BeadMeta = serde_json::from_slice(&bytes).map_err(|e| {
            BeadError::invalid_archive(&archive_path, format!("unreadable meta/bead: {}", e))
        })?;
        let freeze_time = meta.freeze_time.ok_or_else(|| {
            BeadError::invalid_archive(&archive_path, "meta/bead has no freeze time")
        })?;

        Ok(Self {
            name: bead_name_from_file_path(&archive_path),
            box_name: box_name.to_string(),
            archive_path,
            meta,
            freeze_time,
            content_id: OnceCell::new(),
        })
    }

    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    pub fn meta(&self) -> &BeadMeta {
        &self.meta
    }

    pub fn inputs(&self) -> &BTreeMap<String, InputSpec> {
        &self.meta.inputs
    }

    /// Content id, computed on first access
    pub fn try_content_id(&self) -> Result<&str> {
        self.content_id
            .get_or_try_init(|| self.compute_content_id())
            .map(String::as_str)
    }

    /// Current input map; a missing or unreadable `meta/input.map` is empty
    pub fn input_map(&self) -> InputMap {
        let bytes = match open_zip(&self.archive_path)
            .and_then(|mut zip| read_entry(&mut zip, layout::INPUT_MAP, META_ENTRY_LIMIT))
        {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return InputMap::new(),
            Err(e) => {
                warn!(archive = %self.archive_path.display(), error = %e, "Failed to read input map");
                return InputMap::new();
            }
        };
        serde_json::from_slice(&bytes).unwrap_or_else(|e| {
            warn!(archive = %self.archive_path.display(), error = %e, "Ignoring unparseable input map");
            InputMap::new()
        })
    }

    /// Name of the bead loaded for `input_nick`, defaults to the nickname
    pub fn get_input_bead_name(&self, input_nick: &str) -> String {
        self.input_map()
            .get(input_nick)
            .cloned()
            .unwrap_or_else(|| input_nick.to_string())
    }

    /// Human readable comment embedded in the container
    pub fn comment(&self) -> Result<String> {
        let zip = open_zip(&self.archive_path)?;
        Ok(String::from_utf8_lossy(zip.comment()).into_owned())
    }

    /**
     * Full integrity check
     *
     * Every `code/` and `data/` entry must be listed in the manifest with a
     * matching digest, every manifest entry must exist, and nothing may live
     * outside the archive layout. The content id is recomputed and compared
     * with the cached one.
     *
     * # Errors
     *
     * `InvalidArchive` describing the first problem found.
     */
    pub fn validate(&self) -> Result<()> {
        let mut zip = open_zip(&self.archive_path)?;
        let manifest_bytes = read_entry(&mut zip, layout::MANIFEST, MANIFEST_LIMIT)
            .map_err(|e| self.invalid(e.to_string()))?
            .ok_or_else(|| self.invalid("missing meta/manifest"))?;
        let manifest: Manifest = serde_json::from_slice(&manifest_bytes)
            .map_err(|e| self.invalid(format!("unreadable manifest: {}", e)))?;

        let mut actual = Manifest::new();
        for index in 0..zip.len() {
            let mut entry = zip
                .by_index(index)
                .map_err(|e| self.invalid(e.to_string()))?;
            if entry.is_dir() {
                continue;
            }
            let name = entry.name().to_string();
            if layout::is_meta_entry(&name) {
                continue;
            }
            if !layout::is_content_entry(&name) {
                return Err(self.invalid(format!("unexpected entry {}", name)));
            }
            let size = entry.size();
            let digest = hash_file(&mut entry, size)
                .map_err(|e| self.invalid(format!("unreadable entry {}: {}", name, e)))?;
            actual.insert(name, digest);
        }

        for (path, digest) in &manifest {
            match actual.get(path) {
                None => return Err(self.invalid(format!("missing file {}", path))),
                Some(found) if found != digest => {
                    return Err(self.invalid(format!("content mismatch for {}", path)))
                }
                Some(_) => {}
            }
        }
        if let Some(extra) = actual.keys().find(|path| !manifest.contains_key(*path)) {
            return Err(self.invalid(format!("extra file {}", extra)));
        }

        let recomputed = self.compute_content_id()?;
        if let Some(cached) = self.content_id.get() {
            if *cached != recomputed {
                return Err(self.invalid("content id changed while open"));
            }
        }
        Ok(())
    }

    /**
     * Copy a single entry to `destination`
     *
     * # Errors
     *
     * `NotFound` if the archive has no such entry.
     */
    pub fn extract_file(&self, path_in_archive: &str, destination: &Path) -> Result<()> {
        let mut zip = open_zip(&self.archive_path)?;
        let mut entry = match zip.by_name(path_in_archive) {
            Ok(entry) => entry,
            Err(ZipError::FileNotFound) => {
                return Err(BeadError::not_found(format!(
                    "{} in {}",
                    path_in_archive,
                    self.archive_path.display()
                )))
            }
            Err(e) => return Err(e.into()),
        };
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = File::create(destination)?;
        io::copy(&mut entry, &mut file)?;
        Ok(())
    }

    /**
     * Copy every entry under `prefix/` into `destination`
     *
     * `destination` is always created, even when nothing lives under the
     * prefix. Entries escaping the destination are skipped.
     */
    pub fn extract_dir(&self, prefix: &str, destination: &Path) -> Result<()> {
        fs::create_dir_all(destination)?;
        let prefix = format!("{}/", prefix.trim_end_matches('/'));

        let mut zip = open_zip(&self.archive_path)?;
        for index in 0..zip.len() {
            let mut entry = zip.by_index(index)?;
            let Some(relative) = entry.name().strip_prefix(&prefix).map(str::to_string) else {
                continue;
            };
            if relative.is_empty() {
                continue;
            }

            // 安全检查：防止路径遍历
            let relative_path = Path::new(&relative);
            if !relative_path
                .components()
                .all(|c| matches!(c, Component::Normal(_)))
            {
                warn!(entry = %entry.name(), "Skipping entry escaping the target directory");
                continue;
            }

            let target = destination.join(relative_path);
            if entry.is_dir() {
                fs::create_dir_all(&target)?;
                continue;
            }
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent)?;
            }
            let mut file = File::create(&target)?;
            io::copy(&mut entry, &mut file)?;
        }
        Ok(())
    }

    pub fn unpack_code_to(&self, directory: &Path) -> Result<()> {
        self.extract_dir(layout::CODE, directory)
    }

    pub fn unpack_data_to(&self, directory: &Path) -> Result<()> {
        self.extract_dir(layout::DATA, directory)
    }

    /// Write the bead meta (without freeze time) and the input map as
    /// `bead` and `input.map` into `meta_directory`
    pub fn unpack_meta_to(&self, meta_directory: &Path) -> Result<()> {
        fs::create_dir_all(meta_directory)?;
        let meta = BeadMeta {
            freeze_time: None,
            ..self.meta.clone()
        };
        fs::write(
            meta_directory.join("bead"),
            serde_json::to_vec_pretty(&meta)?,
        )?;
        fs::write(
            meta_directory.join("input.map"),
            serde_json::to_vec_pretty(&self.input_map())?,
        )?;
        Ok(())
    }

    /**
     * Replace the input map
     *
     * Copy-on-write: every other entry is copied unchanged into a temporary
     * container next to the archive, which then atomically replaces it. The
     * content id is unaffected.
     */
    pub fn save_input_map(&self, input_map: &InputMap) -> Result<()> {
        let directory = self
            .archive_path
            .parent()
            .filter(|parent| !parent.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let mut temp = archive_temp_file(directory)?;
        temp.as_file()
            .set_permissions(fs::metadata(&self.archive_path)?.permissions())?;

        {
            let mut source = open_zip(&self.archive_path)?;
            let comment = String::from_utf8_lossy(source.comment()).into_owned();
            let mut writer = ZipWriter::new(temp.as_file_mut());
            writer.set_comment(comment);

            for index in 0..source.len() {
                let entry = source.by_index_raw(index)?;
                if entry.name() == layout::INPUT_MAP {
                    continue;
                }
                writer.raw_copy_file(entry)?;
            }

            let options =
                SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
            writer.start_file(layout::INPUT_MAP, options)?;
            writer.write_all(&serde_json::to_vec_pretty(input_map)?)?;
            writer.finish()?;
        }

        temp.persist(&self.archive_path)
            .map_err(|e| BeadError::Io(e.error))?;
        info!(archive = %self.archive_path.display(), "Input map updated");
        Ok(())
    }

    fn compute_content_id(&self) -> Result<String> {
        let mut zip = open_zip(&self.archive_path)?;
        let mut digests = Vec::new();
        for index in 0..zip.len() {
            let mut entry = zip
                .by_index(index)
                .map_err(|e| self.invalid(e.to_string()))?;
            let name = entry.name().to_string();
            if entry.is_dir() || !(layout::is_content_entry(&name) || name == layout::BEAD_META) {
                continue;
            }
            let size = entry.size();
            let digest = hash_file(&mut entry, size)
                .map_err(|e| self.invalid(format!("unreadable entry {}: {}", name, e)))?;
            digests.push((name, digest));
        }
        let content_id = hash_tree(digests);
        debug!(archive = %self.archive_path.display(), content_id = %content_id, "Computed content id");
        Ok(content_id)
    }

    fn invalid(&self, reason: impl Into<String>) -> BeadError {
        BeadError::invalid_archive(&self.archive_path, reason)
    }
}

impl Bead for Archive {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> &str {
        &self.meta.kind
    }

    fn content_id(&self) -> &str {
        match self.try_content_id() {
            Ok(content_id) => content_id,
            Err(e) => {
                warn!(archive = %self.archive_path.display(), error = %e, "Content id unavailable");
                ""
            }
        }
    }

    fn freeze_time(&self) -> Timestamp {
        self.freeze_time
    }

    fn box_name(&self) -> &str {
        &self.box_name
    }
}

fn open_zip(path: &Path) -> Result<ZipReader> {
    let file = File::open(path)
        .map_err(|e| BeadError::invalid_archive(path, format!("cannot open: {}", e)))?;
    ZipArchive::new(BufReader::new(file))
        .map_err(|e| BeadError::invalid_archive(path, format!("not a zip container: {}", e)))
}

/// Read a small metadata entry, refusing anything larger than `limit`
fn read_entry(zip: &mut ZipReader, name: &str, limit: u64) -> Result<Option<Vec<u8>>> {
    match zip.by_name(name) {
        Ok(mut entry) => {
            let mut buffer = Vec::new();
            entry.by_ref().take(limit + 1).read_to_end(&mut buffer)?;
            if buffer.len() as u64 > limit {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("entry {} exceeds {} bytes", name, limit),
                )
                .into());
            }
            Ok(Some(buffer))
        }
        Err(ZipError::FileNotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
