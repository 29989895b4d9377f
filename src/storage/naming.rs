//! Archive file naming inside a box
//!
//! Archives are named `<name>_<freeze time>.zip`, e.g.
//! `beadname_20170615T075813302092+0200.zip`. The bead name is taken from
//! the file name, so renaming the file renames the bead.

use crate::models::{format_timestamp, Timestamp};
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;

pub const ARCHIVE_EXTENSION: &str = "zip";

// 使用 Lazy 静态初始化正则表达式，避免重复编译
static TIMESTAMPED_STEM: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*)_(\d{8}T\d{12}[-+]\d{4})$").unwrap());

static TIMESTAMPED_SUFFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{8}T\d{12}[-+]\d{4}\.zip$").unwrap());

/// File name under which a bead frozen at `freeze_time` is stored
pub fn archive_file_name(name: &str, freeze_time: &Timestamp) -> String {
    format!(
        "{}_{}.{}",
        name,
        format_timestamp(freeze_time),
        ARCHIVE_EXTENSION
    )
}

/// Bead name encoded in an archive path
///
/// Falls back to the whole file stem for archives not following the box
/// naming convention.
pub fn bead_name_from_file_path(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default();
    match TIMESTAMPED_STEM.captures(&stem) {
        Some(captures) => captures
            .get(1)
            .map(|name| name.as_str().to_string())
            .unwrap_or(stem),
        None => stem,
    }
}

/// Whether `file_name` is an archive of the bead called `name`
///
/// This is the directory-listing fast path used when a query names exactly
/// one bead.
pub fn is_archive_of(file_name: &str, name: &str) -> bool {
    file_name
        .strip_prefix(name)
        .and_then(|rest| rest.strip_prefix('_'))
        .map(|rest| TIMESTAMPED_SUFFIX.is_match(rest))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::time_from_timestamp;
    use std::path::PathBuf;

    #[test]
    fn test_archive_file_name() {
        let time = time_from_timestamp("20170615T075813302092+0200").unwrap();
        assert_eq!(
            archive_file_name("beadname", &time),
            "beadname_20170615T075813302092+0200.zip"
        );
    }

    #[test]
    fn test_bead_name_from_file_path() {
        let path = PathBuf::from("/box/my_bead_20170615T075813302092+0200.zip");
        assert_eq!(bead_name_from_file_path(&path), "my_bead");

        let path = PathBuf::from("/somewhere/bead.zip");
        assert_eq!(bead_name_from_file_path(&path), "bead");
    }

    #[test]
    fn test_is_archive_of() {
        assert!(is_archive_of("BEAD3_20160704T162800000001+0200.zip", "BEAD3"));
        assert!(!is_archive_of("BEAD3_20160704T162800000001+0200.zip", "BEAD"));
        assert!(!is_archive_of("a_b_20160704T162800000001+0200.zip", "a"));
        assert!(!is_archive_of("bead1.zip", "bead1"));
    }
}
