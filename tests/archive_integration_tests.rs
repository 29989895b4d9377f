//! Archive Integration Tests
//!
//! Validation of frozen archives against tampering, and unpacking of their
//! parts.

mod bead_test_helpers;

use bead::archive::Archive;
use bead::models::Bead;
use bead_test_helpers::{day, store_bead, BeadSpec, BoxTestEnv};
use rstest::*;
use std::fs::{self, File, OpenOptions};
use std::io::{BufReader, Read, Write};
use std::path::{Path, PathBuf};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

#[fixture]
fn stored() -> (BoxTestEnv, Archive) {
    let env = BoxTestEnv::new();
    let bead_box = env.make_box("main");
    let spec = BeadSpec::new("frozen", "kind_frozen")
        .file("lib/util.py", "def f(): pass\n")
        .file("output/result.csv", "a,b\n1,2\n");
    let archive = store_bead(&bead_box, &spec, day(4));
    (env, archive)
}

fn read_entries(path: &Path) -> Vec<(String, Vec<u8>)> {
    let mut zip = ZipArchive::new(BufReader::new(File::open(path).unwrap())).unwrap();
    let mut entries = Vec::new();
    for index in 0..zip.len() {
        let mut entry = zip.by_index(index).unwrap();
        let mut content = Vec::new();
        entry.read_to_end(&mut content).unwrap();
        entries.push((entry.name().to_string(), content));
    }
    entries
}

/// Unzip `path` and zip it again after `change` had its way with the entries
fn rezip(path: &Path, change: impl FnOnce(&mut Vec<(String, Vec<u8>)>)) -> PathBuf {
    let mut entries = read_entries(path);
    change(&mut entries);

    let rezipped = path.with_file_name(format!(
        "rezipped_{}",
        path.file_name().unwrap().to_string_lossy()
    ));
    let mut writer = ZipWriter::new(File::create(&rezipped).unwrap());
    for (name, content) in &entries {
        writer
            .start_file(name.as_str(), SimpleFileOptions::default())
            .unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap();
    rezipped
}

fn append_entry(path: &Path, name: &str, content: &[u8]) {
    let file = OpenOptions::new().read(true).write(true).open(path).unwrap();
    let mut writer = ZipWriter::new_append(file).unwrap();
    writer
        .start_file(name, SimpleFileOptions::default())
        .unwrap();
    writer.write_all(content).unwrap();
    writer.finish().unwrap();
}

fn validation_error(path: &Path) -> String {
    let archive = Archive::open(path, "main").unwrap();
    let error = archive.validate().unwrap_err();
    assert!(error.is_invalid_archive());
    error.to_string()
}

#[rstest]
fn test_fresh_archive_is_valid(stored: (BoxTestEnv, Archive)) {
    let (_env, archive) = stored;
    assert!(archive.validate().is_ok());
    assert_eq!(archive.content_id().len(), 64);
}

#[rstest]
#[case::code("code/injected.py")]
#[case::data("data/injected.csv")]
fn test_extra_file_is_detected(stored: (BoxTestEnv, Archive), #[case] entry: &str) {
    let (_env, archive) = stored;
    append_entry(archive.archive_path(), entry, b"surprise");
    assert!(validation_error(archive.archive_path()).contains("extra file"));
}

#[rstest]
fn test_unexpected_entry_is_detected(stored: (BoxTestEnv, Archive)) {
    let (_env, archive) = stored;
    append_entry(archive.archive_path(), "elsewhere/file", b"x");
    assert!(validation_error(archive.archive_path()).contains("unexpected entry"));
}

#[rstest]
#[case::code("code/lib/util.py")]
#[case::data("data/result.csv")]
fn test_deleted_file_is_detected(stored: (BoxTestEnv, Archive), #[case] entry: &str) {
    let (_env, archive) = stored;
    let rezipped = rezip(archive.archive_path(), |entries| {
        entries.retain(|(name, _)| name != entry);
    });
    assert!(validation_error(&rezipped).contains("missing file"));
}

#[rstest]
#[case::code("code/main.py")]
#[case::data("data/result.csv")]
fn test_modified_file_is_detected(stored: (BoxTestEnv, Archive), #[case] entry: &str) {
    let (_env, archive) = stored;
    let rezipped = rezip(archive.archive_path(), |entries| {
        for (name, content) in entries.iter_mut() {
            if name == entry {
                content.extend_from_slice(b"# tampered\n");
            }
        }
    });
    assert!(validation_error(&rezipped).contains("content mismatch"));
}

#[rstest]
fn test_rezipped_archive_stays_valid_with_same_content_id(stored: (BoxTestEnv, Archive)) {
    let (_env, archive) = stored;
    let rezipped = rezip(archive.archive_path(), |entries| entries.reverse());

    let copy = Archive::open(&rezipped, "main").unwrap();
    assert!(copy.validate().is_ok());
    assert_eq!(copy.content_id(), archive.content_id());
}

#[rstest]
fn test_missing_manifest_is_invalid(stored: (BoxTestEnv, Archive)) {
    let (_env, archive) = stored;
    let rezipped = rezip(archive.archive_path(), |entries| {
        entries.retain(|(name, _)| name != "meta/manifest");
    });
    assert!(validation_error(&rezipped).contains("manifest"));
}

#[rstest]
fn test_unpack_parts(stored: (BoxTestEnv, Archive)) {
    let (env, archive) = stored;
    let target = env.path().join("unpacked");

    archive.unpack_code_to(&target.join("code")).unwrap();
    archive.unpack_data_to(&target.join("data")).unwrap();
    archive.unpack_meta_to(&target.join("meta")).unwrap();

    assert_eq!(
        fs::read_to_string(target.join("code/lib/util.py")).unwrap(),
        "def f(): pass\n"
    );
    assert_eq!(
        fs::read_to_string(target.join("data/result.csv")).unwrap(),
        "a,b\n1,2\n"
    );
    let meta = fs::read_to_string(target.join("meta/bead")).unwrap();
    assert!(meta.contains("kind_frozen"));
    assert!(!meta.contains("freeze_time"));
    assert!(target.join("meta/input.map").is_file());
}

#[rstest]
fn test_extract_single_file(stored: (BoxTestEnv, Archive)) {
    let (env, archive) = stored;
    let destination = env.path().join("single/main.py");
    archive.extract_file("code/main.py", &destination).unwrap();
    assert_eq!(fs::read_to_string(destination).unwrap(), "print('hello')\n");

    let error = archive
        .extract_file("code/absent.py", &env.path().join("absent.py"))
        .unwrap_err();
    assert!(error.is_not_found());
}

#[rstest]
fn test_archive_comment_is_set(stored: (BoxTestEnv, Archive)) {
    let (_env, archive) = stored;
    assert!(!archive.comment().unwrap().is_empty());
}
