//! Workspace Integration Tests
//!
//! Packing workspaces into archives and loading archives as inputs.

mod bead_test_helpers;

use bead::archive::Archive;
use bead::models::Bead;
use bead::workspace::Workspace;
use bead_test_helpers::{day, make_workspace, store_bead, BeadSpec, BoxTestEnv};
use std::fs::{self, File};
use std::io::BufReader;
use tempfile::TempDir;
use zip::ZipArchive;

fn entry_names(archive: &Archive) -> Vec<String> {
    let zip = ZipArchive::new(BufReader::new(File::open(archive.archive_path()).unwrap())).unwrap();
    zip.file_names().map(str::to_string).collect()
}

#[test]
fn test_content_id_does_not_depend_on_location() {
    let env = BoxTestEnv::new();
    let one = env.make_box("one");
    let two = env.make_box("two");
    let spec = BeadSpec::new("same", "kind").file("output/out.txt", "42\n");

    let first = store_bead(&one, &spec, day(2));
    let second = store_bead(&two, &spec, day(2));
    assert_eq!(first.content_id(), second.content_id());

    let later = store_bead(&two, &spec, day(3));
    assert_ne!(first.content_id(), later.content_id());
}

#[test]
fn test_pack_layout() {
    let env = BoxTestEnv::new();
    let bead_box = env.make_box("main");
    let scratch = TempDir::new().unwrap();
    let workspace = make_workspace(
        scratch.path(),
        &BeadSpec::new("layout", "k")
            .file("src/deep/mod.py", "x = 1\n")
            .file("output/table.csv", "1\n")
            .file("temp/cache.bin", "ignored"),
    );

    let path = bead_box.store(&workspace, day(1)).unwrap();
    let archive = Archive::open(path, "main").unwrap();
    let names = entry_names(&archive);

    assert!(names.contains(&"code/main.py".to_string()));
    assert!(names.contains(&"code/src/deep/mod.py".to_string()));
    assert!(names.contains(&"data/table.csv".to_string()));
    assert!(names.contains(&"meta/manifest".to_string()));
    assert!(names.contains(&"meta/bead".to_string()));
    assert!(names.contains(&"meta/input.map".to_string()));
    assert!(!names.iter().any(|name| name.contains("cache.bin")));
    assert!(!names.iter().any(|name| name.contains(".bead-meta")));
    assert!(archive.validate().is_ok());
}

#[test]
fn test_load_input_declares_and_maps_it() {
    let env = BoxTestEnv::new();
    let bead_box = env.make_box("main");
    let source = store_bead(
        &bead_box,
        &BeadSpec::new("source", "kind_source").file("output/values.txt", "1 2 3\n"),
        day(1),
    );

    let scratch = TempDir::new().unwrap();
    let workspace = make_workspace(scratch.path(), &BeadSpec::new("consumer", "kind_consumer"));
    workspace.load("numbers", &source).unwrap();

    let loaded = workspace.directory().join("input/numbers/values.txt");
    assert_eq!(fs::read_to_string(&loaded).unwrap(), "1 2 3\n");
    assert!(fs::metadata(&loaded).unwrap().permissions().readonly());

    assert!(workspace.has_input("numbers"));
    assert!(workspace.is_loaded("numbers"));
    assert_eq!(workspace.get_input_bead_name("numbers"), "source");
    let spec = &workspace.inputs().unwrap()["numbers"];
    assert_eq!(spec.kind, "kind_source");
    assert_eq!(spec.content_id, source.content_id());
    assert_eq!(spec.freeze_time, day(1));

    // packed inputs are references, not data
    let path = bead_box.store(&workspace, day(2)).unwrap();
    let consumer = Archive::open(path, "main").unwrap();
    assert!(!entry_names(&consumer).iter().any(|name| name.contains("values.txt")));
    assert_eq!(consumer.inputs()["numbers"].content_id, source.content_id());
    assert_eq!(consumer.get_input_bead_name("numbers"), "source");

    workspace.unload("numbers").unwrap();
    assert!(!workspace.is_loaded("numbers"));
    assert!(workspace.has_input("numbers"));
}

#[test]
fn test_delete_input_forgets_it() {
    let env = BoxTestEnv::new();
    let bead_box = env.make_box("main");
    let source = store_bead(&bead_box, &BeadSpec::new("source", "k"), day(1));

    let scratch = TempDir::new().unwrap();
    let workspace = make_workspace(scratch.path(), &BeadSpec::new("consumer", "k2"));
    workspace.load("src", &source).unwrap();
    workspace.delete_input("src").unwrap();

    assert!(!workspace.has_input("src"));
    assert!(!workspace.is_loaded("src"));
    assert!(workspace.input_map().is_empty());
    assert_eq!(workspace.get_input_bead_name("src"), "src");
}

#[test]
fn test_create_twice_fails() {
    let scratch = TempDir::new().unwrap();
    let workspace = Workspace::new(scratch.path().join("ws"));
    workspace.create("k").unwrap();
    assert!(workspace.is_valid());
    assert_eq!(workspace.name(), "ws");
    assert!(workspace.create("k").is_err());
}
