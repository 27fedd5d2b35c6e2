// Copyright 2019-2020 Benjamin Fry <benjaminfry@me.com>
//
// Licensed under the Apache License, Version 2.0, <LICENSE-APACHE or
// http://apache.org/licenses/LICENSE-2.0> or the MIT license <LICENSE-MIT or
// http://opensource.org/licenses/MIT>, at your option. This file may not be
// copied, modified, or distributed except according to those terms.

use tempfile::TempDir;

use cinnabar::instance::{Branch, InstanceRecord};
use cinnabar::registry::Registry;
use cinnabar::store::{JsonFileStore, Store};
use cinnabar::ErrorKind;

fn registry_in(dir: &TempDir) -> Registry {
    Registry::new(Box::new(JsonFileStore::new(dir.path().join("instances.json"))))
}

#[tokio::test]
async fn load_with_missing_file_starts_empty() {
    let dir = TempDir::new().expect("tempdir");
    let registry = registry_in(&dir);

    registry.load().await;
    assert!(registry.snapshot().is_empty());
}

#[tokio::test]
async fn load_with_corrupt_file_starts_empty() {
    let dir = TempDir::new().expect("tempdir");
    std::fs::write(dir.path().join("instances.json"), b"definitely { not json").expect("write");

    let registry = registry_in(&dir);
    registry.load().await;
    assert!(registry.snapshot().is_empty());
}

#[tokio::test]
async fn save_and_load_round_trip() {
    let dir = TempDir::new().expect("tempdir");

    let registry = registry_in(&dir);
    registry
        .add(InstanceRecord::new("tf2", "/srv/tf2/srcds", "-console"))
        .await
        .expect("add tf2");
    registry
        .add(InstanceRecord::new("gmod", "/srv/gmod/srcds64", ""))
        .await
        .expect("add gmod");

    let reloaded = registry_in(&dir);
    reloaded.load().await;

    let records = reloaded.snapshot();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].name, "tf2");
    assert_eq!(records[0].path, "/srv/tf2/srcds");
    assert_eq!(records[0].arguments, "-console");
    assert_eq!(records[0].branch, Branch::Unknown);
    assert_eq!(records[1].name, "gmod");
    assert_eq!(records[1].branch, Branch::X86_64);
}

#[tokio::test]
async fn edit_replaces_only_the_target() {
    let dir = TempDir::new().expect("tempdir");

    let registry = registry_in(&dir);
    for name in &["a", "b", "c"] {
        registry
            .add(InstanceRecord::new(*name, format!("/srv/{}/srcds", name), ""))
            .await
            .expect("add");
    }

    let (old_name, record) = registry
        .edit(1, "b2", "/srv/b2/srcds64", "-tickrate 128")
        .await
        .expect("edit");
    assert_eq!(old_name, "b");
    assert_eq!(record.branch, Branch::X86_64);

    assert_eq!(registry.names(), vec!["a", "b2", "c"]);

    let reloaded = registry_in(&dir);
    reloaded.load().await;

    let records = reloaded.snapshot();
    assert_eq!(records.len(), 3);
    assert_eq!(records[0].name, "a");
    assert_eq!(records[1].name, "b2");
    assert_eq!(records[1].path, "/srv/b2/srcds64");
    assert_eq!(records[1].arguments, "-tickrate 128");
    assert_eq!(records[2].name, "c");
}

#[tokio::test]
async fn edit_rejects_a_bad_index() {
    let dir = TempDir::new().expect("tempdir");

    let registry = registry_in(&dir);
    registry
        .add(InstanceRecord::new("only", "/srv/only/srcds", ""))
        .await
        .expect("add");

    let err = registry
        .edit(7, "other", "/srv/other/srcds", "")
        .await
        .expect_err("index 7 does not exist");
    assert!(matches!(err.kind(), ErrorKind::BadIndex(7)));
}

#[tokio::test]
async fn duplicate_names_are_rejected() {
    let dir = TempDir::new().expect("tempdir");

    let registry = registry_in(&dir);
    registry
        .add(InstanceRecord::new("tf2", "/srv/tf2/srcds", ""))
        .await
        .expect("add");
    registry
        .add(InstanceRecord::new("gmod", "/srv/gmod/srcds", ""))
        .await
        .expect("add");

    let err = registry
        .add(InstanceRecord::new("tf2", "/elsewhere/srcds", ""))
        .await
        .expect_err("second tf2");
    assert!(matches!(err.kind(), ErrorKind::DuplicateName(_)));

    let err = registry
        .edit(1, "tf2", "/srv/gmod/srcds", "")
        .await
        .expect_err("renaming gmod over tf2");
    assert!(matches!(err.kind(), ErrorKind::DuplicateName(_)));

    // nothing changed
    assert_eq!(registry.names(), vec!["tf2", "gmod"]);
}

#[tokio::test]
async fn empty_fields_are_rejected() {
    let dir = TempDir::new().expect("tempdir");
    let registry = registry_in(&dir);

    assert!(registry.add(InstanceRecord::new("", "/srv/srcds", "")).await.is_err());
    assert!(registry.add(InstanceRecord::new("tf2", "", "")).await.is_err());
}

#[tokio::test]
async fn remove_persists() {
    let dir = TempDir::new().expect("tempdir");

    let registry = registry_in(&dir);
    registry
        .add(InstanceRecord::new("tf2", "/srv/tf2/srcds", ""))
        .await
        .expect("add");
    registry
        .add(InstanceRecord::new("gmod", "/srv/gmod/srcds", ""))
        .await
        .expect("add");

    let removed = registry.remove("tf2").await.expect("remove");
    assert_eq!(removed.name, "tf2");

    let err = registry.remove("tf2").await.expect_err("already removed");
    assert!(matches!(err.kind(), ErrorKind::UnknownInstance(_)));

    let reloaded = registry_in(&dir);
    reloaded.load().await;
    assert_eq!(reloaded.names(), vec!["gmod"]);
}

#[tokio::test]
async fn replace_all_swaps_the_collection() {
    let dir = TempDir::new().expect("tempdir");

    let registry = registry_in(&dir);
    registry
        .add(InstanceRecord::new("old", "/srv/old/srcds", ""))
        .await
        .expect("add");

    registry
        .replace_all(vec![
            InstanceRecord::new("one", "/srv/one/srcds", ""),
            InstanceRecord::new("two", "/srv/two/srcds64", ""),
        ])
        .await
        .expect("replace");

    assert_eq!(registry.names(), vec!["one", "two"]);

    let err = registry
        .replace_all(vec![
            InstanceRecord::new("dup", "/srv/a/srcds", ""),
            InstanceRecord::new("dup", "/srv/b/srcds", ""),
        ])
        .await
        .expect_err("duplicate names in one collection");
    assert!(matches!(err.kind(), ErrorKind::DuplicateName(_)));
}

#[tokio::test]
async fn persisted_form_has_no_runtime_fields() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("instances.json");

    let store = JsonFileStore::new(&path);
    store
        .save(&[InstanceRecord::new("gmod", "/srv/gmod/srcds64", "-console")])
        .await
        .expect("save");

    let text = std::fs::read_to_string(&path).expect("read back");
    assert!(text.contains("\"name\""));
    assert!(text.contains("\"path\""));
    assert!(text.contains("\"arguments\""));
    assert!(text.contains("\"branch\""));
    assert!(!text.contains("state"));
    assert!(!text.contains("pid"));
}
