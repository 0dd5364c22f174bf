//! Rewriting the metadata of a layer record the way a store would.

use std::path::Path;

use cstorage_meta::{
    apply_name_operation, contains_incomplete_flag, move_to_trash, Flags, UpdateNameOperation,
};
use serde::Deserialize;
use similar_asserts::assert_eq;

/// Subset of an entry in `overlay-layers/layers.json`.
#[derive(Debug, Deserialize)]
struct LayerRecord {
    id: String,
    #[serde(default)]
    names: Vec<String>,
    #[serde(default)]
    flags: Option<Flags>,
}

const LAYERS_JSON: &str = r#"[
    {"id": "aaa", "names": ["busybox:latest", "busybox:1", "busybox:latest"]},
    {"id": "bbb", "flags": {"incomplete": true}},
    {"id": "ccc", "names": [], "flags": {"incomplete": "yes"}}
]"#;

fn layers() -> Vec<LayerRecord> {
    serde_json::from_str(LAYERS_JSON).unwrap()
}

#[test]
fn test_names_update_on_record() {
    let layer = layers().into_iter().next().unwrap();
    assert_eq!(layer.id, "aaa");

    let added = apply_name_operation(
        &layer.names,
        &["busybox:1", "busybox:stable"],
        UpdateNameOperation::Add,
    );
    assert_eq!(added, ["busybox:1", "busybox:stable", "busybox:latest"]);

    let removed = apply_name_operation(&added, &["busybox:latest"], UpdateNameOperation::Remove);
    assert_eq!(removed, ["busybox:1", "busybox:stable"]);

    let cleared = apply_name_operation::<_, &str>(&removed, &[], UpdateNameOperation::Set);
    assert!(cleared.is_empty());
}

#[test]
fn test_incomplete_layers_are_trashed() {
    let dir = tempfile::tempdir().unwrap();
    let overlay = dir.path().join("overlay");
    let trash = dir.path().join("trash");
    std::fs::create_dir(&trash).unwrap();
    for layer in layers() {
        std::fs::create_dir_all(overlay.join(&layer.id).join("diff")).unwrap();
    }

    let mut trashed = Vec::new();
    for layer in layers() {
        if contains_incomplete_flag(layer.flags.as_ref()) {
            trashed.push(move_to_trash(overlay.join(&layer.id), &trash).unwrap());
        }
    }

    assert_eq!(trashed.len(), 1);
    assert_eq!(trashed[0].file_name().unwrap(), "bbb");
    assert!(trashed[0].join("diff").is_dir());
    assert!(!overlay.join("bbb").exists());
    assert!(overlay.join("aaa").is_dir());
    assert!(overlay.join("ccc").is_dir());
    assert_eq!(trashed[0].parent().unwrap().parent(), Some(Path::new(&trash)));
}
