//! Integration tests for mapping mode.

use pdf_formfill::{
    generate_map, FieldKind, FieldMap, FillScript, Form, FormDocument, MapOptions, MemoryDocument, SaveOptions,
    Value,
};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn document() -> MemoryDocument {
    let mut doc = MemoryDocument::new();
    doc.add_page([
        ("topmostSubform[0].Page1[0].f1_01[0]", FieldKind::Text),
        ("topmostSubform[0].Page1[0].c1_1[0]", FieldKind::Checkbox),
    ])
    .add_page([("topmostSubform[0].Page2[0].f2_01[0]", FieldKind::Text)]);
    doc
}

#[test]
fn test_map_only() {
    let dir = tempdir().unwrap();
    let out = dir.path().join("maps");
    let mut doc = document();

    let options = MapOptions::new().with_dir(&out).with_example(false);
    let artifacts = generate_map(&mut doc, Path::new("forms/f1040.json"), &options).unwrap();

    assert_eq!(artifacts.fields, 3);
    assert_eq!(artifacts.map, out.join("f1040-map.yaml"));
    assert_eq!(artifacts.paths().count(), 1);
    assert!(artifacts.script.is_none());

    let map = FieldMap::load(artifacts.map.as_path()).unwrap();
    assert_eq!(map.resolve("0"), Some("topmostSubform[0].Page1[0].f1_01[0]"));
    assert_eq!(map.resolve("2"), Some("topmostSubform[0].Page2[0].f2_01[0]"));
}

#[test]
fn test_examples() {
    let dir = tempdir().unwrap();
    let mut doc = document();

    let options = MapOptions::new().with_dir(dir.path()).with_name("irs");
    let artifacts = generate_map(&mut doc, Path::new("f1040.json"), &options).unwrap();

    let script_path = artifacts.script.clone().unwrap();
    let config_path = artifacts.config.clone().unwrap();
    let filled_path = artifacts.filled.clone().unwrap();
    assert_eq!(script_path, dir.path().join("irs-example-script.yaml"));
    assert_eq!(config_path, dir.path().join("irs-example-config.yaml"));
    assert_eq!(filled_path, dir.path().join("irs-example-filled.json"));

    let script_text = fs::read_to_string(&script_path).unwrap();
    assert!(script_text.starts_with('#'));
    assert!(script_text.contains("  # fills topmostSubform[0].Page1[0].c1_1[0]\n"));

    let script = FillScript::load(script_path.as_path()).unwrap();
    assert_eq!(script.len(), 3);

    let config = fs::read_to_string(&config_path).unwrap();
    assert_eq!(config, "field0: todo\nfield1: todo\nfield2: todo\n");

    // every field holds its own index; checkbox 1 is checked
    let filled = MemoryDocument::open(&filled_path).unwrap();
    assert_eq!(filled.text("topmostSubform[0].Page1[0].f1_01[0]"), Some("0"));
    assert_eq!(filled.is_checked("topmostSubform[0].Page1[0].c1_1[0]"), Some(true));
    assert_eq!(filled.text("topmostSubform[0].Page2[0].f2_01[0]"), Some("2"));
}

#[test]
fn test_examples_fill_round_trip() {
    let dir = tempdir().unwrap();
    let source = dir.path().join("f1040.json");
    document().save(&source).unwrap();

    let mut doc = MemoryDocument::open(&source).unwrap();
    let options = MapOptions::new().with_dir(dir.path());
    let artifacts = generate_map(&mut doc, &source, &options).unwrap();

    // the generated script, map and config fill the original form
    let mut form = Form::init(artifacts.config.clone().unwrap()).unwrap();
    form.load(&source, artifacts.map.as_path()).unwrap();
    form.fill(artifacts.script.clone().unwrap()).unwrap();

    let filled = form.filled().unwrap();
    assert_eq!(filled.get("topmostSubform[0].Page1[0].f1_01[0]"), Some(&Value::from("todo")));
    assert_eq!(filled.get("friendly.key.name.2"), Some(&Value::from("todo")));

    let dest = dir.path().join("out.json");
    form.save::<MemoryDocument>(&dest, &SaveOptions::default()).unwrap();
    let out = MemoryDocument::open(&dest).unwrap();
    assert_eq!(out.text("topmostSubform[0].Page2[0].f2_01[0]"), Some("todo"));
}
