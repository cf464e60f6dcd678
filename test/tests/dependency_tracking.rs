//! Integration tests for what a render records.
//!
//! These tests verify that:
//! - Every path read through the tracked root is recorded, in read order
//! - Repeated reads of the same path are recorded once
//! - Each render replaces the component's previous registration

use std::cell::Cell;
use std::rc::Rc;

use pathstore::{Path, Result, Store, Tracked, TrackedValue, Value};
use pathstore_test::RenderHarness;
use serde_json::json;

fn props_store() -> Store {
    Store::from_json(json!({
        "prop1": "This is prop1",
        "prop2": "This is prop2"
    }))
    .unwrap()
}

/// Lists props a component depends on without rendering them. The reads are
/// recorded while the slice is built.
fn use_props(_props: &[Option<TrackedValue>]) {}

fn prop2(root: &Tracked) -> Result<String> {
    Ok(root
        .get("prop2")?
        .and_then(|v| v.as_str().map(str::to_owned))
        .unwrap_or_default())
}

// =============================================================================
// Recording Tests
// =============================================================================

#[test]
fn test_listens_to_props() {
    let harness = RenderHarness::new(props_store());
    let comp = harness
        .mount(|root| {
            use_props(&[root.get("prop1")?]);
            prop2(root)
        })
        .unwrap();

    assert_eq!(comp.output(), "This is prop2");
    assert_eq!(harness.dependencies(&comp), ["prop1", "prop2"]);
}

#[test]
fn test_listens_to_object_children() {
    let store = props_store();
    store
        .set(
            &Path::parse("arr"),
            Value::from(json!([{ "name": "Task one" }, { "name": "Task two" }])),
        )
        .unwrap();
    store
        .set(
            &Path::parse("obj"),
            Value::from(json!({ "one": "one!", "two": "two!" })),
        )
        .unwrap();
    let harness = RenderHarness::new(store);

    let comp = harness
        .mount(|root| {
            let mut props = vec![root.get("prop1")?];
            if let Some(arr) = root.get("arr")?.and_then(TrackedValue::into_tracked) {
                props.extend(arr.values()?.into_iter().map(Some));
            }
            use_props(&props);

            if let Some(obj) = root.get("obj")?.and_then(TrackedValue::into_tracked) {
                obj.values()?;
            }
            prop2(root)
        })
        .unwrap();

    assert_eq!(
        harness.dependencies(&comp),
        ["prop1", "arr", "arr.0", "arr.1", "obj", "obj.one", "obj.two", "prop2"]
    );
}

#[test]
fn test_handles_duplicate_props() {
    let store = props_store();
    store
        .set(
            &Path::parse("arr"),
            Value::from(json!([{ "name": "David", "age": 75 }])),
        )
        .unwrap();
    store.set(&Path::parse("loading"), false).unwrap();
    let harness = RenderHarness::new(store);

    let comp = harness
        .mount(|root| {
            use_props(&[
                Some(TrackedValue::Tracked(root.clone())),
                root.get("prop1")?,
                root.get("prop2")?,
                root.get_in(&Path::parse("arr.0.name"))?,
                root.get("arr")?,
                root.get("loaded")?,
            ]);

            let loaded = root.get("loaded")?.and_then(|v| v.as_bool()).unwrap_or(false);
            let text = prop2(root)?;
            Ok(if loaded { text } else { format!("Loading... {text}") })
        })
        .unwrap();

    assert_eq!(comp.output(), "Loading... This is prop2");
    assert_eq!(
        harness.dependencies(&comp),
        ["prop1", "prop2", "arr", "arr.0", "arr.0.name", "loaded"]
    );
}

#[test]
fn test_ignores_values_not_from_the_store() {
    let harness = RenderHarness::new(props_store());
    let comp = harness
        .mount(|root| {
            let animals = ["cats", "dogs", "Sid Vicious"];
            use_props(&[root.get("prop1")?]);
            let _ = animals.len();
            prop2(root)
        })
        .unwrap();

    assert_eq!(harness.dependencies(&comp), ["prop1", "prop2"]);
}

#[test]
fn test_missing_props_are_recorded() {
    let harness = RenderHarness::new(props_store());
    let comp = harness
        .mount(|root| {
            use_props(&[root.get("prop1")?]);
            use_props(&[root.get("prop3")?]);
            use_props(&[root.get("prop4")?]);
            prop2(root)
        })
        .unwrap();

    assert_eq!(
        harness.dependencies(&comp),
        ["prop1", "prop3", "prop4", "prop2"]
    );
}

#[test]
fn test_ancestor_after_descendant_keeps_both() {
    let store = Store::from_json(json!({ "arr": [{ "name": "one" }] })).unwrap();
    let (_, deps) = store
        .track(|root| {
            root.get_in(&Path::parse("arr.0"))?;
            root.get("arr")?;
            root.get_in(&Path::parse("arr.0"))?;
            Ok(())
        })
        .unwrap();

    assert_eq!(deps.to_strings(), ["arr", "arr.0"]);
}

// =============================================================================
// Re-render Tests
// =============================================================================

#[test]
fn test_works_with_changing_state() {
    let store = Store::from_json(json!({})).unwrap();
    let harness = RenderHarness::new(store.clone());
    let show_hidden = Rc::new(Cell::new(false));

    let comp = harness
        .mount({
            let show_hidden = show_hidden.clone();
            move |root| {
                let message = root.get("hiddenMessage")?;
                if !show_hidden.get() {
                    return Ok(String::new());
                }
                Ok(message
                    .and_then(|v| v.as_str().map(str::to_owned))
                    .unwrap_or_default())
            }
        })
        .unwrap();
    assert_eq!(harness.dependencies(&comp), ["hiddenMessage"]);
    assert_eq!(comp.output(), "");

    store
        .set(&Path::parse("hiddenMessage"), "Hidden message")
        .unwrap();
    show_hidden.set(true);
    harness.settle();
    assert_eq!(comp.output(), "Hidden message");

    store
        .set(&Path::parse("hiddenMessage"), "A new message!")
        .unwrap();
    harness.settle();
    assert_eq!(comp.output(), "A new message!");
    assert_eq!(comp.render_count(), 3);
}

#[test]
fn test_registration_follows_the_latest_render() {
    let store = Store::from_json(json!({ "mode": "a", "a": 1, "b": 2 })).unwrap();
    let harness = RenderHarness::new(store.clone());

    let comp = harness
        .mount(|root| {
            let mode = root
                .get("mode")?
                .and_then(|v| v.as_str().map(str::to_owned))
                .unwrap_or_default();
            let value = root.get(mode.as_str())?.and_then(|v| v.as_i64());
            Ok(format!("{value:?}"))
        })
        .unwrap();
    assert_eq!(harness.dependencies(&comp), ["mode", "a"]);

    store.set(&Path::parse("mode"), "b").unwrap();
    harness.settle();
    assert_eq!(harness.dependencies(&comp), ["mode", "b"]);
    assert_eq!(comp.output(), "Some(2)");

    // `a` is no longer read
    harness.reset();
    store.set(&Path::parse("a"), 10).unwrap();
    harness.settle();
    assert!(harness.notified().is_empty());
}

#[test]
fn test_nested_renders_record_independently() {
    let store = Store::from_json(json!({ "outer": 1, "inner": 2 })).unwrap();
    let harness = RenderHarness::new(store.clone());
    let inner_harness = RenderHarness::new(store.clone());

    let outer = harness
        .mount(move |root| {
            root.get("outer")?;
            let inner = inner_harness.mount(|root| {
                root.get("inner")?;
                Ok(String::new())
            })?;
            root.get("after")?;
            Ok(inner_harness.dependencies(&inner).join(","))
        })
        .unwrap();

    assert_eq!(outer.output(), "inner");
    assert_eq!(harness.dependencies(&outer), ["outer", "after"]);
}
