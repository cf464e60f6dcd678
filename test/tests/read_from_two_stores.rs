//! Integration tests for reads that bypass the tracked root.

use pathstore::{Container, Path, Runtime, Store, StoreError, Value};
use pathstore_test::RenderHarness;
use serde_json::json;

#[test]
fn test_reading_from_the_wrong_store_fails() {
    let global = Store::global();
    global
        .set(&Path::parse("meta"), Value::from(json!({ "title": "Hello" })))
        .unwrap();

    let store = Store::from_json(json!({ "meta": { "title": "Hello" } })).unwrap();
    let harness = RenderHarness::new(store);

    let err = harness
        .mount(move |root| {
            let title = root.get_in(&Path::parse("meta.title"))?;
            let global_title = global.get(&Path::parse("meta.title"))?;
            Ok(format!("{title:?} / {global_title:?}"))
        })
        .err()
        .unwrap();

    assert!(err.is_cross_store_read());
    assert_eq!(Runtime::session_depth(), 0);
}

#[test]
fn test_tracked_root_of_an_outer_store_is_rejected() {
    let outer = Store::from_json(json!({ "title": "outer" })).unwrap();
    let inner = Store::new(Container::record_from([("title", "inner")]));

    let err = outer
        .track(|outer_root| {
            inner.track(|_| {
                outer_root.get("title")?;
                Ok(())
            })
        })
        .unwrap_err();

    match err {
        StoreError::CrossStoreReadViolation { bound, found } => {
            assert_eq!(bound, inner.id());
            assert_eq!(found, outer.id());
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_untracked_reads_of_another_store_are_allowed() {
    let other = Store::new(Container::record_from([("title", "other")]));
    let store = Store::new(Container::record_from([("title", "mine")]));
    let harness = RenderHarness::new(store);

    let comp = harness
        .mount(move |root| {
            let mine = root.get("title")?.and_then(|v| v.as_str().map(str::to_owned));
            let theirs = Runtime::untrack(|| other.get(&Path::parse("title")))?;
            Ok(format!(
                "{} {}",
                mine.unwrap_or_default(),
                theirs.and_then(|v| v.as_str().map(str::to_owned)).unwrap_or_default()
            ))
        })
        .unwrap();

    assert_eq!(comp.output(), "mine other");
    assert_eq!(harness.dependencies(&comp), ["title"]);
}
