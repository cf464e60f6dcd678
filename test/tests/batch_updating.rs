//! Integration tests for coalescing store updates.
//!
//! These tests verify that:
//! - Several writes in one tick reach each affected component once
//! - Components see the final value after the flush
//! - Unaffected components are not re-rendered

use pathstore::{Container, FlushMode, Path, Result, Runtime, Store, StoreConfig, Tracked};
use pathstore_test::{RenderHarness, init_tracing};

fn count_view(label: &'static str) -> impl Fn(&Tracked) -> Result<String> {
    move |root| {
        let count = root.get("count")?.and_then(|v| v.as_i64()).unwrap_or(0);
        Ok(format!("{label} count: {count}"))
    }
}

fn increment(store: &Store) {
    let path = Path::parse("count");
    let count = store
        .get(&path)
        .unwrap()
        .and_then(|v| v.as_i64())
        .unwrap_or(0);
    store.set(&path, count + 1).unwrap();
}

// =============================================================================
// Deferred Flush Tests
// =============================================================================

#[test]
fn test_synchronous_updates_are_batched() {
    init_tracing();
    let store = Store::new(Container::record_from([("count", 1)]));
    let harness = RenderHarness::new(store.clone());

    let comp1 = harness.mount(count_view("Comp1")).unwrap();
    let comp2 = harness.mount(count_view("Comp2")).unwrap();
    let parent = harness.mount(|_| Ok("parent".to_string())).unwrap();

    assert_eq!(comp1.render_count(), 1);
    assert_eq!(comp2.render_count(), 1);
    assert_eq!(comp1.output(), "Comp1 count: 1");

    increment(&store);
    harness.settle();

    assert_eq!(parent.render_count(), 1);
    assert_eq!(comp1.render_count(), 2);
    assert_eq!(comp2.render_count(), 2);
    assert_eq!(comp2.output(), "Comp2 count: 2");

    increment(&store);
    increment(&store);
    harness.settle();

    assert_eq!(parent.render_count(), 1);
    assert_eq!(comp1.render_count(), 3);
    assert_eq!(comp2.render_count(), 3);
    assert_eq!(comp1.output(), "Comp1 count: 4");
    assert_eq!(comp2.output(), "Comp2 count: 4");
    assert!(harness.errors().is_empty());
}

#[test]
fn test_three_increments_one_delivery() {
    let store = Store::new(Container::record_from([("count", 1)]));
    let harness = RenderHarness::new(store.clone());
    let comp = harness.mount(count_view("Comp")).unwrap();

    increment(&store);
    increment(&store);
    increment(&store);
    harness.settle();

    assert_eq!(harness.notified(), vec![comp.id()]);
    assert_eq!(comp.render_count(), 2);
    assert_eq!(comp.output(), "Comp count: 4");
}

#[test]
fn test_batch_flushes_at_the_end() {
    let store = Store::new(Container::record_from([("count", 1)]));
    let harness = RenderHarness::new(store.clone());
    let comp = harness.mount(count_view("Comp")).unwrap();

    Runtime::batch(|| {
        increment(&store);
        increment(&store);
        assert_eq!(comp.render_count(), 1);
    });

    assert_eq!(comp.render_count(), 2);
    assert_eq!(comp.output(), "Comp count: 3");
}

// =============================================================================
// Immediate Flush Tests
// =============================================================================

#[test]
fn test_immediate_mode_renders_per_write() {
    let store = Store::with_config(
        Container::record_from([("count", 1)]),
        StoreConfig::default().flush_mode(FlushMode::Immediate),
    );
    let harness = RenderHarness::new(store.clone());
    let comp1 = harness.mount(count_view("Comp1")).unwrap();
    let comp2 = harness.mount(count_view("Comp2")).unwrap();

    increment(&store);
    increment(&store);
    increment(&store);

    assert_eq!(comp1.render_count(), 4);
    assert_eq!(comp2.render_count(), 4);
    assert_eq!(comp1.output(), "Comp1 count: 4");
}

#[test]
fn test_immediate_mode_respects_batches() {
    let store = Store::with_config(
        Container::record_from([("count", 1)]),
        StoreConfig::default().flush_mode(FlushMode::Immediate),
    );
    let harness = RenderHarness::new(store.clone());
    let comp = harness.mount(count_view("Comp")).unwrap();

    Runtime::batch(|| {
        increment(&store);
        increment(&store);
        increment(&store);
    });

    assert_eq!(comp.render_count(), 2);
    assert_eq!(comp.output(), "Comp count: 4");
}

// =============================================================================
// Teardown Tests
// =============================================================================

#[test]
fn test_unmount_before_flush_is_silent() {
    let store = Store::new(Container::record_from([("count", 1)]));
    let harness = RenderHarness::new(store.clone());
    let comp = harness.mount(count_view("Comp")).unwrap();

    increment(&store);
    harness.unmount(&comp);
    harness.settle();

    assert!(harness.notified().is_empty());
    assert_eq!(comp.render_count(), 1);
    assert!(harness.errors().is_empty());
}
