//! Integration tests for the buffer policies.
//!
//! Tests cover:
//! - Count, size, time, and immediate flush behavior
//! - Flush ordering, storage reset, and empty flushes
//! - Stamp disjointness in shared stores
//! - Teardown flushing through the registry

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use logpack::{
    Buffer, BufferStore, CountBuffer, FlushFn, Level, MemoryStore, Record, Registry, SizeBuffer,
    TimeBuffer,
};
use serde_json::json;

fn record(text: &str) -> Record {
    Record::new(Level::Info, json!([text]))
}

type Flushes = Arc<Mutex<Vec<Vec<Record>>>>;

fn recording() -> (FlushFn, Flushes) {
    let flushes: Flushes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&flushes);
    let cb: FlushFn = Arc::new(move |records| {
        sink.lock().unwrap().push(records);
    });
    (cb, flushes)
}

/// Polls until at least `n` flushes happened or the deadline passes.
fn wait_for_flushes(flushes: &Flushes, n: usize, deadline: Duration) -> bool {
    let start = Instant::now();
    while start.elapsed() < deadline {
        if flushes.lock().unwrap().len() >= n {
            return true;
        }
        thread::sleep(Duration::from_millis(5));
    }
    flushes.lock().unwrap().len() >= n
}

// ===========================================================================
// Count policy
// ===========================================================================

#[test]
fn count_flushes_on_the_nth_store_in_order() {
    let registry = Registry::new();
    let store = Arc::new(MemoryStore::new());
    let buffer = CountBuffer::new(3, None, Arc::clone(&store) as Arc<dyn logpack::BufferStore>, &registry);
    let (cb, flushes) = recording();

    buffer.store(record("one"), Arc::clone(&cb), false);
    buffer.store(record("two"), Arc::clone(&cb), false);
    assert!(flushes.lock().unwrap().is_empty());
    assert!(store.keys().len() > 1, "records should still be buffered");

    buffer.store(record("three"), cb, false);
    let flushed = flushes.lock().unwrap();
    assert_eq!(flushed.len(), 1);
    assert_eq!(
        flushed[0],
        vec![record("one"), record("two"), record("three")]
    );
}

#[test]
fn count_resets_after_a_forced_flush() {
    let registry = Registry::new();
    let store: Arc<dyn logpack::BufferStore> = Arc::new(MemoryStore::new());
    let buffer = CountBuffer::new(3, None, store, &registry);
    let (cb, flushes) = recording();

    buffer.store(record("one"), Arc::clone(&cb), false);
    buffer.store(record("two"), Arc::clone(&cb), true);
    assert_eq!(flushes.lock().unwrap().len(), 1);

    // The countdown restarted: two more stores stay buffered, the third
    // flushes.
    buffer.store(record("three"), Arc::clone(&cb), false);
    buffer.store(record("four"), Arc::clone(&cb), false);
    assert_eq!(flushes.lock().unwrap().len(), 1);
    buffer.store(record("five"), cb, false);

    let flushed = flushes.lock().unwrap();
    assert_eq!(flushed.len(), 2);
    assert_eq!(
        flushed[1],
        vec![record("three"), record("four"), record("five")]
    );
}

#[test]
fn flush_clears_storage_and_resets_the_index() {
    let registry = Registry::new();
    let store = Arc::new(MemoryStore::new());
    let buffer = CountBuffer::new(
        2,
        None,
        Arc::clone(&store) as Arc<dyn logpack::BufferStore>,
        &registry,
    );
    let (cb, _) = recording();

    buffer.store(record("one"), Arc::clone(&cb), false);
    buffer.store(record("two"), cb, false);

    assert_eq!(store.keys(), vec!["CountBuffer-0-index".to_string()]);
    assert_eq!(store.get("CountBuffer-0-index"), Some("0".to_string()));
}

// ===========================================================================
// Size policy
// ===========================================================================

#[test]
fn size_flushes_only_when_strictly_over_the_limit() {
    let registry = Registry::new();
    let store: Arc<dyn logpack::BufferStore> = Arc::new(MemoryStore::new());
    let buffer = SizeBuffer::new(1, None, store, &registry);
    let (cb, flushes) = recording();

    let entry = record(&"x".repeat(100));
    let entry_bytes = serde_json::to_string(&entry)
        .unwrap()
        .encode_utf16()
        .count() as u64
        * 2;
    let fits = 1024 / entry_bytes;
    assert!(fits >= 1, "test entry unexpectedly large");

    for _ in 0..fits {
        buffer.store(entry.clone(), Arc::clone(&cb), false);
    }
    assert!(
        flushes.lock().unwrap().is_empty(),
        "at-or-under the limit must not flush"
    );

    buffer.store(entry.clone(), cb, false);
    let flushed = flushes.lock().unwrap();
    assert_eq!(flushed.len(), 1);
    assert_eq!(flushed[0].len(), (fits + 1) as usize);
}

#[test]
fn size_force_flush_ignores_the_limit() {
    let registry = Registry::new();
    let store: Arc<dyn logpack::BufferStore> = Arc::new(MemoryStore::new());
    let buffer = SizeBuffer::new(500, None, store, &registry);
    let (cb, flushes) = recording();

    buffer.store(record("tiny"), cb, true);
    let flushed = flushes.lock().unwrap();
    assert_eq!(flushed.len(), 1);
    assert_eq!(flushed[0], vec![record("tiny")]);
}

// ===========================================================================
// Time policy
// ===========================================================================

#[test]
fn time_flushes_after_the_interval_not_before() {
    let registry = Registry::new();
    let store: Arc<dyn logpack::BufferStore> = Arc::new(MemoryStore::new());
    let buffer = TimeBuffer::new(Duration::from_millis(150), None, store, &registry);
    let (cb, flushes) = recording();

    buffer.store(record("one"), Arc::clone(&cb), false);
    buffer.store(record("two"), cb, false);

    thread::sleep(Duration::from_millis(40));
    assert!(
        flushes.lock().unwrap().is_empty(),
        "flushed before the interval elapsed"
    );

    assert!(wait_for_flushes(&flushes, 1, Duration::from_secs(2)));
    let flushed = flushes.lock().unwrap();
    assert_eq!(flushed[0], vec![record("one"), record("two")]);
}

#[test]
fn time_force_flush_is_immediate_and_rearms() {
    let registry = Registry::new();
    let store: Arc<dyn logpack::BufferStore> = Arc::new(MemoryStore::new());
    let buffer = TimeBuffer::new(Duration::from_millis(100), None, store, &registry);
    let (cb, flushes) = recording();

    buffer.store(record("urgent"), Arc::clone(&cb), true);
    {
        let flushed = flushes.lock().unwrap();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0], vec![record("urgent")]);
    }

    // The rearmed timer picks up what accumulates afterwards, delivering to
    // the last remembered callback.
    buffer.store(record("later"), cb, false);
    assert!(wait_for_flushes(&flushes, 2, Duration::from_secs(2)));
    let flushed = flushes.lock().unwrap();
    assert_eq!(flushed[1], vec![record("later")]);
}

// ===========================================================================
// Shared stores and teardown
// ===========================================================================

#[test]
fn stamps_keep_shared_store_regions_disjoint() {
    let registry = Registry::new();
    let store = Arc::new(MemoryStore::new());
    let first = CountBuffer::new(
        10,
        None,
        Arc::clone(&store) as Arc<dyn logpack::BufferStore>,
        &registry,
    );
    let second = CountBuffer::new(
        10,
        None,
        Arc::clone(&store) as Arc<dyn logpack::BufferStore>,
        &registry,
    );
    let (cb, flushes) = recording();

    first.store(record("a"), Arc::clone(&cb), false);
    first.store(record("b"), Arc::clone(&cb), false);
    second.store(record("z"), Arc::clone(&cb), false);

    // Flushing the first buffer leaves the second's record untouched.
    first.store(record("c"), Arc::clone(&cb), true);
    {
        let flushed = flushes.lock().unwrap();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0], vec![record("a"), record("b"), record("c")]);
    }
    assert!(store.get("CountBuffer-1-0").is_some());

    second.store(record("y"), cb, true);
    let flushed = flushes.lock().unwrap();
    assert_eq!(flushed[1], vec![record("z"), record("y")]);
}

#[test]
fn teardown_flushes_run_last_registered_first() {
    let registry = Registry::new();
    let store: Arc<dyn logpack::BufferStore> = Arc::new(MemoryStore::new());
    let first = CountBuffer::new(10, None, Arc::clone(&store), &registry);
    let second = CountBuffer::new(10, None, Arc::clone(&store), &registry);

    let order: Arc<Mutex<Vec<&'static str>>> = Arc::new(Mutex::new(Vec::new()));
    let first_order = Arc::clone(&order);
    let second_order = Arc::clone(&order);
    let first_cb: FlushFn = Arc::new(move |_| first_order.lock().unwrap().push("first"));
    let second_cb: FlushFn = Arc::new(move |_| second_order.lock().unwrap().push("second"));

    first.store(record("a"), first_cb, false);
    second.store(record("b"), second_cb, false);

    registry.flush_all();
    assert_eq!(*order.lock().unwrap(), vec!["second", "first"]);
}

#[test]
fn empty_flush_still_invokes_the_callback() {
    let registry = Registry::new();
    let store: Arc<dyn logpack::BufferStore> = Arc::new(MemoryStore::new());
    let buffer = CountBuffer::new(10, None, store, &registry);
    let (cb, flushes) = recording();

    buffer.store(record("a"), cb, true);
    assert_eq!(flushes.lock().unwrap().len(), 1);

    // Nothing is buffered now, but a teardown round still informs the sink.
    registry.flush_all();
    let flushed = flushes.lock().unwrap();
    assert_eq!(flushed.len(), 2);
    assert!(flushed[1].is_empty());
}
