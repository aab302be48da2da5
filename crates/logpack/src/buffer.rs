//! Buffer policies: accumulate formatted records and decide when to flush
//! them to a sink.

use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use crate::record::Record;
use crate::registry::{PolicyKind, Registry};
use crate::store::BufferStore;

/// Callback a flush delivers its ordered record sequence to.
pub type FlushFn = Arc<dyn Fn(Vec<Record>) + Send + Sync>;

/// Accumulation policy between a writer and its sink.
///
/// `store` appends one record and decides whether to flush now; `force_flush`
/// requests an immediate, threshold-independent flush (error-level messages,
/// host teardown). A flush hands the sink every buffered record in insertion
/// order and clears the underlying storage; partial flushes do not exist.
///
/// Contract: a flush callback must not call `store` on the same buffer before
/// the flush returns.
pub trait Buffer: Send + Sync {
    /// Stores `record` and flushes to `on_flush` when the policy says so.
    fn store(&self, record: Record, on_flush: FlushFn, force_flush: bool);
}

fn noop_flush() -> FlushFn {
    Arc::new(|_| {})
}

/// State shared by the persisted policies: a stamped region of a
/// [`BufferStore`] plus the last flush callback seen.
struct BufferCore {
    stamp: String,
    store: Arc<dyn BufferStore>,
    state: Mutex<CoreState>,
}

struct CoreState {
    last_cb: FlushFn,
}

impl BufferCore {
    /// Claims a stamped region of `store` and registers the flush procedure
    /// for teardown. An existing index under the same stamp is kept, so a
    /// buffer reattached to a shared store resumes the prior accumulation.
    fn new(
        kind: PolicyKind,
        id: Option<&str>,
        store: Arc<dyn BufferStore>,
        registry: &Registry,
    ) -> Arc<Self> {
        let core = Arc::new(Self {
            stamp: registry.next_stamp(kind, id),
            store,
            state: Mutex::new(CoreState {
                last_cb: noop_flush(),
            }),
        });
        if core.store.get(&core.index_key()).is_none() {
            core.store.set(&core.index_key(), "0".to_string());
        }
        let flusher = Arc::clone(&core);
        registry.register_flush(move || flusher.flush(None));
        core
    }

    fn index_key(&self) -> String {
        format!("{}index", self.stamp)
    }

    fn slot_key(&self, offset: u64) -> String {
        format!("{}{}", self.stamp, offset)
    }

    fn read_index(&self) -> u64 {
        self.store
            .get(&self.index_key())
            .and_then(|value| value.parse().ok())
            .unwrap_or(0)
    }

    /// Serializes `record` into the next slot and remembers `on_flush` for
    /// flushes that have no callback of their own. A record that fails to
    /// serialize is dropped.
    fn append(&self, record: &Record, on_flush: &FlushFn) {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        state.last_cb = Arc::clone(on_flush);
        let Ok(serialized) = serde_json::to_string(record) else {
            return;
        };
        let index = self.read_index();
        self.store.set(&self.slot_key(index), serialized);
        self.store.set(&self.index_key(), (index + 1).to_string());
    }

    /// Cumulative size of the buffered entries, counting two bytes per UTF-16
    /// code unit of their serialized form.
    fn buffered_bytes(&self) -> u64 {
        let _guard = self.state.lock().unwrap_or_else(|e| e.into_inner());
        let mut total = 0;
        for offset in 0..self.read_index() {
            if let Some(entry) = self.store.get(&self.slot_key(offset)) {
                total += entry.encode_utf16().count() as u64 * 2;
            }
        }
        total
    }

    /// The shared flush procedure: drain slots `0..index` in order (skipping
    /// absent or undecodable entries), reset the index, then hand the records
    /// to the callback — the provided one, falling back to the last
    /// remembered one. The callback runs outside the internal lock and is
    /// invoked even when nothing was buffered.
    fn flush(&self, on_flush: Option<FlushFn>) {
        let (records, cb) = {
            let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(cb) = on_flush {
                state.last_cb = cb;
            }
            let mut records = Vec::new();
            for offset in 0..self.read_index() {
                let key = self.slot_key(offset);
                if let Some(entry) = self.store.get(&key) {
                    if let Ok(record) = serde_json::from_str(&entry) {
                        records.push(record);
                    }
                    self.store.remove(&key);
                }
            }
            self.store.set(&self.index_key(), "0".to_string());
            (records, Arc::clone(&state.last_cb))
        };
        cb(records);
    }
}

/// No buffering: every `store` call is a synchronous flush of that one
/// record, with no persistence and no teardown registration.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateBuffer;

impl ImmediateBuffer {
    /// Creates the buffer.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Buffer for ImmediateBuffer {
    fn store(&self, record: Record, on_flush: FlushFn, _force_flush: bool) {
        on_flush(vec![record]);
    }
}

/// Flushes after a fixed number of stores, or on force-flush; the counter
/// resets after every flush.
pub struct CountBuffer {
    core: Arc<BufferCore>,
    threshold: u32,
    remaining: Mutex<u32>,
}

impl CountBuffer {
    /// Creates a buffer flushing every `threshold` stores. An explicit `id`
    /// keeps the storage keys stable across reconstructions.
    #[must_use]
    pub fn new(
        threshold: u32,
        id: Option<&str>,
        store: Arc<dyn BufferStore>,
        registry: &Registry,
    ) -> Self {
        let threshold = threshold.max(1);
        Self {
            core: BufferCore::new(PolicyKind::Count, id, store, registry),
            threshold,
            remaining: Mutex::new(threshold),
        }
    }
}

impl Buffer for CountBuffer {
    fn store(&self, record: Record, on_flush: FlushFn, force_flush: bool) {
        self.core.append(&record, &on_flush);
        let reached = force_flush || {
            let mut remaining = self.remaining.lock().unwrap_or_else(|e| e.into_inner());
            *remaining = remaining.saturating_sub(1);
            *remaining == 0
        };
        if reached {
            self.core.flush(Some(on_flush));
            let mut remaining = self.remaining.lock().unwrap_or_else(|e| e.into_inner());
            *remaining = self.threshold;
        }
    }
}

/// Flushes when the cumulative serialized size of the buffered entries
/// strictly exceeds the limit, or on force-flush. The size check runs after
/// appending, so the triggering record is part of the flush.
pub struct SizeBuffer {
    core: Arc<BufferCore>,
    limit_bytes: u64,
}

impl SizeBuffer {
    /// Creates a buffer with a limit of `limit_kb` kilobytes.
    #[must_use]
    pub fn new(
        limit_kb: u64,
        id: Option<&str>,
        store: Arc<dyn BufferStore>,
        registry: &Registry,
    ) -> Self {
        Self {
            core: BufferCore::new(PolicyKind::Size, id, store, registry),
            limit_bytes: limit_kb.max(1) * 1024,
        }
    }
}

impl Buffer for SizeBuffer {
    fn store(&self, record: Record, on_flush: FlushFn, force_flush: bool) {
        self.core.append(&record, &on_flush);
        if force_flush || self.core.buffered_bytes() > self.limit_bytes {
            self.core.flush(Some(on_flush));
        }
    }
}

/// Flushes when an interval elapses, or on force-flush.
///
/// The interval is a one-shot countdown driven by a dedicated timer thread:
/// armed at construction, rearmed after every force-flush, and firing at most
/// once per arm. A timer fire flushes with no explicit callback and so falls
/// back to the last one remembered. `store` itself never triggers a
/// threshold flush.
pub struct TimeBuffer {
    core: Arc<BufferCore>,
    rearm: mpsc::Sender<()>,
}

impl TimeBuffer {
    /// Creates a buffer flushing `interval` after each (re)arm.
    #[must_use]
    pub fn new(
        interval: Duration,
        id: Option<&str>,
        store: Arc<dyn BufferStore>,
        registry: &Registry,
    ) -> Self {
        let core = BufferCore::new(PolicyKind::Time, id, store, registry);
        let (rearm, countdown) = mpsc::channel();
        let timer_core = Arc::clone(&core);
        let _ = thread::Builder::new()
            .name("logpack-timer".to_string())
            .spawn(move || run_timer(&timer_core, interval, &countdown));
        Self { core, rearm }
    }
}

impl Buffer for TimeBuffer {
    fn store(&self, record: Record, on_flush: FlushFn, force_flush: bool) {
        self.core.append(&record, &on_flush);
        if force_flush {
            self.core.flush(Some(on_flush));
            let _ = self.rearm.send(());
        }
    }
}

/// Timer loop: each received unit restarts the countdown; a timeout fires one
/// flush and then waits for the next rearm. Exits when the buffer (the
/// sender) is dropped.
fn run_timer(core: &Arc<BufferCore>, interval: Duration, countdown: &mpsc::Receiver<()>) {
    loop {
        match countdown.recv_timeout(interval) {
            Ok(()) => {}
            Err(RecvTimeoutError::Timeout) => {
                core.flush(None);
                if countdown.recv().is_err() {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn record(text: &str) -> Record {
        Record::new(Level::Info, json!([text]))
    }

    fn recording() -> (FlushFn, Arc<Mutex<Vec<Vec<Record>>>>) {
        let flushes: Arc<Mutex<Vec<Vec<Record>>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&flushes);
        let cb: FlushFn = Arc::new(move |records| {
            sink.lock().unwrap().push(records);
        });
        (cb, flushes)
    }

    #[test]
    fn test_slots_and_index_layout() {
        let registry = Registry::new();
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let buffer = CountBuffer::new(5, None, Arc::clone(&store) as Arc<dyn BufferStore>, &registry);
        let (cb, _) = recording();

        buffer.store(record("a"), Arc::clone(&cb), false);
        buffer.store(record("b"), cb, false);

        assert_eq!(store.get("CountBuffer-0-index"), Some("2".to_string()));
        assert!(store.get("CountBuffer-0-0").is_some());
        assert!(store.get("CountBuffer-0-1").is_some());
        assert_eq!(store.get("CountBuffer-0-2"), None);
    }

    #[test]
    fn test_flush_skips_undecodable_entries() {
        let registry = Registry::new();
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let buffer = CountBuffer::new(2, None, Arc::clone(&store) as Arc<dyn BufferStore>, &registry);
        let (cb, flushes) = recording();

        buffer.store(record("a"), Arc::clone(&cb), false);
        store.set("CountBuffer-0-1", "not json".to_string());
        store.set("CountBuffer-0-index", "2".to_string());
        buffer.store(record("c"), cb, false);

        let flushed = flushes.lock().unwrap();
        assert_eq!(flushed.len(), 1);
        assert_eq!(flushed[0], vec![record("a"), record("c")]);
        // The corrupt slot was consumed all the same.
        assert_eq!(store.get("CountBuffer-0-1"), None);
    }

    #[test]
    fn test_index_resumes_from_existing_store() {
        let registry = Registry::new();
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        {
            let buffer = CountBuffer::new(10, Some("session"), Arc::clone(&store) as Arc<dyn BufferStore>, &registry);
            let (cb, _) = recording();
            buffer.store(record("a"), Arc::clone(&cb), false);
            buffer.store(record("b"), cb, false);
        }

        let buffer = CountBuffer::new(10, Some("session"), Arc::clone(&store) as Arc<dyn BufferStore>, &registry);
        let (cb, flushes) = recording();
        buffer.store(record("c"), Arc::clone(&cb), false);
        assert_eq!(store.get("CountBuffer-session-index"), Some("3".to_string()));

        buffer.store(record("d"), cb, true);
        let flushed = flushes.lock().unwrap();
        assert_eq!(
            flushed[0],
            vec![record("a"), record("b"), record("c"), record("d")]
        );
    }

    #[test]
    fn test_immediate_never_persists() {
        let buffer = ImmediateBuffer::new();
        let (cb, flushes) = recording();

        buffer.store(record("a"), Arc::clone(&cb), false);
        buffer.store(record("b"), cb, false);

        let flushed = flushes.lock().unwrap();
        assert_eq!(flushed.len(), 2);
        assert_eq!(flushed[0], vec![record("a")]);
        assert_eq!(flushed[1], vec![record("b")]);
    }

    #[test]
    fn test_zero_thresholds_are_normalized() {
        let registry = Registry::new();
        let store: Arc<MemoryStore> = Arc::new(MemoryStore::new());
        let buffer = CountBuffer::new(0, None, Arc::clone(&store) as Arc<dyn BufferStore>, &registry);
        let (cb, flushes) = recording();

        // threshold 0 behaves as 1: every store flushes.
        buffer.store(record("a"), cb, false);
        assert_eq!(flushes.lock().unwrap().len(), 1);
    }
}
