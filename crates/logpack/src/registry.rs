//! Stamp allocation and teardown flushing, scoped to an explicit registry.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

/// The buffer policy kinds that persist records and therefore need a stamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolicyKind {
    /// Flush after a fixed number of stores.
    Count,
    /// Flush when the serialized size crosses a limit.
    Size,
    /// Flush when an interval elapses.
    Time,
}

impl PolicyKind {
    const fn stamp_prefix(self) -> &'static str {
        match self {
            Self::Count => "CountBuffer",
            Self::Size => "SizeBuffer",
            Self::Time => "TimeBuffer",
        }
    }
}

/// Per-registry state that would otherwise be process-wide: the stamp
/// counters that keep buffer instances from colliding in a shared store, and
/// the list of flush procedures to run at host teardown.
///
/// Each [`Log`](crate::Log) owns a registry (or shares one supplied through
/// its builder); tests create their own so nothing leaks between them.
///
/// Flush listeners run last-registered-first, and running them drains the
/// list, so a teardown flush happens at most once per registration.
#[derive(Default)]
pub struct Registry {
    count_ids: AtomicU64,
    size_ids: AtomicU64,
    time_ids: AtomicU64,
    listeners: Mutex<Vec<Box<dyn Fn() + Send + Sync>>>,
}

impl Registry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocates a stamp for a buffer instance.
    ///
    /// With an explicit `id` the stamp is stable across reconstructions, so a
    /// buffer reattached to a shared store resumes its prior accumulation.
    /// Without one, a per-kind counter guarantees uniqueness within this
    /// registry.
    #[must_use]
    pub fn next_stamp(&self, kind: PolicyKind, id: Option<&str>) -> String {
        let discriminant = id.map_or_else(
            || {
                let counter = match kind {
                    PolicyKind::Count => &self.count_ids,
                    PolicyKind::Size => &self.size_ids,
                    PolicyKind::Time => &self.time_ids,
                };
                counter.fetch_add(1, Ordering::Relaxed).to_string()
            },
            ToString::to_string,
        );
        format!("{}-{}-", kind.stamp_prefix(), discriminant)
    }

    /// Registers a flush procedure to run at host teardown.
    pub fn register_flush(&self, flush: impl Fn() + Send + Sync + 'static) {
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        listeners.push(Box::new(flush));
    }

    /// Runs every registered flush procedure, last-registered-first, draining
    /// the list.
    pub fn flush_all(&self) {
        loop {
            let flush = {
                let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
                listeners.pop()
            };
            match flush {
                Some(flush) => flush(),
                None => break,
            }
        }
    }

    /// Clears the counters and drops every registered listener without
    /// running it.
    pub fn reset(&self) {
        self.count_ids.store(0, Ordering::Relaxed);
        self.size_ids.store(0, Ordering::Relaxed);
        self.time_ids.store(0, Ordering::Relaxed);
        let mut listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        listeners.clear();
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = self.listeners.lock().unwrap_or_else(|e| e.into_inner());
        f.debug_struct("Registry")
            .field("count_ids", &self.count_ids.load(Ordering::Relaxed))
            .field("size_ids", &self.size_ids.load(Ordering::Relaxed))
            .field("time_ids", &self.time_ids.load(Ordering::Relaxed))
            .field("listeners", &listeners.len())
            .finish()
    }
}
