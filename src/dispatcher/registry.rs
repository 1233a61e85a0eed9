//! Priority-ordered callback registry.
//!
//! Callbacks live in priority buckets kept sorted by descending priority.
//! Inside a bucket, slots are appended and never moved: unregistering a
//! callback tombstones its slot so every index handed out stays valid.

use crate::callback::Callback;
use parking_lot::RwLock;
use std::cmp::Reverse;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// A slot in a priority bucket.
enum Slot {
    Active(Callback),
    Tombstone,
}

/// All callbacks registered at one priority, in registration order.
struct Bucket {
    priority: i32,
    slots: Vec<Slot>,
}

#[derive(Default)]
struct Buckets {
    /// Sorted by descending priority.
    buckets: Vec<Bucket>,
}

impl Buckets {
    fn position(&self, priority: i32) -> Result<usize, usize> {
        self.buckets
            .binary_search_by_key(&Reverse(priority), |b| Reverse(b.priority))
    }

    fn push(&mut self, priority: i32, callback: Callback) -> usize {
        let pos = match self.position(priority) {
            Ok(pos) => pos,
            Err(pos) => {
                self.buckets.insert(
                    pos,
                    Bucket {
                        priority,
                        slots: Vec::new(),
                    },
                );
                pos
            }
        };

        let slots = &mut self.buckets[pos].slots;
        slots.push(Slot::Active(callback));
        slots.len() - 1
    }
}

/// Thread-safe callback registry shared by the dispatcher and its handles.
#[derive(Clone, Default)]
pub struct CallbackRegistry {
    inner: Arc<RwLock<Buckets>>,
}

impl CallbackRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a callback at the given priority.
    pub fn register(&self, priority: i32, callback: Callback) -> CallbackHandle {
        let index = self.inner.write().push(priority, callback);
        debug!(priority, index, "registered shutdown callback");

        CallbackHandle {
            registry: self.clone(),
            priority,
            index,
        }
    }

    /// Register several callbacks under one lock acquisition.
    pub fn register_all<I>(&self, callbacks: I)
    where
        I: IntoIterator<Item = (i32, Callback)>,
    {
        let mut buckets = self.inner.write();
        for (priority, callback) in callbacks {
            buckets.push(priority, callback);
        }
    }

    /// Callbacks in execution order: descending priority, then registration
    /// order. Tombstoned slots are skipped.
    pub fn snapshot(&self) -> Vec<Callback> {
        let buckets = self.inner.read();
        buckets
            .buckets
            .iter()
            .flat_map(|bucket| bucket.slots.iter())
            .filter_map(|slot| match slot {
                Slot::Active(callback) => Some(callback.clone()),
                Slot::Tombstone => None,
            })
            .collect()
    }

    /// Number of live callbacks.
    pub fn len(&self) -> usize {
        let buckets = self.inner.read();
        buckets
            .buckets
            .iter()
            .flat_map(|bucket| bucket.slots.iter())
            .filter(|slot| matches!(slot, Slot::Active(_)))
            .count()
    }

    /// True if no live callback is registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn tombstone(&self, priority: i32, index: usize) -> bool {
        let mut buckets = self.inner.write();
        let Ok(pos) = buckets.position(priority) else {
            return false;
        };

        match buckets.buckets[pos].slots.get_mut(index) {
            Some(slot @ Slot::Active(_)) => {
                *slot = Slot::Tombstone;
                true
            }
            _ => false,
        }
    }
}

impl fmt::Debug for CallbackRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackRegistry")
            .field("len", &self.len())
            .finish()
    }
}

/// Returned by registration; removes the callback from future cycles.
#[derive(Debug)]
pub struct CallbackHandle {
    registry: CallbackRegistry,
    priority: i32,
    index: usize,
}

impl CallbackHandle {
    /// Priority the callback was registered with.
    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// Unregister the callback. Calling it again is a no-op.
    pub fn unregister(&self) {
        if self.registry.tombstone(self.priority, self.index) {
            debug!(
                priority = self.priority,
                index = self.index,
                "unregistered shutdown callback"
            );
        }
    }
}
