
//! Reference-counted numeric handles for sharing resources
//! across an opaque boundary, like a C API or a plug-in.
//!
//! A resource is registered once and addressed by its `u64` handle from
//! then on. Every [`HandleRegistry::acquire`] must be paired with one
//! [`HandleRegistry::release`]; the resource is dropped exactly once,
//! when the last reference goes away, and never while the registry's
//! lock is held.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

struct Entry<T> {
    value: Arc<T>,
    references: usize,
}

struct Inner<T> {
    next_id: u64,
    entries: HashMap<u64, Entry<T>>,
}

/// Maps numeric handles to shared, reference-counted resources.
pub struct HandleRegistry<T> {
    inner: Mutex<Inner<T>>,
}

impl<T> Default for HandleRegistry<T> {
    fn default() -> Self { Self::new() }
}

impl<T> HandleRegistry<T> {

    pub fn new() -> Self {
        HandleRegistry {
            inner: Mutex::new(Inner { next_id: 1, entries: HashMap::new() }),
        }
    }

    /// Register a resource with an initial reference count of one.
    /// Returns its never-reused handle.
    pub fn register(&self, value: T) -> u64 {
        let mut inner = self.lock();

        let id = inner.next_id;
        inner.next_id += 1;
        inner.entries.insert(id, Entry { value: Arc::new(value), references: 1 });

        id
    }

    /// Take another reference to the resource behind this handle.
    /// Returns `None` for handles that were never registered
    /// or were already fully released.
    pub fn acquire(&self, id: u64) -> Option<Arc<T>> {
        let mut inner = self.lock();

        let entry = inner.entries.get_mut(&id)?;
        entry.references += 1;
        Some(Arc::clone(&entry.value))
    }

    /// Give up one reference to the resource behind this handle.
    /// The last release removes the resource; an unknown or already
    /// fully released handle is ignored.
    pub fn release(&self, id: u64) {
        let mut inner = self.lock();

        let fully_released = match inner.entries.get_mut(&id) {
            Some(entry) => {
                entry.references -= 1;
                entry.references == 0
            },

            None => false,
        };

        let removed = if fully_released { inner.entries.remove(&id) } else { None };

        drop(inner);

        // the lock is gone; a destructor may acquire other locks safely
        drop(removed);
    }

    /// Number of currently registered resources.
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    /// Whether no resources are registered.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner<T>> {
        // a poisoned registry cannot be repaired, propagating the panic is correct
        self.inner.lock().expect("handle registry was poisoned")
    }
}
