//! Deferred property writes
//!
//! Render-owned state must only change on the render thread, between frames.
//! [`PendingValues`] is bound to the render thread once it starts; writes
//! issued from any other thread are parked (last write per cell wins) and
//! applied in submission order by [`PendingValues::apply_pending`] at the
//! start of the next frame.

use std::any::Any;
use std::thread::{self, ThreadId};

use parking_lot::Mutex;

use crate::property::{Property, PropertyId, PropertyValue};

type ApplyFn = Box<dyn FnOnce(Box<dyn Any + Send>) + Send>;

struct PendingEntry {
    id: PropertyId,
    value: Box<dyn Any + Send>,
    apply: ApplyFn,
}

/// Queue of property writes waiting for the render thread
#[derive(Default)]
pub struct PendingValues {
    render_thread: Mutex<Option<ThreadId>>,
    entries: Mutex<Vec<PendingEntry>>,
}

impl PendingValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind the calling thread as the render thread
    pub fn bind_render_thread(&self) {
        *self.render_thread.lock() = Some(thread::current().id());
    }

    /// Forget the render thread; writes go straight through afterwards
    pub fn unbind_render_thread(&self) {
        *self.render_thread.lock() = None;
    }

    /// True when no render thread is bound or the caller is the render thread
    pub fn is_render_thread(&self) -> bool {
        match *self.render_thread.lock() {
            Some(id) => id == thread::current().id(),
            None => true,
        }
    }

    /// Set `property` now if on the render thread, otherwise park the value.
    ///
    /// Returns true if the write was deferred.
    pub fn set<T: PropertyValue>(&self, property: &Property<T>, value: T) -> bool {
        if self.is_render_thread() {
            property.set(value);
            return false;
        }
        self.defer(property, value);
        true
    }

    /// Park a write regardless of the calling thread
    pub fn defer<T: PropertyValue>(&self, property: &Property<T>, value: T) {
        let target = property.clone();
        let entry = PendingEntry {
            id: property.id(),
            value: Box::new(value),
            apply: Box::new(move |value| {
                if let Ok(value) = value.downcast::<T>() {
                    target.set(*value);
                }
            }),
        };

        let mut entries = self.entries.lock();
        match entries.iter_mut().find(|e| e.id == entry.id) {
            Some(existing) => existing.value = entry.value,
            None => entries.push(entry),
        }
    }

    /// The parked value for `property`, or its current value
    pub fn get_pending_or_current<T: PropertyValue>(&self, property: &Property<T>) -> T {
        let entries = self.entries.lock();
        entries
            .iter()
            .find(|e| e.id == property.id())
            .and_then(|e| e.value.downcast_ref::<T>().cloned())
            .unwrap_or_else(|| property.get())
    }

    /// Apply every parked write. Listeners run without the queue lock held,
    /// so writes they issue are queued for the following frame.
    pub fn apply_pending(&self) -> usize {
        let drained: Vec<PendingEntry> = std::mem::take(&mut *self.entries.lock());
        let count = drained.len();
        for entry in drained {
            (entry.apply)(entry.value);
        }
        if count > 0 {
            tracing::trace!("applied {} pending property values", count);
        }
        count
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}
