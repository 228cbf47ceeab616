//! Identity-preserving deep copies
//!
//! Deep-copying a graph of shared objects must produce a graph with the same
//! sharing structure: if two elements reference one transform, their copies
//! reference one copied transform. [`CopyManager`] tracks every source object
//! already copied during one copy operation and hands out the existing copy on
//! repeat requests.
//!
//! Some fix-ups can only run once the whole graph exists (an element name is
//! assigned after its subtree is copied). Those are queued with
//! [`CopyManager::on_completed`] and run by [`CopyManager::finish`].

use std::any::Any;
use std::sync::Arc;

use rustc_hash::FxHashMap;

/// Types that can produce a deep copy of themselves
pub trait DeepCopy: Send + Sync + 'static {
    /// Produce a copy, routing shared sub-objects through `copies`
    fn deep_copy(&self, copies: &mut CopyManager) -> Self
    where
        Self: Sized;
}

struct CopyEntry {
    // Keeps the source alive so its address cannot be reused mid-copy
    _source: Arc<dyn Any + Send + Sync>,
    copy: Arc<dyn Any + Send + Sync>,
}

/// Callback run after a copy operation completes
pub type CompletedCallback = Box<dyn FnOnce() + Send>;

/// Tracks source → copy identity for one deep-copy operation
#[derive(Default)]
pub struct CopyManager {
    identities: FxHashMap<usize, CopyEntry>,
    completed: Vec<CompletedCallback>,
}

impl CopyManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn key<T>(source: &Arc<T>) -> usize {
        Arc::as_ptr(source) as *const () as usize
    }

    /// The copy already made for `source`, if any
    pub fn lookup<T: Send + Sync + 'static>(&self, source: &Arc<T>) -> Option<Arc<T>> {
        self.identities
            .get(&Self::key(source))
            .and_then(|entry| entry.copy.clone().downcast::<T>().ok())
    }

    /// Record `copy` as the copy of `source`
    pub fn register<T: Send + Sync + 'static>(&mut self, source: &Arc<T>, copy: &Arc<T>) {
        self.identities.insert(
            Self::key(source),
            CopyEntry {
                _source: source.clone(),
                copy: copy.clone(),
            },
        );
    }

    /// Copy `source`, or return the copy made earlier in this operation
    pub fn get_copy<T: DeepCopy>(&mut self, source: &Arc<T>) -> Arc<T> {
        if let Some(existing) = self.lookup(source) {
            return existing;
        }
        let copy = Arc::new(source.deep_copy(self));
        self.register(source, &copy);
        copy
    }

    /// Copy an optional shared object
    pub fn get_copy_opt<T: DeepCopy>(&mut self, source: &Option<Arc<T>>) -> Option<Arc<T>> {
        source.as_ref().map(|s| self.get_copy(s))
    }

    /// Queue work to run once the whole graph has been copied
    pub fn on_completed(&mut self, callback: impl FnOnce() + Send + 'static) {
        self.completed.push(Box::new(callback));
    }

    /// Number of distinct objects copied so far
    pub fn copied_count(&self) -> usize {
        self.identities.len()
    }

    /// Run completion callbacks in the order they were queued.
    ///
    /// Returns the number of distinct objects copied.
    pub fn finish(self) -> usize {
        let count = self.identities.len();
        for callback in self.completed {
            callback();
        }
        count
    }
}

/// Deep-copy a single shared object graph
pub fn deep_copy<T: DeepCopy>(source: &Arc<T>) -> Arc<T> {
    let mut copies = CopyManager::new();
    let copy = copies.get_copy(source);
    copies.finish();
    copy
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transform::Transform;
    use parking_lot::Mutex;

    #[test]
    fn test_shared_reference_stays_shared() {
        let shared = Arc::new(Transform::rotate(45.0));
        let group = Arc::new(Transform::Group(vec![shared.clone(), shared.clone()]));

        let copy = deep_copy(&group);
        let Transform::Group(children) = copy.as_ref() else {
            panic!("expected group");
        };
        assert!(Arc::ptr_eq(&children[0], &children[1]));
        assert!(!Arc::ptr_eq(&children[0], &shared));
        assert_eq!(*children[0], *shared);
    }

    #[test]
    fn test_repeat_requests_return_same_copy() {
        let source = Arc::new(Transform::translate(1.0, 2.0));
        let mut copies = CopyManager::new();
        let a = copies.get_copy(&source);
        let b = copies.get_copy(&source);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(copies.copied_count(), 1);
        assert!(copies.get_copy_opt::<Transform>(&None).is_none());
    }

    #[test]
    fn test_completion_callbacks_run_in_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut copies = CopyManager::new();
        for i in 0..3 {
            let log = log.clone();
            copies.on_completed(move || log.lock().push(i));
        }
        assert!(log.lock().is_empty());
        copies.finish();
        assert_eq!(*log.lock(), vec![0, 1, 2]);
    }
}
