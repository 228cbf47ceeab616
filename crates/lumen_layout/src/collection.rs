//! Element collections
//!
//! The ordered child list of an element. Every mutating operation:
//!
//! - runs under a re-entrant operation lock, so a change handler may mutate
//!   the collection again from the same thread
//! - gives added elements the owner's parent link, screen and state
//! - fully disposes removed elements before returning
//! - invalidates the owner's layout
//! - fires the changed notification exactly once, after the mutation

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};

use crate::element::{Element, ElementId, ElementNode, ElementState};
use crate::error::{LayoutError, Result};

static NEXT_HANDLER_ID: AtomicU64 = AtomicU64::new(1);

/// Handle returned by [`ElementCollection::on_changed`]
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ChangeHandlerId(u64);

pub type ChangedHandler = Arc<dyn Fn(&ElementCollection) + Send + Sync>;

pub struct ElementCollection {
    owner: Mutex<Weak<ElementNode>>,
    owner_id: ElementId,
    op_lock: ReentrantMutex<()>,
    items: Mutex<Vec<Element>>,
    handlers: Mutex<Vec<(ChangeHandlerId, ChangedHandler)>>,
}

impl ElementCollection {
    pub(crate) fn new(owner: Weak<ElementNode>, owner_id: ElementId) -> Self {
        Self {
            owner: Mutex::new(owner),
            owner_id,
            op_lock: ReentrantMutex::new(()),
            items: Mutex::new(Vec::new()),
            handlers: Mutex::new(Vec::new()),
        }
    }

    pub fn owner(&self) -> Option<Element> {
        self.owner.lock().upgrade().map(Element)
    }

    fn live_owner(&self) -> Result<Element> {
        match self.owner() {
            Some(owner) if !owner.is_disposed() => Ok(owner),
            _ => Err(LayoutError::Disposed(self.owner_id)),
        }
    }

    fn adopt(owner: &Element, element: &Element) -> Result<()> {
        if element.is_disposed() {
            return Err(LayoutError::Disposed(element.id()));
        }
        if element.ptr_eq(owner) || element.is_ancestor_of(owner) || !element.claim_parent(owner) {
            return Err(LayoutError::AlreadyParented(element.id()));
        }
        let state = match owner.state() {
            ElementState::Running => ElementState::Running,
            _ => ElementState::Available,
        };
        element.set_context(owner.screen(), state);
        Ok(())
    }

    fn finish_change(&self, owner: Option<&Element>) {
        if let Some(owner) = owner {
            owner.invalidate_layout();
        }
        let handlers: Vec<ChangedHandler> = self
            .handlers
            .lock()
            .iter()
            .map(|(_, handler)| handler.clone())
            .collect();
        for handler in handlers {
            handler(self);
        }
    }

    // =========================================================================
    // Mutation
    // =========================================================================

    /// Append an element
    pub fn add(&self, element: Element) -> Result<()> {
        let _op = self.op_lock.lock();
        let owner = self.live_owner()?;
        Self::adopt(&owner, &element)?;
        self.items.lock().push(element);
        self.finish_change(Some(&owner));
        Ok(())
    }

    /// Insert an element at `index` (`0..=len`)
    pub fn insert(&self, index: usize, element: Element) -> Result<()> {
        let _op = self.op_lock.lock();
        let owner = self.live_owner()?;
        let len = self.len();
        if index > len {
            return Err(LayoutError::IndexOutOfRange { index, len });
        }
        Self::adopt(&owner, &element)?;
        self.items.lock().insert(index, element);
        self.finish_change(Some(&owner));
        Ok(())
    }

    /// Remove and dispose `element`. Returns false if it is not a member.
    pub fn remove(&self, element: &Element) -> bool {
        let _op = self.op_lock.lock();
        let removed = {
            let mut items = self.items.lock();
            match items.iter().position(|e| e.ptr_eq(element)) {
                Some(index) => items.remove(index),
                None => return false,
            }
        };
        removed.dispose();
        self.finish_change(self.owner().as_ref());
        true
    }

    /// Remove and dispose the element at `index`
    pub fn remove_at(&self, index: usize) -> Result<()> {
        let _op = self.op_lock.lock();
        let removed = {
            let mut items = self.items.lock();
            let len = items.len();
            if index >= len {
                return Err(LayoutError::IndexOutOfRange { index, len });
            }
            items.remove(index)
        };
        removed.dispose();
        self.finish_change(self.owner().as_ref());
        Ok(())
    }

    /// Dispose every element. Notifies once, even when already empty.
    pub fn clear(&self) {
        let _op = self.op_lock.lock();
        let removed = std::mem::take(&mut *self.items.lock());
        for element in &removed {
            element.dispose();
        }
        self.finish_change(self.owner().as_ref());
    }

    /// Replace the element at `index`, disposing the previous one. Setting the
    /// element already at `index` does nothing.
    pub fn set(&self, index: usize, element: Element) -> Result<()> {
        let _op = self.op_lock.lock();
        let owner = self.live_owner()?;
        let len = self.len();
        if index >= len {
            return Err(LayoutError::IndexOutOfRange { index, len });
        }
        if self.items.lock()[index].ptr_eq(&element) {
            return Ok(());
        }
        Self::adopt(&owner, &element)?;
        let previous = std::mem::replace(&mut self.items.lock()[index], element);
        previous.dispose();
        self.finish_change(Some(&owner));
        Ok(())
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn get(&self, index: usize) -> Option<Element> {
        self.items.lock().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }

    pub fn contains(&self, element: &Element) -> bool {
        self.index_of(element).is_some()
    }

    pub fn index_of(&self, element: &Element) -> Option<usize> {
        self.items.lock().iter().position(|e| e.ptr_eq(element))
    }

    /// Copy of the current members, safe to iterate while the collection
    /// changes
    pub fn snapshot(&self) -> Vec<Element> {
        self.items.lock().clone()
    }

    pub fn iter(&self) -> std::vec::IntoIter<Element> {
        self.snapshot().into_iter()
    }

    // =========================================================================
    // Notification
    // =========================================================================

    pub fn on_changed<F>(&self, handler: F) -> ChangeHandlerId
    where
        F: Fn(&ElementCollection) + Send + Sync + 'static,
    {
        let id = ChangeHandlerId(NEXT_HANDLER_ID.fetch_add(1, Ordering::Relaxed));
        self.handlers.lock().push((id, Arc::new(handler)));
        id
    }

    pub fn remove_handler(&self, id: ChangeHandlerId) -> bool {
        let mut handlers = self.handlers.lock();
        let before = handlers.len();
        handlers.retain(|(handler_id, _)| *handler_id != id);
        handlers.len() != before
    }

    /// Drop the owner link and dispose every member without notifying
    pub(crate) fn dispose(&self) {
        let _op = self.op_lock.lock();
        *self.owner.lock() = Weak::new();
        self.handlers.lock().clear();
        let removed = std::mem::take(&mut *self.items.lock());
        for element in removed {
            element.dispose();
        }
    }
}

impl std::fmt::Debug for ElementCollection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementCollection")
            .field("owner", &self.owner_id)
            .field("len", &self.len())
            .finish()
    }
}
