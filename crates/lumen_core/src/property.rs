//! Reactive property cells
//!
//! A [`Property`] is a shared, typed value box with an ordered list of change
//! listeners. Setting a value that differs from the stored one invokes every
//! listener synchronously, in attach order, with the cell and the previous
//! value. No lock is held while listeners run, so a listener may read or set
//! any cell (including the one that fired) without deadlocking.
//!
//! ```text
//!   set(v) ──► value lock ──► v == old? ──yes──► return false
//!                                │ no
//!                                ▼
//!                     swap, release lock
//!                                │
//!                   snapshot listeners, release lock
//!                                │
//!                  listener_1(cell, &old) … listener_n(cell, &old)
//! ```
//!
//! [`PropertyMap`] gives name-based, type-checked access to a set of cells.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use smallvec::SmallVec;

use crate::error::{CoreError, Result};

static NEXT_PROPERTY_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_LISTENER_ID: AtomicU64 = AtomicU64::new(1);

/// Stable identity of a property cell
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId(u64);

/// Handle returned by [`Property::attach`], used to detach the listener
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Change listener: receives the cell and the value it held before the change
pub type Listener<T> = Arc<dyn Fn(&Property<T>, &T) + Send + Sync>;

/// Values a property can hold
pub trait PropertyValue: Clone + PartialEq + Send + Sync + 'static {}

impl<T: Clone + PartialEq + Send + Sync + 'static> PropertyValue for T {}

/// Equality used for change detection. Scalar floats treat NaN as equal to
/// NaN; every other type compares with its own `PartialEq`.
fn unchanged<T: PartialEq + 'static>(old: &T, new: &T) -> bool {
    if old == new {
        return true;
    }
    let (old, new): (&dyn Any, &dyn Any) = (old, new);
    if let (Some(a), Some(b)) = (old.downcast_ref::<f32>(), new.downcast_ref::<f32>()) {
        return a.is_nan() && b.is_nan();
    }
    if let (Some(a), Some(b)) = (old.downcast_ref::<f64>(), new.downcast_ref::<f64>()) {
        return a.is_nan() && b.is_nan();
    }
    false
}

struct PropertyInner<T> {
    id: PropertyId,
    name: String,
    default: T,
    value: Mutex<T>,
    listeners: Mutex<SmallVec<[(ListenerId, Listener<T>); 2]>>,
}

/// Observable value cell
///
/// Cloning a `Property` clones the handle; both handles refer to the same cell.
pub struct Property<T> {
    inner: Arc<PropertyInner<T>>,
}

impl<T> Clone for Property<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: PropertyValue + fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Property")
            .field("name", &self.inner.name)
            .field("value", &*self.inner.value.lock())
            .finish()
    }
}

impl<T: PropertyValue> Property<T> {
    /// Create a cell holding `default`
    pub fn new(name: impl Into<String>, default: T) -> Self {
        Self {
            inner: Arc::new(PropertyInner {
                id: PropertyId(NEXT_PROPERTY_ID.fetch_add(1, Ordering::Relaxed)),
                name: name.into(),
                value: Mutex::new(default.clone()),
                default,
                listeners: Mutex::new(SmallVec::new()),
            }),
        }
    }

    pub fn id(&self) -> PropertyId {
        self.inner.id
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Current value
    pub fn get(&self) -> T {
        self.inner.value.lock().clone()
    }

    /// Borrow the current value without cloning
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.lock())
    }

    pub fn default_value(&self) -> &T {
        &self.inner.default
    }

    pub fn is_default(&self) -> bool {
        unchanged(&*self.inner.value.lock(), &self.inner.default)
    }

    /// Store `value`, notifying listeners if it differs from the current value.
    ///
    /// Returns whether the value changed.
    pub fn set(&self, value: T) -> bool {
        let previous = {
            let mut current = self.inner.value.lock();
            if unchanged(&*current, &value) {
                return false;
            }
            std::mem::replace(&mut *current, value)
        };
        self.notify(&previous);
        true
    }

    /// Restore the default value
    pub fn reset(&self) -> bool {
        self.set(self.inner.default.clone())
    }

    fn notify(&self, previous: &T) {
        let listeners: SmallVec<[Listener<T>; 4]> = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();
        for listener in listeners {
            listener(self, previous);
        }
    }

    /// Register a change listener. Listeners run in attach order.
    pub fn attach<F>(&self, listener: F) -> ListenerId
    where
        F: Fn(&Property<T>, &T) + Send + Sync + 'static,
    {
        self.attach_shared(Arc::new(listener))
    }

    /// Register an already shared listener
    pub fn attach_shared(&self, listener: Listener<T>) -> ListenerId {
        let id = ListenerId(NEXT_LISTENER_ID.fetch_add(1, Ordering::Relaxed));
        self.inner.listeners.lock().push((id, listener));
        id
    }

    /// Remove a listener. Unknown ids are ignored.
    pub fn detach(&self, id: ListenerId) -> bool {
        let mut listeners = self.inner.listeners.lock();
        match listeners.iter().position(|(lid, _)| *lid == id) {
            Some(index) => {
                listeners.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn clear_listeners(&self) {
        self.inner.listeners.lock().clear();
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    /// Whether both handles refer to the same cell
    pub fn ptr_eq(&self, other: &Property<T>) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Type-erased access
// ─────────────────────────────────────────────────────────────────────────────

/// Object-safe view of a [`Property`] of any value type
pub trait AnyProperty: Send + Sync {
    fn id(&self) -> PropertyId;

    fn name(&self) -> &str;

    /// Name of the stored value type
    fn value_type(&self) -> &'static str;

    fn as_any(&self) -> &dyn Any;

    /// Clone the current value into a box
    fn get_boxed(&self) -> Box<dyn Any + Send>;

    /// Set from a boxed value, failing if the type does not match
    fn set_boxed(&self, value: Box<dyn Any + Send>) -> Result<bool>;

    /// Copy the value of `source`, which must hold the same type
    fn copy_value_from(&self, source: &dyn AnyProperty) -> Result<bool>;

    fn is_default(&self) -> bool;

    /// Attach a listener that only needs to know the value changed
    fn attach_notify(&self, listener: Arc<dyn Fn() + Send + Sync>) -> ListenerId;

    fn detach(&self, id: ListenerId) -> bool;

    fn listener_count(&self) -> usize;
}

impl<T: PropertyValue> AnyProperty for Property<T> {
    fn id(&self) -> PropertyId {
        Property::id(self)
    }

    fn name(&self) -> &str {
        Property::name(self)
    }

    fn value_type(&self) -> &'static str {
        type_name::<T>()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn get_boxed(&self) -> Box<dyn Any + Send> {
        Box::new(self.get())
    }

    fn set_boxed(&self, value: Box<dyn Any + Send>) -> Result<bool> {
        match value.downcast::<T>() {
            Ok(value) => Ok(self.set(*value)),
            Err(_) => Err(CoreError::TypeMismatch {
                name: self.name().to_string(),
                expected: type_name::<T>(),
                found: "<foreign value>",
            }),
        }
    }

    fn copy_value_from(&self, source: &dyn AnyProperty) -> Result<bool> {
        match source.as_any().downcast_ref::<Property<T>>() {
            Some(source) => Ok(self.set(source.get())),
            None => Err(CoreError::TypeMismatch {
                name: self.name().to_string(),
                expected: type_name::<T>(),
                found: source.value_type(),
            }),
        }
    }

    fn is_default(&self) -> bool {
        Property::is_default(self)
    }

    fn attach_notify(&self, listener: Arc<dyn Fn() + Send + Sync>) -> ListenerId {
        self.attach(move |_, _| listener())
    }

    fn detach(&self, id: ListenerId) -> bool {
        Property::detach(self, id)
    }

    fn listener_count(&self) -> usize {
        Property::listener_count(self)
    }
}

/// Name-indexed collection of property cells, kept in registration order
#[derive(Default)]
pub struct PropertyMap {
    entries: Vec<Box<dyn AnyProperty>>,
    index: FxHashMap<String, usize>,
}

impl PropertyMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a cell under its own name. A cell with the same name is
    /// replaced.
    pub fn register<T: PropertyValue>(&mut self, property: &Property<T>) {
        let name = property.name().to_string();
        let entry: Box<dyn AnyProperty> = Box::new(property.clone());
        match self.index.get(&name) {
            Some(&slot) => self.entries[slot] = entry,
            None => {
                self.index.insert(name, self.entries.len());
                self.entries.push(entry);
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Type-erased lookup
    pub fn get_any(&self, name: &str) -> Result<&dyn AnyProperty> {
        self.index
            .get(name)
            .map(|&slot| self.entries[slot].as_ref())
            .ok_or_else(|| CoreError::UnknownProperty(name.to_string()))
    }

    /// Typed lookup
    pub fn get<T: PropertyValue>(&self, name: &str) -> Result<Property<T>> {
        let any = self.get_any(name)?;
        any.as_any()
            .downcast_ref::<Property<T>>()
            .cloned()
            .ok_or_else(|| CoreError::TypeMismatch {
                name: name.to_string(),
                expected: type_name::<T>(),
                found: any.value_type(),
            })
    }

    /// Set a value by name
    pub fn set<T: PropertyValue>(&self, name: &str, value: T) -> Result<bool> {
        Ok(self.get::<T>(name)?.set(value))
    }

    /// Set from a boxed value by name, checking the type dynamically
    pub fn set_value(&self, name: &str, value: Box<dyn Any + Send>) -> Result<bool> {
        self.get_any(name)?.set_boxed(value)
    }

    /// Cells in registration order
    pub fn iter(&self) -> impl Iterator<Item = &dyn AnyProperty> {
        self.entries.iter().map(|entry| entry.as_ref())
    }

    /// Copy every value from `source` for names present in both maps.
    ///
    /// Returns the number of cells whose value changed.
    pub fn copy_values_from(&self, source: &PropertyMap) -> Result<usize> {
        let mut changed = 0;
        for target in self.iter() {
            if let Ok(from) = source.get_any(target.name()) {
                if target.copy_value_from(from)? {
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{Rect, Size};
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_set_notifies_only_on_change() {
        let prop = Property::new("Opacity", 1.0f32);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        prop.attach(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        for _ in 0..10 {
            prop.set(1.0);
        }
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        assert!(prop.set(0.5));
        assert!(!prop.set(0.5));
        assert!(prop.set(1.0));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_nan_is_not_a_change() {
        let width = Property::new("Width", f32::NAN);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        width.attach(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(!width.set(f32::NAN));
        assert!(width.set(10.0));
        assert!(width.set(f32::NAN));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(width.is_default());
    }

    #[test]
    fn test_composite_with_nan_component_stores_new_value() {
        let available = Property::new("Available", Size::new(f32::NAN, 5.0));
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        available.attach(move |_, previous| {
            assert_eq!(previous.height, 5.0);
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert!(available.set(Size::new(f32::NAN, 10.0)));
        assert_eq!(available.get().height, 10.0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let bounds = Property::new("Bounds", Some(Rect::new(f32::NAN, 0.0, 1.0, 1.0)));
        assert!(bounds.set(Some(Rect::new(f32::NAN, 0.0, 2.0, 1.0))));
        assert_eq!(bounds.get().map(|r| r.width()), Some(2.0));
    }

    #[test]
    fn test_f64_nan_is_not_a_change() {
        let scale = Property::new("Scale", f64::NAN);
        assert!(!scale.set(f64::NAN));
        assert!(scale.is_default());
    }

    #[test]
    fn test_listeners_run_in_attach_order_with_previous_value() {
        let prop = Property::new("Name", String::from("a"));
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let log = log.clone();
            prop.attach(move |cell, old| {
                log.lock().push(format!("{tag}:{old}->{}", cell.get()));
            });
        }

        prop.set("b".to_string());
        assert_eq!(
            *log.lock(),
            vec!["first:a->b", "second:a->b", "third:a->b"]
        );
    }

    #[test]
    fn test_detach() {
        let prop = Property::new("Value", 0i32);
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let id = prop.attach(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        prop.set(1);
        assert!(prop.detach(id));
        assert!(!prop.detach(id));
        prop.set(2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(prop.listener_count(), 0);
    }

    #[test]
    fn test_reentrant_set_from_listener() {
        let a = Property::new("A", 0i32);
        let b = Property::new("B", 0i32);

        let b_handle = b.clone();
        a.attach(move |cell, _| {
            b_handle.set(cell.get() * 2);
        });
        // Clamps itself on overflow
        a.attach(|cell, _| {
            if cell.get() > 100 {
                cell.set(100);
            }
        });

        a.set(7);
        assert_eq!(b.get(), 14);

        a.set(500);
        assert_eq!(a.get(), 100);
        assert_eq!(b.get(), 200);
    }

    #[test]
    fn test_listener_may_attach_during_notification() {
        let prop = Property::new("P", 0u8);
        let late_calls = Arc::new(AtomicUsize::new(0));
        let late = late_calls.clone();
        prop.attach(move |cell, _| {
            let late = late.clone();
            cell.attach(move |_, _| {
                late.fetch_add(1, Ordering::SeqCst);
            });
        });

        prop.set(1);
        // Listener added mid-dispatch only sees later changes
        assert_eq!(late_calls.load(Ordering::SeqCst), 0);
        prop.set(2);
        assert_eq!(late_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_property_map_typed_access() {
        let width = Property::new("Width", 10.0f32);
        let name = Property::new("Name", String::new());
        let mut map = PropertyMap::new();
        map.register(&width);
        map.register(&name);

        assert_eq!(map.len(), 2);
        let handle = map.get::<f32>("Width").unwrap();
        assert!(handle.ptr_eq(&width));
        assert!(map.set("Width", 20.0f32).unwrap());
        assert_eq!(width.get(), 20.0);

        let err = map.get::<i32>("Width").unwrap_err();
        assert!(matches!(err, CoreError::TypeMismatch { .. }));
        assert_eq!(
            map.get::<f32>("Height").unwrap_err(),
            CoreError::UnknownProperty("Height".into())
        );

        let err = map
            .get_any("Name")
            .unwrap()
            .set_boxed(Box::new(5u32))
            .unwrap_err();
        assert!(matches!(err, CoreError::TypeMismatch { .. }));
    }

    #[test]
    fn test_copy_values_between_maps() {
        let mut source = PropertyMap::new();
        let mut target = PropertyMap::new();
        let src_width = Property::new("Width", 0.0f32);
        let src_name = Property::new("Name", String::from("button"));
        let dst_width = Property::new("Width", 0.0f32);
        let dst_name = Property::new("Name", String::new());
        source.register(&src_width);
        source.register(&src_name);
        target.register(&dst_width);
        target.register(&dst_name);

        src_width.set(42.0);
        assert_eq!(target.copy_values_from(&source).unwrap(), 2);
        assert_eq!(dst_width.get(), 42.0);
        assert_eq!(dst_name.get(), "button");

        dst_width.set(1.0);
        assert_eq!(src_width.get(), 42.0);
    }
}
