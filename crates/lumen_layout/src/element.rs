//! Elements
//!
//! An [`Element`] is a shared handle to a node in the scene tree. A node owns
//! its children through its [`ElementCollection`] and refers to its parent
//! through a weak link, so dropping the root handle frees the whole tree.
//!
//! # Lifecycle
//!
//! ```text
//!   new ──► Available ──(added under a running screen)──► Running
//!                │                                          │
//!                └──────────────── dispose() ───────────────┘
//!                                    │
//!                         Disposing: listeners detached,
//!                         assets released, children disposed,
//!                         parent link cleared
//!                                    │
//!                                 Disposed
//! ```
//!
//! Size-affecting property cells carry a listener that invalidates layout;
//! those listeners are detached while a deep copy writes the cells of a fresh
//! element and reattached afterwards.

use std::collections::VecDeque;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use lumen_core::{
    CopyManager, ListenerId, Matrix, Point, Property, PropertyMap, PropertyValue, Rect,
};
use parking_lot::Mutex;
use smallvec::SmallVec;

use crate::collection::ElementCollection;
use crate::kind::ElementKind;
use crate::layout::LayoutState;
use crate::properties::{names, Alignment, ElementProperties, LAYOUT_AFFECTING};
use crate::screen::ScreenContext;

static NEXT_ELEMENT_ID: AtomicU64 = AtomicU64::new(1);

/// Unique identity of an element for the lifetime of the process
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(u64);

impl ElementId {
    fn next() -> Self {
        ElementId(NEXT_ELEMENT_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ElementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Where an element is in its lifecycle
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ElementState {
    /// Constructed, not attached to a running screen
    #[default]
    Available,
    /// Part of a screen that is rendering
    Running,
    Disposing,
    Disposed,
}

#[derive(Default)]
struct ElementContext {
    screen: Option<Arc<ScreenContext>>,
    state: ElementState,
}

/// Per-frame render results kept for hit-testing
#[derive(Clone, Debug)]
pub(crate) struct RenderState {
    pub inverse_transform: Option<Matrix>,
    pub transform: Matrix,
    pub occupied_bounds: Rect,
}

impl Default for RenderState {
    fn default() -> Self {
        Self {
            inverse_transform: None,
            transform: Matrix::IDENTITY,
            occupied_bounds: Rect::ZERO,
        }
    }
}

/// Storage behind an [`Element`] handle
pub struct ElementNode {
    id: ElementId,
    kind: ElementKind,
    props: ElementProperties,
    property_map: PropertyMap,
    pub(crate) layout: Mutex<LayoutState>,
    pub(crate) render: Mutex<RenderState>,
    children: ElementCollection,
    parent: Mutex<Weak<ElementNode>>,
    context: Mutex<ElementContext>,
    listeners: Mutex<SmallVec<[(&'static str, ListenerId); 12]>>,
}

/// Shared handle to a scene tree node
#[derive(Clone)]
pub struct Element(pub(crate) Arc<ElementNode>);

impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Element {}

impl Hash for Element {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("id", &self.0.id)
            .field("kind", &self.0.kind.name())
            .field("name", &self.name())
            .finish()
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = self.name();
        if name.is_empty() {
            write!(f, "{}{}", self.0.kind.name(), self.0.id)
        } else {
            write!(f, "{}{} '{}'", self.0.kind.name(), self.0.id, name)
        }
    }
}

impl Element {
    /// Create an element of the given kind with default properties
    pub fn new(kind: ElementKind) -> Self {
        let id = ElementId::next();
        let node = Arc::new_cyclic(|weak: &Weak<ElementNode>| {
            let props = ElementProperties::new();
            let mut property_map = PropertyMap::new();
            props.register(&mut property_map);
            kind.register(&mut property_map);
            ElementNode {
                id,
                kind,
                props,
                property_map,
                layout: Mutex::new(LayoutState::default()),
                render: Mutex::new(RenderState::default()),
                children: ElementCollection::new(weak.clone(), id),
                parent: Mutex::new(Weak::new()),
                context: Mutex::new(ElementContext::default()),
                listeners: Mutex::new(SmallVec::new()),
            }
        });
        let element = Element(node);
        element.attach_listeners();
        element
    }

    pub fn id(&self) -> ElementId {
        self.0.id
    }

    pub fn kind(&self) -> &ElementKind {
        &self.0.kind
    }

    pub fn props(&self) -> &ElementProperties {
        &self.0.props
    }

    /// Every cell by name, including those of the element kind
    pub fn property_map(&self) -> &PropertyMap {
        &self.0.property_map
    }

    pub fn name(&self) -> String {
        self.0.props.name.get()
    }

    pub fn ptr_eq(&self, other: &Element) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    // =========================================================================
    // Builders
    // =========================================================================

    pub fn with_name(self, name: impl Into<String>) -> Self {
        self.0.props.name.set(name.into());
        self
    }

    pub fn with_size(self, width: f32, height: f32) -> Self {
        self.0.props.width.set(width);
        self.0.props.height.set(height);
        self
    }

    pub fn with_margin(self, margin: lumen_core::Thickness) -> Self {
        self.0.props.margin.set(margin);
        self
    }

    pub fn with_alignment(self, horizontal: Alignment, vertical: Alignment) -> Self {
        self.0.props.horizontal_alignment.set(horizontal);
        self.0.props.vertical_alignment.set(vertical);
        self
    }

    pub fn with_child(self, child: Element) -> crate::Result<Self> {
        self.0.children.add(child)?;
        Ok(self)
    }

    // =========================================================================
    // Tree
    // =========================================================================

    pub fn children(&self) -> &ElementCollection {
        &self.0.children
    }

    /// Append a child; see [`ElementCollection::add`]
    pub fn add_child(&self, child: Element) -> crate::Result<()> {
        self.0.children.add(child)
    }

    pub fn parent(&self) -> Option<Element> {
        self.0.parent.lock().upgrade().map(Element)
    }

    pub(crate) fn set_parent(&self, parent: Option<&Element>) {
        *self.0.parent.lock() = match parent {
            Some(parent) => Arc::downgrade(&parent.0),
            None => Weak::new(),
        };
    }

    /// Link to `parent` unless already parented. The check and the link
    /// happen under one lock, so only one of several racing owners wins.
    pub(crate) fn claim_parent(&self, parent: &Element) -> bool {
        let mut link = self.0.parent.lock();
        if link.strong_count() > 0 {
            return false;
        }
        *link = Arc::downgrade(&parent.0);
        true
    }

    /// Topmost ancestor, or self
    pub fn root(&self) -> Element {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// Nearest ancestor matching `predicate`
    pub fn find_ancestor(&self, predicate: impl Fn(&Element) -> bool) -> Option<Element> {
        let mut current = self.parent();
        while let Some(element) = current {
            if predicate(&element) {
                return Some(element);
            }
            current = element.parent();
        }
        None
    }

    pub fn is_ancestor_of(&self, other: &Element) -> bool {
        other.find_ancestor(|a| a.ptr_eq(self)).is_some()
    }

    /// Whether this element is `root` or lies beneath it
    pub fn is_in_visual_path(&self, root: &Element) -> bool {
        self.ptr_eq(root) || root.is_ancestor_of(self)
    }

    /// Breadth-first search of this subtree, starting with self
    pub fn find_element(&self, predicate: impl Fn(&Element) -> bool) -> Option<Element> {
        let mut queue = VecDeque::from([self.clone()]);
        while let Some(element) = queue.pop_front() {
            if predicate(&element) {
                return Some(element);
            }
            queue.extend(element.children().snapshot());
        }
        None
    }

    pub fn find_element_by_name(&self, name: &str) -> Option<Element> {
        self.find_element(|e| e.0.props.name.with(|n| n == name))
    }

    /// This element and all descendants, depth-first pre-order
    pub fn descendants(&self) -> Vec<Element> {
        let mut out = Vec::new();
        let mut stack = vec![self.clone()];
        while let Some(element) = stack.pop() {
            let children = element.children().snapshot();
            stack.extend(children.into_iter().rev());
            out.push(element);
        }
        out
    }

    // =========================================================================
    // Screen context
    // =========================================================================

    pub fn state(&self) -> ElementState {
        self.0.context.lock().state
    }

    pub fn is_disposed(&self) -> bool {
        matches!(
            self.state(),
            ElementState::Disposing | ElementState::Disposed
        )
    }

    pub fn screen(&self) -> Option<Arc<ScreenContext>> {
        self.0.context.lock().screen.clone()
    }

    /// Propagate screen and state to this subtree
    pub(crate) fn set_context(&self, screen: Option<Arc<ScreenContext>>, state: ElementState) {
        {
            let mut context = self.0.context.lock();
            if matches!(
                context.state,
                ElementState::Disposing | ElementState::Disposed
            ) {
                return;
            }
            context.screen = screen.clone();
            context.state = state;
        }
        for child in self.0.children.snapshot() {
            child.set_context(screen.clone(), state);
        }
    }

    /// Set a cell from any thread. While the element runs on a screen, writes
    /// from threads other than the render thread are deferred to the start of
    /// the next frame. Returns true if the write was deferred.
    pub fn set_in_render_thread<T: PropertyValue>(&self, property: &Property<T>, value: T) -> bool {
        let screen = {
            let context = self.0.context.lock();
            match context.state {
                ElementState::Running => context.screen.clone(),
                _ => None,
            }
        };
        match screen {
            Some(screen) => screen.pending().set(property, value),
            None => {
                property.set(value);
                false
            }
        }
    }

    /// Value a deferred write will apply, or the current value
    pub fn get_pending_or_current<T: PropertyValue>(&self, property: &Property<T>) -> T {
        match self.screen() {
            Some(screen) => screen.pending().get_pending_or_current(property),
            None => property.get(),
        }
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    /// Attach the layout invalidation listeners. No-op if already attached.
    pub fn attach_listeners(&self) {
        let mut listeners = self.0.listeners.lock();
        if !listeners.is_empty() {
            return;
        }
        let weak = Arc::downgrade(&self.0);

        let measure = LAYOUT_AFFECTING
            .iter()
            .chain(self.0.kind.measure_properties());
        for &name in measure {
            if let Ok(property) = self.0.property_map.get_any(name) {
                let weak = weak.clone();
                let id = property.attach_notify(Arc::new(move || {
                    if let Some(node) = weak.upgrade() {
                        Element(node).invalidate_layout();
                    }
                }));
                listeners.push((name, id));
            }
        }

        for &name in self.0.kind.arrange_properties() {
            if let Ok(property) = self.0.property_map.get_any(name) {
                let weak = weak.clone();
                let id = property.attach_notify(Arc::new(move || {
                    if let Some(node) = weak.upgrade() {
                        Element(node).invalidate_arrange();
                    }
                }));
                listeners.push((name, id));
            }
        }
    }

    /// Detach the listeners added by [`attach_listeners`](Self::attach_listeners)
    pub fn detach_listeners(&self) {
        let attached = std::mem::take(&mut *self.0.listeners.lock());
        for (name, id) in attached {
            if let Ok(property) = self.0.property_map.get_any(name) {
                property.detach(id);
            }
        }
    }

    pub fn has_listeners(&self) -> bool {
        !self.0.listeners.lock().is_empty()
    }

    // =========================================================================
    // Hit testing
    // =========================================================================

    /// Inverse of the transform used by the last render, if invertible
    pub fn inverse_transform(&self) -> Option<Matrix> {
        self.0.render.lock().inverse_transform
    }

    /// Bounds covered by this subtree during the last render, in screen space
    pub fn occupied_bounds(&self) -> Rect {
        self.0.render.lock().occupied_bounds
    }

    /// Whether a screen-space point falls inside this element as last
    /// rendered. Ancestors that clip hit testing (scroll viewports) must
    /// contain the point too.
    pub fn is_in_area(&self, point: Point) -> bool {
        self.contains_rendered(point)
            && self
                .find_ancestor(|a| a.kind().clips_hit_testing() && !a.contains_rendered(point))
                .is_none()
    }

    fn contains_rendered(&self, point: Point) -> bool {
        match self.inverse_transform() {
            Some(inverse) => self
                .0
                .props
                .actual_bounds()
                .contains(inverse.transform_point(point)),
            None => false,
        }
    }

    // =========================================================================
    // Disposal
    // =========================================================================

    /// Tear down this subtree: detach listeners, release GPU assets, dispose
    /// children and clear the parent link. Idempotent.
    pub fn dispose(&self) {
        let screen = {
            let mut context = self.0.context.lock();
            if matches!(
                context.state,
                ElementState::Disposing | ElementState::Disposed
            ) {
                return;
            }
            context.state = ElementState::Disposing;
            context.screen.take()
        };

        self.detach_listeners();
        if let Some(screen) = &screen {
            screen.release_assets(self.0.id);
        }
        self.0.kind.on_dispose();
        self.0.children.dispose();
        self.set_parent(None);

        self.0.context.lock().state = ElementState::Disposed;
        tracing::trace!("disposed {}", self);
    }

    // =========================================================================
    // Deep copy
    // =========================================================================

    /// Deep-copy this subtree into a fresh, unparented element
    pub fn deep_copy(&self) -> Element {
        let mut copies = CopyManager::new();
        let copy = self.deep_copy_with(&mut copies);
        copies.finish();
        copy
    }

    /// Deep-copy as part of a larger copy operation, preserving shared
    /// references across everything copied through `copies`
    pub fn deep_copy_with(&self, copies: &mut CopyManager) -> Element {
        if let Some(existing) = copies.lookup(&self.0) {
            return Element(existing);
        }

        let copy = Element::new(self.0.kind.copy_kind());
        copies.register(&self.0, &copy.0);
        copy.detach_listeners();

        for source in self.0.property_map.iter() {
            if matches!(
                source.name(),
                names::NAME | names::LAYOUT_TRANSFORM | names::RENDER_TRANSFORM
            ) {
                continue;
            }
            let copied = copy
                .0
                .property_map
                .get_any(source.name())
                .and_then(|target| target.copy_value_from(source));
            if let Err(err) = copied {
                tracing::warn!("deep copy of {} skipped a property: {}", self, err);
            }
        }

        let props = &copy.0.props;
        props
            .layout_transform
            .set(copies.get_copy_opt(&self.0.props.layout_transform.get()));
        props
            .render_transform
            .set(copies.get_copy_opt(&self.0.props.render_transform.get()));

        for child in self.0.children.snapshot() {
            let child_copy = child.deep_copy_with(copies);
            if let Err(err) = copy.0.children.add(child_copy) {
                tracing::warn!("deep copy of {} dropped a child: {}", self, err);
            }
        }

        copy.attach_listeners();

        let name = self.name();
        let target = copy.clone();
        copies.on_completed(move || {
            target.0.props.name.set(name);
        });

        copy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kind::ElementKind;
    use lumen_core::{Thickness, Transform};
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_ids_are_unique() {
        let a = Element::new(ElementKind::canvas());
        let b = Element::new(ElementKind::canvas());
        assert_ne!(a.id(), b.id());
        assert_ne!(a, b);
        assert_eq!(a, a.clone());
    }

    #[test]
    fn test_tree_queries() {
        let leaf = Element::new(ElementKind::canvas()).with_name("leaf");
        let middle = Element::new(ElementKind::canvas())
            .with_name("middle")
            .with_child(leaf.clone())
            .unwrap();
        let root = Element::new(ElementKind::canvas())
            .with_name("root")
            .with_child(middle.clone())
            .unwrap();

        assert_eq!(leaf.parent(), Some(middle.clone()));
        assert_eq!(leaf.root(), root);
        assert!(root.is_ancestor_of(&leaf));
        assert!(!leaf.is_ancestor_of(&root));
        assert!(leaf.is_in_visual_path(&root));
        assert_eq!(root.find_element_by_name("leaf"), Some(leaf.clone()));
        assert_eq!(
            leaf.find_ancestor(|e| e.name() == "root"),
            Some(root.clone())
        );
        let names: Vec<String> = root.descendants().iter().map(Element::name).collect();
        assert_eq!(names, vec!["root", "middle", "leaf"]);
    }

    #[test]
    fn test_layout_listeners_detach_and_reattach() {
        let element = Element::new(ElementKind::canvas());
        assert!(element.has_listeners());
        element.measure(lumen_core::Size::new(100.0, 100.0));
        assert!(element.is_measure_valid());

        element.detach_listeners();
        element.props().width.set(10.0);
        assert!(element.is_measure_valid());

        element.attach_listeners();
        element.props().width.set(20.0);
        assert!(!element.is_measure_valid());
    }

    #[test]
    fn test_deep_copy_copies_properties() {
        let source = Element::new(ElementKind::canvas())
            .with_name("panel")
            .with_size(120.0, 40.0)
            .with_margin(Thickness::uniform(4.0));
        source.props().opacity.set(0.5);
        source
            .props()
            .render_transform
            .set(Some(Arc::new(Transform::rotate(30.0))));

        let copy = source.deep_copy();
        assert_ne!(copy.id(), source.id());
        assert_eq!(copy.name(), "panel");
        assert_eq!(copy.props().width.get(), 120.0);
        assert_eq!(copy.props().margin.get(), Thickness::uniform(4.0));
        assert_eq!(copy.props().opacity.get(), 0.5);
        assert_eq!(
            copy.props().render_transform.get(),
            source.props().render_transform.get()
        );
        assert!(copy.has_listeners());

        copy.props().opacity.set(1.0);
        assert_eq!(source.props().opacity.get(), 0.5);
    }

    #[test]
    fn test_deep_copy_preserves_shared_transforms() {
        let shared = Some(Arc::new(Transform::scale(2.0, 2.0)));
        let a = Element::new(ElementKind::canvas());
        let b = Element::new(ElementKind::canvas());
        a.props().layout_transform.set(shared.clone());
        b.props().layout_transform.set(shared.clone());
        let root = Element::new(ElementKind::canvas())
            .with_child(a)
            .unwrap()
            .with_child(b)
            .unwrap();

        let copy = root.deep_copy();
        let children = copy.children().snapshot();
        let first = children[0].props().layout_transform.get().unwrap();
        let second = children[1].props().layout_transform.get().unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, shared.as_ref().unwrap()));
        assert_eq!(children[0].parent(), Some(copy.clone()));
    }

    #[test]
    fn test_name_assigned_on_completion() {
        let source = Element::new(ElementKind::canvas()).with_name("late");
        let seen = Arc::new(AtomicUsize::new(0));

        let mut copies = CopyManager::new();
        let copy = source.deep_copy_with(&mut copies);
        assert_eq!(copy.name(), "");

        let counter = seen.clone();
        copy.props().name.attach(move |_, _| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        copies.finish();
        assert_eq!(copy.name(), "late");
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_dispose_is_idempotent_and_recursive() {
        let child = Element::new(ElementKind::canvas());
        let parent = Element::new(ElementKind::canvas())
            .with_child(child.clone())
            .unwrap();

        parent.dispose();
        assert_eq!(parent.state(), ElementState::Disposed);
        assert_eq!(child.state(), ElementState::Disposed);
        assert!(child.parent().is_none());
        assert!(!parent.has_listeners());
        parent.dispose();
        assert_eq!(parent.state(), ElementState::Disposed);
    }

    #[test]
    fn test_set_in_render_thread_without_screen_is_direct() {
        let element = Element::new(ElementKind::canvas());
        let opacity = element.props().opacity.clone();
        assert!(!element.set_in_render_thread(&opacity, 0.25));
        assert_eq!(opacity.get(), 0.25);
        assert_eq!(element.get_pending_or_current(&opacity), 0.25);
    }
}
