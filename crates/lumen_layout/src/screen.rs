//! Screens
//!
//! A [`Screen`] owns a root element, a graphics device and the asset cache
//! for everything drawn on it. Elements reach these through the shared
//! [`ScreenContext`] they receive when attached.
//!
//! # Frame
//!
//! 1. bind the render thread and apply deferred property writes
//! 2. advance scroll animations
//! 3. measure and arrange the root at the screen size
//! 4. begin a cache frame and render the tree
//! 5. release assets of elements disposed during the frame
//! 6. sweep idle assets if the sweep interval has elapsed

use std::sync::Arc;
use std::time::{Duration, Instant};

use lumen_core::{PendingValues, Size};
use lumen_gpu::{CacheConfig, GraphicsDevice, VisualAssetCache};
use parking_lot::Mutex;

use crate::element::{Element, ElementId, ElementState};
use crate::error::{LayoutError, Result};
use crate::render::{FrameContext, FrameStats, RenderContext};

/// Screen tuning
#[derive(Clone, Debug, PartialEq)]
pub struct ScreenConfig {
    pub size: Size,
    pub cache: CacheConfig,
    /// Duration of animated scrolls
    pub scroll_duration: Duration,
}

impl Default for ScreenConfig {
    fn default() -> Self {
        Self {
            size: Size::new(1280.0, 720.0),
            cache: CacheConfig::default(),
            scroll_duration: Duration::from_millis(150),
        }
    }
}

/// State shared between a screen and its elements
pub struct ScreenContext {
    device: Arc<dyn GraphicsDevice>,
    cache: Mutex<VisualAssetCache>,
    pending: PendingValues,
    deferred_releases: Mutex<Vec<ElementId>>,
    size: Mutex<Size>,
    config: ScreenConfig,
}

impl ScreenContext {
    pub fn new(device: Arc<dyn GraphicsDevice>, config: ScreenConfig) -> Arc<Self> {
        Arc::new(Self {
            device,
            cache: Mutex::new(VisualAssetCache::new(config.cache.clone())),
            pending: PendingValues::new(),
            deferred_releases: Mutex::new(Vec::new()),
            size: Mutex::new(config.size),
            config,
        })
    }

    pub fn device(&self) -> &Arc<dyn GraphicsDevice> {
        &self.device
    }

    pub fn pending(&self) -> &PendingValues {
        &self.pending
    }

    pub fn config(&self) -> &ScreenConfig {
        &self.config
    }

    pub fn size(&self) -> Size {
        *self.size.lock()
    }

    /// Free every asset owned by `owner`. While a frame holds the cache the
    /// release is queued and performed when the frame ends.
    pub fn release_assets(&self, owner: ElementId) {
        match self.cache.try_lock() {
            Some(mut cache) => {
                let freed = cache.release_owner(&*self.device, owner.get());
                if freed > 0 {
                    tracing::debug!("released {} assets of element {}", freed, owner);
                }
            }
            None => self.deferred_releases.lock().push(owner),
        }
    }

    fn flush_deferred_releases(&self, cache: &mut VisualAssetCache) -> usize {
        let owners = std::mem::take(&mut *self.deferred_releases.lock());
        owners
            .into_iter()
            .map(|owner| cache.release_owner(&*self.device, owner.get()))
            .sum()
    }

    /// Run `f` with the asset cache locked
    pub fn with_cache<R>(&self, f: impl FnOnce(&mut VisualAssetCache) -> R) -> R {
        f(&mut self.cache.lock())
    }

    /// Allocated assets in this screen's cache
    pub fn live_assets(&self) -> usize {
        self.cache.lock().live_assets()
    }
}

pub struct Screen {
    name: String,
    context: Arc<ScreenContext>,
    root: Option<Element>,
    frames: u64,
}

impl Screen {
    pub fn new(
        name: impl Into<String>,
        device: Arc<dyn GraphicsDevice>,
        config: ScreenConfig,
    ) -> Self {
        Self {
            name: name.into(),
            context: ScreenContext::new(device, config),
            root: None,
            frames: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn context(&self) -> &Arc<ScreenContext> {
        &self.context
    }

    pub fn root(&self) -> Option<&Element> {
        self.root.as_ref()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Install `root`, disposing the previous root
    pub fn set_root(&mut self, root: Element) -> Result<()> {
        if root.is_disposed() {
            return Err(LayoutError::Disposed(root.id()));
        }
        if root.parent().is_some() {
            return Err(LayoutError::AlreadyParented(root.id()));
        }
        if let Some(previous) = self.root.take() {
            if !previous.ptr_eq(&root) {
                previous.dispose();
            }
        }
        root.set_context(Some(self.context.clone()), ElementState::Running);
        root.invalidate_layout();
        tracing::debug!("screen '{}' root set to {}", self.name, root);
        self.root = Some(root);
        Ok(())
    }

    pub fn resize(&mut self, size: Size) {
        *self.context.size.lock() = size;
        if let Some(root) = &self.root {
            root.invalidate_layout();
        }
    }

    /// Lay out and render one frame
    pub fn render_frame(&mut self, now: Instant) -> Result<FrameStats> {
        let context = self.context.clone();
        context.pending.bind_render_thread();
        let applied = context.pending.apply_pending();

        let Some(root) = self.root.clone() else {
            return Ok(FrameStats {
                pending_applied: applied,
                ..FrameStats::default()
            });
        };

        root.advance_animations(now);
        let size = context.size();
        root.measure(size);
        root.arrange(size.to_rect());

        let mut cache = context.cache.lock();
        let frame_number = cache.begin_frame();

        let mut frame = FrameContext::new(&*context.device, &mut cache, now);
        let mut root_ctx = RenderContext::root(size);
        let rendered = root.render(&mut frame, &mut root_ctx);
        let mut stats = frame.stats();

        let released = context.flush_deferred_releases(&mut cache);
        stats.pending_applied = applied;
        stats.assets_swept = cache.maybe_sweep(&*context.device, now);
        stats.live_assets = cache.live_assets();
        drop(cache);

        self.frames += 1;
        tracing::trace!(
            "screen '{}' frame {}: {} drawn, {} draws, {} deferred releases",
            self.name,
            frame_number,
            stats.elements_rendered,
            stats.draw_calls,
            released
        );
        rendered.map(|()| stats)
    }

    /// Dispose the root and free every asset
    pub fn close(&mut self) {
        if let Some(root) = self.root.take() {
            root.dispose();
        }
        let freed = {
            let mut cache = self.context.cache.lock();
            self.context.flush_deferred_releases(&mut cache);
            cache.free_all(&*self.context.device)
        };
        self.context.pending.unbind_render_thread();
        tracing::info!("screen '{}' closed, freed {} assets", self.name, freed);
    }
}

impl Drop for Screen {
    fn drop(&mut self) {
        if self.root.is_some() {
            self.close();
        }
    }
}
