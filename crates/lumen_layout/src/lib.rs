//! Lumen Layout
//!
//! The element tree of a retained-mode UI: elements with reactive property
//! cells, two-pass measure/arrange layout and a render traversal that draws
//! through cached GPU assets.
//!
//! # Modules
//!
//! - [`element`]: element handles, tree queries, disposal and deep copy
//! - [`collection`]: ordered child lists with change notification
//! - [`layout`]: measure, arrange and invalidation
//! - [`render`]: render contexts and the draw traversal
//! - [`screen`]: the frame loop tying a root element to a device
//! - kinds: [`panels`], [`decorator`], [`aspect_ratio`], [`shape`],
//!   [`capture`], [`scroll`]
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use std::time::Instant;
//! use lumen_core::{Color, Size};
//! use lumen_gpu::HeadlessDevice;
//! use lumen_layout::{Element, ElementKind, Screen, ScreenConfig};
//!
//! let device = Arc::new(HeadlessDevice::new(320, 240));
//! let config = ScreenConfig { size: Size::new(320.0, 240.0), ..ScreenConfig::default() };
//! let mut screen = Screen::new("main", device, config);
//!
//! let root = Element::new(ElementKind::canvas())
//!     .with_child(Element::new(ElementKind::rectangle(Color::WHITE)).with_size(100.0, 50.0))
//!     .unwrap();
//! screen.set_root(root).unwrap();
//!
//! let stats = screen.render_frame(Instant::now()).unwrap();
//! assert_eq!(stats.draw_calls, 1);
//! ```

pub mod aspect_ratio;
pub mod capture;
pub mod collection;
pub mod decorator;
pub mod effect;
pub mod element;
pub mod error;
pub mod kind;
pub mod layout;
pub mod panels;
pub mod properties;
pub mod render;
pub mod screen;
pub mod scroll;
pub mod shape;

pub use aspect_ratio::{fit_aspect, AspectRatioBox};
pub use capture::BackgroundCapture;
pub use collection::{ChangeHandlerId, ElementCollection};
pub use decorator::Decorator;
pub use effect::{Effect, EffectContext, TintEffect};
pub use element::{Element, ElementId, ElementState};
pub use error::{LayoutError, Result};
pub use kind::{ElementBehavior, ElementKind, Layoutable, Renderable};
pub use layout::{align_axis, align_rect};
pub use panels::{Canvas, Orientation, StackPanel};
pub use properties::{names, Alignment, ElementProperties, Visibility};
pub use render::{FrameContext, FrameStats, RenderContext, Z_STEP};
pub use screen::{Screen, ScreenConfig, ScreenContext};
pub use scroll::ScrollPresenter;
pub use shape::RectangleShape;
