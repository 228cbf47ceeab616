//! Headless application
//!
//! Drives a [`Screen`] on a [`HeadlessDevice`] at a fixed simulated frame
//! rate. Frame timestamps advance by [`FRAME_INTERVAL`] from the start
//! instant, so cache sweeps and scroll animations progress exactly as they
//! would on a 60 Hz display regardless of how fast frames actually render.

use std::sync::Arc;
use std::time::{Duration, Instant};

use lumen_core::{Color, Point, Thickness};
use lumen_gpu::HeadlessDevice;
use lumen_layout::{
    Alignment, Effect, Element, ElementKind, FrameStats, LayoutError, Orientation, Screen,
    ScrollPresenter, TintEffect,
};

use crate::config::LumenConfig;
use crate::error::{AppError, Result};

pub const FRAME_INTERVAL: Duration = Duration::from_micros(16_667);

/// Totals over a run of frames
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    pub frames: u64,
    pub draw_calls: u64,
    pub captures: u64,
    /// Elements composited through an off-screen texture
    pub masked: u64,
    pub failed_subtrees: u64,
    pub pending_applied: u64,
    pub assets_swept: u64,
    pub peak_live_assets: usize,
    /// Live assets after the last frame
    pub live_assets: usize,
}

impl RunReport {
    fn record(&mut self, stats: &FrameStats) {
        self.frames += 1;
        self.draw_calls += stats.draw_calls as u64;
        self.captures += stats.captures as u64;
        self.masked += stats.masked as u64;
        self.failed_subtrees += stats.failed_subtrees as u64;
        self.pending_applied += stats.pending_applied as u64;
        self.assets_swept += stats.assets_swept as u64;
        self.peak_live_assets = self.peak_live_assets.max(stats.live_assets);
        self.live_assets = stats.live_assets;
    }
}

pub struct App {
    screen: Screen,
    device: Arc<HeadlessDevice>,
}

impl App {
    pub fn headless(config: &LumenConfig) -> Result<Self> {
        config.validate()?;
        let device = Arc::new(HeadlessDevice::new(config.screen.width, config.screen.height));
        let screen = Screen::new("main", device.clone(), config.screen_config());
        tracing::info!(
            "headless screen {}x{}, asset idle threshold {}ms",
            config.screen.width,
            config.screen.height,
            config.cache.idle_threshold_ms
        );
        Ok(Self { screen, device })
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn screen_mut(&mut self) -> &mut Screen {
        &mut self.screen
    }

    pub fn device(&self) -> &Arc<HeadlessDevice> {
        &self.device
    }

    pub fn set_root(&mut self, root: Element) -> Result<()> {
        self.screen.set_root(root)?;
        Ok(())
    }

    /// Render `frames` frames, the first one at `start`
    pub fn run(&mut self, frames: u32, start: Instant) -> Result<RunReport> {
        if self.screen.root().is_none() {
            return Err(AppError::NoRoot);
        }

        let mut report = RunReport::default();
        for index in 0..frames {
            let now = start + FRAME_INTERVAL * index;
            let stats = self
                .screen
                .render_frame(now)
                .map_err(|source| AppError::Frame {
                    frame: self.screen.frames(),
                    source,
                })?;
            report.record(&stats);
            // Submitted draws are only kept for inspection between frames
            self.device.take_draw_calls();
        }

        tracing::debug!(
            "ran {} frames: {} draws, {} assets swept",
            report.frames,
            report.draw_calls,
            report.assets_swept
        );
        Ok(report)
    }

    /// Close the screen, freeing every asset
    pub fn shutdown(mut self) {
        self.screen.close();
    }
}

/// Sample tree exercising every element kind
pub struct DemoScene {
    pub root: Element,
    /// Scroll presenter hosting the list
    pub scroller: Element,
    pub capture: Element,
}

impl DemoScene {
    pub fn build(rows: usize) -> std::result::Result<Self, LayoutError> {
        let list = Element::new(ElementKind::stack_panel(Orientation::Vertical));
        for row in 0..rows {
            let shade = 0.2 + 0.6 * (row % 2) as f32;
            let item = Element::new(ElementKind::rectangle(Color::rgb(shade, shade, shade)))
                .with_name(format!("row-{row}"))
                .with_margin(Thickness::symmetric(0.0, 2.0));
            item.props().height.set(32.0);
            list.add_child(item)?;
        }

        let scroller = Element::new(ElementKind::scroll_presenter())
            .with_name("scroller")
            .with_child(list)?;
        scroller.props().height.set(240.0);

        let header = Element::new(ElementKind::rectangle(Color::from_hex(0x3366cc)))
            .with_name("header");
        header.props().height.set(48.0);

        let picture = Element::new(ElementKind::aspect_ratio(16.0 / 9.0))
            .with_child(Element::new(ElementKind::rectangle(Color::from_hex(0xcc8833))))?;

        let effect: Arc<dyn Effect> = Arc::new(TintEffect::new(Color::rgba(1.0, 1.0, 1.0, 0.6)));
        let capture = Element::new(ElementKind::background_capture(Some(effect)))
            .with_name("frosted")
            .with_size(320.0, 120.0)
            .with_alignment(Alignment::Center, Alignment::Center);
        capture.props().z_index.set(1);

        let overlay = Element::new(ElementKind::canvas())
            .with_child(picture)?
            .with_child(capture.clone())?;
        overlay.props().height.set(200.0);

        let content = Element::new(ElementKind::stack_panel(Orientation::Vertical))
            .with_child(header)?
            .with_child(scroller.clone())?
            .with_child(overlay)?;

        let root = Element::new(ElementKind::decorator(Some(Color::from_hex(0x202020))))
            .with_name("root")
            .with_child(content)?;
        if let Some(decorator) = root.kind().as_decorator() {
            decorator.padding.set(Thickness::uniform(16.0));
        }

        Ok(Self {
            root,
            scroller,
            capture,
        })
    }

    /// Start an animated scroll of the list by `distance`
    pub fn scroll_by(&self, distance: f32, now: Instant) {
        if let Some(presenter) = self.scroller.kind().as_scroll_presenter() {
            let duration = ScrollPresenter::duration_for(&self.scroller);
            presenter.scroll_by(Point::new(0.0, distance), now, duration);
        }
    }
}
