//! Background capture and effects

use std::sync::Arc;
use std::time::Instant;

use lumen_core::{Color, Size};
use lumen_gpu::{RenderTarget, TextureHandle};
use lumen_layout::{
    Effect, EffectContext, Element, ElementKind, FrameContext, Screen, ScreenConfig, TintEffect,
};
use parking_lot::Mutex;

fn screen(device: &Arc<lumen_gpu::HeadlessDevice>) -> Screen {
    let config = ScreenConfig {
        size: Size::new(320.0, 240.0),
        ..ScreenConfig::default()
    };
    Screen::new("capture", device.clone(), config)
}

#[test]
fn test_capture_blits_back_buffer_then_applies_effect() {
    let device = Arc::new(lumen_gpu::HeadlessDevice::new(320, 240));
    let mut screen = screen(&device);
    let effect: Arc<dyn Effect> = Arc::new(TintEffect::new(Color::rgba(1.0, 1.0, 1.0, 0.8)));
    let capture = Element::new(ElementKind::background_capture(Some(effect)));
    let root = Element::new(ElementKind::canvas())
        .with_child(capture.clone())
        .unwrap();
    screen.set_root(root).unwrap();

    let stats = screen.render_frame(Instant::now()).unwrap();
    assert_eq!(stats.captures, 1);
    assert_eq!(stats.draw_calls, 1);

    let kind = capture.kind().as_background_capture().unwrap();
    let texture = kind.last_texture().unwrap();
    assert_eq!(
        device.blits(),
        vec![(RenderTarget::BackBuffer, RenderTarget::Texture(texture))]
    );
    let descriptor = device.texture_descriptor(texture).unwrap();
    assert_eq!((descriptor.width, descriptor.height), (320, 240));
    assert_eq!(device.draw_calls()[0].texture, Some(texture));
    assert!(kind.last_inverse_transform().is_some());
}

#[test]
fn test_capture_texture_reallocated_only_on_resize() {
    let device = Arc::new(lumen_gpu::HeadlessDevice::new(320, 240));
    let mut screen = screen(&device);
    let capture = Element::new(ElementKind::background_capture(None));
    let root = Element::new(ElementKind::canvas())
        .with_child(capture.clone())
        .unwrap();
    screen.set_root(root).unwrap();

    let now = Instant::now();
    screen.render_frame(now).unwrap();
    screen.render_frame(now).unwrap();
    assert_eq!(device.counters().textures_created, 1);
    assert_eq!(device.counters().blits, 2);

    device.resize(640, 480);
    screen.render_frame(now).unwrap();
    assert_eq!(device.counters().textures_created, 2);
    assert_eq!(device.counters().textures_destroyed, 1);
    assert_eq!(device.live_textures(), 1);
}

#[test]
fn test_capture_children_draw_after_effect() {
    let device = Arc::new(lumen_gpu::HeadlessDevice::new(320, 240));
    let mut screen = screen(&device);
    let effect: Arc<dyn Effect> = Arc::new(TintEffect::new(Color::WHITE));
    let content = Element::new(ElementKind::rectangle(Color::BLACK)).with_size(20.0, 20.0);
    let capture = Element::new(ElementKind::background_capture(Some(effect)))
        .with_child(content)
        .unwrap();
    screen.set_root(capture).unwrap();

    screen.render_frame(Instant::now()).unwrap();
    let draws = device.draw_calls();
    assert_eq!(draws.len(), 2);
    assert!(draws[0].texture.is_some());
    assert!(draws[1].texture.is_none());
}

/// Removes an element from its parent while the frame is rendering
struct RemovingEffect {
    target: Mutex<Option<(Element, Element)>>,
}

impl Effect for RemovingEffect {
    fn name(&self) -> &str {
        "Removing"
    }

    fn apply(
        &self,
        _frame: &mut FrameContext<'_>,
        _capture: TextureHandle,
        _ctx: &EffectContext,
    ) -> lumen_layout::Result<()> {
        if let Some((parent, child)) = self.target.lock().take() {
            parent.children().remove(&child);
        }
        Ok(())
    }
}

#[test]
fn test_release_during_render_is_deferred_to_frame_end() {
    let device = Arc::new(lumen_gpu::HeadlessDevice::new(320, 240));
    let mut screen = screen(&device);
    let victim = Element::new(ElementKind::rectangle(Color::WHITE)).with_size(10.0, 10.0);
    let effect = Arc::new(RemovingEffect {
        target: Mutex::new(None),
    });
    let shared: Arc<dyn Effect> = effect.clone();
    let capture = Element::new(ElementKind::background_capture(Some(shared)));
    capture.props().z_index.set(1);
    let root = Element::new(ElementKind::canvas())
        .with_child(victim.clone())
        .unwrap()
        .with_child(capture)
        .unwrap();
    screen.set_root(root.clone()).unwrap();

    screen.render_frame(Instant::now()).unwrap();
    assert_eq!(device.live_buffers(), 1);

    *effect.target.lock() = Some((root.clone(), victim.clone()));
    screen.render_frame(Instant::now()).unwrap();
    assert!(victim.is_disposed());
    assert_eq!(device.live_buffers(), 0);
    assert_eq!(device.counters().buffers_destroyed, 1);
    assert_eq!(root.children().len(), 1);
}

#[test]
fn test_deep_copy_shares_effect() {
    let effect: Arc<dyn Effect> = Arc::new(TintEffect::new(Color::WHITE));
    let capture = Element::new(ElementKind::background_capture(Some(effect.clone())));
    let copy = capture.deep_copy();
    let copied = copy.kind().as_background_capture().unwrap().effect().unwrap();
    assert!(Arc::ptr_eq(&copied, &effect));
}
