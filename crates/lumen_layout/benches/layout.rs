use std::sync::Arc;
use std::time::Instant;

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use lumen_core::{Color, Rect, Size};
use lumen_gpu::HeadlessDevice;
use lumen_layout::{Element, ElementKind, Orientation, Screen, ScreenConfig};

/// `rows` horizontal panels of `columns` fixed-size rectangles in a vertical stack
fn build_grid(rows: usize, columns: usize) -> (Element, Element) {
    let root = Element::new(ElementKind::stack_panel(Orientation::Vertical));
    let mut last = root.clone();
    for _ in 0..rows {
        let row = Element::new(ElementKind::stack_panel(Orientation::Horizontal));
        for _ in 0..columns {
            let cell = Element::new(ElementKind::rectangle(Color::WHITE)).with_size(8.0, 8.0);
            row.add_child(cell).unwrap();
        }
        root.add_child(row.clone()).unwrap();
        last = row;
    }
    (root, last)
}

fn bench_layout(c: &mut Criterion) {
    let available = Size::new(1280.0, 720.0);

    c.bench_function("measure_arrange_cold_64x32", |b| {
        b.iter_batched(
            || build_grid(64, 32).0,
            |root| {
                root.measure(black_box(available));
                root.arrange(available.to_rect());
            },
            BatchSize::SmallInput,
        )
    });

    let (root, _) = build_grid(64, 32);
    root.measure(available);
    root.arrange(Rect::new(0.0, 0.0, available.width, available.height));
    c.bench_function("measure_arrange_memoized_64x32", |b| {
        b.iter(|| {
            root.measure(black_box(available));
            root.arrange(available.to_rect());
        })
    });

    let (root, row) = build_grid(64, 32);
    root.measure(available);
    root.arrange(available.to_rect());
    let leaf = row.children().get(0).unwrap();
    let mut width = 8.0f32;
    c.bench_function("invalidate_leaf_and_relayout", |b| {
        b.iter(|| {
            width = if width > 8.0 { 8.0 } else { 12.0 };
            leaf.props().width.set(width);
            root.measure(available);
            root.arrange(available.to_rect());
        })
    });
}

fn bench_render(c: &mut Criterion) {
    let device = Arc::new(HeadlessDevice::new(1280, 720));
    let mut screen = Screen::new("bench", device.clone(), ScreenConfig::default());
    screen.set_root(build_grid(32, 32).0).unwrap();
    screen.render_frame(Instant::now()).unwrap();

    c.bench_function("render_frame_cached_32x32", |b| {
        b.iter(|| {
            let stats = screen.render_frame(Instant::now()).unwrap();
            device.take_draw_calls();
            black_box(stats)
        })
    });
}

criterion_group!(benches, bench_layout, bench_render);
criterion_main!(benches);
