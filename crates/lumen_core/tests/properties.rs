//! Property cells, maps and pending values working together

use std::sync::Arc;
use std::thread;

use lumen_core::{deep_copy, CoreError, PendingValues, Point, Property, PropertyMap, Transform};
use parking_lot::Mutex;

#[test]
fn test_dynamic_set_by_name() {
    let opacity = Property::new("Opacity", 1.0f32);
    let mut map = PropertyMap::new();
    map.register(&opacity);

    assert!(map.set_value("Opacity", Box::new(0.5f32)).unwrap());
    assert!(!map.set_value("Opacity", Box::new(0.5f32)).unwrap());
    assert_eq!(opacity.get(), 0.5);

    let err = map.set_value("Opacity", Box::new("half")).unwrap_err();
    assert!(matches!(err, CoreError::TypeMismatch { .. }));
    assert_eq!(opacity.get(), 0.5);
}

#[test]
fn test_reset_notifies_with_previous_value() {
    let z_index = Property::new("ZIndex", 0i32);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let log = seen.clone();
    z_index.attach(move |cell, previous| log.lock().push((*previous, cell.get())));

    z_index.set(3);
    assert!(!z_index.is_default());
    assert!(z_index.reset());
    assert!(z_index.is_default());
    assert_eq!(*seen.lock(), vec![(0, 3), (3, 0)]);
}

#[test]
fn test_listener_may_write_other_cells() {
    let width = Property::new("Width", f32::NAN);
    let height = Property::new("Height", f32::NAN);

    let target = height.clone();
    width.attach(move |prop, _| {
        target.set(prop.get() / 2.0);
    });

    width.set(100.0);
    assert_eq!(height.get(), 50.0);
}

#[test]
fn test_detached_listener_is_silent() {
    let name = Property::new("Name", String::new());
    let calls = Arc::new(Mutex::new(0));
    let counter = calls.clone();
    let id = name.attach(move |_, _| *counter.lock() += 1);

    name.set("a".to_string());
    assert!(name.detach(id));
    assert!(!name.detach(id));
    name.set("b".to_string());
    assert_eq!(*calls.lock(), 1);
}

#[test]
fn test_map_lookup_by_name_and_type() {
    let width = Property::new("Width", 10.0f32);
    let label = Property::new("Name", String::from("root"));
    let mut map = PropertyMap::new();
    map.register(&width);
    map.register(&label);

    assert!(map.set("Width", 20.0f32).unwrap());
    assert_eq!(width.get(), 20.0);

    let err = map.get::<f32>("Name").unwrap_err();
    assert!(matches!(err, CoreError::TypeMismatch { .. }));
    assert_eq!(
        map.get_any("Missing").err(),
        Some(CoreError::UnknownProperty("Missing".to_string()))
    );

    let names: Vec<&str> = map.iter().map(|p| p.name()).collect();
    assert_eq!(names, vec!["Width", "Name"]);
}

#[test]
fn test_foreign_thread_writes_wait_for_apply() {
    let pending = PendingValues::new();
    pending.bind_render_thread();
    let width = Property::new("Width", 0.0f32);

    thread::scope(|scope| {
        scope.spawn(|| {
            assert!(!pending.is_render_thread());
            assert!(pending.set(&width, 10.0));
            assert!(pending.set(&width, 20.0));
        });
    });

    assert_eq!(width.get(), 0.0);
    assert_eq!(pending.len(), 1);
    assert_eq!(pending.get_pending_or_current(&width), 20.0);

    assert_eq!(pending.apply_pending(), 1);
    assert_eq!(width.get(), 20.0);
    assert!(pending.is_empty());

    assert!(!pending.set(&width, 5.0));
    assert_eq!(width.get(), 5.0);
}

#[test]
fn test_transform_group_copy_resolves_to_same_matrix() {
    let rotate = Arc::new(Transform::Rotate {
        degrees: 90.0,
        center: Point::new(5.0, 5.0),
    });
    let group = Arc::new(Transform::Group(vec![
        rotate.clone(),
        Arc::new(Transform::translate(10.0, 0.0)),
        rotate,
    ]));

    let copy = deep_copy(&group);
    assert!(!Arc::ptr_eq(&copy, &group));
    let expected = group.to_matrix();
    let actual = copy.to_matrix();
    let sample = Point::new(3.0, 7.0);
    let (a, b) = (expected.transform_point(sample), actual.transform_point(sample));
    assert!((a.x - b.x).abs() < 1e-4 && (a.y - b.y).abs() < 1e-4);
}
