//! Storage and codec integration tests.

use inkboard::draw::element::{Element, ShapeKind};
use inkboard::draw::style::Style;
use inkboard::persist::{DrawingStore, serialize_elements};
use inkboard::surface::{DrawingSurface, Tool};
use inkboard::util::Point;
use tempfile::TempDir;

fn store() -> (TempDir, DrawingStore) {
    let dir = TempDir::new().expect("temp dir");
    let data_dir = dir.path().join("data");
    let export_dir = dir.path().join("pictures");
    (dir, DrawingStore::new(data_dir, export_dir))
}

fn sample_elements() -> Vec<Element> {
    let mut rectangle = Element::new(ShapeKind::Rectangle, Style::default());
    rectangle.points = vec![Point::new(0.0, 0.0), Point::new(10.0, 20.0)];
    let mut polyline = Element::new(ShapeKind::Polyline, Style::default());
    polyline.points = vec![
        Point::new(0.0, 0.0),
        Point::new(10.0, 0.0),
        Point::new(10.0, 10.0),
    ];
    vec![rectangle, polyline]
}

#[test]
fn save_then_load_restores_the_sequence() {
    let (_dir, store) = store();
    let contents = serialize_elements(&sample_elements()).unwrap();
    store.save("demo", &contents).unwrap();

    let loaded = store.load("demo").unwrap().expect("drawing present");
    assert_eq!(loaded.len(), 2);
    assert_eq!(loaded[0].shape, ShapeKind::Rectangle);
    assert_eq!(serialize_elements(&loaded).unwrap(), contents);
}

#[test]
fn missing_drawing_is_no_data() {
    let (_dir, store) = store();
    assert!(store.load("nope").unwrap().is_none());
}

#[test]
fn malformed_drawing_is_no_data() {
    let (_dir, store) = store();
    store.save("broken", "{{{ not json").unwrap();
    assert!(store.load("broken").unwrap().is_none());
}

#[test]
fn persistent_save_coalesces() {
    let (_dir, store) = store();

    // Empty page with nothing stored: no file is created.
    let empty = serialize_elements(&[]).unwrap();
    assert!(!store.save_persistent(&empty).unwrap());
    assert!(store.load_persistent().unwrap().is_none());

    let contents = serialize_elements(&sample_elements()).unwrap();
    assert!(store.save_persistent(&contents).unwrap());
    // Unchanged contents are skipped.
    assert!(!store.save_persistent(&contents).unwrap());
    // A change writes again, including back to empty.
    assert!(store.save_persistent(&empty).unwrap());
    assert_eq!(store.load_persistent().unwrap().unwrap().len(), 0);
}

#[test]
fn listing_excludes_the_persistent_drawing() {
    let (_dir, store) = store();
    let contents = serialize_elements(&sample_elements()).unwrap();
    store.save("first", &contents).unwrap();
    store.save("second", &contents).unwrap();
    store.save_persistent(&contents).unwrap();

    let names: Vec<String> = store.list().into_iter().map(|info| info.name).collect();
    assert_eq!(names.len(), 2);
    assert!(names.contains(&"first".to_string()));
    assert!(names.contains(&"second".to_string()));
}

#[test]
fn delete_removes_only_the_named_drawing() {
    let (_dir, store) = store();
    let contents = serialize_elements(&sample_elements()).unwrap();
    store.save("keep", &contents).unwrap();
    store.save("drop", &contents).unwrap();

    assert!(store.delete("drop").unwrap());
    assert!(!store.delete("drop").unwrap());
    assert!(store.load("keep").unwrap().is_some());
}

#[test]
fn export_writes_an_svg_document() {
    let (_dir, store) = store();
    let mut surface = DrawingSurface::new(640.0, 480.0);
    surface.tool = Tool::Rectangle;
    surface.start_drawing(0.0, 0.0, false);
    surface.update_drawing(10.0, 20.0, false);
    surface.stop_drawing();

    let path = store.export_svg(&surface.export_svg()).unwrap();
    let markup = std::fs::read_to_string(path).unwrap();
    assert!(markup.starts_with("<svg viewBox=\"0 0 640 480\""));
    assert!(markup.contains("<rect"));
}

#[test]
fn surface_round_trip_through_the_store() {
    let (_dir, store) = store();
    let mut surface = DrawingSurface::new(800.0, 600.0);
    surface.tool = Tool::Ellipse;
    surface.start_drawing(100.0, 100.0, false);
    surface.update_drawing(100.0, 160.0, false);
    surface.stop_drawing();

    let contents = surface.serialize().unwrap();
    assert!(store.save_persistent(&contents).unwrap());
    surface.mark_saved(contents);
    assert!(!surface.contents_changed());

    let mut restored = DrawingSurface::new(800.0, 600.0);
    restored.replace_elements(store.load_persistent().unwrap().unwrap());
    assert_eq!(restored.serialize().unwrap(), surface.serialize().unwrap());
}
