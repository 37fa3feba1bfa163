//! Zoom arithmetic over sequences of operations.

use crate::helpers::assert_close;
use diagram_viewport::TransformState;
use diagram_viewport::geometry::{Point, ScaleBounds, content_point, scale_about_point};

fn state(scale: f64, x: f64, y: f64) -> TransformState {
    TransformState {
        scale,
        translate_x: x,
        translate_y: y,
        ..TransformState::default()
    }
}

#[test]
fn test_pivot_is_fixed_across_a_zoom_sequence() {
    let bounds = ScaleBounds::default();
    let pivot = Point::new(137.0, 42.5);
    let mut current = state(1.0, -200.0, 12.0);
    let anchored = content_point(&current, pivot);

    for factor in [1.25, 1.25, 0.8, 1.1, 0.5, 2.0] {
        current = scale_about_point(&current, factor, pivot, bounds);
        let now = content_point(&current, pivot);
        assert_close(now.x, anchored.x);
        assert_close(now.y, anchored.y);
    }
}

#[test]
fn test_zoom_in_then_out_returns_to_start() {
    let bounds = ScaleBounds::default();
    let pivot = Point::new(200.0, 100.0);
    let start = state(1.0, -200.0, 0.0);

    let zoomed = scale_about_point(&start, 1.25, pivot, bounds);
    let back = scale_about_point(&zoomed, 0.8, pivot, bounds);

    assert_close(back.scale, 1.0);
    assert_close(back.translate_x, -200.0);
    assert_close(back.translate_y, 0.0);
}

#[test]
fn test_repeated_zoom_saturates_at_bounds() {
    let bounds = ScaleBounds::new(0.25, 4.0);
    let pivot = Point::new(10.0, 10.0);

    let mut current = state(1.0, 0.0, 0.0);
    for _ in 0..50 {
        current = scale_about_point(&current, 1.25, pivot, bounds);
        assert!(bounds.contains(current.scale));
    }
    assert_eq!(current.scale, 4.0);

    for _ in 0..50 {
        current = scale_about_point(&current, 0.8, pivot, bounds);
        assert!(bounds.contains(current.scale));
    }
    assert_eq!(current.scale, 0.25);
}

#[test]
fn test_zoom_keeps_other_fields() {
    let start = TransformState {
        custom_height: Some(240.0),
        has_interacted: true,
        ..TransformState::default()
    };
    let next = scale_about_point(&start, 2.0, Point::ORIGIN, ScaleBounds::default());
    assert_eq!(next.custom_height, Some(240.0));
    assert!(next.has_interacted);
}
