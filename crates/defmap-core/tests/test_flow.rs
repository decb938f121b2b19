#[allow(dead_code)]
mod common;

use ndarray::{s, Array2};

use defmap_core::config::FlowParams;
use defmap_core::error::DefmapError;
use defmap_core::flow::{extract_flow, extract_flow_array, smooth_flow};
use defmap_core::frame::{Frame, FrameKey, MotionField};

fn interior_mean(data: &Array2<f32>, margin: usize) -> f32 {
    let (h, w) = data.dim();
    let view = data.slice(s![margin..h - margin, margin..w - margin]);
    view.sum() / view.len() as f32
}

#[test]
fn test_flow_rejects_mismatched_shapes() {
    let prev = Array2::<f32>::zeros((20, 20));
    let next = Array2::<f32>::zeros((20, 21));
    let err = extract_flow_array(&prev, &next, &FlowParams::default()).unwrap_err();
    assert!(matches!(
        err,
        DefmapError::ShapeMismatch {
            expected: (20, 20),
            actual: (20, 21)
        }
    ));
    assert!(err.is_fatal_input());
}

#[test]
fn test_flow_rejects_empty_grid() {
    let prev = Array2::<f32>::zeros((0, 10));
    let next = Array2::<f32>::zeros((0, 10));
    let err = extract_flow_array(&prev, &next, &FlowParams::default()).unwrap_err();
    assert!(matches!(err, DefmapError::InvalidDimensions { .. }));
}

#[test]
fn test_flow_output_matches_input_shape() {
    let prev = common::textured(40, 56, 0.0);
    let next = common::textured(40, 56, 0.0);
    let field = extract_flow_array(&prev, &next, &FlowParams::default()).unwrap();
    assert_eq!(field.dim(), (40, 56));
}

#[test]
fn test_flow_identical_frames_is_near_zero() {
    let frame = common::textured(48, 48, 0.0);
    let field = extract_flow_array(&frame, &frame, &FlowParams::default()).unwrap();
    assert!(field.vx.iter().all(|v| v.abs() < 1e-3));
    assert!(field.vy.iter().all(|v| v.abs() < 1e-3));
}

#[test]
fn test_flow_recovers_horizontal_shift() {
    let prev = common::textured(64, 64, 0.0);
    let next = common::textured(64, 64, 1.0);
    let field = extract_flow_array(&prev, &next, &FlowParams::default()).unwrap();

    let vx = interior_mean(&field.vx, 16);
    let vy = interior_mean(&field.vy, 16);
    assert!((vx - 1.0).abs() < 0.25, "expected vx ≈ 1, got {vx}");
    assert!(vy.abs() < 0.25, "expected vy ≈ 0, got {vy}");
}

#[test]
fn test_flow_recovers_vertical_shift() {
    let prev = common::textured_shifted(64, 64, 0.0, 0.0);
    let next = common::textured_shifted(64, 64, 0.0, 1.0);
    let field = extract_flow_array(&prev, &next, &FlowParams::default()).unwrap();

    let vx = interior_mean(&field.vx, 16);
    let vy = interior_mean(&field.vy, 16);
    assert!(vx.abs() < 0.25, "expected vx ≈ 0, got {vx}");
    assert!((vy - 1.0).abs() < 0.25, "expected vy ≈ 1, got {vy}");
}

#[test]
fn test_flow_recovers_diagonal_shift_with_signs() {
    let prev = common::textured_shifted(64, 64, 0.0, 0.0);
    let next = common::textured_shifted(64, 64, 2.0, -1.0);
    let field = extract_flow_array(&prev, &next, &FlowParams::default()).unwrap();

    let vx = interior_mean(&field.vx, 16);
    let vy = interior_mean(&field.vy, 16);
    assert!((vx - 2.0).abs() < 0.25, "expected vx ≈ 2, got {vx}");
    assert!((vy + 1.0).abs() < 0.25, "expected vy ≈ -1, got {vy}");
}

#[test]
fn test_extract_flow_with_smoothing_keeps_resolution() {
    let prev = Frame::new(common::textured(48, 40, 0.0), FrameKey::new(1, 1));
    let next = Frame::new(common::textured(48, 40, 1.0), FrameKey::new(2, 1));
    let field = extract_flow(&prev, &next, &FlowParams::default(), 1.5).unwrap();
    assert_eq!(field.dim(), (48, 40));
}

#[test]
fn test_smooth_flow_zero_sigma_is_identity() {
    let vx = Array2::from_shape_fn((10, 10), |(r, c)| (r * c) as f32);
    let vy = Array2::from_shape_fn((10, 10), |(r, c)| r as f32 - c as f32);
    let field = MotionField::new(vx, vy);
    assert_eq!(smooth_flow(&field, 0.0), field);
}

#[test]
fn test_smooth_flow_preserves_uniform_field() {
    let field = MotionField::uniform(20, 20, 1.5, -0.5);
    let smoothed = smooth_flow(&field, 2.0);
    for (&a, &b) in smoothed.vx.iter().zip(smoothed.vy.iter()) {
        assert!((a - 1.5).abs() < 1e-4);
        assert!((b + 0.5).abs() < 1e-4);
    }
}
