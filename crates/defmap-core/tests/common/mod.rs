use ndarray::{Array2, Array3};

use defmap_core::config::MetricKind;
use defmap_core::detection::DetectionRecord;
use defmap_core::stack::{DeformationStack, StackId};

/// Smooth two-dimensional texture on an 8-bit intensity scale, translated
/// by `shift_x` pixels to the right.
pub fn textured(h: usize, w: usize, shift_x: f32) -> Array2<f32> {
    textured_shifted(h, w, shift_x, 0.0)
}

/// Same texture translated by `(dx, dy)`; positive `dy` moves it down.
pub fn textured_shifted(h: usize, w: usize, dx: f32, dy: f32) -> Array2<f32> {
    Array2::from_shape_fn((h, w), |(row, col)| {
        let x = col as f32 - dx;
        let y = row as f32 - dy;
        128.0 + 50.0 * (0.35 * x + 0.2 * y).sin() + 40.0 * (0.3 * y - 0.15 * x).cos()
    })
}

/// A stack of `n` grids where grid `i` (1-based) is filled with `f(i, row, col)`.
pub fn stack_from_fn(
    n: usize,
    h: usize,
    w: usize,
    f: impl Fn(usize, usize, usize) -> f32,
) -> DeformationStack {
    let data = Array3::from_shape_fn((n, h, w), |(i, row, col)| f(i + 1, row, col));
    DeformationStack::new(stack_id(1), data).expect("non-empty stack")
}

pub fn constant_stack(n: usize, h: usize, w: usize, value: f32) -> DeformationStack {
    stack_from_fn(n, h, w, |_, _, _| value)
}

pub fn stack_id(slice: u32) -> StackId {
    StackId {
        slice,
        metric: MetricKind::Divergence,
    }
}

/// Centered detection with a 10% box.
pub fn detection(id: usize, frame: u32, confidence: f64) -> DetectionRecord {
    detection_at(id, frame, 0.5, 0.5, confidence)
}

pub fn detection_at(id: usize, frame: u32, x: f64, y: f64, confidence: f64) -> DetectionRecord {
    DetectionRecord {
        id,
        frame,
        x_center: x,
        y_center: y,
        width: 0.1,
        height: 0.1,
        confidence,
    }
}
