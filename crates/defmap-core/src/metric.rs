use ndarray::{Array2, Axis, Zip};

use crate::config::MetricKind;
use crate::consts::{DISPLAY_CLIP_DIVERGENCE, DISPLAY_CLIP_MAGNITUDE};
use crate::frame::MotionField;

/// Reduce a motion field to one raw, unclipped scalar per pixel.
pub fn compute_metric(field: &MotionField, kind: MetricKind) -> Array2<f32> {
    match kind {
        MetricKind::Magnitude => magnitude(field),
        MetricKind::Divergence => divergence(field),
    }
}

/// `sqrt(vx² + vy²)` per pixel.
pub fn magnitude(field: &MotionField) -> Array2<f32> {
    let mut out = Array2::<f32>::zeros(field.dim());
    Zip::from(&mut out)
        .and(&field.vx)
        .and(&field.vy)
        .for_each(|m, &vx, &vy| *m = vx.hypot(vy));
    out
}

/// `∂vx/∂x + ∂vy/∂y` with central differences inside the grid and
/// one-sided differences on its edges.
pub fn divergence(field: &MotionField) -> Array2<f32> {
    let mut out = gradient(&field.vx, Axis(1));
    out += &gradient(&field.vy, Axis(0));
    out
}

/// Numerical gradient along one axis, unit spacing.
///
/// Interior: `(f[i+1] - f[i-1]) / 2`; first and last: forward and backward
/// differences. An axis of length 1 has zero gradient.
pub fn gradient(data: &Array2<f32>, axis: Axis) -> Array2<f32> {
    let mut out = Array2::<f32>::zeros(data.dim());
    let n = data.len_of(axis);
    if n < 2 {
        return out;
    }

    for (src, mut dst) in data.lanes(axis).into_iter().zip(out.lanes_mut(axis)) {
        dst[0] = src[1] - src[0];
        dst[n - 1] = src[n - 1] - src[n - 2];
        for i in 1..n - 1 {
            dst[i] = (src[i + 1] - src[i - 1]) * 0.5;
        }
    }
    out
}

/// Value range used when rendering previews of a metric.
pub fn display_range(kind: MetricKind) -> (f32, f32) {
    match kind {
        MetricKind::Divergence => (-DISPLAY_CLIP_DIVERGENCE, DISPLAY_CLIP_DIVERGENCE),
        MetricKind::Magnitude => (0.0, DISPLAY_CLIP_MAGNITUDE),
    }
}

/// Clipped copy for previews. Persisted stacks always keep raw values.
pub fn clip_for_display(data: &Array2<f32>, kind: MetricKind) -> Array2<f32> {
    let (lo, hi) = display_range(kind);
    data.mapv(|v| v.clamp(lo, hi))
}
