//! Dense motion between consecutive frames.
//!
//! [`extract_flow`] runs the pyramidal polynomial-expansion estimator from
//! [`farneback`] and optionally smooths each displacement channel.

pub mod farneback;
mod poly_expansion;
mod pyramid;

use ndarray::Array2;

use crate::config::FlowParams;
use crate::error::{DefmapError, Result};
use crate::filters::gaussian_blur::gaussian_blur_array;
use crate::frame::{Frame, MotionField};

pub use farneback::farneback_flow;

/// Compute the motion field from `prev` to `next`, then smooth it.
///
/// `smoothing_sigma = 0` leaves the raw estimate untouched.
pub fn extract_flow(
    prev: &Frame,
    next: &Frame,
    params: &FlowParams,
    smoothing_sigma: f32,
) -> Result<MotionField> {
    let field = extract_flow_array(&prev.data, &next.data, params)?;
    Ok(smooth_flow(&field, smoothing_sigma))
}

/// Unsmoothed flow between two raw intensity grids.
pub fn extract_flow_array(
    prev: &Array2<f32>,
    next: &Array2<f32>,
    params: &FlowParams,
) -> Result<MotionField> {
    if prev.dim() != next.dim() {
        return Err(DefmapError::ShapeMismatch {
            expected: prev.dim(),
            actual: next.dim(),
        });
    }
    let (h, w) = prev.dim();
    if h == 0 || w == 0 {
        return Err(DefmapError::InvalidDimensions {
            width: w,
            height: h,
        });
    }
    farneback_flow(prev, next, params)
}

/// Gaussian-smooth each displacement channel independently.
pub fn smooth_flow(field: &MotionField, sigma: f32) -> MotionField {
    if !(sigma > 0.0) {
        return field.clone();
    }
    MotionField::new(
        gaussian_blur_array(&field.vx, sigma),
        gaussian_blur_array(&field.vy, sigma),
    )
}
