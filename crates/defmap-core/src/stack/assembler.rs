use ndarray::Array2;
use tracing::debug;

use crate::config::DeformationConfig;
use crate::error::{DefmapError, Result};
use crate::flow::extract_flow;
use crate::frame::{Frame, FrameKey};
use crate::io::frames::FrameSource;
use crate::metric::compute_metric;

use super::deformation::{DeformationStack, StackId};

/// Flow, smoothing and metric reduction for one consecutive frame pair.
pub fn compute_pair_metric(
    prev: &Frame,
    next: &Frame,
    config: &DeformationConfig,
) -> Result<Array2<f32>> {
    let field = extract_flow(prev, next, &config.flow, config.smoothing_sigma)?;
    Ok(compute_metric(&field, config.metric))
}

/// Concatenate per-pair grids of one slice in time order.
pub fn assemble_stack(
    slice: u32,
    config: &DeformationConfig,
    grids: &[Array2<f32>],
) -> Result<DeformationStack> {
    let id = StackId {
        slice,
        metric: config.metric,
    };
    DeformationStack::from_grids(id, grids)
}

/// Load the frames of `slice` at `times` (ascending) and build its stack.
///
/// Every frame is loaded once. Any load failure or size change aborts the
/// slice; nothing is returned for a partially processed slice.
/// `on_pair` is called after each completed frame pair.
pub fn build_slice_stack(
    source: &dyn FrameSource,
    slice: u32,
    times: &[u32],
    config: &DeformationConfig,
    on_pair: impl Fn(usize),
) -> Result<DeformationStack> {
    if times.len() < 2 {
        return Err(DefmapError::EmptyInput {
            slice,
            frames: times.len(),
        });
    }

    let mut prev = source.load(FrameKey::new(times[0], slice))?;
    let mut grids = Vec::with_capacity(times.len() - 1);

    for (i, &time) in times.iter().enumerate().skip(1) {
        let next = source.load(FrameKey::new(time, slice))?;
        if next.dim() != prev.dim() {
            return Err(DefmapError::ShapeMismatch {
                expected: prev.dim(),
                actual: next.dim(),
            });
        }

        grids.push(compute_pair_metric(&prev, &next, config)?);
        debug!(slice, pair = i, "Frame pair processed");
        on_pair(i);
        prev = next;
    }

    assemble_stack(slice, config, &grids)
}
