use std::collections::BTreeSet;

use ndarray::s;
use rayon::prelude::*;
use tracing::debug;

use crate::config::CorrelationConfig;
use crate::consts::PARALLEL_DETECTION_THRESHOLD;
use crate::detection::DetectionRecord;
use crate::stack::DeformationStack;

use super::kernel::SamplingKernel;

/// One Gaussian-weighted stack sample taken around a detection.
#[derive(Clone, Debug, PartialEq)]
pub struct LagSample {
    /// [`DetectionRecord::id`] of the source detection.
    pub detection: usize,
    pub frame: u32,
    pub lag: i32,
    pub scale: f64,
    pub value: f64,
    pub confidence: f64,
}

/// Retained samples in scale → detection → lag order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SampleTable {
    pub rows: Vec<LagSample>,
}

impl SampleTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn at_lag(&self, lag: i32) -> impl Iterator<Item = &LagSample> + '_ {
        self.rows.iter().filter(move |s| s.lag == lag)
    }

    /// Number of distinct detection frames that produced samples.
    pub fn event_count(&self) -> usize {
        self.rows
            .iter()
            .map(|s| s.frame)
            .collect::<BTreeSet<_>>()
            .len()
    }
}

/// Sample `stack` around every detection for each configured scale and lag.
///
/// Detections at or below the confidence threshold, detections centered
/// outside the grid, and lags landing outside `1..=N` produce nothing.
pub fn sample_detections(
    stack: &DeformationStack,
    detections: &[DetectionRecord],
    config: &CorrelationConfig,
) -> SampleTable {
    let kept: Vec<&DetectionRecord> = detections
        .iter()
        .filter(|d| d.confidence > config.confidence_threshold)
        .collect();
    debug!(
        total = detections.len(),
        kept = kept.len(),
        threshold = config.confidence_threshold,
        "Confidence filter applied"
    );

    let mut rows = Vec::new();
    for &scale in &config.scales {
        let per_detection: Vec<Vec<LagSample>> = if kept.len() >= PARALLEL_DETECTION_THRESHOLD {
            kept.par_iter()
                .map(|d| sample_detection(stack, d, scale, config))
                .collect()
        } else {
            kept.iter()
                .map(|d| sample_detection(stack, d, scale, config))
                .collect()
        };
        rows.extend(per_detection.into_iter().flatten());
    }

    SampleTable { rows }
}

/// All lag samples of one detection at one ROI scale.
///
/// Applies the sign policy but not the confidence filter.
pub fn sample_detection(
    stack: &DeformationStack,
    detection: &DetectionRecord,
    scale: f64,
    config: &CorrelationConfig,
) -> Vec<LagSample> {
    let (h, w) = (stack.height(), stack.width());
    if !(detection.x_center.is_finite() && detection.y_center.is_finite()) {
        debug!(detection = detection.id, frame = detection.frame, "Detection center not finite");
        return Vec::new();
    }
    let pixel = detection.to_pixels(h, w);
    if !pixel.is_inside(h, w) {
        debug!(detection = detection.id, frame = detection.frame, "Detection outside grid");
        return Vec::new();
    }

    // Larger radii cover the whole grid anyway.
    let roi = pixel.roi_radius(scale).min(h.max(w)) as i64;
    let y0 = (pixel.row - roi).max(0) as usize;
    let y1 = (pixel.row + roi + 1).min(h as i64) as usize;
    let x0 = (pixel.col - roi).max(0) as usize;
    let x1 = (pixel.col + roi + 1).min(w as i64) as usize;
    let kernel = SamplingKernel::new(y1 - y0, x1 - x0, roi as usize);

    config
        .lags
        .iter()
        .filter_map(|&lag| {
            let grid = stack.grid(detection.frame as i64 + lag as i64)?;
            let value = kernel.apply(grid.slice(s![y0..y1, x0..x1]));
            Some(LagSample {
                detection: detection.id,
                frame: detection.frame,
                lag,
                scale,
                value: config.sign_policy.apply(value),
                confidence: detection.confidence,
            })
        })
        .collect()
}
