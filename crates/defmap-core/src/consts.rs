/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Minimum detection count to sample detections in parallel.
pub const PARALLEL_DETECTION_THRESHOLD: usize = 16;

/// Farnebäck pyramid scale factor between consecutive levels.
pub const DEFAULT_PYRAMID_SCALE: f64 = 0.5;

/// Number of coarser pyramid layers built above the full-resolution image.
pub const DEFAULT_PYRAMID_LEVELS: usize = 3;

/// Side length of the averaging window used when solving for flow.
pub const DEFAULT_FLOW_WINDOW: usize = 15;

/// Flow refinement iterations per pyramid level.
pub const DEFAULT_FLOW_ITERATIONS: usize = 3;

/// Neighborhood size (pixels per side) of the polynomial expansion.
pub const DEFAULT_POLY_N: usize = 5;

/// Gaussian sigma weighting the polynomial expansion neighborhood.
pub const DEFAULT_POLY_SIGMA: f64 = 1.2;

/// Pyramid levels smaller than this (either side) are not built.
pub const MIN_PYRAMID_SIZE: usize = 32;

/// Default Gaussian sigma for smoothing each flow channel (0 disables).
pub const DEFAULT_FLOW_SMOOTHING_SIGMA: f32 = 1.5;

/// Display clip bound for divergence previews: [-4, 4].
pub const DISPLAY_CLIP_DIVERGENCE: f32 = 4.0;

/// Display clip upper bound for magnitude previews: [0, 4].
pub const DISPLAY_CLIP_MAGNITUDE: f32 = 4.0;

/// Default ROI multipliers relative to the detection bounding box.
pub const DEFAULT_SCALES: [f64; 3] = [1.0, 1.5, 2.0];

/// Default lag range (inclusive), in frames.
pub const DEFAULT_LAG_MIN: i32 = -10;
pub const DEFAULT_LAG_MAX: i32 = 10;

/// Default minimum detector confidence (strictly exceeded).
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 0.5;

/// Sampling kernel sigma is `roi / KERNEL_SIGMA_DIVISOR`.
pub const KERNEL_SIGMA_DIVISOR: f64 = 1.5;

/// p-values below this mark a lag as significant.
pub const SIGNIFICANCE_LEVEL: f64 = 0.05;

/// Minimum pooled samples per lag for a correlation statistic.
pub const MIN_SAMPLES_PER_LAG: usize = 2;

/// Relative spread below which a sample set is treated as constant.
pub const EPSILON: f64 = 1e-10;

/// Name reported in the statistics table's method column.
pub const CORRELATION_METHOD: &str = "Pearson";
