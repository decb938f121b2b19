use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::consts::{
    DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_FLOW_ITERATIONS, DEFAULT_FLOW_SMOOTHING_SIGMA,
    DEFAULT_FLOW_WINDOW, DEFAULT_LAG_MAX, DEFAULT_LAG_MIN, DEFAULT_POLY_N, DEFAULT_POLY_SIGMA,
    DEFAULT_PYRAMID_LEVELS, DEFAULT_PYRAMID_SCALE, DEFAULT_SCALES,
};
use crate::error::{DefmapError, Result};
use crate::io::frames::CropRect;

/// Complete, immutable analysis configuration handed to every stage.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    #[serde(default)]
    pub deformation: DeformationConfig,
    #[serde(default)]
    pub correlation: CorrelationConfig,
}

impl AnalysisConfig {
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let config: Self = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a TOML config file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        self.deformation.validate()?;
        self.correlation.validate()
    }
}

/// Scalar reduction applied to each motion field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    #[default]
    Divergence,
    Magnitude,
}

impl MetricKind {
    /// Short tag used in artifact names.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Divergence => "div",
            Self::Magnitude => "mag",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "div" => Some(Self::Divergence),
            "mag" => Some(Self::Magnitude),
            _ => None,
        }
    }
}

impl std::fmt::Display for MetricKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Divergence => write!(f, "Divergence"),
            Self::Magnitude => write!(f, "Magnitude"),
        }
    }
}

/// Fixed parameters of the polynomial-expansion dense flow.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FlowParams {
    pub pyramid_scale: f64,
    /// Coarser layers above the original; 0 runs at full resolution only.
    pub pyramid_levels: usize,
    pub window_size: usize,
    pub iterations: usize,
    pub poly_n: usize,
    pub poly_sigma: f64,
}

impl Default for FlowParams {
    fn default() -> Self {
        Self {
            pyramid_scale: DEFAULT_PYRAMID_SCALE,
            pyramid_levels: DEFAULT_PYRAMID_LEVELS,
            window_size: DEFAULT_FLOW_WINDOW,
            iterations: DEFAULT_FLOW_ITERATIONS,
            poly_n: DEFAULT_POLY_N,
            poly_sigma: DEFAULT_POLY_SIGMA,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeformationConfig {
    pub metric: MetricKind,
    /// Gaussian sigma applied to each flow channel; 0 disables smoothing.
    pub smoothing_sigma: f32,
    /// Use a single color channel (0=blue, 1=green, 2=red) instead of luminance.
    pub channel: Option<usize>,
    pub crop: Option<CropRect>,
    pub flow: FlowParams,
}

impl Default for DeformationConfig {
    fn default() -> Self {
        Self {
            metric: MetricKind::default(),
            smoothing_sigma: DEFAULT_FLOW_SMOOTHING_SIGMA,
            channel: None,
            crop: None,
            flow: FlowParams::default(),
        }
    }
}

impl DeformationConfig {
    pub fn validate(&self) -> Result<()> {
        if !(self.smoothing_sigma >= 0.0) {
            return Err(DefmapError::InvalidConfig(format!(
                "smoothing sigma must be >= 0, got {}",
                self.smoothing_sigma
            )));
        }
        if let Some(channel) = self.channel {
            if channel > 2 {
                return Err(DefmapError::InvalidConfig(format!(
                    "channel must be 0, 1 or 2, got {channel}"
                )));
            }
        }
        if let Some(ref crop) = self.crop {
            if crop.width == 0 || crop.height == 0 {
                return Err(DefmapError::InvalidCrop(
                    "Crop width and height must be > 0".into(),
                ));
            }
        }
        let flow = &self.flow;
        if !(flow.pyramid_scale > 0.0 && flow.pyramid_scale < 1.0) {
            return Err(DefmapError::InvalidConfig(format!(
                "pyramid scale must be in (0, 1), got {}",
                flow.pyramid_scale
            )));
        }
        if flow.iterations == 0 || flow.window_size == 0 {
            return Err(DefmapError::InvalidConfig(
                "iterations and window size must be > 0".into(),
            ));
        }
        if flow.poly_n < 3 || flow.poly_n % 2 == 0 || !(flow.poly_sigma > 0.0) {
            return Err(DefmapError::InvalidConfig(format!(
                "polynomial neighborhood must be odd and >= 3 with positive sigma, got n={} sigma={}",
                flow.poly_n, flow.poly_sigma
            )));
        }
        Ok(())
    }
}

/// How sampled values enter the correlation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignPolicy {
    #[default]
    Absolute,
    Signed,
}

impl SignPolicy {
    pub fn apply(&self, value: f64) -> f64 {
        match self {
            Self::Absolute => value.abs(),
            Self::Signed => value,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorrelationConfig {
    /// Detections are kept only when confidence is strictly greater.
    pub confidence_threshold: f64,
    pub lags: Vec<i32>,
    pub scales: Vec<f64>,
    pub sign_policy: SignPolicy,
}

impl Default for CorrelationConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            lags: (DEFAULT_LAG_MIN..=DEFAULT_LAG_MAX).collect(),
            scales: DEFAULT_SCALES.to_vec(),
            sign_policy: SignPolicy::default(),
        }
    }
}

impl CorrelationConfig {
    /// Inclusive lag range helper, e.g. `with_lag_range(-3, 3)`.
    pub fn with_lag_range(mut self, min: i32, max: i32) -> Self {
        self.lags = (min..=max).collect();
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            return Err(DefmapError::InvalidConfig(format!(
                "confidence threshold must be in [0, 1], got {}",
                self.confidence_threshold
            )));
        }
        if self.lags.is_empty() {
            return Err(DefmapError::InvalidConfig("lag set is empty".into()));
        }
        if self.scales.is_empty() {
            return Err(DefmapError::InvalidConfig("scale set is empty".into()));
        }
        if let Some(bad) = self.scales.iter().find(|s| !(**s > 0.0) || !s.is_finite()) {
            return Err(DefmapError::InvalidConfig(format!(
                "scales must be positive and finite, got {bad}"
            )));
        }

        let mut lags = self.lags.clone();
        lags.sort_unstable();
        if let Some(pair) = lags.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(DefmapError::InvalidConfig(format!(
                "duplicate lag {}",
                pair[0]
            )));
        }
        let mut scales = self.scales.clone();
        scales.sort_by(f64::total_cmp);
        if let Some(pair) = scales.windows(2).find(|pair| pair[0] == pair[1]) {
            return Err(DefmapError::InvalidConfig(format!(
                "duplicate scale {}",
                pair[0]
            )));
        }
        Ok(())
    }
}
