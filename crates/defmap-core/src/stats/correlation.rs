use rayon::prelude::*;
use tracing::{debug, warn};

use crate::consts::{CORRELATION_METHOD, MIN_SAMPLES_PER_LAG, SIGNIFICANCE_LEVEL};
use crate::sampling::SampleTable;

use super::pearson::pearson;

/// Correlation between sampled value and confidence at one lag.
///
/// `r` and `p` are `None` when the lag had too few samples or a constant
/// side.
#[derive(Clone, Debug, PartialEq)]
pub struct LagStatistic {
    pub lag: i32,
    pub r: Option<f64>,
    pub p: Option<f64>,
    /// Pooled sample count (all scales).
    pub n: usize,
    pub method: &'static str,
}

impl LagStatistic {
    pub fn is_defined(&self) -> bool {
        self.r.is_some()
    }

    pub fn is_significant(&self) -> bool {
        self.p.is_some_and(|p| p < SIGNIFICANCE_LEVEL)
    }
}

/// One row per requested lag, in request order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StatisticsTable {
    pub rows: Vec<LagStatistic>,
}

impl StatisticsTable {
    pub fn get(&self, lag: i32) -> Option<&LagStatistic> {
        self.rows.iter().find(|s| s.lag == lag)
    }

    /// Smallest defined p-value across lags.
    pub fn min_p(&self) -> Option<f64> {
        self.rows
            .iter()
            .filter_map(|s| s.p)
            .filter(|p| !p.is_nan())
            .min_by(f64::total_cmp)
    }

    pub fn significant_lags(&self) -> Vec<i32> {
        self.rows
            .iter()
            .filter(|s| s.is_significant())
            .map(|s| s.lag)
            .collect()
    }
}

/// Headline numbers for annotating lag curves.
#[derive(Clone, Debug, PartialEq)]
pub struct CorrelationSummary {
    /// Distinct detection frames contributing samples.
    pub event_count: usize,
    pub sample_count: usize,
    pub min_p: Option<f64>,
    pub significant_lags: Vec<i32>,
}

impl CorrelationSummary {
    pub fn new(samples: &SampleTable, statistics: &StatisticsTable) -> Self {
        Self {
            event_count: samples.event_count(),
            sample_count: samples.len(),
            min_p: statistics.min_p(),
            significant_lags: statistics.significant_lags(),
        }
    }
}

/// Pearson correlation of value vs. confidence per lag, pooling all scales.
///
/// Every requested lag gets a row; lags with fewer than two samples or
/// without variance are left undefined and logged.
pub fn correlate_lags(samples: &SampleTable, lags: &[i32]) -> StatisticsTable {
    let rows = lags
        .par_iter()
        .map(|&lag| {
            let (values, confidences): (Vec<f64>, Vec<f64>) =
                samples.at_lag(lag).map(|s| (s.value, s.confidence)).unzip();
            let n = values.len();

            let correlation = if n < MIN_SAMPLES_PER_LAG {
                warn!(lag, samples = n, "Too few samples for a correlation");
                None
            } else {
                let c = pearson(&values, &confidences);
                if c.is_none() {
                    warn!(lag, samples = n, "Constant samples, correlation undefined");
                }
                c
            };

            if let Some(c) = correlation {
                debug!(lag, r = c.r, p = c.p, samples = n, "Lag correlation");
            }
            LagStatistic {
                lag,
                r: correlation.map(|c| c.r),
                p: correlation.map(|c| c.p),
                n,
                method: CORRELATION_METHOD,
            }
        })
        .collect();

    StatisticsTable { rows }
}
