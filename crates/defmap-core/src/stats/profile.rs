use std::collections::BTreeMap;

use crate::sampling::{LagSample, SampleTable};

/// Mean and standard error of the sampled value at one lag.
#[derive(Clone, Debug, PartialEq)]
pub struct ProfilePoint {
    pub lag: i32,
    pub mean: f64,
    /// Standard error of the mean (sample std / √n); `None` for a single sample.
    pub sem: Option<f64>,
    pub count: usize,
}

/// Lag curve for one ROI scale, or pooled over scales when `scale` is `None`.
#[derive(Clone, Debug, PartialEq)]
pub struct LagProfile {
    pub scale: Option<f64>,
    /// Ascending by lag; only lags with samples appear.
    pub points: Vec<ProfilePoint>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct LagProfiles {
    pub per_scale: Vec<LagProfile>,
    pub pooled: LagProfile,
}

/// Group samples by lag and summarize each group.
pub fn lag_profile<'a>(
    samples: impl IntoIterator<Item = &'a LagSample>,
    scale: Option<f64>,
) -> LagProfile {
    let mut groups: BTreeMap<i32, Vec<f64>> = BTreeMap::new();
    for s in samples {
        groups.entry(s.lag).or_default().push(s.value);
    }

    let points = groups
        .into_iter()
        .map(|(lag, values)| {
            let count = values.len();
            let mean = values.iter().sum::<f64>() / count as f64;
            let sem = (count > 1).then(|| {
                let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
                    / (count - 1) as f64;
                (var / count as f64).sqrt()
            });
            ProfilePoint {
                lag,
                mean,
                sem,
                count,
            }
        })
        .collect();

    LagProfile { scale, points }
}

/// One curve per scale that produced samples, in `scales` order, plus the pooled curve.
pub fn lag_profiles(samples: &SampleTable, scales: &[f64]) -> LagProfiles {
    let per_scale = scales
        .iter()
        .map(|&scale| {
            lag_profile(
                samples.rows.iter().filter(|s| s.scale == scale),
                Some(scale),
            )
        })
        .filter(|profile| !profile.points.is_empty())
        .collect();

    LagProfiles {
        per_scale,
        pooled: lag_profile(&samples.rows, None),
    }
}
