use statrs::distribution::{ContinuousCDF, StudentsT};

use crate::consts::EPSILON;

/// Pearson coefficient with its two-sided p-value.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Correlation {
    pub r: f64,
    pub p: f64,
}

/// Pearson correlation of paired samples.
///
/// `None` when fewer than two pairs are given, the lengths differ, a value
/// is not finite, or either side has zero variance. The p-value tests
/// `r = 0` against a Student t distribution with `n - 2` degrees of freedom;
/// with exactly two pairs it is 1.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<Correlation> {
    let n = x.len();
    if n < 2 || n != y.len() {
        return None;
    }
    if x.iter().chain(y).any(|v| !v.is_finite()) {
        return None;
    }

    let mean_x = x.iter().sum::<f64>() / n as f64;
    let mean_y = y.iter().sum::<f64>() / n as f64;

    let (mut sxy, mut sxx, mut syy) = (0.0f64, 0.0f64, 0.0f64);
    for (&a, &b) in x.iter().zip(y) {
        let dx = a - mean_x;
        let dy = b - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if is_constant(sxx, mean_x, n) || is_constant(syy, mean_y, n) {
        return None;
    }

    let r = (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0);
    Some(Correlation {
        r,
        p: two_sided_p(r, n),
    })
}

/// Sum of squared deviations indistinguishable from rounding noise.
fn is_constant(sum_sq: f64, mean: f64, n: usize) -> bool {
    let tolerance = EPSILON * mean.abs().max(1.0);
    sum_sq <= n as f64 * tolerance * tolerance
}

fn two_sided_p(r: f64, n: usize) -> f64 {
    if n <= 2 {
        return 1.0;
    }
    let df = (n - 2) as f64;
    let denom = 1.0 - r * r;
    if denom <= 0.0 {
        return 0.0;
    }
    let t = r * (df / denom).sqrt();
    match StudentsT::new(0.0, 1.0, df) {
        Ok(dist) => (2.0 * dist.sf(t.abs())).clamp(0.0, 1.0),
        Err(_) => f64::NAN,
    }
}
