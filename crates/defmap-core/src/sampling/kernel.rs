use ndarray::{Array2, ArrayView2, Zip};

use crate::consts::KERNEL_SIGMA_DIVISOR;

/// Isotropic Gaussian weights over a (possibly edge-truncated) window.
///
/// Offsets are measured from the center of the window actually used and
/// the weights always sum to 1.
#[derive(Clone, Debug)]
pub struct SamplingKernel {
    weights: Array2<f64>,
}

impl SamplingKernel {
    /// Kernel for a `height × width` window cut out with radius `radius`.
    ///
    /// `sigma = radius / 1.5`. A zero radius degenerates to uniform weights.
    pub fn new(height: usize, width: usize, radius: usize) -> Self {
        let sigma = radius as f64 / KERNEL_SIGMA_DIVISOR;
        let cy = (height as f64 - 1.0) / 2.0;
        let cx = (width as f64 - 1.0) / 2.0;

        let mut weights = if sigma > 0.0 {
            let s2 = 2.0 * sigma * sigma;
            Array2::from_shape_fn((height, width), |(row, col)| {
                let dy = row as f64 - cy;
                let dx = col as f64 - cx;
                (-(dx * dx + dy * dy) / s2).exp()
            })
        } else {
            Array2::from_elem((height, width), 1.0)
        };

        let sum = weights.sum();
        if sum > 0.0 {
            weights /= sum;
        }
        Self { weights }
    }

    pub fn weights(&self) -> &Array2<f64> {
        &self.weights
    }

    pub fn sum(&self) -> f64 {
        self.weights.sum()
    }

    pub fn dim(&self) -> (usize, usize) {
        self.weights.dim()
    }

    /// Weighted sum of `window`, which must match the kernel's shape.
    pub fn apply(&self, window: ArrayView2<'_, f32>) -> f64 {
        debug_assert_eq!(window.dim(), self.weights.dim());
        let mut acc = 0.0f64;
        Zip::from(&self.weights)
            .and(&window)
            .for_each(|&w, &v| acc += w * v as f64);
        acc
    }
}
