use ndarray::Array2;
use rayon::prelude::*;

use crate::consts::PARALLEL_PIXEL_THRESHOLD;

/// Apply an isotropic Gaussian blur using separable 1D convolution.
///
/// Borders replicate the edge pixel. `sigma <= 0` returns an unmodified copy.
pub fn gaussian_blur_array(data: &Array2<f32>, sigma: f32) -> Array2<f32> {
    if !(sigma > 0.0) {
        return data.clone();
    }
    let kernel = make_gaussian_kernel(sigma);
    separable_convolve(data, &kernel)
}

pub(crate) fn make_gaussian_kernel(sigma: f32) -> Vec<f32> {
    let radius = (sigma * 3.0).ceil() as usize;
    let size = 2 * radius + 1;
    let mut kernel = vec![0.0f32; size];
    let s2 = 2.0 * sigma * sigma;
    let mut sum = 0.0f32;

    for (i, k) in kernel.iter_mut().enumerate() {
        let x = i as f32 - radius as f32;
        *k = (-x * x / s2).exp();
        sum += *k;
    }

    for v in &mut kernel {
        *v /= sum;
    }

    kernel
}

/// Convolve rows then columns with the same odd-length kernel.
pub(crate) fn separable_convolve(data: &Array2<f32>, kernel: &[f32]) -> Array2<f32> {
    let row_pass = convolve_rows(data, kernel);
    convolve_cols(&row_pass, kernel)
}

fn convolve_rows(data: &Array2<f32>, kernel: &[f32]) -> Array2<f32> {
    let (_, w) = data.dim();
    let radius = kernel.len() / 2;
    convolve_with(data, |row, col| {
        let mut sum = 0.0f32;
        for (ki, &kv) in kernel.iter().enumerate() {
            let src_col =
                (col as isize + ki as isize - radius as isize).clamp(0, w as isize - 1) as usize;
            sum += data[[row, src_col]] * kv;
        }
        sum
    })
}

fn convolve_cols(data: &Array2<f32>, kernel: &[f32]) -> Array2<f32> {
    let (h, _) = data.dim();
    let radius = kernel.len() / 2;
    convolve_with(data, |row, col| {
        let mut sum = 0.0f32;
        for (ki, &kv) in kernel.iter().enumerate() {
            let src_row =
                (row as isize + ki as isize - radius as isize).clamp(0, h as isize - 1) as usize;
            sum += data[[src_row, col]] * kv;
        }
        sum
    })
}

fn convolve_with<F>(data: &Array2<f32>, pixel: F) -> Array2<f32>
where
    F: Fn(usize, usize) -> f32 + Sync,
{
    let (h, w) = data.dim();
    let mut result = Array2::<f32>::zeros((h, w));

    if h * w >= PARALLEL_PIXEL_THRESHOLD {
        let rows: Vec<Vec<f32>> = (0..h)
            .into_par_iter()
            .map(|row| (0..w).map(|col| pixel(row, col)).collect())
            .collect();

        for (row, row_data) in rows.into_iter().enumerate() {
            for (col, val) in row_data.into_iter().enumerate() {
                result[[row, col]] = val;
            }
        }
    } else {
        for row in 0..h {
            for col in 0..w {
                result[[row, col]] = pixel(row, col);
            }
        }
    }

    result
}
