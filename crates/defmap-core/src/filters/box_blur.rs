use ndarray::Array2;

use super::gaussian_blur::separable_convolve;

/// Normalized box filter with an odd window of `size` pixels per side.
///
/// Even sizes are widened by one so the window stays centered.
pub fn box_blur_array(data: &Array2<f32>, size: usize) -> Array2<f32> {
    let size = if size % 2 == 0 { size + 1 } else { size };
    if size <= 1 {
        return data.clone();
    }
    let kernel = vec![1.0 / size as f32; size];
    separable_convolve(data, &kernel)
}
