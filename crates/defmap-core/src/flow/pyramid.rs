use ndarray::{Array2, Zip};

use crate::consts::MIN_PYRAMID_SIZE;
use crate::filters::gaussian_blur::gaussian_blur_array;

/// Build an image pyramid of the original plus up to `levels` coarser layers.
///
/// Index 0 is the original; layer `k` is the original smoothed with
/// `sigma = (1/scale^k - 1) / 2` and resampled by `scale^k`. Layers whose
/// shorter side would drop below [`MIN_PYRAMID_SIZE`] are not built.
pub(crate) fn build_pyramid(data: &Array2<f32>, scale: f64, levels: usize) -> Vec<Array2<f32>> {
    let (h, w) = data.dim();
    let mut pyramid = Vec::with_capacity(levels + 1);
    pyramid.push(data.clone());

    for k in 1..=levels {
        let factor = scale.powi(k as i32);
        if (h as f64 * factor) < MIN_PYRAMID_SIZE as f64
            || (w as f64 * factor) < MIN_PYRAMID_SIZE as f64
        {
            break;
        }
        let new_h = (h as f64 * factor).round() as usize;
        let new_w = (w as f64 * factor).round() as usize;
        let sigma = ((1.0 / factor - 1.0) * 0.5) as f32;
        let blurred = gaussian_blur_array(data, sigma);
        pyramid.push(resize_bilinear(&blurred, new_h, new_w));
    }

    pyramid
}

/// Resample to `(new_h, new_w)` with pixel-center aligned bilinear interpolation.
pub(crate) fn resize_bilinear(data: &Array2<f32>, new_h: usize, new_w: usize) -> Array2<f32> {
    let (h, w) = data.dim();
    if (h, w) == (new_h, new_w) {
        return data.clone();
    }
    let sy = h as f32 / new_h as f32;
    let sx = w as f32 / new_w as f32;

    let mut out = Array2::<f32>::zeros((new_h, new_w));
    Zip::indexed(&mut out).par_for_each(|(row, col), v| {
        let y = (row as f32 + 0.5) * sy - 0.5;
        let x = (col as f32 + 0.5) * sx - 0.5;
        *v = sample_bilinear(data, y, x);
    });
    out
}

/// Bilinear sample at fractional `(y, x)`, clamping to the border.
pub(crate) fn sample_bilinear(data: &Array2<f32>, y: f32, x: f32) -> f32 {
    let (h, w) = data.dim();
    let y = y.clamp(0.0, (h - 1) as f32);
    let x = x.clamp(0.0, (w - 1) as f32);

    let y0 = y.floor() as usize;
    let x0 = x.floor() as usize;
    let y1 = (y0 + 1).min(h - 1);
    let x1 = (x0 + 1).min(w - 1);
    let fy = y - y0 as f32;
    let fx = x - x0 as f32;

    let top = data[[y0, x0]] * (1.0 - fx) + data[[y0, x1]] * fx;
    let bottom = data[[y1, x0]] * (1.0 - fx) + data[[y1, x1]] * fx;
    top * (1.0 - fy) + bottom * fy
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_levels_count_layers_above_original() {
        let data = Array2::<f32>::zeros((256, 256));
        let sizes: Vec<_> = build_pyramid(&data, 0.5, 3).iter().map(|l| l.dim()).collect();
        assert_eq!(sizes, vec![(256, 256), (128, 128), (64, 64), (32, 32)]);
    }

    #[test]
    fn test_small_images_stop_at_min_size() {
        let data = Array2::<f32>::zeros((64, 80));
        assert_eq!(build_pyramid(&data, 0.5, 3).len(), 2);
        assert_eq!(build_pyramid(&data, 0.5, 0).len(), 1);
    }

    #[test]
    fn test_resize_keeps_constant_image() {
        let data = Array2::from_elem((40, 40), 7.0f32);
        let out = resize_bilinear(&data, 20, 20);
        assert!(out.iter().all(|&v| (v - 7.0).abs() < 1e-6));
    }
}
