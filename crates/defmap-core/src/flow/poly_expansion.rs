use ndarray::{Array2, Array3, Axis, Zip};

use crate::error::{DefmapError, Result};

/// Plane indices of a polynomial expansion, see [`expand`].
pub(crate) const BX: usize = 0;
pub(crate) const BY: usize = 1;
pub(crate) const AXX: usize = 2;
pub(crate) const AYY: usize = 3;
pub(crate) const AXY: usize = 4;
pub(crate) const PLANES: usize = 5;

/// Basis order used by the least-squares fit: 1, x, y, x², y², xy.
const BASIS_LEN: usize = 6;

/// Fit `f(x, y) ≈ c + bx·x + by·y + axx·x² + ayy·y² + axy·xy` around every
/// pixel by Gaussian-weighted least squares over a `poly_n × poly_n`
/// neighborhood (x = column offset, y = row offset).
///
/// Returns a `(5, h, w)` array holding `bx, by, axx, ayy, axy`. The constant
/// term is not needed by the flow solver and is dropped. Borders replicate
/// the edge pixel, so the normal matrix is the same everywhere and is
/// inverted once.
pub(crate) fn expand(data: &Array2<f32>, poly_n: usize, poly_sigma: f64) -> Result<Array3<f32>> {
    let (h, w) = data.dim();
    let projection = projection_weights(poly_n, poly_sigma)?;
    let radius = (poly_n / 2) as isize;

    let mut out = Array3::<f32>::zeros((PLANES, h, w));
    Zip::indexed(out.lanes_mut(Axis(0))).par_for_each(|(row, col), mut lane| {
        let mut acc = [0.0f64; BASIS_LEN];
        let mut k = 0;
        for dy in -radius..=radius {
            let src_row = (row as isize + dy).clamp(0, h as isize - 1) as usize;
            for dx in -radius..=radius {
                let src_col = (col as isize + dx).clamp(0, w as isize - 1) as usize;
                let value = data[[src_row, src_col]] as f64;
                for (a, p) in acc.iter_mut().zip(projection.iter()) {
                    *a += p[k] * value;
                }
                k += 1;
            }
        }
        lane[BX] = acc[1] as f32;
        lane[BY] = acc[2] as f32;
        lane[AXX] = acc[3] as f32;
        lane[AYY] = acc[4] as f32;
        lane[AXY] = acc[5] as f32;
    });

    Ok(out)
}

/// Rows of `G⁻¹·Bᵀ·W`: multiplying row `i` with the neighborhood samples
/// (row-major, top-left first) yields basis coefficient `i`.
fn projection_weights(poly_n: usize, poly_sigma: f64) -> Result<Vec<Vec<f64>>> {
    let radius = (poly_n / 2) as isize;
    let s2 = 2.0 * poly_sigma * poly_sigma;

    let mut samples: Vec<([f64; BASIS_LEN], f64)> = Vec::with_capacity(poly_n * poly_n);
    for dy in -radius..=radius {
        for dx in -radius..=radius {
            let (x, y) = (dx as f64, dy as f64);
            let weight = (-(x * x + y * y) / s2).exp();
            samples.push(([1.0, x, y, x * x, y * y, x * y], weight));
        }
    }

    let mut normal = [[0.0f64; BASIS_LEN]; BASIS_LEN];
    for (basis, weight) in &samples {
        for i in 0..BASIS_LEN {
            for j in 0..BASIS_LEN {
                normal[i][j] += basis[i] * basis[j] * weight;
            }
        }
    }

    let inverse = invert(normal).ok_or_else(|| {
        DefmapError::InvalidConfig(format!(
            "polynomial expansion is singular for n={poly_n}, sigma={poly_sigma}"
        ))
    })?;

    let projection = (0..BASIS_LEN)
        .map(|i| {
            samples
                .iter()
                .map(|(basis, weight)| {
                    let row: f64 = (0..BASIS_LEN).map(|j| inverse[i][j] * basis[j]).sum();
                    row * weight
                })
                .collect()
        })
        .collect();

    Ok(projection)
}

/// Gauss-Jordan inversion with partial pivoting.
fn invert<const N: usize>(mut m: [[f64; N]; N]) -> Option<[[f64; N]; N]> {
    let mut inv = [[0.0f64; N]; N];
    for (i, row) in inv.iter_mut().enumerate() {
        row[i] = 1.0;
    }

    for col in 0..N {
        let pivot = (col..N).max_by(|&a, &b| m[a][col].abs().total_cmp(&m[b][col].abs()))?;
        if m[pivot][col].abs() < 1e-12 {
            return None;
        }
        m.swap(col, pivot);
        inv.swap(col, pivot);

        let p = m[col][col];
        for j in 0..N {
            m[col][j] /= p;
            inv[col][j] /= p;
        }

        for row in 0..N {
            if row == col {
                continue;
            }
            let factor = m[row][col];
            if factor == 0.0 {
                continue;
            }
            for j in 0..N {
                m[row][j] -= factor * m[col][j];
                inv[row][j] -= factor * inv[col][j];
            }
        }
    }

    Some(inv)
}
