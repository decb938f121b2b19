use ndarray::{Array2, Array3, Axis, Zip};
use tracing::debug;

use crate::config::FlowParams;
use crate::error::Result;
use crate::filters::box_blur::box_blur_array;
use crate::frame::MotionField;

use super::poly_expansion::{self, AXX, AXY, AYY, BX, BY};
use super::pyramid::{build_pyramid, resize_bilinear, sample_bilinear};

/// Per-pixel normal equations of the displacement solve: G = AᵀA, h = AᵀΔb.
const G11: usize = 0;
const G12: usize = 1;
const G22: usize = 2;
const H1: usize = 3;
const H2: usize = 4;
const MATRIX_PLANES: usize = 5;

/// Regularizer added to det(G) so textureless regions resolve to zero flow.
const DET_REGULARIZER: f64 = 1e-3;

/// Coarse-to-fine polynomial-expansion dense flow between two equally
/// sized intensity grids. Intensities are expected on an 8-bit scale.
pub fn farneback_flow(
    prev: &Array2<f32>,
    next: &Array2<f32>,
    params: &FlowParams,
) -> Result<MotionField> {
    let prev_pyramid = build_pyramid(prev, params.pyramid_scale, params.pyramid_levels);
    let next_pyramid = build_pyramid(next, params.pyramid_scale, params.pyramid_levels);
    let levels = prev_pyramid.len();
    debug!(levels, "Built flow pyramid");

    let (coarse_h, coarse_w) = prev_pyramid[levels - 1].dim();
    let mut flow = MotionField::zeros(coarse_h, coarse_w);

    for level in (0..levels).rev() {
        let prev_level = &prev_pyramid[level];
        let next_level = &next_pyramid[level];
        let (h, w) = prev_level.dim();

        if flow.dim() != (h, w) {
            flow = upscale_flow(&flow, h, w);
        }

        let r1 = poly_expansion::expand(prev_level, params.poly_n, params.poly_sigma)?;
        let r2 = poly_expansion::expand(next_level, params.poly_n, params.poly_sigma)?;

        for _ in 0..params.iterations {
            let mut matrices = update_matrices(&r1, &r2, &flow);
            blur_planes(&mut matrices, params.window_size);
            flow = solve_flow(&matrices);
        }
    }

    Ok(flow)
}

/// Resize a coarse flow to `(h, w)` and rescale the displacements to match.
fn upscale_flow(flow: &MotionField, h: usize, w: usize) -> MotionField {
    let (old_h, old_w) = flow.dim();
    let sx = w as f32 / old_w as f32;
    let sy = h as f32 / old_h as f32;
    let vx = resize_bilinear(&flow.vx, h, w).mapv(|v| v * sx);
    let vy = resize_bilinear(&flow.vy, h, w).mapv(|v| v * sy);
    MotionField::new(vx, vy)
}

/// Build the normal equations for every pixel given the current flow
/// estimate `d`: A = (A₁(x) + A₂(x+d)) / 2 and Δb = -(b₂(x+d) - b₁(x)) / 2 + A·d.
fn update_matrices(r1: &Array3<f32>, r2: &Array3<f32>, flow: &MotionField) -> Array3<f32> {
    let (_, h, w) = r1.dim();
    let next_planes: Vec<Array2<f32>> = r2.outer_iter().map(|p| p.to_owned()).collect();

    let mut matrices = Array3::<f32>::zeros((MATRIX_PLANES, h, w));
    Zip::indexed(matrices.lanes_mut(Axis(0))).par_for_each(|(row, col), mut m| {
        let dx = flow.vx[[row, col]];
        let dy = flow.vy[[row, col]];
        let y = row as f32 + dy;
        let x = col as f32 + dx;

        let bx2 = sample_bilinear(&next_planes[BX], y, x) as f64;
        let by2 = sample_bilinear(&next_planes[BY], y, x) as f64;
        let axx2 = sample_bilinear(&next_planes[AXX], y, x) as f64;
        let ayy2 = sample_bilinear(&next_planes[AYY], y, x) as f64;
        let axy2 = sample_bilinear(&next_planes[AXY], y, x) as f64;

        let a11 = (r1[[AXX, row, col]] as f64 + axx2) * 0.5;
        let a22 = (r1[[AYY, row, col]] as f64 + ayy2) * 0.5;
        let a12 = (r1[[AXY, row, col]] as f64 + axy2) * 0.25;

        let (dx, dy) = (dx as f64, dy as f64);
        let db1 = -(bx2 - r1[[BX, row, col]] as f64) * 0.5 + a11 * dx + a12 * dy;
        let db2 = -(by2 - r1[[BY, row, col]] as f64) * 0.5 + a12 * dx + a22 * dy;

        m[G11] = (a11 * a11 + a12 * a12) as f32;
        m[G12] = (a12 * (a11 + a22)) as f32;
        m[G22] = (a12 * a12 + a22 * a22) as f32;
        m[H1] = (a11 * db1 + a12 * db2) as f32;
        m[H2] = (a12 * db1 + a22 * db2) as f32;
    });

    matrices
}

/// Average each normal-equation plane over the flow window.
fn blur_planes(matrices: &mut Array3<f32>, window_size: usize) {
    for mut plane in matrices.outer_iter_mut() {
        let blurred = box_blur_array(&plane.to_owned(), window_size);
        plane.assign(&blurred);
    }
}

fn solve_flow(matrices: &Array3<f32>) -> MotionField {
    let (_, h, w) = matrices.dim();
    let mut flow = MotionField::zeros(h, w);

    Zip::indexed(&mut flow.vx)
        .and(&mut flow.vy)
        .par_for_each(|(row, col), vx, vy| {
            let g11 = matrices[[G11, row, col]] as f64;
            let g12 = matrices[[G12, row, col]] as f64;
            let g22 = matrices[[G22, row, col]] as f64;
            let h1 = matrices[[H1, row, col]] as f64;
            let h2 = matrices[[H2, row, col]] as f64;

            let idet = 1.0 / (g11 * g22 - g12 * g12 + DET_REGULARIZER);
            *vx = ((g22 * h1 - g12 * h2) * idet) as f32;
            *vy = ((g11 * h2 - g12 * h1) * idet) as f32;
        });

    flow
}
