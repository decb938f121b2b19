use std::path::Path;

use ndarray::{Array2, Array3, ArrayView2, Axis};

use crate::config::MetricKind;
use crate::error::{DefmapError, Result};
use crate::io::npy::{read_npy_f32, write_npy_f32};

/// Which slice and metric a stack was computed for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct StackId {
    pub slice: u32,
    pub metric: MetricKind,
}

/// Time-ordered scalar grids for one slice, shape = (N, height, width).
///
/// Grid `i` (1-based) describes the transition from frame `i` to `i + 1`.
#[derive(Clone, Debug)]
pub struct DeformationStack {
    pub id: StackId,
    data: Array3<f32>,
}

impl DeformationStack {
    /// Wrap an existing `(N, H, W)` tensor.
    pub fn new(id: StackId, data: Array3<f32>) -> Result<Self> {
        let (n, h, w) = data.dim();
        if n == 0 || h == 0 || w == 0 {
            return Err(DefmapError::InvalidStack(format!(
                "stack must be non-empty, got shape ({n}, {h}, {w})"
            )));
        }
        Ok(Self { id, data })
    }

    /// Stack per-pair grids in the given order. All grids must share a shape.
    pub fn from_grids(id: StackId, grids: &[Array2<f32>]) -> Result<Self> {
        let first = grids
            .first()
            .ok_or_else(|| DefmapError::InvalidStack("no grids to stack".into()))?;
        let (h, w) = first.dim();

        let mut data = Array3::<f32>::zeros((grids.len(), h, w));
        for (mut plane, grid) in data.outer_iter_mut().zip(grids) {
            if grid.dim() != (h, w) {
                return Err(DefmapError::ShapeMismatch {
                    expected: (h, w),
                    actual: grid.dim(),
                });
            }
            plane.assign(grid);
        }
        Self::new(id, data)
    }

    /// Number of grids (frame pairs).
    pub fn len(&self) -> usize {
        self.data.len_of(Axis(0))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn height(&self) -> usize {
        self.data.len_of(Axis(1))
    }

    pub fn width(&self) -> usize {
        self.data.len_of(Axis(2))
    }

    /// Grid at a 1-based stack index, `None` outside `1..=N`.
    pub fn grid(&self, index: i64) -> Option<ArrayView2<'_, f32>> {
        if index < 1 || index > self.len() as i64 {
            return None;
        }
        Some(self.data.index_axis(Axis(0), (index - 1) as usize))
    }

    pub fn data(&self) -> &Array3<f32> {
        &self.data
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        write_npy_f32(path, &self.data)
    }

    pub fn load(path: &Path, id: StackId) -> Result<Self> {
        let data = read_npy_f32(path)?;
        Self::new(id, data)
    }
}
