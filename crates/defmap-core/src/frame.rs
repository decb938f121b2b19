use ndarray::Array2;

/// Identity of a frame within an acquisition: time index and spatial slice.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FrameKey {
    pub time: u32,
    pub slice: u32,
}

impl FrameKey {
    pub fn new(time: u32, slice: u32) -> Self {
        Self { time, slice }
    }
}

impl std::fmt::Display for FrameKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "t{} z{}", self.time, self.slice)
    }
}

/// A single grayscale image frame.
#[derive(Clone, Debug)]
pub struct Frame {
    /// Pixel data, row-major, shape = (height, width)
    pub data: Array2<f32>,
    pub key: FrameKey,
}

impl Frame {
    pub fn new(data: Array2<f32>, key: FrameKey) -> Self {
        Self { data, key }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn dim(&self) -> (usize, usize) {
        self.data.dim()
    }
}

/// Dense per-pixel displacement between two frames.
///
/// `vx` is the horizontal (column) displacement and `vy` the vertical (row)
/// displacement, both in pixels, shape = (height, width).
#[derive(Clone, Debug, PartialEq)]
pub struct MotionField {
    pub vx: Array2<f32>,
    pub vy: Array2<f32>,
}

impl MotionField {
    pub fn new(vx: Array2<f32>, vy: Array2<f32>) -> Self {
        debug_assert_eq!(vx.dim(), vy.dim());
        Self { vx, vy }
    }

    pub fn zeros(height: usize, width: usize) -> Self {
        Self {
            vx: Array2::zeros((height, width)),
            vy: Array2::zeros((height, width)),
        }
    }

    /// Constant translation over the whole grid.
    pub fn uniform(height: usize, width: usize, dx: f32, dy: f32) -> Self {
        Self {
            vx: Array2::from_elem((height, width), dx),
            vy: Array2::from_elem((height, width), dy),
        }
    }

    pub fn dim(&self) -> (usize, usize) {
        self.vx.dim()
    }
}
