use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use ndarray::{s, Array2};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::DeformationConfig;
use crate::error::{DefmapError, Result};
use crate::frame::{Frame, FrameKey};

use super::naming::FrameNaming;

/// Supplies grayscale frames by key. Intensities are on an 8-bit scale.
pub trait FrameSource: Send + Sync {
    /// Every key the source can load, in ascending order.
    fn keys(&self) -> Result<Vec<FrameKey>>;

    fn load(&self, key: FrameKey) -> Result<Frame>;
}

/// Group keys per slice: slice id → ascending time indices.
pub fn group_by_slice(keys: &[FrameKey]) -> BTreeMap<u32, Vec<u32>> {
    let mut groups: BTreeMap<u32, Vec<u32>> = BTreeMap::new();
    for key in keys {
        groups.entry(key.slice).or_default().push(key.time);
    }
    for times in groups.values_mut() {
        times.sort_unstable();
        times.dedup();
    }
    groups
}

/// A rectangle in image coordinates for cropping.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CropRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl CropRect {
    /// Check that the rect is non-empty and fits within `src_w × src_h`.
    pub fn validated(&self, src_w: usize, src_h: usize) -> Result<CropRect> {
        if self.width == 0 || self.height == 0 {
            return Err(DefmapError::InvalidCrop(
                "Crop width and height must be > 0".into(),
            ));
        }

        let right = self.x as usize + self.width as usize;
        let bottom = self.y as usize + self.height as usize;
        if right > src_w || bottom > src_h {
            return Err(DefmapError::InvalidCrop(format!(
                "Crop region ({},{} {}x{}) exceeds source dimensions ({src_w}x{src_h})",
                self.x, self.y, self.width, self.height
            )));
        }

        Ok(self.clone())
    }

    pub fn apply(&self, data: &Array2<f32>) -> Result<Array2<f32>> {
        let (h, w) = data.dim();
        let rect = self.validated(w, h)?;
        let (x, y) = (rect.x as usize, rect.y as usize);
        Ok(data
            .slice(s![y..y + rect.height as usize, x..x + rect.width as usize])
            .to_owned())
    }
}

/// In-memory frames, e.g. produced by an external loader or a test.
#[derive(Clone, Debug, Default)]
pub struct MemoryFrameSource {
    frames: BTreeMap<FrameKey, Array2<f32>>,
}

impl MemoryFrameSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: FrameKey, data: Array2<f32>) {
        self.frames.insert(key, data);
    }

    pub fn with_slice(mut self, slice: u32, frames: Vec<Array2<f32>>) -> Self {
        for (i, data) in frames.into_iter().enumerate() {
            self.insert(FrameKey::new(i as u32 + 1, slice), data);
        }
        self
    }
}

impl FrameSource for MemoryFrameSource {
    fn keys(&self) -> Result<Vec<FrameKey>> {
        Ok(self.frames.keys().copied().collect())
    }

    fn load(&self, key: FrameKey) -> Result<Frame> {
        self.frames
            .get(&key)
            .map(|data| Frame::new(data.clone(), key))
            .ok_or_else(|| DefmapError::SourceUnavailable {
                key,
                reason: "no such frame".into(),
            })
    }
}

/// Which intensity plane to read from color images.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ChannelSelection {
    /// BT.601 weighted gray level.
    #[default]
    Luminance,
    /// 0 = blue, 1 = green, 2 = red.
    Channel(usize),
}

/// Frames stored as image files in one directory, keyed by a naming strategy.
pub struct DirectoryFrameSource {
    index: BTreeMap<FrameKey, PathBuf>,
    channel: ChannelSelection,
    crop: Option<CropRect>,
}

impl DirectoryFrameSource {
    /// Scan `dir` and index every file whose name `naming` understands.
    /// Non-matching names are skipped.
    pub fn open(dir: &Path, naming: &dyn FrameNaming) -> Result<Self> {
        let mut names: Vec<(String, PathBuf)> = std::fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .filter_map(|path| {
                let name = path.file_name()?.to_str()?.to_owned();
                Some((name, path))
            })
            .collect();
        names.sort();

        let mut index = BTreeMap::new();
        for (name, path) in names {
            match naming.parse(&name) {
                Some(key) => {
                    index.insert(key, path);
                }
                None => debug!(file = %name, "Skipping file outside naming convention"),
            }
        }

        Ok(Self {
            index,
            channel: ChannelSelection::Luminance,
            crop: None,
        })
    }

    /// Apply the channel and crop settings of a deformation config.
    pub fn configured(mut self, config: &DeformationConfig) -> Self {
        self.channel = match config.channel {
            Some(c) => ChannelSelection::Channel(c),
            None => ChannelSelection::Luminance,
        };
        self.crop = config.crop.clone();
        self
    }

    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    fn read(&self, path: &Path) -> Result<Array2<f32>> {
        let img = image::open(path)?;
        let data = match self.channel {
            ChannelSelection::Luminance => {
                let rgb = img.to_rgb8();
                let (w, h) = rgb.dimensions();
                Array2::from_shape_fn((h as usize, w as usize), |(row, col)| {
                    luminance_bt601(rgb.get_pixel(col as u32, row as u32).0)
                })
            }
            ChannelSelection::Channel(c) => {
                let rgb = img.to_rgb8();
                let (w, h) = rgb.dimensions();
                // Channel indices follow BGR order.
                let plane = 2 - c.min(2);
                Array2::from_shape_fn((h as usize, w as usize), |(row, col)| {
                    rgb.get_pixel(col as u32, row as u32).0[plane] as f32
                })
            }
        };

        match self.crop {
            Some(ref crop) => crop.apply(&data),
            None => Ok(data),
        }
    }
}

/// 8-bit BT.601 luma, rounded to the nearest integer level.
fn luminance_bt601([r, g, b]: [u8; 3]) -> f32 {
    (0.299 * r as f32 + 0.587 * g as f32 + 0.114 * b as f32).round()
}

impl FrameSource for DirectoryFrameSource {
    fn keys(&self) -> Result<Vec<FrameKey>> {
        Ok(self.index.keys().copied().collect())
    }

    fn load(&self, key: FrameKey) -> Result<Frame> {
        let path = self
            .index
            .get(&key)
            .ok_or_else(|| DefmapError::SourceUnavailable {
                key,
                reason: "no file for this key".into(),
            })?;

        match self.read(path) {
            Ok(data) => Ok(Frame::new(data, key)),
            Err(err @ DefmapError::InvalidCrop(_)) => Err(err),
            Err(err) => Err(DefmapError::SourceUnavailable {
                key,
                reason: format!("{}: {err}", path.display()),
            }),
        }
    }
}
