//! Mapping between abstract keys and storage identities (file names).

use std::path::Path;

use crate::config::MetricKind;
use crate::frame::FrameKey;

/// Maps a (time, slice) key to and from a frame file name.
pub trait FrameNaming: Send + Sync {
    /// `None` when the name does not follow the convention; such files are skipped.
    fn parse(&self, file_name: &str) -> Option<FrameKey>;
    fn file_name(&self, key: FrameKey) -> String;
}

/// `<prefix>_t<time>_z<slice><anything>.<extension>`, e.g. `cells_t0003_z0001.png`.
#[derive(Clone, Debug)]
pub struct TimeSliceNaming {
    pub prefix: String,
    pub extension: String,
}

impl Default for TimeSliceNaming {
    fn default() -> Self {
        Self {
            prefix: "frame".into(),
            extension: "png".into(),
        }
    }
}

impl FrameNaming for TimeSliceNaming {
    fn parse(&self, file_name: &str) -> Option<FrameKey> {
        let stem = file_name.strip_suffix(&format!(".{}", self.extension))?;
        stem.match_indices("_t").find_map(|(pos, _)| {
            let rest = &stem[pos + 2..];
            let (time, rest) = split_digits(rest)?;
            let rest = rest.strip_prefix("_z")?;
            let (slice, _) = split_digits(rest)?;
            Some(FrameKey::new(time, slice))
        })
    }

    fn file_name(&self, key: FrameKey) -> String {
        format!(
            "{}_t{:04}_z{:04}.{}",
            self.prefix, key.time, key.slice, self.extension
        )
    }
}

/// Maps a frame number to and from a per-frame detection file name.
pub trait LabelNaming: Send + Sync {
    fn parse(&self, file_name: &str) -> Option<u32>;
    fn file_name(&self, frame: u32) -> String;
}

/// `<anything>frame_<number>.txt`.
#[derive(Clone, Debug)]
pub struct FrameNumberNaming {
    pub prefix: String,
    pub extension: String,
}

impl Default for FrameNumberNaming {
    fn default() -> Self {
        Self {
            prefix: "frame_".into(),
            extension: "txt".into(),
        }
    }
}

impl LabelNaming for FrameNumberNaming {
    fn parse(&self, file_name: &str) -> Option<u32> {
        let stem = file_name.strip_suffix(&format!(".{}", self.extension))?;
        let pos = stem.rfind(&self.prefix)?;
        let (frame, rest) = split_digits(&stem[pos + self.prefix.len()..])?;
        rest.is_empty().then_some(frame)
    }

    fn file_name(&self, frame: u32) -> String {
        format!("{}{}.{}", self.prefix, frame, self.extension)
    }
}

/// Maps (slice, metric) to and from a persisted stack name.
pub trait StackNaming: Send + Sync {
    fn parse(&self, file_name: &str) -> Option<(u32, MetricKind)>;
    fn file_name(&self, slice: u32, metric: MetricKind) -> String;
}

/// `defmap_stack_Z<slice>_<div|mag>.npy`.
#[derive(Clone, Debug, Default)]
pub struct DefmapStackNaming;

impl StackNaming for DefmapStackNaming {
    fn parse(&self, file_name: &str) -> Option<(u32, MetricKind)> {
        let rest = file_name
            .strip_prefix("defmap_stack_Z")?
            .strip_suffix(".npy")?;
        let (slice, rest) = split_digits(rest)?;
        let metric = MetricKind::from_tag(rest.strip_prefix('_')?)?;
        Some((slice, metric))
    }

    fn file_name(&self, slice: u32, metric: MetricKind) -> String {
        format!("defmap_stack_Z{}_{}.npy", slice, metric.tag())
    }
}

/// Label for outputs derived from a stack file: `Z<slice>` when the stem
/// carries a `_Z<digits>` marker, otherwise the stem itself.
pub fn stack_tag(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tagged = stem
        .match_indices("_Z")
        .find_map(|(pos, _)| split_digits(&stem[pos + 2..]).map(|(slice, _)| format!("Z{slice}")));
    match tagged {
        Some(tag) => tag,
        None => stem,
    }
}

/// Split a leading run of ASCII digits off `s` and parse it.
fn split_digits(s: &str) -> Option<(u32, &str)> {
    let end = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
    if end == 0 {
        return None;
    }
    let value = s[..end].parse().ok()?;
    Some((value, &s[end..]))
}
