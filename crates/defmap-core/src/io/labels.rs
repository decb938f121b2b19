use std::fs;
use std::path::Path;

use tracing::debug;

use crate::detection::DetectionRecord;
use crate::error::Result;

use super::naming::LabelNaming;

/// Parse one `class cx cy w h conf` line; the class id is ignored.
///
/// `None` for blank or malformed lines, including `nan` or `inf` fields.
pub fn parse_detection_line(frame: u32, id: usize, line: &str) -> Option<DetectionRecord> {
    let fields: Vec<f64> = line
        .split_whitespace()
        .map(|f| f.parse::<f64>().ok().filter(|v| v.is_finite()))
        .collect::<Option<_>>()?;
    let &[_class, x_center, y_center, width, height, confidence] = fields.as_slice() else {
        return None;
    };
    Some(DetectionRecord {
        id,
        frame,
        x_center,
        y_center,
        width,
        height,
        confidence,
    })
}

/// Parse every record of one frame's detection text.
///
/// Ids continue from `first_id`.
pub fn parse_detections(frame: u32, first_id: usize, text: &str) -> Vec<DetectionRecord> {
    let mut records = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match parse_detection_line(frame, first_id + records.len(), line) {
            Some(record) => records.push(record),
            None => debug!(frame, line = line_no + 1, "Skipping malformed detection line"),
        }
    }
    records
}

/// Read all per-frame label files in `dir`, ordered by frame number.
///
/// Files outside the naming convention are skipped.
pub fn read_label_dir(dir: &Path, naming: &dyn LabelNaming) -> Result<Vec<DetectionRecord>> {
    let mut files: Vec<(u32, std::path::PathBuf)> = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        match naming.parse(name) {
            Some(frame) => files.push((frame, path.clone())),
            None => debug!(file = %name, "Skipping file outside label naming convention"),
        }
    }
    files.sort();

    let mut records = Vec::new();
    for (frame, path) in files {
        let text = fs::read_to_string(&path)?;
        let parsed = parse_detections(frame, records.len(), &text);
        records.extend(parsed);
    }
    debug!(count = records.len(), dir = %dir.display(), "Detections loaded");
    Ok(records)
}
