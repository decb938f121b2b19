#[allow(dead_code)]
mod common;

use std::fs;

use ndarray::{Array2, Array3};
use tempfile::TempDir;

use defmap_core::config::{DeformationConfig, MetricKind};
use defmap_core::error::DefmapError;
use defmap_core::frame::FrameKey;
use defmap_core::io::frames::{
    group_by_slice, CropRect, DirectoryFrameSource, FrameSource, MemoryFrameSource,
};
use defmap_core::io::labels::{parse_detection_line, parse_detections, read_label_dir};
use defmap_core::io::naming::{
    stack_tag, DefmapStackNaming, FrameNaming, FrameNumberNaming, LabelNaming, StackNaming,
    TimeSliceNaming,
};
use defmap_core::io::npy::{parse_npy_f32, read_npy_f32, write_npy_f32, write_npy_to};
use defmap_core::stack::DeformationStack;

// ---------------------------------------------------------------------------
// npy
// ---------------------------------------------------------------------------

#[test]
fn test_npy_header_is_aligned() {
    let data = Array3::<f32>::zeros((3, 4, 5));
    let mut buf = Vec::new();
    write_npy_to(&mut buf, &data).unwrap();

    assert_eq!(&buf[..6], b"\x93NUMPY");
    assert_eq!(buf[6], 1);
    let header_len = u16::from_le_bytes([buf[8], buf[9]]) as usize;
    assert_eq!((10 + header_len) % 64, 0);
    assert_eq!(buf[10 + header_len - 1], b'\n');
    assert_eq!(buf.len(), 10 + header_len + 3 * 4 * 5 * 4);

    let header = std::str::from_utf8(&buf[10..10 + header_len]).unwrap();
    assert!(header.contains("'descr': '<f4'"));
    assert!(header.contains("'shape': (3, 4, 5)"));
}

#[test]
fn test_npy_file_roundtrip() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("stack.npy");
    let data = Array3::from_shape_fn((2, 3, 4), |(i, r, c)| i as f32 * 100.0 + r as f32 * 10.0 - c as f32);
    write_npy_f32(&path, &data).unwrap();

    assert!(!dir.path().join("stack.npy.partial").exists());
    assert_eq!(read_npy_f32(&path).unwrap(), data);
}

#[test]
fn test_npy_rejects_non_float32() {
    let header = "{'descr': '<f8', 'fortran_order': False, 'shape': (1, 1, 1), }";
    let mut buf = b"\x93NUMPY\x01\x00".to_vec();
    buf.extend_from_slice(&(header.len() as u16).to_le_bytes());
    buf.extend_from_slice(header.as_bytes());
    buf.extend_from_slice(&[0u8; 8]);
    assert!(matches!(parse_npy_f32(&buf), Err(DefmapError::InvalidStack(_))));
}

#[test]
fn test_npy_rejects_truncated_payload() {
    let data = Array3::<f32>::ones((2, 2, 2));
    let mut buf = Vec::new();
    write_npy_to(&mut buf, &data).unwrap();
    buf.truncate(buf.len() - 4);
    assert!(parse_npy_f32(&buf).is_err());
}

#[test]
fn test_npy_rejects_garbage() {
    assert!(parse_npy_f32(b"not a numpy file").is_err());
}

#[test]
fn test_stack_save_and_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("defmap_stack_Z1_div.npy");
    let stack = common::stack_from_fn(4, 6, 8, |i, r, c| (i * r) as f32 - c as f32);
    stack.save(&path).unwrap();

    let loaded = DeformationStack::load(&path, common::stack_id(1)).unwrap();
    assert_eq!(loaded.data(), stack.data());
    assert_eq!(loaded.id, stack.id);
}

// ---------------------------------------------------------------------------
// naming
// ---------------------------------------------------------------------------

#[test]
fn test_time_slice_naming_parse() {
    let naming = TimeSliceNaming::default();
    assert_eq!(naming.parse("frame_t0003_z0002.png"), Some(FrameKey::new(3, 2)));
    assert_eq!(naming.parse("cells_run_t12_z1_ch00.png"), Some(FrameKey::new(12, 1)));
    assert_eq!(naming.parse("frame_t0003_z0002.tif"), None);
    assert_eq!(naming.parse("notes.png"), None);
    assert_eq!(naming.parse("frame_t_z1.png"), None);
}

#[test]
fn test_time_slice_naming_file_name_roundtrip() {
    let naming = TimeSliceNaming::default();
    let key = FrameKey::new(7, 3);
    let name = naming.file_name(key);
    assert_eq!(name, "frame_t0007_z0003.png");
    assert_eq!(naming.parse(&name), Some(key));
}

#[test]
fn test_label_naming() {
    let naming = FrameNumberNaming::default();
    assert_eq!(naming.parse("frame_12.txt"), Some(12));
    assert_eq!(naming.parse("video_frame_3.txt"), Some(3));
    assert_eq!(naming.parse("frame_3b.txt"), None);
    assert_eq!(naming.parse("frame_3.csv"), None);
    assert_eq!(naming.file_name(5), "frame_5.txt");
}

#[test]
fn test_stack_naming() {
    let naming = DefmapStackNaming;
    assert_eq!(
        naming.file_name(2, MetricKind::Divergence),
        "defmap_stack_Z2_div.npy"
    );
    assert_eq!(
        naming.parse("defmap_stack_Z4_mag.npy"),
        Some((4, MetricKind::Magnitude))
    );
    assert_eq!(naming.parse("defmap_stack_Z4_curl.npy"), None);
    assert_eq!(naming.parse("other.npy"), None);
}

#[test]
fn test_stack_tag() {
    assert_eq!(stack_tag(std::path::Path::new("out/defmap_stack_Z3_div.npy")), "Z3");
    assert_eq!(stack_tag(std::path::Path::new("custom_stack.npy")), "custom_stack");
}

// ---------------------------------------------------------------------------
// labels
// ---------------------------------------------------------------------------

#[test]
fn test_parse_detection_line() {
    let det = parse_detection_line(4, 0, "0 0.5 0.25 0.1 0.2 0.87").unwrap();
    assert_eq!(det.frame, 4);
    assert_eq!(det.x_center, 0.5);
    assert_eq!(det.y_center, 0.25);
    assert_eq!(det.width, 0.1);
    assert_eq!(det.height, 0.2);
    assert_eq!(det.confidence, 0.87);

    assert!(parse_detection_line(1, 0, "0 0.5 0.5 0.1 0.1").is_none());
    assert!(parse_detection_line(1, 0, "0 0.5 x 0.1 0.1 0.9").is_none());
}

#[test]
fn test_parse_detections_skips_bad_lines() {
    let text = "0 0.1 0.1 0.05 0.05 0.9\n\ngarbage\n1 0.2 0.3 0.05 0.05 0.4\n";
    let dets = parse_detections(2, 10, text);
    assert_eq!(dets.len(), 2);
    assert_eq!(dets[0].id, 10);
    assert_eq!(dets[1].id, 11);
    assert_eq!(dets[1].confidence, 0.4);
}

#[test]
fn test_parse_detections_skips_non_finite_fields() {
    let text = "0 0.5 0.5 inf 0.1 0.9\n0 nan 0.5 0.1 0.1 0.9\n0 0.5 0.5 0.1 0.1 -inf\n0 0.4 0.6 0.1 0.1 0.8\n";
    let dets = parse_detections(2, 0, text);
    assert_eq!(dets.len(), 1);
    assert_eq!(dets[0].x_center, 0.4);
    assert_eq!(dets[0].id, 0);
    assert!(parse_detection_line(2, 0, "0 NaN 0.5 0.1 0.1 0.9").is_none());
}

#[test]
fn test_read_label_dir_orders_by_frame() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("frame_10.txt"), "0 0.5 0.5 0.1 0.1 0.7\n").unwrap();
    fs::write(
        dir.path().join("frame_2.txt"),
        "0 0.1 0.1 0.1 0.1 0.9\n0 0.2 0.2 0.1 0.1 0.8\n",
    )
    .unwrap();
    fs::write(dir.path().join("readme.md"), "ignored").unwrap();

    let dets = read_label_dir(dir.path(), &FrameNumberNaming::default()).unwrap();
    assert_eq!(dets.iter().map(|d| d.frame).collect::<Vec<_>>(), vec![2, 2, 10]);
    assert_eq!(dets.iter().map(|d| d.id).collect::<Vec<_>>(), vec![0, 1, 2]);
}

// ---------------------------------------------------------------------------
// frame sources
// ---------------------------------------------------------------------------

#[test]
fn test_group_by_slice() {
    let keys = vec![
        FrameKey::new(2, 1),
        FrameKey::new(1, 1),
        FrameKey::new(1, 2),
        FrameKey::new(3, 1),
    ];
    let groups = group_by_slice(&keys);
    assert_eq!(groups[&1], vec![1, 2, 3]);
    assert_eq!(groups[&2], vec![1]);
}

#[test]
fn test_memory_source_missing_frame() {
    let source = MemoryFrameSource::new().with_slice(1, vec![Array2::zeros((4, 4))]);
    assert_eq!(source.keys().unwrap(), vec![FrameKey::new(1, 1)]);
    let err = source.load(FrameKey::new(2, 1)).unwrap_err();
    assert!(matches!(err, DefmapError::SourceUnavailable { .. }));
}

#[test]
fn test_crop_rect_validation() {
    let data = Array2::from_shape_fn((10, 12), |(r, c)| (r * 12 + c) as f32);
    let crop = CropRect {
        x: 2,
        y: 3,
        width: 4,
        height: 5,
    };
    let out = crop.apply(&data).unwrap();
    assert_eq!(out.dim(), (5, 4));
    assert_eq!(out[[0, 0]], 38.0);

    let too_big = CropRect {
        x: 10,
        y: 0,
        width: 4,
        height: 4,
    };
    assert!(matches!(too_big.apply(&data), Err(DefmapError::InvalidCrop(_))));
}

#[test]
fn test_directory_source_reads_grayscale_png() {
    let dir = TempDir::new().unwrap();
    let naming = TimeSliceNaming::default();
    for t in 1..=2u32 {
        let img = image::GrayImage::from_fn(6, 4, |x, y| image::Luma([(x + y * 6 + t) as u8]));
        img.save(dir.path().join(naming.file_name(FrameKey::new(t, 1)))).unwrap();
    }
    fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

    let source = DirectoryFrameSource::open(dir.path(), &naming).unwrap();
    assert_eq!(source.len(), 2);

    let frame = source.load(FrameKey::new(2, 1)).unwrap();
    assert_eq!(frame.dim(), (4, 6));
    assert_eq!(frame.data[[0, 0]], 2.0);
    assert_eq!(frame.data[[1, 2]], 10.0);
}

#[test]
fn test_directory_source_channel_and_crop() {
    let dir = TempDir::new().unwrap();
    let naming = TimeSliceNaming::default();
    let img = image::RgbImage::from_pixel(8, 8, image::Rgb([10, 20, 30]));
    img.save(dir.path().join(naming.file_name(FrameKey::new(1, 1)))).unwrap();

    let blue = DeformationConfig {
        channel: Some(0),
        crop: Some(CropRect {
            x: 1,
            y: 1,
            width: 3,
            height: 2,
        }),
        ..DeformationConfig::default()
    };
    let source = DirectoryFrameSource::open(dir.path(), &naming)
        .unwrap()
        .configured(&blue);
    let frame = source.load(FrameKey::new(1, 1)).unwrap();
    assert_eq!(frame.dim(), (2, 3));
    assert!(frame.data.iter().all(|&v| v == 30.0));

    let red = DeformationConfig {
        channel: Some(2),
        ..DeformationConfig::default()
    };
    let source = DirectoryFrameSource::open(dir.path(), &naming)
        .unwrap()
        .configured(&red);
    let frame = source.load(FrameKey::new(1, 1)).unwrap();
    assert!(frame.data.iter().all(|&v| v == 10.0));
}

#[test]
fn test_directory_source_luminance_uses_bt601_weights() {
    let dir = TempDir::new().unwrap();
    let naming = TimeSliceNaming::default();
    let img = image::RgbImage::from_pixel(4, 4, image::Rgb([200, 50, 100]));
    img.save(dir.path().join(naming.file_name(FrameKey::new(1, 1)))).unwrap();

    let source = DirectoryFrameSource::open(dir.path(), &naming).unwrap();
    let frame = source.load(FrameKey::new(1, 1)).unwrap();
    // 0.299 * 200 + 0.587 * 50 + 0.114 * 100 = 100.55
    assert!(frame.data.iter().all(|&v| v == 101.0));
}

#[test]
fn test_directory_source_unreadable_file() {
    let dir = TempDir::new().unwrap();
    let naming = TimeSliceNaming::default();
    fs::write(dir.path().join(naming.file_name(FrameKey::new(1, 1))), b"not a png").unwrap();

    let source = DirectoryFrameSource::open(dir.path(), &naming).unwrap();
    let err = source.load(FrameKey::new(1, 1)).unwrap_err();
    assert!(matches!(err, DefmapError::SourceUnavailable { .. }));
}
