//! NumPy `.npy` persistence for float32 tensors.
//!
//! Only little-endian `<f4` data in C order is supported, which is what the
//! stacks are written as.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use byteorder::{ByteOrder, LittleEndian, WriteBytesExt};
use memmap2::Mmap;
use ndarray::{Array3, Dimension};

use crate::error::{DefmapError, Result};

const NPY_MAGIC: &[u8; 6] = b"\x93NUMPY";
/// Magic + version + v1 header length field.
const NPY_PREAMBLE_V1: usize = 10;
/// Total header size is padded to a multiple of this.
const NPY_ALIGNMENT: usize = 64;

/// Write `data` as an `.npy` v1.0 file.
///
/// The tensor is written to a sibling temporary file first and renamed into
/// place, so a failed write never leaves a truncated artifact at `path`.
pub fn write_npy_f32<D: Dimension>(path: &Path, data: &ndarray::Array<f32, D>) -> Result<()> {
    let tmp = path.with_extension("npy.partial");
    {
        let file = File::create(&tmp)?;
        let mut writer = BufWriter::new(file);
        write_npy_to(&mut writer, data)?;
        writer.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Serialize `data` in `.npy` v1.0 format to any writer.
pub fn write_npy_to<D: Dimension>(
    w: &mut impl Write,
    data: &ndarray::Array<f32, D>,
) -> Result<()> {
    let header = header_text(data.shape());
    let header_len = u16::try_from(header.len()).map_err(|_| {
        DefmapError::InvalidStack(format!("npy header too long: {} bytes", header.len()))
    })?;

    w.write_all(NPY_MAGIC)?;
    w.write_all(&[1u8, 0u8])?;
    w.write_u16::<LittleEndian>(header_len)?;
    w.write_all(header.as_bytes())?;

    // Logical (C) order regardless of the in-memory layout.
    for &v in data.iter() {
        w.write_f32::<LittleEndian>(v)?;
    }
    Ok(())
}

/// Header dict padded with spaces and terminated by a newline.
fn header_text(shape: &[usize]) -> String {
    let dims = match shape {
        [single] => format!("{single},"),
        _ => shape
            .iter()
            .map(|d| d.to_string())
            .collect::<Vec<_>>()
            .join(", "),
    };
    let mut header = format!("{{'descr': '<f4', 'fortran_order': False, 'shape': ({dims}), }}");
    let unpadded = NPY_PREAMBLE_V1 + header.len() + 1;
    let padding = (NPY_ALIGNMENT - unpadded % NPY_ALIGNMENT) % NPY_ALIGNMENT;
    header.push_str(&" ".repeat(padding));
    header.push('\n');
    header
}

/// Read a 3D `<f4` `.npy` file.
pub fn read_npy_f32(path: &Path) -> Result<Array3<f32>> {
    let file = File::open(path)?;
    let mmap = unsafe { Mmap::map(&file)? };
    parse_npy_f32(&mmap)
}

/// Parse an in-memory `.npy` buffer holding a 3D `<f4` tensor.
pub fn parse_npy_f32(bytes: &[u8]) -> Result<Array3<f32>> {
    if bytes.len() < NPY_PREAMBLE_V1 || &bytes[..6] != NPY_MAGIC {
        return Err(DefmapError::InvalidStack("missing NUMPY magic".into()));
    }

    let major = bytes[6];
    let (header_len, header_start) = match major {
        1 => (LittleEndian::read_u16(&bytes[8..10]) as usize, 10),
        2 | 3 if bytes.len() >= 12 => (LittleEndian::read_u32(&bytes[8..12]) as usize, 12),
        _ => {
            return Err(DefmapError::InvalidStack(format!(
                "unsupported npy version {major}"
            )))
        }
    };

    let data_start = header_start + header_len;
    if bytes.len() < data_start {
        return Err(DefmapError::InvalidStack("truncated npy header".into()));
    }
    let header = std::str::from_utf8(&bytes[header_start..data_start])
        .map_err(|_| DefmapError::InvalidStack("npy header is not UTF-8".into()))?;

    let descr = header_value(header, "descr")
        .ok_or_else(|| DefmapError::InvalidStack("npy header lacks 'descr'".into()))?;
    if !matches!(descr.trim_matches(|c: char| c == '\'' || c == '"'), "<f4") {
        return Err(DefmapError::InvalidStack(format!(
            "expected little-endian float32 data, got {descr}"
        )));
    }
    if header_value(header, "fortran_order") != Some("False") {
        return Err(DefmapError::InvalidStack(
            "Fortran-ordered npy data is not supported".into(),
        ));
    }

    let shape = parse_shape(header)?;
    let &[n, h, w] = shape.as_slice() else {
        return Err(DefmapError::InvalidStack(format!(
            "expected a 3D tensor, got shape {shape:?}"
        )));
    };

    let count = n * h * w;
    let payload = &bytes[data_start..];
    if payload.len() < count * 4 {
        return Err(DefmapError::InvalidStack(format!(
            "npy data truncated: expected {} bytes, got {}",
            count * 4,
            payload.len()
        )));
    }

    let mut values = vec![0.0f32; count];
    LittleEndian::read_f32_into(&payload[..count * 4], &mut values);
    Array3::from_shape_vec((n, h, w), values)
        .map_err(|e| DefmapError::InvalidStack(format!("npy shape error: {e}")))
}

/// Raw text of a scalar entry in the header dict, e.g. `'<f4'` or `False`.
fn header_value<'a>(header: &'a str, key: &str) -> Option<&'a str> {
    let start = header.find(&format!("'{key}'"))? + key.len() + 2;
    let rest = header[start..].trim_start().strip_prefix(':')?.trim_start();
    let end = rest.find(',').unwrap_or(rest.len());
    Some(rest[..end].trim())
}

fn parse_shape(header: &str) -> Result<Vec<usize>> {
    let bad = || DefmapError::InvalidStack("npy header lacks a valid 'shape'".into());
    let start = header.find("'shape'").ok_or_else(bad)?;
    let rest = &header[start..];
    let open = rest.find('(').ok_or_else(bad)?;
    let close = rest.find(')').ok_or_else(bad)?;
    rest[open + 1..close]
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<usize>().map_err(|_| bad()))
        .collect()
}
