//! Single-band raster decoding for simulation output snapshots.
//!
//! A band is accepted either as a plain-text grid (leading `ncols` keyword)
//! or as raw little-endian `f32` cells in row-major order sized exactly for
//! the expected shape.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::grid::{read_ascii_body, read_ascii_header, Grid, GridError, Shape};

const RAW_CELL_BYTES: usize = 4;

#[derive(Debug, Error)]
pub enum RasterError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("text raster is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),
    #[error("malformed text raster: {0}")]
    Grid(#[from] GridError),
    #[error("raw band holds {found} bytes, expected {expected} for the configured shape")]
    RawLength { expected: usize, found: usize },
    #[error("raster shape {found} does not match expected {expected}")]
    Shape { expected: Shape, found: Shape },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterEncoding {
    AsciiGrid,
    RawFloat32,
}

impl RasterEncoding {
    pub fn detect(bytes: &[u8]) -> Self {
        let start = bytes
            .iter()
            .position(|b| !b.is_ascii_whitespace())
            .unwrap_or(bytes.len());
        let head = &bytes[start..];
        if head.len() >= 5 && head[..5].eq_ignore_ascii_case(b"ncols") {
            RasterEncoding::AsciiGrid
        } else {
            RasterEncoding::RawFloat32
        }
    }
}

/// Reads the first band of the raster at `path` and checks it against `expected`.
pub fn read_band(path: impl AsRef<Path>, expected: Shape) -> Result<Grid<f64>, RasterError> {
    let bytes = fs::read(path)?;
    decode_band(&bytes, expected)
}

pub fn decode_band(bytes: &[u8], expected: Shape) -> Result<Grid<f64>, RasterError> {
    match RasterEncoding::detect(bytes) {
        RasterEncoding::AsciiGrid => decode_text(bytes, expected),
        RasterEncoding::RawFloat32 => decode_raw_f32(bytes, expected),
    }
}

fn decode_text(bytes: &[u8], expected: Shape) -> Result<Grid<f64>, RasterError> {
    let text = std::str::from_utf8(bytes)?;
    let (header, body) = read_ascii_header(text)?;
    // Reject before touching the body so a bogus header cannot size anything.
    if header.shape() != expected {
        return Err(RasterError::Shape {
            expected,
            found: header.shape(),
        });
    }
    Ok(read_ascii_body(&header, body)?)
}

fn decode_raw_f32(bytes: &[u8], shape: Shape) -> Result<Grid<f64>, RasterError> {
    let expected = shape
        .checked_cell_count()
        .and_then(|cells| cells.checked_mul(RAW_CELL_BYTES))
        .ok_or(GridError::TooLarge(shape))?;
    if bytes.len() != expected {
        return Err(RasterError::RawLength {
            expected,
            found: bytes.len(),
        });
    }
    let cells = bytes
        .chunks_exact(RAW_CELL_BYTES)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]) as f64)
        .collect();
    Ok(Grid::from_cells(shape, cells)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_bytes(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn detects_text_grid_after_whitespace() {
        assert_eq!(
            RasterEncoding::detect(b"\n  NCOLS 4\n"),
            RasterEncoding::AsciiGrid
        );
        assert_eq!(
            RasterEncoding::detect(&raw_bytes(&[1.0, 2.0])),
            RasterEncoding::RawFloat32
        );
    }

    #[test]
    fn raw_and_text_bands_decode_alike() {
        let shape = Shape::new(2, 3);
        let raw = decode_band(&raw_bytes(&[1.0, 2.5, 3.0, -4.0, 5.0, 6.0]), shape).unwrap();
        let text = decode_band(b"ncols 3\nnrows 2\n1 2.5 3\n-4 5 6\n", shape).unwrap();
        assert_eq!(raw, text);
        assert_eq!(raw.get(1, 0), Some(&-4.0));
    }

    #[test]
    fn raw_band_length_must_match_shape() {
        let err = decode_band(&raw_bytes(&[1.0, 2.0, 3.0]), Shape::new(2, 2)).unwrap_err();
        assert!(matches!(
            err,
            RasterError::RawLength {
                expected: 16,
                found: 12
            }
        ));
    }

    #[test]
    fn text_band_with_other_shape_is_rejected() {
        let err = decode_band(b"ncols 2\nnrows 1\n1 2\n", Shape::new(2, 2)).unwrap_err();
        assert!(matches!(err, RasterError::Shape { .. }));
    }

    #[test]
    fn oversized_text_header_is_rejected_before_body() {
        let text = format!("ncols {}\nnrows 4\n1 2 3\n", usize::MAX / 2);
        let err = decode_band(text.as_bytes(), Shape::new(2, 4)).unwrap_err();
        match err {
            RasterError::Shape { expected, found } => {
                assert_eq!(expected, Shape::new(2, 4));
                assert_eq!(found.ncols, usize::MAX / 2);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn raw_decode_of_unaddressable_shape_fails() {
        let err = decode_band(&raw_bytes(&[1.0]), Shape::new(usize::MAX, 2)).unwrap_err();
        assert!(matches!(err, RasterError::Grid(GridError::TooLarge(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_band(dir.path().join("absent.img"), Shape::new(1, 1)).unwrap_err();
        assert!(matches!(err, RasterError::Io(_)));
    }
}
