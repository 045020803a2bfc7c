//! Rectangular landscape grids and the plain-text grid format
//!
//! Grids are stored row-major. The text format is a six-line header
//! (`ncols`, `nrows`, `xllcorner`, `yllcorner`, `cellsize`, `NODATA_value`)
//! followed by one line of space-separated values per row.

use std::fmt;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

pub const DEFAULT_NODATA: f64 = -9999.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Shape {
    pub nrows: usize,
    pub ncols: usize,
}

impl Shape {
    /// Two management rows by ten thousand columns.
    pub const LANDSCAPE: Shape = Shape {
        nrows: 2,
        ncols: 10_000,
    };

    pub fn new(nrows: usize, ncols: usize) -> Self {
        Self { nrows, ncols }
    }

    /// Saturates instead of overflowing; use [`Shape::checked_cell_count`]
    /// for shapes read from untrusted input.
    pub fn cell_count(self) -> usize {
        self.nrows.saturating_mul(self.ncols)
    }

    pub fn checked_cell_count(self) -> Option<usize> {
        self.nrows.checked_mul(self.ncols)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.nrows, self.ncols)
    }
}

#[derive(Debug, Error)]
pub enum GridError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("grid has no rows or no columns")]
    Empty,
    #[error("row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("missing `{0}` in grid header")]
    MissingHeader(&'static str),
    #[error("invalid value `{value}` for header `{key}`")]
    InvalidHeader { key: String, value: String },
    #[error("invalid cell value `{token}` at cell {index}")]
    InvalidCell { index: usize, token: String },
    #[error("grid shape {0} is too large to address")]
    TooLarge(Shape),
    #[error("grid body holds {found} cells, header declares {expected}")]
    CellCount { expected: usize, found: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub struct Grid<T> {
    shape: Shape,
    cells: Vec<T>,
}

impl<T: Clone> Grid<T> {
    pub fn filled(shape: Shape, value: T) -> Self {
        Self {
            shape,
            cells: vec![value; shape.cell_count()],
        }
    }
}

impl<T> Grid<T> {
    pub fn from_fn(shape: Shape, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut cells = Vec::with_capacity(shape.cell_count());
        for row in 0..shape.nrows {
            for col in 0..shape.ncols {
                cells.push(f(row, col));
            }
        }
        Self { shape, cells }
    }

    pub fn from_rows(rows: Vec<Vec<T>>) -> Result<Self, GridError> {
        let ncols = rows.first().map(Vec::len).unwrap_or(0);
        if rows.is_empty() || ncols == 0 {
            return Err(GridError::Empty);
        }
        let nrows = rows.len();
        let mut cells = Vec::with_capacity(nrows * ncols);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != ncols {
                return Err(GridError::Ragged {
                    row,
                    expected: ncols,
                    found: values.len(),
                });
            }
            cells.extend(values);
        }
        Ok(Self {
            shape: Shape::new(nrows, ncols),
            cells,
        })
    }

    pub fn from_cells(shape: Shape, cells: Vec<T>) -> Result<Self, GridError> {
        let expected = shape
            .checked_cell_count()
            .ok_or(GridError::TooLarge(shape))?;
        if expected == 0 {
            return Err(GridError::Empty);
        }
        if cells.len() != expected {
            return Err(GridError::CellCount {
                expected,
                found: cells.len(),
            });
        }
        Ok(Self { shape, cells })
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn get(&self, row: usize, col: usize) -> Option<&T> {
        if row >= self.shape.nrows || col >= self.shape.ncols {
            return None;
        }
        self.cells.get(row * self.shape.ncols + col)
    }

    pub fn row(&self, row: usize) -> Option<&[T]> {
        if row >= self.shape.nrows {
            return None;
        }
        let start = row * self.shape.ncols;
        Some(&self.cells[start..start + self.shape.ncols])
    }

    pub fn rows(&self) -> impl Iterator<Item = &[T]> {
        (0..self.shape.nrows).filter_map(move |row| self.row(row))
    }

    pub fn cells(&self) -> &[T] {
        &self.cells
    }
}

/// Map-code grid: column `c` holds `c + 1` in every row.
pub fn map_code_grid(shape: Shape) -> Grid<i64> {
    Grid::from_fn(shape, |_, col| col as i64 + 1)
}

/// Every cell holds `value`.
pub fn constant_grid(shape: Shape, value: i64) -> Grid<i64> {
    Grid::filled(shape, value)
}

/// Row `r` holds `r` in every column, so row 0 is region 0 and row 1 is region 1.
pub fn row_index_grid(shape: Shape) -> Grid<i64> {
    Grid::from_fn(shape, |row, _| row as i64)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridHeader {
    pub ncols: usize,
    pub nrows: usize,
    pub xllcorner: f64,
    pub yllcorner: f64,
    pub cellsize: f64,
    pub nodata_value: f64,
}

impl GridHeader {
    pub fn new(shape: Shape) -> Self {
        Self {
            ncols: shape.ncols,
            nrows: shape.nrows,
            xllcorner: 0.0,
            yllcorner: 0.0,
            cellsize: 1.0,
            nodata_value: DEFAULT_NODATA,
        }
    }

    pub fn shape(&self) -> Shape {
        Shape::new(self.nrows, self.ncols)
    }
}

/// Writes `grid` using the georeferencing of `header`; the dimensions always
/// come from the grid itself.
pub fn write_ascii_grid<W: Write, T: fmt::Display>(
    writer: &mut W,
    header: &GridHeader,
    grid: &Grid<T>,
) -> std::io::Result<()> {
    let shape = grid.shape();
    writeln!(writer, "ncols {}", shape.ncols)?;
    writeln!(writer, "nrows {}", shape.nrows)?;
    writeln!(writer, "xllcorner {}", header.xllcorner)?;
    writeln!(writer, "yllcorner {}", header.yllcorner)?;
    writeln!(writer, "cellsize {}", header.cellsize)?;
    writeln!(writer, "NODATA_value {}", header.nodata_value)?;
    for row in grid.rows() {
        let mut first = true;
        for value in row {
            if first {
                first = false;
            } else {
                writer.write_all(b" ")?;
            }
            write!(writer, "{value}")?;
        }
        writer.write_all(b"\n")?;
    }
    Ok(())
}

pub fn write_ascii_grid_file<T: fmt::Display>(
    path: impl AsRef<Path>,
    header: &GridHeader,
    grid: &Grid<T>,
) -> Result<(), GridError> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_ascii_grid(&mut writer, header, grid)?;
    writer.flush()?;
    Ok(())
}

pub fn read_ascii_grid<T: FromStr>(text: &str) -> Result<(GridHeader, Grid<T>), GridError> {
    let (header, body) = read_ascii_header(text)?;
    let grid = read_ascii_body(&header, body)?;
    Ok((header, grid))
}

/// Parses the header lines and returns them with the unparsed body.
pub fn read_ascii_header(text: &str) -> Result<(GridHeader, &str), GridError> {
    let mut ncols = None;
    let mut nrows = None;
    let mut header = GridHeader::new(Shape::new(0, 0));
    let mut body_start = text.len();

    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let mut tokens = line.split_whitespace();
        let key = match tokens.next() {
            Some(key) => key,
            None => {
                offset += line.len();
                continue;
            }
        };
        if !key.starts_with(|c: char| c.is_ascii_alphabetic()) {
            body_start = offset;
            break;
        }
        let value = tokens.next().unwrap_or_default();
        let invalid = || GridError::InvalidHeader {
            key: key.to_string(),
            value: value.to_string(),
        };
        match key.to_ascii_lowercase().as_str() {
            "ncols" => ncols = Some(value.parse::<usize>().map_err(|_| invalid())?),
            "nrows" => nrows = Some(value.parse::<usize>().map_err(|_| invalid())?),
            "xllcorner" | "xllcenter" => header.xllcorner = value.parse().map_err(|_| invalid())?,
            "yllcorner" | "yllcenter" => header.yllcorner = value.parse().map_err(|_| invalid())?,
            "cellsize" => header.cellsize = value.parse().map_err(|_| invalid())?,
            "nodata_value" => header.nodata_value = value.parse().map_err(|_| invalid())?,
            _ => return Err(invalid()),
        }
        offset += line.len();
    }

    header.ncols = ncols.ok_or(GridError::MissingHeader("ncols"))?;
    header.nrows = nrows.ok_or(GridError::MissingHeader("nrows"))?;
    Ok((header, &text[body_start..]))
}

pub fn read_ascii_body<T: FromStr>(header: &GridHeader, body: &str) -> Result<Grid<T>, GridError> {
    let shape = header.shape();
    let expected = shape
        .checked_cell_count()
        .ok_or(GridError::TooLarge(shape))?;

    // Header values are untrusted; grow with the body instead of reserving up front.
    let mut cells = Vec::new();
    for (index, token) in body.split_whitespace().enumerate() {
        if index >= expected {
            return Err(GridError::CellCount {
                expected,
                found: index + body.split_whitespace().skip(index).count(),
            });
        }
        let value = token.parse::<T>().map_err(|_| GridError::InvalidCell {
            index,
            token: token.to_string(),
        })?;
        cells.push(value);
    }

    Grid::from_cells(shape, cells)
}
