//! Arc/Info ASCII grid reading/writing
//!
//! The format is a 6-line header of key/value pairs followed by
//! `nrows * ncols` whitespace-separated values in row-major order:
//!
//! ```text
//! ncols         4
//! nrows         3
//! xllcorner     20.125
//! yllcorner     47.375
//! cellsize      0.0009765625
//! NODATA_value  -9999
//! 101.2 100.8 ...
//! ```
//!
//! Negative elevations are treated as nodata on read.

use crate::alloc::try_with_capacity;
use crate::error::{Error, Result};
use crate::raster::{CellGeometry, Raster};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

const HEADER_LINES: usize = 6;

/// Parsed Arc/Info ASCII grid header
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridHeader {
    pub ncols: usize,
    pub nrows: usize,
    /// X coordinate of the lower-left corner (degrees)
    pub xllcorner: f64,
    /// Y coordinate of the lower-left corner (degrees)
    pub yllcorner: f64,
    /// Angular cell size (degrees)
    pub cellsize: f64,
    pub nodata: f64,
}

impl GridHeader {
    /// Metric cell size evaluated at the grid centroid
    pub fn cell_geometry(&self) -> CellGeometry {
        CellGeometry::from_geographic(
            self.xllcorner,
            self.yllcorner,
            self.cellsize,
            self.nrows,
            self.ncols,
        )
    }
}

/// A grid read from disk: its header plus the elevation raster
#[derive(Debug, Clone)]
pub struct AsciiGrid {
    pub header: GridHeader,
    pub raster: Raster<f64>,
}

/// Read an Arc/Info ASCII grid from a file.
///
/// The returned raster carries the header's nodata value and the metric cell
/// geometry derived from the header.
pub fn read_ascii_grid<P: AsRef<Path>>(path: P) -> Result<AsciiGrid> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path)?;
    if text.is_empty() {
        return Err(Error::EmptyInput {
            path: path.to_path_buf(),
        });
    }
    read_ascii_grid_from_str(&text)
}

/// Parse an Arc/Info ASCII grid held in memory
pub fn read_ascii_grid_from_str(text: &str) -> Result<AsciiGrid> {
    let mut lines = text.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());

    let mut ncols = None;
    let mut nrows = None;
    let mut xll = None;
    let mut yll = None;
    let mut center_registered = false;
    let mut cellsize = None;
    let mut nodata = None;

    for _ in 0..HEADER_LINES {
        let (idx, line) = lines.next().ok_or(Error::InvalidGrid {
            line: 0,
            reason: "truncated header".into(),
        })?;
        let line_no = idx + 1;
        let mut parts = line.split_whitespace();
        let key = parts.next().unwrap_or_default().to_lowercase();
        let value = parts.next().ok_or_else(|| Error::InvalidGrid {
            line: line_no,
            reason: format!("missing value for '{key}'"),
        })?;

        match key.as_str() {
            "ncols" => ncols = Some(parse_count(value, line_no)?),
            "nrows" => nrows = Some(parse_count(value, line_no)?),
            "xllcorner" => xll = Some(parse_value(value, line_no)?),
            "yllcorner" => yll = Some(parse_value(value, line_no)?),
            "xllcenter" => {
                xll = Some(parse_value(value, line_no)?);
                center_registered = true;
            }
            "yllcenter" => {
                yll = Some(parse_value(value, line_no)?);
                center_registered = true;
            }
            "cellsize" => cellsize = Some(parse_value(value, line_no)?),
            "nodata_value" => nodata = Some(parse_value(value, line_no)?),
            other => {
                return Err(Error::InvalidGrid {
                    line: line_no,
                    reason: format!("unknown header key '{other}'"),
                })
            }
        }
    }

    let missing = |name: &str| Error::InvalidGrid {
        line: HEADER_LINES,
        reason: format!("header is missing '{name}'"),
    };
    let ncols = ncols.ok_or_else(|| missing("ncols"))?;
    let nrows = nrows.ok_or_else(|| missing("nrows"))?;
    let cellsize = cellsize.ok_or_else(|| missing("cellsize"))?;
    let nodata = nodata.ok_or_else(|| missing("NODATA_value"))?;
    let mut xllcorner = xll.ok_or_else(|| missing("xllcorner"))?;
    let mut yllcorner = yll.ok_or_else(|| missing("yllcorner"))?;
    if center_registered {
        xllcorner -= 0.5 * cellsize;
        yllcorner -= 0.5 * cellsize;
    }

    if ncols == 0 || nrows == 0 {
        return Err(Error::InvalidDimensions {
            width: ncols,
            height: nrows,
        });
    }

    let expected = nrows.checked_mul(ncols).ok_or(Error::Allocation {
        structure: "elevation grid",
    })?;
    let mut data: Vec<f64> = try_with_capacity(expected, "elevation grid")?;

    for (idx, line) in lines {
        for token in line.split_whitespace() {
            let v = parse_value(token, idx + 1)?;
            data.push(if v < 0.0 { nodata } else { v });
        }
    }

    if data.len() != expected {
        return Err(Error::InvalidGrid {
            line: HEADER_LINES,
            reason: format!(
                "expected {expected} values for {nrows}x{ncols} grid, found {}",
                data.len()
            ),
        });
    }

    let header = GridHeader {
        ncols,
        nrows,
        xllcorner,
        yllcorner,
        cellsize,
        nodata,
    };

    let mut raster = Raster::from_vec(data, nrows, ncols)?;
    raster.set_nodata(Some(nodata));
    raster.set_geometry(header.cell_geometry());

    Ok(AsciiGrid { header, raster })
}

/// Write a raster as an Arc/Info ASCII grid using `header` for georeferencing.
///
/// Nodata cells (per the raster's own sentinel) are written as the header's
/// nodata value.
pub fn write_ascii_grid<P: AsRef<Path>>(
    raster: &Raster<f64>,
    header: &GridHeader,
    path: P,
) -> Result<()> {
    let (rows, cols) = raster.shape();
    if rows != header.nrows || cols != header.ncols {
        return Err(Error::SizeMismatch {
            er: header.nrows,
            ec: header.ncols,
            ar: rows,
            ac: cols,
        });
    }

    let f = File::create(path.as_ref())?;
    let mut writer = BufWriter::new(f);

    writeln!(writer, "ncols         {}", header.ncols)?;
    writeln!(writer, "nrows         {}", header.nrows)?;
    writeln!(writer, "xllcorner     {}", header.xllcorner)?;
    writeln!(writer, "yllcorner     {}", header.yllcorner)?;
    writeln!(writer, "cellsize      {}", header.cellsize)?;
    writeln!(writer, "NODATA_value  {}", header.nodata)?;

    for row in raster.data().rows() {
        let line = row
            .iter()
            .map(|&v| {
                if raster.is_nodata(v) {
                    header.nodata.to_string()
                } else {
                    v.to_string()
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        writeln!(writer, "{line}")?;
    }

    writer.flush()?;
    Ok(())
}

fn parse_value(token: &str, line: usize) -> Result<f64> {
    token.parse::<f64>().map_err(|_| Error::InvalidGrid {
        line,
        reason: format!("cannot parse '{token}' as a number"),
    })
}

fn parse_count(token: &str, line: usize) -> Result<usize> {
    token.parse::<usize>().map_err(|_| Error::InvalidGrid {
        line,
        reason: format!("cannot parse '{token}' as a cell count"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const SMALL_GRID: &str = "\
ncols 3
nrows 2
xllcorner 20.0
yllcorner 47.0
cellsize 0.001
NODATA_value -9999
10.0 11.5 -3.0
-9999 12.25 13
";

    #[test]
    fn test_parse_header_and_body() {
        let grid = read_ascii_grid_from_str(SMALL_GRID).unwrap();
        assert_eq!(grid.header.ncols, 3);
        assert_eq!(grid.header.nrows, 2);
        assert_eq!(grid.header.nodata, -9999.0);
        assert_eq!(grid.raster.shape(), (2, 3));
        assert_eq!(grid.raster.get(0, 1).unwrap(), 11.5);
        assert_eq!(grid.raster.get(1, 2).unwrap(), 13.0);
    }

    #[test]
    fn test_negative_elevation_becomes_nodata() {
        let grid = read_ascii_grid_from_str(SMALL_GRID).unwrap();
        assert!(grid.raster.is_nodata_at(0, 2).unwrap());
        assert!(grid.raster.is_nodata_at(1, 0).unwrap());
        assert_eq!(grid.raster.active_cells(), 4);
    }

    #[test]
    fn test_geometry_from_header() {
        let grid = read_ascii_grid_from_str(SMALL_GRID).unwrap();
        let g = grid.raster.geometry();
        assert_relative_eq!(g.dy, 111.19, epsilon = 0.01);
        assert!(g.dx < g.dy);
    }

    #[test]
    fn test_case_insensitive_and_center_keys() {
        let text = "NCOLS 1\nNROWS 1\nXLLCENTER 1.0\nYLLCENTER 2.0\nCELLSIZE 2.0\nNODATA_VALUE -1\n5\n";
        let grid = read_ascii_grid_from_str(text).unwrap();
        assert_eq!(grid.header.xllcorner, 0.0);
        assert_eq!(grid.header.yllcorner, 1.0);
    }

    #[test]
    fn test_wrong_value_count() {
        let text = SMALL_GRID.replace("-9999 12.25 13", "-9999 12.25");
        assert!(matches!(
            read_ascii_grid_from_str(&text),
            Err(Error::InvalidGrid { .. })
        ));
    }

    #[test]
    fn test_bad_token_reports_line() {
        let text = SMALL_GRID.replace("12.25", "abc");
        match read_ascii_grid_from_str(&text) {
            Err(Error::InvalidGrid { line, .. }) => assert_eq!(line, 8),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_empty_file() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        assert!(matches!(
            read_ascii_grid(tmp.path()),
            Err(Error::EmptyInput { .. })
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            read_ascii_grid("/definitely/not/here.asc"),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_write_then_read() {
        let grid = read_ascii_grid_from_str(SMALL_GRID).unwrap();
        let tmp = tempfile::NamedTempFile::with_suffix(".asc").unwrap();
        write_ascii_grid(&grid.raster, &grid.header, tmp.path()).unwrap();

        let reloaded = read_ascii_grid(tmp.path()).unwrap();
        assert_eq!(reloaded.header, grid.header);
        assert_eq!(reloaded.raster.data(), grid.raster.data());
    }
}
