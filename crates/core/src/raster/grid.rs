//! Main Raster type

use crate::alloc::try_vec;
use crate::error::{Error, Result};
use crate::raster::{CellGeometry, RasterElement};
use ndarray::Array2;

/// A 2D raster grid with metric cell geometry and a nodata sentinel.
///
/// `Raster<T>` stores values of type `T` row-major in an `ndarray::Array2`,
/// addressed `(row, col)` from 0.
///
/// # Example
///
/// ```ignore
/// use lakeparam_core::Raster;
///
/// let mut raster: Raster<f64> = Raster::new(100, 100);
/// raster.set(10, 20, 42.0)?;
/// let value = raster.get(10, 20)?;
/// ```
#[derive(Debug, Clone)]
pub struct Raster<T: RasterElement> {
    /// Raster data stored in row-major order (row, col)
    data: Array2<T>,
    /// Metric cell size
    geometry: CellGeometry,
    /// No-data value
    nodata: Option<T>,
}

impl<T: RasterElement> Raster<T> {
    /// Create a new raster filled with zeros
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            data: Array2::zeros((rows, cols)),
            geometry: CellGeometry::default(),
            nodata: None,
        }
    }

    /// Create a new raster filled with a specific value
    pub fn filled(rows: usize, cols: usize, value: T) -> Self {
        Self {
            data: Array2::from_elem((rows, cols), value),
            geometry: CellGeometry::default(),
            nodata: None,
        }
    }

    /// Fallible allocation of a raster filled with `value`.
    ///
    /// Returns [`Error::Allocation`] naming `structure` when the backing
    /// buffer cannot be reserved.
    pub fn try_filled(rows: usize, cols: usize, value: T, structure: &'static str) -> Result<Self> {
        let len = rows
            .checked_mul(cols)
            .ok_or(Error::Allocation { structure })?;
        let buf = try_vec(len, value, structure)?;
        Self::from_vec(buf, rows, cols)
    }

    /// Create a raster from existing row-major data
    pub fn from_vec(data: Vec<T>, rows: usize, cols: usize) -> Result<Self> {
        if data.len() != rows * cols {
            return Err(Error::InvalidDimensions {
                width: cols,
                height: rows,
            });
        }

        let array = Array2::from_shape_vec((rows, cols), data)
            .map_err(|e| Error::Algorithm(e.to_string()))?;

        Ok(Self {
            data: array,
            geometry: CellGeometry::default(),
            nodata: None,
        })
    }

    // Dimensions

    /// Number of rows
    pub fn rows(&self) -> usize {
        self.data.nrows()
    }

    /// Number of columns
    pub fn cols(&self) -> usize {
        self.data.ncols()
    }

    /// Dimensions as (rows, cols)
    pub fn shape(&self) -> (usize, usize) {
        self.data.dim()
    }

    /// Total number of cells
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the raster is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Fail with [`Error::SizeMismatch`] unless `other` has this raster's shape
    pub fn ensure_same_shape<U: RasterElement>(&self, other: &Raster<U>) -> Result<()> {
        let (er, ec) = self.shape();
        let (ar, ac) = other.shape();
        if er != ar || ec != ac {
            return Err(Error::SizeMismatch { er, ec, ar, ac });
        }
        Ok(())
    }

    // Data access

    /// Get value at (row, col)
    pub fn get(&self, row: usize, col: usize) -> Result<T> {
        self.data
            .get((row, col))
            .copied()
            .ok_or(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            })
    }

    /// Get value at (row, col) without bounds checking
    ///
    /// # Safety
    /// Caller must ensure row < self.rows() and col < self.cols()
    pub unsafe fn get_unchecked(&self, row: usize, col: usize) -> T {
        unsafe { *self.data.uget((row, col)) }
    }

    /// Set value at (row, col)
    pub fn set(&mut self, row: usize, col: usize, value: T) -> Result<()> {
        if row >= self.rows() || col >= self.cols() {
            return Err(Error::IndexOutOfBounds {
                row,
                col,
                rows: self.rows(),
                cols: self.cols(),
            });
        }
        self.data[(row, col)] = value;
        Ok(())
    }

    /// Get a reference to the underlying array
    pub fn data(&self) -> &Array2<T> {
        &self.data
    }

    /// Get a mutable reference to the underlying array
    pub fn data_mut(&mut self) -> &mut Array2<T> {
        &mut self.data
    }

    // Metadata

    /// Metric cell geometry
    pub fn geometry(&self) -> &CellGeometry {
        &self.geometry
    }

    /// Set the metric cell geometry
    pub fn set_geometry(&mut self, geometry: CellGeometry) {
        self.geometry = geometry;
    }

    /// Get the no-data value
    pub fn nodata(&self) -> Option<T> {
        self.nodata
    }

    /// Set the no-data value
    pub fn set_nodata(&mut self, nodata: Option<T>) {
        self.nodata = nodata;
    }

    /// Cell area in square metres
    pub fn cell_area(&self) -> f64 {
        self.geometry.area()
    }

    // Value checks

    /// Check if a value is no-data
    pub fn is_nodata(&self, value: T) -> bool {
        value.is_nodata(self.nodata)
    }

    /// Check if cell at (row, col) contains no-data
    pub fn is_nodata_at(&self, row: usize, col: usize) -> Result<bool> {
        let value = self.get(row, col)?;
        Ok(self.is_nodata(value))
    }

    /// Number of cells holding a valid (non-nodata) value
    pub fn active_cells(&self) -> usize {
        self.data.iter().filter(|&&v| !self.is_nodata(v)).count()
    }

    // Statistics

    /// Calculate basic statistics (min, max, mean, count of valid cells)
    pub fn statistics(&self) -> RasterStatistics<T> {
        let mut min: Option<T> = None;
        let mut max: Option<T> = None;
        let mut sum: f64 = 0.0;
        let mut count: usize = 0;

        for &value in self.data.iter() {
            if self.is_nodata(value) {
                continue;
            }

            if min.map_or(true, |m| value < m) {
                min = Some(value);
            }
            if max.map_or(true, |m| value > m) {
                max = Some(value);
            }

            if let Some(v) = value.to_f64() {
                sum += v;
                count += 1;
            }
        }

        let mean = if count > 0 {
            Some(sum / count as f64)
        } else {
            None
        };

        RasterStatistics {
            min,
            max,
            mean,
            valid_count: count,
            nodata_count: self.len() - count,
        }
    }
}

/// Basic statistics for a raster
#[derive(Debug, Clone)]
pub struct RasterStatistics<T> {
    pub min: Option<T>,
    pub max: Option<T>,
    pub mean: Option<f64>,
    pub valid_count: usize,
    pub nodata_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raster_creation() {
        let raster: Raster<f64> = Raster::new(100, 200);
        assert_eq!(raster.rows(), 100);
        assert_eq!(raster.cols(), 200);
        assert_eq!(raster.shape(), (100, 200));
        assert!(raster.data().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_raster_access() {
        let mut raster: Raster<f64> = Raster::new(10, 10);
        raster.set(5, 5, 42.0).unwrap();
        assert_eq!(raster.get(5, 5).unwrap(), 42.0);
        assert!(raster.get(10, 0).is_err());
        assert!(raster.set(0, 10, 1.0).is_err());
    }

    #[test]
    fn test_try_filled() {
        let raster: Raster<f64> = Raster::try_filled(4, 3, 7.5, "test grid").unwrap();
        assert_eq!(raster.shape(), (4, 3));
        assert!(raster.data().iter().all(|&v| v == 7.5));
    }

    #[test]
    fn test_try_filled_overflow_names_structure() {
        let err = Raster::<f64>::try_filled(usize::MAX, 2, 0.0, "flow accumulation").unwrap_err();
        match err {
            Error::Allocation { structure } => assert_eq!(structure, "flow accumulation"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_active_cells_and_statistics() {
        let mut raster = Raster::from_vec(vec![1.0, -9999.0, 3.0, 4.0], 2, 2).unwrap();
        raster.set_nodata(Some(-9999.0));

        assert_eq!(raster.active_cells(), 3);
        let stats = raster.statistics();
        assert_eq!(stats.min, Some(1.0));
        assert_eq!(stats.max, Some(4.0));
        assert_eq!(stats.nodata_count, 1);
    }

    #[test]
    fn test_shape_mismatch() {
        let a: Raster<f64> = Raster::new(3, 3);
        let b: Raster<u8> = Raster::new(3, 4);
        assert!(matches!(a.ensure_same_shape(&b), Err(Error::SizeMismatch { .. })));
        assert!(a.ensure_same_shape(&Raster::<u8>::new(3, 3)).is_ok());
    }
}
