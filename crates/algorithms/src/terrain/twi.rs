//! Topographic Wetness Index (TWI)
//!
//! TWI = A / (L · tan(β))
//! where A = MFD contributing area (m²), L = contour length of the
//! downslope boundary (m) and tan(β) = contour-weighted mean slope toward
//! lower neighbors.
//!
//! Each strictly lower neighbor contributes its slope `drop / distance`
//! weighted by a share of the cell boundary: `0.2Δx + 0.2Δy` for diagonals,
//! `0.6Δx` for N/S and `0.6Δy` for E/W. A cell with no lower neighbor gets
//! the flat-terrain slope derived from the DEM's vertical resolution, and no
//! slope is allowed below that floor.
//!
//! High TWI values indicate areas prone to saturation. Cells are classified
//! as open water, wetland or upland by two fixed thresholds.

use crate::hydrology::rank_active_cells;
use lakeparam_core::alloc::try_vec;
use lakeparam_core::raster::{CellGeometry, NeighborKind, NeighborTopology, Raster};
use lakeparam_core::{Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Parameters for the wetness index and its classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WetnessParams {
    /// Vertical resolution of the DEM (m), sets the flat-terrain slope
    pub vertical_resolution: f64,
    /// Lowest TWI classified as wetland
    pub wetland_threshold: f64,
    /// Lowest TWI classified as open water
    pub water_threshold: f64,
}

impl Default for WetnessParams {
    fn default() -> Self {
        Self {
            vertical_resolution: 2.3,
            wetland_threshold: 13552.0,
            water_threshold: 216623.0,
        }
    }
}

impl WetnessParams {
    /// Slope of a flat cell: half the vertical resolution over each of the
    /// 8 neighbor distances, averaged.
    pub fn tan_beta_floor(&self, geometry: &CellGeometry) -> f64 {
        let half = 0.5 * self.vertical_resolution;
        (4.0 * (half / geometry.diagonal()) + 2.0 * (half / geometry.dx) + 2.0 * (half / geometry.dy))
            / 8.0
    }

    /// Cover class of a wetness index value
    pub fn classify(&self, index: f64) -> CoverClass {
        if index >= self.water_threshold {
            CoverClass::Water
        } else if index >= self.wetland_threshold {
            CoverClass::Wetland
        } else {
            CoverClass::Upland
        }
    }

    fn validate(&self) -> Result<()> {
        if !(self.vertical_resolution.is_finite() && self.vertical_resolution > 0.0) {
            return Err(Error::InvalidParameter {
                name: "vertical_resolution",
                value: self.vertical_resolution.to_string(),
                reason: "must be a positive height".into(),
            });
        }
        if !(self.wetland_threshold < self.water_threshold) {
            return Err(Error::InvalidParameter {
                name: "wetland_threshold",
                value: self.wetland_threshold.to_string(),
                reason: format!("must be below the water threshold {}", self.water_threshold),
            });
        }
        Ok(())
    }
}

/// Land cover implied by the wetness index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum CoverClass {
    Upland = 0,
    Wetland = 1,
    Water = 2,
}

impl CoverClass {
    /// Sentinel stored in the class raster for nodata cells
    pub const NODATA: u8 = u8::MAX;

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(CoverClass::Upland),
            1 => Some(CoverClass::Wetland),
            2 => Some(CoverClass::Water),
            _ => None,
        }
    }
}

/// Share of active cells in each cover class
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CoverFractions {
    pub water: f64,
    pub wetland: f64,
    pub upland: f64,
    pub water_cells: usize,
    pub wetland_cells: usize,
    pub active_cells: usize,
}

impl CoverFractions {
    fn from_counts(water_cells: usize, wetland_cells: usize, active_cells: usize) -> Self {
        if active_cells == 0 {
            return Self::default();
        }
        let total = active_cells as f64;
        let water = water_cells as f64 / total;
        let wetland = wetland_cells as f64 / total;
        let upland_cells = active_cells - water_cells - wetland_cells;
        Self {
            water,
            wetland,
            upland: upland_cells as f64 / total,
            water_cells,
            wetland_cells,
            active_cells,
        }
    }
}

/// Per-cell outputs of the wetness stage
#[derive(Debug, Clone)]
pub struct WetnessGrids {
    /// Contour-weighted slope, never below the flat-terrain floor
    pub tan_beta: Raster<f64>,
    /// Mean contour length over lower neighbors (m)
    pub contour_length: Raster<f64>,
    pub wetness_index: Raster<f64>,
    /// Mean drop per unit distance toward lower, wetter neighbors
    pub relief: Raster<f64>,
    /// [`CoverClass`] codes, [`CoverClass::NODATA`] outside the data
    pub class: Raster<u8>,
    pub fractions: CoverFractions,
}

/// Compute the wetness index, cover classes and relief of a filled DEM.
///
/// # Arguments
/// * `filled` - Filled DEM
/// * `flow` - MFD contributing area over `filled` (m²)
/// * `params` - Vertical resolution and classification thresholds
///
/// # Returns
/// [`WetnessGrids`]. Derived grids are NaN where `filled` is nodata.
pub fn wetness_index(
    filled: &Raster<f64>,
    flow: &Raster<f64>,
    params: &WetnessParams,
) -> Result<WetnessGrids> {
    filled.ensure_same_shape(flow)?;
    params.validate()?;

    let (rows, cols) = filled.shape();
    let topo = NeighborTopology::new(rows, cols);
    let geometry = *filled.geometry();
    let (dx, dy) = (geometry.dx, geometry.dy);

    let mut distances = [0.0_f64; 8];
    let mut weights = [0.0_f64; 8];
    for k in 0..8 {
        let kind = NeighborKind::of(k);
        distances[k] = kind.distance(&geometry);
        weights[k] = match kind {
            NeighborKind::Diagonal => 0.2 * dx + 0.2 * dy,
            NeighborKind::Vertical => 0.6 * dx,
            NeighborKind::Horizontal => 0.6 * dy,
        };
    }
    let floor = params.tan_beta_floor(&geometry);

    let new_grid = |structure| -> Result<Raster<f64>> {
        let mut grid = Raster::try_filled(rows, cols, f64::NAN, structure)?;
        grid.set_geometry(geometry);
        grid.set_nodata(Some(f64::NAN));
        Ok(grid)
    };
    let mut tan_beta = new_grid("tan(beta)")?;
    let mut contour_length = new_grid("contour length")?;
    let mut twi = new_grid("wetness index")?;
    let mut relief = new_grid("relief")?;

    let mut class = Raster::from_vec(
        try_vec(rows * cols, CoverClass::NODATA, "cover class")?,
        rows,
        cols,
    )?;
    class.set_geometry(geometry);
    class.set_nodata(Some(CoverClass::NODATA));

    let order = rank_active_cells(filled, "wetness order")?;
    let mut water_cells = 0usize;
    let mut wetland_cells = 0usize;

    // Highest first
    for item in order.iter().rev() {
        let (row, col, z) = (item.row, item.col, item.rank);

        let mut sum_slope = 0.0;
        let mut sum_weight = 0.0;
        let mut lower = 0usize;
        for (k, (nr, nc)) in topo.neighbors(row, col).into_iter().enumerate() {
            // SAFETY: clamped neighbor addresses are inside the grid
            let nz = unsafe { filled.get_unchecked(nr, nc) };
            if filled.is_nodata(nz) || nz >= z {
                continue;
            }
            sum_slope += weights[k] * (z - nz) / distances[k];
            sum_weight += weights[k];
            lower += 1;
        }

        let (tb, cl) = if lower == 0 {
            (floor, 2.0 * dx + 2.0 * dy)
        } else {
            ((sum_slope / sum_weight).max(floor), sum_weight / lower as f64)
        };

        // SAFETY: (row, col) comes from a grid of the same shape
        let area = unsafe { flow.get_unchecked(row, col) };
        let index = area / (cl * tb);

        tan_beta.data_mut()[(row, col)] = tb;
        contour_length.data_mut()[(row, col)] = cl;
        twi.data_mut()[(row, col)] = index;

        let cover = params.classify(index);
        match cover {
            CoverClass::Water => water_cells += 1,
            CoverClass::Wetland => wetland_cells += 1,
            CoverClass::Upland => {}
        }
        class.data_mut()[(row, col)] = cover as u8;
    }

    // Relief needs the finished index of every neighbor
    for item in order.iter().rev() {
        let (row, col, z) = (item.row, item.col, item.rank);
        let index = twi.data()[(row, col)];

        let mut sum_drop = 0.0;
        let mut count = 0usize;
        for (k, (nr, nc)) in topo.neighbors(row, col).into_iter().enumerate() {
            let nz = unsafe { filled.get_unchecked(nr, nc) };
            if filled.is_nodata(nz) || nz >= z {
                continue;
            }
            if twi.data()[(nr, nc)] > index {
                sum_drop += (z - nz) / distances[k];
                count += 1;
            }
        }

        relief.data_mut()[(row, col)] = if count == 0 {
            0.0
        } else {
            sum_drop / count as f64
        };
    }

    let fractions = CoverFractions::from_counts(water_cells, wetland_cells, order.len());
    debug!(
        water = fractions.water,
        wetland = fractions.wetland,
        upland = fractions.upland,
        active_cells = fractions.active_cells,
        "cover fractions"
    );

    Ok(WetnessGrids {
        tan_beta,
        contour_length,
        wetness_index: twi,
        relief,
        class,
        fractions,
    })
}
