//! Wetland binning
//!
//! Wetland cells are ranked twice: by wetness index (wettest first) and by
//! elevation (lowest first). The k-th cell of the wetness order supplies the
//! index, slope and relief terms and the k-th cell of the elevation order
//! supplies the elevation, so each bin pairs a wetness class with a
//! hypsometric level. Cells fill one bin at a time until it holds its share
//! of the wetland area.

use super::ProfileParams;
use crate::hydrology::rank_cells;
use crate::terrain::{CoverClass, WetnessGrids, WetnessParams};
use lakeparam_core::alloc::try_with_capacity;
use lakeparam_core::raster::Raster;
use lakeparam_core::Result;
use tracing::debug;

/// One aggregated wetland segment
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WetlandBin {
    pub cells: usize,
    /// Share of the grid cell's active area
    pub area_fraction: f64,
    pub wetness_index: f64,
    pub tan_beta: f64,
    pub relief: f64,
    /// First (lowest) elevation assigned to the bin
    pub elevation: f64,
}

/// Filled wetland bins plus the extremes the profile is anchored to
#[derive(Debug, Clone, PartialEq)]
pub struct WetlandBins {
    pub bins: Vec<WetlandBin>,
    /// Bin count the area was divided into; `bins` may hold fewer
    pub target_bins: usize,
    /// Wetness index of the wettest wetland cell
    pub max_wetness_index: f64,
    /// tan(beta) of the wettest wetland cell
    pub wettest_tan_beta: f64,
    /// Lowest wetland elevation
    pub min_elevation: f64,
    /// Elevation span of the wetness-gradient profile
    pub elevation_range: f64,
}

impl WetlandBins {
    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Sum of the bin area fractions
    pub fn area_fraction(&self) -> f64 {
        self.bins.iter().map(|b| b.area_fraction).sum()
    }
}

#[derive(Default)]
struct BinAccumulator {
    cells: usize,
    wetness_index: f64,
    tan_beta: f64,
    relief: f64,
    elevation: f64,
}

impl BinAccumulator {
    fn finish(&self, active_cells: usize) -> WetlandBin {
        let n = self.cells as f64;
        WetlandBin {
            cells: self.cells,
            area_fraction: n / active_cells as f64,
            wetness_index: self.wetness_index / n,
            tan_beta: self.tan_beta / n,
            relief: self.relief / n,
            elevation: self.elevation,
        }
    }
}

/// Number of bins the wetland area is divided into
pub fn target_bin_count(wetland_fraction: f64, params: &ProfileParams) -> usize {
    let by_area = (wetland_fraction / params.max_bin_fraction).ceil() as usize;
    by_area.max(params.min_wetland_bins)
}

/// Aggregate the wetland cells of a classified grid into bins.
///
/// Returns `None` when no cell is classified as wetland.
pub fn bin_wetland_cells(
    filled: &Raster<f64>,
    grids: &WetnessGrids,
    wetness: &WetnessParams,
    params: &ProfileParams,
) -> Result<Option<WetlandBins>> {
    params.validate()?;
    filled.ensure_same_shape(&grids.class)?;

    let fractions = grids.fractions;
    let wetland_cells = fractions.wetland_cells;
    if wetland_cells == 0 {
        return Ok(None);
    }

    let is_wetland = |row: usize, col: usize| {
        // SAFETY: indices come from grids of the class raster's shape
        let code = unsafe { grids.class.get_unchecked(row, col) };
        code == CoverClass::Wetland as u8
    };
    let by_index = rank_cells(&grids.wetness_index, "wetland wetness order", is_wetland)?;
    let by_elevation = rank_cells(filled, "wetland elevation order", is_wetland)?;
    let n = by_index.len();
    if n == 0 {
        return Ok(None);
    }

    let target_bins = target_bin_count(fractions.wetland, params);
    let mut bins = try_with_capacity(target_bins, "wetland bins")?;
    let mut acc = BinAccumulator::default();

    for (k, (wet, low)) in by_index.iter().rev().zip(by_elevation.iter()).enumerate() {
        let (row, col) = (wet.row, wet.col);
        acc.cells += 1;
        acc.wetness_index += wet.rank;
        acc.tan_beta += grids.tan_beta.data()[(row, col)];
        acc.relief += grids.relief.data()[(row, col)];
        if acc.cells == 1 {
            acc.elevation = low.rank;
        }

        if acc.cells * target_bins >= wetland_cells || k + 1 == n {
            bins.push(acc.finish(fractions.active_cells));
            acc = BinAccumulator::default();
        }
    }

    let wettest = by_index[n - 1];
    let max_wetness_index = wettest.rank;
    let result = WetlandBins {
        bins,
        target_bins,
        max_wetness_index,
        wettest_tan_beta: grids.tan_beta.data()[(wettest.row, wettest.col)],
        min_elevation: by_elevation[0].rank,
        elevation_range: 2.0 * max_wetness_index / wetness.water_threshold,
    };

    debug!(
        wetland_cells,
        target_bins,
        filled_bins = result.len(),
        "wetland bins"
    );

    Ok(Some(result))
}
