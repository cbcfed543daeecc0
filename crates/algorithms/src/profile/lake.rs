//! Lake segment: regional depth regression and parabolic bathymetry

use super::ProfileParams;
use lakeparam_core::raster::CellGeometry;

/// Open-water part of a grid cell's profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LakeSegment {
    /// Share of active cells classified as open water
    pub water_fraction: f64,
    /// Lake area in km²
    pub area_km2: f64,
    /// Maximum depth in metres
    pub depth: f64,
    /// Number of equal-depth bins
    pub bins: usize,
}

impl LakeSegment {
    /// Build the lake segment, or `None` when the cell holds no open water.
    pub fn from_fraction(
        water_fraction: f64,
        active_cells: usize,
        geometry: &CellGeometry,
        params: &ProfileParams,
    ) -> Option<Self> {
        if water_fraction <= 0.0 || params.lake_bins == 0 {
            return None;
        }
        let area_km2 = water_fraction * active_cells as f64 * geometry.area() / 1.0e6;
        Some(Self {
            water_fraction,
            area_km2,
            depth: depth_for_area(area_km2, params),
            bins: params.lake_bins,
        })
    }

    /// `(cumulative depth, cumulative area fraction)` for bins 1..=bins,
    /// deepest first.
    pub fn levels(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        (1..=self.bins).map(move |i| {
            let level = i as f64 * self.depth / self.bins as f64;
            let area = self.water_fraction * (level / self.depth).sqrt();
            (level, area)
        })
    }
}

/// Two-segment regional regression of lake depth (m) on area (km²)
pub fn depth_for_area(area_km2: f64, params: &ProfileParams) -> f64 {
    if area_km2 < params.area_threshold_km2 {
        params.shallow_intercept - params.shallow_slope * area_km2
    } else {
        params.deep_depth
    }
}
