//! Lake/wetland profile builder
//!
//! Turns the classified grid into a short elevation–area profile:
//!
//! - a lake segment of equal-depth bins when the cell holds open water,
//!   with depth from a regional area regression and parabolic bathymetry
//! - wetland bins stacked on top, one per share of the wetland area
//!
//! The profile runs from the lake bottom to the wetland top and is rendered
//! in either of two [`OutputSchema`]s.

mod lake;
mod schema;
mod stats;
mod wetland;

pub use lake::{depth_for_area, LakeSegment};
pub use schema::OutputSchema;
pub use stats::correlation;
pub use wetland::{bin_wetland_cells, target_bin_count, WetlandBin, WetlandBins};

use lakeparam_core::alloc::try_with_capacity;
use lakeparam_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Parameters for lake depth and wetland binning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfileParams {
    /// Equal-depth bins in the lake segment
    pub lake_bins: usize,
    /// Lake area (km²) at which the depth regression switches to a constant
    pub area_threshold_km2: f64,
    /// Depth (m) of a vanishingly small lake
    pub shallow_intercept: f64,
    /// Depth lost per km² of lake area below the threshold
    pub shallow_slope: f64,
    /// Depth (m) of lakes at or above the threshold
    pub deep_depth: f64,
    /// Fewest wetland bins emitted for any wetland area
    pub min_wetland_bins: usize,
    /// Largest share of the grid cell a single wetland bin may cover
    pub max_bin_fraction: f64,
    /// Allowed mismatch between the profile area and water + wetland
    pub area_tolerance: f64,
}

impl Default for ProfileParams {
    fn default() -> Self {
        Self {
            lake_bins: 4,
            area_threshold_km2: 40.9375,
            shallow_intercept: 7.04,
            shallow_slope: 0.07,
            deep_depth: 4.17,
            min_wetland_bins: 5,
            max_bin_fraction: 0.091,
            area_tolerance: 1e-5,
        }
    }
}

impl ProfileParams {
    /// Reject parameter sets that cannot produce a consistent profile.
    ///
    /// Lake depths must stay positive over the whole regression, and the
    /// wetland bin fraction must lie in (0, 1].
    pub fn validate(&self) -> Result<()> {
        let invalid = |name: &'static str, value: String, reason: &str| {
            Err(Error::InvalidParameter {
                name,
                value,
                reason: reason.into(),
            })
        };

        if self.lake_bins == 0 {
            return invalid("lake_bins", "0".into(), "a lake needs at least one bin");
        }
        if self.min_wetland_bins == 0 {
            return invalid("min_wetland_bins", "0".into(), "must be at least one bin");
        }
        let f = self.max_bin_fraction;
        if !(f.is_finite() && f > 0.0 && f <= 1.0) {
            return invalid("max_bin_fraction", f.to_string(), "must be in (0, 1]");
        }
        if !(self.area_tolerance.is_finite() && self.area_tolerance >= 0.0) {
            return invalid(
                "area_tolerance",
                self.area_tolerance.to_string(),
                "must be a non-negative finite number",
            );
        }
        if !(self.area_threshold_km2.is_finite() && self.area_threshold_km2 >= 0.0) {
            return invalid(
                "area_threshold_km2",
                self.area_threshold_km2.to_string(),
                "must be a non-negative finite area",
            );
        }
        if !(self.shallow_slope.is_finite() && self.shallow_slope >= 0.0) {
            return invalid(
                "shallow_slope",
                self.shallow_slope.to_string(),
                "must be a non-negative finite rate",
            );
        }
        // Shallowest regression depth is reached just below the threshold
        let shallowest = self.shallow_intercept - self.shallow_slope * self.area_threshold_km2;
        if !(shallowest.is_finite() && shallowest > 0.0) {
            return invalid(
                "shallow_intercept",
                self.shallow_intercept.to_string(),
                "depth must stay positive up to the area threshold",
            );
        }
        if !(self.deep_depth.is_finite() && self.deep_depth > 0.0) {
            return invalid("deep_depth", self.deep_depth.to_string(), "must be a positive depth");
        }
        Ok(())
    }
}

/// One level of the profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfilePoint {
    /// Cumulative elevation above the lake bottom (m)
    pub elevation: f64,
    /// Cumulative share of the grid cell area
    pub area_fraction: f64,
    /// Wetness index (SEA only)
    pub wetness_index: f64,
    /// tan(beta) (SEA only)
    pub slope: f64,
}

/// Elevation–area profile of one grid cell, lake bottom first
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    pub grid_id: String,
    pub schema: OutputSchema,
    /// Lake depth (m), 0 without a lake
    pub lake_depth: f64,
    pub points: Vec<ProfilePoint>,
}

impl Profile {
    /// Cumulative area at the top of the profile
    pub fn total_area(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.area_fraction)
    }

    /// Pearson correlation between cumulative area and elevation
    pub fn area_elevation_correlation(&self) -> Option<f64> {
        let area: Vec<f64> = self.points.iter().map(|p| p.area_fraction).collect();
        let elevation: Vec<f64> = self.points.iter().map(|p| p.elevation).collect();
        correlation(&area, &elevation)
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.schema.render(self))
    }
}

/// Assemble the profile from its lake and wetland segments.
///
/// Lake bins come first with cumulative depth as elevation. Wetland bins
/// follow with cumulative area. Their elevation is bathymetric for
/// [`OutputSchema::Lake`] and follows the wetness-index gradient for
/// [`OutputSchema::Sea`].
pub fn build_profile(
    grid_id: &str,
    lake: Option<&LakeSegment>,
    wetland: Option<&WetlandBins>,
    schema: OutputSchema,
) -> Result<Profile> {
    let lake_bins = lake.map_or(0, |l| l.bins);
    let wetland_bins = wetland.map_or(0, |w| w.len());
    let mut points: Vec<ProfilePoint> =
        try_with_capacity(lake_bins + wetland_bins, "profile points")?;

    let lake_depth = lake.map_or(0.0, |l| l.depth);
    let (lake_index, lake_slope) =
        wetland.map_or((0.0, 0.0), |w| (w.max_wetness_index, w.wettest_tan_beta));

    if let Some(lake) = lake {
        for (level, area) in lake.levels() {
            points.push(ProfilePoint {
                elevation: level,
                area_fraction: area,
                wetness_index: lake_index,
                slope: lake_slope,
            });
        }
    }

    if let Some(wetland) = wetland {
        let mut area = points.last().map_or(0.0, |p| p.area_fraction);
        let max_index = wetland.max_wetness_index;
        let last_index = wetland.bins.last().map_or(max_index, |b| b.wetness_index);
        let span = max_index - last_index;

        for bin in &wetland.bins {
            area += bin.area_fraction;
            let elevation = match schema {
                OutputSchema::Lake => bin.elevation - wetland.min_elevation + lake_depth,
                OutputSchema::Sea if points.is_empty() => wetland.elevation_range,
                OutputSchema::Sea => {
                    let ratio = if span == 0.0 {
                        0.0
                    } else {
                        (max_index - bin.wetness_index) / span
                    };
                    lake_depth + wetland.elevation_range * ratio
                }
            };
            points.push(ProfilePoint {
                elevation,
                area_fraction: area,
                wetness_index: bin.wetness_index,
                slope: bin.tan_beta,
            });
        }
    }

    Ok(Profile {
        grid_id: grid_id.to_string(),
        schema,
        lake_depth,
        points,
    })
}

/// Check that the profile's final cumulative area matches `expected`
/// (water + wetland fraction) within `tolerance`.
pub fn validate_profile(profile: &Profile, expected: f64, tolerance: f64) -> Result<()> {
    let profile_area = profile.total_area();
    if (profile_area - expected).abs() > tolerance {
        return Err(Error::ProfileInconsistent {
            profile_area,
            expected,
        });
    }
    Ok(())
}
