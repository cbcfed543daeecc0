//! Run context for one grid cell
//!
//! [`PipelineRun`] owns the input DEM and every derived grid and drives the
//! stages in their fixed order: fill, route, wetness index, binning. Nothing
//! is shared between runs.

use crate::hydrology::{
    fill_pits_and_flats, flow_accumulation_mfd, FillParams, FillReport, MfdParams,
};
use crate::profile::{
    bin_wetland_cells, build_profile, validate_profile, LakeSegment, OutputSchema, Profile,
    ProfileParams, WetlandBins,
};
use crate::terrain::{wetness_index, WetnessGrids, WetnessParams};
use lakeparam_core::raster::Raster;
use lakeparam_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// All tunable constants of a run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub fill: FillParams,
    pub mfd: MfdParams,
    pub wetness: WetnessParams,
    pub profile: ProfileParams,
}

/// Segments the profile is assembled from
#[derive(Debug, Clone)]
struct Segments {
    lake: Option<LakeSegment>,
    wetland: Option<WetlandBins>,
    expected_area: f64,
}

/// One invocation of the pipeline over a single DEM
#[derive(Debug)]
pub struct PipelineRun {
    grid_id: String,
    config: PipelineConfig,
    dem: Raster<f64>,
    filled: Option<Raster<f64>>,
    fill_report: Option<FillReport>,
    flow: Option<Raster<f64>>,
    wetness: Option<WetnessGrids>,
    segments: Option<Segments>,
}

impl PipelineRun {
    /// Prepare a run.
    ///
    /// Fails with [`Error::InvalidParameter`] on an unusable profile
    /// configuration, and with [`Error::NoValidData`] when the DEM has fewer
    /// than 2 active cells, since a single cell has no drainage surface.
    pub fn new(grid_id: impl Into<String>, dem: Raster<f64>, config: PipelineConfig) -> Result<Self> {
        config.profile.validate()?;
        let grid_id = grid_id.into();
        if dem.active_cells() < 2 {
            return Err(Error::NoValidData { grid_id });
        }
        Ok(Self {
            grid_id,
            config,
            dem,
            filled: None,
            fill_report: None,
            flow: None,
            wetness: None,
            segments: None,
        })
    }

    pub fn grid_id(&self) -> &str {
        &self.grid_id
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Input DEM as read
    pub fn dem(&self) -> &Raster<f64> {
        &self.dem
    }

    pub fn filled(&self) -> Option<&Raster<f64>> {
        self.filled.as_ref()
    }

    pub fn fill_report(&self) -> Option<FillReport> {
        self.fill_report
    }

    pub fn flow(&self) -> Option<&Raster<f64>> {
        self.flow.as_ref()
    }

    pub fn wetness(&self) -> Option<&WetnessGrids> {
        self.wetness.as_ref()
    }

    pub fn lake(&self) -> Option<&LakeSegment> {
        self.segments.as_ref().and_then(|s| s.lake.as_ref())
    }

    pub fn wetland(&self) -> Option<&WetlandBins> {
        self.segments.as_ref().and_then(|s| s.wetland.as_ref())
    }

    /// Run every stage and build the profile in `schema`.
    pub fn execute(&mut self, schema: OutputSchema) -> Result<Profile> {
        self.fill()?;
        self.route()?;
        self.compute_wetness()?;
        self.bin()?;
        self.profile(schema)
    }

    /// Build and validate the profile from the binned segments.
    ///
    /// Can be called again for another schema once [`execute`](Self::execute)
    /// has run.
    pub fn profile(&self, schema: OutputSchema) -> Result<Profile> {
        let segments = self
            .segments
            .as_ref()
            .ok_or_else(|| Error::Algorithm("profile requested before binning".into()))?;

        let profile = build_profile(
            &self.grid_id,
            segments.lake.as_ref(),
            segments.wetland.as_ref(),
            schema,
        )?;
        validate_profile(
            &profile,
            segments.expected_area,
            self.config.profile.area_tolerance,
        )?;

        match profile.area_elevation_correlation() {
            Some(r) => debug!(correlation = r, "area/elevation correlation"),
            None => debug!("area/elevation correlation undefined"),
        }

        Ok(profile)
    }

    fn fill(&mut self) -> Result<()> {
        let start = Instant::now();
        let out = fill_pits_and_flats(&self.dem, self.config.fill.clone())?;
        debug!(elapsed = ?start.elapsed(), "fill stage");

        self.fill_report = Some(out.report);
        self.filled = Some(out.dem);
        Ok(())
    }

    fn route(&mut self) -> Result<()> {
        let filled = self.require_filled()?;
        let start = Instant::now();
        let flow = flow_accumulation_mfd(filled, self.config.mfd.clone())?;
        debug!(elapsed = ?start.elapsed(), "routing stage");

        self.flow = Some(flow);
        Ok(())
    }

    fn compute_wetness(&mut self) -> Result<()> {
        let filled = self.require_filled()?;
        let flow = self
            .flow
            .as_ref()
            .ok_or_else(|| Error::Algorithm("wetness index requested before routing".into()))?;

        let start = Instant::now();
        let grids = wetness_index(filled, flow, &self.config.wetness)?;
        debug!(elapsed = ?start.elapsed(), "wetness stage");

        let f = grids.fractions;
        info!(
            grid_id = %self.grid_id,
            active_cells = f.active_cells,
            water = f.water,
            wetland = f.wetland,
            upland = f.upland,
            "classified"
        );

        self.wetness = Some(grids);
        Ok(())
    }

    fn bin(&mut self) -> Result<()> {
        let filled = self.require_filled()?;
        let grids = self
            .wetness
            .as_ref()
            .ok_or_else(|| Error::Algorithm("binning requested before wetness index".into()))?;
        let fractions = grids.fractions;

        let lake = LakeSegment::from_fraction(
            fractions.water,
            fractions.active_cells,
            filled.geometry(),
            &self.config.profile,
        );
        let wetland =
            bin_wetland_cells(filled, grids, &self.config.wetness, &self.config.profile)?;

        if let Some(lake) = &lake {
            debug!(area_km2 = lake.area_km2, depth = lake.depth, "lake segment");
        }

        self.segments = Some(Segments {
            lake,
            wetland,
            expected_area: fractions.water + fractions.wetland,
        });
        Ok(())
    }

    fn require_filled(&self) -> Result<&Raster<f64>> {
        self.filled
            .as_ref()
            .ok_or_else(|| Error::Algorithm("stage requested before fill".into()))
    }
}
