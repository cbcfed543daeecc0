//! # lakeparam Algorithms
//!
//! Terrain and hydrology stages that turn one DEM into a lake/wetland profile.
//!
//! ## Stages
//!
//! - **hydrology**: pit and flat filling, ranked ordering, MFD flow accumulation
//! - **terrain**: topographic wetness index, cover classification, relief
//! - **profile**: lake regression, wetland binning, LAKE/SEA output schemas
//! - **pipeline**: the run context that owns every grid and drives the stages

pub mod hydrology;
pub mod pipeline;
pub mod profile;
pub mod terrain;

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::hydrology::{
        fill_pits_and_flats, flow_accumulation_mfd, rank_ascending, FillParams, FillReport,
        FilledDem, MfdParams, RankedItem,
    };
    pub use crate::pipeline::{PipelineConfig, PipelineRun};
    pub use crate::profile::{
        build_profile, validate_profile, OutputSchema, Profile, ProfileParams, ProfilePoint,
    };
    pub use crate::terrain::{
        wetness_index, CoverClass, CoverFractions, WetnessGrids, WetnessParams,
    };
    pub use lakeparam_core::prelude::*;
}
