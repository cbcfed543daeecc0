//! # lakeparam Core
//!
//! Core types, traits and I/O for the lakeparam terrain pipeline.
//!
//! This crate provides:
//! - `Raster<T>`: Generic raster grid type with a nodata sentinel
//! - `CellGeometry`: Metric cell size derived from a geographic header
//! - `NeighborTopology`: Clamped 8-neighbor lookup tables
//! - I/O for Arc/Info ASCII grids

pub mod alloc;
pub mod error;
pub mod io;
pub mod raster;

pub use error::{Error, Result};
pub use raster::{CellGeometry, NeighborTopology, Raster, RasterElement};

/// Prelude for convenient imports
pub mod prelude {
    pub use crate::error::{Error, Result};
    pub use crate::raster::{CellGeometry, NeighborTopology, Raster, RasterElement};
}
