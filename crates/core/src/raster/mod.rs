//! Raster data structures and operations

mod element;
mod geometry;
mod grid;
pub mod neighborhood;

pub use element::RasterElement;
pub use geometry::{great_circle_distance, CellGeometry, EARTH_RADIUS_KM};
pub use grid::{Raster, RasterStatistics};
pub use neighborhood::{NeighborKind, NeighborTopology, NEIGHBOR_OFFSETS};
