//! Terrain analysis algorithms
//!
//! - TWI: topographic wetness index from MFD contributing area
//! - Cover classification: upland / wetland / open water by TWI threshold
//! - Relief: mean elevation drop toward wetter, lower neighbors

mod twi;

pub use twi::{wetness_index, CoverClass, CoverFractions, WetnessGrids, WetnessParams};
