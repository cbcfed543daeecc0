//! Hydrological conditioning and routing
//!
//! - Pit/flat filling: raise local minima until every interior cell drains
//! - Ranked ordering: stable cell ordering by elevation or wetness index
//! - MFD flow accumulation: slope-weighted multiple flow direction routing

mod fill_sinks;
mod flow_direction_mfd;
pub mod ranking;

pub use fill_sinks::{fill_pits_and_flats, FillParams, FillReport, FilledDem};
pub use flow_direction_mfd::{flow_accumulation_mfd, MfdParams};
pub use ranking::{rank_active_cells, rank_ascending, rank_cells, RankedItem};
