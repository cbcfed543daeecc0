//! I/O operations for reading and writing grids

mod ascii;

pub use ascii::{
    read_ascii_grid, read_ascii_grid_from_str, write_ascii_grid, AsciiGrid, GridHeader,
};
