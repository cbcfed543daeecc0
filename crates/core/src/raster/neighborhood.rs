//! Clamped 8-neighbor topology
//!
//! Every iterative stage of the pipeline looks at the 8 neighbors of a cell
//! through [`NeighborTopology`]. A step that would leave the grid maps back
//! onto the cell itself, so edge cells are their own edge neighbors. This is a
//! zero-gradient boundary: no wraparound, no reflection, no nodata.

use super::CellGeometry;

/// Neighbor offsets `(row_offset, col_offset)`, clockwise from the north-west
/// diagonal.
///
/// Even indices are diagonals and odd indices are cardinals. Indices 1 and 5
/// (N, S) are vertical neighbors, 3 and 7 (E, W) horizontal ones. Geometric
/// weights in the flow and wetness stages are keyed on this parity.
pub const NEIGHBOR_OFFSETS: [(isize, isize); 8] = [
    (-1, -1), // 0: NW
    (-1, 0),  // 1: N
    (-1, 1),  // 2: NE
    (0, 1),   // 3: E
    (1, 1),   // 4: SE
    (1, 0),   // 5: S
    (1, -1),  // 6: SW
    (0, -1),  // 7: W
];

/// Geometric class of a neighbor direction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NeighborKind {
    /// Corner neighbor, distance is the cell diagonal
    Diagonal,
    /// North or south neighbor, distance is `dy`
    Vertical,
    /// East or west neighbor, distance is `dx`
    Horizontal,
}

impl NeighborKind {
    /// Classify the direction at `index` in [`NEIGHBOR_OFFSETS`]
    pub fn of(index: usize) -> Self {
        match index {
            1 | 5 => NeighborKind::Vertical,
            3 | 7 => NeighborKind::Horizontal,
            _ => NeighborKind::Diagonal,
        }
    }

    /// Centre-to-centre distance to a neighbor of this kind
    pub fn distance(self, geometry: &CellGeometry) -> f64 {
        match self {
            NeighborKind::Diagonal => geometry.diagonal(),
            NeighborKind::Vertical => geometry.dy,
            NeighborKind::Horizontal => geometry.dx,
        }
    }
}

/// Precomputed clamped up/down index tables for a `rows x cols` lattice.
#[derive(Debug, Clone)]
pub struct NeighborTopology {
    rows: usize,
    cols: usize,
    row_down: Vec<usize>,
    row_up: Vec<usize>,
    col_down: Vec<usize>,
    col_up: Vec<usize>,
}

impl NeighborTopology {
    pub fn new(rows: usize, cols: usize) -> Self {
        let row_down = (0..rows).map(|r| r.saturating_sub(1)).collect();
        let row_up = (0..rows).map(|r| (r + 1).min(rows.saturating_sub(1))).collect();
        let col_down = (0..cols).map(|c| c.saturating_sub(1)).collect();
        let col_up = (0..cols).map(|c| (c + 1).min(cols.saturating_sub(1))).collect();

        Self {
            rows,
            cols,
            row_down,
            row_up,
            col_down,
            col_up,
        }
    }

    /// Address of neighbor `index` of `(row, col)`, clamped to the grid
    #[inline]
    pub fn neighbor(&self, row: usize, col: usize, index: usize) -> (usize, usize) {
        let (dr, dc) = NEIGHBOR_OFFSETS[index];
        let nr = match dr {
            -1 => self.row_down[row],
            1 => self.row_up[row],
            _ => row,
        };
        let nc = match dc {
            -1 => self.col_down[col],
            1 => self.col_up[col],
            _ => col,
        };
        (nr, nc)
    }

    /// All 8 clamped neighbor addresses in [`NEIGHBOR_OFFSETS`] order
    #[inline]
    pub fn neighbors(&self, row: usize, col: usize) -> [(usize, usize); 8] {
        std::array::from_fn(|k| self.neighbor(row, col, k))
    }

    /// Whether `(row, col)` lies on the outer ring of the grid
    #[inline]
    pub fn is_border(&self, row: usize, col: usize) -> bool {
        row == 0 || col == 0 || row + 1 >= self.rows || col + 1 >= self.cols
    }
}
