//! Ranked cell ordering
//!
//! Flow routing and the wetness index visit cells from highest to lowest
//! elevation, and wetland binning needs cells ordered by wetness index and by
//! elevation. All of them go through [`rank_ascending`], which sorts by key
//! and breaks ties by row-major position so that runs are reproducible.

use lakeparam_core::alloc::try_with_capacity;
use lakeparam_core::raster::Raster;
use lakeparam_core::Result;
use std::cmp::Ordering;

/// A cell tagged with a sort key
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RankedItem {
    pub rank: f64,
    pub row: usize,
    pub col: usize,
}

impl RankedItem {
    pub fn new(rank: f64, row: usize, col: usize) -> Self {
        Self { rank, row, col }
    }

    fn cmp_key(&self, other: &Self) -> Ordering {
        self.rank
            .total_cmp(&other.rank)
            .then(self.row.cmp(&other.row))
            .then(self.col.cmp(&other.col))
    }
}

/// Sort items ascending by rank, ties broken by (row, col).
pub fn rank_ascending(items: &mut [RankedItem]) {
    items.sort_by(RankedItem::cmp_key);
}

/// Collect the cells of `keys` accepted by `include`, keyed by their value,
/// sorted ascending.
///
/// `structure` names the buffer in an allocation error.
pub fn rank_cells<F>(keys: &Raster<f64>, structure: &'static str, include: F) -> Result<Vec<RankedItem>>
where
    F: Fn(usize, usize) -> bool,
{
    let (rows, cols) = keys.shape();
    let mut items = try_with_capacity(rows * cols, structure)?;

    for ((row, col), &value) in keys.data().indexed_iter() {
        if include(row, col) {
            items.push(RankedItem::new(value, row, col));
        }
    }

    rank_ascending(&mut items);
    Ok(items)
}

/// All active (non-nodata) cells of `grid`, lowest value first
pub fn rank_active_cells(grid: &Raster<f64>, structure: &'static str) -> Result<Vec<RankedItem>> {
    rank_cells(grid, structure, |row, col| {
        // SAFETY: indices come from the grid's own shape
        let v = unsafe { grid.get_unchecked(row, col) };
        !grid.is_nodata(v)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sorted_ascending() {
        let mut items = vec![
            RankedItem::new(3.0, 0, 0),
            RankedItem::new(-1.5, 0, 1),
            RankedItem::new(2.0, 1, 0),
        ];
        rank_ascending(&mut items);
        let ranks: Vec<f64> = items.iter().map(|i| i.rank).collect();
        assert_eq!(ranks, vec![-1.5, 2.0, 3.0]);
    }

    #[test]
    fn test_ties_break_row_major() {
        let mut items = vec![
            RankedItem::new(5.0, 2, 1),
            RankedItem::new(5.0, 0, 3),
            RankedItem::new(5.0, 2, 0),
            RankedItem::new(5.0, 0, 1),
        ];
        rank_ascending(&mut items);
        let pos: Vec<(usize, usize)> = items.iter().map(|i| (i.row, i.col)).collect();
        assert_eq!(pos, vec![(0, 1), (0, 3), (2, 0), (2, 1)]);
    }

    #[test]
    fn test_tie_order_independent_of_input_order() {
        let base = vec![
            RankedItem::new(1.0, 1, 1),
            RankedItem::new(1.0, 0, 2),
            RankedItem::new(0.5, 3, 0),
            RankedItem::new(1.0, 0, 0),
        ];
        let mut a = base.clone();
        let mut b: Vec<_> = base.into_iter().rev().collect();
        rank_ascending(&mut a);
        rank_ascending(&mut b);
        assert_eq!(a, b);
    }

    #[test]
    fn test_rank_active_cells_skips_nodata() {
        let mut grid = Raster::from_vec(vec![4.0, -9999.0, 1.0, 2.0], 2, 2).unwrap();
        grid.set_nodata(Some(-9999.0));

        let ranked = rank_active_cells(&grid, "test order").unwrap();
        assert_eq!(ranked.len(), 3);
        assert_eq!((ranked[0].row, ranked[0].col), (1, 0));
        assert_eq!(ranked[2].rank, 4.0);
    }

    #[test]
    fn test_rank_cells_with_filter() {
        let grid = Raster::from_vec(vec![9.0, 8.0, 7.0, 6.0], 2, 2).unwrap();
        let ranked = rank_cells(&grid, "test order", |row, _| row == 0).unwrap();
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].rank, 8.0);
    }
}
