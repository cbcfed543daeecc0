//! Pit and flat filling
//!
//! Removes local minima and flat regions so that every interior cell has a
//! strictly lower neighbor to drain into. A cell lower than or equal to the
//! neighbor it spills into is raised to `spill + increment`.
//!
//! Cells are settled in ascending order of filled elevation from a min-heap
//! seeded with the outer ring (Priority-Flood). Border cells are their own
//! out-of-grid neighbors and are never raised, so they are the outlets. Every
//! other cell is reached from its lowest settled neighbor and raised at most
//! once, which keeps wide flats such as lake surfaces O(n log n).
//!
//! Terrain enclosed by nodata is never reached from the border and has no
//! outlet. It goes through an explicit LIFO worklist with an `in_worklist`
//! marker instead, which re-applies the raise rule until the surface settles
//! or the budget of `max_raises_per_cell * active_cells` raises runs out.
//!
//! Reference:
//! Barnes, R., Lehman, C., & Mulla, D. (2014). Priority-Flood: An optimal
//! depression-filling and watershed-labeling algorithm for digital elevation
//! models. *Computers & Geosciences*, 62, 117–127.

use lakeparam_core::alloc::{try_vec, try_with_capacity};
use lakeparam_core::raster::{NeighborTopology, Raster};
use lakeparam_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use tracing::{debug, warn};

/// Parameters for pit and flat filling
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillParams {
    /// Height above the spill elevation a raised cell is set to (m)
    pub increment: f64,
    /// Raise budget per active cell. Only terrain enclosed by nodata can
    /// exhaust the `max_raises_per_cell * active_cells` total.
    pub max_raises_per_cell: usize,
}

impl Default for FillParams {
    fn default() -> Self {
        Self {
            increment: 0.01,
            max_raises_per_cell: 1000,
        }
    }
}

impl FillParams {
    fn validate(&self) -> Result<()> {
        if !(self.increment.is_finite() && self.increment > 0.0) {
            return Err(Error::InvalidParameter {
                name: "increment",
                value: self.increment.to_string(),
                reason: "must be a positive finite height".into(),
            });
        }
        if self.max_raises_per_cell == 0 {
            return Err(Error::InvalidParameter {
                name: "max_raises_per_cell",
                value: "0".into(),
                reason: "must allow at least one raise".into(),
            });
        }
        Ok(())
    }
}

/// Counters describing one fill run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillReport {
    /// Distinct cells raised at least once
    pub raised_cells: usize,
    /// Total number of raise operations
    pub total_raises: usize,
    /// The raise budget ran out before the surface settled
    pub hit_cap: bool,
}

impl FillReport {
    fn record(&mut self, raised: &mut [bool], idx: usize) {
        self.total_raises += 1;
        if !raised[idx] {
            raised[idx] = true;
            self.raised_cells += 1;
        }
    }
}

/// Filled surface plus the run's counters
#[derive(Debug, Clone)]
pub struct FilledDem {
    pub dem: Raster<f64>,
    pub report: FillReport,
}

/// A settled cell in the priority queue
#[derive(Debug, Clone, Copy)]
struct Spill {
    elevation: f64,
    row: usize,
    col: usize,
}

impl PartialEq for Spill {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Spill {}

impl PartialOrd for Spill {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Reversed so BinaryHeap pops the lowest cell first, ties in row-major order
impl Ord for Spill {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .elevation
            .total_cmp(&self.elevation)
            .then(other.row.cmp(&self.row))
            .then(other.col.cmp(&self.col))
    }
}

/// Fill pits and flats in a DEM.
///
/// Border cells and nodata cells are never modified, and no elevation ever
/// decreases. A cell with no valid neighbor is left as is.
///
/// # Arguments
/// * `dem` - Input elevation raster
/// * `params` - Raise increment and revisit budget
///
/// # Returns
/// The filled surface and a [`FillReport`]. When the budget is exhausted on
/// enclosed terrain the partially filled surface is returned with `hit_cap`
/// set.
pub fn fill_pits_and_flats(dem: &Raster<f64>, params: FillParams) -> Result<FilledDem> {
    params.validate()?;

    let (rows, cols) = dem.shape();
    let topo = NeighborTopology::new(rows, cols);

    let mut filled = Raster::try_filled(rows, cols, 0.0, "filled elevation")?;
    filled.data_mut().assign(dem.data());
    filled.set_geometry(*dem.geometry());
    filled.set_nodata(dem.nodata());

    let total = rows * cols;
    let mut settled = try_vec(total, false, "fill settled marker")?;
    let mut raised = try_vec(total, false, "fill raised marker")?;
    let mut queue = BinaryHeap::from(try_with_capacity::<Spill>(total, "fill queue")?);
    let mut report = FillReport::default();

    for row in 0..rows {
        for col in 0..cols {
            if !topo.is_border(row, col) {
                continue;
            }
            // SAFETY: (row, col) is inside the grid
            let z = unsafe { filled.get_unchecked(row, col) };
            if filled.is_nodata(z) {
                continue;
            }
            settled[row * cols + col] = true;
            queue.push(Spill { elevation: z, row, col });
        }
    }

    while let Some(cell) = queue.pop() {
        for (nr, nc) in topo.neighbors(cell.row, cell.col) {
            let idx = nr * cols + nc;
            if settled[idx] {
                continue;
            }
            // SAFETY: clamped neighbor addresses are inside the grid
            let mut z = unsafe { filled.get_unchecked(nr, nc) };
            if filled.is_nodata(z) {
                continue;
            }
            settled[idx] = true;

            if z <= cell.elevation {
                z = cell.elevation + params.increment;
                filled.data_mut()[(nr, nc)] = z;
                report.record(&mut raised, idx);
            }
            queue.push(Spill {
                elevation: z,
                row: nr,
                col: nc,
            });
        }
    }

    let budget = params
        .max_raises_per_cell
        .saturating_mul(dem.active_cells());
    fill_enclosed(&mut filled, &topo, &settled, &mut raised, budget, &params, &mut report)?;

    debug!(
        raised_cells = report.raised_cells,
        total_raises = report.total_raises,
        hit_cap = report.hit_cap,
        "fill finished"
    );

    Ok(FilledDem {
        dem: filled,
        report,
    })
}

/// Raise active cells the border flood never reached.
///
/// A cell is raised to `min(valid neighbors) + increment` when it is lower
/// than or equal to that minimum; it and its neighbors are then re-queued.
fn fill_enclosed(
    filled: &mut Raster<f64>,
    topo: &NeighborTopology,
    settled: &[bool],
    raised: &mut [bool],
    budget: usize,
    params: &FillParams,
    report: &mut FillReport,
) -> Result<()> {
    let (rows, cols) = filled.shape();
    let is_enclosed = |row: usize, col: usize| {
        // SAFETY: (row, col) is inside the grid
        !settled[row * cols + col] && !filled.is_nodata(unsafe { filled.get_unchecked(row, col) })
    };

    let enclosed = (0..rows)
        .flat_map(|row| (0..cols).map(move |col| (row, col)))
        .filter(|&(row, col)| is_enclosed(row, col))
        .count();
    if enclosed == 0 {
        return Ok(());
    }
    debug!(enclosed_cells = enclosed, "terrain enclosed by nodata");

    let mut in_worklist = try_vec(rows * cols, false, "fill worklist marker")?;
    let mut worklist: Vec<(usize, usize)> = try_with_capacity(enclosed, "fill worklist")?;

    // Pushed in reverse so the first sweep pops in row-major order
    for row in (0..rows).rev() {
        for col in (0..cols).rev() {
            if is_enclosed(row, col) {
                in_worklist[row * cols + col] = true;
                worklist.push((row, col));
            }
        }
    }

    while let Some((row, col)) = worklist.pop() {
        in_worklist[row * cols + col] = false;

        // SAFETY: (row, col) and its clamped neighbors are inside the grid
        let z = unsafe { filled.get_unchecked(row, col) };
        if settled[row * cols + col] || filled.is_nodata(z) {
            continue;
        }

        let mut lowest = f64::INFINITY;
        for (nr, nc) in topo.neighbors(row, col) {
            let nz = unsafe { filled.get_unchecked(nr, nc) };
            if !filled.is_nodata(nz) && nz < lowest {
                lowest = nz;
            }
        }

        if lowest == f64::INFINITY || z > lowest {
            continue;
        }

        if report.total_raises >= budget {
            report.hit_cap = true;
            warn!(
                budget,
                "fill stopped after exhausting its raise budget; terrain enclosed by nodata cannot drain"
            );
            break;
        }

        filled.data_mut()[(row, col)] = lowest + params.increment;
        report.record(raised, row * cols + col);

        for (nr, nc) in std::iter::once((row, col)).chain(topo.neighbors(row, col)) {
            let idx = nr * cols + nc;
            if !in_worklist[idx] {
                in_worklist[idx] = true;
                worklist.push((nr, nc));
            }
        }
    }

    Ok(())
}
