//! Whole-pipeline properties on synthetic valleys.
//!
//! The DEMs are small enough to build in memory: a tilted valley draining
//! to the north edge, with a shallow depression and an optional nodata hole.

use approx::assert_relative_eq;
use lakeparam_algorithms::hydrology::{
    fill_pits_and_flats, flow_accumulation_mfd, rank_ascending, FillParams, MfdParams,
    RankedItem,
};
use lakeparam_algorithms::pipeline::{PipelineConfig, PipelineRun};
use lakeparam_algorithms::profile::{validate_profile, OutputSchema};
use lakeparam_algorithms::terrain::{wetness_index, CoverClass, WetnessParams};
use lakeparam_core::io::{read_ascii_grid, read_ascii_grid_from_str, write_ascii_grid};
use lakeparam_core::{CellGeometry, Error, NeighborTopology, Raster};
use std::fmt::Write as _;
use std::io::Write as _;

const ND: f64 = -9999.0;
const SIZE: usize = 40;

fn valley_elevation(row: usize, col: usize) -> f64 {
    let across = (col as f64 - (SIZE / 2) as f64).abs();
    100.0 + 0.2 * row as f64 + 0.05 * across
}

/// Valley with a 3x3 depression half a metre deep around (20, 20)
fn valley_dem() -> Raster<f64> {
    let mut dem = Raster::new(SIZE, SIZE);
    dem.set_geometry(CellGeometry::square(30.0));
    dem.set_nodata(Some(ND));
    for row in 0..SIZE {
        for col in 0..SIZE {
            let mut z = valley_elevation(row, col);
            if (19..=21).contains(&row) && (19..=21).contains(&col) {
                z -= 0.5;
            }
            dem.set(row, col, z).unwrap();
        }
    }
    dem
}

/// Same valley with a block of nodata on one flank
fn valley_with_hole() -> Raster<f64> {
    let mut dem = valley_dem();
    for row in 10..15 {
        for col in 5..9 {
            dem.set(row, col, ND).unwrap();
        }
    }
    dem
}

fn valid(dem: &Raster<f64>, row: usize, col: usize) -> Option<f64> {
    let z = dem.get(row, col).unwrap();
    (!dem.is_nodata(z) && !z.is_nan()).then_some(z)
}

/// Sum of flow at active cells with no strictly lower valid neighbor
fn terminal_flow(dem: &Raster<f64>, flow: &Raster<f64>) -> f64 {
    let (rows, cols) = dem.shape();
    let topo = NeighborTopology::new(rows, cols);
    let mut total = 0.0;
    for row in 0..rows {
        for col in 0..cols {
            let Some(z) = valid(dem, row, col) else { continue };
            let drains = topo
                .neighbors(row, col)
                .iter()
                .any(|&(nr, nc)| valid(dem, nr, nc).is_some_and(|nz| nz < z));
            if !drains {
                total += flow.get(row, col).unwrap();
            }
        }
    }
    total
}

fn ascii_text(dem: &Raster<f64>, cellsize: f64) -> String {
    let (rows, cols) = dem.shape();
    let mut text = String::new();
    writeln!(text, "ncols {cols}").unwrap();
    writeln!(text, "nrows {rows}").unwrap();
    writeln!(text, "xllcorner -70.5").unwrap();
    writeln!(text, "yllcorner 45.0").unwrap();
    writeln!(text, "cellsize {cellsize}").unwrap();
    writeln!(text, "NODATA_value {ND}").unwrap();
    for row in 0..rows {
        let line: Vec<String> = (0..cols)
            .map(|col| dem.get(row, col).unwrap().to_string())
            .collect();
        writeln!(text, "{}", line.join(" ")).unwrap();
    }
    text
}

#[test]
fn fill_never_lowers_and_leaves_border_alone() {
    let dem = valley_with_hole();
    let out = fill_pits_and_flats(&dem, FillParams::default()).unwrap();
    let filled = &out.dem;
    let topo = NeighborTopology::new(SIZE, SIZE);

    assert!(!out.report.hit_cap);
    assert!(out.report.raised_cells > 0);
    assert!(
        filled.get(19, 20).unwrap() > dem.get(19, 20).unwrap(),
        "depression floor should be raised"
    );

    for row in 0..SIZE {
        for col in 0..SIZE {
            let before = dem.get(row, col).unwrap();
            let after = filled.get(row, col).unwrap();
            if dem.is_nodata(before) {
                assert_eq!(after, before);
                continue;
            }
            assert!(after >= before, "({row}, {col}) lowered");
            if topo.is_border(row, col) {
                assert_eq!(after, before, "border ({row}, {col}) changed");
                continue;
            }

            let neighbors: Vec<f64> = topo
                .neighbors(row, col)
                .iter()
                .filter_map(|&(nr, nc)| valid(filled, nr, nc))
                .collect();
            if !neighbors.is_empty() {
                assert!(
                    neighbors.iter().any(|&nz| nz < after),
                    "interior ({row}, {col}) is still a sink"
                );
            }
        }
    }
}

#[test]
fn flow_is_conserved_at_terminal_cells() {
    let filled = fill_pits_and_flats(&valley_with_hole(), FillParams::default())
        .unwrap()
        .dem;
    let flow = flow_accumulation_mfd(&filled, MfdParams::default()).unwrap();

    let expected = filled.active_cells() as f64 * filled.cell_area();
    assert_relative_eq!(terminal_flow(&filled, &flow), expected, max_relative = 1e-9);

    for row in 10..15 {
        for col in 5..9 {
            assert!(flow.get(row, col).unwrap().is_nan());
        }
    }
}

#[test]
fn tie_order_does_not_change_routing() {
    // Ranked order ignores the input order of equal keys
    let items = vec![
        RankedItem::new(2.0, 0, 1),
        RankedItem::new(1.0, 1, 1),
        RankedItem::new(2.0, 0, 0),
        RankedItem::new(1.0, 0, 2),
    ];
    let mut forward = items.clone();
    let mut backward: Vec<RankedItem> = items.into_iter().rev().collect();
    rank_ascending(&mut forward);
    rank_ascending(&mut backward);
    assert_eq!(forward, backward);

    // Mirroring a DEM full of equal-elevation ties reverses their row-major
    // order but must mirror the routed flow exactly
    let cols = 9;
    let mut dem = Raster::new(8, cols);
    dem.set_geometry(CellGeometry::square(10.0));
    for row in 0..8 {
        for col in 0..cols {
            let across = (col as f64 - 3.0).abs().min(2.0);
            dem.set(row, col, 50.0 + row as f64 + across).unwrap();
        }
    }
    let mut mirrored = dem.clone();
    for row in 0..8 {
        for col in 0..cols {
            mirrored.set(row, col, dem.get(row, cols - 1 - col).unwrap()).unwrap();
        }
    }

    let flow = flow_accumulation_mfd(&dem, MfdParams::default()).unwrap();
    let flow_m = flow_accumulation_mfd(&mirrored, MfdParams::default()).unwrap();
    for row in 0..8 {
        for col in 0..cols {
            assert_relative_eq!(
                flow.get(row, col).unwrap(),
                flow_m.get(row, cols - 1 - col).unwrap(),
                max_relative = 1e-9
            );
        }
    }
    assert_relative_eq!(
        terminal_flow(&dem, &flow),
        terminal_flow(&mirrored, &flow_m),
        max_relative = 1e-9
    );
}

#[test]
fn every_active_cell_has_one_class() {
    let filled = fill_pits_and_flats(&valley_with_hole(), FillParams::default())
        .unwrap()
        .dem;
    let flow = flow_accumulation_mfd(&filled, MfdParams::default()).unwrap();
    let grids = wetness_index(&filled, &flow, &WetnessParams::default()).unwrap();

    let mut counts = [0usize; 3];
    for row in 0..SIZE {
        for col in 0..SIZE {
            let code = grids.class.get(row, col).unwrap();
            if valid(&filled, row, col).is_none() {
                assert_eq!(code, CoverClass::NODATA);
                continue;
            }
            let class = CoverClass::from_code(code).expect("active cell without class");
            counts[class as usize] += 1;
        }
    }

    let f = grids.fractions;
    assert_eq!(counts[CoverClass::Water as usize], f.water_cells);
    assert_eq!(counts[CoverClass::Wetland as usize], f.wetland_cells);
    assert_eq!(counts.iter().sum::<usize>(), f.active_cells);
    assert_relative_eq!(f.water + f.wetland + f.upland, 1.0, epsilon = 1e-12);
}

#[test]
fn profile_area_matches_water_and_wetland() {
    let mut run = PipelineRun::new("1234", valley_dem(), PipelineConfig::default()).unwrap();
    let profile = run.execute(OutputSchema::Lake).unwrap();

    let f = run.wetness().unwrap().fractions;
    assert!(run.lake().is_some(), "valley outlet should hold open water");
    assert!(run.wetland().is_some(), "valley floor should hold wetland");
    assert_relative_eq!(profile.total_area(), f.water + f.wetland, epsilon = 1e-9);

    // Elevations and areas only grow from the lake bottom up
    for pair in profile.points.windows(2) {
        assert!(pair[1].area_fraction >= pair[0].area_fraction);
        assert!(pair[1].elevation >= pair[0].elevation);
    }

    let mut corrupted = profile.clone();
    let last = corrupted.points.len() - 1;
    corrupted.points[last].area_fraction += 0.01;
    assert!(matches!(
        validate_profile(&corrupted, f.water + f.wetland, 1e-5),
        Err(Error::ProfileInconsistent { .. })
    ));
}

#[test]
fn schemas_agree_on_cumulative_area() {
    let mut run = PipelineRun::new("77", valley_dem(), PipelineConfig::default()).unwrap();
    let lake = run.execute(OutputSchema::Lake).unwrap();
    let sea = run.profile(OutputSchema::Sea).unwrap();

    assert_eq!(lake.points.len(), sea.points.len());
    for (a, b) in lake.points.iter().zip(&sea.points) {
        assert_eq!(a.area_fraction, b.area_fraction);
    }

    let n = lake.points.len();
    let lake_text = lake.to_string();
    let sea_text = sea.to_string();
    let lake_lines: Vec<&str> = lake_text.lines().collect();
    let sea_lines: Vec<&str> = sea_text.lines().collect();
    assert_eq!(lake_lines.len(), 2);
    assert_eq!(sea_lines.len(), 2);
    assert!(lake_lines[0].starts_with(&format!("77 1 {n} ")));
    assert!(sea_lines[0].starts_with(&format!("77 0 {n} ")));
    assert_eq!(lake_lines[1].split(' ').count(), 2 * n);
    assert_eq!(sea_lines[1].split(' ').count(), 4 * n);
}

#[test]
fn single_active_cell_is_no_valid_data() {
    let mut dem = Raster::filled(4, 4, ND);
    dem.set(2, 1, 310.0).unwrap();
    let grid = read_ascii_grid_from_str(&ascii_text(&dem, 0.01)).unwrap();

    let err = PipelineRun::new("5", grid.raster, PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, Error::NoValidData { ref grid_id } if grid_id == "5"));
}

#[test]
fn ascii_grid_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("cell.asc");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(ascii_text(&valley_dem(), 0.0003).as_bytes()).unwrap();
    drop(file);

    let grid = read_ascii_grid(&path).unwrap();
    let geometry = *grid.raster.geometry();
    assert!(geometry.dx < geometry.dy, "longitude spacing shrinks at 45N");
    assert_relative_eq!(geometry.dy, 33.36, max_relative = 1e-3);

    let mut run = PipelineRun::new("9001", grid.raster, PipelineConfig::default()).unwrap();
    let profile = run.execute(OutputSchema::Sea).unwrap();
    assert!(profile.to_string().starts_with("9001 0 "));

    // Dumped grids read back with the same values
    let dump = dir.path().join("filled.asc");
    write_ascii_grid(run.filled().unwrap(), &grid.header, &dump).unwrap();
    let reread = read_ascii_grid(&dump).unwrap();
    let filled = run.filled().unwrap();
    for row in 0..SIZE {
        for col in 0..SIZE {
            assert_relative_eq!(
                reread.raster.get(row, col).unwrap(),
                filled.get(row, col).unwrap(),
                epsilon = 1e-6
            );
        }
    }
}

#[test]
fn partial_json_config_overrides_named_fields() {
    let config: PipelineConfig =
        serde_json::from_str(r#"{ "wetness": { "wetland_threshold": 1e12, "water_threshold": 2e12 } }"#)
            .unwrap();
    assert_eq!(config.fill, FillParams::default());

    let mut run = PipelineRun::new("3", valley_dem(), config).unwrap();
    let profile = run.execute(OutputSchema::Lake).unwrap();
    assert!(profile.points.is_empty());
    assert_eq!(profile.to_string(), "3 1 1 0.000 0.01 0.000 1.0\n0.0 0.0\n");
}
