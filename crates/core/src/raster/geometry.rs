//! Metric cell geometry for geographic grids

use serde::{Deserialize, Serialize};

/// Mean Earth radius used by [`great_circle_distance`], in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Metric size of one grid cell.
///
/// Grids arrive with an angular cell size (degrees). All hydrologic
/// computations work in metres, so the header is converted once at the grid
/// centroid and the resulting `dx` (east-west) and `dy` (north-south) are
/// applied to every cell.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CellGeometry {
    /// Cell width in metres
    pub dx: f64,
    /// Cell height in metres
    pub dy: f64,
}

impl Default for CellGeometry {
    fn default() -> Self {
        Self { dx: 1.0, dy: 1.0 }
    }
}

impl CellGeometry {
    pub fn new(dx: f64, dy: f64) -> Self {
        Self { dx, dy }
    }

    /// Square cells of the given size in metres
    pub fn square(size: f64) -> Self {
        Self { dx: size, dy: size }
    }

    /// Derive metric cell dimensions from a geographic grid header.
    ///
    /// The distance is evaluated at the grid centroid
    /// (`yll + cellsize * rows / 2`, `xll + cellsize * cols / 2`) by stepping
    /// one cell east for `dx` and one cell north for `dy`.
    pub fn from_geographic(
        xll: f64,
        yll: f64,
        cellsize_deg: f64,
        rows: usize,
        cols: usize,
    ) -> Self {
        let lat = yll + cellsize_deg * rows as f64 / 2.0;
        let lon = xll + cellsize_deg * cols as f64 / 2.0;

        let dx = 1000.0 * great_circle_distance(lat, lon, lat, lon + cellsize_deg);
        let dy = 1000.0 * great_circle_distance(lat, lon, lat + cellsize_deg, lon);

        Self { dx, dy }
    }

    /// Length of the cell diagonal
    pub fn diagonal(&self) -> f64 {
        self.dx.hypot(self.dy)
    }

    /// Cell area in square metres
    pub fn area(&self) -> f64 {
        self.dx * self.dy
    }
}

/// Great-circle distance in kilometres between two points given in degrees.
///
/// Spherical law of cosines on a sphere of radius [`EARTH_RADIUS_KM`]. The
/// cosine is clamped to 1 so that coincident points return 0 instead of NaN.
pub fn great_circle_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let theta1 = lon1.to_radians();
    let theta2 = lon2.to_radians();

    let term1 = phi1.cos() * theta1.cos() * phi2.cos() * theta2.cos();
    let term2 = phi1.cos() * theta1.sin() * phi2.cos() * theta2.sin();
    let term3 = phi1.sin() * phi2.sin();

    let cos_angle = (term1 + term2 + term3).min(1.0);
    EARTH_RADIUS_KM * cos_angle.acos()
}
