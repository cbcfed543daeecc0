//! LAKE and SEA text schemas
//!
//! Both print a header line and one line of bins, listed from the top of the
//! wetland down to the bottom of the lake:
//!
//! ```text
//! <id> <flag> <nbins> <depth+0.01> 0.01 <depth+0.01> 1.0
//! <elev> <area> [<twi> <slope>] <elev> <area> [<twi> <slope>] ...
//! ```

use super::Profile;
use lakeparam_core::Error;
use std::fmt;
use std::str::FromStr;

/// Depth added to the lake depth in the header
const DEPTH_OFFSET: f64 = 0.01;

/// Output format of a profile
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputSchema {
    /// Wetness-gradient profile with index and slope per bin
    Sea,
    /// Bathymetric depth/area pairs for the lake model
    Lake,
}

impl OutputSchema {
    /// Header flag distinguishing the two formats
    pub fn flag(self) -> u8 {
        match self {
            OutputSchema::Sea => 0,
            OutputSchema::Lake => 1,
        }
    }

    /// Render `profile` in this schema, two newline-terminated lines
    pub fn render(self, profile: &Profile) -> String {
        let flag = self.flag();

        if profile.points.is_empty() {
            let empty = match self {
                OutputSchema::Sea => "0.0 0.0 0.0 0.0",
                OutputSchema::Lake => "0.0 0.0",
            };
            return format!(
                "{} {flag} 1 {:.3} 0.01 {:.3} 1.0\n{empty}\n",
                profile.grid_id, 0.0, 0.0
            );
        }

        let depth = profile.lake_depth + DEPTH_OFFSET;
        let header = format!(
            "{} {flag} {} {depth:.3} 0.01 {depth:.3} 1.0",
            profile.grid_id,
            profile.points.len()
        );

        let body = profile
            .points
            .iter()
            .rev()
            .map(|p| match self {
                OutputSchema::Sea => format!(
                    "{:.3} {:.5} {:.1} {:.4}",
                    p.elevation, p.area_fraction, p.wetness_index, p.slope
                ),
                OutputSchema::Lake => format!("{:.3} {:.5}", p.elevation, p.area_fraction),
            })
            .collect::<Vec<_>>()
            .join(" ");

        format!("{header}\n{body}\n")
    }
}

impl FromStr for OutputSchema {
    type Err = Error;

    /// Case-sensitive: only `SEA` and `LAKE` are accepted
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "SEA" => Ok(OutputSchema::Sea),
            "LAKE" => Ok(OutputSchema::Lake),
            other => Err(Error::UnknownSchema(other.to_string())),
        }
    }
}

impl fmt::Display for OutputSchema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputSchema::Sea => write!(f, "SEA"),
            OutputSchema::Lake => write!(f, "LAKE"),
        }
    }
}
