//! Simulation box geometry.
//!
//! Only orthogonal boxes are supported, so a box is fully described by its
//! three edge lengths and its origin. Geometry is read from two kinds of
//! files:
//!
//! - PDB `CRYST1` records (`CRYST1   25.000   25.000   25.000  90.00  90.00  90.00 P 1  1`),
//!   written by the starting structures and by GOMC restarts
//! - extended-system (`.xsc`) files, whose last line holds the step, the
//!   three cell vectors and the origin, written by NAMD and GOMC restarts
//!
//! On the first turn of a box, configured overrides replace the values read
//! from the starting PDB.

use crate::config::AxisOverrides;
use crate::error::{HybridError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

const AXES: [&str; 3] = ["x", "y", "z"];
const ANGLES: [&str; 3] = ["alpha", "beta", "gamma"];

/// Orthogonal box: edge lengths and origin in Å.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoxGeometry {
    /// x, y, z edge lengths
    pub dims: [f64; 3],
    /// x, y, z origin
    pub origin: [f64; 3],
}

impl BoxGeometry {
    /// Box with its origin at the center of the cell.
    pub fn centered(dims: [f64; 3]) -> Self {
        Self {
            dims,
            origin: [dims[0] / 2.0, dims[1] / 2.0, dims[2] / 2.0],
        }
    }

    /// Volume in Å³.
    pub fn volume(&self) -> f64 {
        self.dims.iter().product()
    }
}

/// Cell as read from a PDB `CRYST1` record; any field may be absent.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CrystRecord {
    /// a, b, c lengths
    pub dims: [Option<f64>; 3],
    /// alpha, beta, gamma in degrees
    pub angles: [Option<f64>; 3],
}

impl CrystRecord {
    /// Parses the last `CRYST1` line of a PDB. A PDB without one yields an
    /// all-empty record.
    pub fn parse(content: &str, source: &str) -> Result<Self> {
        let mut record = CrystRecord::default();
        for line in content.lines().filter(|l| l.starts_with("CRYST1")) {
            let tokens: Vec<&str> = line.split_whitespace().collect();
            let field = |i: usize| -> Result<Option<f64>> {
                tokens
                    .get(i)
                    .map(|t| {
                        t.parse::<f64>().map_err(|_| {
                            HybridError::malformed(source, format!("CRYST1 field '{}' is not a number", t))
                        })
                    })
                    .transpose()
            };
            record = CrystRecord {
                dims: [field(1)?, field(2)?, field(3)?],
                angles: [field(4)?, field(5)?, field(6)?],
            };
        }
        Ok(record)
    }

    /// Reads the `CRYST1` record of a PDB file.
    pub fn read(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(HybridError::ProcessOutputMissing(path.to_path_buf()));
        }
        Self::parse(&fs::read_to_string(path)?, &path.display().to_string())
    }

    /// Geometry from the record alone, requiring all three lengths.
    pub fn to_geometry(&self, source: &str) -> Result<BoxGeometry> {
        let mut dims = [0.0; 3];
        for (i, slot) in dims.iter_mut().enumerate() {
            *slot = self.dims[i].ok_or_else(|| {
                HybridError::malformed(source, format!("CRYST1 has no {}-dimension", AXES[i]))
            })?;
        }
        Ok(BoxGeometry::centered(dims))
    }
}

/// Geometry of a box's first turn together with the override warnings it produced.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGeometry {
    /// Geometry to write into the control file
    pub geometry: BoxGeometry,
    /// One line per axis where the override disagreed with the PDB
    pub warnings: Vec<String>,
}

/// Applies configured overrides to the starting PDB cell.
///
/// For every axis the override wins. If the PDB also has a value and it
/// differs, a warning is recorded. An axis with neither is a configuration
/// error, and any angle other than 90° (read or configured) is rejected.
///
/// # Examples
///
/// ```
/// use hybrid_mdmc::geometry::{resolve_initial, CrystRecord};
///
/// let record = CrystRecord { dims: [Some(40.0), Some(40.0), Some(40.0)], angles: [Some(90.0); 3] };
/// let resolved = resolve_initial(0, &record, [Some(50.0), None, None], [None; 3]).unwrap();
/// assert_eq!(resolved.geometry.dims, [50.0, 40.0, 40.0]);
/// assert_eq!(resolved.warnings.len(), 1);
/// ```
pub fn resolve_initial(
    box_index: usize,
    record: &CrystRecord,
    dims_override: AxisOverrides,
    angle_override: AxisOverrides,
) -> Result<ResolvedGeometry> {
    for i in 0..3 {
        for angle in [record.angles[i], angle_override[i]].into_iter().flatten() {
            if angle != 90.0 {
                return Err(HybridError::NonOrthogonalBox {
                    box_index,
                    axis: ANGLES[i],
                    angle,
                });
            }
        }
    }

    let mut dims = [0.0; 3];
    let mut warnings = Vec::new();
    for i in 0..3 {
        dims[i] = match (record.dims[i], dims_override[i]) {
            (None, None) => {
                return Err(HybridError::Configuration(format!(
                    "box {}: the {}-dimension is neither set in set_dims_box_{}_list nor present in the starting PDB",
                    box_index, AXES[i], box_index
                )))
            }
            (Some(read), None) => read,
            (None, Some(set)) => set,
            (Some(read), Some(set)) => {
                if read != set {
                    warnings.push(format!(
                        "The user defined {axis}-dimension is different than the one read from the \
                         starting PDB file {axis}-dim_PDB = {read}, {axis}-dim_user_set = {set}. \
                         The code is setting the user defined {axis}-dimension.",
                        axis = AXES[i],
                        read = read,
                        set = set
                    ));
                }
                set
            }
        };
    }

    Ok(ResolvedGeometry {
        geometry: BoxGeometry::centered(dims),
        warnings,
    })
}

/// Parses the last line of an extended-system file: tokens 1, 5 and 9 are the
/// diagonal of the cell, tokens 10 to 12 the origin.
pub fn parse_xsc(content: &str, source: &str) -> Result<BoxGeometry> {
    let last = content
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty() && !l.starts_with('#'))
        .ok_or_else(|| HybridError::malformed(source, "xsc file has no data line"))?;
    let tokens: Vec<&str> = last.split_whitespace().collect();
    let value = |i: usize| -> Result<f64> {
        let token = tokens
            .get(i)
            .ok_or_else(|| HybridError::malformed(source, format!("xsc line has no field {}", i)))?;
        token
            .parse::<f64>()
            .map_err(|_| HybridError::malformed(source, format!("xsc field '{}' is not a number", token)))
    };
    Ok(BoxGeometry {
        dims: [value(1)?, value(5)?, value(9)?],
        origin: [value(10)?, value(11)?, value(12)?],
    })
}

/// Reads an extended-system file written by a finished turn.
pub fn read_xsc(path: &Path) -> Result<BoxGeometry> {
    if !path.exists() {
        return Err(HybridError::ProcessOutputMissing(path.to_path_buf()));
    }
    parse_xsc(&fs::read_to_string(path)?, &path.display().to_string())
}
