//! Unit normalization of engine output.
//!
//! NAMD reports energies in kcal/mol and needs no conversion. GOMC reports
//! energies in K and densities in kg/m³; the common-unit tables use kcal/mol
//! and g/cm³. Statistics other than density (pressure, volume, molecule
//! counts) keep their native units in both tables.

use crate::config::K_TO_KCAL_MOL;
use crate::parser::EngineKind;

/// Which table a raw value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnSource {
    /// NAMD `ENERGY:` row
    Namd,
    /// GOMC `ENER_<b>:` row
    GomcEnergy,
    /// GOMC `STAT_<b>:` row
    GomcStatistics,
}

impl ColumnSource {
    /// Engine that writes this table.
    pub fn engine(&self) -> EngineKind {
        match self {
            ColumnSource::Namd => EngineKind::Namd,
            ColumnSource::GomcEnergy | ColumnSource::GomcStatistics => EngineKind::Gomc,
        }
    }
}

/// Converts one raw value to kcal/mol or g/cm³ where the column needs it.
///
/// # Examples
///
/// ```
/// use hybrid_mdmc::units::{normalize, ColumnSource};
///
/// assert_eq!(normalize(ColumnSource::GomcEnergy, "TOTAL", 1000.0), 1000.0 * 1.98720425864083e-3);
/// assert_eq!(normalize(ColumnSource::GomcEnergy, "STEP", 1000.0), 1000.0);
/// assert_eq!(normalize(ColumnSource::GomcStatistics, "TOT_DENSITY", 998.0), 0.998);
/// assert_eq!(normalize(ColumnSource::Namd, "POTENTIAL", -12.5), -12.5);
/// ```
pub fn normalize(source: ColumnSource, column: &str, raw: f64) -> f64 {
    match source {
        ColumnSource::Namd => raw,
        ColumnSource::GomcEnergy if column == "STEP" => raw,
        ColumnSource::GomcEnergy => raw * K_TO_KCAL_MOL,
        ColumnSource::GomcStatistics if column == "TOT_DENSITY" => raw / 1000.0,
        ColumnSource::GomcStatistics => raw,
    }
}

/// Normalizes a whole row against its titles.
pub fn normalize_row(source: ColumnSource, titles: &[String], row: &[f64]) -> Vec<f64> {
    titles
        .iter()
        .zip(row)
        .map(|(title, &value)| normalize(source, title, value))
        .collect()
}
