//! Combined NAMD/GOMC time series.
//!
//! Each box ends up with two series on the global step axis, one per
//! engine. They are interleaved into a single table with the header
//!
//! ```text
//! #ENGINE  STEP  TOTAL_POT  TOTAL_ELECT  TOTAL_VDW_plus_ELECT  PRESSURE  VOLUME  DENSITY
//! ```
//!
//! Rows are ordered by a fractional sort key: MD rows sit at `step + 0.2`,
//! MC rows alternate between `step + 0.4` and `step + 0.1` within their turn.
//! Every MC turn opens on `+ 0.4`, so at a shared step the MD sample comes
//! before the MC sample that starts the next turn.

use crate::error::{HybridError, Result};
use crate::parser::{EngineKind, GomcBoxLog, NamdLog};
use crate::units::{normalize, ColumnSource};

/// Header of a combined per-box table.
pub const COMBINED_HEADER: [&str; 8] = [
    "#ENGINE",
    "STEP",
    "TOTAL_POT",
    "TOTAL_ELECT",
    "TOTAL_VDW_plus_ELECT",
    "PRESSURE",
    "VOLUME",
    "DENSITY",
];

const MD_KEY_OFFSET: f64 = 0.2;
const MC_EVEN_KEY_OFFSET: f64 = 0.4;
const MC_ODD_KEY_OFFSET: f64 = 0.1;

/// One sample of a combined table, in kcal/mol, bar, Å³ and g/cm³.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesRow {
    /// Global step
    pub step: i64,
    /// Engine that produced the sample
    pub engine: EngineKind,
    /// Total potential energy
    pub potential: f64,
    /// Electrostatic energy
    pub elect: f64,
    /// vdW + electrostatic energy
    pub vdw_elec: f64,
    /// Pressure, if reported
    pub pressure: Option<f64>,
    /// Volume, if reported
    pub volume: Option<f64>,
    /// Density
    pub density: f64,
}

impl TimeSeriesRow {
    /// Cells of the row in [`COMBINED_HEADER`] order; absent values are `NA`.
    pub fn cells(&self) -> Vec<String> {
        let opt = |v: Option<f64>| v.map_or_else(|| "NA".to_string(), |x| x.to_string());
        vec![
            self.engine.tag().to_string(),
            self.step.to_string(),
            self.potential.to_string(),
            self.elect.to_string(),
            self.vdw_elec.to_string(),
            opt(self.pressure),
            opt(self.volume),
            self.density.to_string(),
        ]
    }
}

/// MD samples of one NAMD turn at or after global step 0.
///
/// `steps` are the rebased TS values, one per row of `log`.
pub fn namd_rows(log: &NamdLog, steps: &[i64]) -> Result<Vec<TimeSeriesRow>> {
    let table = &log.energies;
    let source = log.source();
    if steps.len() != table.len() {
        return Err(HybridError::malformed(
            source,
            format!("{} rebased steps for {} rows", steps.len(), table.len()),
        ));
    }
    let potential = table.require_column("POTENTIAL", source)?;
    let elect = table.require_column("ELECT", source)?;
    let vdw = table.require_column("VDW", source)?;
    let volume = table.require_column("VOLUME", source)?;
    let pressure = table.column("PRESSURE");
    let densities = log.densities()?;

    Ok(table
        .rows
        .iter()
        .zip(steps)
        .zip(densities)
        .filter(|((_, &step), _)| step >= 0)
        .map(|((row, &step), density)| TimeSeriesRow {
            step,
            engine: EngineKind::Namd,
            potential: row[potential],
            elect: row[elect],
            vdw_elec: row[vdw] + row[elect],
            pressure: pressure.map(|i| row[i]),
            volume: Some(row[volume]),
            density,
        })
        .collect())
}

/// MC samples of one box of a GOMC turn, converted to kcal/mol and g/cm³.
pub fn gomc_rows(box_log: &GomcBoxLog, steps: &[i64], source: &str) -> Result<Vec<TimeSeriesRow>> {
    let energies = &box_log.energies;
    let stats = &box_log.stats;
    if steps.len() != energies.len() {
        return Err(HybridError::malformed(
            source,
            format!("{} rebased steps for {} rows", steps.len(), energies.len()),
        ));
    }
    let total = energies.require_column("TOTAL", source)?;
    let elect = energies.require_column("TOTAL_ELECT", source)?;
    let intra_nb = energies.require_column("INTRA(NB)", source)?;
    let inter_lj = energies.require_column("INTER(LJ)", source)?;
    let density = stats.require_column("TOT_DENSITY", source)?;
    let pressure = stats.column("PRESSURE");
    let volume = stats.column("VOLUME");

    Ok(energies
        .rows
        .iter()
        .zip(&stats.rows)
        .zip(steps)
        .map(|((e, s), &step)| TimeSeriesRow {
            step,
            engine: EngineKind::Gomc,
            potential: normalize(ColumnSource::GomcEnergy, "TOTAL", e[total]),
            elect: normalize(ColumnSource::GomcEnergy, "TOTAL_ELECT", e[elect]),
            vdw_elec: normalize(
                ColumnSource::GomcEnergy,
                "TOTAL_ELECT",
                e[intra_nb] + e[inter_lj] + e[elect],
            ),
            pressure: pressure.map(|i| s[i]),
            volume: volume.map(|i| s[i]),
            density: normalize(ColumnSource::GomcStatistics, "TOT_DENSITY", s[density]),
        })
        .collect())
}

/// Interleaves the MD series of one box with its MC series, given one block
/// per MC turn.
///
/// With `fixed_volume` (GCMC, NVT) GOMC does not report a meaningful box
/// volume, so every MC row takes the first MD volume of the box, or none if
/// the box never ran MD.
///
/// # Examples
///
/// ```
/// use hybrid_mdmc::merge::{merge_series, TimeSeriesRow};
/// use hybrid_mdmc::parser::EngineKind;
///
/// let row = |step, engine| TimeSeriesRow {
///     step, engine, potential: 0.0, elect: 0.0, vdw_elec: 0.0,
///     pressure: None, volume: Some(1.0), density: 1.0,
/// };
/// let md = vec![row(0, EngineKind::Namd), row(100, EngineKind::Namd)];
/// let mc = vec![vec![row(100, EngineKind::Gomc), row(200, EngineKind::Gomc)]];
/// let merged = merge_series(&md, &mc, false);
/// let order: Vec<_> = merged.iter().map(|r| (r.step, r.engine)).collect();
/// assert_eq!(order[1], (100, EngineKind::Namd));
/// assert_eq!(order[2], (100, EngineKind::Gomc));
/// ```
pub fn merge_series(
    md: &[TimeSeriesRow],
    mc_turns: &[Vec<TimeSeriesRow>],
    fixed_volume: bool,
) -> Vec<TimeSeriesRow> {
    let first_md_volume = md.first().and_then(|r| r.volume);
    let mc_len: usize = mc_turns.iter().map(Vec::len).sum();

    let mut keyed: Vec<(f64, TimeSeriesRow)> = Vec::with_capacity(md.len() + mc_len);
    keyed.extend(md.iter().map(|r| (r.step as f64 + MD_KEY_OFFSET, r.clone())));
    // Parity counts rows within one MC turn, not across the run: each turn's
    // first row sorts after an MD row at the same step.
    keyed.extend(mc_turns.iter().flat_map(|turn| turn.iter().enumerate()).map(|(i, r)| {
        let offset = if i % 2 == 1 {
            MC_ODD_KEY_OFFSET
        } else {
            MC_EVEN_KEY_OFFSET
        };
        let mut row = r.clone();
        if fixed_volume {
            row.volume = first_md_volume;
        }
        (r.step as f64 + offset, row)
    }));

    keyed.sort_by(|a, b| a.0.total_cmp(&b.0));
    keyed.into_iter().map(|(_, row)| row).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::K_TO_KCAL_MOL;
    use crate::parser::GomcLog;

    fn row(step: i64, engine: EngineKind, volume: Option<f64>) -> TimeSeriesRow {
        TimeSeriesRow {
            step,
            engine,
            potential: step as f64,
            elect: 0.0,
            vdw_elec: 0.0,
            pressure: None,
            volume,
            density: 1.0,
        }
    }

    #[test]
    fn test_md_row_precedes_mc_row_at_same_step() {
        let md = vec![row(100, EngineKind::Namd, Some(10.0))];
        let mc = vec![vec![row(100, EngineKind::Gomc, Some(11.0))]];
        let merged = merge_series(&md, &mc, false);
        assert_eq!(merged[0].engine, EngineKind::Namd);
        assert_eq!(merged[1].engine, EngineKind::Gomc);
        assert_eq!(merged[1].volume, Some(11.0));
    }

    #[test]
    fn test_steps_non_decreasing_across_turns() {
        let md = vec![
            row(0, EngineKind::Namd, Some(10.0)),
            row(500, EngineKind::Namd, Some(10.0)),
            row(1000, EngineKind::Namd, Some(10.0)),
            row(1500, EngineKind::Namd, Some(10.0)),
        ];
        let mc = vec![vec![
            row(1000, EngineKind::Gomc, None),
            row(1500, EngineKind::Gomc, None),
        ]];
        let merged = merge_series(&md, &mc, false);
        assert!(merged.windows(2).all(|w| w[0].step <= w[1].step));
        let mut seen: Vec<(i64, EngineKind)> = merged.iter().map(|r| (r.step, r.engine)).collect();
        let len = seen.len();
        seen.sort();
        seen.dedup();
        assert_eq!(seen.len(), len);
    }

    #[test]
    fn test_fixed_volume_uses_first_md_volume() {
        let md = vec![
            row(0, EngineKind::Namd, Some(15625.0)),
            row(100, EngineKind::Namd, Some(15000.0)),
        ];
        let mc = vec![vec![row(200, EngineKind::Gomc, Some(1.0))]];
        let merged = merge_series(&md, &mc, true);
        assert_eq!(merged[2].volume, Some(15625.0));

        let merged = merge_series(&[], &mc, true);
        assert_eq!(merged[0].volume, None);
        assert_eq!(merged[0].cells()[6], "NA");
    }

    #[test]
    fn test_parity_restarts_each_mc_turn() {
        let md = vec![
            row(0, EngineKind::Namd, None),
            row(100, EngineKind::Namd, None),
            row(300, EngineKind::Namd, None),
        ];
        let mc = vec![
            vec![
                row(100, EngineKind::Gomc, None),
                row(150, EngineKind::Gomc, None),
                row(200, EngineKind::Gomc, None),
            ],
            vec![row(300, EngineKind::Gomc, None), row(400, EngineKind::Gomc, None)],
        ];
        let merged = merge_series(&md, &mc, false);
        let at_300: Vec<EngineKind> = merged.iter().filter(|r| r.step == 300).map(|r| r.engine).collect();
        assert_eq!(at_300, vec![EngineKind::Namd, EngineKind::Gomc]);
    }

    #[test]
    fn test_gomc_rows_convert_units() {
        let log = "\
ETITLE:     STEP      TOTAL   INTRA(B)  INTRA(NB)  INTER(LJ)  TOTAL_ELECT
ENER_0:     1000      1000.0    10.0     20.0       30.0       40.0
STITLE:     STEP     VOLUME   PRESSURE   TOT_DENSITY
STAT_0:     1000    15625.0    98.5      998.0
";
        let parsed = GomcLog::parse(log, "gomc").unwrap();
        let rows = gomc_rows(parsed.box_log(0).unwrap(), &[5000], "gomc").unwrap();
        assert_eq!(rows[0].step, 5000);
        assert_eq!(rows[0].potential, 1000.0 * K_TO_KCAL_MOL);
        assert_eq!(rows[0].vdw_elec, 90.0 * K_TO_KCAL_MOL);
        assert_eq!(rows[0].density, 0.998);
        assert_eq!(rows[0].pressure, Some(98.5));

        assert!(gomc_rows(parsed.box_log(0).unwrap(), &[], "gomc").is_err());
    }
}
