//! Engine log parsing.
//!
//! NAMD and GOMC both write their thermodynamic output as tagged plain-text
//! lines mixed into an otherwise free-form console log. This module pulls the
//! tagged lines out into typed tables and leaves everything else alone.
//!
//! # NAMD
//!
//! ```text
//! Info: TOTAL MASS = 22548.9 amu
//! Info: ENERGY OUTPUT STEPS 1000
//! Info: PME GRID DIMENSIONS 48 48 48
//! TCL: Minimizing for 500 steps
//! ETITLE:      TS           BOND          ANGLE ...
//! ENERGY:       0      1021.9232      2103.6549 ...
//! ```
//!
//! The first `ETITLE:` line names the columns. Without one, the default NAMD
//! title set ([`DEFAULT_NAMD_TITLES`]) is assumed.
//!
//! # GOMC
//!
//! ```text
//! ETITLE:     STEP      TOTAL    INTRA(B)   INTRA(NB) ...
//! ENER_0:     1000  -2.53e+05   1.21e+04   -4.02e+03 ...
//! STITLE:     STEP     VOLUME   PRESSURE     TOT_MOL  TOT_DENSITY ...
//! STAT_0:     1000   15625.0      98.51        512      998.3 ...
//! ```
//!
//! Each `STAT_<b>` line belongs to the oldest energy line that has not been
//! paired yet, and that energy line must be for the same box.

use crate::config::{AMU_PER_A3_TO_G_PER_CM3, K_TO_KCAL_MOL};
use crate::error::{HybridError, Result};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{BTreeMap, VecDeque};
use std::fs;
use std::path::Path;

/// Column titles NAMD uses when the log carries no `ETITLE:` line.
pub const DEFAULT_NAMD_TITLES: [&str; 20] = [
    "TS", "BOND", "ANGLE", "DIHED", "IMPRP", "ELECT", "VDW", "BOUNDARY", "MISC", "KINETIC",
    "TOTAL", "TEMP", "POTENTIAL", "TOTAL3", "TEMPAVG", "PRESSURE", "GPRESSURE", "VOLUME",
    "PRESSAVG", "GPRESSAVG",
];

const FLOAT_PATTERN: &str = r"[-+]?(?:\d+\.\d*|\.\d+|\d+)(?:[eE][-+]?\d+)?";

lazy_static! {
    // "Info: TOTAL MASS = 22548.9 amu"
    static ref TOTAL_MASS_RE: Regex = Regex::new(&format!(
        r"^Info:\s+TOTAL\s+MASS\s*=\s*({0})",
        FLOAT_PATTERN
    )).unwrap();

    // "Info: ENERGY OUTPUT STEPS 1000"
    static ref ENERGY_OUTPUT_RE: Regex =
        Regex::new(r"^Info:\s+ENERGY\s+OUTPUT\s+STEPS\s+(\d+)").unwrap();

    // "Info: PME GRID DIMENSIONS 48 48 48"
    static ref PME_GRID_RE: Regex =
        Regex::new(r"^Info:\s+PME\s+GRID\s+DIMENSIONS\s+(\d+)\s+(\d+)\s+(\d+)").unwrap();

    // "TCL: Minimizing for 500 steps"
    static ref MINIMIZE_RE: Regex =
        Regex::new(r"^TCL:\s+Minimizing\s+for\s+(\d+)\s+steps").unwrap();

    // "ENER_0:" / "STAT_1:"
    static ref GOMC_BOX_TAG_RE: Regex = Regex::new(r"^(ENER|STAT)_(\d+):").unwrap();
}

/// Which engine produced a log or a sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EngineKind {
    /// NAMD molecular dynamics
    Namd,
    /// GOMC Monte Carlo
    Gomc,
}

impl EngineKind {
    /// Tag written in the `#ENGINE` column of combined tables.
    pub fn tag(&self) -> &'static str {
        match self {
            EngineKind::Namd => "NAMD",
            EngineKind::Gomc => "GOMC",
        }
    }
}

impl std::fmt::Display for EngineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

/// Ordered column titles with numeric rows of the same width.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LogTable {
    /// Column titles, without the line tag
    pub titles: Vec<String>,
    /// Rows in emission order
    pub rows: Vec<Vec<f64>>,
}

impl LogTable {
    fn with_titles(titles: Vec<String>) -> Self {
        Self {
            titles,
            rows: Vec::new(),
        }
    }

    /// Index of a column, if present.
    pub fn column(&self, name: &str) -> Option<usize> {
        self.titles.iter().position(|t| t == name)
    }

    /// Index of a column that must be present.
    pub fn require_column(&self, name: &str, source: &str) -> Result<usize> {
        self.column(name).ok_or_else(|| {
            HybridError::malformed(source, format!("mandatory column {} is missing", name))
        })
    }

    /// All values of one column, in row order.
    pub fn values(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column(name)?;
        Some(self.rows.iter().map(|row| row[idx]).collect())
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    fn push_checked(&mut self, tokens: &[&str], source: &str, line_no: usize) -> Result<()> {
        if tokens.len() != self.titles.len() {
            return Err(HybridError::malformed(
                source,
                format!(
                    "line {}: {} values for {} columns",
                    line_no,
                    tokens.len(),
                    self.titles.len()
                ),
            ));
        }
        let row = tokens
            .iter()
            .map(|t| parse_number(t, source, line_no))
            .collect::<Result<Vec<f64>>>()?;
        self.rows.push(row);
        Ok(())
    }
}

fn parse_number(token: &str, source: &str, line_no: usize) -> Result<f64> {
    token.parse::<f64>().map_err(|_| {
        HybridError::malformed(source, format!("line {}: '{}' is not a number", line_no, token))
    })
}

/// First and last handoff energies of one box, in kcal/mol.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergySummary {
    /// Potential energy of the first sample
    pub potential_initial: f64,
    /// Potential energy of the last sample
    pub potential_final: f64,
    /// vdW + electrostatic energy of the first sample
    pub vdw_elec_initial: f64,
    /// vdW + electrostatic energy of the last sample
    pub vdw_elec_final: f64,
}

impl EnergySummary {
    fn from_series(potential: &[f64], vdw_elec: &[f64], source: &str) -> Result<Self> {
        match (potential.first(), potential.last(), vdw_elec.first(), vdw_elec.last()) {
            (Some(&pi), Some(&pf), Some(&vi), Some(&vf)) => Ok(Self {
                potential_initial: pi,
                potential_final: pf,
                vdw_elec_initial: vi,
                vdw_elec_final: vf,
            }),
            _ => Err(HybridError::malformed(source, "no energy samples")),
        }
    }
}

/// Parsed NAMD console log.
#[derive(Debug, Clone, PartialEq)]
pub struct NamdLog {
    /// `ENERGY:` rows under the first `ETITLE:` (or the default titles)
    pub energies: LogTable,
    /// System mass in amu
    pub total_mass_amu: Option<f64>,
    /// Energy output interval
    pub energy_output_steps: Option<u64>,
    /// PME grid points per axis
    pub pme_grid: Option<[u64; 3]>,
    /// Length of the minimization stage, if the run minimized
    pub minimize_steps: Option<u64>,
    source: String,
}

impl NamdLog {
    /// Reads and parses a NAMD `out.dat`.
    ///
    /// # Errors
    ///
    /// [`HybridError::ProcessOutputMissing`] when the file does not exist,
    /// [`HybridError::MalformedLog`] when its content is inconsistent.
    pub fn read(path: &Path) -> Result<Self> {
        let content = read_log(path)?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parses NAMD log text. `source` names the log in error messages.
    pub fn parse(content: &str, source: &str) -> Result<Self> {
        let mut titles: Option<Vec<String>> = None;
        let mut pending_rows: Vec<(usize, Vec<&str>)> = Vec::new();
        let mut total_mass_amu = None;
        let mut energy_output_steps = None;
        let mut pme_grid = None;
        let mut minimize_steps = None;

        for (idx, line) in content.lines().enumerate() {
            let line_no = idx + 1;
            if line.starts_with("Info:") {
                if let Some(caps) = TOTAL_MASS_RE.captures(line) {
                    total_mass_amu = Some(parse_number(&caps[1], source, line_no)?);
                } else if let Some(caps) = ENERGY_OUTPUT_RE.captures(line) {
                    energy_output_steps = Some(parse_number(&caps[1], source, line_no)? as u64);
                } else if let Some(caps) = PME_GRID_RE.captures(line) {
                    let mut grid = [0u64; 3];
                    for (axis, slot) in grid.iter_mut().enumerate() {
                        *slot = parse_number(&caps[axis + 1], source, line_no)? as u64;
                    }
                    pme_grid = Some(grid);
                }
            } else if let Some(caps) = MINIMIZE_RE.captures(line) {
                minimize_steps = Some(parse_number(&caps[1], source, line_no)? as u64);
            } else if line.starts_with("ETITLE:") {
                if titles.is_none() {
                    titles = Some(line.split_whitespace().skip(1).map(String::from).collect());
                }
            } else if line.starts_with("ENERGY:") {
                if total_mass_amu.is_none() {
                    return Err(HybridError::malformed(
                        source,
                        format!("line {}: ENERGY line before the TOTAL MASS declaration", line_no),
                    ));
                }
                pending_rows.push((line_no, line.split_whitespace().skip(1).collect()));
            }
        }

        let titles = titles
            .unwrap_or_else(|| DEFAULT_NAMD_TITLES.iter().map(|t| t.to_string()).collect());
        let mut energies = LogTable::with_titles(titles);
        for (line_no, tokens) in &pending_rows {
            energies.push_checked(tokens, source, *line_no)?;
        }

        let log = Self {
            energies,
            total_mass_amu,
            energy_output_steps,
            pme_grid,
            minimize_steps,
            source: source.to_string(),
        };
        for column in ["TS", "POTENTIAL", "ELECT", "VDW", "VOLUME"] {
            log.energies.require_column(column, source)?;
        }
        Ok(log)
    }

    /// Name of the log in error messages.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Density of every row in g/cm³, from the total mass and the VOLUME column.
    pub fn densities(&self) -> Result<Vec<f64>> {
        let mass = self.total_mass_amu.ok_or_else(|| {
            HybridError::malformed(&self.source, "TOTAL MASS is not declared")
        })?;
        let idx = self.energies.require_column("VOLUME", &self.source)?;
        let ts = self.energies.require_column("TS", &self.source)?;
        self.energies
            .rows
            .iter()
            .map(|row| {
                let volume = row[idx];
                if volume > 0.0 {
                    Ok(AMU_PER_A3_TO_G_PER_CM3 * mass / volume)
                } else {
                    Err(HybridError::malformed(
                        &self.source,
                        format!("non-positive VOLUME {} at TS {}", volume, row[ts]),
                    ))
                }
            })
            .collect()
    }

    /// VDW + ELECT per row.
    pub fn vdw_plus_elect(&self) -> Result<Vec<f64>> {
        let vdw = self.energies.require_column("VDW", &self.source)?;
        let elect = self.energies.require_column("ELECT", &self.source)?;
        Ok(self.energies.rows.iter().map(|r| r[vdw] + r[elect]).collect())
    }

    /// First and last POTENTIAL and VDW + ELECT values.
    pub fn energy_summary(&self) -> Result<EnergySummary> {
        let potential = self
            .energies
            .values("POTENTIAL")
            .ok_or_else(|| HybridError::malformed(&self.source, "POTENTIAL column is missing"))?;
        EnergySummary::from_series(&potential, &self.vdw_plus_elect()?, &self.source)
    }
}

/// Energy and statistics rows of one GOMC box, paired one-to-one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GomcBoxLog {
    /// `ENER_<b>` rows under the `ETITLE:` titles, in K
    pub energies: LogTable,
    /// `STAT_<b>` rows under the `STITLE:` titles, in native units
    pub stats: LogTable,
}

impl GomcBoxLog {
    /// Total energy and INTRA(NB) + INTER(LJ) + TOTAL_ELECT per row, in kcal/mol.
    pub fn energy_summary_kcal(&self, source: &str) -> Result<EnergySummary> {
        let total = self.energies.require_column("TOTAL", source)?;
        let intra_nb = self.energies.require_column("INTRA(NB)", source)?;
        let inter_lj = self.energies.require_column("INTER(LJ)", source)?;
        let elect = self.energies.require_column("TOTAL_ELECT", source)?;

        let potential: Vec<f64> = self
            .energies
            .rows
            .iter()
            .map(|r| r[total] * K_TO_KCAL_MOL)
            .collect();
        let vdw_elec: Vec<f64> = self
            .energies
            .rows
            .iter()
            .map(|r| (r[intra_nb] + r[inter_lj] + r[elect]) * K_TO_KCAL_MOL)
            .collect();
        EnergySummary::from_series(&potential, &vdw_elec, source)
    }
}

/// Parsed GOMC console log, all boxes.
#[derive(Debug, Clone, PartialEq)]
pub struct GomcLog {
    boxes: BTreeMap<usize, GomcBoxLog>,
    source: String,
}

impl GomcLog {
    /// Reads and parses a GOMC `out.dat`.
    pub fn read(path: &Path) -> Result<Self> {
        let content = read_log(path)?;
        Self::parse(&content, &path.display().to_string())
    }

    /// Parses GOMC log text, pairing each `STAT_<b>` line with the oldest
    /// unpaired `ENER_<b>` line.
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::MalformedLog`] when:
    /// - a box line appears before its titles line
    /// - a statistics line has no pending energy line, or the pending one is for another box
    /// - energy lines are left without statistics at the end of the log
    /// - a value is not numeric or a row width differs from its titles
    pub fn parse(content: &str, source: &str) -> Result<Self> {
        let mut e_titles: Option<Vec<String>> = None;
        let mut s_titles: Option<Vec<String>> = None;
        let mut pending: VecDeque<(usize, usize, Vec<f64>)> = VecDeque::new();
        let mut boxes: BTreeMap<usize, GomcBoxLog> = BTreeMap::new();

        for (idx, line) in content.lines().enumerate() {
            let line_no = idx + 1;
            if line.starts_with("ETITLE:") {
                if e_titles.is_none() {
                    e_titles = Some(line.split_whitespace().skip(1).map(String::from).collect());
                }
                continue;
            }
            if line.starts_with("STITLE:") {
                if s_titles.is_none() {
                    s_titles = Some(line.split_whitespace().skip(1).map(String::from).collect());
                }
                continue;
            }
            let Some(caps) = GOMC_BOX_TAG_RE.captures(line) else {
                continue;
            };
            let box_index = parse_number(&caps[2], source, line_no)? as usize;
            let tokens: Vec<&str> = line.split_whitespace().skip(1).collect();

            if &caps[1] == "ENER" {
                let titles = e_titles.as_ref().ok_or_else(|| {
                    HybridError::malformed(source, format!("line {}: ENER line before ETITLE", line_no))
                })?;
                let mut scratch = LogTable::with_titles(titles.clone());
                scratch.push_checked(&tokens, source, line_no)?;
                if let Some(row) = scratch.rows.pop() {
                    pending.push_back((line_no, box_index, row));
                }
            } else {
                let titles = s_titles.as_ref().ok_or_else(|| {
                    HybridError::malformed(source, format!("line {}: STAT line before STITLE", line_no))
                })?;
                let (ener_line, ener_box, ener_row) = pending.pop_front().ok_or_else(|| {
                    HybridError::malformed(
                        source,
                        format!("line {}: STAT_{} has no pending ENER line", line_no, box_index),
                    )
                })?;
                if ener_box != box_index {
                    return Err(HybridError::malformed(
                        source,
                        format!(
                            "line {}: STAT_{} follows ENER_{} from line {}",
                            line_no, box_index, ener_box, ener_line
                        ),
                    ));
                }
                let entry = boxes.entry(box_index).or_insert_with(|| GomcBoxLog {
                    energies: LogTable::with_titles(e_titles.clone().unwrap_or_default()),
                    stats: LogTable::with_titles(titles.clone()),
                });
                entry.stats.push_checked(&tokens, source, line_no)?;
                entry.energies.rows.push(ener_row);
            }
        }

        if let Some((line_no, box_index, _)) = pending.front() {
            return Err(HybridError::malformed(
                source,
                format!(
                    "ENER_{} at line {} has no matching STAT line ({} unpaired)",
                    box_index,
                    line_no,
                    pending.len()
                ),
            ));
        }
        if e_titles.is_none() {
            return Err(HybridError::malformed(source, "no ETITLE line"));
        }

        for box_log in boxes.values() {
            box_log.energies.require_column("STEP", source)?;
            box_log.energies.require_column("TOTAL", source)?;
            box_log.stats.require_column("STEP", source)?;
        }

        Ok(Self {
            boxes,
            source: source.to_string(),
        })
    }

    /// Rows of one box.
    pub fn box_log(&self, box_index: usize) -> Result<&GomcBoxLog> {
        self.boxes.get(&box_index).ok_or_else(|| {
            HybridError::malformed(&self.source, format!("no ENER_{}/STAT_{} lines", box_index, box_index))
        })
    }

    /// Boxes present in the log.
    pub fn box_indices(&self) -> Vec<usize> {
        self.boxes.keys().copied().collect()
    }

    /// Name of the log in error messages.
    pub fn source(&self) -> &str {
        &self.source
    }
}

fn read_log(path: &Path) -> Result<String> {
    if !path.exists() {
        return Err(HybridError::ProcessOutputMissing(path.to_path_buf()));
    }
    Ok(fs::read_to_string(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMD_LOG: &str = "\
Charm++> Running on 4 processors
Info: TOTAL MASS = 1000.0 amu
Info: ENERGY OUTPUT STEPS 100
Info: PME GRID DIMENSIONS 36 36 40
TCL: Minimizing for 200 steps
ETITLE:      TS           BOND          ANGLE          DIHED          IMPRP          ELECT            VDW       BOUNDARY           MISC        KINETIC          TOTAL           TEMP      POTENTIAL         TOTAL3        TEMPAVG       PRESSURE      GPRESSURE         VOLUME       PRESSAVG      GPRESSAVG
ENERGY:       0      10.0      20.0      0.0      0.0      -300.0      40.0      0.0      0.0      0.0      -230.0      0.0      -230.0      -230.0      0.0      1.0      1.0      1660.5402      0.0      0.0
ENERGY:     100      10.0      20.0      0.0      0.0      -310.0      45.0      0.0      0.0      5.0      -230.0      10.0     -235.0      -230.0      10.0     2.0      2.0      1660.5402      0.0      0.0
WallClock: 1.2 CPUTime: 1.2 Memory: 100 MB
";

    #[test]
    fn test_namd_markers_and_rows() {
        let log = NamdLog::parse(NAMD_LOG, "namd").unwrap();
        assert_eq!(log.total_mass_amu, Some(1000.0));
        assert_eq!(log.energy_output_steps, Some(100));
        assert_eq!(log.pme_grid, Some([36, 36, 40]));
        assert_eq!(log.minimize_steps, Some(200));
        assert_eq!(log.energies.len(), 2);
        assert_eq!(log.energies.values("TS").unwrap(), vec![0.0, 100.0]);
    }

    #[test]
    fn test_namd_density_and_summary() {
        let log = NamdLog::parse(NAMD_LOG, "namd").unwrap();
        let density = log.densities().unwrap();
        assert!((density[0] - 1.0).abs() < 1e-12);

        let summary = log.energy_summary().unwrap();
        assert_eq!(summary.potential_initial, -230.0);
        assert_eq!(summary.potential_final, -235.0);
        assert_eq!(summary.vdw_elec_initial, -260.0);
        assert_eq!(summary.vdw_elec_final, -265.0);
    }

    #[test]
    fn test_zero_volume_reports_ts_column() {
        let content = "Info: TOTAL MASS = 10 amu\n\
                       ETITLE: ELECT VDW POTENTIAL VOLUME TS\n\
                       ENERGY: -1.0 1.0 0.0 0.0 500\n";
        let log = NamdLog::parse(content, "namd").unwrap();
        match log.densities().unwrap_err() {
            HybridError::MalformedLog { message, .. } => {
                assert_eq!(message, "non-positive VOLUME 0 at TS 500")
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_namd_default_titles_without_etitle() {
        let content = NAMD_LOG
            .lines()
            .filter(|l| !l.starts_with("ETITLE:"))
            .collect::<Vec<_>>()
            .join("\n");
        let log = NamdLog::parse(&content, "namd").unwrap();
        assert_eq!(log.energies.titles.len(), DEFAULT_NAMD_TITLES.len());
        assert_eq!(log.energies.column("POTENTIAL"), Some(12));
    }

    #[test]
    fn test_namd_energy_before_mass_is_malformed() {
        let content = "ETITLE: TS POTENTIAL\nENERGY: 0 1.0\nInfo: TOTAL MASS = 10 amu\n";
        let err = NamdLog::parse(content, "namd").unwrap_err();
        assert!(matches!(err, HybridError::MalformedLog { .. }));
    }

    #[test]
    fn test_namd_width_mismatch_and_bad_number() {
        let short = NAMD_LOG.replace("ENERGY:     100      10.0", "ENERGY:     100");
        assert!(NamdLog::parse(&short, "namd").is_err());

        let bad = NAMD_LOG.replace("-310.0", "abc");
        let err = NamdLog::parse(&bad, "namd").unwrap_err();
        assert!(err.to_string().contains("not a number"));
    }

    const GOMC_LOG: &str = "\
ETITLE:     STEP      TOTAL   INTRA(B)  INTRA(NB)  INTER(LJ)  LRC  TOTAL_ELECT
ENER_0:     1000      1000.0    10.0     20.0       30.0      0.0    40.0
STITLE:     STEP     VOLUME   PRESSURE   TOT_MOL   TOT_DENSITY
STAT_0:     1000    15625.0    98.5      512       998.3
ENER_1:     1000      -500.0    1.0      2.0        3.0       0.0    4.0
STAT_1:     1000     8000.0     1.2       12       10.0
ENER_0:     2000      1002.0    10.0     20.0       30.0      0.0    42.0
STAT_0:     2000    15620.0    99.0      512       998.5
ENER_1:     2000      -501.0    1.0      2.0        3.0       0.0    5.0
STAT_1:     2000     8001.0     1.1       12        9.9
";

    #[test]
    fn test_gomc_zip_pairs_boxes() {
        let log = GomcLog::parse(GOMC_LOG, "gomc").unwrap();
        assert_eq!(log.box_indices(), vec![0, 1]);
        let box_0 = log.box_log(0).unwrap();
        assert_eq!(box_0.energies.len(), 2);
        assert_eq!(box_0.stats.len(), 2);
        assert_eq!(box_0.stats.values("TOT_DENSITY").unwrap(), vec![998.3, 998.5]);
        assert_eq!(log.box_log(1).unwrap().energies.values("TOTAL").unwrap(), vec![-500.0, -501.0]);
    }

    #[test]
    fn test_gomc_summary_in_kcal() {
        let log = GomcLog::parse(GOMC_LOG, "gomc").unwrap();
        let summary = log.box_log(0).unwrap().energy_summary_kcal("gomc").unwrap();
        assert!((summary.potential_initial - 1000.0 * K_TO_KCAL_MOL).abs() < 1e-12);
        assert!((summary.vdw_elec_final - 92.0 * K_TO_KCAL_MOL).abs() < 1e-12);
    }

    #[test]
    fn test_gomc_stat_for_other_box_rejected() {
        let swapped = GOMC_LOG.replacen("STAT_0:     1000", "STAT_1:     1000", 1);
        let err = GomcLog::parse(&swapped, "gomc").unwrap_err();
        assert!(err.to_string().contains("follows ENER_0"));
    }

    #[test]
    fn test_gomc_unpaired_lines_rejected() {
        let extra_ener = format!("{}ENER_0:     3000      1.0 1.0 1.0 1.0 0.0 1.0\n", GOMC_LOG);
        assert!(GomcLog::parse(&extra_ener, "gomc").is_err());

        let extra_stat = format!("{}STAT_0:     3000    1.0 1.0 1 1.0\n", GOMC_LOG);
        let err = GomcLog::parse(&extra_stat, "gomc").unwrap_err();
        assert!(err.to_string().contains("no pending ENER"));
    }

    #[test]
    fn test_gomc_missing_titles_rejected() {
        let content = "ENER_0: 1000 1.0\nSTAT_0: 1000 1.0\n";
        assert!(GomcLog::parse(content, "gomc").is_err());
    }

    #[test]
    fn test_missing_log_is_process_output_missing() {
        let dir = tempfile::tempdir().unwrap();
        let err = NamdLog::read(&dir.path().join("out.dat")).unwrap_err();
        assert!(matches!(err, HybridError::ProcessOutputMissing(_)));
    }
}
