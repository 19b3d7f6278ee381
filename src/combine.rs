//! Per-box data tables and the post-hoc `combine` command.
//!
//! [`CombinedData`] accumulates every turn's samples on the global step
//! axis. The orchestrator feeds it as turns finish; [`combine_runs`] rebuilds
//! it from the run directories alone by replaying every turn in order with a
//! step counter starting at 0.
//!
//! Output files, per box `N`:
//!
//! | File | Content |
//! |------|---------|
//! | `NAMD_data_box_N.txt` | every NAMD row with rebased TS, minimization included |
//! | `NAMD_data_density_box_N.txt` | NAMD rows at step >= 0 plus DENSITY (g/cm³) |
//! | `GOMC_Energies_Stat_box_N.txt` | GOMC energies and statistics, native units |
//! | `GOMC_Energies_Stat_kcal_per_mol_box_N.txt` | same, kcal/mol and g/cm³ |
//! | `combined_NAMD_GOMC_data_box_N.txt` | merged MD/MC series |
//!
//! GCMC runs additionally get the concatenated `his1a.dat` history and the
//! summed `*dis1a.dat` distributions.

use crate::config::{SimulationConfig, SimulationType};
use crate::error::{HybridError, Result};
use crate::io::{number_cells, write_delimited, write_table};
use crate::merge::{gomc_rows, merge_series, namd_rows, TimeSeriesRow, COMBINED_HEADER};
use crate::naming::{RunNaming, LOG_FILE};
use crate::parser::{GomcBoxLog, GomcLog, NamdLog};
use crate::rebase::GlobalStepCounter;
use crate::settings::SettingsManager;
use crate::units::{normalize_row, ColumnSource};
use log::{debug, info, warn};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

const HISTORY_FILE: &str = "his1a.dat";
const DISTRIBUTION_SUFFIX: &str = "dis1a.dat";

#[derive(Debug, Clone, Default)]
struct BoxTables {
    namd_titles: Vec<String>,
    namd_raw: Vec<Vec<f64>>,
    namd_density: Vec<Vec<f64>>,
    gomc_energy_titles: Vec<String>,
    gomc_stat_titles: Vec<String>,
    gomc_native: Vec<Vec<f64>>,
    gomc_kcal: Vec<Vec<f64>>,
    md: Vec<TimeSeriesRow>,
    mc_turns: Vec<Vec<TimeSeriesRow>>,
}

impl BoxTables {
    fn namd_header(&self, with_density: bool) -> Vec<String> {
        let mut header: Vec<String> = self
            .namd_titles
            .iter()
            .enumerate()
            .map(|(i, t)| if i == 0 { format!("#{}", t) } else { t.clone() })
            .collect();
        if with_density {
            header.push("DENSITY".to_string());
        }
        header
    }

    fn gomc_header(&self) -> Vec<String> {
        let mut header = vec!["#STEP".to_string()];
        header.extend(without_step(&self.gomc_energy_titles).into_iter().cloned());
        header.extend(without_step(&self.gomc_stat_titles).into_iter().cloned());
        header
    }
}

fn without_step(titles: &[String]) -> Vec<&String> {
    titles.iter().filter(|t| t.as_str() != "STEP").collect()
}

fn values_without_step(titles: &[String], row: &[f64]) -> Vec<f64> {
    titles
        .iter()
        .zip(row)
        .filter(|(t, _)| t.as_str() != "STEP")
        .map(|(_, &v)| v)
        .collect()
}

fn ensure_titles(current: &mut Vec<String>, incoming: &[String], source: &str) -> Result<()> {
    if current.is_empty() {
        *current = incoming.to_vec();
        Ok(())
    } else if current.as_slice() == incoming {
        Ok(())
    } else {
        Err(HybridError::malformed(
            source,
            "column titles differ from earlier turns of the same box",
        ))
    }
}

/// GCMC histogram and distribution output gathered across MC turns.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GcmcHistograms {
    history: Vec<String>,
    distributions: BTreeMap<usize, BTreeMap<i64, f64>>,
}

impl GcmcHistograms {
    /// Adds the `his1a.dat` and `*dis1a.dat` files of one GOMC turn.
    ///
    /// The history header line is kept only from the first turn. The n-th
    /// distribution file (by name, starting at 1) of every turn is summed
    /// into distribution n.
    pub fn add_run(&mut self, gomc_dir: &Path) -> Result<()> {
        let history = gomc_dir.join(HISTORY_FILE);
        if history.exists() {
            let content = fs::read_to_string(&history)?;
            let skip = usize::from(!self.history.is_empty());
            self.history
                .extend(content.lines().skip(skip).map(String::from));
        } else {
            warn!("No {} in {}", HISTORY_FILE, gomc_dir.display());
        }

        let mut files: Vec<PathBuf> = fs::read_dir(gomc_dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| {
                path.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(DISTRIBUTION_SUFFIX))
            })
            .collect();
        files.sort();

        for (i, path) in files.iter().enumerate() {
            let source = path.display().to_string();
            let content = fs::read_to_string(path)?;
            let sums = self.distributions.entry(i + 1).or_default();
            for (line_no, line) in content.lines().enumerate() {
                let tokens: Vec<&str> = line.split_whitespace().collect();
                if tokens.is_empty() {
                    continue;
                }
                let parsed = match tokens.as_slice() {
                    [key, value] => key.parse::<i64>().ok().zip(value.parse::<f64>().ok()),
                    _ => None,
                };
                let (key, value) = parsed.ok_or_else(|| {
                    HybridError::malformed(
                        &source,
                        format!("line {}: expected '<count> <frequency>'", line_no + 1),
                    )
                })?;
                *sums.entry(key).or_insert(0.0) += value;
            }
        }
        Ok(())
    }

    /// Whether nothing was gathered.
    pub fn is_empty(&self) -> bool {
        self.history.is_empty() && self.distributions.is_empty()
    }

    /// Summed distribution `n`, sorted by key.
    pub fn distribution(&self, n: usize) -> Option<Vec<(i64, f64)>> {
        self.distributions
            .get(&n)
            .map(|d| d.iter().map(|(&k, &v)| (k, v)).collect())
    }

    /// Writes `GOMC_hist_data_box_0.txt` and every
    /// `GOMC_dist_data_box_0_res_or_mol_no_<n>.txt` into `out_dir`.
    pub fn write(&self, out_dir: &Path) -> Result<()> {
        if !self.history.is_empty() {
            let mut content = self.history.join("\n");
            content.push('\n');
            fs::write(out_dir.join("GOMC_hist_data_box_0.txt"), content)?;
        }
        for (n, sums) in &self.distributions {
            let rows: Vec<Vec<String>> = sums
                .iter()
                .map(|(key, value)| vec![key.to_string(), value.to_string()])
                .collect();
            write_delimited(
                &out_dir.join(format!("GOMC_dist_data_box_0_res_or_mol_no_{}.txt", n)),
                b' ',
                None,
                &rows,
            )?;
        }
        Ok(())
    }
}

/// Every box's data on the global step axis.
#[derive(Debug, Clone)]
pub struct CombinedData {
    simulation_type: SimulationType,
    boxes: BTreeMap<usize, BoxTables>,
    histograms: GcmcHistograms,
}

impl CombinedData {
    /// Empty tables for an ensemble.
    pub fn new(simulation_type: SimulationType) -> Self {
        Self {
            simulation_type,
            boxes: BTreeMap::new(),
            histograms: GcmcHistograms::default(),
        }
    }

    /// Adds one finished MD turn and advances `counter`.
    ///
    /// `logs` holds `(box_index, log)` with box 0 first. Every box of the
    /// turn is rebased from the same starting offset; box 0 decides where the
    /// counter ends up.
    pub fn add_md_turn(&mut self, counter: &mut GlobalStepCounter, logs: &[(usize, &NamdLog)]) -> Result<()> {
        let start = *counter;
        let mut next = start;
        for (i, (box_index, log)) in logs.iter().enumerate() {
            let local = log
                .energies
                .values("TS")
                .ok_or_else(|| HybridError::malformed(log.source(), "TS column is missing"))?;
            let mut box_counter = start;
            let steps = box_counter.rebase_md_turn(&local, log.minimize_steps);
            if i == 0 {
                next = box_counter;
            }
            self.add_namd_rows(*box_index, log, &steps)?;
        }
        *counter = next;
        debug!("Global step after MD turn: {}", counter.offset());
        Ok(())
    }

    fn add_namd_rows(&mut self, box_index: usize, log: &NamdLog, steps: &[i64]) -> Result<()> {
        let md = namd_rows(log, steps)?;
        let densities = log.densities()?;
        let ts = log.energies.require_column("TS", log.source())?;

        let tables = self.boxes.entry(box_index).or_default();
        ensure_titles(&mut tables.namd_titles, &log.energies.titles, log.source())?;
        for ((row, &step), density) in log.energies.rows.iter().zip(steps).zip(densities) {
            let mut raw = row.clone();
            raw[ts] = step as f64;
            if step >= 0 {
                let mut with_density = raw.clone();
                with_density.push(density);
                tables.namd_density.push(with_density);
            }
            tables.namd_raw.push(raw);
        }
        tables.md.extend(md);
        Ok(())
    }

    /// Adds one finished MC turn and advances `counter` to the first rebased
    /// step of the first box.
    pub fn add_mc_turn(&mut self, counter: &mut GlobalStepCounter, log: &GomcLog, boxes: &[usize]) -> Result<()> {
        let mut first_steps: Option<Vec<i64>> = None;
        for &box_index in boxes {
            let box_log = log.box_log(box_index)?;
            let local = box_log
                .energies
                .values("STEP")
                .ok_or_else(|| HybridError::malformed(log.source(), "STEP column is missing"))?;
            let steps = counter.rebase_steps(&local);
            self.add_gomc_rows(box_index, box_log, &steps, log.source())?;
            if first_steps.is_none() {
                first_steps = Some(steps);
            }
        }
        if let Some(steps) = first_steps {
            counter.finish_mc_turn(&steps);
        }
        debug!("Global step after MC turn: {}", counter.offset());
        Ok(())
    }

    fn add_gomc_rows(&mut self, box_index: usize, box_log: &GomcBoxLog, steps: &[i64], source: &str) -> Result<()> {
        let mc = gomc_rows(box_log, steps, source)?;
        let tables = self.boxes.entry(box_index).or_default();
        ensure_titles(&mut tables.gomc_energy_titles, &box_log.energies.titles, source)?;
        ensure_titles(&mut tables.gomc_stat_titles, &box_log.stats.titles, source)?;

        let e_titles = &box_log.energies.titles;
        let s_titles = &box_log.stats.titles;
        for ((energy, stat), &step) in box_log.energies.rows.iter().zip(&box_log.stats.rows).zip(steps) {
            let mut native = vec![step as f64];
            native.extend(values_without_step(e_titles, energy));
            native.extend(values_without_step(s_titles, stat));
            tables.gomc_native.push(native);

            let mut kcal = vec![step as f64];
            kcal.extend(values_without_step(
                e_titles,
                &normalize_row(ColumnSource::GomcEnergy, e_titles, energy),
            ));
            kcal.extend(values_without_step(
                s_titles,
                &normalize_row(ColumnSource::GomcStatistics, s_titles, stat),
            ));
            tables.gomc_kcal.push(kcal);
        }
        tables.mc_turns.push(mc);
        Ok(())
    }

    /// Adds the GCMC histogram files of an MC turn directory.
    pub fn add_gcmc_histograms(&mut self, gomc_dir: &Path) -> Result<()> {
        self.histograms.add_run(gomc_dir)
    }

    /// Boxes with any data.
    pub fn box_indices(&self) -> Vec<usize> {
        self.boxes.keys().copied().collect()
    }

    /// Merged MD/MC series of one box.
    pub fn merged(&self, box_index: usize) -> Vec<TimeSeriesRow> {
        self.boxes.get(&box_index).map_or_else(Vec::new, |t| {
            merge_series(&t.md, &t.mc_turns, self.simulation_type.fixed_volume())
        })
    }

    /// MD and MC sample counts of one box.
    pub fn sample_counts(&self, box_index: usize) -> (usize, usize) {
        self.boxes
            .get(&box_index)
            .map_or((0, 0), |t| (t.md.len(), t.mc_turns.iter().map(Vec::len).sum()))
    }

    /// Writes every table into `out_dir`, creating it if needed.
    pub fn write(&self, out_dir: &Path) -> Result<()> {
        fs::create_dir_all(out_dir)?;
        for (&b, tables) in &self.boxes {
            if !tables.namd_titles.is_empty() {
                write_table(
                    &out_dir.join(format!("NAMD_data_box_{}.txt", b)),
                    &tables.namd_header(false),
                    &rows_to_cells(&tables.namd_raw),
                )?;
                write_table(
                    &out_dir.join(format!("NAMD_data_density_box_{}.txt", b)),
                    &tables.namd_header(true),
                    &rows_to_cells(&tables.namd_density),
                )?;
            }
            if !tables.gomc_energy_titles.is_empty() {
                let header = tables.gomc_header();
                write_table(
                    &out_dir.join(format!("GOMC_Energies_Stat_box_{}.txt", b)),
                    &header,
                    &rows_to_cells(&tables.gomc_native),
                )?;
                write_table(
                    &out_dir.join(format!("GOMC_Energies_Stat_kcal_per_mol_box_{}.txt", b)),
                    &header,
                    &rows_to_cells(&tables.gomc_kcal),
                )?;
            }
            let header: Vec<String> = COMBINED_HEADER.iter().map(|s| s.to_string()).collect();
            let rows: Vec<Vec<String>> = self.merged(b).iter().map(TimeSeriesRow::cells).collect();
            write_table(
                &out_dir.join(format!("combined_NAMD_GOMC_data_box_{}.txt", b)),
                &header,
                &rows,
            )?;
        }
        if self.simulation_type == SimulationType::Gcmc {
            self.histograms.write(out_dir)?;
        }
        info!("Combined data written to {}", out_dir.display());
        Ok(())
    }
}

fn rows_to_cells(rows: &[Vec<f64>]) -> Vec<Vec<String>> {
    rows.iter().map(|r| number_cells(r)).collect()
}

/// Outcome of a replay over the run directories.
#[derive(Debug, Clone)]
pub struct Replay {
    /// Rebuilt tables
    pub data: CombinedData,
    /// Turns replayed
    pub runs: u64,
    /// Counter after the last replayed turn
    pub counter: GlobalStepCounter,
}

/// Replays every finished turn under `naming`, in `run_no` order.
///
/// The walk stops at the first turn whose directory or console log is
/// missing, which is where an interrupted run left off.
pub fn replay_runs(config: &SimulationConfig, naming: &RunNaming) -> Result<Replay> {
    let mut data = CombinedData::new(config.simulation_type);
    let mut counter = GlobalStepCounter::new(0);
    let md_boxes = config.md_boxes();
    let log_boxes = config.mc_log_boxes();
    let mut run_no = 0u64;

    loop {
        if run_no % 2 == 0 {
            let dirs: Vec<PathBuf> = md_boxes.iter().map(|&b| naming.namd_dir(run_no, b)).collect();
            if !dirs.iter().all(|d| d.join(LOG_FILE).exists()) {
                break;
            }
            let logs = dirs
                .iter()
                .map(|d| NamdLog::read(&d.join(LOG_FILE)))
                .collect::<Result<Vec<_>>>()?;
            let pairs: Vec<(usize, &NamdLog)> = md_boxes.iter().copied().zip(logs.iter()).collect();
            data.add_md_turn(&mut counter, &pairs)?;
        } else {
            let dir = naming.gomc_dir(run_no);
            if !dir.join(LOG_FILE).exists() {
                break;
            }
            let log = GomcLog::read(&dir.join(LOG_FILE))?;
            data.add_mc_turn(&mut counter, &log, &log_boxes)?;
            if config.simulation_type == SimulationType::Gcmc {
                data.add_gcmc_histograms(&dir)?;
            }
        }
        run_no += 1;
    }

    if run_no < config.total_runs() {
        warn!(
            "Replayed {} of {} turns; run {} has no console log",
            run_no,
            config.total_runs(),
            run_no
        );
    }
    Ok(Replay {
        data,
        runs: run_no,
        counter,
    })
}

/// The `combine` command: replays the run directories below `work_dir` and
/// writes every table into the combined-data directory.
pub fn combine_runs(config: &SimulationConfig, settings: &SettingsManager, work_dir: &Path) -> Result<Replay> {
    let paths = settings.paths();
    let naming = RunNaming::new(work_dir, &paths.namd_runs, &paths.gomc_runs);
    let replay = replay_runs(config, &naming)?;
    if replay.runs == 0 {
        return Err(HybridError::ProcessOutputMissing(
            naming.namd_dir(0, 0).join(LOG_FILE),
        ));
    }
    replay.data.write(&work_dir.join(&paths.combined_data))?;
    info!(
        "Combined {} turns, final global step {}",
        replay.runs,
        replay.counter.offset()
    );
    Ok(replay)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const NAMD_LOG: &str = "\
Info: TOTAL MASS = 1000.0 amu
TCL: Minimizing for 100 steps
ETITLE:      TS    ELECT     VDW    POTENTIAL   PRESSURE    VOLUME
ENERGY:       0   -300.0    40.0     -260.0       1.0      1660.5402
ENERGY:     100   -301.0    41.0     -260.0       1.0      1660.5402
ENERGY:     200   -302.0    42.0     -260.0       1.0      1660.5402
";

    const GOMC_LOG: &str = "\
ETITLE:     STEP      TOTAL   INTRA(NB)  INTER(LJ)  TOTAL_ELECT
ENER_0:     0        100.0    1.0        2.0       3.0
STAT_0:     0        15625.0   998.0
ENER_0:     50       110.0    1.0        2.0       3.0
STAT_0:     50       15625.0   999.0
STITLE:     STEP     VOLUME    TOT_DENSITY
";

    fn gomc_log() -> GomcLog {
        let text = "\
ETITLE:     STEP      TOTAL   INTRA(NB)  INTER(LJ)  TOTAL_ELECT
STITLE:     STEP     VOLUME    TOT_DENSITY
ENER_0:     0        100.0    1.0        2.0       3.0
STAT_0:     0        15625.0   998.0
ENER_0:     50       110.0    1.0        2.0       3.0
STAT_0:     50       15625.0   999.0
";
        GomcLog::parse(text, "gomc").unwrap()
    }

    #[test]
    fn test_md_then_mc_turn_steps() {
        let namd = NamdLog::parse(NAMD_LOG, "namd").unwrap();
        let mut data = CombinedData::new(SimulationType::Npt);
        let mut counter = GlobalStepCounter::new(0);

        data.add_md_turn(&mut counter, &[(0, &namd)]).unwrap();
        assert_eq!(counter.offset(), 100);
        assert_eq!(data.sample_counts(0), (2, 0));

        data.add_mc_turn(&mut counter, &gomc_log(), &[0]).unwrap();
        assert_eq!(counter.offset(), 100);

        let merged = data.merged(0);
        let steps: Vec<i64> = merged.iter().map(|r| r.step).collect();
        assert_eq!(steps, vec![0, 100, 100, 150]);
    }

    #[test]
    fn test_write_tables() {
        let dir = tempdir().unwrap();
        let namd = NamdLog::parse(NAMD_LOG, "namd").unwrap();
        let mut data = CombinedData::new(SimulationType::Npt);
        let mut counter = GlobalStepCounter::new(0);
        data.add_md_turn(&mut counter, &[(0, &namd)]).unwrap();
        data.add_mc_turn(&mut counter, &gomc_log(), &[0]).unwrap();
        data.write(dir.path()).unwrap();

        let raw = fs::read_to_string(dir.path().join("NAMD_data_box_0.txt")).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines[0], "#TS\tELECT\tVDW\tPOTENTIAL\tPRESSURE\tVOLUME");
        assert!(lines[1].starts_with("-100\t"));
        assert_eq!(lines.len(), 4);

        let density = fs::read_to_string(dir.path().join("NAMD_data_density_box_0.txt")).unwrap();
        assert_eq!(density.lines().count(), 3);
        assert!(density.lines().next().unwrap().ends_with("\tDENSITY"));

        let native = fs::read_to_string(dir.path().join("GOMC_Energies_Stat_box_0.txt")).unwrap();
        let mut lines = native.lines();
        assert_eq!(
            lines.next().unwrap(),
            "#STEP\tTOTAL\tINTRA(NB)\tINTER(LJ)\tTOTAL_ELECT\tVOLUME\tTOT_DENSITY"
        );
        assert_eq!(lines.next().unwrap(), "100\t100\t1\t2\t3\t15625\t998");

        let kcal =
            fs::read_to_string(dir.path().join("GOMC_Energies_Stat_kcal_per_mol_box_0.txt")).unwrap();
        assert!(kcal.lines().nth(1).unwrap().ends_with("\t15625\t0.998"));

        let combined =
            fs::read_to_string(dir.path().join("combined_NAMD_GOMC_data_box_0.txt")).unwrap();
        let engines: Vec<&str> = combined
            .lines()
            .skip(1)
            .map(|l| l.split('\t').next().unwrap())
            .collect();
        assert_eq!(engines, vec!["NAMD", "NAMD", "GOMC", "GOMC"]);
        assert!(!dir.path().join("GOMC_hist_data_box_0.txt").exists());
    }

    #[test]
    fn test_stat_before_stitle_is_rejected() {
        assert!(GomcLog::parse(GOMC_LOG, "gomc").is_err());
    }

    #[test]
    fn test_gcmc_histograms_sum_and_concatenate() {
        let dir = tempdir().unwrap();
        let run1 = dir.path().join("0000000001");
        let run3 = dir.path().join("0000000003");
        fs::create_dir_all(&run1).unwrap();
        fs::create_dir_all(&run3).unwrap();
        fs::write(run1.join("his1a.dat"), "T mu\n0 1\n").unwrap();
        fs::write(run3.join("his1a.dat"), "T mu\n2 3\n").unwrap();
        fs::write(run1.join("n1dis1a.dat"), "10 2\n2 1\n").unwrap();
        fs::write(run3.join("n1dis1a.dat"), "2 4\n").unwrap();

        let mut histograms = GcmcHistograms::default();
        histograms.add_run(&run1).unwrap();
        histograms.add_run(&run3).unwrap();
        assert_eq!(histograms.distribution(1), Some(vec![(2, 5.0), (10, 2.0)]));

        let out = dir.path().join("out");
        fs::create_dir_all(&out).unwrap();
        histograms.write(&out).unwrap();
        assert_eq!(
            fs::read_to_string(out.join("GOMC_hist_data_box_0.txt")).unwrap(),
            "T mu\n0 1\n2 3\n"
        );
        assert_eq!(
            fs::read_to_string(out.join("GOMC_dist_data_box_0_res_or_mol_no_1.txt")).unwrap(),
            "2 5\n10 2\n"
        );
    }
}
