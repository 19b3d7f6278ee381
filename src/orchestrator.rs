//! The hybrid MD/MC cycle loop.
//!
//! One cycle is an MD turn (`run_no` even, NAMD on every MD box) followed by
//! an MC turn (`run_no` odd, GOMC on every box). For each turn the
//! orchestrator:
//!
//! 1. resolves the box geometry from the previous turn's outputs
//! 2. renders the control file into a fresh run directory
//! 3. launches the engine and waits for it
//! 4. parses the console log, checks energy continuity across the handoff
//!    and rebases the samples onto the global step axis
//!
//! After each MC turn the driver state is checkpointed, so a later
//! invocation with `starting_at_cycle_namd_gomc_sims = c` resumes from the
//! directories of cycle `c - 1`. At the end of the run the combined data
//! tables are written.
//!
//! # Example
//!
//! ```no_run
//! use hybrid_mdmc::config::SimulationConfig;
//! use hybrid_mdmc::orchestrator::Orchestrator;
//! use hybrid_mdmc::settings::SettingsManager;
//! use std::path::Path;
//!
//! let config = SimulationConfig::load(Path::new("user_input_NAMD_GOMC.json"))?;
//! let settings = SettingsManager::load()?;
//! let summary = Orchestrator::new(&config, &settings, Path::new("."))?.run()?;
//! println!("finished at global step {}", summary.final_step);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use crate::checkpoint::{resume_counter, BoxCheckpoint, Checkpoint};
use crate::combine::{combine_runs, CombinedData};
use crate::config::{NamdSimOrder, SimulationConfig, SimulationType};
use crate::continuity::{check, EnergyContinuityCheck};
use crate::engine::{Engine, EngineRunRecord, GomcEngine, NamdEngine};
use crate::error::{HybridError, Result};
use crate::geometry::{BoxGeometry, ResolvedGeometry};
use crate::io::RunLog;
use crate::naming::{RunNaming, CHECKPOINT_FILE, LOG_FILE};
use crate::parser::{EnergySummary, NamdLog};
use crate::propagator::{
    find_fftw_file, initial_pme_grid, link_fftw_file, remove_fftw_files, GomcTurn, NamdTurn, Propagator,
    RestartHandle,
};
use crate::rebase::GlobalStepCounter;
use crate::settings::SettingsManager;
use crate::validation::validate_input_files;
use log::{debug, info};
use std::path::{Path, PathBuf};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

const MAX_BOXES: usize = 2;

/// Per-box state carried from one turn to the next.
#[derive(Debug, Clone, Default)]
pub struct BoxState {
    /// Energies of the box's last MD turn
    pub last_namd: Option<EnergySummary>,
    /// Energies of the box's last MC turn
    pub last_gomc: Option<EnergySummary>,
    /// PME grid fixed by the first MD turn
    pub pme_grid: Option<[u64; 3]>,
    /// FFTW plan written by the first MD turn
    pub fftw_plan: Option<PathBuf>,
    /// Geometry declared in the box's last control file
    pub geometry: Option<BoxGeometry>,
}

#[derive(Debug, Clone, Copy)]
struct CycleTiming {
    cycle_start: Instant,
    namd_secs: f64,
    gomc_secs: f64,
}

impl CycleTiming {
    fn new() -> Self {
        Self {
            cycle_start: Instant::now(),
            namd_secs: 0.0,
            gomc_secs: 0.0,
        }
    }
}

/// Everything the loop carries between turns.
#[derive(Debug, Clone)]
pub struct OrchestrationState {
    /// Global step offset
    pub counter: GlobalStepCounter,
    /// Samples of the turns run by this invocation
    pub data: CombinedData,
    /// Output of the last MC turn
    pub previous_gomc: RestartHandle,
    /// MD directories of the last MD turn, indexed by box
    pub namd_dirs: Vec<PathBuf>,
    /// Per-box state, indexed by box
    pub boxes: Vec<BoxState>,
    /// Every continuity check made so far
    pub continuity: Vec<EnergyContinuityCheck>,
    timing: CycleTiming,
}

/// What a finished run reports back.
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Turns executed by this invocation
    pub runs: u64,
    /// Global step after the last turn
    pub final_step: i64,
    /// Every continuity check made
    pub continuity: Vec<EnergyContinuityCheck>,
    /// Wall-clock duration of the whole run in seconds
    pub elapsed_secs: f64,
}

impl RunSummary {
    /// Number of handoffs where either quantity failed its tolerance.
    pub fn continuity_failures(&self) -> usize {
        self.continuity.iter().filter(|c| !c.passed()).count()
    }
}

/// Drives alternating NAMD and GOMC turns for one simulation.
pub struct Orchestrator<'a> {
    config: &'a SimulationConfig,
    settings: &'a SettingsManager,
    work_dir: PathBuf,
    naming: RunNaming,
    namd: NamdEngine,
    gomc: GomcEngine,
}

impl<'a> Orchestrator<'a> {
    /// Sets up the orchestrator in `work_dir`.
    ///
    /// Relative paths in the configuration and settings are resolved against
    /// `work_dir`. A fresh start requires every starting file to exist.
    pub fn new(config: &'a SimulationConfig, settings: &'a SettingsManager, work_dir: &Path) -> Result<Self> {
        let work_dir = work_dir.canonicalize()?;
        if config.starting_cycle == 0 {
            validate_input_files(config, &work_dir)?;
        }
        let paths = settings.paths();
        let naming = RunNaming::new(&work_dir, &paths.namd_runs, &paths.gomc_runs);
        Ok(Self {
            namd: NamdEngine::new(config.namd_binary(&work_dir)),
            gomc: GomcEngine::new(config.gomc_binary(&work_dir)),
            config,
            settings,
            work_dir,
            naming,
        })
    }

    /// Working directory every relative path is resolved against.
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    fn order(&self) -> NamdSimOrder {
        self.settings.run().namd_sims_order
    }

    fn propagator(&self) -> Propagator<'_> {
        Propagator::new(self.config, &self.work_dir)
    }

    /// Runs every turn from the starting cycle to the last cycle.
    pub fn run(&self) -> Result<RunSummary> {
        let start_cycle = self.config.starting_cycle;
        let mut log = if self.settings.logging().file_logging {
            RunLog::create(&self.work_dir.join(RunNaming::run_log_name(start_cycle)))?
        } else {
            RunLog::disabled()
        };

        let started = Instant::now();
        log.line(&format!(
            "start time = {} s since the Unix epoch",
            unix_seconds(SystemTime::now())
        ));
        log.line(&format!(
            "{} simulation, cycles {} to {}, NAMD order {}",
            self.config.simulation_type.label(),
            start_cycle,
            self.config.total_cycles,
            self.order()
        ));

        let mut state = self.initial_state()?;
        let start_run = self.config.starting_run();
        let total_runs = self.config.total_runs();

        for run_no in start_run..total_runs {
            log.separator();
            log.line(&format!("run_no = {} (START)", run_no));
            log.separator();

            if run_no % 2 == 0 {
                state.timing = CycleTiming::new();
                self.md_turn(run_no, &mut state, &mut log)?;
            } else {
                self.mc_turn(run_no, &mut state, &mut log)?;
                self.log_timing(run_no, &state.timing, &mut log);
            }

            log.separator();
            log.line(&format!("run_no = {} (End)", run_no));
            log.separator();
        }

        self.write_combined(&state)?;

        let elapsed_secs = started.elapsed().as_secs_f64();
        log.line(&format!(
            "date and time (end) = {} s since the Unix epoch",
            unix_seconds(SystemTime::now())
        ));
        log.line(&format!("total simulation time = {}", format_duration(elapsed_secs)));
        log.line(&format!("total simulation time (s) = {:.3}", elapsed_secs));

        Ok(RunSummary {
            runs: total_runs.saturating_sub(start_run),
            final_step: state.counter.offset(),
            continuity: state.continuity,
            elapsed_secs,
        })
    }

    /// State at the first turn of this invocation.
    ///
    /// A resumed run points at the GOMC directory of the previous cycle and
    /// recovers the PME grid and FFTW plan from the run-0 directories.
    pub fn initial_state(&self) -> Result<OrchestrationState> {
        let checkpoint = Checkpoint::load_optional(&self.work_dir.join(CHECKPOINT_FILE));
        let counter = resume_counter(self.config, checkpoint.as_ref());
        let mut state = OrchestrationState {
            counter,
            data: CombinedData::new(self.config.simulation_type),
            previous_gomc: RestartHandle::Fresh,
            namd_dirs: Vec::new(),
            boxes: vec![BoxState::default(); MAX_BOXES],
            continuity: Vec::new(),
            timing: CycleTiming::new(),
        };

        let cycle = self.config.starting_cycle;
        let Some((_, gomc_dir)) = self.naming.resume_dirs(cycle, 0) else {
            return Ok(state);
        };
        if !gomc_dir.is_dir() {
            return Err(HybridError::Configuration(format!(
                "cannot resume at cycle {}: {} does not exist",
                cycle,
                gomc_dir.display()
            )));
        }
        info!("Resuming at cycle {} from {}", cycle, gomc_dir.display());
        state.previous_gomc = RestartHandle::Previous(gomc_dir);

        for b in self.config.md_boxes() {
            let run_0 = self.naming.namd_run_0_dir(b);
            let logged = match NamdLog::read(&run_0.join(LOG_FILE)) {
                Ok(log) => log.pme_grid,
                Err(e) => {
                    debug!("Run-0 log of box {} unusable: {}", b, e);
                    None
                }
            };
            let recorded = checkpoint
                .as_ref()
                .and_then(|cp| cp.box_state(b))
                .and_then(|bs| bs.pme_grid);
            let grid = logged.or(recorded).ok_or_else(|| {
                HybridError::malformed(
                    run_0.join(LOG_FILE).display().to_string(),
                    "PME GRID DIMENSIONS line is missing",
                )
            })?;
            state.boxes[b].pme_grid = Some(grid);
            state.boxes[b].fftw_plan = find_fftw_file(&run_0)?;
        }
        Ok(state)
    }

    fn report_geometry(&self, resolved: &ResolvedGeometry, log: &mut RunLog) {
        for warning in &resolved.warnings {
            log.warning(warning);
        }
    }

    fn report_continuity(&self, checked: EnergyContinuityCheck, state: &mut OrchestrationState, log: &mut RunLog) {
        for (classification, message) in checked.messages() {
            if classification.passed() {
                log.line(&message);
            } else {
                log.warning(&message);
            }
        }
        state.continuity.push(checked);
    }

    /// One NAMD turn on every MD box.
    pub fn md_turn(&self, run_no: u64, state: &mut OrchestrationState, log: &mut RunLog) -> Result<()> {
        let propagator = self.propagator();
        let template = self.work_dir.join(&self.settings.paths().namd_template);
        let md_boxes = self.config.md_boxes();
        let dirs: Vec<PathBuf> = md_boxes.iter().map(|&b| self.naming.namd_dir(run_no, b)).collect();

        for (&b, dir) in md_boxes.iter().zip(&dirs) {
            let resolved = propagator.namd_geometry(b, &state.previous_gomc)?;
            self.report_geometry(&resolved, log);
            let pme_grid = if run_no == 0 {
                let grid = initial_pme_grid(&resolved.geometry, self.config.pme_scale());
                state.boxes[b].pme_grid = Some(grid);
                grid
            } else {
                state.boxes[b].pme_grid.ok_or_else(|| {
                    HybridError::Configuration(format!("no PME grid known for box {}", b))
                })?
            };
            let bindings = propagator.namd_bindings(&NamdTurn {
                box_index: b,
                run_dir: dir,
                previous_gomc: &state.previous_gomc,
                geometry: resolved.geometry,
                pme_grid,
            })?;
            self.namd.write_control_file(&template, &bindings, dir)?;
            if run_no == 0 {
                remove_fftw_files(dir)?;
            } else {
                link_fftw_file(state.boxes[b].fftw_plan.as_deref(), dir)?;
            }
            state.boxes[b].geometry = Some(resolved.geometry);
        }

        log.line("Running the NAMD simulations now.");
        let records = self.launch_namd(&md_boxes, &dirs)?;
        log.line("The NAMD simulation are finished.");
        state.timing.namd_secs = match self.order() {
            NamdSimOrder::Parallel => records.iter().map(EngineRunRecord::elapsed_secs).fold(0.0, f64::max),
            NamdSimOrder::Series => records.iter().map(EngineRunRecord::elapsed_secs).sum(),
        };

        let logs = dirs
            .iter()
            .map(|d| self.namd.read_log(d))
            .collect::<Result<Vec<NamdLog>>>()?;

        let check_handoff = run_no != 0 && run_no != self.config.starting_run();
        for ((&b, dir), namd_log) in md_boxes.iter().zip(&dirs).zip(&logs) {
            if run_no == 0 {
                state.boxes[b].pme_grid = namd_log.pme_grid.or(state.boxes[b].pme_grid);
                state.boxes[b].fftw_plan = find_fftw_file(dir)?;
                if state.boxes[b].fftw_plan.is_none() {
                    log.warning(&format!("NAMD wrote no FFTW plan in {}", dir.display()));
                }
            }
            let summary = namd_log.energy_summary()?;
            if let (true, Some(prev)) = (check_handoff, state.boxes[b].last_gomc) {
                let checked = check(
                    prev.potential_final,
                    summary.potential_initial,
                    prev.vdw_elec_final,
                    summary.vdw_elec_initial,
                    run_no,
                    b,
                    self.settings.continuity(),
                );
                self.report_continuity(checked, state, log);
            }
            state.boxes[b].last_namd = Some(summary);
        }

        let pairs: Vec<(usize, &NamdLog)> = md_boxes.iter().copied().zip(logs.iter()).collect();
        state.data.add_md_turn(&mut state.counter, &pairs)?;
        state.namd_dirs = dirs;
        Ok(())
    }

    fn launch_namd(&self, md_boxes: &[usize], dirs: &[PathBuf]) -> Result<Vec<EngineRunRecord>> {
        let order = self.order();
        if order == NamdSimOrder::Parallel && md_boxes.len() > 1 {
            let running = md_boxes
                .iter()
                .zip(dirs)
                .map(|(&b, dir)| self.namd.launch(dir, self.config.namd_cores(b, order), Some(b)))
                .collect::<Result<Vec<_>>>()?;
            let records = running
                .into_iter()
                .map(|r| r.wait())
                .collect::<Result<Vec<_>>>()?;
            for record in &records {
                record.ensure_success()?;
            }
            Ok(records)
        } else {
            md_boxes
                .iter()
                .zip(dirs)
                .map(|(&b, dir)| self.namd.run(dir, self.config.namd_cores(b, order), Some(b)))
                .collect()
        }
    }

    /// One GOMC turn covering every box.
    pub fn mc_turn(&self, run_no: u64, state: &mut OrchestrationState, log: &mut RunLog) -> Result<()> {
        let propagator = self.propagator();
        let dir = self.naming.gomc_dir(run_no);
        let template = self
            .work_dir
            .join(self.settings.gomc_template(self.config.simulation_type));

        let resolved = propagator.gomc_geometries(&state.namd_dirs, &state.previous_gomc)?;
        for r in &resolved {
            self.report_geometry(r, log);
        }
        let geometries: Vec<BoxGeometry> = resolved.iter().map(|r| r.geometry).collect();
        let bindings = propagator.gomc_bindings(&GomcTurn {
            run_dir: &dir,
            namd_dirs: &state.namd_dirs,
            previous_gomc: &state.previous_gomc,
            geometries: &geometries,
        })?;
        self.gomc.write_control_file(&template, &bindings, &dir)?;

        log.line("Running the GOMC simulations now.");
        let record = self.gomc.run(&dir, self.config.total_cores(), None)?;
        log.line("The GOMC simulation(s) are finished.");
        state.timing.gomc_secs = record.elapsed_secs();

        let gomc_log = self.gomc.read_log(&dir)?;
        let md_boxes = self.config.md_boxes();
        let log_boxes = self.config.mc_log_boxes();
        for &b in &log_boxes {
            let summary = gomc_log.box_log(b)?.energy_summary_kcal(gomc_log.source())?;
            if let (true, Some(prev)) = (md_boxes.contains(&b), state.boxes[b].last_namd) {
                let checked = check(
                    prev.potential_final,
                    summary.potential_initial,
                    prev.vdw_elec_final,
                    summary.vdw_elec_initial,
                    run_no,
                    b,
                    self.settings.continuity(),
                );
                self.report_continuity(checked, state, log);
            }
            state.boxes[b].last_gomc = Some(summary);
        }

        state.data.add_mc_turn(&mut state.counter, &gomc_log, &log_boxes)?;
        if self.config.simulation_type == SimulationType::Gcmc {
            state.data.add_gcmc_histograms(&dir)?;
        }
        state.previous_gomc = RestartHandle::Previous(dir);

        let checkpoint = Checkpoint {
            simulation_type: self.config.simulation_type,
            last_completed_cycle: run_no / 2,
            global_step: state.counter.offset(),
            boxes: self
                .config
                .mc_boxes()
                .iter()
                .map(|&b| BoxCheckpoint {
                    box_index: b,
                    geometry: geometries.get(b).copied(),
                    pme_grid: state.boxes[b].pme_grid,
                })
                .collect(),
        };
        checkpoint.save(&self.work_dir.join(CHECKPOINT_FILE))?;
        debug!("Checkpoint written after cycle {}", run_no / 2);
        Ok(())
    }

    fn log_timing(&self, run_no: u64, timing: &CycleTiming, log: &mut RunLog) {
        let total = timing.cycle_start.elapsed().as_secs_f64();
        let overhead = (total - timing.namd_secs - timing.gomc_secs).max(0.0);
        if run_no == self.config.starting_run() + 1 {
            log.line(
                "TIME_STATS_TITLE:\t#Cycle_No\t\tNAMD_time_s\t\tGOMC_time_s\t\tOverhead_time_s\t\tTotal_time_s",
            );
        }
        log.line(&format!(
            "TIME_STATS_DATA:\t{}\t\t{:.3}\t\t{:.3}\t\t{:.3}\t\t{:.3}",
            run_no / 2,
            timing.namd_secs,
            timing.gomc_secs,
            overhead,
            total
        ));
    }

    /// Writes the combined tables. A resumed run rebuilds them from every
    /// run directory so the tables cover the whole simulation.
    fn write_combined(&self, state: &OrchestrationState) -> Result<()> {
        if self.config.starting_cycle == 0 {
            state
                .data
                .write(&self.work_dir.join(&self.settings.paths().combined_data))
        } else {
            combine_runs(self.config, self.settings, &self.work_dir).map(|_| ())
        }
    }
}

fn unix_seconds(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map(|d| d.as_secs()).unwrap_or(0)
}

/// `H:MM:SS.sss` rendering of a duration in seconds.
fn format_duration(secs: f64) -> String {
    let hours = (secs / 3600.0).floor();
    let minutes = ((secs - hours * 3600.0) / 60.0).floor();
    let seconds = secs - hours * 3600.0 - minutes * 60.0;
    format!("{}:{:02}:{:06.3}", hours as u64, minutes as u64, seconds)
}
