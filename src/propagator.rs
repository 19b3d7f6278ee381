//! Geometry and restart propagation between turns.
//!
//! Every turn starts from what the previous turn of the other engine left
//! behind. This module decides, per box and per turn:
//!
//! - which files the control file points at (starting structures or the
//!   previous turn's restart files)
//! - which box geometry the control file declares
//! - every other per-turn token of the NAMD and GOMC templates
//!
//! | Turn | Box | Previous MC turn | Geometry source |
//! |------|-----|------------------|-----------------|
//! | MD   | any | none             | starting PDB `CRYST1` + overrides |
//! | MD   | any | `GOMC/<n>`       | `Output_data_BOX_<b>_restart.pdb` `CRYST1` |
//! | MC   | MD box | any           | `namdOut.restart.xsc` of the MD turn |
//! | MC   | MC-only box 1 | none   | starting PDB `CRYST1` + overrides |
//! | MC   | MC-only box 1 | `GOMC/<n>` | `Output_data_BOX_1_restart.xsc` |
//!
//! All file paths written into control files are relative to the turn
//! directory.

use crate::config::SimulationConfig;
use crate::error::{HybridError, Result};
use crate::geometry::{read_xsc, resolve_initial, BoxGeometry, CrystRecord, ResolvedGeometry};
use crate::naming::{gomc_output, namd_output, relative_path, FFTW_PREFIX};
use crate::template_generator::{format_real, ControlBindings};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// Where a turn takes its starting state from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RestartHandle {
    /// No earlier turn: start from the configured structures
    Fresh,
    /// Output directory of the previous turn
    Previous(PathBuf),
}

impl RestartHandle {
    /// Handle for an optional directory.
    pub fn from_dir(dir: Option<PathBuf>) -> Self {
        dir.map_or(RestartHandle::Fresh, RestartHandle::Previous)
    }

    /// Whether there is no earlier turn.
    pub fn is_fresh(&self) -> bool {
        matches!(self, RestartHandle::Fresh)
    }

    /// Directory of the earlier turn.
    pub fn dir(&self) -> Option<&Path> {
        match self {
            RestartHandle::Fresh => None,
            RestartHandle::Previous(dir) => Some(dir),
        }
    }
}

/// Inputs of one NAMD control file.
#[derive(Debug, Clone)]
pub struct NamdTurn<'a> {
    /// Box simulated
    pub box_index: usize,
    /// Turn directory
    pub run_dir: &'a Path,
    /// Previous MC turn
    pub previous_gomc: &'a RestartHandle,
    /// Geometry declared in the control file
    pub geometry: BoxGeometry,
    /// PME grid declared in the control file
    pub pme_grid: [u64; 3],
}

/// Inputs of one GOMC control file.
#[derive(Debug, Clone)]
pub struct GomcTurn<'a> {
    /// Turn directory
    pub run_dir: &'a Path,
    /// MD directories of the preceding MD turn, indexed by box
    pub namd_dirs: &'a [PathBuf],
    /// Previous MC turn
    pub previous_gomc: &'a RestartHandle,
    /// Geometry of every MC box, indexed by box
    pub geometries: &'a [BoxGeometry],
}

/// Resolves geometry and builds control-file bindings for one simulation.
#[derive(Debug, Clone, Copy)]
pub struct Propagator<'a> {
    config: &'a SimulationConfig,
    work_dir: &'a Path,
}

impl<'a> Propagator<'a> {
    /// Propagator for `config`, with relative configuration paths resolved
    /// against `work_dir`.
    pub fn new(config: &'a SimulationConfig, work_dir: &'a Path) -> Self {
        Self { config, work_dir }
    }

    fn starting_file(&self, file: Option<&str>, what: &str, box_index: usize) -> Result<PathBuf> {
        file.map(|f| self.work_dir.join(f)).ok_or_else(|| {
            HybridError::Configuration(format!("no starting {} file for box {}", what, box_index))
        })
    }

    fn initial_geometry(&self, box_index: usize) -> Result<ResolvedGeometry> {
        let pdb = self.starting_file(self.config.starting_pdb(box_index), "PDB", box_index)?;
        let record = CrystRecord::read(&pdb)?;
        resolve_initial(
            box_index,
            &record,
            self.config.dims_override(box_index),
            self.config.angle_override(box_index),
        )
    }

    /// Geometry of an MD turn for `box_index`.
    ///
    /// A fresh turn reads the starting PDB and applies the configured
    /// overrides. Later turns take the `CRYST1` record GOMC wrote.
    pub fn namd_geometry(&self, box_index: usize, previous_gomc: &RestartHandle) -> Result<ResolvedGeometry> {
        match previous_gomc.dir() {
            None => self.initial_geometry(box_index),
            Some(dir) => {
                let pdb = dir.join(gomc_output::restart(box_index, "pdb"));
                let geometry = CrystRecord::read(&pdb)?.to_geometry(&pdb.display().to_string())?;
                Ok(ResolvedGeometry {
                    geometry,
                    warnings: Vec::new(),
                })
            }
        }
    }

    /// Geometry of every box of an MC turn.
    ///
    /// MD boxes take the cell NAMD just wrote. An MC-only box 1 is resolved
    /// like a fresh MD box on the first MC turn and from GOMC's own
    /// extended-system restart afterwards.
    pub fn gomc_geometries(&self, namd_dirs: &[PathBuf], previous_gomc: &RestartHandle) -> Result<Vec<ResolvedGeometry>> {
        let mut resolved = Vec::new();
        for box_index in self.config.mc_boxes() {
            let geometry = if let Some(namd_dir) = namd_dirs.get(box_index) {
                ResolvedGeometry {
                    geometry: read_xsc(&namd_dir.join(namd_output::XSC))?,
                    warnings: Vec::new(),
                }
            } else {
                match previous_gomc.dir() {
                    None => self.initial_geometry(box_index)?,
                    Some(dir) => ResolvedGeometry {
                        geometry: read_xsc(&dir.join(gomc_output::restart(box_index, "xsc")))?,
                        warnings: Vec::new(),
                    },
                }
            };
            debug!("MC box {} geometry: {:?}", box_index, geometry.geometry.dims);
            resolved.push(geometry);
        }
        Ok(resolved)
    }

    fn rel(&self, target: &Path, run_dir: &Path) -> String {
        relative_path(target, run_dir).display().to_string()
    }

    fn parameter_lines(&self, keyword: &str, files: &[String], run_dir: &Path) -> String {
        files
            .iter()
            .map(|f| format!("{} \t {}\n", keyword, self.rel(&self.work_dir.join(f), run_dir)))
            .collect()
    }

    /// Bindings of a NAMD control file.
    ///
    /// `NAMD_Minimize` is always bound; the template decides whether the
    /// minimization block runs (it is guarded by `Bool_restart`).
    pub fn namd_bindings(&self, turn: &NamdTurn<'_>) -> Result<ControlBindings> {
        let config = self.config;
        let b = turn.box_index;
        let mut bindings = ControlBindings::new();

        bindings.set(
            "all_parameter_files",
            self.parameter_lines("parameters", &config.starting_ff_file_list_namd, turn.run_dir),
        );

        match turn.previous_gomc.dir() {
            None => {
                let pdb = self.starting_file(config.starting_pdb(b), "PDB", b)?;
                let psf = self.starting_file(config.starting_psf(b), "PSF", b)?;
                bindings
                    .set("pdb_box_file", self.rel(&pdb, turn.run_dir))
                    .set("psf_box_file", self.rel(&psf, turn.run_dir))
                    .set("coor_file", "NA")
                    .set("xsc_file", "NA")
                    .set("vel_file", "NA")
                    .set("Bool_restart", "false");
            }
            Some(gomc_dir) => {
                let prev = self.rel(gomc_dir, turn.run_dir);
                for (token, ext) in [
                    ("pdb_box_file", "pdb"),
                    ("psf_box_file", "psf"),
                    ("coor_file", "coor"),
                    ("xsc_file", "xsc"),
                    ("vel_file", "vel"),
                ] {
                    bindings.set(token, format!("{}/{}", prev, gomc_output::restart(b, ext)));
                }
                bindings.set("Bool_restart", "true");
            }
        }

        let g = &turn.geometry;
        for (axis, (dim, origin)) in ["x", "y", "z"].iter().zip(g.dims.iter().zip(g.origin.iter())) {
            bindings
                .set(&format!("{}_dim_box", axis), format_real(*dim))
                .set(&format!("{}_origin_box", axis), format_real(*origin));
        }
        for (axis, points) in ["X", "Y", "Z"].iter().zip(turn.pme_grid.iter()) {
            bindings.set(&format!("{}_PME_GRID_DIM", axis), points.to_string());
        }

        bindings
            .set("NAMD_Run_Steps", config.namd_run_steps.to_string())
            .set("NAMD_Minimize", config.namd_minimize_steps().to_string())
            .set("NAMD_RST_DCD_XST_Steps", config.namd_rst_dcd_xst_steps().to_string())
            .set(
                "NAMD_console_BLKavg_E_and_P_Steps",
                config.namd_console_blkavg_steps().to_string(),
            )
            .set("current_step", "0")
            .set("System_temp_set", format_real(config.simulation_temp_k))
            .set("System_press_set", format_real(config.pressure_bar()));
        Ok(bindings)
    }

    /// Bindings of a GOMC control file.
    pub fn gomc_bindings(&self, turn: &GomcTurn<'_>) -> Result<ControlBindings> {
        let config = self.config;
        let run_dir = turn.run_dir;
        let mut bindings = ControlBindings::new();

        bindings.set(
            "all_parameter_files",
            self.parameter_lines("Parameters", &config.starting_ff_file_list_gomc, run_dir),
        );

        let prev_rel = turn.previous_gomc.dir().map(|d| self.rel(d, run_dir));
        match &prev_rel {
            None => bindings.set("Restart_Checkpoint_file", format!("false {}", gomc_output::CHECKPOINT)),
            Some(prev) => bindings.set(
                "Restart_Checkpoint_file",
                format!("true {}/{}", prev, gomc_output::CHECKPOINT),
            ),
        };

        for box_index in config.mc_boxes() {
            let geometry = turn.geometries.get(box_index).ok_or_else(|| {
                HybridError::Configuration(format!("no geometry resolved for MC box {}", box_index))
            })?;
            for (axis, dim) in ["x", "y", "z"].iter().zip(geometry.dims.iter()) {
                bindings.set(&format!("{}_dim_box_{}", axis, box_index), format_real(*dim));
            }

            match &prev_rel {
                None => {
                    let pdb = self.starting_file(config.starting_pdb(box_index), "PDB", box_index)?;
                    let psf = self.starting_file(config.starting_psf(box_index), "PSF", box_index)?;
                    bindings
                        .set(&format!("pdb_file_box_{}_file", box_index), self.rel(&pdb, run_dir))
                        .set(&format!("psf_file_box_{}_file", box_index), self.rel(&psf, run_dir));
                }
                Some(prev) => {
                    for ext in ["pdb", "psf"] {
                        bindings.set(
                            &format!("{}_file_box_{}_file", ext, box_index),
                            format!("{}/{}", prev, gomc_output::restart(box_index, ext)),
                        );
                    }
                }
            }

            match (turn.namd_dirs.get(box_index), &prev_rel) {
                (Some(namd_dir), _) => {
                    let md = self.rel(namd_dir, run_dir);
                    for (token, file) in [
                        ("coor", namd_output::COOR),
                        ("xsc", namd_output::XSC),
                        ("vel", namd_output::VEL),
                    ] {
                        bindings.set(&format!("{}_box_{}_file", token, box_index), format!("{}/{}", md, file));
                    }
                }
                (None, Some(prev)) => {
                    for ext in ["coor", "xsc", "vel"] {
                        bindings.set(
                            &format!("{}_box_{}_file", ext, box_index),
                            format!("{}/{}", prev, gomc_output::restart(box_index, ext)),
                        );
                    }
                }
                (None, None) => {
                    let index = box_index.to_string();
                    bindings
                        .remove_directive("binCoordinates", &index)
                        .remove_directive("extendedSystem", &index)
                        .remove_directive("binVelocities", &index);
                }
            }
        }

        let restart = !(config.box_1_mc_only() && turn.previous_gomc.is_fresh());
        bindings.set("restart_true_or_false", restart.to_string());

        bindings
            .set("GOMC_Run_Steps", config.gomc_run_steps.to_string())
            .set(
                "GOMC_RST_Coor_CKpoint_Steps",
                config.gomc_rst_coor_ckpoint_steps().to_string(),
            )
            .set(
                "GOMC_console_BLKavg_Hist_Steps",
                config.gomc_console_blkavg_hist_steps().to_string(),
            )
            .set("GOMC_Hist_sample_Steps", config.gomc_hist_sample_steps().to_string())
            .set("GOMC_Adj_Steps", config.gomc_adj_steps().to_string())
            .set("GOMC_Equilb_Steps", config.gomc_equilibration_steps().to_string())
            .set("System_temp_set", format_real(config.simulation_temp_k))
            .set("System_press_set", format_real(config.pressure_bar()));

        bindings.set("mu_ChemPot_K_or_P_Fugacitiy_bar_all", self.chempot_lines());
        Ok(bindings)
    }

    fn chempot_lines(&self) -> String {
        match (&self.config.gcmc_chempot_mode, &self.config.gcmc_chempot_values) {
            (Some(mode), Some(values)) => values
                .iter()
                .map(|(residue, value)| format!("{} \t {} \t {}\n", mode.keyword(), residue, value))
                .collect(),
            _ => String::new(),
        }
    }
}

/// PME grid of the first MD turn: `int(dim * scale + 1)` points per axis.
///
/// # Examples
///
/// ```
/// use hybrid_mdmc::geometry::BoxGeometry;
/// use hybrid_mdmc::propagator::initial_pme_grid;
///
/// let g = BoxGeometry::centered([25.0, 30.0, 40.0]);
/// assert_eq!(initial_pme_grid(&g, 1.3), [33, 40, 53]);
/// assert_eq!(initial_pme_grid(&g, 1.0), [26, 31, 41]);
/// ```
pub fn initial_pme_grid(geometry: &BoxGeometry, scale: f64) -> [u64; 3] {
    let mut grid = [0u64; 3];
    for (slot, dim) in grid.iter_mut().zip(geometry.dims.iter()) {
        *slot = (dim * scale + 1.0).floor() as u64;
    }
    grid
}

/// First `FFTW_NAMD*` plan file in `dir`, by name.
pub fn find_fftw_file(dir: &Path) -> Result<Option<PathBuf>> {
    if !dir.exists() {
        return Ok(None);
    }
    let mut plans: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with(FFTW_PREFIX))
        })
        .collect();
    plans.sort();
    Ok(plans.into_iter().next())
}

/// Deletes every stale `FFTW_NAMD*` plan in `dir`; returns how many.
pub fn remove_fftw_files(dir: &Path) -> Result<usize> {
    let mut removed = 0;
    while let Some(plan) = find_fftw_file(dir)? {
        fs::remove_file(&plan)?;
        info!("Removed stale FFTW plan {}", plan.display());
        removed += 1;
    }
    Ok(removed)
}

/// Links the run-0 FFTW plan into a later MD directory, replacing any
/// existing entry of the same name. A missing plan is only a warning.
pub fn link_fftw_file(plan: Option<&Path>, run_dir: &Path) -> Result<()> {
    let Some(plan) = plan else {
        warn!("No FFTW plan from run 0 to link into {}", run_dir.display());
        return Ok(());
    };
    let Some(name) = plan.file_name() else {
        return Ok(());
    };
    let link = run_dir.join(name);
    if fs::symlink_metadata(&link).is_ok() {
        fs::remove_file(&link)?;
    }
    #[cfg(unix)]
    std::os::unix::fs::symlink(plan, &link)?;
    #[cfg(not(unix))]
    fs::copy(plan, &link).map(|_| ())?;
    debug!("Linked {} -> {}", link.display(), plan.display());
    Ok(())
}
