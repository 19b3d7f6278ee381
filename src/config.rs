//! Simulation configuration for hybrid NAMD/GOMC runs.
//!
//! This module defines the user-facing JSON configuration and the values that
//! are derived from it once at startup:
//!
//! - [`SimulationConfig`]: the validated, read-only run description
//! - [`SimulationType`]: ensemble (GEMC, GCMC, NPT, NVT)
//! - [`ComputeDevice`]: GOMC build flavour (CPU or GPU)
//! - [`ChemPotMode`]: chemical potential or fugacity for GCMC
//! - [`NamdSimOrder`]: series or parallel launch of the two NAMD boxes
//!
//! The JSON keys are the ones used by the existing hybrid workflow, e.g.
//!
//! ```json
//! {
//!   "total_cycles_namd_gomc_sims": 10,
//!   "starting_at_cycle_namd_gomc_sims": 0,
//!   "gomc_use_CPU_or_GPU": "CPU",
//!   "simulation_type": "NPT",
//!   "only_use_box_0_for_namd_for_gemc": true,
//!   "no_core_box_0": 4,
//!   "no_core_box_1": 0,
//!   "simulation_temp_k": 250,
//!   "simulation_pressure_bar": 1.0,
//!   "gomc_run_steps": 1000,
//!   "namd_run_steps": 1000,
//!   "namd_minimize_mult_scalar": 1,
//!   "set_dims_box_0_list": [25, 25, 25],
//!   "set_dims_box_1_list": null,
//!   "set_angle_box_0_list": [90, 90, 90],
//!   "set_angle_box_1_list": null,
//!   "starting_ff_file_list_gomc": ["required_data/equilb_box/GOMC_FF.inp"],
//!   "starting_ff_file_list_namd": ["required_data/equilb_box/NAMD_FF.inp"],
//!   "starting_pdb_box_0_file": "required_data/equilb_box/box_0.pdb",
//!   "starting_psf_box_0_file": "required_data/equilb_box/box_0.psf",
//!   "namd2_bin_directory": "../NAMD_2.14_Linux-x86_64-multicore-CUDA",
//!   "gomc_bin_directory": "../GOMC/bin"
//! }
//! ```

use crate::error::{HybridError, Result};
use crate::validation;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Boltzmann-derived conversion from GOMC energy units (K) to kcal/mol.
pub const K_TO_KCAL_MOL: f64 = 1.98720425864083e-3;
/// Conversion from amu/Å³ to g/cm³.
pub const AMU_PER_A3_TO_G_PER_CM3: f64 = 1.6605402;
/// Pressure written to control files when the ensemble does not fix it.
pub const DEFAULT_PRESSURE_BAR: f64 = 1.01325;
/// PME grid head-room multiplier for ensembles whose volume fluctuates.
pub const PME_VOLUME_CHANGE_SCALE: f64 = 1.3;

/// Ensemble simulated by the hybrid workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimulationType {
    /// Gibbs ensemble, two boxes
    #[serde(rename = "GEMC")]
    Gemc,
    /// Grand canonical ensemble, box 1 is an MC-only reservoir
    #[serde(rename = "GCMC")]
    Gcmc,
    /// Isobaric-isothermal, single box
    #[serde(rename = "NPT")]
    Npt,
    /// Canonical, single box
    #[serde(rename = "NVT")]
    Nvt,
}

impl SimulationType {
    /// Label used in binary and template file names (`GOMC_CPU_NPT`, `GOMC_NPT.conf`).
    pub fn label(&self) -> &'static str {
        match self {
            SimulationType::Gemc => "GEMC",
            SimulationType::Gcmc => "GCMC",
            SimulationType::Npt => "NPT",
            SimulationType::Nvt => "NVT",
        }
    }

    /// Whether the box volume changes during the run (drives PME head-room).
    pub fn volume_fluctuates(&self) -> bool {
        matches!(self, SimulationType::Gemc | SimulationType::Npt)
    }

    /// Whether GOMC does not report a meaningful volume for box 0.
    pub fn fixed_volume(&self) -> bool {
        matches!(self, SimulationType::Gcmc | SimulationType::Nvt)
    }
}

impl std::fmt::Display for SimulationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// GOMC build to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComputeDevice {
    /// CPU build
    #[serde(rename = "CPU")]
    Cpu,
    /// GPU build
    #[serde(rename = "GPU")]
    Gpu,
}

impl ComputeDevice {
    /// Label used in the GOMC binary name.
    pub fn label(&self) -> &'static str {
        match self {
            ComputeDevice::Cpu => "CPU",
            ComputeDevice::Gpu => "GPU",
        }
    }
}

/// How the GCMC reservoir is specified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChemPotMode {
    /// Chemical potential in K
    ChemPot,
    /// Fugacity in bar
    Fugacity,
}

impl ChemPotMode {
    /// GOMC control-file keyword.
    pub fn keyword(&self) -> &'static str {
        match self {
            ChemPotMode::ChemPot => "ChemPot",
            ChemPotMode::Fugacity => "Fugacity",
        }
    }
}

/// Launch order of the two NAMD boxes in GEMC with two MD boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamdSimOrder {
    /// Box 0 then box 1, each with all cores
    #[default]
    Series,
    /// Both boxes at once, each with its own cores
    Parallel,
}

impl NamdSimOrder {
    /// Parses a CLI value; returns `None` for anything but `series`/`parallel`.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "series" => Some(NamdSimOrder::Series),
            "parallel" => Some(NamdSimOrder::Parallel),
            _ => None,
        }
    }
}

impl std::fmt::Display for NamdSimOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NamdSimOrder::Series => f.write_str("series"),
            NamdSimOrder::Parallel => f.write_str("parallel"),
        }
    }
}

/// Optional per-axis overrides, as given in `set_dims_box_N_list`/`set_angle_box_N_list`.
pub type AxisOverrides = [Option<f64>; 3];

/// Validated configuration of one hybrid run.
///
/// Loaded once with [`SimulationConfig::load`] and never mutated afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Number of NAMD+GOMC cycles to reach
    #[serde(rename = "total_cycles_namd_gomc_sims")]
    pub total_cycles: u64,
    /// Cycle to start (or resume) at
    #[serde(rename = "starting_at_cycle_namd_gomc_sims")]
    pub starting_cycle: u64,
    /// GOMC build flavour
    #[serde(rename = "gomc_use_CPU_or_GPU")]
    pub gomc_device: ComputeDevice,
    /// Ensemble
    pub simulation_type: SimulationType,
    /// GEMC only: simulate box 1 with GOMC alone
    pub only_use_box_0_for_namd_for_gemc: bool,
    /// Cores for box 0
    pub no_core_box_0: u32,
    /// Cores for box 1 (GEMC with two NAMD boxes)
    #[serde(default)]
    pub no_core_box_1: u32,
    /// Temperature in K
    pub simulation_temp_k: f64,
    /// Pressure in bar, required for NPT
    #[serde(default)]
    pub simulation_pressure_bar: Option<f64>,
    /// GCMC reservoir mode
    #[serde(rename = "GCMC_ChemPot_or_Fugacity", default)]
    pub gcmc_chempot_mode: Option<ChemPotMode>,
    /// GCMC reservoir values keyed by residue name
    #[serde(rename = "GCMC_ChemPot_or_Fugacity_dict", default)]
    pub gcmc_chempot_values: Option<BTreeMap<String, f64>>,
    /// GOMC steps per cycle
    pub gomc_run_steps: u64,
    /// NAMD steps per cycle
    pub namd_run_steps: u64,
    /// Minimization length as a multiple of `namd_run_steps`
    #[serde(default)]
    pub namd_minimize_mult_scalar: u64,
    /// Box 0 dimension overrides in Å
    #[serde(rename = "set_dims_box_0_list", default)]
    pub set_dims_box_0: Option<AxisOverrides>,
    /// Box 1 dimension overrides in Å
    #[serde(rename = "set_dims_box_1_list", default)]
    pub set_dims_box_1: Option<AxisOverrides>,
    /// Box 0 angle overrides in degrees
    #[serde(rename = "set_angle_box_0_list", default)]
    pub set_angle_box_0: Option<AxisOverrides>,
    /// Box 1 angle overrides in degrees
    #[serde(rename = "set_angle_box_1_list", default)]
    pub set_angle_box_1: Option<AxisOverrides>,
    /// GOMC force-field files
    pub starting_ff_file_list_gomc: Vec<String>,
    /// NAMD force-field files
    pub starting_ff_file_list_namd: Vec<String>,
    /// Starting structure of box 0
    pub starting_pdb_box_0_file: String,
    /// Starting topology of box 0
    pub starting_psf_box_0_file: String,
    /// Starting structure of box 1 (GEMC/GCMC)
    #[serde(default)]
    pub starting_pdb_box_1_file: Option<String>,
    /// Starting topology of box 1 (GEMC/GCMC)
    #[serde(default)]
    pub starting_psf_box_1_file: Option<String>,
    /// Directory holding `namd2`, relative to the working directory
    pub namd2_bin_directory: String,
    /// Directory holding the `GOMC_*` binaries, relative to the working directory
    pub gomc_bin_directory: String,
}

impl SimulationConfig {
    /// Reads and validates a JSON configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`HybridError::Configuration`] when the file is not valid JSON,
    /// a required key is missing, or a value fails validation.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            HybridError::Configuration(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&content)
    }

    /// Parses and validates configuration JSON.
    pub fn from_json_str(content: &str) -> Result<Self> {
        let config: SimulationConfig = serde_json::from_str(content)
            .map_err(|e| HybridError::Configuration(format!("invalid configuration JSON: {}", e)))?;
        validation::validate_config(&config)?;
        Ok(config)
    }

    /// First `run_no` executed by this invocation.
    pub fn starting_run(&self) -> u64 {
        2 * self.starting_cycle
    }

    /// One past the last `run_no`.
    pub fn total_runs(&self) -> u64 {
        2 * self.total_cycles
    }

    /// Whether box 1 is simulated by NAMD as well as GOMC.
    pub fn has_md_box_1(&self) -> bool {
        self.simulation_type == SimulationType::Gemc && !self.only_use_box_0_for_namd_for_gemc
    }

    /// Whether the ensemble has a second box at all.
    pub fn has_box_1(&self) -> bool {
        matches!(self.simulation_type, SimulationType::Gemc | SimulationType::Gcmc)
    }

    /// Whether box 1 is only ever simulated by GOMC.
    pub fn box_1_mc_only(&self) -> bool {
        self.has_box_1() && !self.has_md_box_1()
    }

    /// Boxes NAMD runs each MD turn.
    pub fn md_boxes(&self) -> Vec<usize> {
        if self.has_md_box_1() {
            vec![0, 1]
        } else {
            vec![0]
        }
    }

    /// Boxes GOMC simulates each MC turn.
    pub fn mc_boxes(&self) -> Vec<usize> {
        if self.has_box_1() {
            vec![0, 1]
        } else {
            vec![0]
        }
    }

    /// Boxes with `ENER_N`/`STAT_N` lines in the GOMC console log.
    ///
    /// The GCMC reservoir box has no energies, so only GEMC reports box 1.
    pub fn mc_log_boxes(&self) -> Vec<usize> {
        if self.simulation_type == SimulationType::Gemc {
            vec![0, 1]
        } else {
            vec![0]
        }
    }

    /// Pressure written into control files.
    pub fn pressure_bar(&self) -> f64 {
        match self.simulation_type {
            SimulationType::Npt => self.simulation_pressure_bar.unwrap_or(DEFAULT_PRESSURE_BAR),
            _ => DEFAULT_PRESSURE_BAR,
        }
    }

    /// Cores used by every process in series mode, and always by GOMC.
    pub fn total_cores(&self) -> u32 {
        if self.has_md_box_1() {
            self.no_core_box_0 + self.no_core_box_1
        } else {
            self.no_core_box_0
        }
    }

    /// Cores given to the NAMD process of `box_index`.
    pub fn namd_cores(&self, box_index: usize, order: NamdSimOrder) -> u32 {
        match (order, self.has_md_box_1()) {
            (NamdSimOrder::Parallel, true) if box_index == 1 => self.no_core_box_1,
            (NamdSimOrder::Parallel, true) => self.no_core_box_0,
            _ => self.total_cores(),
        }
    }

    /// Minimization steps of the first NAMD turn.
    pub fn namd_minimize_steps(&self) -> u64 {
        self.namd_run_steps * self.namd_minimize_mult_scalar
    }

    /// Restart, DCD and XST output frequency for NAMD.
    pub fn namd_rst_dcd_xst_steps(&self) -> u64 {
        self.namd_run_steps
    }

    /// Console block-average frequency for NAMD energies and pressure.
    pub fn namd_console_blkavg_steps(&self) -> u64 {
        self.namd_run_steps
    }

    /// Restart/checkpoint frequency for GOMC.
    pub fn gomc_rst_coor_ckpoint_steps(&self) -> u64 {
        self.gomc_run_steps
    }

    /// Console block-average and histogram output frequency for GOMC.
    pub fn gomc_console_blkavg_hist_steps(&self) -> u64 {
        self.gomc_run_steps
    }

    /// Histogram sampling frequency for GOMC, at most 500.
    pub fn gomc_hist_sample_steps(&self) -> u64 {
        (self.gomc_run_steps / 10).min(500)
    }

    /// GOMC move-adjustment frequency.
    pub fn gomc_adj_steps(&self) -> u64 {
        (self.gomc_run_steps / 10).clamp(1, 1_000_000)
    }

    /// GOMC equilibration length.
    pub fn gomc_equilibration_steps(&self) -> u64 {
        (self.gomc_run_steps / 10).max(1)
    }

    /// Dimension overrides for a box, all `None` when unset.
    pub fn dims_override(&self, box_index: usize) -> AxisOverrides {
        let set = if box_index == 0 {
            self.set_dims_box_0
        } else {
            self.set_dims_box_1
        };
        set.unwrap_or([None, None, None])
    }

    /// Angle overrides for a box, all `None` when unset.
    pub fn angle_override(&self, box_index: usize) -> AxisOverrides {
        let set = if box_index == 0 {
            self.set_angle_box_0
        } else {
            self.set_angle_box_1
        };
        set.unwrap_or([None, None, None])
    }

    /// Starting PDB of a box, relative to the working directory.
    pub fn starting_pdb(&self, box_index: usize) -> Option<&str> {
        if box_index == 0 {
            Some(&self.starting_pdb_box_0_file)
        } else {
            self.starting_pdb_box_1_file.as_deref()
        }
    }

    /// Starting PSF of a box, relative to the working directory.
    pub fn starting_psf(&self, box_index: usize) -> Option<&str> {
        if box_index == 0 {
            Some(&self.starting_psf_box_0_file)
        } else {
            self.starting_psf_box_1_file.as_deref()
        }
    }

    /// Absolute path of the `namd2` binary.
    pub fn namd_binary(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(&self.namd2_bin_directory).join("namd2")
    }

    /// Absolute path of the GOMC binary for this ensemble and device.
    pub fn gomc_binary(&self, work_dir: &Path) -> PathBuf {
        work_dir.join(&self.gomc_bin_directory).join(format!(
            "GOMC_{}_{}",
            self.gomc_device.label(),
            self.simulation_type.label()
        ))
    }

    /// PME grid multiplier for the first NAMD turn.
    pub fn pme_scale(&self) -> f64 {
        if self.simulation_type.volume_fluctuates() {
            PME_VOLUME_CHANGE_SCALE
        } else {
            1.0
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn npt_json() -> String {
        r#"{
            "total_cycles_namd_gomc_sims": 3,
            "starting_at_cycle_namd_gomc_sims": 0,
            "gomc_use_CPU_or_GPU": "CPU",
            "simulation_type": "NPT",
            "only_use_box_0_for_namd_for_gemc": true,
            "no_core_box_0": 4,
            "no_core_box_1": 0,
            "simulation_temp_k": 250,
            "simulation_pressure_bar": 1.0,
            "gomc_run_steps": 1000,
            "namd_run_steps": 2000,
            "namd_minimize_mult_scalar": 1,
            "set_dims_box_0_list": [25, null, 25],
            "set_dims_box_1_list": null,
            "set_angle_box_0_list": [90, 90, 90],
            "set_angle_box_1_list": null,
            "starting_ff_file_list_gomc": ["ff/GOMC_FF.inp"],
            "starting_ff_file_list_namd": ["ff/NAMD_FF.inp"],
            "starting_pdb_box_0_file": "start/box_0.pdb",
            "starting_psf_box_0_file": "start/box_0.psf",
            "namd2_bin_directory": "bin/namd",
            "gomc_bin_directory": "bin/gomc"
        }"#
        .to_string()
    }

    #[test]
    fn test_load_npt_and_derived_steps() {
        let config = SimulationConfig::from_json_str(&npt_json()).unwrap();
        assert_eq!(config.simulation_type, SimulationType::Npt);
        assert_eq!(config.total_runs(), 6);
        assert_eq!(config.namd_minimize_steps(), 2000);
        assert_eq!(config.gomc_hist_sample_steps(), 100);
        assert_eq!(config.gomc_adj_steps(), 100);
        assert_eq!(config.pressure_bar(), 1.0);
        assert_eq!(config.dims_override(0), [Some(25.0), None, Some(25.0)]);
        assert_eq!(config.dims_override(1), [None, None, None]);
        assert_eq!(config.md_boxes(), vec![0]);
        assert_eq!(config.mc_boxes(), vec![0]);
        assert_eq!(config.mc_log_boxes(), vec![0]);
    }

    fn two_box_json(ensemble: &str) -> String {
        npt_json().replace("\"NPT\"", &format!("\"{}\"", ensemble)).replace(
            "\"starting_psf_box_0_file\": \"start/box_0.psf\",",
            "\"starting_psf_box_0_file\": \"start/box_0.psf\",
            \"starting_pdb_box_1_file\": \"start/box_1.pdb\",
            \"starting_psf_box_1_file\": \"start/box_1.psf\",
            \"GCMC_ChemPot_or_Fugacity\": \"ChemPot\",
            \"GCMC_ChemPot_or_Fugacity_dict\": {\"TIP3\": -4000},",
        )
    }

    #[test]
    fn test_gcmc_reservoir_has_no_console_samples() {
        let config = SimulationConfig::from_json_str(&two_box_json("GCMC")).unwrap();
        assert_eq!(config.mc_boxes(), vec![0, 1]);
        assert_eq!(config.mc_log_boxes(), vec![0]);
        assert!(config.box_1_mc_only());

        let config = SimulationConfig::from_json_str(&two_box_json("GEMC")).unwrap();
        assert_eq!(config.mc_boxes(), vec![0, 1]);
        assert_eq!(config.mc_log_boxes(), vec![0, 1]);
    }

    #[test]
    fn test_binaries_follow_naming_convention() {
        let config = SimulationConfig::from_json_str(&npt_json()).unwrap();
        let work = Path::new("/work");
        assert_eq!(config.namd_binary(work), PathBuf::from("/work/bin/namd/namd2"));
        assert_eq!(
            config.gomc_binary(work),
            PathBuf::from("/work/bin/gomc/GOMC_CPU_NPT")
        );
    }

    #[test]
    fn test_hist_sample_steps_capped() {
        let json = npt_json().replace("\"gomc_run_steps\": 1000", "\"gomc_run_steps\": 100000");
        let config = SimulationConfig::from_json_str(&json).unwrap();
        assert_eq!(config.gomc_hist_sample_steps(), 500);
        assert_eq!(config.gomc_equilibration_steps(), 10000);
    }

    #[test]
    fn test_non_npt_pressure_defaults() {
        let json = npt_json().replace("\"NPT\"", "\"NVT\"");
        let config = SimulationConfig::from_json_str(&json).unwrap();
        assert_eq!(config.pressure_bar(), DEFAULT_PRESSURE_BAR);
        assert_eq!(config.pme_scale(), 1.0);
    }

    #[test]
    fn test_namd_order_parse() {
        assert_eq!(NamdSimOrder::parse("parallel"), Some(NamdSimOrder::Parallel));
        assert_eq!(NamdSimOrder::parse("series"), Some(NamdSimOrder::Series));
        assert_eq!(NamdSimOrder::parse("both"), None);
    }

    #[test]
    fn test_missing_key_is_configuration_error() {
        let json = npt_json().replace("\"namd_run_steps\": 2000,", "");
        let err = SimulationConfig::from_json_str(&json).unwrap_err();
        assert!(matches!(err, HybridError::Configuration(_)));
    }
}
