//! Configuration validation for hybrid NAMD/GOMC runs.
//!
//! Checks the JSON configuration for values the engines cannot run with, and
//! for combinations that only make sense in some ensembles. Every failure
//! carries a message and, where there is an obvious fix, a suggestion.
//! Validation runs before any directory is created or engine launched.

use crate::config::{ChemPotMode, SimulationConfig, SimulationType};
use crate::error::HybridError;
use log::warn;
use std::path::Path;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation failure with optional guidance.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Error category for programmatic handling
    pub category: ErrorCategory,
    /// Human-readable error message
    pub message: String,
    /// Optional suggestion for fixing the issue
    pub suggestion: Option<String>,
}

/// Categories of validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorCategory {
    /// A value outside its allowed range
    InvalidValue,
    /// A key required by the selected ensemble is missing
    MissingForEnsemble,
    /// A non-orthogonal box was requested
    UnsupportedGeometry,
    /// A referenced input file does not exist
    MissingFile,
}

impl ValidationError {
    fn new(category: ErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            message: message.into(),
            suggestion: None,
        }
    }

    fn suggest(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)?;
        if let Some(suggestion) = &self.suggestion {
            write!(f, "\n\nSuggestion: {}", suggestion)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

impl From<ValidationError> for HybridError {
    fn from(e: ValidationError) -> Self {
        HybridError::Configuration(e.to_string())
    }
}

/// Validates a freshly deserialized configuration.
///
/// # Errors
///
/// Returns the first [`ValidationError`] found.
pub fn validate_config(config: &SimulationConfig) -> ValidationResult<()> {
    validate_cycles(config)?;
    validate_thermodynamics(config)?;
    validate_cores(config)?;
    validate_chempot(config)?;
    validate_box_overrides(config)?;
    validate_box_1_files(config)?;
    Ok(())
}

fn validate_cycles(config: &SimulationConfig) -> ValidationResult<()> {
    if config.starting_cycle > config.total_cycles {
        return Err(ValidationError::new(
            ErrorCategory::InvalidValue,
            format!(
                "starting_at_cycle_namd_gomc_sims ({}) is past total_cycles_namd_gomc_sims ({})",
                config.starting_cycle, config.total_cycles
            ),
        ));
    }
    if config.namd_run_steps == 0 || config.gomc_run_steps == 0 {
        return Err(ValidationError::new(
            ErrorCategory::InvalidValue,
            "namd_run_steps and gomc_run_steps must be greater than zero",
        ));
    }
    Ok(())
}

fn validate_thermodynamics(config: &SimulationConfig) -> ValidationResult<()> {
    if !(config.simulation_temp_k > 0.0) {
        return Err(ValidationError::new(
            ErrorCategory::InvalidValue,
            format!(
                "simulation_temp_k must be greater than zero, got {}",
                config.simulation_temp_k
            ),
        ));
    }
    if config.simulation_type == SimulationType::Npt {
        match config.simulation_pressure_bar {
            None => {
                return Err(ValidationError::new(
                    ErrorCategory::MissingForEnsemble,
                    "simulation_pressure_bar must be set for the NPT ensemble",
                )
                .suggest("Add \"simulation_pressure_bar\": 1.01325 or the target pressure in bar"))
            }
            Some(p) if p < 0.0 => {
                return Err(ValidationError::new(
                    ErrorCategory::InvalidValue,
                    format!("simulation_pressure_bar must be >= 0 for NPT, got {}", p),
                ))
            }
            Some(_) => {}
        }
    }
    Ok(())
}

fn validate_cores(config: &SimulationConfig) -> ValidationResult<()> {
    if config.no_core_box_0 == 0 {
        return Err(ValidationError::new(
            ErrorCategory::InvalidValue,
            "no_core_box_0 must be greater than zero",
        ));
    }
    if config.has_md_box_1() && config.no_core_box_1 == 0 {
        return Err(ValidationError::new(
            ErrorCategory::InvalidValue,
            "no_core_box_1 must be greater than zero when NAMD simulates both GEMC boxes",
        )
        .suggest("Set no_core_box_1, or set only_use_box_0_for_namd_for_gemc to true"));
    }
    if !config.has_md_box_1() && config.no_core_box_1 != 0 {
        warn!(
            "The {} cores listed for box 1 are not used; NAMD only runs box 0",
            config.no_core_box_1
        );
    }
    Ok(())
}

fn validate_chempot(config: &SimulationConfig) -> ValidationResult<()> {
    if config.simulation_type != SimulationType::Gcmc {
        return Ok(());
    }
    let mode = config.gcmc_chempot_mode.ok_or_else(|| {
        ValidationError::new(
            ErrorCategory::MissingForEnsemble,
            "GCMC_ChemPot_or_Fugacity must be \"ChemPot\" or \"Fugacity\" for GCMC",
        )
    })?;
    let values = config.gcmc_chempot_values.as_ref().ok_or_else(|| {
        ValidationError::new(
            ErrorCategory::MissingForEnsemble,
            "GCMC_ChemPot_or_Fugacity_dict is required for GCMC",
        )
        .suggest("Add a map of residue name to value, e.g. {\"TIP3\": -4000}")
    })?;
    if mode == ChemPotMode::Fugacity {
        if let Some((residue, value)) = values.iter().find(|(_, v)| **v < 0.0) {
            return Err(ValidationError::new(
                ErrorCategory::InvalidValue,
                format!(
                    "Fugacity for residue {} must be >= 0, got {}",
                    residue, value
                ),
            ));
        }
    }
    Ok(())
}

fn validate_box_overrides(config: &SimulationConfig) -> ValidationResult<()> {
    for box_index in 0..2 {
        for (axis, dim) in ["x", "y", "z"].iter().zip(config.dims_override(box_index)) {
            if let Some(d) = dim {
                if !(d > 0.0) {
                    return Err(ValidationError::new(
                        ErrorCategory::InvalidValue,
                        format!(
                            "set_dims_box_{}_list {}-dimension must be > 0, got {}",
                            box_index, axis, d
                        ),
                    ));
                }
            }
        }
        for angle in config.angle_override(box_index).iter().flatten() {
            if *angle != 90.0 {
                return Err(ValidationError::new(
                    ErrorCategory::UnsupportedGeometry,
                    format!(
                        "set_angle_box_{}_list contains {}; only orthogonal boxes are supported",
                        box_index, angle
                    ),
                )
                .suggest("Use null or 90 for every angle"));
            }
        }
    }
    Ok(())
}

fn validate_box_1_files(config: &SimulationConfig) -> ValidationResult<()> {
    if config.has_box_1()
        && (config.starting_pdb_box_1_file.is_none() || config.starting_psf_box_1_file.is_none())
    {
        return Err(ValidationError::new(
            ErrorCategory::MissingForEnsemble,
            format!(
                "starting_pdb_box_1_file and starting_psf_box_1_file are required for {}",
                config.simulation_type
            ),
        ));
    }
    Ok(())
}

/// Checks that every starting file referenced by the configuration exists.
///
/// Paths are resolved against `work_dir`. Only needed for a fresh start, a
/// resumed run takes its structures from earlier turns.
pub fn validate_input_files(config: &SimulationConfig, work_dir: &Path) -> ValidationResult<()> {
    let mut files: Vec<&str> = vec![
        &config.starting_pdb_box_0_file,
        &config.starting_psf_box_0_file,
    ];
    if config.has_box_1() {
        files.extend(config.starting_pdb(1));
        files.extend(config.starting_psf(1));
    }
    files.extend(config.starting_ff_file_list_namd.iter().map(String::as_str));
    files.extend(config.starting_ff_file_list_gomc.iter().map(String::as_str));

    for file in files {
        if !work_dir.join(file).exists() {
            return Err(ValidationError::new(
                ErrorCategory::MissingFile,
                format!("Input file {} does not exist", file),
            )
            .suggest(format!("Paths are relative to {}", work_dir.display())));
        }
    }
    Ok(())
}
