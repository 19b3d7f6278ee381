//! Program settings for the hybrid NAMD/GOMC driver.
//!
//! The JSON file given with `-f` describes one simulation. Everything that is
//! about the installation rather than the simulation (where run directories
//! and templates live, how chatty logging is, the continuity tolerances,
//! how the two NAMD boxes are launched) lives in an INI settings file that is
//! loaded hierarchically:
//!
//! 1. Local configuration (`./hybrid_mdmc.cfg`)
//! 2. User configuration (`~/.config/hybrid_mdmc/hybrid_mdmc.cfg`)
//! 3. System configuration (`/etc/hybrid_mdmc/hybrid_mdmc.cfg`)
//! 4. Built-in defaults
//!
//! Files higher in the list override keys set by files lower in the list.
//!
//! # Configuration File Format
//!
//! ```ini
//! [paths]
//! namd_runs = NAMD
//! gomc_runs = GOMC
//! combined_data = combined_data
//! namd_template = required_data/config_files/NAMD.conf
//! gomc_template_dir = required_data/config_files
//!
//! [logging]
//! level = info
//! file_logging = true
//!
//! [continuity]
//! potential_tolerance = 0.005
//! vdw_elec_tolerance = 0.005
//! vdw_elec_absolute_kcal_mol = 0.5
//!
//! [run]
//! namd_sims_order = series
//! ```

use crate::config::{NamdSimOrder, SimulationType};
use configparser::ini::Ini;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Name of the settings file in every search location.
pub const SETTINGS_FILE_NAME: &str = "hybrid_mdmc.cfg";

/// Errors that can occur while loading settings.
#[derive(Error, Debug)]
pub enum SettingsError {
    /// I/O error when reading settings files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// INI parsing error
    #[error("INI parsing error: {0}")]
    IniParse(String),
    /// Invalid settings value
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}

type Section = HashMap<String, Option<String>>;

/// All program settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    /// Run directory and template locations
    pub paths: PathSettings,
    /// Logging configuration
    pub logging: LoggingSettings,
    /// Energy continuity tolerances
    pub continuity: ContinuitySettings,
    /// Launch behaviour
    pub run: RunSettings,
}

/// Locations of run directories and control-file templates, relative to the
/// working directory.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PathSettings {
    /// Root of the NAMD run directories (default: "NAMD")
    pub namd_runs: String,
    /// Root of the GOMC run directories (default: "GOMC")
    pub gomc_runs: String,
    /// Output directory of combined tables (default: "combined_data")
    pub combined_data: String,
    /// NAMD control-file template
    pub namd_template: String,
    /// Directory holding `GOMC_<ensemble>.conf` templates
    pub gomc_template_dir: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            namd_runs: "NAMD".to_string(),
            gomc_runs: "GOMC".to_string(),
            combined_data: "combined_data".to_string(),
            namd_template: "required_data/config_files/NAMD.conf".to_string(),
            gomc_template_dir: "required_data/config_files".to_string(),
        }
    }
}

/// Logging configuration settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level (default: "info")
    pub level: String,
    /// Write the persistent `NAMD_GOMC_started_at_cycle_No_<n>.log` run log (default: true)
    pub file_logging: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_logging: true,
        }
    }
}

/// Tolerances used when comparing energies across an engine handoff.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ContinuitySettings {
    /// Maximum relative error of the potential energy (default: 5e-3)
    pub potential_tolerance: f64,
    /// Maximum relative error of vdW + electrostatics (default: 5e-3)
    pub vdw_elec_tolerance: f64,
    /// Absolute vdW + electrostatics difference that still passes, kcal/mol (default: 0.5)
    pub vdw_elec_absolute_kcal_mol: f64,
}

impl Default for ContinuitySettings {
    fn default() -> Self {
        Self {
            potential_tolerance: 5e-3,
            vdw_elec_tolerance: 5e-3,
            vdw_elec_absolute_kcal_mol: 0.5,
        }
    }
}

/// Launch settings.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq)]
pub struct RunSettings {
    /// Order of the two NAMD boxes in GEMC (default: series)
    pub namd_sims_order: NamdSimOrder,
}

/// Loads and holds the active settings.
pub struct SettingsManager {
    settings: Settings,
    config_source: String,
}

impl SettingsManager {
    /// Loads settings from the standard locations.
    ///
    /// Searches `/etc/hybrid_mdmc/`, then `~/.config/hybrid_mdmc/`, then the
    /// current directory, each file overriding the keys it sets. A file that
    /// fails to parse is skipped with a warning.
    pub fn load() -> Result<Self, SettingsError> {
        let (settings, source) = Self::load_from_files()?;
        info!("Settings loaded from: {}", source);
        Ok(Self {
            settings,
            config_source: source,
        })
    }

    /// Loads a single settings file on top of the built-in defaults.
    pub fn from_file(path: &Path) -> Result<Self, SettingsError> {
        let settings = Self::load_config(path, &Settings::default())?;
        Ok(Self {
            settings,
            config_source: format!("file ({})", path.display()),
        })
    }

    /// Wraps already-built settings.
    pub fn with_settings(settings: Settings) -> Self {
        Self {
            settings,
            config_source: "in-memory settings".to_string(),
        }
    }

    /// Returns the source of the loaded settings.
    pub fn config_source(&self) -> &str {
        &self.config_source
    }

    /// Gets a reference to the settings.
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    /// Gets the path settings.
    pub fn paths(&self) -> &PathSettings {
        &self.settings.paths
    }

    /// Gets the logging settings.
    pub fn logging(&self) -> &LoggingSettings {
        &self.settings.logging
    }

    /// Gets the continuity tolerances.
    pub fn continuity(&self) -> &ContinuitySettings {
        &self.settings.continuity
    }

    /// Gets the launch settings.
    pub fn run(&self) -> &RunSettings {
        &self.settings.run
    }

    /// Overrides the NAMD launch order, e.g. from the command line.
    pub fn set_namd_sims_order(&mut self, order: NamdSimOrder) {
        self.settings.run.namd_sims_order = order;
    }

    /// GOMC template for an ensemble: `<gomc_template_dir>/GOMC_<ensemble>.conf`.
    ///
    /// # Examples
    ///
    /// ```
    /// use hybrid_mdmc::config::SimulationType;
    /// use hybrid_mdmc::settings::{Settings, SettingsManager};
    ///
    /// let manager = SettingsManager::with_settings(Settings::default());
    /// assert_eq!(
    ///     manager.gomc_template(SimulationType::Gemc),
    ///     std::path::PathBuf::from("required_data/config_files/GOMC_GEMC.conf")
    /// );
    /// ```
    pub fn gomc_template(&self, simulation_type: SimulationType) -> PathBuf {
        Path::new(&self.settings.paths.gomc_template_dir)
            .join(format!("GOMC_{}.conf", simulation_type.label()))
    }

    fn load_from_files() -> Result<(Settings, String), SettingsError> {
        let mut settings = Settings::default();
        let mut config_source = "built-in defaults".to_string();

        let candidates = [
            ("system", Self::get_system_config_path()),
            ("user", Self::get_user_config_path()),
            ("local", Some(PathBuf::from(SETTINGS_FILE_NAME))),
        ];

        for (kind, path) in candidates {
            let Some(path) = path else { continue };
            if !path.exists() {
                continue;
            }
            match Self::load_config(&path, &settings) {
                Ok(layered) => {
                    settings = layered;
                    config_source = format!("{} config ({})", kind, path.display());
                    debug!("Loaded {} settings from: {}", kind, path.display());
                }
                Err(e) => {
                    warn!(
                        "Failed to load {} settings from {}: {}",
                        kind,
                        path.display(),
                        e
                    );
                }
            }
        }

        Ok((settings, config_source))
    }

    /// Parses one INI file, starting from `base` so unset keys keep their value.
    fn load_config(path: &Path, base: &Settings) -> Result<Settings, SettingsError> {
        let content = fs::read_to_string(path)?;
        let mut ini = Ini::new();
        ini.read(content)
            .map_err(|e| SettingsError::IniParse(format!("Failed to parse INI: {}", e)))?;

        let mut settings = base.clone();
        let map = ini.get_map_ref();

        if let Some(section) = map.get("paths") {
            Self::parse_paths(section, &mut settings.paths);
        }
        if let Some(section) = map.get("logging") {
            Self::parse_logging(section, &mut settings.logging)?;
        }
        if let Some(section) = map.get("continuity") {
            Self::parse_continuity(section, &mut settings.continuity)?;
        }
        if let Some(section) = map.get("run") {
            Self::parse_run(section, &mut settings.run)?;
        }

        Ok(settings)
    }

    fn parse_paths(section: &Section, paths: &mut PathSettings) {
        let fields: [(&str, &mut String); 5] = [
            ("namd_runs", &mut paths.namd_runs),
            ("gomc_runs", &mut paths.gomc_runs),
            ("combined_data", &mut paths.combined_data),
            ("namd_template", &mut paths.namd_template),
            ("gomc_template_dir", &mut paths.gomc_template_dir),
        ];
        for (key, field) in fields {
            if let Some(Some(value)) = section.get(key) {
                if !value.is_empty() {
                    *field = value.clone();
                }
            }
        }
    }

    fn parse_logging(section: &Section, logging: &mut LoggingSettings) -> Result<(), SettingsError> {
        if let Some(Some(level)) = section.get("level") {
            logging.level = level.to_lowercase();
        }
        if let Some(Some(file_logging)) = section.get("file_logging") {
            logging.file_logging = file_logging.parse().map_err(|_| {
                SettingsError::InvalidValue(format!("Invalid file_logging value: {}", file_logging))
            })?;
        }
        Ok(())
    }

    fn parse_continuity(
        section: &Section,
        continuity: &mut ContinuitySettings,
    ) -> Result<(), SettingsError> {
        let fields: [(&str, &mut f64); 3] = [
            ("potential_tolerance", &mut continuity.potential_tolerance),
            ("vdw_elec_tolerance", &mut continuity.vdw_elec_tolerance),
            (
                "vdw_elec_absolute_kcal_mol",
                &mut continuity.vdw_elec_absolute_kcal_mol,
            ),
        ];
        for (key, field) in fields {
            if let Some(Some(value)) = section.get(key) {
                let parsed: f64 = value.parse().map_err(|_| {
                    SettingsError::InvalidValue(format!("Invalid {}: {}", key, value))
                })?;
                if parsed < 0.0 {
                    return Err(SettingsError::InvalidValue(format!(
                        "{} must be >= 0, got {}",
                        key, parsed
                    )));
                }
                *field = parsed;
            }
        }
        Ok(())
    }

    fn parse_run(section: &Section, run: &mut RunSettings) -> Result<(), SettingsError> {
        if let Some(Some(order)) = section.get("namd_sims_order") {
            run.namd_sims_order = NamdSimOrder::parse(order).ok_or_else(|| {
                SettingsError::InvalidValue(format!(
                    "Invalid namd_sims_order: {} (expected series or parallel)",
                    order
                ))
            })?;
        }
        Ok(())
    }

    fn get_system_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            Some(PathBuf::from("/etc/hybrid_mdmc").join(SETTINGS_FILE_NAME))
        }
        #[cfg(windows)]
        {
            std::env::var("PROGRAMDATA")
                .ok()
                .map(|pd| PathBuf::from(pd).join("hybrid_mdmc").join(SETTINGS_FILE_NAME))
        }
    }

    fn get_user_config_path() -> Option<PathBuf> {
        #[cfg(unix)]
        {
            std::env::var("HOME").ok().map(|home| {
                PathBuf::from(home)
                    .join(".config")
                    .join("hybrid_mdmc")
                    .join(SETTINGS_FILE_NAME)
            })
        }
        #[cfg(windows)]
        {
            std::env::var("APPDATA")
                .ok()
                .map(|appdata| PathBuf::from(appdata).join("hybrid_mdmc").join(SETTINGS_FILE_NAME))
        }
    }
}

impl SettingsManager {
    /// Writes a commented settings template with every key at its default.
    ///
    /// # Arguments
    ///
    /// * `path` - Where to write the template
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use hybrid_mdmc::settings::SettingsManager;
    /// use std::path::Path;
    ///
    /// SettingsManager::create_template(Path::new("hybrid_mdmc.cfg")).unwrap();
    /// ```
    pub fn create_template(path: &Path) -> Result<(), SettingsError> {
        fs::write(path, Self::generate_template_content())?;
        info!("Created settings template at: {}", path.display());
        Ok(())
    }

    fn generate_template_content() -> String {
        let defaults = Settings::default();
        format!(
            r#"# hybrid-mdmc settings file
#
# Installation-level settings for the NAMD/GOMC hybrid driver. The simulation
# itself is described by the JSON file passed with -f.
#
# Files are loaded in this order, later files overriding earlier ones:
#
# 1. /etc/hybrid_mdmc/hybrid_mdmc.cfg
# 2. ~/.config/hybrid_mdmc/hybrid_mdmc.cfg
# 3. ./hybrid_mdmc.cfg
#
# Missing sections or keys keep the built-in defaults shown below.

[paths]
# Root directory of the NAMD runs (one subdirectory per run and box)
namd_runs = {}

# Root directory of the GOMC runs (one subdirectory per run)
gomc_runs = {}

# Where the combine step writes its tables
combined_data = {}

# NAMD control-file template
namd_template = {}

# Directory with GOMC_<GEMC|GCMC|NPT|NVT>.conf templates
gomc_template_dir = {}

[logging]
# Log level: debug, info, warn, error
level = {}

# Write NAMD_GOMC_started_at_cycle_No_<n>.log next to the JSON file
file_logging = {}

[continuity]
# Relative potential energy error allowed across an engine handoff
potential_tolerance = {}

# Relative vdW + electrostatic error allowed across an engine handoff
vdw_elec_tolerance = {}

# Absolute vdW + electrostatic difference (kcal/mol) that still passes
vdw_elec_absolute_kcal_mol = {}

[run]
# GEMC with both boxes in NAMD: run the boxes in series (all cores each)
# or in parallel (no_core_box_0 and no_core_box_1 cores)
namd_sims_order = {}
"#,
            defaults.paths.namd_runs,
            defaults.paths.gomc_runs,
            defaults.paths.combined_data,
            defaults.paths.namd_template,
            defaults.paths.gomc_template_dir,
            defaults.logging.level,
            defaults.logging.file_logging,
            defaults.continuity.potential_tolerance,
            defaults.continuity.vdw_elec_tolerance,
            defaults.continuity.vdw_elec_absolute_kcal_mol,
            defaults.run.namd_sims_order,
        )
    }
}
