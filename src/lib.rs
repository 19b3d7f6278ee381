#![deny(missing_docs)]

//! hybrid-mdmc - Hybrid NAMD/GOMC Molecular Dynamics / Monte Carlo Driver
//!
//! hybrid-mdmc alternates two external simulation engines on the same
//! molecular system: NAMD propagates it with molecular dynamics, GOMC samples
//! it with Monte Carlo moves. Each engine resumes from the restart files the
//! other one wrote, so the combined trajectory explores configurations
//! neither engine reaches alone.
//!
//! # Overview
//!
//! A simulation is a sequence of cycles. Cycle `c` is two turns:
//!
//! ```text
//! run_no = 2c      MD turn   NAMD/<run_no>_a (and _b)   one process per MD box
//! run_no = 2c + 1  MC turn   GOMC/<run_no>              one process, every box
//! ```
//!
//! Between turns the driver:
//!
//! 1. carries the box geometry and restart files across the handoff
//! 2. checks that the potential and VDW + electrostatic energies agree across
//!    the handoff within tolerance
//! 3. rebases each engine's local step counter onto one global step axis
//!
//! # Ensembles
//!
//! | Type | Boxes | NAMD boxes | Box volume |
//! |------|-------|------------|------------|
//! | NPT  | 1 | 0 | fluctuates |
//! | NVT  | 1 | 0 | fixed |
//! | GEMC | 2 | 0, or 0 and 1 | fluctuates |
//! | GCMC | 2 (box 1 is the reservoir) | 0 | fixed |
//!
//! # Quick Start
//!
//! ```no_run
//! use hybrid_mdmc::config::SimulationConfig;
//! use hybrid_mdmc::orchestrator::Orchestrator;
//! use hybrid_mdmc::settings::SettingsManager;
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = SimulationConfig::load(Path::new("user_input_NAMD_GOMC.json"))?;
//!     let settings = SettingsManager::load()?;
//!     let summary = Orchestrator::new(&config, &settings, Path::new("."))?.run()?;
//!     println!("{} continuity failures", summary.continuity_failures());
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! - [`config`](config/index.html) - JSON simulation configuration
//! - [`validation`](validation/index.html) - Configuration checks
//! - [`settings`](settings/index.html) - INI program settings
//! - [`parser`](parser/index.html) - NAMD and GOMC console log parsing
//! - [`rebase`](rebase/index.html) - Global step axis
//! - [`units`](units/index.html) - K to kcal/mol and density conversion
//! - [`geometry`](geometry/index.html) - Box dimensions from PDB and XSC files
//! - [`template_generator`](template_generator/index.html) - Control-file rendering
//! - [`continuity`](continuity/index.html) - Energy checks across handoffs
//! - [`naming`](naming/index.html) - Run directory layout
//! - [`engine`](engine/index.html) - NAMD and GOMC subprocesses
//! - [`propagator`](propagator/index.html) - Per-turn restart and geometry handoff
//! - [`orchestrator`](orchestrator/index.html) - The cycle loop
//! - [`merge`](merge/index.html) - Combined MD/MC time series
//! - [`combine`](combine/index.html) - Data tables and the `combine` command
//! - [`checkpoint`](checkpoint/index.html) - Resume state
//! - [`io`](io/index.html) - Run log and table output
//! - [`help`](help/index.html) - Built-in help system

/// Resume state
pub mod checkpoint;
/// Per-box data tables and the `combine` command
pub mod combine;
/// JSON simulation configuration
pub mod config;
/// Energy checks across engine handoffs
pub mod continuity;
/// NAMD and GOMC subprocesses
pub mod engine;
/// Error types
pub mod error;
/// Box dimensions from PDB and XSC files
pub mod geometry;
/// Built-in help system
pub mod help;
/// Run log and table output
pub mod io;
/// Combined MD/MC time series
pub mod merge;
/// Run directory layout
pub mod naming;
/// The cycle loop
pub mod orchestrator;
/// NAMD and GOMC console log parsing
pub mod parser;
/// Per-turn restart and geometry handoff
pub mod propagator;
/// Global step axis
pub mod rebase;
/// Configuration management system
pub mod settings;
/// Control-file templates
pub mod template_generator;
/// K to kcal/mol and density conversion
pub mod units;
/// Configuration validation
pub mod validation;

pub use config::SimulationConfig;
pub use error::{HybridError, Result};
