//! Run directory and file naming.
//!
//! Every turn writes into its own directory, named after the zero-padded
//! `run_no`. The directory layout is the persisted restart state: a resumed
//! run finds the previous turn's outputs by name alone.
//!
//! ```text
//! NAMD/0000000000_a/   MD turn 0, box 0
//! NAMD/0000000000_b/   MD turn 0, box 1 (GEMC with two MD boxes)
//! GOMC/0000000001/     MC turn 1, all boxes
//! NAMD/0000000002_a/   ...
//! ```
//!
//! # Example
//!
//! ```
//! use std::path::{Path, PathBuf};
//! use hybrid_mdmc::naming::RunNaming;
//!
//! let naming = RunNaming::new(Path::new("/work"), "NAMD", "GOMC");
//! assert_eq!(naming.namd_dir(8, 0), PathBuf::from("/work/NAMD/0000000008_a"));
//! assert_eq!(naming.namd_dir(8, 1), PathBuf::from("/work/NAMD/0000000008_b"));
//! assert_eq!(naming.gomc_dir(9), PathBuf::from("/work/GOMC/0000000009"));
//! ```

use std::path::{Path, PathBuf};

/// Control file written into every run directory.
pub const CONTROL_FILE: &str = "in.conf";
/// Engine console log captured in every run directory.
pub const LOG_FILE: &str = "out.dat";
/// JSON checkpoint written next to the configuration.
pub const CHECKPOINT_FILE: &str = "hybrid_checkpoint.json";
/// Prefix of the FFTW plan file NAMD writes in its run directory.
pub const FFTW_PREFIX: &str = "FFTW_NAMD";

/// Builds run directory and file paths from the working directory and the
/// NAMD/GOMC run roots.
#[derive(Debug, Clone)]
pub struct RunNaming {
    namd_root: PathBuf,
    gomc_root: PathBuf,
}

impl RunNaming {
    /// Creates the naming for `work_dir/<namd_runs>` and `work_dir/<gomc_runs>`.
    pub fn new(work_dir: &Path, namd_runs: &str, gomc_runs: &str) -> Self {
        Self {
            namd_root: work_dir.join(namd_runs),
            gomc_root: work_dir.join(gomc_runs),
        }
    }

    /// Root of the NAMD run directories.
    pub fn namd_root(&self) -> &Path {
        &self.namd_root
    }

    /// Root of the GOMC run directories.
    pub fn gomc_root(&self) -> &Path {
        &self.gomc_root
    }

    /// Ten-digit, zero-padded directory stem of a run.
    ///
    /// Format: `{run_no:010}`
    pub fn run_stem(run_no: u64) -> String {
        format!("{:010}", run_no)
    }

    /// NAMD directory of an MD turn: `_a` for box 0, `_b` for box 1.
    pub fn namd_dir(&self, run_no: u64, box_index: usize) -> PathBuf {
        let suffix = if box_index == 0 { "a" } else { "b" };
        self.namd_root
            .join(format!("{}_{}", Self::run_stem(run_no), suffix))
    }

    /// GOMC directory of an MC turn.
    pub fn gomc_dir(&self, run_no: u64) -> PathBuf {
        self.gomc_root.join(Self::run_stem(run_no))
    }

    /// MD directory of the very first turn, which holds the PME grid and FFTW plan.
    pub fn namd_run_0_dir(&self, box_index: usize) -> PathBuf {
        self.namd_dir(0, box_index)
    }

    /// Directories of the turns before a resume at `cycle`: MD run `2c-2` and
    /// MC run `2c-1`. `None` for cycle 0.
    pub fn resume_dirs(&self, cycle: u64, box_index: usize) -> Option<(PathBuf, PathBuf)> {
        if cycle == 0 {
            return None;
        }
        Some((
            self.namd_dir(2 * cycle - 2, box_index),
            self.gomc_dir(2 * cycle - 1),
        ))
    }

    /// Run log named after the starting cycle.
    ///
    /// Format: `NAMD_GOMC_started_at_cycle_No_{cycle}.log`
    pub fn run_log_name(start_cycle: u64) -> String {
        format!("NAMD_GOMC_started_at_cycle_No_{}.log", start_cycle)
    }
}

/// Files NAMD leaves in its run directory for the next turn.
pub mod namd_output {
    /// Restart coordinates
    pub const COOR: &str = "namdOut.restart.coor";
    /// Restart extended system (cell)
    pub const XSC: &str = "namdOut.restart.xsc";
    /// Restart velocities
    pub const VEL: &str = "namdOut.restart.vel";
}

/// Files GOMC leaves in its run directory for the next turn.
pub mod gomc_output {
    /// GOMC checkpoint file
    pub const CHECKPOINT: &str = "Output_data_restart.chk";

    /// `Output_data_BOX_{box}_restart.{ext}`
    pub fn restart(box_index: usize, ext: &str) -> String {
        format!("Output_data_BOX_{}_restart.{}", box_index, ext)
    }
}

/// Relative path from `base` to `target`, both absolute or both relative to
/// the same directory. Written into control files so a run directory can be
/// moved together with its siblings.
///
/// ```
/// use std::path::Path;
/// use hybrid_mdmc::naming::relative_path;
///
/// let rel = relative_path(Path::new("/w/GOMC/0000000001"), Path::new("/w/NAMD/0000000000_a"));
/// assert_eq!(rel, Path::new("../../NAMD/0000000000_a"));
/// ```
pub fn relative_path(target: &Path, base: &Path) -> PathBuf {
    let target: Vec<_> = target.components().collect();
    let base: Vec<_> = base.components().collect();
    let common = target
        .iter()
        .zip(&base)
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base.len() {
        rel.push("..");
    }
    for component in &target[common..] {
        rel.push(component.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    rel
}
