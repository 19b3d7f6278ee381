//! Checkpoint for resuming hybrid runs.
//!
//! The run directories already carry everything the engines need to restart.
//! What they do not carry is the driver's own state: where the global step
//! axis stands and which box geometry and PME grid were used. After every
//! completed cycle the orchestrator writes this state to
//! `hybrid_checkpoint.json`.
//!
//! On resume at cycle `c`, the checkpoint's global step is trusted only if
//! its last completed cycle is `c - 1`. Otherwise the step is reconstructed
//! from the per-cycle step counts.
//!
//! ```no_run
//! use hybrid_mdmc::checkpoint::Checkpoint;
//! use std::path::Path;
//!
//! let checkpoint = Checkpoint::load(Path::new("hybrid_checkpoint.json"))?;
//! println!("last completed cycle: {}", checkpoint.last_completed_cycle);
//! # Ok::<(), hybrid_mdmc::error::HybridError>(())
//! ```

use crate::config::{SimulationConfig, SimulationType};
use crate::error::Result;
use crate::geometry::BoxGeometry;
use crate::rebase::GlobalStepCounter;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Per-box state at the end of a cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoxCheckpoint {
    /// Box index
    pub box_index: usize,
    /// Geometry handed to the next MD turn, if known
    pub geometry: Option<BoxGeometry>,
    /// PME grid used by NAMD for this box
    pub pme_grid: Option<[u64; 3]>,
}

/// Driver state after a completed cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Checkpoint {
    /// Ensemble of the run that wrote the checkpoint
    pub simulation_type: SimulationType,
    /// Last cycle whose MC turn finished
    pub last_completed_cycle: u64,
    /// Global step offset after that MC turn
    pub global_step: i64,
    /// Per-box state
    pub boxes: Vec<BoxCheckpoint>,
}

impl Checkpoint {
    /// Save checkpoint to a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the file cannot be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Load checkpoint from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Loads the checkpoint if the file exists; an unreadable one is ignored
    /// with a warning.
    pub fn load_optional(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        match Self::load(path) {
            Ok(checkpoint) => Some(checkpoint),
            Err(e) => {
                warn!("Ignoring unreadable checkpoint {}: {}", path.display(), e);
                None
            }
        }
    }

    /// Per-box state, if recorded.
    pub fn box_state(&self, box_index: usize) -> Option<&BoxCheckpoint> {
        self.boxes.iter().find(|b| b.box_index == box_index)
    }
}

/// Global step counter for a run starting at `config.starting_cycle`.
///
/// Cycle 0 starts at step 0. Later cycles use the checkpoint when it ends
/// exactly one cycle earlier and matches the ensemble, and the analytic
/// `(namd_run_steps + gomc_run_steps) * cycle` otherwise.
pub fn resume_counter(config: &SimulationConfig, checkpoint: Option<&Checkpoint>) -> GlobalStepCounter {
    let cycle = config.starting_cycle;
    if cycle == 0 {
        return GlobalStepCounter::new(0);
    }
    let analytic = GlobalStepCounter::analytic(cycle, config.namd_run_steps, config.gomc_run_steps);
    match checkpoint {
        Some(cp)
            if cp.last_completed_cycle + 1 == cycle
                && cp.simulation_type == config.simulation_type =>
        {
            info!(
                "Resuming at global step {} from checkpoint (analytic value {})",
                cp.global_step,
                analytic.offset()
            );
            GlobalStepCounter::new(cp.global_step)
        }
        Some(cp) => {
            warn!(
                "Checkpoint ends at cycle {} but the run resumes at cycle {}; using analytic global step {}",
                cp.last_completed_cycle,
                cycle,
                analytic.offset()
            );
            analytic
        }
        None => analytic,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::tests::npt_json;
    use tempfile::tempdir;

    fn sample() -> Checkpoint {
        Checkpoint {
            simulation_type: SimulationType::Npt,
            last_completed_cycle: 1,
            global_step: 6100,
            boxes: vec![BoxCheckpoint {
                box_index: 0,
                geometry: Some(BoxGeometry::centered([25.0, 26.0, 27.0])),
                pme_grid: Some([36, 36, 36]),
            }],
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hybrid_checkpoint.json");
        sample().save(&path).unwrap();
        let loaded = Checkpoint::load(&path).unwrap();
        assert_eq!(loaded, sample());
        assert_eq!(loaded.box_state(0).unwrap().pme_grid, Some([36, 36, 36]));
        assert!(loaded.box_state(1).is_none());
    }

    #[test]
    fn test_resume_uses_matching_checkpoint() {
        let json = npt_json().replace(
            "\"starting_at_cycle_namd_gomc_sims\": 0",
            "\"starting_at_cycle_namd_gomc_sims\": 2",
        );
        let config = SimulationConfig::from_json_str(&json).unwrap();
        assert_eq!(resume_counter(&config, Some(&sample())).offset(), 6100);

        let mut stale = sample();
        stale.last_completed_cycle = 0;
        assert_eq!(resume_counter(&config, Some(&stale)).offset(), 6000);
        assert_eq!(resume_counter(&config, None).offset(), 6000);
    }

    #[test]
    fn test_corrupt_checkpoint_ignored() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("hybrid_checkpoint.json");
        fs::write(&path, "{ not json").unwrap();
        assert!(Checkpoint::load_optional(&path).is_none());
        assert!(Checkpoint::load_optional(&dir.path().join("absent.json")).is_none());
    }
}
