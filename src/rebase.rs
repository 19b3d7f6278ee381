//! Global step axis.
//!
//! Both engines restart their step counter at every turn. To put every
//! sample on one axis the orchestrator keeps a single offset that is added to
//! each local step and moved forward once a turn finishes.
//!
//! - MD turn: a `TCL: Minimizing for N steps` line pulls the offset back by
//!   `N` first, so minimization samples land on negative steps and the first
//!   dynamics sample lands on the pre-turn offset. After the turn the offset
//!   is the last rebased step.
//! - MC turn: after the turn the offset is the first rebased step.

use serde::{Deserialize, Serialize};

/// Maps an engine-local step onto the global axis.
pub fn rebase(local_step: i64, global_offset: i64) -> i64 {
    local_step + global_offset
}

/// Monotonic global step offset carried between turns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalStepCounter {
    offset: i64,
}

impl GlobalStepCounter {
    /// Counter starting at `offset`.
    pub fn new(offset: i64) -> Self {
        Self { offset }
    }

    /// Offset for a run resumed at `cycle`, assuming every earlier cycle ran
    /// `namd_run_steps` of dynamics and `gomc_run_steps` of Monte Carlo.
    pub fn analytic(cycle: u64, namd_run_steps: u64, gomc_run_steps: u64) -> Self {
        Self::new(((namd_run_steps + gomc_run_steps) * cycle) as i64)
    }

    /// Current offset.
    pub fn offset(&self) -> i64 {
        self.offset
    }

    /// Rebases a turn's local steps without moving the counter.
    pub fn rebase_steps(&self, local_steps: &[f64]) -> Vec<i64> {
        local_steps
            .iter()
            .map(|&s| rebase(s.round() as i64, self.offset))
            .collect()
    }

    /// Rebases the steps of an MD turn and moves the counter to the last one.
    ///
    /// `minimize_steps` comes from the turn's `TCL: Minimizing for N steps`
    /// line, if any.
    pub fn rebase_md_turn(&mut self, local_steps: &[f64], minimize_steps: Option<u64>) -> Vec<i64> {
        if let Some(n) = minimize_steps {
            self.offset -= n as i64;
        }
        let rebased = self.rebase_steps(local_steps);
        if let Some(&last) = rebased.last() {
            self.offset = last;
        }
        rebased
    }

    /// Moves the counter to the first rebased step of an MC turn.
    pub fn finish_mc_turn(&mut self, rebased: &[i64]) {
        if let Some(&first) = rebased.first() {
            self.offset = first;
        }
    }
}
