//! Energy continuity across engine handoffs.
//!
//! The last sample of one engine and the first sample of the next describe
//! the same configuration, so their energies should agree. A disagreement
//! usually means the two force fields or cutoffs differ. It never stops the
//! run: each handoff is classified and logged.

use crate::settings::ContinuitySettings;
use std::fmt;

/// Outcome of one comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// Relative error within tolerance
    Passed,
    /// Relative error too large (or undefined) but absolute difference within tolerance
    PassedAbsolute,
    /// Neither tolerance met
    Failed,
}

impl Classification {
    /// Whether the comparison passed either way.
    pub fn passed(&self) -> bool {
        !matches!(self, Classification::Failed)
    }
}

/// Comparison of one energy quantity across a handoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantityCheck {
    /// Last value of the earlier turn
    pub final_prev: f64,
    /// First value of the later turn
    pub initial_next: f64,
    /// `|final - initial| / |final|`; `None` when undefined
    pub relative_error: Option<f64>,
    /// `|final - initial|`
    pub absolute_difference: f64,
    /// Outcome
    pub classification: Classification,
}

/// Both energy checks for one box at one handoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnergyContinuityCheck {
    /// Box index
    pub box_index: usize,
    /// Run that produced the final values
    pub from_run: u64,
    /// Run that produced the initial values
    pub to_run: u64,
    /// Potential energy comparison
    pub potential: QuantityCheck,
    /// vdW + electrostatic comparison
    pub vdw_elec: QuantityCheck,
}

fn relative_error(final_prev: f64, initial_next: f64) -> Option<f64> {
    let diff = (final_prev - initial_next).abs();
    if final_prev == 0.0 {
        if initial_next == 0.0 {
            Some(0.0)
        } else {
            None
        }
    } else {
        Some(diff / final_prev.abs())
    }
}

fn compare(final_prev: f64, initial_next: f64, tolerance: f64, absolute: Option<f64>) -> QuantityCheck {
    let rel = relative_error(final_prev, initial_next);
    let absolute_difference = (final_prev - initial_next).abs();
    let classification = match (rel, absolute) {
        (Some(r), _) if r <= tolerance => Classification::Passed,
        (_, Some(limit)) if absolute_difference <= limit => Classification::PassedAbsolute,
        _ => Classification::Failed,
    };
    QuantityCheck {
        final_prev,
        initial_next,
        relative_error: rel,
        absolute_difference,
        classification,
    }
}

/// Compares the energies on both sides of the handoff into `run_no`.
///
/// The potential energy only has a relative tolerance. vdW + electrostatics
/// also pass when the absolute difference is small, since that sum is often
/// close to zero in dilute boxes.
///
/// # Examples
///
/// ```
/// use hybrid_mdmc::continuity::{check, Classification};
/// use hybrid_mdmc::settings::ContinuitySettings;
///
/// let tol = ContinuitySettings::default();
/// let ok = check(100.0, 100.5, -10.0, -10.0, 3, 0, &tol);
/// assert_eq!(ok.potential.classification, Classification::Passed);
/// let bad = check(100.0, 100.51, -10.0, -10.0, 3, 0, &tol);
/// assert_eq!(bad.potential.classification, Classification::Failed);
/// ```
pub fn check(
    final_prev: f64,
    initial_next: f64,
    final_prev_vdw_elec: f64,
    initial_next_vdw_elec: f64,
    run_no: u64,
    box_index: usize,
    tolerances: &ContinuitySettings,
) -> EnergyContinuityCheck {
    EnergyContinuityCheck {
        box_index,
        from_run: run_no.saturating_sub(1),
        to_run: run_no,
        potential: compare(final_prev, initial_next, tolerances.potential_tolerance, None),
        vdw_elec: compare(
            final_prev_vdw_elec,
            initial_next_vdw_elec,
            tolerances.vdw_elec_tolerance,
            Some(tolerances.vdw_elec_absolute_kcal_mol),
        ),
    }
}

fn fmt_rel(rel: Option<f64>) -> String {
    rel.map_or_else(|| "NA".to_string(), |r| r.to_string())
}

impl EnergyContinuityCheck {
    /// Whether both quantities passed.
    pub fn passed(&self) -> bool {
        self.potential.classification.passed() && self.vdw_elec.classification.passed()
    }

    /// Run log line for the potential energy.
    pub fn potential_message(&self) -> String {
        let p = &self.potential;
        match p.classification {
            Classification::Failed => format!(
                "FAILED: Box {}: Potential energies error fraction between the last point in run {} \
                 and the first point in run {}, error fraction =  {}",
                self.box_index,
                self.from_run,
                self.to_run,
                fmt_rel(p.relative_error)
            ),
            _ => format!(
                "PASSED: Box {}: Potential energies error fraction between the check between the last \
                 point in run {} and the first point in run {}, error fraction = {}",
                self.box_index,
                self.from_run,
                self.to_run,
                fmt_rel(p.relative_error)
            ),
        }
    }

    /// Run log line for vdW + electrostatics.
    pub fn vdw_elec_message(&self) -> String {
        let v = &self.vdw_elec;
        match v.classification {
            Classification::Passed => format!(
                "PASSED: Box {}: VDW + electrostatic fraction between the last point in run {} \
                 and the first point in run {}, error fraction = {}",
                self.box_index,
                self.from_run,
                self.to_run,
                fmt_rel(v.relative_error)
            ),
            Classification::PassedAbsolute => format!(
                "PASSED: Box {}: The VDW + electrostatic energy error fraction between the last point in run {} \
                 and the first point in run {}, absolute difference is = {} kcal/mol.",
                self.box_index, self.from_run, self.to_run, v.absolute_difference
            ),
            Classification::Failed => format!(
                "FAILED: Box {}: vdw_plus_elec energy  error fraction between the last point in run {} \
                 and the first point in run {}, error fraction = {} or the absolute difference is = {} kcal/mol.",
                self.box_index,
                self.from_run,
                self.to_run,
                fmt_rel(v.relative_error),
                v.absolute_difference
            ),
        }
    }

    /// Both log lines with their classification.
    pub fn messages(&self) -> [(Classification, String); 2] {
        [
            (self.potential.classification, self.potential_message()),
            (self.vdw_elec.classification, self.vdw_elec_message()),
        ]
    }
}

impl fmt::Display for EnergyContinuityCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.potential_message())?;
        write!(f, "{}", self.vdw_elec_message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tol() -> ContinuitySettings {
        ContinuitySettings::default()
    }

    #[test]
    fn test_tolerance_boundary() {
        let pass = check(100.0, 100.5, 1.0, 1.0, 2, 0, &tol());
        assert_eq!(pass.potential.classification, Classification::Passed);
        let fail = check(100.0, 100.51, 1.0, 1.0, 2, 0, &tol());
        assert_eq!(fail.potential.classification, Classification::Failed);
        assert!(!fail.passed());
        assert!(fail.potential_message().starts_with("FAILED: Box 0"));
        assert!(fail.potential_message().contains("last point in run 1 and the first point in run 2"));
    }

    #[test]
    fn test_both_zero_passes_with_zero_error() {
        let c = check(0.0, 0.0, 0.0, 0.0, 5, 1, &tol());
        assert_eq!(c.potential.relative_error, Some(0.0));
        assert!(c.passed());
    }

    #[test]
    fn test_zero_final_is_undefined() {
        let c = check(0.0, 1.0, 0.0, 0.3, 5, 1, &tol());
        assert_eq!(c.potential.relative_error, None);
        assert_eq!(c.potential.classification, Classification::Failed);
        assert_eq!(c.vdw_elec.classification, Classification::PassedAbsolute);
        assert!(c.potential_message().contains("error fraction =  NA"));
    }

    #[test]
    fn test_vdw_elec_absolute_fallback() {
        let c = check(-500.0, -500.0, -2.0, -2.4, 4, 0, &tol());
        assert_eq!(c.vdw_elec.classification, Classification::PassedAbsolute);
        assert!(c.vdw_elec_message().contains("absolute difference is"));

        let c = check(-500.0, -500.0, -2.0, -3.0, 4, 0, &tol());
        assert_eq!(c.vdw_elec.classification, Classification::Failed);
        assert!(c.vdw_elec_message().starts_with("FAILED: Box 0: vdw_plus_elec"));
    }
}
