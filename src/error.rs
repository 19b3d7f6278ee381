//! Error taxonomy for the hybrid MD/MC orchestrator.
//!
//! Every fatal condition in the run loop maps onto one [`HybridError`] variant.
//! Energy-continuity failures are not errors: they are reported through
//! [`crate::continuity::EnergyContinuityCheck`] and logged as warnings.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that abort an orchestration run or a post-hoc combine.
#[derive(Error, Debug)]
pub enum HybridError {
    /// Missing or invalid configuration key, detected before any engine runs.
    #[error("Configuration error: {0}")]
    Configuration(String),
    /// An expected log marker, column or numeric value is absent or unreadable.
    #[error("Malformed log {path}: {message}")]
    MalformedLog {
        /// Log file (or logical source) that failed to parse
        path: String,
        /// What was wrong with it
        message: String,
    },
    /// A box angle other than 90 degrees was read or requested.
    #[error("Non-orthogonal box {box_index}: {axis} angle is {angle} degrees, only 90 is supported")]
    NonOrthogonalBox {
        /// Box index (0 or 1)
        box_index: usize,
        /// Angle name (alpha, beta, gamma)
        axis: &'static str,
        /// Offending value in degrees
        angle: f64,
    },
    /// An engine finished but a file it should have produced does not exist.
    #[error("Expected output file missing after engine run: {0}")]
    ProcessOutputMissing(PathBuf),
    /// An engine process exited with a non-zero status.
    #[error("{engine} exited with status {status} in {dir}")]
    EngineFailed {
        /// Engine name
        engine: String,
        /// Exit code, or -1 when killed by a signal
        status: i32,
        /// Working directory of the failed run
        dir: PathBuf,
    },
    /// A control-file template could not be read or rendered.
    #[error("Template error: {0}")]
    Template(String),
    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl HybridError {
    /// Shorthand for a [`HybridError::MalformedLog`] with an owned path string.
    pub fn malformed(path: impl Into<String>, message: impl Into<String>) -> Self {
        HybridError::MalformedLog {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, HybridError>;
