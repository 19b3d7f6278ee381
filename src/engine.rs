//! External engine interfaces.
//!
//! NAMD and GOMC are opaque subprocesses. Each turn the orchestrator renders
//! a control file into the turn directory, launches the engine there and
//! reads back its console log:
//!
//! ```text
//! cd <run_dir> && <binary> +p<cores> in.conf > out.dat 2>&1
//! ```
//!
//! The [`Engine`] trait defines that contract. [`NamdEngine`] and
//! [`GomcEngine`] implement it and differ only in the binary they launch and
//! the log type they parse.
//!
//! Launching and waiting are separate steps so that the two NAMD boxes of a
//! GEMC run can be started together and then waited on one after the other.
//!
//! # Error Handling
//!
//! - a binary that cannot be started surfaces as [`HybridError::Io`]
//! - a non-zero exit status is [`HybridError::EngineFailed`]
//! - a missing `out.dat` is [`HybridError::ProcessOutputMissing`]

use crate::error::{HybridError, Result};
use crate::naming::{CONTROL_FILE, LOG_FILE};
use crate::parser::{EngineKind, GomcLog, NamdLog};
use crate::template_generator::{render_file, ControlBindings};
use log::{debug, info};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::SystemTime;

/// Record of one finished engine invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineRunRecord {
    /// Engine that ran
    pub engine: EngineKind,
    /// Box simulated; `None` for a GOMC turn covering every box
    pub box_index: Option<usize>,
    /// Turn directory
    pub dir: PathBuf,
    /// Wall-clock launch time
    pub started: SystemTime,
    /// Wall-clock exit time
    pub ended: SystemTime,
    /// Exit code, -1 when killed by a signal
    pub status: i32,
    /// Captured console log
    pub log_path: PathBuf,
}

impl EngineRunRecord {
    /// Wall-clock duration in seconds.
    pub fn elapsed_secs(&self) -> f64 {
        self.ended
            .duration_since(self.started)
            .map(|d| d.as_secs_f64())
            .unwrap_or(0.0)
    }

    /// Whether the process exited with status 0.
    pub fn succeeded(&self) -> bool {
        self.status == 0
    }

    /// Turns a non-zero exit status into [`HybridError::EngineFailed`].
    pub fn ensure_success(&self) -> Result<()> {
        if self.succeeded() {
            Ok(())
        } else {
            Err(HybridError::EngineFailed {
                engine: self.engine.tag().to_string(),
                status: self.status,
                dir: self.dir.clone(),
            })
        }
    }
}

/// Engine process that has been started but not yet waited on.
#[derive(Debug)]
pub struct RunningEngine {
    child: Child,
    engine: EngineKind,
    box_index: Option<usize>,
    dir: PathBuf,
    started: SystemTime,
    log_path: PathBuf,
}

impl RunningEngine {
    /// Blocks until the process exits.
    ///
    /// The exit status is recorded, not checked; call
    /// [`EngineRunRecord::ensure_success`] on the result.
    pub fn wait(mut self) -> Result<EngineRunRecord> {
        let status = self.child.wait()?;
        let ended = SystemTime::now();
        let record = EngineRunRecord {
            engine: self.engine,
            box_index: self.box_index,
            dir: self.dir,
            started: self.started,
            ended,
            status: status.code().unwrap_or(-1),
            log_path: self.log_path,
        };
        info!(
            "{} finished in {} (status {}, {:.2} s)",
            record.engine,
            record.dir.display(),
            record.status,
            record.elapsed_secs()
        );
        Ok(record)
    }
}

/// Contract shared by the two simulation engines.
pub trait Engine {
    /// Parsed console log of this engine.
    type Log;

    /// Which engine this is.
    fn kind(&self) -> EngineKind;

    /// Absolute path of the executable.
    fn binary(&self) -> &Path;

    /// Parses the console log of a finished turn.
    fn read_log(&self, run_dir: &Path) -> Result<Self::Log>;

    /// Renders `template` with `bindings` into `<run_dir>/in.conf`,
    /// creating the directory if needed.
    fn write_control_file(&self, template: &Path, bindings: &ControlBindings, run_dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(run_dir)?;
        let control = run_dir.join(CONTROL_FILE);
        render_file(template, bindings, &control)?;
        debug!("Wrote {}", control.display());
        Ok(control)
    }

    /// Starts `<binary> +p<cores> in.conf` in `run_dir` with stdout and
    /// stderr going to `out.dat`.
    fn launch(&self, run_dir: &Path, cores: u32, box_index: Option<usize>) -> Result<RunningEngine> {
        let log_path = run_dir.join(LOG_FILE);
        let log_file = fs::File::create(&log_path)?;
        let err_file = log_file.try_clone()?;

        info!(
            "Starting {} in {} with {} cores",
            self.kind(),
            run_dir.display(),
            cores
        );
        let started = SystemTime::now();
        let child = Command::new(self.binary())
            .arg(format!("+p{}", cores))
            .arg(CONTROL_FILE)
            .current_dir(run_dir)
            .stdout(Stdio::from(log_file))
            .stderr(Stdio::from(err_file))
            .spawn()
            .map_err(|e| {
                io::Error::new(
                    e.kind(),
                    format!("cannot launch {}: {}", self.binary().display(), e),
                )
            })?;

        Ok(RunningEngine {
            child,
            engine: self.kind(),
            box_index,
            dir: run_dir.to_path_buf(),
            started,
            log_path,
        })
    }

    /// Launches, waits and checks the exit status.
    fn run(&self, run_dir: &Path, cores: u32, box_index: Option<usize>) -> Result<EngineRunRecord> {
        let record = self.launch(run_dir, cores, box_index)?.wait()?;
        record.ensure_success()?;
        Ok(record)
    }
}

/// NAMD molecular dynamics engine.
#[derive(Debug, Clone)]
pub struct NamdEngine {
    binary: PathBuf,
}

impl NamdEngine {
    /// Engine launching the given `namd2` binary.
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }
}

impl Engine for NamdEngine {
    type Log = NamdLog;

    fn kind(&self) -> EngineKind {
        EngineKind::Namd
    }

    fn binary(&self) -> &Path {
        &self.binary
    }

    fn read_log(&self, run_dir: &Path) -> Result<NamdLog> {
        NamdLog::read(&run_dir.join(LOG_FILE))
    }
}

/// GOMC Monte Carlo engine.
#[derive(Debug, Clone)]
pub struct GomcEngine {
    binary: PathBuf,
}

impl GomcEngine {
    /// Engine launching the given `GOMC_<device>_<ensemble>` binary.
    pub fn new(binary: PathBuf) -> Self {
        Self { binary }
    }
}

impl Engine for GomcEngine {
    type Log = GomcLog;

    fn kind(&self) -> EngineKind {
        EngineKind::Gomc
    }

    fn binary(&self) -> &Path {
        &self.binary
    }

    fn read_log(&self, run_dir: &Path) -> Result<GomcLog> {
        GomcLog::read(&run_dir.join(LOG_FILE))
    }
}
