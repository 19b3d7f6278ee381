//! File output for run logs and data tables.
//!
//! Tables are plain text: one header line and one line per row, cells
//! separated by tabs. The run log mirrors every progress line to the
//! console logger and to `NAMD_GOMC_started_at_cycle_No_<c>.log`.

use csv::WriterBuilder;
use log::{info, warn};
use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

/// Writes a tab-separated table with a header line.
///
/// # Examples
///
/// ```
/// use hybrid_mdmc::io::write_table;
///
/// let dir = std::env::temp_dir().join("hybrid_mdmc_io_doc");
/// std::fs::create_dir_all(&dir)?;
/// let path = dir.join("table.txt");
/// let header = vec!["#STEP".to_string(), "TOTAL".to_string()];
/// let rows = vec![vec!["0".to_string(), "-1.5".to_string()]];
/// write_table(&path, &header, &rows)?;
/// assert_eq!(std::fs::read_to_string(&path)?, "#STEP\tTOTAL\n0\t-1.5\n");
/// std::fs::remove_dir_all(&dir)?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub fn write_table(path: &Path, header: &[String], rows: &[Vec<String>]) -> io::Result<()> {
    write_delimited(path, b'\t', Some(header), rows)
}

/// Writes `rows` separated by `delimiter`, after an optional header record.
///
/// Every record must have as many cells as the first one.
pub fn write_delimited(path: &Path, delimiter: u8, header: Option<&[String]>, rows: &[Vec<String>]) -> io::Result<()> {
    let mut writer = WriterBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .from_path(path)?;
    if let Some(header) = header {
        writer.write_record(header)?;
    }
    for row in rows {
        writer.write_record(row)?;
    }
    writer.flush()
}

/// Formats a numeric row for [`write_table`].
pub fn number_cells(values: &[f64]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Progress log of one orchestrator invocation.
///
/// Every line also goes to the `log` facade, so the console shows the same
/// text. A disabled run log only forwards to the facade.
#[derive(Debug)]
pub struct RunLog {
    file: Option<File>,
}

impl RunLog {
    /// Creates (truncates) the log file at `path`.
    pub fn create(path: &Path) -> io::Result<Self> {
        Ok(Self {
            file: Some(File::create(path)?),
        })
    }

    /// Run log without a file.
    pub fn disabled() -> Self {
        Self { file: None }
    }

    fn append(&mut self, text: &str) {
        if let Some(file) = self.file.as_mut() {
            if let Err(e) = writeln!(file, "{}", text).and_then(|_| file.flush()) {
                warn!("Failed to write run log: {}", e);
                self.file = None;
            }
        }
    }

    /// Writes one progress line.
    pub fn line(&mut self, text: &str) {
        info!("{}", text);
        self.append(text);
    }

    /// Writes one warning line, prefixed with `WARNING: ` in the file.
    pub fn warning(&mut self, text: &str) {
        warn!("{}", text);
        self.append(&format!("WARNING: {}", text));
    }

    /// Writes a separator line.
    pub fn separator(&mut self) {
        self.line(&"*".repeat(76));
    }
}
