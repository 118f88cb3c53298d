use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::calibrate::CalibrationVerdict;
use crate::error::Result;

/// A condition worth keeping a persistent record of.
#[derive(Clone, Debug, PartialEq)]
pub enum AuditEntry {
    /// A light exposure the classifier refused.
    Rejected {
        file: String,
        verdict: CalibrationVerdict,
        detail: String,
    },
    /// A light exposure that already carries a full calibration stamp.
    RedundantCalibration { file: String },
    /// A required master could not be loaded.
    MissingMaster { kind: String, path: PathBuf },
    /// A light exposure could not be read from disk.
    Unreadable { file: String, reason: String },
    /// A light exposure was read but could not be corrected or written.
    ExposureFailed { file: String, reason: String },
    /// A light exposure passed over because its filter has no flat master.
    SkippedMissingFlat { file: String, filter: String },
    /// The run stopped for a reason other than a missing master.
    RunHalted { reason: String },
}

impl fmt::Display for AuditEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected {
                file,
                verdict,
                detail,
            } => write!(f, "Image {file} {detail}, rejected calibration ({verdict})"),
            Self::RedundantCalibration { file } => {
                write!(f, "Attempted redundant calibration on {file}")
            }
            Self::MissingMaster { kind, path } => write!(
                f,
                "Missing {kind} master {}. Auto DR halted",
                path.display()
            ),
            Self::Unreadable { file, reason } => {
                write!(f, "Unable to read image {file}: {reason}")
            }
            Self::ExposureFailed { file, reason } => {
                write!(f, "Image {file} skipped: {reason}")
            }
            Self::SkippedMissingFlat { file, filter } => {
                write!(f, "Image {file} skipped, no {filter} flat master")
            }
            Self::RunHalted { reason } => write!(f, "{reason}. Auto DR halted"),
        }
    }
}

/// Append-only record of rejections, anomalies and fatal conditions.
pub trait AuditLog {
    fn append(&self, entry: &AuditEntry) -> Result<()>;
}

/// Audit log backed by a text file, one timestamped line per entry.
#[derive(Clone, Debug)]
pub struct FileAuditLog {
    path: PathBuf,
}

impl FileAuditLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl AuditLog for FileAuditLog {
    fn append(&self, entry: &AuditEntry) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", format_line(entry))?;
        Ok(())
    }
}

/// `[YYYYMMDD HH:MM GMT] message`
pub fn format_line(entry: &AuditEntry) -> String {
    format!("[{}] {}", Utc::now().format("%Y%m%d %H:%M GMT"), entry)
}
