use std::path::PathBuf;

use thiserror::Error;

use crate::calibrate::CalibrationVerdict;
use crate::frame::ImageKind;

#[derive(Error, Debug)]
pub enum GanymedeError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Exposure not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("Corrupt exposure {}: {reason}", .path.display())]
    Corrupt { path: PathBuf, reason: String },

    #[error("Invalid FITS data: {0}")]
    InvalidFits(String),

    #[error("Missing header keyword {0}")]
    MissingKeyword(&'static str),

    #[error("Invalid value for header keyword {keyword}: {value}")]
    InvalidKeyword { keyword: &'static str, value: String },

    #[error("Refusing to overwrite existing file {}", .0.display())]
    AlreadyExists(PathBuf),

    #[error("Failed to write {}: {source}", .path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("No {0} exposures to combine")]
    EmptyGroup(String),

    #[error("Flat for filter {filter} has median {median} and cannot be normalized")]
    DegenerateFlat { filter: String, median: f32 },

    #[error("Missing master {kind} at {}", .path.display())]
    MissingMaster { kind: String, path: PathBuf },

    #[error("Invalid master {kind}: {reason}")]
    InvalidMaster { kind: ImageKind, reason: String },

    #[error("Verdict {0} does not permit correction")]
    NotCorrectable(CalibrationVerdict),

    #[error("No date folders found under {}", .0.display())]
    NoDateFolders(PathBuf),
}

impl GanymedeError {
    /// True for failures to obtain an exposure from disk (missing or undecodable).
    pub fn is_read_failure(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_)
                | Self::Corrupt { .. }
                | Self::MissingKeyword(_)
                | Self::InvalidKeyword { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, GanymedeError>;
