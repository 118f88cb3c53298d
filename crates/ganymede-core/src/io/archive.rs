use std::io::ErrorKind;
use std::path::Path;

use tracing::debug;

use crate::error::{GanymedeError, Result};
use crate::frame::Exposure;
use crate::io::fits::{read_fits, write_fits};

/// How a write treats an existing file at the destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    /// Fail with `AlreadyExists` rather than replace the file.
    CreateNew,
    Overwrite,
}

/// Source of exposures (pixels plus header).
pub trait ExposureReader {
    /// Fails with `NotFound` for a missing file and `Corrupt` for one that
    /// cannot be decoded.
    fn read(&self, path: &Path) -> Result<Exposure>;
}

/// Sink for exposures.
pub trait ExposureWriter {
    /// Fails with `AlreadyExists` when `mode` is `CreateNew` and the file is
    /// present, and with `WriteFailure` for any other I/O problem.
    fn write(&self, path: &Path, exposure: &Exposure, mode: WriteMode) -> Result<()>;
}

/// FITS files on the local filesystem.
#[derive(Clone, Copy, Debug, Default)]
pub struct FitsArchive;

impl ExposureReader for FitsArchive {
    fn read(&self, path: &Path) -> Result<Exposure> {
        debug!(path = %path.display(), "Reading exposure");
        read_fits(path).map_err(|e| match e {
            GanymedeError::Io(io) if io.kind() == ErrorKind::NotFound => {
                GanymedeError::NotFound(path.to_path_buf())
            }
            other => GanymedeError::Corrupt {
                path: path.to_path_buf(),
                reason: other.to_string(),
            },
        })
    }
}

impl ExposureWriter for FitsArchive {
    fn write(&self, path: &Path, exposure: &Exposure, mode: WriteMode) -> Result<()> {
        debug!(path = %path.display(), ?mode, "Writing exposure");
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|source| GanymedeError::WriteFailure {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        write_fits(path, exposure, mode == WriteMode::CreateNew).map_err(|e| match e {
            GanymedeError::Io(io) if io.kind() == ErrorKind::AlreadyExists => {
                GanymedeError::AlreadyExists(path.to_path_buf())
            }
            GanymedeError::Io(source) => GanymedeError::WriteFailure {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })
    }
}
