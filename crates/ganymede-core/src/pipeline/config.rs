use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::calibrate::AcceptanceCriteria;

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct ReductionConfig {
    #[serde(default)]
    pub missing_flat: MissingFlatPolicy,
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub acceptance: AcceptanceCriteria,
}

/// Where each job reads and writes.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Root holding one folder of raw calibration exposures per date.
    pub calibration_archive: PathBuf,
    /// Root holding one folder of light exposures per date.
    pub sky_archive: PathBuf,
    pub masters_dir: PathBuf,
    /// Calibrated lights land in a per-date folder below this.
    pub calibrated_dir: PathBuf,
    pub audit_log: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            calibration_archive: PathBuf::from("ArchCal"),
            sky_archive: PathBuf::from("ArchSky"),
            masters_dir: PathBuf::from("MasterCal"),
            calibrated_dir: PathBuf::from("Calibrated Images"),
            audit_log: PathBuf::from("DR_errorlog.txt"),
        }
    }
}

/// What to do when a light needs a flat master that does not exist.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingFlatPolicy {
    /// Halt the whole run at the first light that needs the missing flat.
    #[default]
    Abort,
    /// Log and skip the lights of that filter, continue with the rest.
    SkipFilter,
}

impl fmt::Display for MissingFlatPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Abort => write!(f, "Abort"),
            Self::SkipFilter => write!(f, "Skip Filter"),
        }
    }
}
