use std::path::PathBuf;

use crate::calibrate::CalibrationVerdict;
use crate::masters::BatchCounts;

/// Pipeline processing stage, used for progress reporting.
#[derive(Clone, Copy, Debug)]
pub enum PipelineStage {
    Indexing,
    BuildingMasters,
    LoadingMasters,
    Calibrating,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Indexing => write!(f, "Indexing files"),
            Self::BuildingMasters => write!(f, "Building masters"),
            Self::LoadingMasters => write!(f, "Loading masters"),
            Self::Calibrating => write!(f, "Calibrating"),
        }
    }
}

/// What happened to one light exposure.
#[derive(Clone, Debug, PartialEq)]
pub enum ExposureOutcome {
    Calibrated {
        verdict: CalibrationVerdict,
        output: PathBuf,
    },
    /// Already calibrated; nothing written.
    Redundant,
    Rejected(CalibrationVerdict),
    /// Needed a flat that is missing, and the policy is to skip.
    MissingFlat(String),
    /// Could not be read, corrected or written.
    Failed(String),
}

impl std::fmt::Display for ExposureOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Calibrated { output, .. } => write!(f, "calibrated -> {}", output.display()),
            Self::Redundant => write!(f, "already calibrated"),
            Self::Rejected(verdict) => write!(f, "{verdict}"),
            Self::MissingFlat(filter) => write!(f, "skipped, no {filter} flat master"),
            Self::Failed(reason) => write!(f, "failed: {reason}"),
        }
    }
}

/// Thread-safe progress reporting for the pipeline.
///
/// Implementors can use this to drive progress bars, logging, or any other
/// UI feedback. All methods have default no-op implementations.
pub trait ProgressReporter: Send + Sync {
    /// A new pipeline stage has started. `total_items` is the number of
    /// work items in this stage (e.g., file count), if known.
    fn begin_stage(&self, _stage: PipelineStage, _total_items: Option<usize>) {}

    /// Calibration files have been sorted into groups.
    fn batch_indexed(&self, _counts: &BatchCounts) {}

    /// One work item within the current stage has completed.
    fn advance(&self, _items_done: usize) {}

    /// A light exposure has been dealt with.
    fn exposure_finished(&self, _name: &str, _outcome: &ExposureOutcome) {}

    /// A master has been built (and written, unless one already existed).
    fn master_finished(&self, _master: &BuiltMaster) {}

    /// The current stage is finished.
    fn finish_stage(&self) {}
}

/// No-op progress reporter, used when the unreported entry points delegate.
pub(super) struct NoOpReporter;
impl ProgressReporter for NoOpReporter {}

/// One master produced by the build job.
#[derive(Clone, Debug, PartialEq)]
pub struct BuiltMaster {
    pub label: String,
    pub path: PathBuf,
    pub combined_count: usize,
    /// False when an existing bias/dark master was left in place.
    pub written: bool,
}

/// A group the build job could not turn into a master.
#[derive(Clone, Debug, PartialEq)]
pub struct GroupFailure {
    pub label: String,
    pub reason: String,
}

/// Result of the master build job.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MasterBuildSummary {
    pub counts: BatchCounts,
    pub built: Vec<BuiltMaster>,
    pub failures: Vec<GroupFailure>,
    /// Files that were unreadable or not calibration frames.
    pub skipped_files: usize,
    /// Darks combined despite an exposure time differing from the first dark.
    pub mismatched_dark_exposures: usize,
}

/// Result of the reduction job.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReductionSummary {
    pub total: usize,
    pub calibrated: usize,
    pub calibrated_dark_only: usize,
    pub redundant: usize,
    pub rejected_size: usize,
    pub rejected_binning: usize,
    pub rejected_temperature: usize,
    pub missing_flat: usize,
    pub failed: usize,
    pub outputs: Vec<PathBuf>,
}

impl ReductionSummary {
    pub fn record(&mut self, outcome: &ExposureOutcome) {
        self.total += 1;
        match outcome {
            ExposureOutcome::Calibrated { verdict, output } => {
                if *verdict == CalibrationVerdict::EligibleDarkOnly {
                    self.calibrated_dark_only += 1;
                } else {
                    self.calibrated += 1;
                }
                self.outputs.push(output.clone());
            }
            ExposureOutcome::Redundant => self.redundant += 1,
            ExposureOutcome::Rejected(verdict) => match verdict {
                CalibrationVerdict::RejectedSize => self.rejected_size += 1,
                CalibrationVerdict::RejectedBinning => self.rejected_binning += 1,
                CalibrationVerdict::RejectedTemperature => self.rejected_temperature += 1,
                _ => {}
            },
            ExposureOutcome::MissingFlat(_) => self.missing_flat += 1,
            ExposureOutcome::Failed(_) => self.failed += 1,
        }
    }

    pub fn rejected(&self) -> usize {
        self.rejected_size + self.rejected_binning + self.rejected_temperature
    }
}
