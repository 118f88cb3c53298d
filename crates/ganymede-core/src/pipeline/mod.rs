pub mod build;
pub mod config;
mod orchestrator;
mod types;

pub use build::{run_master_build, run_master_build_reported};
pub use config::{MissingFlatPolicy, PathsConfig, ReductionConfig};
pub use orchestrator::{run_reduction, run_reduction_reported, Collaborators};
pub use types::{
    BuiltMaster, ExposureOutcome, GroupFailure, MasterBuildSummary, PipelineStage,
    ProgressReporter, ReductionSummary,
};
