use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use ganymede_core::io::discovery::list_exposures;
use ganymede_core::io::{FileAuditLog, FitsArchive};
use ganymede_core::pipeline::{run_reduction_reported, Collaborators, MissingFlatPolicy};

use super::RunArgs;
use crate::progress::BarReporter;
use crate::summary::{print_reduction_header, print_reduction_summary};

#[derive(Clone, Copy, ValueEnum)]
pub enum MissingFlatArg {
    Abort,
    SkipFilter,
}

impl From<MissingFlatArg> for MissingFlatPolicy {
    fn from(arg: MissingFlatArg) -> Self {
        match arg {
            MissingFlatArg::Abort => MissingFlatPolicy::Abort,
            MissingFlatArg::SkipFilter => MissingFlatPolicy::SkipFilter,
        }
    }
}

#[derive(Args)]
pub struct ReduceArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Root of the dated light archive
    #[arg(long)]
    pub sky_archive: Option<PathBuf>,

    /// Root directory for calibrated output
    #[arg(long)]
    pub calibrated_dir: Option<PathBuf>,

    /// What to do when a filter has no flat master
    #[arg(long, value_enum)]
    pub missing_flat: Option<MissingFlatArg>,

    /// Maximum CCD temperature (C) for a light to be calibrated
    #[arg(long, allow_negative_numbers = true)]
    pub max_ccd_temp: Option<f64>,
}

pub fn run(args: &ReduceArgs) -> Result<()> {
    let mut config = args.run.load_config()?;
    if let Some(ref dir) = args.sky_archive {
        config.paths.sky_archive = dir.clone();
    }
    if let Some(ref dir) = args.calibrated_dir {
        config.paths.calibrated_dir = dir.clone();
    }
    if let Some(policy) = args.missing_flat {
        config.missing_flat = policy.into();
    }
    if let Some(temp) = args.max_ccd_temp {
        config.acceptance.max_ccd_temperature = temp;
    }

    let light_dir = args.run.date_folder(&config.paths.sky_archive)?;
    let lights = list_exposures(&light_dir)
        .with_context(|| format!("Failed to list {}", light_dir.display()))?;

    let date = light_dir
        .file_name()
        .context("Date folder has no name")?;
    let output_dir = config.paths.calibrated_dir.join(date);
    std::fs::create_dir_all(&output_dir)
        .with_context(|| format!("Failed to create {}", output_dir.display()))?;

    print_reduction_header(&light_dir, &output_dir, &config);
    println!("Prepping calibration of {} light exposures", lights.len());

    let audit = FileAuditLog::new(&config.paths.audit_log);
    let io = Collaborators {
        reader: &FitsArchive,
        writer: &FitsArchive,
        audit: &audit,
    };

    let summary = run_reduction_reported(
        &lights,
        &config.paths.masters_dir,
        &output_dir,
        &config,
        io,
        Arc::new(BarReporter::new()),
    )
    .with_context(|| {
        format!(
            "Auto DR halted, see {} for details",
            config.paths.audit_log.display()
        )
    })?;

    print_reduction_summary(&summary, audit.path());
    Ok(())
}
