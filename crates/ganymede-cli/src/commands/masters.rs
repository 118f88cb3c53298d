use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use ganymede_core::io::discovery::list_exposures;
use ganymede_core::io::FitsArchive;
use ganymede_core::pipeline::run_master_build_reported;

use super::RunArgs;
use crate::progress::BarReporter;
use crate::summary::{print_masters_header, print_masters_summary};

#[derive(Args)]
pub struct MastersArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Root of the dated calibration archive
    #[arg(long)]
    pub calibration_archive: Option<PathBuf>,
}

pub fn run(args: &MastersArgs) -> Result<()> {
    let mut config = args.run.load_config()?;
    if let Some(ref dir) = args.calibration_archive {
        config.paths.calibration_archive = dir.clone();
    }

    let batch_dir = args.run.date_folder(&config.paths.calibration_archive)?;
    let files = list_exposures(&batch_dir)
        .with_context(|| format!("Failed to list {}", batch_dir.display()))?;

    print_masters_header(&batch_dir, &config);
    println!("Prepping master creation from {} files", files.len());

    let summary = run_master_build_reported(
        &files,
        &config.paths.masters_dir,
        &FitsArchive,
        &FitsArchive,
        Arc::new(BarReporter::new()),
    )
    .context("Master build failed")?;

    print_masters_summary(&summary);
    Ok(())
}
