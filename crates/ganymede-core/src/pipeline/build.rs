use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::error::{GanymedeError, Result};
use crate::frame::ImageKind;
use crate::io::archive::{ExposureReader, ExposureWriter, WriteMode};
use crate::io::discovery::display_name;
use crate::masters::builder::mismatched_dark_exposures;
use crate::masters::{
    build_bias, build_dark, build_flat, flat_master_file_name, master_file_name, CalibrationBatch,
    MasterFrame,
};

use super::types::{
    BuiltMaster, GroupFailure, MasterBuildSummary, NoOpReporter, PipelineStage, ProgressReporter,
};

/// Build masters from the raw calibration exposures in `files`.
pub fn run_master_build(
    files: &[impl AsRef<Path>],
    masters_dir: &Path,
    reader: &dyn ExposureReader,
    writer: &dyn ExposureWriter,
) -> Result<MasterBuildSummary> {
    run_master_build_reported(files, masters_dir, reader, writer, Arc::new(NoOpReporter))
}

/// Build masters, reporting progress through `reporter`.
///
/// Bias is built first because the dark depends on it. A group that is
/// empty or fails to combine is reported in the summary and skipped; the
/// other groups still build. Bias and dark masters are never overwritten;
/// when a bias master already exists, a new dark is built against it.
/// Any write failure other than an existing bias/dark aborts the job.
pub fn run_master_build_reported(
    files: &[impl AsRef<Path>],
    masters_dir: &Path,
    reader: &dyn ExposureReader,
    writer: &dyn ExposureWriter,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<MasterBuildSummary> {
    let mut summary = MasterBuildSummary::default();

    // Stage 1: sort exposures into groups
    reporter.begin_stage(PipelineStage::Indexing, Some(files.len()));
    let mut batch = CalibrationBatch::new();
    for (i, path) in files.iter().enumerate() {
        let path = path.as_ref();
        match reader.read(path).and_then(|exposure| batch.add(exposure)) {
            Ok(ImageKind::Light) => {
                warn!(file = %display_name(path), "Not a calibration frame, skipped");
                summary.skipped_files += 1;
            }
            Ok(_) => {}
            Err(e) => {
                warn!(file = %display_name(path), error = %e, "Skipped unreadable file");
                summary.skipped_files += 1;
            }
        }
        reporter.advance(i + 1);
    }
    reporter.finish_stage();

    summary.counts = batch.counts();
    info!(
        bias = summary.counts.bias,
        dark = summary.counts.dark,
        flat_filters = summary.counts.flats.len(),
        "Indexed calibration files"
    );
    reporter.batch_indexed(&summary.counts);

    let CalibrationBatch { bias, dark, flats } = batch;
    let total_groups = 2 + flats.len();
    reporter.begin_stage(PipelineStage::BuildingMasters, Some(total_groups));

    // Stage 2: bias, then dark (needs bias)
    let bias_path = masters_dir.join(master_file_name(ImageKind::Bias));
    let master_bias = match build_bias(bias) {
        Ok(master) => {
            let written = persist(
                &master,
                &bias_path,
                WriteMode::CreateNew,
                writer,
                &reporter,
                &mut summary,
            )?;
            Some(if written {
                master
            } else {
                stored_bias(&bias_path, reader, master)
            })
        }
        Err(e) => {
            fail_group(&mut summary, "Bias", &e);
            None
        }
    };
    reporter.advance(1);

    let dark_path = masters_dir.join(master_file_name(ImageKind::Dark));
    summary.mismatched_dark_exposures = mismatched_dark_exposures(&dark).len();
    match &master_bias {
        Some(master_bias) => match build_dark(dark, master_bias) {
            Ok(master) => {
                persist(
                    &master,
                    &dark_path,
                    WriteMode::CreateNew,
                    writer,
                    &reporter,
                    &mut summary,
                )?;
            }
            Err(e) => fail_group(&mut summary, "Dark", &e),
        },
        None => {
            let e = GanymedeError::MissingMaster {
                kind: "bias".into(),
                path: bias_path,
            };
            fail_group(&mut summary, "Dark", &e);
        }
    }
    drop(master_bias);
    reporter.advance(2);

    // Stage 3: one flat per filter present in this batch
    for (i, (filter, frames)) in flats.into_iter().enumerate() {
        let path = masters_dir.join(flat_master_file_name(&filter));
        match build_flat(&filter, frames) {
            Ok(master) => {
                persist(&master, &path, WriteMode::Overwrite, writer, &reporter, &mut summary)?;
            }
            Err(e) => fail_group(&mut summary, &format!("Flat ({filter})"), &e),
        }
        reporter.advance(3 + i);
    }
    reporter.finish_stage();

    Ok(summary)
}

fn fail_group(summary: &mut MasterBuildSummary, label: &str, error: &GanymedeError) {
    warn!(group = label, error = %error, "Master not built");
    summary.failures.push(GroupFailure {
        label: label.to_string(),
        reason: error.to_string(),
    });
}

/// The bias master already on disk, falling back to `fresh` if it cannot be loaded.
fn stored_bias(path: &Path, reader: &dyn ExposureReader, fresh: MasterFrame) -> MasterFrame {
    let stored = reader
        .read(path)
        .and_then(|exposure| MasterFrame::from_exposure(ImageKind::Bias, None, exposure));
    match stored {
        Ok(stored) => {
            warn!(path = %path.display(), "Building dark against existing master bias");
            stored
        }
        Err(e) => {
            warn!(
                path = %path.display(),
                error = %e,
                "Existing master bias unreadable, building dark against new bias"
            );
            fresh
        }
    }
}

/// Write a master and record it; `Ok(false)` means an existing file was kept.
fn persist(
    master: &MasterFrame,
    path: &Path,
    mode: WriteMode,
    writer: &dyn ExposureWriter,
    reporter: &Arc<dyn ProgressReporter>,
    summary: &mut MasterBuildSummary,
) -> Result<bool> {
    let written = match writer.write(path, &master.exposure, mode) {
        Ok(()) => {
            info!(master = %master.label(), path = %path.display(), "Wrote master");
            true
        }
        Err(GanymedeError::AlreadyExists(_)) => {
            warn!(
                master = %master.label(),
                path = %path.display(),
                "Master already exists, no new file written"
            );
            false
        }
        Err(e) => return Err(e),
    };

    let built = BuiltMaster {
        label: master.label(),
        path: path.to_path_buf(),
        combined_count: master.combined_count,
        written,
    };
    reporter.master_finished(&built);
    summary.built.push(built);
    Ok(written)
}
