use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use tracing::{info, warn};

use crate::calibrate::{classify, correct, rejection_detail, CalibrationVerdict};
use crate::error::{GanymedeError, Result};
use crate::io::archive::{ExposureReader, ExposureWriter, WriteMode};
use crate::io::audit::{AuditEntry, AuditLog};
use crate::io::discovery::display_name;
use crate::masters::{calibrated_file_name, MasterLibrary};

use super::config::{MissingFlatPolicy, ReductionConfig};
use super::types::{
    ExposureOutcome, NoOpReporter, PipelineStage, ProgressReporter, ReductionSummary,
};

/// External collaborators a reduction run talks to.
#[derive(Clone, Copy)]
pub struct Collaborators<'a> {
    pub reader: &'a dyn ExposureReader,
    pub writer: &'a dyn ExposureWriter,
    pub audit: &'a dyn AuditLog,
}

/// Calibrate every light in `lights`, writing results to `output_dir`.
pub fn run_reduction(
    lights: &[impl AsRef<Path>],
    masters_dir: &Path,
    output_dir: &Path,
    config: &ReductionConfig,
    io: Collaborators<'_>,
) -> Result<ReductionSummary> {
    run_reduction_reported(lights, masters_dir, output_dir, config, io, Arc::new(NoOpReporter))
}

/// Calibrate every light, reporting progress through `reporter`.
///
/// Fails before touching any light if the bias or dark master cannot be
/// loaded. After that, only a missing flat under `MissingFlatPolicy::Abort`
/// stops the run; every other per-exposure problem is logged and counted.
pub fn run_reduction_reported(
    lights: &[impl AsRef<Path>],
    masters_dir: &Path,
    output_dir: &Path,
    config: &ReductionConfig,
    io: Collaborators<'_>,
    reporter: Arc<dyn ProgressReporter>,
) -> Result<ReductionSummary> {
    reporter.begin_stage(PipelineStage::LoadingMasters, None);
    let mut library = match MasterLibrary::open(masters_dir, io.reader) {
        Ok(library) => library,
        Err(e) => {
            audit_fatal(io.audit, &e);
            return Err(e);
        }
    };
    reporter.finish_stage();

    info!(count = lights.len(), "Prepping calibration of light exposures");
    reporter.begin_stage(PipelineStage::Calibrating, Some(lights.len()));

    let mut summary = ReductionSummary::default();
    let mut missing_flats = BTreeSet::new();

    for (i, path) in lights.iter().enumerate() {
        let path = path.as_ref();
        let name = display_name(path);
        let outcome =
            process_light(path, output_dir, config, &mut library, &mut missing_flats, io)?;

        reporter.exposure_finished(&name, &outcome);
        summary.record(&outcome);
        reporter.advance(i + 1);
    }
    reporter.finish_stage();

    info!(
        total = summary.total,
        calibrated = summary.calibrated + summary.calibrated_dark_only,
        rejected = summary.rejected(),
        redundant = summary.redundant,
        failed = summary.failed,
        "Reduction complete"
    );
    Ok(summary)
}

/// Classify, then correct-and-write or log one light.
///
/// `Err` is reserved for conditions that must halt the run.
fn process_light(
    path: &Path,
    output_dir: &Path,
    config: &ReductionConfig,
    library: &mut MasterLibrary,
    missing_flats: &mut BTreeSet<String>,
    io: Collaborators<'_>,
) -> Result<ExposureOutcome> {
    let name = display_name(path);
    let failed = |e: &GanymedeError| {
        warn!(file = %name, error = %e, "Exposure skipped");
        let file = name.clone();
        let reason = e.to_string();
        let entry = if e.is_read_failure() {
            AuditEntry::Unreadable { file, reason }
        } else {
            AuditEntry::ExposureFailed { file, reason }
        };
        append(io.audit, &entry);
        ExposureOutcome::Failed(e.to_string())
    };

    let light = match io.reader.read(path) {
        Ok(light) => light,
        Err(e) => return Ok(failed(&e)),
    };
    let metadata = match light.metadata() {
        Ok(metadata) => metadata,
        Err(e) => return Ok(failed(&e)),
    };

    let verdict = classify(&metadata, &config.acceptance);
    info!(file = %name, filter = metadata.filter_or_default(), %verdict, "Classified light");

    match verdict {
        CalibrationVerdict::Eligible | CalibrationVerdict::EligibleDarkOnly => {}
        CalibrationVerdict::RedundantlyCalibrated => {
            append(io.audit, &AuditEntry::RedundantCalibration { file: name.clone() });
            return Ok(ExposureOutcome::Redundant);
        }
        rejected => {
            append(
                io.audit,
                &AuditEntry::Rejected {
                    file: name.clone(),
                    verdict: rejected,
                    detail: rejection_detail(&metadata, &config.acceptance, rejected),
                },
            );
            return Ok(ExposureOutcome::Rejected(rejected));
        }
    }

    let filter = metadata.filter_or_default().to_string();
    let skipped = |filter: String| {
        append(
            io.audit,
            &AuditEntry::SkippedMissingFlat {
                file: name.clone(),
                filter: filter.clone(),
            },
        );
        ExposureOutcome::MissingFlat(filter)
    };
    if missing_flats.contains(&filter) {
        return Ok(skipped(filter));
    }

    let masters = match library.masters_for(&filter, io.reader) {
        Ok(masters) => masters,
        Err(e) => match config.missing_flat {
            MissingFlatPolicy::Abort => {
                audit_fatal(io.audit, &e);
                return Err(e);
            }
            MissingFlatPolicy::SkipFilter => {
                warn!(
                    filter = %filter,
                    error = %e,
                    "Skipping lights of filter without a flat master"
                );
                missing_flats.insert(filter.clone());
                return Ok(skipped(filter));
            }
        },
    };

    let corrected = match correct(&light, masters.bias, masters.dark, masters.flat, verdict) {
        Ok(corrected) => corrected,
        Err(e) => return Ok(failed(&e)),
    };
    drop(light);

    let output = output_dir.join(calibrated_file_name(path));
    if let Err(e) = io.writer.write(&output, &corrected, WriteMode::Overwrite) {
        return Ok(failed(&e));
    }
    info!(file = %name, output = %output.display(), "Wrote calibrated exposure");

    Ok(ExposureOutcome::Calibrated { verdict, output })
}

/// Record a master-level failure before the run halts.
fn audit_fatal(audit: &dyn AuditLog, error: &GanymedeError) {
    let entry = match error {
        GanymedeError::MissingMaster { kind, path } => AuditEntry::MissingMaster {
            kind: kind.clone(),
            path: path.clone(),
        },
        other => AuditEntry::RunHalted {
            reason: other.to_string(),
        },
    };
    append(audit, &entry);
}

/// A failing audit log is reported but never stops the batch.
fn append(audit: &dyn AuditLog, entry: &AuditEntry) {
    if let Err(e) = audit.append(entry) {
        warn!(error = %e, entry = %entry, "Failed to append to audit log");
    }
}
