use ndarray::{Array2, Zip};
use tracing::debug;

use crate::consts::{EPSILON, KEY_CALIBRATION_STATUS};
use crate::error::{GanymedeError, Result};
use crate::frame::{CalibrationStatus, Exposure};
use crate::io::header::Header;
use crate::masters::MasterFrame;

use super::classify::CalibrationVerdict;

fn check_shape(master: &MasterFrame, expected: (usize, usize)) -> Result<()> {
    if master.dim() != expected {
        return Err(GanymedeError::ShapeMismatch {
            expected,
            found: master.dim(),
        });
    }
    Ok(())
}

/// Apply the correction sequence for `verdict` to a light exposure.
///
/// `Eligible`: subtract bias, subtract the dark scaled by
/// `light exposure / dark reference exposure`, divide by the flat.
/// `EligibleDarkOnly`: divide by the flat only.
///
/// The returned exposure carries `CALSTAT = 'BDF'`, which is what makes a
/// later classification of the output come back `RedundantlyCalibrated`.
/// Correction is not idempotent; that stamp is the only guard.
///
/// Flat pixels that are zero or not finite are left undivided.
pub fn correct(
    light: &Exposure,
    bias: &MasterFrame,
    dark: &MasterFrame,
    flat: &MasterFrame,
    verdict: CalibrationVerdict,
) -> Result<Exposure> {
    let shape = light.data.dim();

    let mut data = match verdict {
        CalibrationVerdict::Eligible => {
            check_shape(bias, shape)?;
            check_shape(dark, shape)?;
            let reference = dark.reference_exposure_seconds;
            if !(reference.is_finite() && reference != 0.0) {
                return Err(GanymedeError::InvalidMaster {
                    kind: dark.kind,
                    reason: format!("reference exposure time {reference} s"),
                });
            }
            let exposure_seconds = light.metadata()?.exposure_seconds;
            let scale = (exposure_seconds / reference) as f32;
            debug!(scale, "Scaling master dark");

            let mut data = &light.data - bias.data();
            data.scaled_add(-scale, dark.data());
            data
        }
        CalibrationVerdict::EligibleDarkOnly => light.data.clone(),
        other => return Err(GanymedeError::NotCorrectable(other)),
    };

    check_shape(flat, shape)?;

    let dead = divide_by_flat(&mut data, flat.data());
    if dead > 0 {
        debug!(dead, "Flat pixels left undivided");
    }

    let mut header = light.header.clone();
    stamp_calibrated(&mut header);
    Ok(Exposure::new(data, header))
}

/// Divide in place, skipping dead flat pixels. Returns how many were skipped.
fn divide_by_flat(data: &mut Array2<f32>, flat: &Array2<f32>) -> usize {
    let mut dead = 0usize;
    Zip::from(data).and(flat).for_each(|value, &f| {
        if f.is_finite() && f.abs() > EPSILON {
            *value /= f;
        } else {
            dead += 1;
        }
    });
    dead
}

/// Set `CALSTAT = 'BDF'`, appending the card if absent.
pub fn stamp_calibrated(header: &mut Header) {
    header.set_with_comment(
        KEY_CALIBRATION_STATUS,
        CalibrationStatus::BIAS_DARK_FLAT_CODE,
        "Status of Calibration",
    );
}
