use std::fmt;

use serde::{Deserialize, Serialize};

use crate::consts::{DEFAULT_EXPECTED_PIXEL_COUNT, DEFAULT_MAX_CCD_TEMPERATURE};
use crate::frame::{CalibrationStatus, ExposureMetadata};

/// Whether, and how, a light exposure may be calibrated.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CalibrationVerdict {
    /// Raw exposure: bias, scaled dark and flat all apply.
    Eligible,
    /// Dark and bias already removed upstream: flat only.
    EligibleDarkOnly,
    /// Already carries a calibration stamp; correcting again would corrupt it.
    RedundantlyCalibrated,
    RejectedBinning,
    RejectedTemperature,
    RejectedSize,
}

impl CalibrationVerdict {
    /// True for the verdicts the correction pipeline accepts.
    pub fn is_correctable(&self) -> bool {
        matches!(self, Self::Eligible | Self::EligibleDarkOnly)
    }

    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::RejectedBinning | Self::RejectedTemperature | Self::RejectedSize
        )
    }
}

impl fmt::Display for CalibrationVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eligible => write!(f, "Eligible"),
            Self::EligibleDarkOnly => write!(f, "Eligible (dark only)"),
            Self::RedundantlyCalibrated => write!(f, "Redundantly calibrated"),
            Self::RejectedBinning => write!(f, "Rejected: binning"),
            Self::RejectedTemperature => write!(f, "Rejected: temperature"),
            Self::RejectedSize => write!(f, "Rejected: size"),
        }
    }
}

/// Physical limits a light exposure must meet to match the masters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AcceptanceCriteria {
    /// Pixel count of a full, unbinned frame.
    pub expected_pixel_count: usize,
    /// Warmest CCD temperature (degrees C) still covered by the dark master.
    pub max_ccd_temperature: f64,
}

impl Default for AcceptanceCriteria {
    fn default() -> Self {
        Self {
            expected_pixel_count: DEFAULT_EXPECTED_PIXEL_COUNT,
            max_ccd_temperature: DEFAULT_MAX_CCD_TEMPERATURE,
        }
    }
}

/// Decide how a light exposure may be calibrated.
///
/// Rules are checked in priority order and the first match wins: size,
/// binning, temperature, then prior calibration status.
pub fn classify(metadata: &ExposureMetadata, criteria: &AcceptanceCriteria) -> CalibrationVerdict {
    if metadata.pixel_count != criteria.expected_pixel_count {
        return CalibrationVerdict::RejectedSize;
    }
    if metadata.x_binning != 1 || metadata.y_binning != 1 {
        return CalibrationVerdict::RejectedBinning;
    }
    // NaN compares false, so reject it explicitly.
    let temperature = metadata.ccd_temperature;
    if temperature.is_nan() || temperature > criteria.max_ccd_temperature {
        return CalibrationVerdict::RejectedTemperature;
    }
    match metadata.calibration_status {
        CalibrationStatus::Uncalibrated => CalibrationVerdict::Eligible,
        CalibrationStatus::DarkOnly => CalibrationVerdict::EligibleDarkOnly,
        CalibrationStatus::BiasDarkFlat | CalibrationStatus::Partial(_) => {
            CalibrationVerdict::RedundantlyCalibrated
        }
    }
}

/// Short description of why `verdict` was reached, for the audit log.
pub fn rejection_detail(
    metadata: &ExposureMetadata,
    criteria: &AcceptanceCriteria,
    verdict: CalibrationVerdict,
) -> String {
    match verdict {
        CalibrationVerdict::RejectedSize => format!(
            "has {} pixels, expected {}",
            metadata.pixel_count, criteria.expected_pixel_count
        ),
        CalibrationVerdict::RejectedBinning => format!(
            "not 1x1 binning ({}x{})",
            metadata.x_binning, metadata.y_binning
        ),
        CalibrationVerdict::RejectedTemperature => format!(
            "temp {} degrees C, above {}",
            metadata.ccd_temperature, criteria.max_ccd_temperature
        ),
        CalibrationVerdict::RedundantlyCalibrated => {
            format!("already calibrated ({})", metadata.calibration_status)
        }
        CalibrationVerdict::Eligible | CalibrationVerdict::EligibleDarkOnly => String::new(),
    }
}
