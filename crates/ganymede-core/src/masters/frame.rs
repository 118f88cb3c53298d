use ndarray::Array2;

use crate::consts::{KEY_COMBINED_COUNT, KEY_EXPOSURE, KEY_EXPOSURE_FALLBACK};
use crate::error::{GanymedeError, Result};
use crate::frame::{Exposure, ImageKind};

/// A combined, reusable calibration reference.
///
/// Darks are stored bias-subtracted and flats normalized to a median of 1,
/// so a master can be applied directly without further preparation.
#[derive(Clone, Debug)]
pub struct MasterFrame {
    pub kind: ImageKind,
    /// Set for flats only.
    pub filter: Option<String>,
    /// Exposure time the master was built at; only meaningful for darks.
    pub reference_exposure_seconds: f64,
    /// Number of raw exposures combined, 0 if unknown.
    pub combined_count: usize,
    pub exposure: Exposure,
}

impl MasterFrame {
    /// Wrap an exposure read back from disk.
    pub fn from_exposure(
        kind: ImageKind,
        filter: Option<String>,
        exposure: Exposure,
    ) -> Result<Self> {
        let reference = exposure
            .header
            .get_f64(KEY_EXPOSURE)
            .or_else(|| exposure.header.get_f64(KEY_EXPOSURE_FALLBACK))
            .unwrap_or(0.0);

        // Scaling divides by this, so a dark without a usable time is rejected on load.
        if kind == ImageKind::Dark && !(reference.is_finite() && reference > 0.0) {
            return Err(GanymedeError::InvalidMaster {
                kind,
                reason: format!("reference exposure time {reference} s"),
            });
        }

        let combined_count = exposure
            .header
            .get_i64(KEY_COMBINED_COUNT)
            .and_then(|n| usize::try_from(n).ok())
            .unwrap_or(0);

        Ok(Self {
            kind,
            filter,
            reference_exposure_seconds: reference,
            combined_count,
            exposure,
        })
    }

    pub fn data(&self) -> &Array2<f32> {
        &self.exposure.data
    }

    pub fn dim(&self) -> (usize, usize) {
        self.exposure.data.dim()
    }

    /// Human-readable name, e.g. `Bias` or `Flat (Red)`.
    pub fn label(&self) -> String {
        match &self.filter {
            Some(filter) => format!("{} ({filter})", self.kind),
            None => self.kind.to_string(),
        }
    }
}
