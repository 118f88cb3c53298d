use std::collections::BTreeMap;

use ndarray::Array2;
use tracing::{debug, info, warn};

use crate::consts::{
    KEY_COMBINED_COUNT, KEY_EXPOSURE, KEY_EXPOSURE_FALLBACK, KEY_FILTER, KEY_IMAGE_KIND,
};
use crate::error::{GanymedeError, Result};
use crate::frame::{Exposure, ImageKind};
use crate::io::header::Header;
use crate::stack::{median_stack, median_value};

use super::frame::MasterFrame;

/// Raw calibration exposures sorted into combine groups.
///
/// Flats are keyed by filter name; the filter set is whatever the batch
/// contains.
#[derive(Debug, Default)]
pub struct CalibrationBatch {
    pub bias: Vec<Exposure>,
    pub dark: Vec<Exposure>,
    pub flats: BTreeMap<String, Vec<Exposure>>,
}

/// Number of exposures indexed per group.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct BatchCounts {
    pub bias: usize,
    pub dark: usize,
    pub flats: BTreeMap<String, usize>,
}

impl CalibrationBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sort one exposure into its group.
    ///
    /// Returns the exposure's kind. Light exposures are not stored; the
    /// caller decides how to report them.
    pub fn add(&mut self, exposure: Exposure) -> Result<ImageKind> {
        let kind_text = exposure
            .header
            .get_str(KEY_IMAGE_KIND)
            .ok_or(GanymedeError::MissingKeyword(KEY_IMAGE_KIND))?;
        let kind = ImageKind::parse(kind_text).ok_or_else(|| GanymedeError::InvalidKeyword {
            keyword: KEY_IMAGE_KIND,
            value: kind_text.to_string(),
        })?;

        match kind {
            ImageKind::Bias => self.bias.push(exposure),
            ImageKind::Dark => self.dark.push(exposure),
            ImageKind::Flat => {
                let filter = exposure
                    .header
                    .get_str(KEY_FILTER)
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .ok_or(GanymedeError::MissingKeyword(KEY_FILTER))?
                    .to_string();
                self.flats.entry(filter).or_default().push(exposure);
            }
            ImageKind::Light => {}
        }
        Ok(kind)
    }

    pub fn counts(&self) -> BatchCounts {
        BatchCounts {
            bias: self.bias.len(),
            dark: self.dark.len(),
            flats: self
                .flats
                .iter()
                .map(|(filter, frames)| (filter.clone(), frames.len()))
                .collect(),
        }
    }
}

/// Split a group into its arrays and a representative header.
fn take_group(frames: Vec<Exposure>, label: &str) -> Result<(Header, Vec<Array2<f32>>)> {
    let mut iter = frames.into_iter();
    let first = iter
        .next()
        .ok_or_else(|| GanymedeError::EmptyGroup(label.to_string()))?;
    let header = first.header;
    let arrays = std::iter::once(first.data)
        .chain(iter.map(|e| e.data))
        .collect();
    Ok((header, arrays))
}

fn finish(
    kind: ImageKind,
    filter: Option<String>,
    mut header: Header,
    data: Array2<f32>,
    combined_count: usize,
    reference_exposure_seconds: f64,
) -> MasterFrame {
    header.set_with_comment(
        KEY_COMBINED_COUNT,
        combined_count as i64,
        "Number of frames combined",
    );
    MasterFrame {
        kind,
        filter,
        reference_exposure_seconds,
        combined_count,
        exposure: Exposure::new(data, header),
    }
}

/// Master bias: per-pixel median of the raw bias frames.
pub fn build_bias(frames: Vec<Exposure>) -> Result<MasterFrame> {
    let count = frames.len();
    let (header, arrays) = take_group(frames, "bias")?;
    let data = median_stack(&arrays, "bias")?;
    info!(count, "Constructed master bias");
    Ok(finish(ImageKind::Bias, None, header, data, count, 0.0))
}

/// Master dark: per-pixel median of (raw dark - master bias).
///
/// The result holds dark current only, so it can be scaled by exposure time.
/// It is tagged with the exposure time of the first dark in the group.
pub fn build_dark(frames: Vec<Exposure>, bias: &MasterFrame) -> Result<MasterFrame> {
    let count = frames.len();
    let (header, arrays) = take_group(frames, "dark")?;

    let reference = header
        .get_f64(KEY_EXPOSURE)
        .or_else(|| header.get_f64(KEY_EXPOSURE_FALLBACK))
        .ok_or(GanymedeError::MissingKeyword(KEY_EXPOSURE))?;
    if !(reference.is_finite() && reference > 0.0) {
        return Err(GanymedeError::InvalidMaster {
            kind: ImageKind::Dark,
            reason: format!("reference exposure time {reference} s"),
        });
    }

    let bias_dim = bias.dim();
    let debiased = arrays
        .into_iter()
        .map(|dark| {
            if dark.dim() != bias_dim {
                return Err(GanymedeError::ShapeMismatch {
                    expected: bias_dim,
                    found: dark.dim(),
                });
            }
            Ok(dark - bias.data())
        })
        .collect::<Result<Vec<_>>>()?;

    let data = median_stack(&debiased, "dark")?;
    info!(count, reference_exposure_seconds = reference, "Constructed master dark");
    Ok(finish(ImageKind::Dark, None, header, data, count, reference))
}

/// Exposure times of a dark group that differ from the first one.
pub fn mismatched_dark_exposures(frames: &[Exposure]) -> Vec<f64> {
    let exposure_of = |e: &Exposure| {
        e.header
            .get_f64(KEY_EXPOSURE)
            .or_else(|| e.header.get_f64(KEY_EXPOSURE_FALLBACK))
    };
    let Some(reference) = frames.first().and_then(exposure_of) else {
        return Vec::new();
    };
    let mismatched: Vec<f64> = frames
        .iter()
        .filter_map(exposure_of)
        .filter(|t| (t - reference).abs() > f64::EPSILON)
        .collect();
    if !mismatched.is_empty() {
        warn!(reference, ?mismatched, "Darks with differing exposure times combined");
    }
    mismatched
}

/// Master flat for one filter: per-pixel median, divided by its own median.
pub fn build_flat(filter: &str, frames: Vec<Exposure>) -> Result<MasterFrame> {
    let count = frames.len();
    let label = format!("{filter} flat");
    let (header, arrays) = take_group(frames, &label)?;
    let mut data = median_stack(&arrays, &label)?;
    drop(arrays);

    let median = median_value(&data).unwrap_or(0.0);
    if median == 0.0 || !median.is_finite() {
        return Err(GanymedeError::DegenerateFlat {
            filter: filter.to_string(),
            median,
        });
    }
    data.mapv_inplace(|v| v / median);
    debug!(filter, median, "Normalized master flat");
    info!(filter, count, "Constructed master flat");

    Ok(finish(
        ImageKind::Flat,
        Some(filter.to_string()),
        header,
        data,
        count,
        0.0,
    ))
}
