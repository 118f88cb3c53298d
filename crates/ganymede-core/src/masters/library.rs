use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::consts::OUTPUT_EXTENSION;
use crate::error::{GanymedeError, Result};
use crate::frame::ImageKind;
use crate::io::archive::ExposureReader;

use super::frame::MasterFrame;

/// `bias_master.fit` / `dark_master.fit`
pub fn master_file_name(kind: ImageKind) -> String {
    format!("{}_master.{OUTPUT_EXTENSION}", kind.file_stem())
}

/// `flat_master_{filter}.fit`, with path separators and whitespace replaced.
pub fn flat_master_file_name(filter: &str) -> String {
    let safe: String = filter
        .chars()
        .map(|c| {
            if c == '/' || c == '\\' || c.is_whitespace() {
                '_'
            } else {
                c
            }
        })
        .collect();
    format!("flat_master_{safe}.{OUTPUT_EXTENSION}")
}

/// `{stem}_calibrated.fit` for an input light exposure.
pub fn calibrated_file_name(original: &Path) -> String {
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "exposure".to_string());
    format!("{stem}_calibrated.{OUTPUT_EXTENSION}")
}

/// Masters used by one reduction run.
///
/// Bias and dark are loaded up front; flats are loaded on first request for
/// their filter and kept for the rest of the run. Nothing here is mutated
/// once loaded.
#[derive(Debug)]
pub struct MasterLibrary {
    dir: PathBuf,
    pub bias: MasterFrame,
    pub dark: MasterFrame,
    flats: BTreeMap<String, MasterFrame>,
}

impl MasterLibrary {
    /// Load the camera-wide masters from `dir`.
    ///
    /// Any failure to obtain either one is reported as `MissingMaster` (or
    /// `InvalidMaster` for a readable but unusable dark).
    pub fn open(dir: &Path, reader: &dyn ExposureReader) -> Result<Self> {
        let bias = load_camera_master(dir, ImageKind::Bias, reader)?;
        let dark = load_camera_master(dir, ImageKind::Dark, reader)?;

        if bias.dim() != dark.dim() {
            return Err(GanymedeError::InvalidMaster {
                kind: ImageKind::Dark,
                reason: format!(
                    "shape {:?} differs from master bias {:?}",
                    dark.dim(),
                    bias.dim()
                ),
            });
        }

        Ok(Self {
            dir: dir.to_path_buf(),
            bias,
            dark,
            flats: BTreeMap::new(),
        })
    }

    /// Masters needed to correct a light taken through `filter`.
    ///
    /// The flat is loaded on first use; a flat that cannot be read is
    /// reported as `MissingMaster`.
    pub fn masters_for(
        &mut self,
        filter: &str,
        reader: &dyn ExposureReader,
    ) -> Result<CorrectionMasters<'_>> {
        let flat = match self.flats.entry(filter.to_string()) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => entry.insert(load_flat(&self.dir, filter, reader)?),
        };
        Ok(CorrectionMasters {
            bias: &self.bias,
            dark: &self.dark,
            flat,
        })
    }

    /// Filters whose flats have been loaded so far.
    pub fn loaded_filters(&self) -> impl Iterator<Item = &str> {
        self.flats.keys().map(String::as_str)
    }
}

/// Borrowed masters for one correction.
#[derive(Clone, Copy, Debug)]
pub struct CorrectionMasters<'a> {
    pub bias: &'a MasterFrame,
    pub dark: &'a MasterFrame,
    pub flat: &'a MasterFrame,
}

fn load_flat(dir: &Path, filter: &str, reader: &dyn ExposureReader) -> Result<MasterFrame> {
    let path = dir.join(flat_master_file_name(filter));
    let exposure = reader.read(&path).map_err(|e| {
        tracing::error!(filter, error = %e, "Failed to open flat master");
        GanymedeError::MissingMaster {
            kind: format!("{filter} flat"),
            path: path.clone(),
        }
    })?;
    info!(filter, path = %path.display(), "Opened flat master");
    MasterFrame::from_exposure(ImageKind::Flat, Some(filter.to_string()), exposure)
}

fn load_camera_master(
    dir: &Path,
    kind: ImageKind,
    reader: &dyn ExposureReader,
) -> Result<MasterFrame> {
    let path = dir.join(master_file_name(kind));
    let exposure = reader.read(&path).map_err(|e| {
        tracing::error!(%kind, error = %e, "Failed to open master");
        GanymedeError::MissingMaster {
            kind: kind.file_stem().to_string(),
            path: path.clone(),
        }
    })?;
    let master = MasterFrame::from_exposure(kind, None, exposure)?;
    info!(%kind, path = %path.display(), "Opened master");
    Ok(master)
}
