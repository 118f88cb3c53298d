#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use ndarray::Array2;

use ganymede_core::calibrate::AcceptanceCriteria;
use ganymede_core::error::{GanymedeError, Result};
use ganymede_core::frame::{Exposure, ImageKind};
use ganymede_core::io::header::Header;
use ganymede_core::io::{AuditEntry, AuditLog, ExposureReader, ExposureWriter, WriteMode};
use ganymede_core::masters::MasterFrame;

/// Frame size used throughout the tests.
pub const H: usize = 4;
pub const W: usize = 6;

/// Acceptance criteria matching the small test frames.
pub fn test_criteria() -> AcceptanceCriteria {
    AcceptanceCriteria {
        expected_pixel_count: H * W,
        ..Default::default()
    }
}

/// Header for a raw calibration exposure.
pub fn calibration_header(kind: &str, filter: Option<&str>, exptime: f64) -> Header {
    let mut header = Header::new();
    header.set("IMAGETYP", kind);
    if let Some(filter) = filter {
        header.set("FILTER", filter);
    }
    header.set("EXPTIME", exptime);
    header.set("XBINNING", 1i64);
    header.set("YBINNING", 1i64);
    header.set("CCD-TEMP", -10.0);
    header
}

/// Header for a light exposure that passes every check at `test_criteria`.
pub fn light_header(filter: &str, exptime: f64) -> Header {
    calibration_header("Light Frame", Some(filter), exptime)
}

pub fn uniform(fill: f32) -> Array2<f32> {
    Array2::from_elem((H, W), fill)
}

pub fn exposure(fill: f32, header: Header) -> Exposure {
    Exposure::new(uniform(fill), header)
}

pub fn bias_exposure(fill: f32) -> Exposure {
    exposure(fill, calibration_header("Bias Frame", None, 0.0))
}

pub fn dark_exposure(fill: f32, exptime: f64) -> Exposure {
    exposure(fill, calibration_header("Dark Frame", None, exptime))
}

pub fn flat_exposure(filter: &str, fill: f32) -> Exposure {
    exposure(fill, calibration_header("Flat Field", Some(filter), 1.0))
}

pub fn light_exposure(filter: &str, fill: f32, exptime: f64) -> Exposure {
    exposure(fill, light_header(filter, exptime))
}

/// A master with a uniform value, as if loaded from disk.
pub fn master(kind: ImageKind, filter: Option<&str>, fill: f32, exptime: f64) -> MasterFrame {
    let mut header = Header::new();
    header.set("EXPTIME", exptime);
    MasterFrame::from_exposure(kind, filter.map(str::to_string), exposure(fill, header)).unwrap()
}

/// In-memory exposure store implementing both reader and writer.
#[derive(Default)]
pub struct MemoryArchive {
    files: Mutex<HashMap<PathBuf, Exposure>>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, path: impl Into<PathBuf>, exposure: Exposure) {
        self.files.lock().unwrap().insert(path.into(), exposure);
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<Exposure> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.files.lock().unwrap().contains_key(path.as_ref())
    }

    pub fn len(&self) -> usize {
        self.files.lock().unwrap().len()
    }
}

impl ExposureReader for MemoryArchive {
    fn read(&self, path: &Path) -> Result<Exposure> {
        self.get(path)
            .ok_or_else(|| GanymedeError::NotFound(path.to_path_buf()))
    }
}

impl ExposureWriter for MemoryArchive {
    fn write(&self, path: &Path, exposure: &Exposure, mode: WriteMode) -> Result<()> {
        let mut files = self.files.lock().unwrap();
        if mode == WriteMode::CreateNew && files.contains_key(path) {
            return Err(GanymedeError::AlreadyExists(path.to_path_buf()));
        }
        files.insert(path.to_path_buf(), exposure.clone());
        Ok(())
    }
}

/// Audit log that keeps entries in memory.
#[derive(Default)]
pub struct RecordingAudit {
    entries: Mutex<Vec<AuditEntry>>,
}

impl RecordingAudit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().unwrap().clone()
    }
}

impl AuditLog for RecordingAudit {
    fn append(&self, entry: &AuditEntry) -> Result<()> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

pub fn assert_all_close(data: &Array2<f32>, expected: f32) {
    for &v in data.iter() {
        approx::assert_abs_diff_eq!(v, expected, epsilon = 1e-4);
    }
}
