use std::fmt;

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use crate::consts::{
    KEY_CALIBRATION_STATUS, KEY_CCD_TEMPERATURE, KEY_EXPOSURE, KEY_EXPOSURE_FALLBACK, KEY_FILTER,
    KEY_IMAGE_KIND, KEY_X_BINNING, KEY_Y_BINNING,
};
use crate::error::{GanymedeError, Result};
use crate::io::header::Header;

/// A single captured exposure: pixel data plus its header.
#[derive(Clone, Debug)]
pub struct Exposure {
    /// Pixel data, row-major, shape = (height, width)
    pub data: Array2<f32>,
    pub header: Header,
}

impl Exposure {
    pub fn new(data: Array2<f32>, header: Header) -> Self {
        Self { data, header }
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    pub fn pixel_count(&self) -> usize {
        self.data.len()
    }

    /// Semantic view of the header.
    pub fn metadata(&self) -> Result<ExposureMetadata> {
        ExposureMetadata::from_header(&self.header, self.pixel_count())
    }
}

/// Frame type recorded by the capture software.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ImageKind {
    Bias,
    Dark,
    Flat,
    Light,
}

impl ImageKind {
    /// Parse an `IMAGETYP` value such as `Bias Frame` or `Flat Field`.
    pub fn parse(value: &str) -> Option<Self> {
        let lower = value.trim().to_ascii_lowercase();
        match lower.as_str() {
            "bias" | "bias frame" | "zero" => Some(Self::Bias),
            "dark" | "dark frame" => Some(Self::Dark),
            "flat" | "flat field" | "flat frame" => Some(Self::Flat),
            "light" | "light frame" | "object" => Some(Self::Light),
            _ => None,
        }
    }

    /// Lower-case name used in master file names.
    pub fn file_stem(&self) -> &'static str {
        match self {
            Self::Bias => "bias",
            Self::Dark => "dark",
            Self::Flat => "flat",
            Self::Light => "light",
        }
    }
}

impl fmt::Display for ImageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bias => write!(f, "Bias"),
            Self::Dark => write!(f, "Dark"),
            Self::Flat => write!(f, "Flat"),
            Self::Light => write!(f, "Light"),
        }
    }
}

/// Which corrections an exposure has already received.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationStatus {
    #[default]
    Uncalibrated,
    /// Dark (and bias) removed upstream, usually by the camera's auto-dark.
    DarkOnly,
    BiasDarkFlat,
    /// Any other already-applied combination, e.g. `DF`.
    Partial(String),
}

impl CalibrationStatus {
    pub const DARK_ONLY_CODE: &'static str = "D";
    pub const BIAS_DARK_FLAT_CODE: &'static str = "BDF";

    /// Interpret a `CALSTAT` value; absent or blank means uncalibrated.
    pub fn parse(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            None | Some("") => Self::Uncalibrated,
            Some(Self::DARK_ONLY_CODE) => Self::DarkOnly,
            Some(Self::BIAS_DARK_FLAT_CODE) => Self::BiasDarkFlat,
            Some(other) => Self::Partial(other.to_string()),
        }
    }

    /// Header code, `None` when uncalibrated.
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Uncalibrated => None,
            Self::DarkOnly => Some(Self::DARK_ONLY_CODE),
            Self::BiasDarkFlat => Some(Self::BIAS_DARK_FLAT_CODE),
            Self::Partial(code) => Some(code),
        }
    }
}

impl fmt::Display for CalibrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code() {
            Some(code) => write!(f, "{code}"),
            None => write!(f, "uncalibrated"),
        }
    }
}

/// Typed attributes of an exposure, read from its header.
#[derive(Clone, Debug, PartialEq)]
pub struct ExposureMetadata {
    pub image_kind: ImageKind,
    pub filter_name: Option<String>,
    pub x_binning: u32,
    pub y_binning: u32,
    pub ccd_temperature: f64,
    pub exposure_seconds: f64,
    pub calibration_status: CalibrationStatus,
    pub pixel_count: usize,
}

impl ExposureMetadata {
    pub fn from_header(header: &Header, pixel_count: usize) -> Result<Self> {
        let kind_text = header
            .get_str(KEY_IMAGE_KIND)
            .ok_or(GanymedeError::MissingKeyword(KEY_IMAGE_KIND))?;
        let image_kind =
            ImageKind::parse(kind_text).ok_or_else(|| GanymedeError::InvalidKeyword {
                keyword: KEY_IMAGE_KIND,
                value: kind_text.to_string(),
            })?;

        let filter_name = header
            .get_str(KEY_FILTER)
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .map(str::to_string);

        let exposure_seconds = header
            .get_f64(KEY_EXPOSURE)
            .or_else(|| header.get_f64(KEY_EXPOSURE_FALLBACK))
            .ok_or(GanymedeError::MissingKeyword(KEY_EXPOSURE))?;

        Ok(Self {
            image_kind,
            filter_name,
            x_binning: binning(header, KEY_X_BINNING)?,
            y_binning: binning(header, KEY_Y_BINNING)?,
            ccd_temperature: header
                .get_f64(KEY_CCD_TEMPERATURE)
                .ok_or(GanymedeError::MissingKeyword(KEY_CCD_TEMPERATURE))?,
            exposure_seconds,
            calibration_status: CalibrationStatus::parse(header.get_str(KEY_CALIBRATION_STATUS)),
            pixel_count,
        })
    }

    /// Filter name, or `"none"` for exposures without one.
    pub fn filter_or_default(&self) -> &str {
        self.filter_name.as_deref().unwrap_or("none")
    }
}

fn binning(header: &Header, key: &'static str) -> Result<u32> {
    let value = header.get_i64(key).ok_or(GanymedeError::MissingKeyword(key))?;
    u32::try_from(value)
        .ok()
        .filter(|b| *b > 0)
        .ok_or_else(|| GanymedeError::InvalidKeyword {
            keyword: key,
            value: value.to_string(),
        })
}
