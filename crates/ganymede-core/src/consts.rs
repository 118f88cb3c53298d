/// Minimum pixel count (h*w) to use row-level Rayon parallelism.
pub const PARALLEL_PIXEL_THRESHOLD: usize = 65_536;

/// Small epsilon below which a flat pixel is treated as dead.
pub const EPSILON: f32 = 1e-10;

/// Pixel count of a full, unbinned frame from the observatory camera (3352 x 2532).
pub const DEFAULT_EXPECTED_PIXEL_COUNT: usize = 8_487_264;

/// Warmest CCD temperature (degrees C) at which the dark master is still valid.
pub const DEFAULT_MAX_CCD_TEMPERATURE: f64 = -4.0;

/// Header keyword for the frame type.
pub const KEY_IMAGE_KIND: &str = "IMAGETYP";

/// Header keyword for the filter name.
pub const KEY_FILTER: &str = "FILTER";

pub const KEY_X_BINNING: &str = "XBINNING";
pub const KEY_Y_BINNING: &str = "YBINNING";

/// Header keyword for the sensor temperature in degrees C.
pub const KEY_CCD_TEMPERATURE: &str = "CCD-TEMP";

/// Header keyword for the exposure duration in seconds.
pub const KEY_EXPOSURE: &str = "EXPTIME";

/// Older capture software writes the duration under this keyword instead.
pub const KEY_EXPOSURE_FALLBACK: &str = "EXPOSURE";

/// Header keyword recording which corrections have been applied.
pub const KEY_CALIBRATION_STATUS: &str = "CALSTAT";

/// Header keyword for the number of raw frames combined into a master.
pub const KEY_COMBINED_COUNT: &str = "NCOMBINE";

/// FITS logical record size in bytes.
pub const FITS_BLOCK_SIZE: usize = 2880;

/// FITS header card size in bytes.
pub const FITS_CARD_SIZE: usize = 80;

/// Extension given to every file this crate writes.
pub const OUTPUT_EXTENSION: &str = "fit";
