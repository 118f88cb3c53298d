mod common;

use std::io::Write;

use approx::assert_abs_diff_eq;
use tempfile::{tempdir, NamedTempFile};

use ganymede_core::error::GanymedeError;
use ganymede_core::io::fits::{decode_fits, encode_fits};
use ganymede_core::io::header::HeaderValue;
use ganymede_core::io::{ExposureReader, ExposureWriter, FitsArchive, WriteMode};

use common::{light_exposure, H, W};

/// Build a FITS file from raw card strings and big-endian data bytes.
fn build_fits(cards: &[&str], data: &[u8]) -> Vec<u8> {
    let mut buf = Vec::new();
    for card in cards.iter().chain(std::iter::once(&"END")) {
        buf.extend_from_slice(format!("{card:<80}").as_bytes());
    }
    buf.resize(buf.len().div_ceil(2880) * 2880, b' ');
    buf.extend_from_slice(data);
    buf.resize(buf.len().div_ceil(2880) * 2880, 0);
    buf
}

#[test]
fn test_roundtrip_preserves_pixels_and_header() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("light.fit");

    let mut light = light_exposure("Red", 1000.0, 120.0);
    light.data[[2, 3]] = -12.5;
    light.header.set_with_comment("OBJECT", "M42", "target");
    light.header.push_commentary("HISTORY", "captured at the observatory");

    FitsArchive.write(&path, &light, WriteMode::CreateNew).unwrap();
    let back = FitsArchive.read(&path).unwrap();

    assert_eq!(back.data.dim(), (H, W));
    assert_abs_diff_eq!(back.data[[0, 0]], 1000.0);
    assert_abs_diff_eq!(back.data[[2, 3]], -12.5);

    let keys: Vec<&str> = back.header.cards().map(|(k, _)| k).collect();
    let expected: Vec<&str> = light.header.cards().map(|(k, _)| k).collect();
    assert_eq!(keys, expected);
    assert_eq!(back.header.get_str("FILTER"), Some("Red"));
    assert_eq!(back.header.get_f64("EXPTIME"), Some(120.0));
    assert_eq!(back.header.get_f64("CCD-TEMP"), Some(-10.0));
    assert_eq!(back.header.get_i64("XBINNING"), Some(1));
    assert_eq!(back.header.get_str("IMAGETYP"), Some("Light Frame"));

    let object = back.header.cards().find(|(k, _)| *k == "OBJECT").unwrap().1;
    assert_eq!(object.comment.as_deref(), Some("target"));
    assert_eq!(back.header.commentary().len(), 1);

    let meta = back.metadata().unwrap();
    assert_eq!(meta.exposure_seconds, 120.0);
}

#[test]
fn test_encoded_size_is_block_aligned() {
    let light = light_exposure("Red", 1.0, 1.0);
    let mut buf = Vec::new();
    encode_fits(&mut buf, &light).unwrap();
    assert_eq!(buf.len() % 2880, 0);
    assert_eq!(buf.len(), 2 * 2880);
    assert!(buf.starts_with(b"SIMPLE  =                    T"));
}

#[test]
fn test_create_new_refuses_existing_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("bias_master.fit");
    let first = light_exposure("Red", 1.0, 1.0);
    let second = light_exposure("Red", 2.0, 1.0);

    FitsArchive.write(&path, &first, WriteMode::CreateNew).unwrap();
    let err = FitsArchive.write(&path, &second, WriteMode::CreateNew).unwrap_err();
    assert!(matches!(err, GanymedeError::AlreadyExists(ref p) if p == &path));

    // Original content untouched.
    let back = FitsArchive.read(&path).unwrap();
    assert_abs_diff_eq!(back.data[[0, 0]], 1.0);
}

#[test]
fn test_overwrite_replaces_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("flat_master_Red.fit");
    FitsArchive.write(&path, &light_exposure("Red", 1.0, 1.0), WriteMode::Overwrite).unwrap();
    FitsArchive.write(&path, &light_exposure("Red", 2.0, 1.0), WriteMode::Overwrite).unwrap();
    let back = FitsArchive.read(&path).unwrap();
    assert_abs_diff_eq!(back.data[[0, 0]], 2.0);
}

#[test]
fn test_write_creates_parent_directories() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("Calibrated Images").join("20240314").join("a_calibrated.fit");
    FitsArchive.write(&path, &light_exposure("Red", 1.0, 1.0), WriteMode::Overwrite).unwrap();
    assert!(path.exists());
}

#[test]
fn test_missing_file_is_not_found() {
    let dir = tempdir().unwrap();
    let err = FitsArchive.read(&dir.path().join("nope.fit")).unwrap_err();
    assert!(matches!(err, GanymedeError::NotFound(_)));
    assert!(err.is_read_failure());
}

#[test]
fn test_garbage_file_is_corrupt() {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&[0x42u8; 4000]).unwrap();
    file.flush().unwrap();
    let err = FitsArchive.read(file.path()).unwrap_err();
    assert!(matches!(err, GanymedeError::Corrupt { .. }));
}

#[test]
fn test_decode_16bit_with_bzero() {
    let cards = [
        "SIMPLE  =                    T",
        "BITPIX  =                   16",
        "NAXIS   =                    2",
        "NAXIS1  =                    2",
        "NAXIS2  =                    1",
        "BZERO   =                32768",
        "IMAGETYP= 'Light Frame'        / type of image",
        "CCD-TEMP=               -15.25",
    ];
    let mut data = Vec::new();
    data.extend_from_slice(&(-32768i16).to_be_bytes());
    data.extend_from_slice(&(1000i16).to_be_bytes());

    let exposure = decode_fits(&build_fits(&cards, &data)).unwrap();
    assert_eq!(exposure.data.dim(), (1, 2));
    assert_abs_diff_eq!(exposure.data[[0, 0]], 0.0);
    assert_abs_diff_eq!(exposure.data[[0, 1]], 33768.0);

    // Structural cards are regenerated on write, not kept.
    assert!(!exposure.header.contains("BITPIX"));
    assert!(!exposure.header.contains("BZERO"));
    assert_eq!(exposure.header.get_str("IMAGETYP"), Some("Light Frame"));
    assert_eq!(exposure.header.get_f64("CCD-TEMP"), Some(-15.25));
}

#[test]
fn test_decode_quoted_string_with_apostrophe() {
    let cards = [
        "SIMPLE  =                    T",
        "BITPIX  =                    8",
        "NAXIS   =                    2",
        "NAXIS1  =                    1",
        "NAXIS2  =                    1",
        "OBSERVER= 'O''Brien'           / who",
        "CALSTAT = 'BDF     '",
    ];
    let exposure = decode_fits(&build_fits(&cards, &[7])).unwrap();
    assert_eq!(
        exposure.header.get("OBSERVER"),
        Some(&HeaderValue::Text("O'Brien".into()))
    );
    assert_eq!(exposure.header.get_str("CALSTAT"), Some("BDF"));
    assert_abs_diff_eq!(exposure.data[[0, 0]], 7.0);
}

#[test]
fn test_decode_rejects_cube() {
    let cards = [
        "SIMPLE  =                    T",
        "BITPIX  =                    8",
        "NAXIS   =                    3",
        "NAXIS1  =                    1",
        "NAXIS2  =                    1",
        "NAXIS3  =                    1",
    ];
    let err = decode_fits(&build_fits(&cards, &[0])).unwrap_err();
    assert!(matches!(err, GanymedeError::InvalidFits(_)));
}

#[test]
fn test_decode_rejects_oversized_dimensions() {
    // 2^61 pixels of 8 bytes overflows the data size.
    let naxis1 = format!("NAXIS1  = {:>20}", 1u64 << 61);
    let cards = [
        "SIMPLE  =                    T",
        "BITPIX  =                  -64",
        "NAXIS   =                    2",
        naxis1.as_str(),
        "NAXIS2  =                    1",
    ];
    let err = decode_fits(&build_fits(&cards, &[0; 16])).unwrap_err();
    assert!(matches!(err, GanymedeError::InvalidFits(_)));
}

#[test]
fn test_oversized_file_is_corrupt_not_fatal() {
    let naxis1 = format!("NAXIS1  = {:>20}", 1u64 << 61);
    let cards = [
        "SIMPLE  =                    T",
        "BITPIX  =                  -64",
        "NAXIS   =                    2",
        naxis1.as_str(),
        "NAXIS2  =                    1",
    ];
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(&build_fits(&cards, &[0; 16])).unwrap();
    file.flush().unwrap();
    let err = FitsArchive.read(file.path()).unwrap_err();
    assert!(matches!(err, GanymedeError::Corrupt { .. }));
}

#[test]
fn test_decode_rejects_truncated_data() {
    let cards = [
        "SIMPLE  =                    T",
        "BITPIX  =                  -32",
        "NAXIS   =                    2",
        "NAXIS1  =                 1000",
        "NAXIS2  =                 1000",
    ];
    let err = decode_fits(&build_fits(&cards, &[0; 16])).unwrap_err();
    assert!(matches!(err, GanymedeError::InvalidFits(_)));
}
