mod common;

use std::path::Path;

use approx::assert_abs_diff_eq;

use ganymede_core::error::GanymedeError;
use ganymede_core::frame::ImageKind;
use ganymede_core::masters::builder::mismatched_dark_exposures;
use ganymede_core::masters::{
    build_bias, build_dark, build_flat, calibrated_file_name, flat_master_file_name,
    master_file_name, CalibrationBatch, MasterLibrary,
};
use ganymede_core::stack::median_value;

use common::{
    assert_all_close, bias_exposure, dark_exposure, flat_exposure, light_exposure, master,
    MemoryArchive, H, W,
};

// ---------------------------------------------------------------------------
// Bias
// ---------------------------------------------------------------------------

#[test]
fn test_bias_shape_preserved() {
    let m = build_bias(vec![bias_exposure(100.0), bias_exposure(102.0), bias_exposure(98.0)]).unwrap();
    assert_eq!(m.dim(), (H, W));
    assert_eq!(m.kind, ImageKind::Bias);
    assert_eq!(m.combined_count, 3);
    assert_all_close(m.data(), 100.0);
}

#[test]
fn test_bias_rejects_outlier() {
    // A cosmic-ray hit in one frame must not leak into the master.
    let m = build_bias(vec![bias_exposure(100.0), bias_exposure(100.0), bias_exposure(9000.0)]).unwrap();
    assert_all_close(m.data(), 100.0);
}

#[test]
fn test_bias_single_frame() {
    let m = build_bias(vec![bias_exposure(55.0)]).unwrap();
    assert_all_close(m.data(), 55.0);
}

#[test]
fn test_bias_even_count_averages_middle() {
    let frames = [10.0, 20.0, 30.0, 1000.0].map(bias_exposure).to_vec();
    let m = build_bias(frames).unwrap();
    assert_all_close(m.data(), 25.0);
}

#[test]
fn test_master_header_records_count() {
    let m = build_bias(vec![bias_exposure(1.0), bias_exposure(2.0)]).unwrap();
    assert_eq!(m.exposure.header.get_i64("NCOMBINE"), Some(2));
    assert_eq!(m.exposure.header.get_str("IMAGETYP"), Some("Bias Frame"));
}

#[test]
fn test_empty_group_not_fabricated() {
    let err = build_bias(Vec::new()).unwrap_err();
    assert!(matches!(err, GanymedeError::EmptyGroup(_)));
    let err = build_flat("Red", Vec::new()).unwrap_err();
    assert!(matches!(err, GanymedeError::EmptyGroup(_)));
}

#[test]
fn test_group_shape_mismatch() {
    let mut odd = bias_exposure(100.0);
    odd.data = ndarray::Array2::from_elem((H + 1, W), 100.0);
    let err = build_bias(vec![bias_exposure(100.0), odd]).unwrap_err();
    assert!(matches!(err, GanymedeError::ShapeMismatch { .. }));
}

// ---------------------------------------------------------------------------
// Dark
// ---------------------------------------------------------------------------

#[test]
fn test_dark_is_bias_subtracted_median() {
    let bias = build_bias(vec![bias_exposure(100.0); 3]).unwrap();
    let darks = vec![dark_exposure(140.0, 60.0), dark_exposure(150.0, 60.0), dark_exposure(5000.0, 60.0)];
    let dark = build_dark(darks, &bias).unwrap();
    assert_all_close(dark.data(), 50.0);
    assert_eq!(dark.reference_exposure_seconds, 60.0);
    assert_eq!(dark.combined_count, 3);
}

#[test]
fn test_dark_reflects_new_bias() {
    let darks = || vec![dark_exposure(150.0, 60.0), dark_exposure(150.0, 60.0)];
    let first = build_dark(darks(), &build_bias(vec![bias_exposure(100.0)]).unwrap()).unwrap();
    let second = build_dark(darks(), &build_bias(vec![bias_exposure(120.0)]).unwrap()).unwrap();
    assert_all_close(first.data(), 50.0);
    assert_all_close(second.data(), 30.0);
}

#[test]
fn test_dark_reference_from_first_frame() {
    let bias = build_bias(vec![bias_exposure(0.0)]).unwrap();
    let darks = vec![dark_exposure(10.0, 30.0), dark_exposure(10.0, 60.0)];
    assert_eq!(mismatched_dark_exposures(&darks), vec![60.0]);
    let dark = build_dark(darks, &bias).unwrap();
    assert_eq!(dark.reference_exposure_seconds, 30.0);
}

#[test]
fn test_dark_requires_positive_exposure() {
    let bias = build_bias(vec![bias_exposure(0.0)]).unwrap();
    let err = build_dark(vec![dark_exposure(10.0, 0.0)], &bias).unwrap_err();
    assert!(matches!(err, GanymedeError::InvalidMaster { kind: ImageKind::Dark, .. }));
}

#[test]
fn test_dark_shape_must_match_bias() {
    let bias = build_bias(vec![bias_exposure(0.0)]).unwrap();
    let mut dark = dark_exposure(10.0, 60.0);
    dark.data = ndarray::Array2::zeros((2, 2));
    let err = build_dark(vec![dark], &bias).unwrap_err();
    assert!(matches!(err, GanymedeError::ShapeMismatch { .. }));
}

// ---------------------------------------------------------------------------
// Flat
// ---------------------------------------------------------------------------

#[test]
fn test_flat_normalized_to_unit_median() {
    let mut frames = Vec::new();
    for fill in [20_000.0, 21_000.0, 19_500.0] {
        let mut f = flat_exposure("Red", fill);
        // Vignetting: darker corner.
        f.data[[0, 0]] = fill * 0.8;
        f.data[[0, 1]] = fill * 0.9;
        frames.push(f);
    }
    let m = build_flat("Red", frames).unwrap();
    assert_eq!(m.dim(), (H, W));
    assert_eq!(m.filter.as_deref(), Some("Red"));
    assert_abs_diff_eq!(median_value(m.data()).unwrap(), 1.0, epsilon = 1e-5);
    assert_abs_diff_eq!(m.data()[[0, 0]], 0.8, epsilon = 1e-5);
}

#[test]
fn test_flat_median_one_per_filter() {
    for (filter, fill) in [("Red", 30_000.0), ("Green", 12_345.0), ("Lum", 3.0)] {
        let m = build_flat(filter, vec![flat_exposure(filter, fill), flat_exposure(filter, fill * 1.1)]).unwrap();
        assert_abs_diff_eq!(median_value(m.data()).unwrap(), 1.0, epsilon = 1e-5);
    }
}

#[test]
fn test_zero_flat_cannot_be_normalized() {
    let err = build_flat("Red", vec![flat_exposure("Red", 0.0)]).unwrap_err();
    assert!(matches!(err, GanymedeError::DegenerateFlat { .. }));
}

// ---------------------------------------------------------------------------
// Batch partitioning
// ---------------------------------------------------------------------------

#[test]
fn test_batch_partitions_by_kind_and_filter() {
    let mut batch = CalibrationBatch::new();
    batch.add(bias_exposure(1.0)).unwrap();
    batch.add(bias_exposure(1.0)).unwrap();
    batch.add(dark_exposure(1.0, 60.0)).unwrap();
    batch.add(flat_exposure("Red", 1.0)).unwrap();
    batch.add(flat_exposure("Blue", 1.0)).unwrap();
    batch.add(flat_exposure("Red", 1.0)).unwrap();
    assert_eq!(batch.add(light_exposure("Red", 1.0, 1.0)).unwrap(), ImageKind::Light);

    let counts = batch.counts();
    assert_eq!(counts.bias, 2);
    assert_eq!(counts.dark, 1);
    assert_eq!(counts.flats.get("Red"), Some(&2));
    assert_eq!(counts.flats.get("Blue"), Some(&1));
    assert_eq!(counts.flats.len(), 2);
}

#[test]
fn test_flat_without_filter_refused() {
    let mut flat = flat_exposure("Red", 1.0);
    flat.header.remove("FILTER");
    let err = CalibrationBatch::new().add(flat).unwrap_err();
    assert!(matches!(err, GanymedeError::MissingKeyword("FILTER")));
}

// ---------------------------------------------------------------------------
// Naming and the master library
// ---------------------------------------------------------------------------

#[test]
fn test_file_names() {
    assert_eq!(master_file_name(ImageKind::Bias), "bias_master.fit");
    assert_eq!(master_file_name(ImageKind::Dark), "dark_master.fit");
    assert_eq!(flat_master_file_name("Red"), "flat_master_Red.fit");
    assert_eq!(flat_master_file_name("H alpha"), "flat_master_H_alpha.fit");
    assert_eq!(
        calibrated_file_name(Path::new("ArchSky/20240314/M42-001.fit")),
        "M42-001_calibrated.fit"
    );
}

#[test]
fn test_library_requires_bias_and_dark() {
    let archive = MemoryArchive::new();
    let dir = Path::new("MasterCal");
    archive.insert(dir.join("bias_master.fit"), master(ImageKind::Bias, None, 1.0, 0.0).exposure);

    let err = MasterLibrary::open(dir, &archive).unwrap_err();
    match err {
        GanymedeError::MissingMaster { kind, path } => {
            assert_eq!(kind, "dark");
            assert_eq!(path, dir.join("dark_master.fit"));
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_library_loads_flats_once() {
    let archive = MemoryArchive::new();
    let dir = Path::new("MasterCal");
    archive.insert(dir.join("bias_master.fit"), master(ImageKind::Bias, None, 1.0, 0.0).exposure);
    archive.insert(dir.join("dark_master.fit"), master(ImageKind::Dark, None, 1.0, 60.0).exposure);
    archive.insert(dir.join("flat_master_Red.fit"), master(ImageKind::Flat, Some("Red"), 1.0, 1.0).exposure);

    let mut library = MasterLibrary::open(dir, &archive).unwrap();
    assert_eq!(library.dark.reference_exposure_seconds, 60.0);

    let masters = library.masters_for("Red", &archive).unwrap();
    assert_eq!(masters.flat.filter.as_deref(), Some("Red"));
    assert!(library.masters_for("Red", &archive).is_ok());
    assert_eq!(library.loaded_filters().collect::<Vec<_>>(), ["Red"]);

    let err = library.masters_for("Blue", &archive).unwrap_err();
    assert!(matches!(err, GanymedeError::MissingMaster { .. }));
    assert_eq!(library.loaded_filters().count(), 1);
}
