pub mod builder;
pub mod frame;
pub mod library;

pub use builder::{build_bias, build_dark, build_flat, BatchCounts, CalibrationBatch};
pub use frame::MasterFrame;
pub use library::{
    calibrated_file_name, flat_master_file_name, master_file_name, CorrectionMasters, MasterLibrary,
};
