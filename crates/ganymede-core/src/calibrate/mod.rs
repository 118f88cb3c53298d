pub mod classify;
pub mod correct;

pub use classify::{classify, rejection_detail, AcceptanceCriteria, CalibrationVerdict};
pub use correct::{correct, stamp_calibrated};
