pub mod archive;
pub mod audit;
pub mod discovery;
pub mod fits;
pub mod header;

pub use archive::{ExposureReader, ExposureWriter, FitsArchive, WriteMode};
pub use audit::{AuditEntry, AuditLog, FileAuditLog};
pub use header::{Header, HeaderValue};
