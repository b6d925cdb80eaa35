//! Download resolution and zip archive export.

mod archive;
pub mod outcome;
pub mod service;

pub use outcome::{DownloadOutcome, DownloadRequest, ExportContext};
pub use service::ExportService;
