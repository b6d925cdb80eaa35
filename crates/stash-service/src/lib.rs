//! # stash-service
//!
//! Business logic service layer for Stash. Each service orchestrates the
//! metadata repositories and the storage tiers to implement one group of
//! use cases.
//!
//! Services follow constructor injection: all dependencies are provided
//! at construction time via `Arc` references or cheap clones.

pub mod context;
pub mod export;
pub mod node;
pub mod notification;
pub mod share;
pub mod star;
pub mod trash;
pub mod user;

mod validate;

pub use context::RequestContext;
pub use export::{DownloadOutcome, DownloadRequest, ExportContext, ExportService};
pub use node::NodeService;
pub use notification::LoggingNotifier;
pub use share::{ShareOutcome, ShareService};
pub use star::StarService;
pub use trash::{PurgeReport, TrashService};
pub use user::UserService;
