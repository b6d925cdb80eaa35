//! Tree browsing and creation.

pub mod service;

pub use service::NodeService;
