//! File and folder node entities.

pub mod interval;
pub mod model;

pub use interval::Interval;
pub use model::{FilePayload, NewNode, Node, NodeKind, NodeState};
