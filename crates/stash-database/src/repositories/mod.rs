//! Repository implementations for all Stash entities.

pub mod node;
pub mod share;
pub mod star;
pub mod user;

pub use node::NodeRepository;
pub use share::ShareRepository;
pub use star::StarRepository;
pub use user::UserRepository;
