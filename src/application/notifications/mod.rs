//! Real-time manager notifications

pub mod connection;
pub mod message;
pub mod registry;

pub use connection::ManagerConnection;
pub use message::ManagerMessage;
pub use registry::{create_manager_registry, ManagerRegistry, NotifyOutcome, SharedManagerRegistry};
