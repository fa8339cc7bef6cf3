//! Payment provider webhook endpoint

pub mod handlers;

pub use handlers::*;
