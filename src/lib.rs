//! # Cinema Booker
//!
//! Seat reservation core for a cinema ticketing service: bookings with
//! race-free seat holds, idempotent payment confirmation through a signed
//! webhook, and live notifications to cinema managers over WebSocket.
//!
//! ## Architecture
//!
//! - **domain**: entities, repository traits and lookups
//! - **application**: booking service, payment callback processor, manager registry
//! - **infrastructure**: SeaORM persistence, JWT and webhook signature crypto
//! - **interfaces**: REST API (with Swagger) and the manager WebSocket
//! - **server**: process runtime and graceful shutdown

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

pub use config::{default_config_path, AppConfig};

// Re-export database types for easy access
pub use infrastructure::{init_database, DatabaseConfig, SeaOrmRepositoryProvider};

// Re-export API router
pub use interfaces::http::{create_api_router, ApiContext};

pub use server::{ServerHandle, ServerOptions};
