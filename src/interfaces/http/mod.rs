//! HTTP REST API interfaces
//!
//! - `common`: response envelope, error mapping and validated JSON
//! - `middleware`: bearer token authentication
//! - `modules`: bookings, webhook, health and metrics endpoints
//! - `router`: API router with Swagger documentation

pub mod common;
pub mod middleware;
pub mod modules;
pub mod router;

pub use router::{create_api_router, ApiContext, ApiDoc};
