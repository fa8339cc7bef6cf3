//! WebSocket interfaces
//!
//! - `manager`: push channel for booking confirmations to cinema managers

pub mod manager;

pub use manager::{manager_ws_handler, ManagerWsState};
