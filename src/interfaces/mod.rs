//! Inbound adapters: REST API and manager WebSocket channel

pub mod http;
pub mod ws;
