//! Route groups mounted by the router

pub mod bookings;
pub mod health;
pub mod metrics;
pub mod request_id;
pub mod webhook;
