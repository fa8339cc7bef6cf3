//! Read-only views of the catalog owned by other subsystems
//!
//! Sessions, users and cinema owners are managed elsewhere; the booking
//! core only reads them through the lookup traits below.

pub mod lookup;
pub mod model;

pub use lookup::{OwnerLookup, SessionLookup, UserLookup};
pub use model::{Session, UserBasic};
