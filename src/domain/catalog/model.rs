use chrono::{DateTime, Utc};

use crate::domain::identity::UserRole;

/// A scheduled screening
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub id: i32,
    /// Price per seat in minor currency units
    pub price: i32,
    pub starts_at: DateTime<Utc>,
    pub room_id: i32,
    pub event_id: i32,
    pub cinema_id: i32,
    pub movie_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct UserBasic {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub role: UserRole,
}
