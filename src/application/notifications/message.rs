//! Messages pushed to managers

use serde::Serialize;

use crate::domain::booking::BookingCohort;

/// Outbound frame body, serialized as a WebSocket text frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ManagerMessage {
    BookingConfirmed {
        session_id: i32,
        seats: Vec<String>,
        user_name: String,
        movie_title: Option<String>,
        message: String,
    },
}

impl ManagerMessage {
    pub fn booking_confirmed(cohort: &BookingCohort) -> Self {
        Self::BookingConfirmed {
            session_id: cohort.session_id,
            seats: cohort.seats.clone(),
            user_name: cohort.booking_user.name.clone(),
            movie_title: cohort.movie_title.clone(),
            message: cohort.summary(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::BookingConfirmed { .. } => "booking_confirmed",
        }
    }

    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
