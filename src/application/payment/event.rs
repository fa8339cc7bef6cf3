//! Payment provider event envelope
//!
//! Only the fields the booking core needs are decoded. Checkout metadata is
//! attached by the checkout creator as flat strings: `session_id` is a
//! decimal string and `seats` a JSON-encoded array of seat codes.

use serde::Deserialize;
use serde_json::Value;

use crate::domain::payment::CheckoutMetadata;
use crate::shared::{DomainError, DomainResult};

#[derive(Debug, Deserialize)]
pub struct EventEnvelope {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: EventData,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventData {
    #[serde(default)]
    pub object: EventObject,
}

#[derive(Debug, Default, Deserialize)]
pub struct EventObject {
    #[serde(default)]
    pub metadata: serde_json::Map<String, Value>,
}

impl EventEnvelope {
    pub fn parse(payload: &[u8]) -> DomainResult<Self> {
        let envelope: Self = serde_json::from_slice(payload)?;
        if envelope.id.trim().is_empty() {
            return Err(DomainError::InvalidPayload("event id is empty".into()));
        }
        Ok(envelope)
    }

    pub fn checkout_metadata(&self) -> DomainResult<CheckoutMetadata> {
        let metadata = &self.data.object.metadata;
        let session_id = parse_session_id(metadata.get("session_id"))?;
        let seats = parse_seats(metadata.get("seats"))?;
        Ok(CheckoutMetadata { session_id, seats })
    }
}

fn parse_session_id(value: Option<&Value>) -> DomainResult<i32> {
    let invalid = || DomainError::InvalidPayload("metadata.session_id is not a session id".into());
    match value {
        Some(Value::String(s)) => s.trim().parse::<i32>().map_err(|_| invalid()),
        Some(Value::Number(n)) => n
            .as_i64()
            .and_then(|n| i32::try_from(n).ok())
            .ok_or_else(invalid),
        Some(_) => Err(invalid()),
        None => Err(DomainError::InvalidPayload(
            "metadata.session_id is missing".into(),
        )),
    }
}

fn parse_seats(value: Option<&Value>) -> DomainResult<Vec<String>> {
    let seats: Vec<String> = match value {
        Some(Value::String(encoded)) => serde_json::from_str(encoded).map_err(|e| {
            DomainError::InvalidPayload(format!("metadata.seats is not a JSON string array: {}", e))
        })?,
        Some(Value::Array(_)) => serde_json::from_value(value.cloned().unwrap_or_default())
            .map_err(|e| {
                DomainError::InvalidPayload(format!("metadata.seats is not a string array: {}", e))
            })?,
        Some(_) => {
            return Err(DomainError::InvalidPayload(
                "metadata.seats is not a string array".into(),
            ))
        }
        None => return Err(DomainError::InvalidPayload("metadata.seats is missing".into())),
    };

    if seats.is_empty() || seats.iter().any(|s| s.trim().is_empty()) {
        return Err(DomainError::InvalidPayload(
            "metadata.seats must list at least one seat code".into(),
        ));
    }
    Ok(seats)
}
