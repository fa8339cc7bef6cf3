//! One live manager WebSocket, as seen by the registry

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use super::message::ManagerMessage;

/// Handle to a connected manager's outbound queue
#[derive(Debug)]
pub struct ManagerConnection {
    /// Distinguishes successive connections of the same manager
    pub connection_id: u64,
    pub manager_id: i32,
    /// Bounded queue drained by the socket's writer task
    pub sender: mpsc::Sender<ManagerMessage>,
    pub connected_at: DateTime<Utc>,
}

impl ManagerConnection {
    pub fn new(connection_id: u64, manager_id: i32, sender: mpsc::Sender<ManagerMessage>) -> Self {
        Self {
            connection_id,
            manager_id,
            sender,
            connected_at: Utc::now(),
        }
    }
}
