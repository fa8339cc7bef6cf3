//! Manager registry - tracks live manager WebSocket connections

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use super::connection::ManagerConnection;
use super::message::ManagerMessage;

/// What happened to one notification
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyOutcome {
    Delivered,
    /// No live connection for the manager; the message is discarded
    NotConnected,
    /// The connection's queue was full or closed; the message is discarded
    Dropped,
}

impl NotifyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Delivered => "delivered",
            Self::NotConnected => "not_connected",
            Self::Dropped => "dropped",
        }
    }
}

/// Manager id → live connection.
///
/// One mutex guards the map and is only held for map access, never across
/// an await or a socket write. Delivery is best-effort and at most once.
pub struct ManagerRegistry {
    connections: Mutex<HashMap<i32, ManagerConnection>>,
    next_connection_id: AtomicU64,
}

impl ManagerRegistry {
    pub fn new() -> Self {
        Self {
            connections: Mutex::new(HashMap::new()),
            next_connection_id: AtomicU64::new(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<i32, ManagerConnection>> {
        // The map stays consistent even if a holder panicked.
        self.connections
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a connection. A later registration for the same manager
    /// replaces the earlier one; the replaced sender is dropped, which ends
    /// its writer task.
    pub fn register(&self, manager_id: i32, sender: mpsc::Sender<ManagerMessage>) -> u64 {
        let connection_id = self.next_connection_id.fetch_add(1, Ordering::Relaxed);
        let connection = ManagerConnection::new(connection_id, manager_id, sender);
        let replaced = self.lock().insert(manager_id, connection);

        if let Some(old) = replaced {
            info!(
                manager_id,
                connection_id,
                replaced_connection_id = old.connection_id,
                "Manager reconnected, previous connection replaced"
            );
        } else {
            info!(manager_id, connection_id, "Manager connected");
        }
        connection_id
    }

    pub fn unregister(&self, manager_id: i32) {
        if self.lock().remove(&manager_id).is_some() {
            info!(manager_id, "Manager disconnected");
        }
    }

    /// Remove the mapping only if it still belongs to `connection_id`.
    /// Returns whether anything was removed.
    pub fn unregister_connection(&self, manager_id: i32, connection_id: u64) -> bool {
        let removed = {
            let mut connections = self.lock();
            match connections.get(&manager_id) {
                Some(conn) if conn.connection_id == connection_id => {
                    connections.remove(&manager_id);
                    true
                }
                _ => false,
            }
        };

        if removed {
            info!(manager_id, connection_id, "Manager disconnected");
        } else {
            debug!(
                manager_id,
                connection_id, "Superseded connection closed, mapping kept"
            );
        }
        removed
    }

    /// Queue a message for a manager without waiting.
    pub fn notify(&self, manager_id: i32, message: ManagerMessage) -> NotifyOutcome {
        let sender = match self.lock().get(&manager_id) {
            Some(conn) => conn.sender.clone(),
            None => {
                debug!(manager_id, kind = message.kind(), "Manager not connected, dropping message");
                return record(NotifyOutcome::NotConnected);
            }
        };

        let outcome = match sender.try_send(message) {
            Ok(()) => NotifyOutcome::Delivered,
            Err(TrySendError::Full(message)) => {
                warn!(manager_id, kind = message.kind(), "Manager queue full, dropping message");
                NotifyOutcome::Dropped
            }
            Err(TrySendError::Closed(message)) => {
                warn!(manager_id, kind = message.kind(), "Manager connection closed, dropping message");
                NotifyOutcome::Dropped
            }
        };
        record(outcome)
    }

    pub fn is_connected(&self, manager_id: i32) -> bool {
        self.lock().contains_key(&manager_id)
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }
}

impl Default for ManagerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn record(outcome: NotifyOutcome) -> NotifyOutcome {
    metrics::counter!("manager_notifications_total", "outcome" => outcome.as_str()).increment(1);
    outcome
}

pub type SharedManagerRegistry = Arc<ManagerRegistry>;

pub fn create_manager_registry() -> SharedManagerRegistry {
    Arc::new(ManagerRegistry::new())
}
