use dashmap::DashMap;
use game_core::Broadcaster;
use game_types::{RoomEvent, RoomId};
use std::fmt;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A WebSocket subscribed to one room's events.
#[derive(Debug, Clone)]
pub struct Connection {
    pub id: ConnectionId,
    pub room_id: RoomId,
    pub connected_at: Instant,
    pub last_activity: Instant,
    pub sender: mpsc::UnboundedSender<RoomEvent>,
}

impl Connection {
    pub fn new(id: ConnectionId, room_id: RoomId) -> (Self, mpsc::UnboundedReceiver<RoomEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let now = Instant::now();

        let connection = Self {
            id,
            room_id,
            connected_at: now,
            last_activity: now,
            sender,
        };

        (connection, receiver)
    }

    pub fn update_activity(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn send_event(&self, event: RoomEvent) -> Result<(), String> {
        self.sender
            .send(event)
            .map_err(|_| "Connection closed".to_string())
    }

    pub fn is_inactive(&self, timeout: Duration) -> bool {
        self.last_activity.elapsed() > timeout
    }
}

/// Live subscriptions, fed by the room registry through [`Broadcaster`].
#[derive(Default)]
pub struct ConnectionManager {
    connections: DashMap<ConnectionId, Connection>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_connection(
        &self,
        id: ConnectionId,
        room_id: &str,
    ) -> mpsc::UnboundedReceiver<RoomEvent> {
        let (connection, receiver) = Connection::new(id, room_id.to_string());
        self.connections.insert(id, connection);
        receiver
    }

    pub fn remove_connection(&self, id: ConnectionId) -> bool {
        self.connections.remove(&id).is_some()
    }

    pub fn get_connection(&self, id: ConnectionId) -> Option<Connection> {
        self.connections.get(&id).map(|entry| entry.value().clone())
    }

    pub fn update_activity(&self, id: ConnectionId) {
        if let Some(mut connection) = self.connections.get_mut(&id) {
            connection.update_activity();
        }
    }

    /// Pushes the event to every subscriber of the room and returns how many
    /// took it. A delivery counts as activity, since subscribers never have to
    /// send anything. Closed connections are dropped on the way.
    pub fn send_to_room(&self, room_id: &str, event: &RoomEvent) -> usize {
        let mut delivered = 0;
        let mut closed = Vec::new();

        for mut connection in self.connections.iter_mut() {
            if connection.room_id != room_id {
                continue;
            }
            match connection.send_event(event.clone()) {
                Ok(()) => {
                    connection.update_activity();
                    delivered += 1;
                }
                Err(_) => closed.push(connection.id),
            }
        }

        // Removal has to wait until the iterator released its shard locks.
        for id in closed {
            warn!("Delivery to {} failed, dropping closed connection", id);
            self.connections.remove(&id);
        }
        delivered
    }

    pub fn cleanup_inactive_connections(&self, timeout: Duration) -> usize {
        let inactive_connections: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|conn| conn.is_inactive(timeout))
            .map(|conn| conn.id)
            .collect();

        for connection_id in &inactive_connections {
            info!("Removing inactive connection: {}", connection_id);
            self.remove_connection(*connection_id);
        }
        inactive_connections.len()
    }

    pub fn connections_in_room(&self, room_id: &str) -> Vec<ConnectionId> {
        self.connections
            .iter()
            .filter(|conn| conn.room_id == room_id)
            .map(|conn| conn.id)
            .collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

impl Broadcaster for ConnectionManager {
    fn publish(&self, room_id: &str, event: RoomEvent) {
        let delivered = self.send_to_room(room_id, &event);
        debug!(
            "Delivered {} for room {} to {} connection(s)",
            event.name(),
            room_id,
            delivered
        );
    }
}
