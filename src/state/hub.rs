use std::collections::HashSet;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::mpsc;

/// Handle used to push messages to a connected client.
#[derive(Clone)]
pub struct ClientConnection {
    /// Connection identifier, unique per socket.
    pub id: String,
    /// Outbound channel drained by the connection's writer task.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Registry of live sockets plus the room-scoped broadcast groups they join.
///
/// The two maps are deliberately separate: a connection appears in `clients`
/// as soon as the socket is up but only enters a room's group once its join
/// has been accepted. Presence reconciliation compares exactly these two
/// views to tell a dead connection from a join still in flight.
#[derive(Default)]
pub struct RoomDirectory {
    clients: DashMap<String, ClientConnection>,
    rooms: DashMap<String, HashSet<String>>,
}

impl RoomDirectory {
    /// Create an empty directory.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a freshly opened socket.
    pub fn register(&self, connection: ClientConnection) {
        self.clients.insert(connection.id.clone(), connection);
    }

    /// Forget a socket, returning its handle if it was known.
    pub fn unregister(&self, connection_id: &str) -> Option<ClientConnection> {
        self.clients
            .remove(connection_id)
            .map(|(_, connection)| connection)
    }

    /// Whether the raw socket is still registered.
    pub fn is_connected(&self, connection_id: &str) -> bool {
        self.clients.contains_key(connection_id)
    }

    /// Attach a connection to a room's broadcast group.
    pub fn join_room(&self, room_id: &str, connection_id: &str) {
        self.rooms
            .entry(room_id.to_owned())
            .or_default()
            .insert(connection_id.to_owned());
    }

    /// Detach a connection from a room's broadcast group, dropping the group
    /// once empty.
    pub fn leave_room(&self, room_id: &str, connection_id: &str) {
        let remove_group = match self.rooms.get_mut(room_id) {
            Some(mut members) => {
                members.remove(connection_id);
                members.is_empty()
            }
            None => false,
        };
        if remove_group {
            self.rooms
                .remove_if(room_id, |_, members| members.is_empty());
        }
    }

    /// Connection ids currently attached to a room's broadcast group.
    pub fn room_members(&self, room_id: &str) -> Vec<String> {
        self.rooms
            .get(room_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Push a message to a single connection. Delivery failure just means
    /// the writer already shut down; the disconnect path cleans up.
    pub fn send_to(&self, connection_id: &str, message: Message) {
        if let Some(connection) = self.clients.get(connection_id) {
            let _ = connection.tx.send(message);
        }
    }

    /// Fan a message out to every member of a room.
    pub fn broadcast(&self, room_id: &str, message: &Message) {
        self.broadcast_except(room_id, None, message);
    }

    /// Fan a message out to every member of a room except `skip`.
    pub fn broadcast_except(&self, room_id: &str, skip: Option<&str>, message: &Message) {
        for member in self.room_members(room_id) {
            if skip == Some(member.as_str()) {
                continue;
            }
            self.send_to(&member, message.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn connection(id: &str) -> (ClientConnection, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            ClientConnection {
                id: id.to_owned(),
                tx,
            },
            rx,
        )
    }

    #[test]
    fn broadcast_reaches_members_only() {
        let directory = RoomDirectory::new();
        let (member, mut member_rx) = connection("c1");
        let (outsider, mut outsider_rx) = connection("c2");
        directory.register(member);
        directory.register(outsider);
        directory.join_room("room", "c1");

        directory.broadcast("room", &Message::Text("hello".into()));

        assert!(member_rx.try_recv().is_ok());
        assert!(outsider_rx.try_recv().is_err());
    }

    #[test]
    fn broadcast_except_skips_the_sender() {
        let directory = RoomDirectory::new();
        let (first, mut first_rx) = connection("c1");
        let (second, mut second_rx) = connection("c2");
        directory.register(first);
        directory.register(second);
        directory.join_room("room", "c1");
        directory.join_room("room", "c2");

        directory.broadcast_except("room", Some("c1"), &Message::Text("hello".into()));

        assert!(first_rx.try_recv().is_err());
        assert!(second_rx.try_recv().is_ok());
    }

    #[test]
    fn leave_room_drops_empty_groups() {
        let directory = RoomDirectory::new();
        let (conn, _rx) = connection("c1");
        directory.register(conn);
        directory.join_room("room", "c1");
        directory.leave_room("room", "c1");

        assert!(directory.room_members("room").is_empty());
    }
}
