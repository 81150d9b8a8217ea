//! Room-scoped fan-out of server messages
//!
//! The in-memory implementation keeps every room's member channels in one
//! map. Another implementation (e.g. pub/sub across processes) can be
//! swapped in behind the same trait.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::{mpsc::UnboundedSender, RwLock};
use tracing::debug;
use uuid::Uuid;

use crate::id::RoomId;
use crate::protocol::ServerMessage;

/// Outbound half of a connection's message channel
pub type Outbound = UnboundedSender<ServerMessage>;

#[async_trait]
pub trait Broadcaster: Send + Sync {
    /// Add a connection to a room's delivery group
    async fn join(&self, room: &RoomId, conn: Uuid, outbound: Outbound);

    /// Remove a connection from a room's delivery group
    async fn leave(&self, room: &RoomId, conn: Uuid);

    /// Deliver `msg` to every member of `room` except `origin`.
    /// Returns how many members it was handed to.
    async fn broadcast_except(&self, room: &RoomId, origin: Uuid, msg: &ServerMessage) -> usize;

    async fn member_count(&self, room: &RoomId) -> usize;
}

#[derive(Default)]
pub struct InMemoryBroadcaster {
    rooms: RwLock<HashMap<RoomId, HashMap<Uuid, Outbound>>>,
}

impl InMemoryBroadcaster {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Broadcaster for InMemoryBroadcaster {
    async fn join(&self, room: &RoomId, conn: Uuid, outbound: Outbound) {
        let mut rooms = self.rooms.write().await;
        rooms.entry(room.clone()).or_default().insert(conn, outbound);
    }

    async fn leave(&self, room: &RoomId, conn: Uuid) {
        let mut rooms = self.rooms.write().await;
        if let Some(members) = rooms.get_mut(room) {
            members.remove(&conn);
            if members.is_empty() {
                rooms.remove(room);
            }
        }
    }

    async fn broadcast_except(&self, room: &RoomId, origin: Uuid, msg: &ServerMessage) -> usize {
        let rooms = self.rooms.read().await;
        let Some(members) = rooms.get(room) else {
            return 0;
        };

        let mut delivered = 0;
        for (id, outbound) in members {
            if *id == origin {
                continue;
            }
            // A closed channel means the connection is tearing down; its
            // disconnect path removes it from the group
            if outbound.send(msg.clone()).is_ok() {
                delivered += 1;
            } else {
                debug!("Dropping message for closing connection {}", id);
            }
        }
        delivered
    }

    async fn member_count(&self, room: &RoomId) -> usize {
        self.rooms
            .read()
            .await
            .get(room)
            .map(HashMap::len)
            .unwrap_or(0)
    }
}
