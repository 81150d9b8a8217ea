use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::id::RoomId;
use crate::protocol::{ClientMessage, CreateRequest, RoomEvent, ServerMessage, SyncReply, SyncRequest};
use crate::room::{RoomRegistry, SharedRoom};
use crate::session::broadcaster::Broadcaster;
use crate::session::connection::Connection;

/// Turns inbound protocol messages into registry/room operations.
///
/// Lookups of unknown rooms never fail: `check` answers with an empty
/// string, `sync` with `status: false`, and `subscribe`, `unsubscribe`
/// and `event` do nothing.
pub struct SessionHandler {
    registry: Arc<RoomRegistry>,
    broadcaster: Arc<dyn Broadcaster>,
}

impl SessionHandler {
    pub fn new(registry: Arc<RoomRegistry>, broadcaster: Arc<dyn Broadcaster>) -> Self {
        Self {
            registry,
            broadcaster,
        }
    }

    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    pub fn broadcaster(&self) -> &Arc<dyn Broadcaster> {
        &self.broadcaster
    }

    pub async fn check(&self, id: &RoomId) -> ServerMessage {
        if self.registry.exists(id.as_str()).await {
            ServerMessage::Check(id.to_string())
        } else {
            ServerMessage::Check(String::new())
        }
    }

    /// Join a room. A connection holds at most one subscription, so joining
    /// another room leaves the current one first.
    pub async fn subscribe(&self, conn: &mut Connection, id: &RoomId) {
        if conn.room() == Some(id) {
            return;
        }

        let Some(room) = self.registry.lookup(id.as_str()).await else {
            debug!("Connection {} subscribed to unknown room {}", conn.id(), id);
            return;
        };

        self.join_room(conn, id, &room).await;
    }

    /// Count the connection into a room it has already looked up.
    /// A room evicted since the lookup counts as unknown.
    async fn join_room(&self, conn: &mut Connection, id: &RoomId, room: &SharedRoom) {
        let clients = {
            let mut room = room.lock().await;
            if room.is_evicted() {
                debug!("Connection {} subscribed to evicted room {}", conn.id(), id);
                return;
            }
            room.add_client()
        };

        // Leave the old room only once the new one is secured; its lock is
        // released first so two connections swapping rooms cannot deadlock
        if let Some(previous) = conn.room().cloned() {
            self.unsubscribe(conn, &previous).await;
        }

        self.broadcaster
            .join(id, conn.id(), conn.outbound().clone())
            .await;
        conn.set_room(Some(id.clone()));

        info!(
            "Connection {} joined room {} ({} client(s))",
            conn.id(),
            id,
            clients
        );
    }

    /// Leave a room; ignored unless it is the connection's own room
    pub async fn unsubscribe(&self, conn: &mut Connection, id: &RoomId) {
        if conn.room() != Some(id) {
            debug!(
                "Connection {} unsubscribed from {} without being subscribed",
                conn.id(),
                id
            );
            return;
        }

        conn.set_room(None);
        self.broadcaster.leave(id, conn.id()).await;

        if let Some(room) = self.registry.lookup(id.as_str()).await {
            let clients = room.lock().await.remove_client();
            info!(
                "Connection {} left room {} ({} client(s))",
                conn.id(),
                id,
                clients
            );
        }
    }

    pub async fn sync(&self, request: &SyncRequest) -> Result<SyncReply> {
        let Some(room) = self.registry.lookup(request.room.as_str()).await else {
            return Ok(SyncReply::missing());
        };

        let room = room.lock().await;
        if room.is_evicted() {
            return Ok(SyncReply::missing());
        }
        let pixels = room.snapshot()?;
        debug!(
            "Syncing room {} ({:?}x{:?} requested) data: {}",
            room.id(),
            request.width,
            request.height,
            pixels.len()
        );

        Ok(SyncReply::found(pixels, room.canvas_size()))
    }

    /// Bake an event into the room raster and relay it to the other members.
    ///
    /// The relay happens under the room lock so members see events in the
    /// order they were applied.
    pub async fn event(&self, conn: &Connection, msg: RoomEvent) -> Result<()> {
        msg.event().validate()?;

        let Some(room) = self.registry.lookup(msg.room().as_str()).await else {
            debug!("Dropping event for unknown room {}", msg.room());
            return Ok(());
        };

        self.apply_event(conn, &room, msg).await
    }

    async fn apply_event(
        &self,
        conn: &Connection,
        room: &SharedRoom,
        msg: RoomEvent,
    ) -> Result<()> {
        let mut room = room.lock().await;
        if room.is_evicted() {
            debug!("Dropping event for evicted room {}", msg.room());
            return Ok(());
        }
        room.replay_event(msg.event())?;

        let id = msg.room().clone();
        let relayed = self
            .broadcaster
            .broadcast_except(&id, conn.id(), &ServerMessage::Event(msg))
            .await;
        debug!("Relayed event in room {} to {} member(s)", id, relayed);

        Ok(())
    }

    pub async fn create(&self, request: &CreateRequest) -> Result<RoomId> {
        let (width, height) = request.dimensions();
        let room = self
            .registry
            .create(width, height, &request.pixels)
            .await?;
        let id = room.lock().await.id().clone();
        Ok(id)
    }

    /// Same cleanup as an explicit unsubscribe of the connection's own room
    pub async fn disconnect(&self, conn: &mut Connection) {
        if let Some(room) = conn.room().cloned() {
            self.unsubscribe(conn, &room).await;
        }
    }

    /// Dispatch one client message; returns the direct reply, if any
    pub async fn handle(&self, conn: &mut Connection, msg: ClientMessage) -> Option<ServerMessage> {
        debug!("{} from {}", msg.name(), conn.id());

        let result = match msg {
            ClientMessage::Check(id) => Ok(Some(self.check(&id).await)),
            ClientMessage::Subscribe(id) => {
                self.subscribe(conn, &id).await;
                Ok(None)
            }
            ClientMessage::Unsubscribe(id) => {
                self.unsubscribe(conn, &id).await;
                Ok(None)
            }
            ClientMessage::Sync(request) => self
                .sync(&request)
                .await
                .map(|reply| Some(ServerMessage::Sync(reply))),
            ClientMessage::Event(event) => self.event(conn, event).await.map(|_| None),
            ClientMessage::Create(request) => self
                .create(&request)
                .await
                .map(|id| Some(ServerMessage::Create(id))),
        };

        match result {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Rejected message from {}: {}", conn.id(), e);
                Some(ServerMessage::error(&e))
            }
        }
    }

    /// Parse and dispatch a raw text frame
    pub async fn handle_text(&self, conn: &mut Connection, text: &str) -> Option<ServerMessage> {
        match ClientMessage::parse(text) {
            Ok(msg) => self.handle(conn, msg).await,
            Err(e) => {
                warn!("Unparseable message from {}: {}", conn.id(), e);
                Some(ServerMessage::error(&e))
            }
        }
    }
}
