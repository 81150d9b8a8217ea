use uuid::Uuid;

use crate::id::RoomId;
use crate::protocol::ServerMessage;
use crate::session::broadcaster::Outbound;

/// Per-connection session state
#[derive(Debug)]
pub struct Connection {
    id: Uuid,
    outbound: Outbound,
    room: Option<RoomId>,
}

impl Connection {
    pub fn new(outbound: Outbound) -> Self {
        Self {
            id: Uuid::new_v4(),
            outbound,
            room: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn outbound(&self) -> &Outbound {
        &self.outbound
    }

    /// Room this connection is subscribed to, if any
    pub fn room(&self) -> Option<&RoomId> {
        self.room.as_ref()
    }

    pub(crate) fn set_room(&mut self, room: Option<RoomId>) {
        self.room = room;
    }

    /// Queue a direct reply; false once the writer has gone away
    pub fn send(&self, msg: ServerMessage) -> bool {
        self.outbound.send(msg).is_ok()
    }
}
