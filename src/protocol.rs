//! JSON envelope exchanged over the WebSocket
//!
//! Every frame is `{"event": <name>, "data": <payload>}` in both directions.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::drawing::DrawEvent;
use crate::error::{Result, SketchpadError};
use crate::id::RoomId;

/// `sync` request; the requested dimensions are informational only
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncRequest {
    pub room: RoomId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
}

#[derive(Serialize, Deserialize)]
struct RoomEventFields {
    room: RoomId,
    #[serde(flatten)]
    event: DrawEvent,
}

/// A draw event addressed to a room.
///
/// The payload object is kept as received, so relaying it hands other
/// members exactly what the sender wrote (unknown fields and integer
/// coordinates included).
#[derive(Debug, Clone, PartialEq)]
pub struct RoomEvent {
    room: RoomId,
    event: DrawEvent,
    raw: Map<String, Value>,
}

impl RoomEvent {
    pub fn new(room: RoomId, event: DrawEvent) -> Self {
        let fields = RoomEventFields {
            room: room.clone(),
            event: event.clone(),
        };
        let raw = match serde_json::to_value(&fields) {
            Ok(Value::Object(raw)) => raw,
            _ => Map::new(),
        };
        Self { room, event, raw }
    }

    pub fn room(&self) -> &RoomId {
        &self.room
    }

    pub fn event(&self) -> &DrawEvent {
        &self.event
    }

    /// Payload as it travels on the wire
    pub fn raw(&self) -> &Map<String, Value> {
        &self.raw
    }
}

impl Serialize for RoomEvent {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.raw.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for RoomEvent {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = Map::<String, Value>::deserialize(deserializer)?;
        let RoomEventFields { room, event } =
            serde_json::from_value(Value::Object(raw.clone())).map_err(D::Error::custom)?;
        Ok(Self { room, event, raw })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateRequest {
    /// Browser canvas dimensions; fractional or negative values are clamped
    pub width: f64,
    pub height: f64,
    /// PNG data URL; empty for a blank canvas
    #[serde(default)]
    pub pixels: String,
}

impl CreateRequest {
    /// Requested size in whole pixels. The canvas later clips it to its limits.
    pub fn dimensions(&self) -> (u32, u32) {
        (to_dimension(self.width), to_dimension(self.height))
    }
}

fn to_dimension(value: f64) -> u32 {
    // NaN maps to 0
    value.clamp(0.0, u32::MAX as f64) as u32
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncReply {
    pub status: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixels: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl SyncReply {
    pub fn found(pixels: String, (width, height): (u32, u32)) -> Self {
        Self {
            status: true,
            pixels: Some(pixels),
            width: Some(width),
            height: Some(height),
        }
    }

    pub fn missing() -> Self {
        Self {
            status: false,
            pixels: None,
            width: None,
            height: None,
        }
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ClientMessage {
    Check(RoomId),
    Subscribe(RoomId),
    Unsubscribe(RoomId),
    Sync(SyncRequest),
    Event(RoomEvent),
    Create(CreateRequest),
}

impl ClientMessage {
    /// Event name as carried in the envelope
    pub fn name(&self) -> &'static str {
        match self {
            ClientMessage::Check(_) => "check",
            ClientMessage::Subscribe(_) => "subscribe",
            ClientMessage::Unsubscribe(_) => "unsubscribe",
            ClientMessage::Sync(_) => "sync",
            ClientMessage::Event(_) => "event",
            ClientMessage::Create(_) => "create",
        }
    }

    pub fn parse(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| SketchpadError::InvalidMessage(e.to_string()))
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum ServerMessage {
    /// Room id when the room exists, empty string otherwise
    Check(String),
    Sync(SyncReply),
    /// Relayed draw event, payload as received
    Event(RoomEvent),
    /// Id of the freshly created room
    Create(RoomId),
    Error { code: String, message: String },
}

impl ServerMessage {
    pub fn error(err: &SketchpadError) -> Self {
        ServerMessage::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }

    /// Serialize message to JSON string
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drawing::{Shape, Tool};
    use serde_json::json;

    #[test]
    fn test_parse_check_and_subscribe() {
        assert_eq!(
            ClientMessage::parse(r#"{"event":"check","data":"Ab3xYz"}"#).unwrap(),
            ClientMessage::Check(RoomId::from("Ab3xYz"))
        );
        assert_eq!(
            ClientMessage::parse(r#"{"event":"unsubscribe","data":"Ab3xYz"}"#).unwrap(),
            ClientMessage::Unsubscribe(RoomId::from("Ab3xYz"))
        );
    }

    #[test]
    fn test_parse_event_payload() {
        let text = r##"{"event":"event","data":{"room":"Ab3xYz","tool":"brush","type":"line","px":10,"py":10,"x":1600,"y":10,"width":4,"col":"#000"}}"##;

        let ClientMessage::Event(msg) = ClientMessage::parse(text).unwrap() else {
            panic!("expected an event message");
        };
        let event = msg.event();
        assert_eq!(msg.room().as_str(), "Ab3xYz");
        assert_eq!(event.tool, Tool::Brush);
        assert_eq!(event.shape, Shape::Line);
        assert_eq!(event.px, Some(10.0));
        assert_eq!(event.x, 1600.0);
        assert_eq!(event.width, Some(4.0));
        assert_eq!(event.col.as_deref(), Some("#000"));
        assert_eq!(event.radius, None);
    }

    #[test]
    fn test_parse_sync_without_dimensions() {
        let msg = ClientMessage::parse(r#"{"event":"sync","data":{"room":"abc"}}"#).unwrap();
        assert_eq!(
            msg,
            ClientMessage::Sync(SyncRequest {
                room: RoomId::from("abc"),
                width: None,
                height: None,
            })
        );
    }

    #[test]
    fn test_parse_create_defaults_pixels() {
        let msg =
            ClientMessage::parse(r#"{"event":"create","data":{"width":800,"height":600}}"#)
                .unwrap();
        assert_eq!(
            msg,
            ClientMessage::Create(CreateRequest {
                width: 800.0,
                height: 600.0,
                pixels: String::new(),
            })
        );
    }

    #[test]
    fn test_create_dimensions_are_clamped() {
        let msg = ClientMessage::parse(
            r#"{"event":"create","data":{"width":800.7,"height":-1,"pixels":""}}"#,
        )
        .unwrap();
        let ClientMessage::Create(request) = msg else {
            panic!("expected a create message");
        };
        assert_eq!(request.dimensions(), (800, 0));

        let huge = CreateRequest {
            width: 1e12,
            height: f64::NAN,
            pixels: String::new(),
        };
        assert_eq!(huge.dimensions(), (u32::MAX, 0));
    }

    #[test]
    fn test_message_names() {
        assert_eq!(ClientMessage::Check(RoomId::from("a")).name(), "check");
        let msg = ClientMessage::parse(r#"{"event":"create","data":{"width":1,"height":1}}"#)
            .unwrap();
        assert_eq!(msg.name(), "create");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for text in [
            "",
            "not json",
            r#"{"event":"teleport","data":"x"}"#,
            r#"{"event":"event","data":{"room":"abc","tool":"spray","type":"point","x":1,"y":1}}"#,
        ] {
            let err = ClientMessage::parse(text).unwrap_err();
            assert_eq!(err.code(), "invalid_message", "{}", text);
        }
    }

    #[test]
    fn test_server_message_json() {
        assert_eq!(
            serde_json::to_value(ServerMessage::Check(String::new())).unwrap(),
            json!({"event": "check", "data": ""})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::Sync(SyncReply::missing())).unwrap(),
            json!({"event": "sync", "data": {"status": false}})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::Sync(SyncReply::found(
                "data:image/png;base64,xx".into(),
                (800, 600)
            )))
            .unwrap(),
            json!({"event": "sync", "data": {
                "status": true,
                "pixels": "data:image/png;base64,xx",
                "width": 800,
                "height": 600
            }})
        );
        assert_eq!(
            serde_json::to_value(ServerMessage::Create(RoomId::from("Ab3xYz"))).unwrap(),
            json!({"event": "create", "data": "Ab3xYz"})
        );
    }

    #[test]
    fn test_relayed_event_keeps_wire_shape() {
        let msg = ServerMessage::Event(RoomEvent::new(
            RoomId::from("abc"),
            DrawEvent::point(Tool::Erase, 5.0, 6.0, 3.0),
        ));
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"event": "event", "data": {
                "room": "abc", "tool": "erase", "type": "point",
                "x": 5.0, "y": 6.0, "radius": 3.0
            }})
        );
    }

    #[test]
    fn test_relay_forwards_payload_verbatim() {
        let text = r##"{"event":"event","data":{"room":"abc","tool":"brush","type":"line","px":10,"py":10,"x":20,"y":12,"width":4,"col":"#f00","pressure":0.5}}"##;
        let ClientMessage::Event(msg) = ClientMessage::parse(text).unwrap() else {
            panic!("expected an event message");
        };
        assert_eq!(msg.event().x, 20.0);

        assert_eq!(
            serde_json::to_value(ServerMessage::Event(msg)).unwrap(),
            json!({"event": "event", "data": {
                "room": "abc", "tool": "brush", "type": "line",
                "px": 10, "py": 10, "x": 20, "y": 12, "width": 4,
                "col": "#f00", "pressure": 0.5
            }})
        );
    }

    #[test]
    fn test_error_message() {
        let msg = ServerMessage::error(&SketchpadError::InvalidEvent("Missing radius".into()));
        assert_eq!(
            serde_json::to_value(&msg).unwrap(),
            json!({"event": "error", "data": {
                "code": "invalid_event",
                "message": "Invalid draw event: Missing radius"
            }})
        );
    }
}
