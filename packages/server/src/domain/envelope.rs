//! Envelope: the unit relayed between connections.
//!
//! On the wire an envelope is a JSON object whose fields are all optional and
//! omitted when absent:
//!
//! ```json
//! {"sender":"…","roomID":"lobby","payload":{"text":"hi"},"server_ip":"10.0.0.2","sender_ip":"10.0.0.7:51234"}
//! ```
//!
//! Clients never see the envelope itself; the outbound loop renders it as a
//! [`ClientView`] which drops the room and re-keys the address fields.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use super::{
    error::EnvelopeError,
    value_object::{ConnectionId, RoomId},
};

/// Sender name stamped on system-generated envelopes
pub const SERVER_SENDER: &str = "Server";

/// Decoded only through [`Envelope::decode_lenient`]
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Envelope {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(rename = "roomID", skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub server_ip: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_ip: Option<String>,
}

impl Envelope {
    /// Wrap a frame received from a client.
    ///
    /// The frame becomes the payload as-is when it is valid JSON, otherwise it
    /// is carried as a JSON string.
    pub fn from_client(
        sender: &ConnectionId,
        room: &RoomId,
        frame: &str,
        server_ip: &str,
        sender_ip: &str,
    ) -> Self {
        let payload = serde_json::from_str::<Value>(frame)
            .unwrap_or_else(|_| Value::String(frame.to_string()));

        Self {
            sender: Some(sender.as_str().to_string()),
            room: Some(room.as_str().to_string()),
            payload: Some(payload),
            server_ip: Some(server_ip.to_string()),
            sender_ip: Some(sender_ip.to_string()),
        }
    }

    /// System announcement that `client` joined `room`
    pub fn joined(client: &ConnectionId, room: &RoomId, server_ip: &str, sender_ip: &str) -> Self {
        Self::system(
            room,
            json!({
                "message": format!("Client {client} connected"),
                "client_id": client.as_str(),
            }),
            server_ip,
            sender_ip,
        )
    }

    /// System announcement that `client` left `room`
    pub fn left(client: &ConnectionId, room: &RoomId, server_ip: &str, sender_ip: &str) -> Self {
        Self::system(
            room,
            json!({
                "message": format!("Client {client} disconnected"),
                "client_id": client.as_str(),
            }),
            server_ip,
            sender_ip,
        )
    }

    fn system(room: &RoomId, payload: Value, server_ip: &str, sender_ip: &str) -> Self {
        Self {
            sender: Some(SERVER_SENDER.to_string()),
            room: Some(room.as_str().to_string()),
            payload: Some(payload),
            server_ip: Some(server_ip.to_string()),
            sender_ip: Some(sender_ip.to_string()),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EnvelopeError> {
        Ok(serde_json::to_vec(self)?)
    }

    /// Decode whatever can be decoded.
    ///
    /// Each field is kept only if it has the expected JSON type; anything that
    /// is not a JSON object yields an empty envelope. Never fails.
    pub fn decode_lenient(raw: &[u8]) -> Self {
        let Ok(Value::Object(mut fields)) = serde_json::from_slice::<Value>(raw) else {
            return Self::default();
        };

        Self {
            sender: take_string(&mut fields, "sender"),
            room: take_string(&mut fields, "roomID"),
            payload: fields.remove("payload").filter(|value| !value.is_null()),
            server_ip: take_string(&mut fields, "server_ip"),
            sender_ip: take_string(&mut fields, "sender_ip"),
        }
    }

    /// Room this envelope is addressed to, if it names a non-blank one
    pub fn target_room(&self) -> Option<&str> {
        self.room.as_deref().filter(|room| !room.trim().is_empty())
    }
}

fn take_string(fields: &mut Map<String, Value>, key: &str) -> Option<String> {
    match fields.remove(key) {
        Some(Value::String(value)) => Some(value),
        _ => None,
    }
}

/// Client-facing rendering of an envelope
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ClientView {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender: Option<String>,
    #[serde(rename = "serverIP", default, skip_serializing_if = "Option::is_none")]
    pub server_ip: Option<String>,
    #[serde(rename = "senderIP", default, skip_serializing_if = "Option::is_none")]
    pub sender_ip: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl From<Envelope> for ClientView {
    fn from(envelope: Envelope) -> Self {
        Self {
            sender: envelope.sender,
            server_ip: envelope.server_ip,
            sender_ip: envelope.sender_ip,
            payload: envelope.payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> ConnectionId {
        ConnectionId::new("alice".to_string()).unwrap()
    }

    fn lobby() -> RoomId {
        RoomId::try_from("lobby").unwrap()
    }

    #[test]
    fn test_from_client_keeps_json_payload() {
        // テスト項目: JSON のフレームはそのまま構造化された payload になる
        // given (前提条件):
        let frame = r#"{"text":"hi"}"#;

        // when (操作):
        let envelope = Envelope::from_client(&alice(), &lobby(), frame, "10.0.0.2", "10.0.0.7:1");

        // then (期待する結果):
        assert_eq!(envelope.sender.as_deref(), Some("alice"));
        assert_eq!(envelope.room.as_deref(), Some("lobby"));
        assert_eq!(envelope.payload, Some(json!({"text": "hi"})));
    }

    #[test]
    fn test_from_client_wraps_plain_text() {
        // テスト項目: JSON でないフレームは文字列の payload として運ばれる
        // given (前提条件):
        let frame = "hello there";

        // when (操作):
        let envelope = Envelope::from_client(&alice(), &lobby(), frame, "10.0.0.2", "10.0.0.7:1");

        // then (期待する結果):
        assert_eq!(envelope.payload, Some(json!("hello there")));
    }

    #[test]
    fn test_encode_omits_absent_fields() {
        // テスト項目: 値のないフィールドはシリアライズ結果に含まれない
        // given (前提条件):
        let envelope = Envelope {
            room: Some("lobby".to_string()),
            ..Default::default()
        };

        // when (操作):
        let encoded = String::from_utf8(envelope.encode().unwrap()).unwrap();

        // then (期待する結果):
        assert_eq!(encoded, r#"{"roomID":"lobby"}"#);
    }

    #[test]
    fn test_joined_announcement_fields() {
        // テスト項目: 参加通知は Server が送信者で、参加者の ID を含む
        // given (前提条件):
        let id = alice();

        // when (操作):
        let envelope = Envelope::joined(&id, &lobby(), "10.0.0.2", "10.0.0.7:1");

        // then (期待する結果):
        assert_eq!(envelope.sender.as_deref(), Some(SERVER_SENDER));
        assert_eq!(envelope.target_room(), Some("lobby"));
        assert_eq!(envelope.server_ip.as_deref(), Some("10.0.0.2"));
        assert_eq!(envelope.sender_ip.as_deref(), Some("10.0.0.7:1"));
        let payload = envelope.payload.unwrap();
        assert_eq!(payload["client_id"], "alice");
        assert_eq!(payload["message"], "Client alice connected");
    }

    #[test]
    fn test_left_announcement_message() {
        // テスト項目: 退出通知のメッセージに切断が記載される
        // given (前提条件):
        let id = alice();

        // when (操作):
        let envelope = Envelope::left(&id, &lobby(), "10.0.0.2", "10.0.0.7:1");

        // then (期待する結果):
        assert_eq!(
            envelope.payload.unwrap()["message"],
            "Client alice disconnected"
        );
    }

    #[test]
    fn test_decode_lenient_keeps_well_typed_fields() {
        // テスト項目: 型の合わないフィールドだけが捨てられ、残りはデコードされる
        // given (前提条件):
        let raw = br#"{"sender":42,"roomID":"lobby","payload":[1,2],"server_ip":"x"}"#;

        // when (操作):
        let envelope = Envelope::decode_lenient(raw);

        // then (期待する結果):
        assert_eq!(envelope.sender, None);
        assert_eq!(envelope.target_room(), Some("lobby"));
        assert_eq!(envelope.payload, Some(json!([1, 2])));
        assert_eq!(envelope.server_ip.as_deref(), Some("x"));
        assert_eq!(envelope.sender_ip, None);
    }

    #[test]
    fn test_decode_lenient_on_garbage_yields_empty_envelope() {
        // テスト項目: JSON オブジェクトでない入力は空の Envelope になる
        // given (前提条件):
        let inputs: [&[u8]; 3] = [b"not json", b"[1,2,3]", b"\xff\xfe"];

        // when (操作) / then (期待する結果):
        for raw in inputs {
            let envelope = Envelope::decode_lenient(raw);
            assert_eq!(envelope, Envelope::default());
            assert_eq!(envelope.target_room(), None);
        }
    }

    #[test]
    fn test_blank_room_is_not_a_target() {
        // テスト項目: 空白のルーム名は配送先として扱われない
        // given (前提条件):
        let envelope = Envelope::decode_lenient(br#"{"roomID":"  "}"#);

        // when (操作):
        let target = envelope.target_room();

        // then (期待する結果):
        assert_eq!(target, None);
    }

    #[test]
    fn test_client_view_rekeys_and_drops_room() {
        // テスト項目: ClientView はルームを含まず、アドレスのキーが変換される
        // given (前提条件):
        let envelope = Envelope::from_client(&alice(), &lobby(), r#"{"text":"hi"}"#, "s", "c");

        // when (操作):
        let view = serde_json::to_value(ClientView::from(envelope)).unwrap();

        // then (期待する結果):
        assert_eq!(
            view,
            json!({"sender": "alice", "serverIP": "s", "senderIP": "c", "payload": {"text": "hi"}})
        );
    }
}
