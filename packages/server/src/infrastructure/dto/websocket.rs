//! WebSocket message DTOs.
//!
//! Every frame on the wire is the envelope `{ "type": "<dot.case>",
//! "data": { ... } }`. Serde's adjacently tagged representation maps the
//! envelope directly onto the `Inbound`/`Outbound` enums, so dispatch in
//! the router is a single `match`.

use serde::{Deserialize, Serialize};

use crate::domain::ChatMessage;

/// Inbound envelopes accepted from clients.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Inbound {
    #[serde(rename = "chat.send")]
    ChatSend { text: String },

    #[serde(rename = "room.join", rename_all = "camelCase")]
    RoomJoin { room_name: String },

    #[serde(rename = "room.leave")]
    RoomLeave {},

    #[serde(rename = "presence.ping")]
    PresencePing {},
}

/// Chat message payload shared by `chat.message` and history replay.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageDto {
    pub id: u64,
    pub room_name: String,
    pub author_display_name: String,
    pub text: String,
    pub created_at: i64,
}

impl From<&ChatMessage> for ChatMessageDto {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id,
            room_name: message.room_name.as_str().to_string(),
            author_display_name: message.author_display_name.clone(),
            text: message.body.as_str().to_string(),
            created_at: message.created_at,
        }
    }
}

/// Outbound envelopes pushed to clients.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum Outbound {
    #[serde(rename = "chat.message")]
    ChatMessage(ChatMessageDto),

    #[serde(rename = "room.joined", rename_all = "camelCase")]
    RoomJoined {
        room_name: String,
        member_count: usize,
        history: Vec<ChatMessageDto>,
    },

    #[serde(rename = "room.left")]
    RoomLeft {},

    #[serde(rename = "user.joined", rename_all = "camelCase")]
    UserJoined {
        room_name: String,
        username: String,
        member_count: usize,
    },

    #[serde(rename = "user.left", rename_all = "camelCase")]
    UserLeft {
        room_name: String,
        username: String,
        member_count: usize,
    },

    #[serde(rename = "presence.pong")]
    PresencePong { timestamp: i64 },

    #[serde(rename = "presence.count")]
    PresenceCount { count: usize },

    #[serde(rename = "error")]
    Error { message: String },
}

impl Outbound {
    /// Serialize the envelope once; callers share the resulting string
    /// across all broadcast targets.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).expect("outbound envelope is always serializable")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inbound_chat_send_parses_from_envelope() {
        // テスト項目: chat.send エンベロープが正しくパースされる
        // given (前提条件):
        let raw = r#"{"type":"chat.send","data":{"text":"hi"}}"#;

        // when (操作):
        let parsed: Inbound = serde_json::from_str(raw).unwrap();

        // then (期待する結果):
        assert_eq!(
            parsed,
            Inbound::ChatSend {
                text: "hi".to_string()
            }
        );
    }

    #[test]
    fn test_inbound_room_join_uses_camel_case_field() {
        // テスト項目: room.join の roomName フィールドがマップされる
        // given (前提条件):
        let raw = r#"{"type":"room.join","data":{"roomName":"lobby"}}"#;

        // when (操作):
        let parsed: Inbound = serde_json::from_str(raw).unwrap();

        // then (期待する結果):
        assert_eq!(
            parsed,
            Inbound::RoomJoin {
                room_name: "lobby".to_string()
            }
        );
    }

    #[test]
    fn test_inbound_unknown_type_fails_to_parse() {
        // テスト項目: 未知の type がパースエラーになる
        // given (前提条件):
        let raw = r#"{"type":"admin.shutdown","data":{}}"#;

        // when (操作):
        let parsed = serde_json::from_str::<Inbound>(raw);

        // then (期待する結果):
        assert!(parsed.is_err());
    }

    #[test]
    fn test_outbound_chat_message_envelope_shape() {
        // テスト項目: chat.message が仕様どおりのエンベロープ形状になる
        // given (前提条件):
        let outbound = Outbound::ChatMessage(ChatMessageDto {
            id: 1,
            room_name: "lobby".to_string(),
            author_display_name: "alice".to_string(),
            text: "hi".to_string(),
            created_at: 1700000000000,
        });

        // when (操作):
        let value: serde_json::Value = serde_json::from_str(&outbound.to_json()).unwrap();

        // then (期待する結果):
        assert_eq!(
            value,
            json!({
                "type": "chat.message",
                "data": {
                    "id": 1,
                    "roomName": "lobby",
                    "authorDisplayName": "alice",
                    "text": "hi",
                    "createdAt": 1700000000000_i64,
                }
            })
        );
    }

    #[test]
    fn test_outbound_room_joined_envelope_shape() {
        // テスト項目: room.joined が memberCount と history を含む
        // given (前提条件):
        let outbound = Outbound::RoomJoined {
            room_name: "lobby".to_string(),
            member_count: 2,
            history: vec![],
        };

        // when (操作):
        let value: serde_json::Value = serde_json::from_str(&outbound.to_json()).unwrap();

        // then (期待する結果):
        assert_eq!(value["type"], "room.joined");
        assert_eq!(value["data"]["roomName"], "lobby");
        assert_eq!(value["data"]["memberCount"], 2);
        assert!(value["data"]["history"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_outbound_error_envelope_shape() {
        // テスト項目: error エンベロープの形状
        // given (前提条件):
        let outbound = Outbound::Error {
            message: "rate limit".to_string(),
        };

        // when (操作):
        let value: serde_json::Value = serde_json::from_str(&outbound.to_json()).unwrap();

        // then (期待する結果):
        assert_eq!(
            value,
            json!({"type": "error", "data": {"message": "rate limit"}})
        );
    }
}
