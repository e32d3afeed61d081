//! WebSocket frame DTOs for the chat server.

use chrono::{DateTime, Utc};
use murmur_shared::time::format_created_at;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::domain::{MessageType, OutboundEvent, ProtocolError};

/// First frame a client must send
#[derive(Debug, Clone, Deserialize)]
pub struct AuthFrame {
    pub r#type: String,
    #[serde(default)]
    pub token: String,
}

impl AuthFrame {
    /// Parse and check the frame type.
    ///
    /// # Errors
    ///
    /// `ProtocolError::Malformed` when the text is not an auth-shaped JSON object,
    /// `ProtocolError::UnexpectedType` when `type` is not `"auth"`.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let frame: Self =
            serde_json::from_str(text).map_err(|e| ProtocolError::Malformed(e.to_string()))?;
        if frame.r#type != "auth" {
            return Err(ProtocolError::UnexpectedType(frame.r#type));
        }
        Ok(frame)
    }
}

/// Content frame sent after authentication.
///
/// Either a bare string (the whole frame is the content) or a JSON object with
/// any subset of the fields below. Missing fields and values of the wrong type
/// fall back to their defaults, so decoding never fails.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct InboundPayload {
    #[serde(deserialize_with = "lenient_string")]
    pub content: String,
    #[serde(rename = "messageType", deserialize_with = "lenient_message_type")]
    pub message_type: MessageType,
    #[serde(rename = "fileUrl", deserialize_with = "lenient_string")]
    pub file_url: String,
    #[serde(rename = "fileName", deserialize_with = "lenient_string")]
    pub file_name: String,
    #[serde(rename = "fileSize", deserialize_with = "lenient_u64")]
    pub file_size: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub target: u64,
    #[serde(deserialize_with = "lenient_u64")]
    pub group_id: u64,
}

impl InboundPayload {
    pub fn decode(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(value @ Value::Object(_)) => {
                serde_json::from_value(value).unwrap_or_else(|_| Self::plain(text))
            }
            _ => Self::plain(text),
        }
    }

    fn plain(text: &str) -> Self {
        Self {
            content: text.to_string(),
            ..Self::default()
        }
    }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f as u64)
            })
            .unwrap_or(0),
        _ => 0,
    })
}

fn lenient_message_type<'de, D>(deserializer: D) -> Result<MessageType, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => MessageType::from_wire(&s),
        _ => MessageType::Text,
    })
}

/// Frame pushed to clients for every routed event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundFrame {
    pub r#type: String,
    pub user_id: u64,
    pub username: String,
    pub content: String,
    pub message_type: MessageType,
    pub file_url: String,
    pub file_name: String,
    pub file_size: u64,
    pub target: u64,
    pub group_id: u64,
    pub created_at: String,
}

impl OutboundFrame {
    /// Build the frame for an event. Join and leave events carry no timestamp
    /// of their own and are stamped with `dispatched_at`.
    pub fn from_event(event: &OutboundEvent, dispatched_at: DateTime<Utc>) -> Self {
        let notice = |user_id: u64, username: &str, content: String, group_id: u64| Self {
            r#type: event.kind().to_string(),
            user_id,
            username: username.to_string(),
            content,
            message_type: MessageType::Text,
            file_url: String::new(),
            file_name: String::new(),
            file_size: 0,
            target: 0,
            group_id,
            created_at: format_created_at(dispatched_at),
        };

        match event {
            OutboundEvent::Message(msg) => Self {
                r#type: event.kind().to_string(),
                user_id: msg.sender_id.value(),
                username: msg.sender_name.clone(),
                content: msg.content.clone(),
                message_type: msg.message_type,
                file_url: msg.file_url.clone(),
                file_name: msg.file_name.clone(),
                file_size: msg.file_size,
                target: msg.target.map_or(0, |t| t.value()),
                group_id: msg.group_id.map_or(0, |g| g.value()),
                created_at: format_created_at(msg.created_at),
            },
            OutboundEvent::UserJoined { user_id, username } => {
                notice(user_id.value(), username, format!("{username} joined"), 0)
            }
            OutboundEvent::UserLeft { user_id, username } => {
                notice(user_id.value(), username, format!("{username} left"), 0)
            }
            OutboundEvent::GroupMemberJoined {
                user_id,
                username,
                group_id,
            } => notice(
                user_id.value(),
                username,
                format!("{username} joined the group"),
                group_id.map_or(0, |g| g.value()),
            ),
            OutboundEvent::GroupMemberLeft {
                user_id,
                username,
                group_id,
            } => notice(
                user_id.value(),
                username,
                format!("{username} left the group"),
                group_id.map_or(0, |g| g.value()),
            ),
        }
    }
}
