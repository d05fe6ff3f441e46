use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::conversation::Conversation;
use crate::message::Message;

/// Server -> client frames on the live channel.
///
/// `newMessage` signals a group message by the presence of
/// `conversationId`; direct messages omit it and carry `recipientId`
/// instead, so a sender's other sessions can match the event to an open
/// conversation without guessing from `senderId`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerEvent {
    Hello {
        heartbeat_interval_ms: u64,
    },
    Ready {
        user_id: i64,
        online_user_ids: Vec<i64>,
    },
    HeartbeatAck,
    NewMessage {
        id: i64,
        sender_id: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        conversation_id: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        recipient_id: Option<i64>,
        #[serde(skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        image: Option<String>,
        created_at: DateTime<Utc>,
    },
    PresenceChanged {
        user_id: i64,
        online: bool,
    },
}

impl ServerEvent {
    pub fn new_message(message: &Message) -> Self {
        let (conversation_id, recipient_id) = match message.conversation {
            Conversation::Group { group_id } => (Some(group_id), None),
            Conversation::Direct { peer_id } => (None, Some(peer_id)),
        };
        ServerEvent::NewMessage {
            id: message.id,
            sender_id: message.sender_id,
            conversation_id,
            recipient_id,
            text: message.text.clone(),
            image: message.image.clone(),
            created_at: message.created_at,
        }
    }

    pub fn presence_changed(user_id: i64, online: bool) -> Self {
        ServerEvent::PresenceChanged { user_id, online }
    }
}

/// Client -> server frames on the live channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientEvent {
    Identify { token: String },
    Heartbeat,
}
