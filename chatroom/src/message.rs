use chrono::{DateTime, Utc};
use comms::document::ChatDocument;

/// A chat message. Immutable once created; this client never edits or deletes one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub author: String,
    pub body: String,
    pub room: String,
    pub created_at: DateTime<Utc>,
}

/// Reference to a message the backend has accepted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRef {
    pub id: String,
}

impl From<ChatDocument> for Message {
    fn from(doc: ChatDocument) -> Self {
        Message {
            author: doc.username,
            body: doc.message,
            room: doc.room,
            created_at: doc.created_at,
        }
    }
}

impl From<&Message> for ChatDocument {
    fn from(message: &Message) -> Self {
        ChatDocument {
            username: message.author.clone(),
            message: message.body.clone(),
            room: message.room.clone(),
            created_at: message.created_at,
        }
    }
}
