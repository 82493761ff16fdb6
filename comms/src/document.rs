use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A chat message as it is stored in the `chats` collection.
///
/// Field names follow the collection layout, not the client's naming.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatDocument {
    /// Display name of the author at the time of posting
    pub username: String,
    /// The message body
    pub message: String,
    /// The room the message was posted to
    pub room: String,
    /// Stamped by the client when the message was submitted
    pub created_at: DateTime<Utc>,
}

/// How a document changed within a live query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Modified,
    Removed,
}

/// A single change reported by a live query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChange {
    #[serde(rename = "k")]
    pub kind: ChangeKind,
    /// Server generated id of the document
    #[serde(rename = "i")]
    pub id: String,
    #[serde(rename = "d")]
    pub doc: ChatDocument,
}

/// An account known to the auth provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub uid: String,
    pub email: String,
}
