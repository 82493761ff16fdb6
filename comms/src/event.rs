use serde::{Deserialize, Serialize};

use crate::{
    command::RequestId,
    document::{AuthUser, DocumentChange},
};

/// Data carried by a successful reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "k", rename_all = "snake_case")]
pub enum ReplyPayload {
    /// The command succeeded and has nothing to report (sign out, listen)
    None,
    /// The command resolved to an account (sign up, sign in)
    User(AuthUser),
    /// The command stored a document under the given id
    Document { id: String },
}

/// A command has succeeded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OkReplyEvent {
    #[serde(rename = "r")]
    pub request_id: RequestId,
    #[serde(rename = "p")]
    pub payload: ReplyPayload,
}

/// A command has been rejected by the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedReplyEvent {
    #[serde(rename = "r")]
    pub request_id: RequestId,
    /// Vendor error code, e.g. `auth/wrong-password` or `invalid-argument`
    pub code: String,
    /// Human readable explanation, for logs
    pub message: String,
}

/// A batch of changes for a live query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotEvent {
    #[serde(rename = "l")]
    pub listener_id: RequestId,
    pub changes: Vec<DocumentChange>,
}

/// A live query has failed and will not deliver anything more
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenFailedEvent {
    #[serde(rename = "l")]
    pub listener_id: RequestId,
    pub code: String,
}

/// The signed in account of the connection has changed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthStateEvent {
    pub user: Option<AuthUser>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
/// Events that can be sent to the client
/// Replies answer a single request, the rest are pushed whenever the backend has news for the connection
pub enum Event {
    Ok(OkReplyEvent),
    Failed(FailedReplyEvent),
    Snapshot(SnapshotEvent),
    ListenFailed(ListenFailedEvent),
    AuthState(AuthStateEvent),
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::document::{ChangeKind, ChatDocument};

    // given an event enum, and an expect string, asserts that event is serialized / deserialized appropiately
    fn assert_event_serialization(event: &Event, expected: &str) {
        let serialized = serde_json::to_string(&event).unwrap();
        assert_eq!(serialized, expected);
        let deserialized: Event = serde_json::from_str(&serialized).unwrap();
        assert_eq!(deserialized, *event);
    }

    #[test]
    fn test_ok_reply_events() {
        let none = Event::Ok(OkReplyEvent {
            request_id: 1,
            payload: ReplyPayload::None,
        });
        let document = Event::Ok(OkReplyEvent {
            request_id: 2,
            payload: ReplyPayload::Document { id: "abc".into() },
        });

        assert_event_serialization(&none, r#"{"t":"ok","r":1,"p":{"k":"none"}}"#);
        assert_event_serialization(
            &document,
            r#"{"t":"ok","r":2,"p":{"k":"document","id":"abc"}}"#,
        );
    }

    #[test]
    fn test_failed_reply_event() {
        let event = Event::Failed(FailedReplyEvent {
            request_id: 4,
            code: "auth/wrong-password".into(),
            message: "the password is invalid".into(),
        });

        assert_event_serialization(
            &event,
            r#"{"t":"failed","r":4,"code":"auth/wrong-password","message":"the password is invalid"}"#,
        );
    }

    #[test]
    fn test_snapshot_event() {
        let event = Event::Snapshot(SnapshotEvent {
            listener_id: 9,
            changes: vec![DocumentChange {
                kind: ChangeKind::Added,
                id: "m1".into(),
                doc: ChatDocument {
                    username: "anon".into(),
                    message: "hi".into(),
                    room: "general".into(),
                    created_at: Utc.with_ymd_and_hms(2024, 1, 2, 3, 4, 5).unwrap(),
                },
            }],
        });

        assert_event_serialization(
            &event,
            r#"{"t":"snapshot","l":9,"changes":[{"k":"added","i":"m1","d":{"username":"anon","message":"hi","room":"general","created_at":"2024-01-02T03:04:05Z"}}]}"#,
        );
    }

    #[test]
    fn test_signed_out_auth_state_event() {
        let event = Event::AuthState(AuthStateEvent { user: None });

        assert_event_serialization(&event, r#"{"t":"auth_state","user":null}"#);
    }
}
