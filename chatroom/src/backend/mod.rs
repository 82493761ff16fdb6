//! Collaborators the chat client relies on: an append-only message store with live queries,
//! and an email + password auth provider.
//!
//! [memory] implements both in process, [remote] talks to a backend over the `comms` transport.

use std::{fmt, pin::Pin};

use async_trait::async_trait;
use tokio::sync::watch;
use tokio_stream::Stream;

pub use comms::document::{AuthUser, ChangeKind};
use comms::document::ChatDocument;

use crate::{
    error::{PostError, ProviderError, SubscriptionError},
    message::{Message, MessageRef},
};

pub mod memory;
pub mod remote;

pub type BoxedStream<Item> = Pin<Box<dyn Stream<Item = Item> + Send>>;

/// Messages of a single room, ordered by `created_at` ascending
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomQuery {
    pub room: String,
}

impl RoomQuery {
    pub fn new(room: &str) -> Self {
        RoomQuery {
            room: String::from(room),
        }
    }

    pub fn matches(&self, message: &Message) -> bool {
        message.room == self.room
    }
}

/// A change to one document, as reported by a live query
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Change {
    pub kind: ChangeKind,
    pub id: String,
    pub message: Message,
}

impl From<comms::document::DocumentChange> for Change {
    fn from(change: comms::document::DocumentChange) -> Self {
        Change {
            kind: change.kind,
            id: change.id,
            message: Message::from(change.doc),
        }
    }
}

impl From<Change> for comms::document::DocumentChange {
    fn from(change: Change) -> Self {
        comms::document::DocumentChange {
            kind: change.kind,
            id: change.id,
            doc: ChatDocument::from(&change.message),
        }
    }
}

/// Every item is one batch of changes; an error ends the query.
pub type ChangeBatch = Result<Vec<Change>, SubscriptionError>;

/// Removes a listener from the backend. Removal happens at most once,
/// either through [ListenerRegistration::remove] or when the registration is dropped.
pub struct ListenerRegistration {
    remove: Option<Box<dyn FnOnce() + Send>>,
}

impl ListenerRegistration {
    pub fn new(remove: impl FnOnce() + Send + 'static) -> Self {
        ListenerRegistration {
            remove: Some(Box::new(remove)),
        }
    }

    pub fn remove(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if let Some(remove) = self.remove.take() {
            remove();
        }
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.release();
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("removed", &self.remove.is_none())
            .finish()
    }
}

/// A standing query. `changes` starts with the current matching documents as `Added`
/// and then keeps delivering incremental changes until the registration is removed.
pub struct LiveQuery {
    pub changes: BoxedStream<ChangeBatch>,
    pub registration: ListenerRegistration,
}

/// Append-only message collection with live queries
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Append a message, returning the id the backend stored it under
    async fn add(&self, message: &Message) -> Result<MessageRef, PostError>;

    /// Open a live query for the messages of a room
    async fn listen(&self, query: RoomQuery) -> Result<LiveQuery, SubscriptionError>;
}

/// Email + password accounts
#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn create_user(&self, email: &str, password: &str) -> Result<AuthUser, ProviderError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Receives the signed in account whenever it changes
    fn auth_state(&self) -> watch::Receiver<Option<AuthUser>>;

    fn current_user(&self) -> Option<AuthUser> {
        let auth_state = self.auth_state();
        let user = auth_state.borrow().clone();

        user
    }
}
