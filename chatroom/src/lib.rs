//! Client core of a room based chat on top of a document store and an auth provider.
//!
//! [RoomSession] keeps exactly one live query open for the active room and posts messages to it,
//! [MessageListView] is the surface arrivals are rendered on, and [IdentityGate] handles
//! sign up, log in and log out while keeping the locally stored identity in line with the provider.

pub mod backend;
pub mod error;
pub mod identity_gate;
pub mod local_store;
pub mod message;
pub mod message_list;
pub mod notice;
pub mod relative_time;
pub mod room_session;

pub use self::error::{
    AuthError, Field, IdentityError, PostError, ProviderError, SubscriptionError, ValidationError,
};
pub use self::identity_gate::{Identity, IdentityGate, Resume};
pub use self::message::{Message, MessageRef};
pub use self::message_list::{MessageList, MessageListView};
pub use self::room_session::{RoomSession, SessionState};
