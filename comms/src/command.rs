use serde::{Deserialize, Serialize};

use crate::document::ChatDocument;

/// Identifies a request so its reply can be routed back to the caller.
pub type RequestId = u64;

/// Command for creating an email + password account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignUpCommand {
    #[serde(rename = "r")]
    pub request_id: RequestId,
    pub email: String,
    pub password: String,
}

/// Command for signing in to an existing account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignInCommand {
    #[serde(rename = "r")]
    pub request_id: RequestId,
    pub email: String,
    pub password: String,
}

/// Command for signing out of the current account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignOutCommand {
    #[serde(rename = "r")]
    pub request_id: RequestId,
}

/// Command for appending a message document to the collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddMessageCommand {
    #[serde(rename = "r")]
    pub request_id: RequestId,
    #[serde(rename = "d")]
    pub doc: ChatDocument,
}

/// Command for opening a live query over the messages of a room.
/// The request id doubles as the listener id for the lifetime of the query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenCommand {
    #[serde(rename = "r")]
    pub request_id: RequestId,
    pub room: String,
}

/// Command for closing a live query. Closing an unknown listener is a no-op.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnlistenCommand {
    #[serde(rename = "l")]
    pub listener_id: RequestId,
}

/// A command which can be sent to the backend by a single client connection.
/// Auth state is scoped to the connection the commands arrive on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "_ct", rename_all = "snake_case")]
pub enum UserCommand {
    SignUp(SignUpCommand),
    SignIn(SignInCommand),
    SignOut(SignOutCommand),
    AddMessage(AddMessageCommand),
    Listen(ListenCommand),
    Unlisten(UnlistenCommand),
}

impl UserCommand {
    /// The id the backend will answer to, if the command expects a reply
    pub fn request_id(&self) -> Option<RequestId> {
        match self {
            UserCommand::SignUp(cmd) => Some(cmd.request_id),
            UserCommand::SignIn(cmd) => Some(cmd.request_id),
            UserCommand::SignOut(cmd) => Some(cmd.request_id),
            UserCommand::AddMessage(cmd) => Some(cmd.request_id),
            UserCommand::Listen(cmd) => Some(cmd.request_id),
            UserCommand::Unlisten(_) => None,
        }
    }
}
