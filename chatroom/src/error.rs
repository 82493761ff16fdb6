//! Error taxonomy of the chat client.
//!
//! Validation errors never reach the backend. Everything the backend reports is translated
//! into one of the closed enums below before it reaches the UI.

use std::fmt;

use thiserror::Error;

/// A form field that has to be filled in before talking to the auth provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    DisplayName,
    Email,
    Password,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::DisplayName => "display_name",
            Field::Email => "email",
            Field::Password => "password",
        }
    }

    fn label(&self) -> &'static str {
        match self {
            Field::DisplayName => "display name",
            Field::Email => "email",
            Field::Password => "password",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Client side validation failure, detected before any network call
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is required")]
    MissingField(Field),
}

/// Failure reported by an auth provider, in the provider's own vocabulary
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ProviderError {
    pub code: String,
    pub message: String,
}

pub const NETWORK_REQUEST_FAILED: &str = "auth/network-request-failed";
pub const INTERNAL_ERROR: &str = "auth/internal-error";

impl ProviderError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        ProviderError {
            code: String::from(code),
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(NETWORK_REQUEST_FAILED, message)
    }
}

/// Account lifecycle failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("password is too weak")]
    WeakPassword,
    #[error("email address is malformed")]
    InvalidEmail,
    #[error("email address is already in use")]
    EmailInUse,
    #[error("password is wrong")]
    WrongPassword,
    #[error("no account for this email address")]
    UserNotFound,
    #[error("auth provider failed with '{0}'")]
    Unknown(String),
}

/// Vendor codes and the variant each one maps to. Codes not listed become [AuthError::Unknown].
const AUTH_ERROR_CODES: &[(&str, AuthError)] = &[
    ("auth/weak-password", AuthError::WeakPassword),
    ("auth/invalid-email", AuthError::InvalidEmail),
    ("auth/email-already-in-use", AuthError::EmailInUse),
    ("auth/wrong-password", AuthError::WrongPassword),
    ("auth/user-not-found", AuthError::UserNotFound),
];

impl AuthError {
    pub fn from_code(code: &str) -> Self {
        AUTH_ERROR_CODES
            .iter()
            .find(|(known, _)| *known == code)
            .map(|(_, err)| err.clone())
            .unwrap_or_else(|| AuthError::Unknown(String::from(code)))
    }

    /// The text shown to the user for this error
    pub fn user_message(&self) -> String {
        match self {
            AuthError::Validation(ValidationError::MissingField(field)) => {
                format!("Please enter your {}.", field.label())
            }
            AuthError::WeakPassword => "Password should be at least 6 characters.".into(),
            AuthError::InvalidEmail => "That email address is not valid.".into(),
            AuthError::EmailInUse => "An account with that email already exists.".into(),
            AuthError::WrongPassword => "Incorrect password, please try again.".into(),
            AuthError::UserNotFound => "No account found with that email.".into(),
            AuthError::Unknown(code) => format!("Something went wrong ({}), please try again.", code),
        }
    }
}

impl From<ProviderError> for AuthError {
    fn from(err: ProviderError) -> Self {
        AuthError::from_code(&err.code)
    }
}

/// Posting a message has failed
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PostError {
    #[error("could not reach the backend: {0}")]
    Network(String),
    #[error("message rejected by the backend ({code}): {message}")]
    Rejected { code: String, message: String },
}

impl PostError {
    pub fn code(&self) -> &str {
        match self {
            PostError::Network(_) => "unavailable",
            PostError::Rejected { code, .. } => code,
        }
    }
}

/// A live query has failed. Fatal to that subscription only; nothing retries it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    #[error("live query rejected by the backend ({code})")]
    Rejected { code: String },
    #[error("live query fell behind and missed {0} changes")]
    Lagged(u64),
    #[error("connection to the backend was lost")]
    Disconnected,
}

impl SubscriptionError {
    pub fn code(&self) -> &str {
        match self {
            SubscriptionError::Rejected { code } => code,
            SubscriptionError::Lagged(_) => "resource-exhausted",
            SubscriptionError::Disconnected => "unavailable",
        }
    }
}

/// Changing the display name failed
#[derive(Error, Debug)]
pub enum IdentityError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("could not store the display name")]
    Store(#[from] anyhow::Error),
}
