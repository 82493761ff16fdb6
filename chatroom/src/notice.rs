use std::time::{Duration, Instant};

use crate::error::AuthError;

/// How long an error stays on screen
pub const ERROR_DISPLAY: Duration = Duration::from_secs(5);
/// How long a success confirmation stays on screen
pub const SUCCESS_DISPLAY: Duration = Duration::from_secs(3);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    Error,
    Success,
}

/// A user facing message that dismisses itself after a fixed window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub kind: NoticeKind,
    pub text: String,
    expires_at: Instant,
}

impl Notice {
    fn new(kind: NoticeKind, text: String, display_for: Duration) -> Self {
        Notice {
            kind,
            text,
            expires_at: Instant::now() + display_for,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(NoticeKind::Error, text.into(), ERROR_DISPLAY)
    }

    pub fn auth_error(err: &AuthError) -> Self {
        Self::error(err.user_message())
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(NoticeKind::Success, text.into(), SUCCESS_DISPLAY)
    }

    pub fn name_updated(name: &str) -> Self {
        Self::success(format!("Your name has been updated to {}", name))
    }

    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_errors_outlive_confirmations() {
        let error = Notice::auth_error(&AuthError::WrongPassword);
        let success = Notice::name_updated("luigi");
        let now = Instant::now();

        assert_eq!(error.kind, NoticeKind::Error);
        assert_eq!(error.text, "Incorrect password, please try again.");
        assert_eq!(success.text, "Your name has been updated to luigi");

        let after_success_window = success.expires_at() + Duration::from_millis(1);
        assert!(!success.is_expired_at(now));
        assert!(success.is_expired_at(after_success_window));
        assert!(!error.is_expired_at(after_success_window));
        assert!(error.is_expired_at(error.expires_at()));
    }
}
