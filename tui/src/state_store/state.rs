use std::{sync::Arc, time::Instant};

use chatroom::{
    identity_gate::{Identity, Resume},
    message_list::MessageList,
    notice::Notice,
    room_session::DEFAULT_ROOM,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Page {
    Auth,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthMode {
    SignUp,
    LogIn,
}

impl AuthMode {
    pub fn toggled(self) -> Self {
        match self {
            AuthMode::SignUp => AuthMode::LogIn,
            AuthMode::LogIn => AuthMode::SignUp,
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            AuthMode::SignUp => "Sign Up",
            AuthMode::LogIn => "Log In",
        }
    }
}

/// A room offered in the room list
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub name: String,
    pub description: String,
}

const ROOMS: [(&str, &str); 4] = [
    ("general", "General discussions and community bonding"),
    ("gaming", "Discuss games and gaming hardware"),
    ("music", "Share what you are listening to"),
    ("ninjas", "For the stealthy ones"),
];

/// State holds the state of the application
#[derive(Debug, Clone)]
pub struct State {
    pub page: Page,
    pub auth_mode: AuthMode,
    /// An auth request is in flight
    pub auth_pending: bool,
    pub display_name: String,
    pub backend_addr: String,
    pub rooms: Vec<RoomInfo>,
    pub active_room: String,
    /// Messages of the active room, shared with the published snapshots until it changes
    pub messages: Arc<MessageList>,
    pub notice: Option<Notice>,
    /// Posts that have not been acknowledged yet
    pub pending_posts: usize,
    /// Seconds spent on the chat page
    pub timer: usize,
}

impl State {
    pub fn new(backend_addr: &str, display_name: &str) -> Self {
        State {
            page: Page::Auth,
            auth_mode: AuthMode::SignUp,
            auth_pending: false,
            display_name: String::from(display_name),
            backend_addr: String::from(backend_addr),
            rooms: ROOMS
                .iter()
                .map(|(name, description)| RoomInfo {
                    name: String::from(*name),
                    description: String::from(*description),
                })
                .collect(),
            active_room: String::from(DEFAULT_ROOM),
            messages: Arc::default(),
            notice: None,
            pending_posts: 0,
            timer: 0,
        }
    }

    pub fn active_room_info(&self) -> Option<&RoomInfo> {
        self.rooms.iter().find(|room| room.name == self.active_room)
    }

    /// Pick the starting page from what the identity gate found
    pub fn apply_resume(&mut self, resume: &Resume) {
        match resume {
            Resume::SignedIn(identity) => self.enter_chat(identity),
            Resume::SignedOut { returning } => {
                self.page = Page::Auth;
                self.auth_mode = if *returning {
                    AuthMode::LogIn
                } else {
                    AuthMode::SignUp
                };
            }
        }
    }

    pub fn enter_chat(&mut self, identity: &Identity) {
        self.display_name = identity.display_name.clone();
        self.page = Page::Chat;
        self.timer = 0;
    }

    pub fn leave_chat(&mut self) {
        self.page = Page::Auth;
        self.auth_mode = AuthMode::LogIn;
        self.pending_posts = 0;
        self.messages = Arc::default();
    }

    /// The message list for editing, copied first if a published snapshot still holds it
    pub fn messages_mut(&mut self) -> &mut MessageList {
        Arc::make_mut(&mut self.messages)
    }

    pub fn show(&mut self, notice: Notice) {
        self.notice = Some(notice);
    }

    /// Drops an expired notice and advances the timer
    /// Drops the notice once its display time ran out, true when it did
    pub fn expire_notice(&mut self, now: Instant) -> bool {
        let is_expired = self.notice.as_ref().is_some_and(|n| n.is_expired_at(now));
        if is_expired {
            self.notice = None;
        }

        is_expired
    }

    pub fn tick(&mut self, now: Instant) {
        self.expire_notice(now);

        if self.page == Page::Chat {
            self.timer += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use chatroom::{notice::ERROR_DISPLAY, MessageListView};

    use super::*;

    #[test]
    fn test_returning_users_land_on_log_in() {
        let mut state = State::new("localhost:8080", "anon");

        state.apply_resume(&Resume::SignedOut { returning: true });
        assert_eq!((state.page, state.auth_mode), (Page::Auth, AuthMode::LogIn));

        state.apply_resume(&Resume::SignedOut { returning: false });
        assert_eq!((state.page, state.auth_mode), (Page::Auth, AuthMode::SignUp));

        state.apply_resume(&Resume::SignedIn(Identity {
            display_name: "wario".into(),
            session_active: true,
        }));
        assert_eq!(state.page, Page::Chat);
        assert_eq!(state.display_name, "wario");
        assert_eq!(state.active_room_info().map(|r| r.name.as_str()), Some("general"));
    }

    #[test]
    fn test_toggling_twice_returns_to_the_same_mode() {
        assert_eq!(AuthMode::SignUp.toggled(), AuthMode::LogIn);
        assert_eq!(AuthMode::SignUp.toggled().toggled(), AuthMode::SignUp);
    }

    #[test]
    fn test_published_snapshots_share_the_message_list() {
        let mut state = State::new("localhost:8080", "anon");
        let published = state.clone();

        state.tick(Instant::now());
        assert!(Arc::ptr_eq(&state.messages, &published.messages));

        state.messages_mut().clear();
        assert!(!Arc::ptr_eq(&state.messages, &published.messages));
    }

    #[test]
    fn test_notices_expire_on_tick() {
        let mut state = State::new("localhost:8080", "anon");
        state.show(Notice::error("boom"));

        state.tick(Instant::now());
        assert!(state.notice.is_some());

        state.tick(Instant::now() + ERROR_DISPLAY + Duration::from_millis(1));
        assert!(state.notice.is_none());
    }

    #[test]
    fn test_expire_notice_reports_a_change_once() {
        let mut state = State::new("localhost:8080", "anon");
        assert!(!state.expire_notice(Instant::now()));

        state.show(Notice::error("boom"));
        let later = Instant::now() + ERROR_DISPLAY + Duration::from_millis(1);

        assert!(!state.expire_notice(Instant::now()));
        assert!(state.expire_notice(later));
        assert!(!state.expire_notice(later));
        assert!(state.notice.is_none());
    }
}
