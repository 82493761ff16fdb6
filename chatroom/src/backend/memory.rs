//! In-process implementation of the collaborators.
//!
//! A [MemoryDatabase] is shared between any number of [MemoryBackend] handles, each handle
//! having its own signed in account, the same way every client of a hosted backend does.
//! Nothing is persisted.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use log::debug;
use nanoid::nanoid;
use parking_lot::Mutex;
use tokio::sync::{broadcast, watch};
use tokio_stream::{
    wrappers::{errors::BroadcastStreamRecvError, BroadcastStream},
    StreamExt,
};

use super::{
    AuthProvider, AuthUser, Change, ChangeKind, ListenerRegistration, LiveQuery, MessageStore,
    RoomQuery,
};
use crate::{
    error::{PostError, ProviderError, SubscriptionError},
    message::{Message, MessageRef},
};

/// Per room, a power of two so the channel holds exactly this many
const CHANGES_CHANNEL_CAPACITY: usize = 128;
const MAX_BODY_CHARS: usize = 2000;
const MIN_PASSWORD_CHARS: usize = 6;

#[derive(Debug, Clone)]
struct StoredMessage {
    id: String,
    message: Message,
}

impl StoredMessage {
    fn added(&self) -> Change {
        Change {
            kind: ChangeKind::Added,
            id: self.id.clone(),
            message: self.message.clone(),
        }
    }
}

#[derive(Debug)]
struct Account {
    uid: String,
    // plain text, accounts live only as long as the process
    password: String,
}

/// Stored messages and the change feed of every room someone listens to
#[derive(Debug, Default)]
struct Collection {
    messages: Vec<StoredMessage>,
    feeds: HashMap<String, broadcast::Sender<StoredMessage>>,
}

impl Collection {
    fn feed(&mut self, room: &str) -> &broadcast::Sender<StoredMessage> {
        self.feeds
            .entry(String::from(room))
            .or_insert_with(|| broadcast::channel(CHANGES_CHANNEL_CAPACITY).0)
    }

    fn publish(&mut self, stored: &StoredMessage) {
        let room = &stored.message.room;
        let unheard = match self.feeds.get(room) {
            Some(feed) => feed.send(stored.clone()).is_err(),
            None => false,
        };

        // nobody listens to the room anymore
        if unheard {
            self.feeds.remove(room);
        }
    }
}

/// The collection of chat messages and the accounts of the auth provider
#[derive(Debug)]
pub struct MemoryDatabase {
    documents: Mutex<Collection>,
    accounts: Mutex<HashMap<String, Account>>,
    active_listeners: Arc<AtomicUsize>,
    auth_requests: AtomicUsize,
}

impl MemoryDatabase {
    pub fn new() -> Arc<Self> {
        Arc::new(MemoryDatabase {
            documents: Mutex::new(Collection::default()),
            accounts: Mutex::new(HashMap::new()),
            active_listeners: Arc::new(AtomicUsize::new(0)),
            auth_requests: AtomicUsize::new(0),
        })
    }

    /// Number of live queries whose registration has not been removed yet
    pub fn active_listeners(&self) -> usize {
        self.active_listeners.load(Ordering::SeqCst)
    }

    /// Number of open receivers across the change feeds of all rooms
    pub fn feed_receivers(&self) -> usize {
        self.documents
            .lock()
            .feeds
            .values()
            .map(|feed| feed.receiver_count())
            .sum()
    }

    /// Number of calls made to the auth provider, across all handles
    pub fn auth_requests(&self) -> usize {
        self.auth_requests.load(Ordering::SeqCst)
    }

    /// Stored messages of a room, in insertion order
    pub fn messages_in(&self, room: &str) -> Vec<Message> {
        self.documents
            .lock()
            .messages
            .iter()
            .filter(|stored| stored.message.room == room)
            .map(|stored| stored.message.clone())
            .collect()
    }

    fn insert(&self, message: &Message) -> Result<MessageRef, PostError> {
        if message.body.trim().is_empty() {
            return Err(PostError::Rejected {
                code: "invalid-argument".into(),
                message: "message body is empty".into(),
            });
        }

        if message.body.chars().count() > MAX_BODY_CHARS {
            return Err(PostError::Rejected {
                code: "invalid-argument".into(),
                message: format!("message body exceeds {} characters", MAX_BODY_CHARS),
            });
        }

        let stored = StoredMessage {
            id: nanoid!(),
            message: message.clone(),
        };

        // publishing while the lock is held keeps every message either in a listener's
        // snapshot or in its channel, never both
        let mut documents = self.documents.lock();
        documents.messages.push(stored.clone());
        documents.publish(&stored);

        Ok(MessageRef { id: stored.id })
    }

    fn listen(&self, query: RoomQuery) -> LiveQuery {
        let (snapshot, changes_rx) = {
            let mut documents = self.documents.lock();
            let mut snapshot: Vec<Change> = documents
                .messages
                .iter()
                .filter(|stored| query.matches(&stored.message))
                .map(StoredMessage::added)
                .collect();
            snapshot.sort_by_key(|change| change.message.created_at);

            (snapshot, documents.feed(&query.room).subscribe())
        };

        self.active_listeners.fetch_add(1, Ordering::SeqCst);
        debug!("opened live query for room '{}'", query.room);

        let incremental = BroadcastStream::new(changes_rx).filter_map(move |result| match result {
            Ok(stored) if query.matches(&stored.message) => Some(Ok(vec![stored.added()])),
            Ok(_) => None,
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                Some(Err(SubscriptionError::Lagged(missed)))
            }
        });

        let active_listeners = self.active_listeners.clone();

        LiveQuery {
            changes: Box::pin(
                tokio_stream::once(Ok::<_, SubscriptionError>(snapshot)).chain(incremental),
            ),
            registration: ListenerRegistration::new(move || {
                active_listeners.fetch_sub(1, Ordering::SeqCst);
            }),
        }
    }

    fn create_account(&self, email: &str, password: &str) -> Result<AuthUser, ProviderError> {
        let email = normalize_email(email)?;

        if password.chars().count() < MIN_PASSWORD_CHARS {
            return Err(ProviderError::new(
                "auth/weak-password",
                format!("password should be at least {} characters", MIN_PASSWORD_CHARS),
            ));
        }

        let mut accounts = self.accounts.lock();
        if accounts.contains_key(&email) {
            return Err(ProviderError::new(
                "auth/email-already-in-use",
                "the email address is already in use by another account",
            ));
        }

        let uid = nanoid!();
        accounts.insert(
            email.clone(),
            Account {
                uid: uid.clone(),
                password: String::from(password),
            },
        );

        Ok(AuthUser { uid, email })
    }

    fn verify_account(&self, email: &str, password: &str) -> Result<AuthUser, ProviderError> {
        let email = normalize_email(email)?;
        let accounts = self.accounts.lock();
        let account = accounts.get(&email).ok_or_else(|| {
            ProviderError::new("auth/user-not-found", "there is no account for this email")
        })?;

        if account.password != password {
            return Err(ProviderError::new(
                "auth/wrong-password",
                "the password is invalid",
            ));
        }

        Ok(AuthUser {
            uid: account.uid.clone(),
            email,
        })
    }

    fn count_auth_request(&self) {
        self.auth_requests.fetch_add(1, Ordering::SeqCst);
    }
}

/// Lower cases the address and checks it has a local part and a dotted domain
fn normalize_email(email: &str) -> Result<String, ProviderError> {
    let email = email.trim().to_lowercase();
    let is_valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain
                    .split_once('.')
                    .map(|(name, tld)| !name.is_empty() && !tld.is_empty() && !tld.ends_with('.'))
                    .unwrap_or(false)
        }
        None => false,
    };

    if is_valid {
        Ok(email)
    } else {
        Err(ProviderError::new(
            "auth/invalid-email",
            "the email address is badly formatted",
        ))
    }
}

/// A single client's view of a [MemoryDatabase]
#[derive(Debug)]
pub struct MemoryBackend {
    database: Arc<MemoryDatabase>,
    auth_state_tx: watch::Sender<Option<AuthUser>>,
}

impl MemoryBackend {
    pub fn new(database: Arc<MemoryDatabase>) -> Self {
        let (auth_state_tx, _) = watch::channel(None);

        MemoryBackend {
            database,
            auth_state_tx,
        }
    }

    pub fn database(&self) -> &Arc<MemoryDatabase> {
        &self.database
    }
}

#[async_trait]
impl MessageStore for MemoryBackend {
    async fn add(&self, message: &Message) -> Result<MessageRef, PostError> {
        self.database.insert(message)
    }

    async fn listen(&self, query: RoomQuery) -> Result<LiveQuery, SubscriptionError> {
        Ok(self.database.listen(query))
    }
}

#[async_trait]
impl AuthProvider for MemoryBackend {
    async fn create_user(&self, email: &str, password: &str) -> Result<AuthUser, ProviderError> {
        self.database.count_auth_request();
        let user = self.database.create_account(email, password)?;
        self.auth_state_tx.send_replace(Some(user.clone()));

        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, ProviderError> {
        self.database.count_auth_request();
        let user = self.database.verify_account(email, password)?;
        self.auth_state_tx.send_replace(Some(user.clone()));

        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.database.count_auth_request();
        self.auth_state_tx.send_replace(None);

        Ok(())
    }

    fn auth_state(&self) -> watch::Receiver<Option<AuthUser>> {
        self.auth_state_tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};

    use super::*;

    fn message(room: &str, body: &str, minute: u32) -> Message {
        Message {
            author: "mario".into(),
            body: body.into(),
            room: room.into(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_listen_starts_with_sorted_snapshot_of_the_room() {
        let backend = MemoryBackend::new(MemoryDatabase::new());
        backend.add(&message("general", "second", 2)).await.unwrap();
        backend.add(&message("gaming", "elsewhere", 1)).await.unwrap();
        backend.add(&message("general", "first", 1)).await.unwrap();

        let mut live_query = backend.listen(RoomQuery::new("general")).await.unwrap();
        let snapshot = live_query.changes.next().await.unwrap().unwrap();

        let bodies: Vec<&str> = snapshot.iter().map(|c| c.message.body.as_str()).collect();
        assert_eq!(bodies, vec!["first", "second"]);
        assert!(snapshot.iter().all(|c| c.kind == ChangeKind::Added));
    }

    #[tokio::test]
    async fn test_listen_delivers_new_messages_of_the_room_only() {
        let backend = MemoryBackend::new(MemoryDatabase::new());
        let mut live_query = backend.listen(RoomQuery::new("general")).await.unwrap();
        assert!(live_query.changes.next().await.unwrap().unwrap().is_empty());

        backend.add(&message("gaming", "not for us", 1)).await.unwrap();
        let posted = backend.add(&message("general", "for us", 2)).await.unwrap();

        let batch = live_query.changes.next().await.unwrap().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, posted.id);
        assert_eq!(batch[0].message.body, "for us");
    }

    #[tokio::test]
    async fn test_registration_tracks_active_listeners() {
        let database = MemoryDatabase::new();
        let backend = MemoryBackend::new(database.clone());

        let first = backend.listen(RoomQuery::new("general")).await.unwrap();
        let second = backend.listen(RoomQuery::new("gaming")).await.unwrap();
        assert_eq!(database.active_listeners(), 2);

        first.registration.remove();
        assert_eq!(database.active_listeners(), 1);

        drop(second);
        assert_eq!(database.active_listeners(), 0);
    }

    #[tokio::test]
    async fn test_rejects_empty_and_oversized_bodies() {
        let backend = MemoryBackend::new(MemoryDatabase::new());
        let mut long = message("general", "", 0);
        long.body = "x".repeat(MAX_BODY_CHARS + 1);

        assert!(matches!(
            backend.add(&message("general", "   ", 0)).await,
            Err(PostError::Rejected { .. })
        ));
        assert!(matches!(backend.add(&long).await, Err(PostError::Rejected { .. })));
        assert!(backend.database().messages_in("general").is_empty());
    }

    #[tokio::test]
    async fn test_accounts_report_vendor_codes() {
        let database = MemoryDatabase::new();
        let backend = MemoryBackend::new(database.clone());

        let code = |result: Result<AuthUser, ProviderError>| result.unwrap_err().code;

        assert_eq!(code(backend.create_user("not-an-email", "secret1").await), "auth/invalid-email");
        assert_eq!(code(backend.create_user("a@b.io", "123").await), "auth/weak-password");

        let user = backend.create_user("Mario@Example.com", "secret1").await.unwrap();
        assert_eq!(user.email, "mario@example.com");
        assert_eq!(backend.current_user(), Some(user.clone()));

        assert_eq!(
            code(backend.create_user("mario@example.com", "secret2").await),
            "auth/email-already-in-use"
        );
        assert_eq!(code(backend.sign_in("luigi@example.com", "secret1").await), "auth/user-not-found");
        assert_eq!(code(backend.sign_in("mario@example.com", "wrong!").await), "auth/wrong-password");

        // each handle has its own auth state over the shared accounts
        let other = MemoryBackend::new(database.clone());
        assert_eq!(other.current_user(), None);
        assert_eq!(other.sign_in("mario@example.com", "secret1").await.unwrap(), user);

        backend.sign_out().await.unwrap();
        assert_eq!(backend.current_user(), None);
        assert_eq!(database.auth_requests(), 8);
    }

    #[tokio::test]
    async fn test_busy_room_does_not_starve_a_quiet_one() {
        let backend = MemoryBackend::new(MemoryDatabase::new());
        let mut quiet = backend.listen(RoomQuery::new("quiet")).await.unwrap();
        let _busy = backend.listen(RoomQuery::new("busy")).await.unwrap();
        quiet.changes.next().await.unwrap().unwrap();

        let start = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        for i in 0..(CHANGES_CHANNEL_CAPACITY as i64 * 2) {
            let mut m = message("busy", "spam", 0);
            m.created_at = start + Duration::seconds(i);
            backend.add(&m).await.unwrap();
        }
        let posted = backend.add(&message("quiet", "anyone here?", 59)).await.unwrap();

        let batch = quiet.changes.next().await.unwrap().unwrap();
        assert_eq!(batch.len(), 1);
        assert_eq!(batch[0].id, posted.id);
    }

    #[tokio::test]
    async fn test_lagging_listener_reports_an_error() {
        let backend = MemoryBackend::new(MemoryDatabase::new());
        let mut live_query = backend.listen(RoomQuery::new("general")).await.unwrap();
        live_query.changes.next().await.unwrap().unwrap();

        let start = Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap();
        for i in 0..(CHANGES_CHANNEL_CAPACITY as i64 + 10) {
            let mut m = message("general", "spam", 0);
            m.created_at = start + Duration::seconds(i);
            backend.add(&m).await.unwrap();
        }

        assert!(matches!(
            live_query.changes.next().await,
            Some(Err(SubscriptionError::Lagged(_)))
        ));
    }
}
