//! The active room of a client and its single live subscription.

use std::{future::Future, sync::Arc};

use chrono::Utc;
use log::{debug, warn};
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_stream::StreamExt;

use crate::{
    backend::{ChangeKind, ListenerRegistration, MessageStore, RoomQuery},
    error::{Field, IdentityError, PostError, SubscriptionError, ValidationError},
    identity_gate::{Identity, DEFAULT_DISPLAY_NAME},
    local_store::{LocalStore, USERNAME_KEY},
    message::{Message, MessageRef},
    message_list::MessageListView,
};

/// Room a new session starts in
pub const DEFAULT_ROOM: &str = "general";

type SubscriptionId = u64;

#[derive(Debug)]
enum Arrival {
    Message(SubscriptionId, Message),
    Failed(SubscriptionId, SubscriptionError),
}

impl Arrival {
    fn subscription_id(&self) -> SubscriptionId {
        match self {
            Arrival::Message(id, _) | Arrival::Failed(id, _) => *id,
        }
    }
}

#[derive(Debug)]
struct ActiveSubscription {
    id: SubscriptionId,
    room: String,
    registration: ListenerRegistration,
    forwarder: JoinHandle<()>,
}

impl ActiveSubscription {
    fn close(self) {
        self.forwarder.abort();
        self.registration.remove();
        debug!("closed subscription {} to room '{}'", self.id, self.room);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState<'a> {
    Idle,
    Listening(&'a str),
}

/// Owns the selected room, the display name messages are posted under, and at most one
/// live subscription. Arrivals of that subscription are pulled with [RoomSession::next_arrival].
pub struct RoomSession {
    store: Arc<dyn MessageStore>,
    local_store: Arc<dyn LocalStore>,
    active_room: String,
    display_name: String,
    active_subscription: Option<ActiveSubscription>,
    next_subscription_id: SubscriptionId,
    arrival_tx: mpsc::UnboundedSender<Arrival>,
    arrival_rx: mpsc::UnboundedReceiver<Arrival>,
}

impl RoomSession {
    pub fn new(
        store: Arc<dyn MessageStore>,
        local_store: Arc<dyn LocalStore>,
        display_name: &str,
    ) -> Self {
        let (arrival_tx, arrival_rx) = mpsc::unbounded_channel();

        RoomSession {
            store,
            local_store,
            active_room: String::from(DEFAULT_ROOM),
            display_name: String::from(display_name),
            active_subscription: None,
            next_subscription_id: 1,
            arrival_tx,
            arrival_rx,
        }
    }

    /// Starts idle in the default room, with the display name kept in `local_store`
    pub fn restore(store: Arc<dyn MessageStore>, local_store: Arc<dyn LocalStore>) -> Self {
        let display_name = local_store
            .get(USERNAME_KEY)
            .unwrap_or_else(|| String::from(DEFAULT_DISPLAY_NAME));

        Self::new(store, local_store, &display_name)
    }

    pub fn state(&self) -> SessionState<'_> {
        match &self.active_subscription {
            Some(subscription) => SessionState::Listening(&subscription.room),
            None => SessionState::Idle,
        }
    }

    pub fn active_room(&self) -> &str {
        &self.active_room
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// Post a message to the active room under the current display name.
    ///
    /// The message is stamped right away. The returned future does not borrow the session,
    /// so posts can be awaited concurrently and may complete in any order.
    pub fn post(
        &self,
        body: &str,
    ) -> impl Future<Output = Result<MessageRef, PostError>> + Send + 'static {
        let store = self.store.clone();
        let message = Message {
            author: self.display_name.clone(),
            body: String::from(body),
            room: self.active_room.clone(),
            created_at: Utc::now(),
        };

        async move {
            let result = store.add(&message).await;
            if let Err(err) = &result {
                warn!("could not post to room '{}': {}", message.room, err);
            }

            result
        }
    }

    /// Make `room` the active room and open a live subscription to it,
    /// closing the previous subscription first.
    pub async fn subscribe(&mut self, room: &str) -> Result<(), SubscriptionError> {
        self.unsubscribe();
        self.active_room = String::from(room);

        let live_query = self.store.listen(RoomQuery::new(room)).await?;

        let id = self.next_subscription_id;
        self.next_subscription_id += 1;

        let mut changes = live_query.changes;
        let arrival_tx = self.arrival_tx.clone();
        let forwarder = tokio::spawn(async move {
            while let Some(batch) = changes.next().await {
                let changes = match batch {
                    Ok(changes) => changes,
                    Err(err) => {
                        let _ = arrival_tx.send(Arrival::Failed(id, err));
                        return;
                    }
                };

                for change in changes {
                    if change.kind != ChangeKind::Added {
                        continue;
                    }

                    if arrival_tx.send(Arrival::Message(id, change.message)).is_err() {
                        return;
                    }
                }
            }
        });

        debug!("opened subscription {} to room '{}'", id, room);
        self.active_subscription = Some(ActiveSubscription {
            id,
            room: String::from(room),
            registration: live_query.registration,
            forwarder,
        });

        Ok(())
    }

    /// Close the active subscription, if there is one
    pub fn unsubscribe(&mut self) {
        if let Some(subscription) = self.active_subscription.take() {
            subscription.close();
        }
    }

    /// The room button path: detach, clear the view, attach to `room`
    pub async fn switch_room(
        &mut self,
        room: &str,
        view: &mut impl MessageListView,
    ) -> Result<(), SubscriptionError> {
        self.unsubscribe();
        view.clear();

        self.subscribe(room).await
    }

    /// Wait for the next message of the active subscription.
    ///
    /// Anything still queued from a closed subscription is discarded. An error closes the
    /// active subscription, `subscribe` has to be called again to resume. Safe to use in
    /// `tokio::select!`.
    pub async fn next_arrival(&mut self) -> Result<Message, SubscriptionError> {
        loop {
            let arrival = self
                .arrival_rx
                .recv()
                .await
                .ok_or(SubscriptionError::Disconnected)?;

            let active_id = self.active_subscription.as_ref().map(|s| s.id);
            if active_id != Some(arrival.subscription_id()) {
                debug!(
                    "discarding arrival of closed subscription {}",
                    arrival.subscription_id()
                );
                continue;
            }

            match arrival {
                Arrival::Message(_, message) => return Ok(message),
                Arrival::Failed(_, err) => {
                    warn!("subscription to room '{}' failed: {}", self.active_room, err);
                    self.unsubscribe();

                    return Err(err);
                }
            }
        }
    }

    /// Change the display name used for future posts and remember it across restarts
    pub fn set_identity(&mut self, display_name: &str) -> Result<(), IdentityError> {
        let display_name = display_name.trim();
        if display_name.is_empty() {
            return Err(ValidationError::MissingField(Field::DisplayName).into());
        }

        self.local_store.set(USERNAME_KEY, display_name)?;
        self.display_name = String::from(display_name);

        Ok(())
    }

    /// Take over an identity that was already stored by the identity gate
    pub fn adopt_identity(&mut self, identity: &Identity) {
        self.display_name = identity.display_name.clone();
    }
}

impl Drop for RoomSession {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

#[cfg(test)]
mod tests {
    use std::{
        sync::atomic::{AtomicUsize, Ordering},
        time::Duration,
    };

    use async_trait::async_trait;
    use chrono::TimeZone;
    use tokio::time::timeout;

    use super::*;
    use crate::{
        backend::{
            memory::{MemoryBackend, MemoryDatabase},
            Change, ChangeBatch, LiveQuery,
        },
        local_store::MemoryStore,
        message_list::MessageList,
    };

    const QUIET_PERIOD: Duration = Duration::from_millis(100);

    fn session_over(database: &Arc<MemoryDatabase>) -> RoomSession {
        RoomSession::new(
            Arc::new(MemoryBackend::new(database.clone())),
            Arc::new(MemoryStore::default()),
            "mario",
        )
    }

    /// Everything that arrives until the subscription goes quiet
    async fn drain(session: &mut RoomSession, view: &mut MessageList) {
        while let Ok(arrival) = timeout(QUIET_PERIOD, session.next_arrival()).await {
            view.append(arrival.unwrap());
        }
    }

    fn message(room: &str, body: &str, minute: u32) -> Message {
        Message {
            author: "luigi".into(),
            body: body.into(),
            room: room.into(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, minute, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_switching_rooms_keeps_one_subscription_and_only_the_latest_room() {
        let database = MemoryDatabase::new();
        let backend = MemoryBackend::new(database.clone());
        for room in ["general", "gaming", "music"] {
            backend.add(&message(room, room, 1)).await.unwrap();
            backend.add(&message(room, room, 2)).await.unwrap();
        }

        let mut session = session_over(&database);
        let mut view = MessageList::default();
        for room in ["general", "gaming", "general", "music"] {
            session.switch_room(room, &mut view).await.unwrap();
            assert_eq!(database.active_listeners(), 1);
        }

        drain(&mut session, &mut view).await;

        assert_eq!(session.state(), SessionState::Listening("music"));
        assert_eq!(view.len(), 2);
        assert!(view.messages().all(|m| m.room == "music"));
    }

    #[tokio::test]
    async fn test_subscribing_without_clearing_still_drops_stale_arrivals() {
        let database = MemoryDatabase::new();
        let backend = MemoryBackend::new(database.clone());
        backend.add(&message("gaming", "old room", 1)).await.unwrap();

        let mut session = session_over(&database);
        session.subscribe("gaming").await.unwrap();
        // the snapshot of "gaming" is already queued by now
        tokio::task::yield_now().await;
        session.subscribe("ninjas").await.unwrap();

        let mut view = MessageList::default();
        drain(&mut session, &mut view).await;

        assert!(view.is_empty());
        assert_eq!(database.active_listeners(), 1);
    }

    #[tokio::test]
    async fn test_post_then_subscribe_delivers_exactly_once() {
        let database = MemoryDatabase::new();
        let mut session = session_over(&database);

        let posted = session.post("hello there").await.unwrap();
        assert!(!posted.id.is_empty());

        session.subscribe("general").await.unwrap();
        let mut view = MessageList::default();
        drain(&mut session, &mut view).await;

        let messages: Vec<&Message> = view.messages().collect();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].author, "mario");
        assert_eq!(messages[0].body, "hello there");
        assert_eq!(messages[0].room, "general");

        // and live posts arrive once as well
        session.post("again").await.unwrap();
        drain(&mut session, &mut view).await;
        assert_eq!(view.len(), 2);
    }

    #[tokio::test]
    async fn test_arrivals_are_ordered_by_creation_time() {
        let database = MemoryDatabase::new();
        let backend = MemoryBackend::new(database.clone());
        for minute in [7, 3, 9, 1, 3] {
            backend
                .add(&message("general", &minute.to_string(), minute))
                .await
                .unwrap();
        }

        let mut session = session_over(&database);
        session.subscribe("general").await.unwrap();
        let mut view = MessageList::default();
        drain(&mut session, &mut view).await;

        let created: Vec<_> = view.messages().map(|m| m.created_at).collect();
        assert_eq!(created.len(), 5);
        assert!(created.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[tokio::test]
    async fn test_unsubscribe_is_idempotent() {
        let database = MemoryDatabase::new();
        let mut session = session_over(&database);

        session.unsubscribe();
        assert_eq!(session.state(), SessionState::Idle);

        session.subscribe("gaming").await.unwrap();
        session.unsubscribe();
        session.unsubscribe();

        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.active_room(), "gaming");
        assert_eq!(database.active_listeners(), 0);
    }

    #[tokio::test]
    async fn test_rejected_post_surfaces_to_the_caller() {
        let database = MemoryDatabase::new();
        let session = session_over(&database);

        let err = session.post("   ").await.unwrap_err();
        assert!(matches!(err, PostError::Rejected { code, .. } if code == "invalid-argument"));
    }

    #[tokio::test]
    async fn test_identity_is_stored_and_used_for_new_posts() {
        let database = MemoryDatabase::new();
        let local_store = Arc::new(MemoryStore::default());
        let store = Arc::new(MemoryBackend::new(database.clone()));

        let mut session = RoomSession::restore(store.clone(), local_store.clone());
        assert_eq!(session.display_name(), DEFAULT_DISPLAY_NAME);

        session.post("as anon").await.unwrap();
        session.set_identity("  toad ").unwrap();
        session.post("as toad").await.unwrap();
        assert!(matches!(
            session.set_identity(" "),
            Err(IdentityError::Validation(ValidationError::MissingField(Field::DisplayName)))
        ));

        let authors: Vec<String> = database
            .messages_in("general")
            .into_iter()
            .map(|m| m.author)
            .collect();
        assert_eq!(authors, vec!["anon", "toad"]);

        let restored = RoomSession::restore(store, local_store);
        assert_eq!(restored.display_name(), "toad");
    }

    /// Local store whose writes always fail
    struct ReadOnlyStore;

    impl LocalStore for ReadOnlyStore {
        fn get(&self, _key: &str) -> Option<String> {
            None
        }

        fn set(&self, _key: &str, _value: &str) -> anyhow::Result<()> {
            anyhow::bail!("read-only file system")
        }

        fn remove(&self, _key: &str) -> anyhow::Result<()> {
            anyhow::bail!("read-only file system")
        }
    }

    #[tokio::test]
    async fn test_identity_is_kept_when_it_can_not_be_stored() {
        let store = Arc::new(MemoryBackend::new(MemoryDatabase::new()));
        let mut session = RoomSession::restore(store, Arc::new(ReadOnlyStore));

        assert!(matches!(
            session.set_identity("toad"),
            Err(IdentityError::Store(_))
        ));
        assert_eq!(session.display_name(), DEFAULT_DISPLAY_NAME);
    }

    /// Replays fixed batches and counts removals of its registrations
    struct ScriptedStore {
        batches: Vec<ChangeBatch>,
        removals: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl MessageStore for ScriptedStore {
        async fn add(&self, _message: &Message) -> Result<MessageRef, PostError> {
            Err(PostError::Network("offline".into()))
        }

        async fn listen(&self, _query: RoomQuery) -> Result<LiveQuery, SubscriptionError> {
            let removals = self.removals.clone();

            Ok(LiveQuery {
                changes: Box::pin(tokio_stream::iter(self.batches.clone())),
                registration: ListenerRegistration::new(move || {
                    removals.fetch_add(1, Ordering::SeqCst);
                }),
            })
        }
    }

    fn change(kind: ChangeKind, body: &str) -> Change {
        Change {
            kind,
            id: body.into(),
            message: message("general", body, 0),
        }
    }

    #[tokio::test]
    async fn test_only_added_documents_are_delivered() {
        let removals = Arc::new(AtomicUsize::new(0));
        let store = ScriptedStore {
            batches: vec![
                Ok(vec![
                    change(ChangeKind::Added, "one"),
                    change(ChangeKind::Modified, "one edited"),
                ]),
                Ok(vec![
                    change(ChangeKind::Removed, "one"),
                    change(ChangeKind::Added, "two"),
                ]),
            ],
            removals: removals.clone(),
        };
        let mut session = RoomSession::new(Arc::new(store), Arc::new(MemoryStore::default()), "x");

        session.subscribe("general").await.unwrap();
        let mut view = MessageList::default();
        drain(&mut session, &mut view).await;

        let bodies: Vec<&str> = view.messages().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, vec!["one", "two"]);

        drop(session);
        assert_eq!(removals.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_subscription_error_closes_the_subscription() {
        let removals = Arc::new(AtomicUsize::new(0));
        let store = ScriptedStore {
            batches: vec![
                Ok(vec![change(ChangeKind::Added, "one")]),
                Err(SubscriptionError::Disconnected),
            ],
            removals: removals.clone(),
        };
        let mut session = RoomSession::new(Arc::new(store), Arc::new(MemoryStore::default()), "x");
        session.subscribe("general").await.unwrap();

        assert_eq!(session.next_arrival().await.unwrap().body, "one");
        assert_eq!(
            session.next_arrival().await.unwrap_err(),
            SubscriptionError::Disconnected
        );
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(removals.load(Ordering::SeqCst), 1);

        assert!(matches!(
            session.post("hi").await,
            Err(PostError::Network(_))
        ));
    }
}
