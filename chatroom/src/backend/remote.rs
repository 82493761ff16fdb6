//! Collaborators backed by a remote backend, spoken to over the `comms` transport.
//!
//! One task writes queued commands to the connection, another reads events and routes them:
//! replies to the request waiting on them, snapshots to their live query, auth state changes
//! to the watch channel.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Weak,
    },
};

use anyhow::Context;
use async_trait::async_trait;
use comms::{
    command::{self, RequestId, UserCommand},
    document::ChatDocument,
    event::{Event, ReplyPayload},
    transport,
};
use log::{debug, warn};
use parking_lot::Mutex;
use tokio::{
    net::TcpStream,
    sync::{mpsc, oneshot, watch},
    task::AbortHandle,
};
use tokio_stream::{wrappers::UnboundedReceiverStream, StreamExt};

use super::{
    AuthProvider, AuthUser, Change, ChangeBatch, ListenerRegistration, LiveQuery, MessageStore,
    RoomQuery,
};
use crate::{
    error::{PostError, ProviderError, SubscriptionError, INTERNAL_ERROR},
    message::{Message, MessageRef},
};

#[derive(Debug)]
enum RequestError {
    Disconnected,
    Failed { code: String, message: String },
}

type Reply = Result<ReplyPayload, RequestError>;

#[derive(Default)]
struct Routes {
    pending: HashMap<RequestId, oneshot::Sender<Reply>>,
    listeners: HashMap<RequestId, mpsc::UnboundedSender<ChangeBatch>>,
    closed: bool,
}

/// Routes incoming events to whoever is waiting for them
struct Router {
    routes: Mutex<Routes>,
    auth_state_tx: watch::Sender<Option<AuthUser>>,
}

impl Router {
    fn new() -> Self {
        let (auth_state_tx, _) = watch::channel(None);

        Router {
            routes: Mutex::new(Routes::default()),
            auth_state_tx,
        }
    }

    fn expect_reply(
        &self,
        request_id: RequestId,
        reply_tx: oneshot::Sender<Reply>,
    ) -> Result<(), RequestError> {
        let mut routes = self.routes.lock();
        if routes.closed {
            return Err(RequestError::Disconnected);
        }

        routes.pending.insert(request_id, reply_tx);

        Ok(())
    }

    fn forget_reply(&self, request_id: RequestId) {
        self.routes.lock().pending.remove(&request_id);
    }

    fn add_listener(
        &self,
        listener_id: RequestId,
        changes_tx: mpsc::UnboundedSender<ChangeBatch>,
    ) -> Result<(), SubscriptionError> {
        let mut routes = self.routes.lock();
        if routes.closed {
            return Err(SubscriptionError::Disconnected);
        }

        routes.listeners.insert(listener_id, changes_tx);

        Ok(())
    }

    fn remove_listener(&self, listener_id: RequestId) {
        self.routes.lock().listeners.remove(&listener_id);
    }

    fn route(&self, event: Event) {
        match event {
            Event::Ok(reply) => self.resolve(reply.request_id, Ok(reply.payload)),
            Event::Failed(reply) => self.resolve(
                reply.request_id,
                Err(RequestError::Failed {
                    code: reply.code,
                    message: reply.message,
                }),
            ),
            Event::Snapshot(snapshot) => {
                let routes = self.routes.lock();
                if let Some(changes_tx) = routes.listeners.get(&snapshot.listener_id) {
                    let changes = snapshot.changes.into_iter().map(Change::from).collect();
                    let _ = changes_tx.send(Ok(changes));
                }
            }
            Event::ListenFailed(failure) => {
                let changes_tx = self.routes.lock().listeners.remove(&failure.listener_id);
                if let Some(changes_tx) = changes_tx {
                    let _ = changes_tx.send(Err(SubscriptionError::Rejected { code: failure.code }));
                }
            }
            Event::AuthState(auth_state) => {
                self.auth_state_tx.send_replace(auth_state.user);
            }
        }
    }

    fn resolve(&self, request_id: RequestId, reply: Reply) {
        let reply_tx = self.routes.lock().pending.remove(&request_id);

        match reply_tx {
            Some(reply_tx) => {
                let _ = reply_tx.send(reply);
            }
            None => debug!("dropping reply to unknown request {}", request_id),
        }
    }

    /// Fail everything that is still waiting; nothing more will arrive
    fn close(&self) {
        let (pending, listeners) = {
            let mut routes = self.routes.lock();
            routes.closed = true;

            (
                std::mem::take(&mut routes.pending),
                std::mem::take(&mut routes.listeners),
            )
        };

        for (_, reply_tx) in pending {
            let _ = reply_tx.send(Err(RequestError::Disconnected));
        }

        for (_, changes_tx) in listeners {
            let _ = changes_tx.send(Err(SubscriptionError::Disconnected));
        }

        self.auth_state_tx.send_replace(None);
    }
}

/// [MessageStore] and [AuthProvider] over a single TCP connection to the backend.
/// Dropping it closes the connection.
pub struct RemoteBackend {
    command_tx: mpsc::UnboundedSender<UserCommand>,
    router: Arc<Router>,
    next_request_id: AtomicU64,
    abort_handles: Vec<AbortHandle>,
}

impl RemoteBackend {
    pub async fn connect(addr: &str) -> anyhow::Result<Self> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("could not connect to the backend at {}", addr))?;
        let (mut event_stream, mut command_writer) = transport::client::split_tcp_stream(stream);

        let router = Arc::new(Router::new());
        let (command_tx, mut command_rx) = mpsc::unbounded_channel::<UserCommand>();
        let writer = tokio::spawn({
            let router = router.clone();

            async move {
                while let Some(command) = command_rx.recv().await {
                    if let Err(err) = command_writer.write(&command).await {
                        warn!("could not write to the backend: {:#}", err);
                        router.close();
                        break;
                    }
                }
            }
        });

        let reader = tokio::spawn({
            let router = router.clone();

            async move {
                while let Some(result) = event_stream.next().await {
                    match result {
                        Ok(event) => router.route(event),
                        Err(err) => warn!("skipping unreadable event: {:#}", err),
                    }
                }

                debug!("backend closed the connection");
                router.close();
            }
        });

        debug!("connected to the backend at {}", addr);

        Ok(RemoteBackend {
            command_tx,
            router,
            next_request_id: AtomicU64::new(1),
            abort_handles: vec![writer.abort_handle(), reader.abort_handle()],
        })
    }

    fn next_request_id(&self) -> RequestId {
        self.next_request_id.fetch_add(1, Ordering::Relaxed)
    }

    async fn request(&self, request_id: RequestId, command: UserCommand) -> Reply {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.router.expect_reply(request_id, reply_tx)?;

        if self.command_tx.send(command).is_err() {
            self.router.forget_reply(request_id);
            return Err(RequestError::Disconnected);
        }

        reply_rx.await.unwrap_or(Err(RequestError::Disconnected))
    }

    async fn auth_request(
        &self,
        build: impl FnOnce(RequestId) -> UserCommand,
    ) -> Result<ReplyPayload, ProviderError> {
        let request_id = self.next_request_id();

        self.request(request_id, build(request_id))
            .await
            .map_err(|err| match err {
                RequestError::Disconnected => {
                    ProviderError::network("connection to the backend was lost")
                }
                RequestError::Failed { code, message } => ProviderError { code, message },
            })
    }

    async fn user_request(
        &self,
        build: impl FnOnce(RequestId) -> UserCommand,
    ) -> Result<AuthUser, ProviderError> {
        match self.auth_request(build).await? {
            ReplyPayload::User(user) => Ok(user),
            other => Err(unexpected_reply(&other)),
        }
    }
}

impl Drop for RemoteBackend {
    fn drop(&mut self) {
        for abort_handle in &self.abort_handles {
            abort_handle.abort();
        }
    }
}

fn unexpected_reply(payload: &ReplyPayload) -> ProviderError {
    ProviderError::new(INTERNAL_ERROR, format!("unexpected reply {:?}", payload))
}

#[async_trait]
impl MessageStore for RemoteBackend {
    async fn add(&self, message: &Message) -> Result<MessageRef, PostError> {
        let request_id = self.next_request_id();
        let command = UserCommand::AddMessage(command::AddMessageCommand {
            request_id,
            doc: ChatDocument::from(message),
        });

        match self.request(request_id, command).await {
            Ok(ReplyPayload::Document { id }) => Ok(MessageRef { id }),
            Ok(other) => Err(PostError::Rejected {
                code: String::from("internal"),
                message: format!("unexpected reply {:?}", other),
            }),
            Err(RequestError::Disconnected) => Err(PostError::Network(
                "connection to the backend was lost".into(),
            )),
            Err(RequestError::Failed { code, message }) => {
                Err(PostError::Rejected { code, message })
            }
        }
    }

    async fn listen(&self, query: RoomQuery) -> Result<LiveQuery, SubscriptionError> {
        let listener_id = self.next_request_id();
        let (changes_tx, changes_rx) = mpsc::unbounded_channel();
        self.router.add_listener(listener_id, changes_tx)?;

        // created before the listen command goes out, so an abandoned or failed listen
        // still unregisters on drop
        let registration = {
            let router: Weak<Router> = Arc::downgrade(&self.router);
            let command_tx = self.command_tx.clone();

            ListenerRegistration::new(move || {
                if let Some(router) = router.upgrade() {
                    router.remove_listener(listener_id);
                }

                let _ = command_tx.send(UserCommand::Unlisten(command::UnlistenCommand {
                    listener_id,
                }));
            })
        };

        let command = UserCommand::Listen(command::ListenCommand {
            request_id: listener_id,
            room: query.room,
        });

        match self.request(listener_id, command).await {
            Ok(_) => Ok(LiveQuery {
                changes: Box::pin(UnboundedReceiverStream::new(changes_rx)),
                registration,
            }),
            Err(RequestError::Disconnected) => Err(SubscriptionError::Disconnected),
            Err(RequestError::Failed { code, .. }) => Err(SubscriptionError::Rejected { code }),
        }
    }
}

#[async_trait]
impl AuthProvider for RemoteBackend {
    async fn create_user(&self, email: &str, password: &str) -> Result<AuthUser, ProviderError> {
        self.user_request(|request_id| {
            UserCommand::SignUp(command::SignUpCommand {
                request_id,
                email: String::from(email),
                password: String::from(password),
            })
        })
        .await
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthUser, ProviderError> {
        self.user_request(|request_id| {
            UserCommand::SignIn(command::SignInCommand {
                request_id,
                email: String::from(email),
                password: String::from(password),
            })
        })
        .await
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        match self
            .auth_request(|request_id| UserCommand::SignOut(command::SignOutCommand { request_id }))
            .await?
        {
            ReplyPayload::None => Ok(()),
            other => Err(unexpected_reply(&other)),
        }
    }

    fn auth_state(&self) -> watch::Receiver<Option<AuthUser>> {
        self.router.auth_state_tx.subscribe()
    }
}
