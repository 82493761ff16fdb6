use std::collections::HashMap;

use chatroom::{
    backend::{
        memory::MemoryBackend, AuthProvider, AuthUser, ListenerRegistration, MessageStore,
        RoomQuery,
    },
    Message, ProviderError,
};
use comms::{
    command::{RequestId, UserCommand},
    document::DocumentChange,
    event::{self, Event, ReplyPayload},
};
use log::debug;
use tokio::{sync::mpsc, task::JoinHandle};
use tokio_stream::StreamExt;

/// A live query of the client and the task forwarding its changes
struct Listener {
    registration: ListenerRegistration,
    forwarder: JoinHandle<()>,
}

/// Maps the commands of one client onto its own [MemoryBackend] handle
pub(super) struct ClientSession {
    session_id: String,
    backend: MemoryBackend,
    listeners: HashMap<RequestId, Listener>,
    mpsc_tx: mpsc::Sender<Event>,
    mpsc_rx: mpsc::Receiver<Event>,
}

impl ClientSession {
    pub fn new(session_id: &str, backend: MemoryBackend) -> Self {
        let (mpsc_tx, mpsc_rx) = mpsc::channel(100);

        ClientSession {
            session_id: String::from(session_id),
            backend,
            listeners: HashMap::new(),
            mpsc_tx,
            mpsc_rx,
        }
    }

    /// Run a command, returning the events to send back right away, in order
    pub async fn handle_command(&mut self, cmd: UserCommand) -> Vec<Event> {
        match cmd {
            UserCommand::SignUp(cmd) => {
                let result = self.backend.create_user(&cmd.email, &cmd.password).await;
                auth_reply(cmd.request_id, result)
            }
            UserCommand::SignIn(cmd) => {
                let result = self.backend.sign_in(&cmd.email, &cmd.password).await;
                auth_reply(cmd.request_id, result)
            }
            UserCommand::SignOut(cmd) => match self.backend.sign_out().await {
                Ok(()) => vec![
                    ok(cmd.request_id, ReplyPayload::None),
                    Event::AuthState(event::AuthStateEvent { user: None }),
                ],
                Err(err) => vec![failed(cmd.request_id, &err.code, &err.message)],
            },
            UserCommand::AddMessage(cmd) => {
                match self.backend.add(&Message::from(cmd.doc)).await {
                    Ok(message_ref) => vec![ok(
                        cmd.request_id,
                        ReplyPayload::Document { id: message_ref.id },
                    )],
                    Err(err) => vec![failed(cmd.request_id, err.code(), &err.to_string())],
                }
            }
            UserCommand::Listen(cmd) => vec![self.listen(cmd.request_id, &cmd.room).await],
            UserCommand::Unlisten(cmd) => {
                self.unlisten(cmd.listener_id).await;
                vec![]
            }
        }
    }

    async fn listen(&mut self, listener_id: RequestId, room: &str) -> Event {
        if self.listeners.contains_key(&listener_id) {
            return failed(
                listener_id,
                "already-exists",
                &format!("listener {} is already active", listener_id),
            );
        }

        let live_query = match self.backend.listen(RoomQuery::new(room)).await {
            Ok(live_query) => live_query,
            Err(err) => return failed(listener_id, err.code(), &err.to_string()),
        };

        // forward the changes of every live query into the single event channel of the client
        let forwarder = tokio::spawn({
            let mut changes = live_query.changes;
            let mpsc_tx = self.mpsc_tx.clone();

            async move {
                while let Some(batch) = changes.next().await {
                    let event = match batch {
                        Ok(changes) => Event::Snapshot(event::SnapshotEvent {
                            listener_id,
                            changes: changes.into_iter().map(DocumentChange::from).collect(),
                        }),
                        Err(err) => Event::ListenFailed(event::ListenFailedEvent {
                            listener_id,
                            code: String::from(err.code()),
                        }),
                    };
                    let is_failure = matches!(event, Event::ListenFailed(_));

                    if mpsc_tx.send(event).await.is_err() || is_failure {
                        break;
                    }
                }
            }
        });

        debug!(
            "Client {} listens to room '{}' as {}",
            self.session_id, room, listener_id
        );
        self.listeners.insert(
            listener_id,
            Listener {
                registration: live_query.registration,
                forwarder,
            },
        );

        ok(listener_id, ReplyPayload::None)
    }

    /// Stops the forwarder and waits for it, so nothing of the listener outlives this call
    async fn unlisten(&mut self, listener_id: RequestId) {
        if let Some(Listener {
            registration,
            forwarder,
        }) = self.listeners.remove(&listener_id)
        {
            forwarder.abort();
            let _ = forwarder.await;
            registration.remove();
            debug!("Client {} stopped listening as {}", self.session_id, listener_id);
        }
    }

    /// Remove every live query of the client
    pub async fn unlisten_all(&mut self) {
        let listener_ids: Vec<RequestId> = self.listeners.keys().copied().collect();

        for listener_id in listener_ids {
            self.unlisten(listener_id).await;
        }
    }

    /// Number of live queries of the client
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Receive an event produced by any of the client's live queries
    pub async fn recv(&mut self) -> Option<Event> {
        self.mpsc_rx.recv().await
    }
}

fn auth_reply(
    request_id: RequestId,
    result: Result<AuthUser, ProviderError>,
) -> Vec<Event> {
    match result {
        Ok(user) => vec![
            ok(request_id, ReplyPayload::User(user.clone())),
            Event::AuthState(event::AuthStateEvent { user: Some(user) }),
        ],
        Err(err) => vec![failed(request_id, &err.code, &err.message)],
    }
}

fn ok(request_id: RequestId, payload: ReplyPayload) -> Event {
    Event::Ok(event::OkReplyEvent {
        request_id,
        payload,
    })
}

fn failed(request_id: RequestId, code: &str, message: &str) -> Event {
    Event::Failed(event::FailedReplyEvent {
        request_id,
        code: String::from(code),
        message: String::from(message),
    })
}
