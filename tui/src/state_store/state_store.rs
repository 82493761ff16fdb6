use std::time::{Duration, Instant};

use chatroom::{
    notice::Notice, room_session::DEFAULT_ROOM, IdentityError, IdentityGate, MessageListView,
    PostError, RoomSession,
};
use log::warn;
use tokio::{
    sync::{
        broadcast,
        mpsc::{self, UnboundedReceiver, UnboundedSender},
    },
    task::JoinSet,
};

use crate::termination::{Interrupted, Terminator};

use super::{action::Action, Page, State};

pub struct StateStore {
    backend_addr: String,
    state_tx: UnboundedSender<State>,
}

impl StateStore {
    pub fn new(backend_addr: &str) -> (Self, UnboundedReceiver<State>) {
        let (state_tx, state_rx) = mpsc::unbounded_channel::<State>();

        (
            StateStore {
                backend_addr: String::from(backend_addr),
                state_tx,
            },
            state_rx,
        )
    }
}

impl StateStore {
    pub async fn main_loop(
        self,
        mut session: RoomSession,
        mut gate: IdentityGate,
        mut terminator: Terminator,
        mut action_rx: UnboundedReceiver<Action>,
        mut interrupt_rx: broadcast::Receiver<Interrupted>,
    ) -> anyhow::Result<Interrupted> {
        let mut state = State::new(&self.backend_addr, session.display_name());
        let mut posts: JoinSet<Result<(), PostError>> = JoinSet::new();
        let mut auth_state = gate.auth_state();

        let resume = gate.resume();
        state.apply_resume(&resume);
        if state.page == Page::Chat {
            session.adopt_identity(gate.identity());
            join_room(&mut session, &mut state, DEFAULT_ROOM).await;
        }

        // the initial state once
        self.state_tx.send(state.clone())?;

        let mut ticker = tokio::time::interval(Duration::from_secs(1));

        let result = loop {
            tokio::select! {
                // Handle the actions coming from the UI
                Some(action) = action_rx.recv() => match action {
                    Action::SignUp { display_name, email, password } => {
                        state.auth_pending = true;
                        self.state_tx.send(state.clone())?;

                        let result = gate.sign_up(&display_name, &email, &password).await;
                        state.auth_pending = false;
                        match result {
                            Ok(identity) => {
                                // auth states reported before this point are stale
                                auth_state.borrow_and_update();
                                session.adopt_identity(&identity);
                                state.enter_chat(&identity);
                                state.show(Notice::success(format!("Welcome, {}!", identity.display_name)));
                                let room = state.active_room.clone();
                                join_room(&mut session, &mut state, &room).await;
                            }
                            Err(err) => state.show(Notice::auth_error(&err)),
                        }
                    },
                    Action::LogIn { display_name, email, password } => {
                        state.auth_pending = true;
                        self.state_tx.send(state.clone())?;

                        let result = gate.log_in(&display_name, &email, &password).await;
                        state.auth_pending = false;
                        match result {
                            Ok(identity) => {
                                // auth states reported before this point are stale
                                auth_state.borrow_and_update();
                                session.adopt_identity(&identity);
                                state.enter_chat(&identity);
                                state.show(Notice::success(format!("Welcome back, {}!", identity.display_name)));
                                let room = state.active_room.clone();
                                join_room(&mut session, &mut state, &room).await;
                            }
                            Err(err) => state.show(Notice::auth_error(&err)),
                        }
                    },
                    Action::ToggleAuthMode => {
                        state.auth_mode = state.auth_mode.toggled();
                    },
                    Action::LogOut => match gate.log_out().await {
                        Ok(()) => {
                            session.unsubscribe();
                            state.leave_chat();
                            state.show(Notice::success("You have been logged out."));
                        }
                        Err(err) => state.show(Notice::auth_error(&err)),
                    },
                    Action::SendMessage { content } => {
                        if state.page == Page::Chat && !content.trim().is_empty() {
                            let post = session.post(&content);
                            state.pending_posts += 1;
                            posts.spawn(async move { post.await.map(|_| ()) });
                        }
                    },
                    Action::SelectRoom { room } => {
                        if state.page == Page::Chat {
                            join_room(&mut session, &mut state, &room).await;
                        }
                    },
                    Action::UpdateName { name } => match session.set_identity(&name) {
                        Ok(()) => {
                            state.display_name = String::from(session.display_name());
                            state.show(Notice::name_updated(session.display_name()));
                        }
                        Err(IdentityError::Validation(err)) => state.show(Notice::error(format!("Could not update your name: {}", err))),
                        Err(IdentityError::Store(err)) => {
                            warn!("could not store the display name: {:#}", err);
                            state.show(Notice::error("Could not save your name, it is unchanged."));
                        }
                    },
                    Action::Exit => {
                        let _ = terminator.terminate(Interrupted::UserInt);

                        break Interrupted::UserInt;
                    },
                },
                // Messages of the active room
                arrival = session.next_arrival() => match arrival {
                    Ok(message) => state.messages_mut().append(message),
                    Err(err) => state.show(Notice::error(format!(
                        "Lost the live feed of #{}: {}. Select the room again to reconnect.",
                        state.active_room, err
                    ))),
                },
                // Completed posts, in whatever order they finish
                Some(finished) = posts.join_next() => {
                    state.pending_posts = state.pending_posts.saturating_sub(1);
                    match finished {
                        Ok(Ok(())) => (),
                        Ok(Err(err)) => state.show(Notice::error(format!("Your message was not sent: {}", err))),
                        Err(err) => warn!("post task failed: {}", err),
                    }
                },
                // The provider may sign the user out on its own, e.g. when the connection drops
                Ok(()) = auth_state.changed() => {
                    let user = auth_state.borrow_and_update().clone();
                    if gate.on_auth_state(user.as_ref()) && state.page == Page::Chat {
                        session.unsubscribe();
                        state.leave_chat();
                        state.show(Notice::error("You have been signed out, please log in again."));
                    }
                },
                // Tick to expire notices and refresh relative times
                _ = ticker.tick() => {
                    state.tick(Instant::now());
                },
                // Catch and handle interrupt signal to gracefully shutdown
                Ok(interrupted) = interrupt_rx.recv() => {
                    break interrupted;
                }
            }

            self.state_tx.send(state.clone())?;
        };

        session.unsubscribe();

        Ok(result)
    }
}

/// Switch the session and the rendered list over to `room`
async fn join_room(session: &mut RoomSession, state: &mut State, room: &str) {
    state.active_room = String::from(room);

    if let Err(err) = session.switch_room(room, state.messages_mut()).await {
        state.show(Notice::error(format!("Could not open #{}: {}", room, err)));
    }
}
