use crossterm::event::KeyEvent;
use ratatui::{prelude::Backend, Frame};
use tokio::sync::mpsc::UnboundedSender;

use crate::state_store::{action::Action, State};

/// Whether a component made use of a key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyHandled {
    Consumed,
    /// The key is left to the parent
    Ignored,
}

impl KeyHandled {
    pub fn is_ignored(self) -> bool {
        self == KeyHandled::Ignored
    }
}

/// A piece of the screen fed by [State] snapshots, sending [Action]s back to the state store
pub trait Component {
    fn new(state: &State, action_tx: UnboundedSender<Action>) -> Self
    where
        Self: Sized;
    /// Take in the latest published state, keeping what the user is in the middle of typing
    fn move_with_state(self, state: &State) -> Self
    where
        Self: Sized;

    fn name(&self) -> &str;

    fn handle_key_event(&mut self, key: KeyEvent) -> KeyHandled;
}

pub trait ComponentRender<Props> {
    fn render<B: Backend>(&self, frame: &mut Frame<B>, props: Props);
}
