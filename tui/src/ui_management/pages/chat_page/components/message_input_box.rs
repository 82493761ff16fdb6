use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    prelude::{Backend, Rect},
    style::Color,
    Frame,
};
use tokio::sync::mpsc::UnboundedSender;

use super::super::section::{
    usage::{HasUsageInfo, UsageInfo, UsageInfoLine},
    SectionActivation,
};
use crate::state_store::{action::Action, State};
use crate::ui_management::components::{
    input_box::{self, InputBox},
    Component, ComponentRender, KeyHandled,
};

struct Props {
    /// Room the messages are posted to
    active_room: String,
}

impl From<&State> for Props {
    fn from(state: &State) -> Self {
        Self {
            active_room: state.active_room.clone(),
        }
    }
}

pub struct MessageInputBox {
    action_tx: UnboundedSender<Action>,
    /// State Mapped MessageInputBox Props
    props: Props,
    // Internal State for the Component
    pub input_box: InputBox,
}

impl MessageInputBox {
    fn submit_message(&mut self) {
        // whitespace-only messages are never posted
        if self.input_box.text().trim().is_empty() {
            return;
        }

        let _ = self.action_tx.send(Action::SendMessage {
            content: String::from(self.input_box.text()),
        });

        self.input_box.reset();
    }
}

impl Component for MessageInputBox {
    fn new(state: &State, action_tx: UnboundedSender<Action>) -> Self {
        Self {
            action_tx: action_tx.clone(),
            props: Props::from(state),
            //
            input_box: InputBox::new(state, action_tx),
        }
    }

    fn move_with_state(self, state: &State) -> Self
    where
        Self: Sized,
    {
        Self {
            props: Props::from(state),
            ..self
        }
    }

    fn name(&self) -> &str {
        "Message Input"
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> KeyHandled {
        if key.kind != KeyEventKind::Press {
            return KeyHandled::Ignored;
        }

        match key.code {
            KeyCode::Enter => {
                self.submit_message();
                KeyHandled::Consumed
            }
            _ => self.input_box.handle_key_event(key),
        }
    }
}

impl SectionActivation for MessageInputBox {
    fn activate(&mut self) {}

    fn deactivate(&mut self) {
        self.input_box.reset();
    }
}

pub struct RenderProps {
    pub area: Rect,
    pub border_color: Color,
    pub show_cursor: bool,
}

impl ComponentRender<RenderProps> for MessageInputBox {
    fn render<B: Backend>(&self, frame: &mut Frame<B>, props: RenderProps) {
        self.input_box.render(
            frame,
            input_box::RenderProps {
                title: format!("Message #{}", self.props.active_room),
                area: props.area,
                border_color: props.border_color,
                show_cursor: props.show_cursor,
                masked: false,
            },
        )
    }
}

impl HasUsageInfo for MessageInputBox {
    fn usage_info(&self) -> UsageInfo {
        UsageInfo {
            description: Some(format!(
                "Type your message to send it to #{}",
                self.props.active_room
            )),
            lines: vec![
                UsageInfoLine {
                    keys: vec!["Esc".into()],
                    description: "to cancel".into(),
                },
                UsageInfoLine {
                    keys: vec!["Enter".into()],
                    description: "to send your message".into(),
                },
            ],
        }
    }
}
