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
    display_name: String,
}

impl From<&State> for Props {
    fn from(state: &State) -> Self {
        Self {
            display_name: state.display_name.clone(),
        }
    }
}

/// Edits the display name stamped on new messages
pub struct NameInputBox {
    action_tx: UnboundedSender<Action>,
    props: Props,
    pub input_box: InputBox,
    /// The name was submitted and the section can be left
    submitted: bool,
}

impl NameInputBox {
    /// Whether the last key submitted the name, resets on read
    pub fn take_submitted(&mut self) -> bool {
        std::mem::take(&mut self.submitted)
    }

    fn submit_name(&mut self) {
        let _ = self.action_tx.send(Action::UpdateName {
            name: String::from(self.input_box.text()),
        });

        self.submitted = true;
    }
}

impl Component for NameInputBox {
    fn new(state: &State, action_tx: UnboundedSender<Action>) -> Self {
        Self {
            action_tx: action_tx.clone(),
            props: Props::from(state),
            input_box: InputBox::new(state, action_tx),
            submitted: false,
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
        "Name Input"
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> KeyHandled {
        if key.kind != KeyEventKind::Press {
            return KeyHandled::Ignored;
        }

        match key.code {
            KeyCode::Enter => {
                self.submit_name();
                KeyHandled::Consumed
            }
            _ => self.input_box.handle_key_event(key),
        }
    }
}

impl SectionActivation for NameInputBox {
    fn activate(&mut self) {
        // start editing from the current name
        self.input_box.set_text(&self.props.display_name);
    }

    fn deactivate(&mut self) {
        self.input_box.reset();
    }
}

pub struct RenderProps {
    pub area: Rect,
    pub border_color: Color,
    pub show_cursor: bool,
}

impl ComponentRender<RenderProps> for NameInputBox {
    fn render<B: Backend>(&self, frame: &mut Frame<B>, props: RenderProps) {
        if props.show_cursor {
            self.input_box.render(
                frame,
                input_box::RenderProps {
                    title: "Display Name".into(),
                    area: props.area,
                    border_color: props.border_color,
                    show_cursor: true,
                    masked: false,
                },
            );
        } else {
            // idle, show the name in use
            let mut idle = InputBox::default();
            idle.set_text(&self.props.display_name);
            idle.render(
                frame,
                input_box::RenderProps {
                    title: "Display Name".into(),
                    area: props.area,
                    border_color: props.border_color,
                    show_cursor: false,
                    masked: false,
                },
            );
        }
    }
}

impl HasUsageInfo for NameInputBox {
    fn usage_info(&self) -> UsageInfo {
        UsageInfo {
            description: Some("Change the name shown on your new messages".into()),
            lines: vec![
                UsageInfoLine {
                    keys: vec!["Esc".into()],
                    description: "to cancel".into(),
                },
                UsageInfoLine {
                    keys: vec!["Enter".into()],
                    description: "to save the name".into(),
                },
            ],
        }
    }
}
