use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{
    prelude::{Backend, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, ListState},
    Frame,
};
use tokio::sync::mpsc::UnboundedSender;

use super::super::section::{
    usage::{HasUsageInfo, UsageInfo, UsageInfoLine},
    SectionActivation,
};
use crate::state_store::{action::Action, RoomInfo, State};
use crate::ui_management::components::{Component, ComponentRender, KeyHandled};

struct Props {
    /// Rooms offered to the user
    rooms: Vec<RoomInfo>,
    /// Room the session listens to
    active_room: String,
}

impl From<&State> for Props {
    fn from(state: &State) -> Self {
        Self {
            rooms: state.rooms.clone(),
            active_room: state.active_room.clone(),
        }
    }
}

pub struct RoomList {
    /// Sending actions to the state store
    action_tx: UnboundedSender<Action>,
    /// State Mapped RoomList Props
    props: Props,
    // Internal Component State
    /// List with optional selection and current offset
    pub list_state: ListState,
}

impl RoomList {
    fn next(&mut self) {
        if self.props.rooms.is_empty() {
            return;
        }

        let i = match self.list_state.selected() {
            Some(i) if i + 1 < self.props.rooms.len() => i + 1,
            _ => 0,
        };
        self.list_state.select(Some(i));
    }

    fn previous(&mut self) {
        if self.props.rooms.is_empty() {
            return;
        }

        let i = match self.list_state.selected() {
            Some(0) | None => self.props.rooms.len() - 1,
            Some(i) => i - 1,
        };
        self.list_state.select(Some(i));
    }

    fn get_room_idx(&self, name: &str) -> Option<usize> {
        self.props.rooms.iter().position(|room| room.name == name)
    }
}

impl Component for RoomList {
    fn new(state: &State, action_tx: UnboundedSender<Action>) -> Self {
        Self {
            action_tx,
            props: Props::from(state),
            //
            list_state: ListState::default(),
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
        "Room List"
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> KeyHandled {
        if key.kind != KeyEventKind::Press {
            return KeyHandled::Ignored;
        }

        match key.code {
            KeyCode::Up => self.previous(),
            KeyCode::Down => self.next(),
            KeyCode::Enter => {
                let selected = self
                    .list_state
                    .selected()
                    .and_then(|idx| self.props.rooms.get(idx));

                if let Some(room) = selected {
                    let _ = self.action_tx.send(Action::SelectRoom {
                        room: room.name.clone(),
                    });
                }
            }
            _ => return KeyHandled::Ignored,
        }

        KeyHandled::Consumed
    }
}

impl SectionActivation for RoomList {
    fn activate(&mut self) {
        let idx = self.get_room_idx(&self.props.active_room).unwrap_or(0);

        *self.list_state.offset_mut() = 0;
        self.list_state.select(Some(idx));
    }

    fn deactivate(&mut self) {
        *self.list_state.offset_mut() = 0;
        self.list_state.select(None);
    }
}

pub struct RenderProps {
    pub border_color: Color,
    pub area: Rect,
}

impl ComponentRender<RenderProps> for RoomList {
    fn render<B: Backend>(&self, frame: &mut Frame<B>, props: RenderProps) {
        let room_list: Vec<ListItem> = self
            .props
            .rooms
            .iter()
            .map(|room| {
                let content = Line::from(Span::raw(format!("#{}", room.name)));

                let style = if self.list_state.selected().is_none()
                    && room.name == self.props.active_room
                {
                    Style::default().add_modifier(Modifier::BOLD)
                } else {
                    Style::default()
                };

                ListItem::new(content).style(style.bg(Color::Reset))
            })
            .collect();

        let room_list = List::new(room_list)
            .block(
                Block::default()
                    .borders(Borders::ALL)
                    .border_style(Style::new().fg(props.border_color))
                    .title("Rooms"),
            )
            .highlight_style(
                Style::default()
                    // yellow that would work for both dark / light modes
                    .bg(Color::Rgb(255, 223, 102))
                    .add_modifier(Modifier::BOLD),
            )
            .highlight_symbol(">");

        let mut app_room_list_state = self.list_state.clone();
        frame.render_stateful_widget(room_list, props.area, &mut app_room_list_state);
    }
}

impl HasUsageInfo for RoomList {
    fn usage_info(&self) -> UsageInfo {
        UsageInfo {
            description: Some("Select the room to talk in".into()),
            lines: vec![
                UsageInfoLine {
                    keys: vec!["Esc".into()],
                    description: "to cancel".into(),
                },
                UsageInfoLine {
                    keys: vec!["↑".into(), "↓".into()],
                    description: "to navigate".into(),
                },
                UsageInfoLine {
                    keys: vec!["Enter".into()],
                    description: "to switch to the selected room".into(),
                },
            ],
        }
    }
}
