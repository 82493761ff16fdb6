use std::sync::Arc;

use chatroom::{
    message_list::{MessageList, RenderedMessage},
    notice::Notice,
};
use chrono::Utc;
use crossterm::event::{KeyCode, KeyEvent, KeyEventKind};
use ratatui::{prelude::*, widgets::*, Frame};
use tokio::sync::mpsc::UnboundedSender;

use crate::state_store::{action::Action, RoomInfo, State};
use crate::ui_management::components::{Component, ComponentRender, KeyHandled};

use super::super::notice_line;
use super::{
    components::{
        message_input_box::{self, MessageInputBox},
        name_input_box::{self, NameInputBox},
        room_list::{self, RoomList},
    },
    section::{
        usage::{widget_usage_to_text, HasUsageInfo, UsageInfo, UsageInfoLine},
        SectionActivation,
    },
};

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Section {
    MessageInput,
    RoomList,
    NameInput,
}

impl Section {
    const ORDER: [Section; 3] = [Section::RoomList, Section::MessageInput, Section::NameInput];

    fn position(&self) -> usize {
        Self::ORDER
            .iter()
            .position(|section| section == self)
            .unwrap_or(0)
    }
}

struct Props {
    display_name: String,
    backend_addr: String,
    /// Info of the room the session listens to
    active_room: Option<RoomInfo>,
    active_room_name: String,
    /// The timer for the chat page
    timer: usize,
    pending_posts: usize,
    messages: Arc<MessageList>,
    notice: Option<Notice>,
}

impl From<&State> for Props {
    fn from(state: &State) -> Self {
        Props {
            display_name: state.display_name.clone(),
            backend_addr: state.backend_addr.clone(),
            active_room: state.active_room_info().cloned(),
            active_room_name: state.active_room.clone(),
            timer: state.timer,
            pending_posts: state.pending_posts,
            messages: state.messages.clone(),
            notice: state.notice.clone(),
        }
    }
}

const DEFAULT_HOVERED_SECTION: Section = Section::MessageInput;

/// ChatPage handles the UI and the state of the chat page
pub struct ChatPage {
    /// Action sender
    pub action_tx: UnboundedSender<Action>,
    /// State Mapped ChatPage Props
    props: Props,
    // Internal State
    /// Currently active section, handling input
    pub active_section: Option<Section>,
    /// Section that is currently hovered
    pub last_hovered_section: Section,
    // Child Components
    pub room_list: RoomList,
    pub message_input_box: MessageInputBox,
    pub name_input_box: NameInputBox,
}

impl ChatPage {
    fn get_component_for_section(&self, section: Section) -> &dyn Component {
        match section {
            Section::MessageInput => &self.message_input_box,
            Section::RoomList => &self.room_list,
            Section::NameInput => &self.name_input_box,
        }
    }

    fn get_component_for_section_mut(&mut self, section: Section) -> &mut dyn Component {
        match section {
            Section::MessageInput => &mut self.message_input_box,
            Section::RoomList => &mut self.room_list,
            Section::NameInput => &mut self.name_input_box,
        }
    }

    fn get_section_activation_for_section(
        &mut self,
        section: Section,
    ) -> &mut dyn SectionActivation {
        match section {
            Section::MessageInput => &mut self.message_input_box,
            Section::RoomList => &mut self.room_list,
            Section::NameInput => &mut self.name_input_box,
        }
    }

    fn hover_next(&mut self) {
        let idx = self.last_hovered_section.position();
        self.last_hovered_section = Section::ORDER[(idx + 1) % Section::ORDER.len()];
    }

    fn hover_previous(&mut self) {
        let idx = self.last_hovered_section.position();
        let count = Section::ORDER.len();
        self.last_hovered_section = Section::ORDER[(idx + count - 1) % count];
    }

    fn calculate_border_color(&self, section: Section) -> Color {
        match (self.active_section, self.last_hovered_section) {
            (Some(active_section), _) if active_section == section => Color::Yellow,
            (_, last_hovered_section) if last_hovered_section == section => Color::Blue,
            _ => Color::Reset,
        }
    }

    fn is_active(&self, section: Section) -> bool {
        self.active_section == Some(section)
    }

    fn disable_section(&mut self, section: Section) {
        self.get_section_activation_for_section(section)
            .deactivate();

        self.active_section = None;
    }
}

impl Component for ChatPage {
    fn new(state: &State, action_tx: UnboundedSender<Action>) -> Self
    where
        Self: Sized,
    {
        ChatPage {
            action_tx: action_tx.clone(),
            // set the props
            props: Props::from(state),
            // internal component state
            active_section: Option::None,
            last_hovered_section: DEFAULT_HOVERED_SECTION,
            // child components
            room_list: RoomList::new(state, action_tx.clone()),
            message_input_box: MessageInputBox::new(state, action_tx.clone()),
            name_input_box: NameInputBox::new(state, action_tx),
        }
        .move_with_state(state)
    }

    fn move_with_state(self, state: &State) -> Self
    where
        Self: Sized,
    {
        ChatPage {
            props: Props::from(state),
            // propogate the update to the child components
            room_list: self.room_list.move_with_state(state),
            message_input_box: self.message_input_box.move_with_state(state),
            name_input_box: self.name_input_box.move_with_state(state),
            ..self
        }
    }

    fn name(&self) -> &str {
        "Chat Page"
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> KeyHandled {
        if key.kind != KeyEventKind::Press {
            return KeyHandled::Ignored;
        }

        match self.active_section {
            None => match key.code {
                KeyCode::Char('e') => {
                    let last_hovered_section = self.last_hovered_section;

                    self.active_section = Some(last_hovered_section);
                    self.get_section_activation_for_section(last_hovered_section)
                        .activate();
                }
                KeyCode::Left => self.hover_previous(),
                KeyCode::Right => self.hover_next(),
                KeyCode::Char('o') => {
                    let _ = self.action_tx.send(Action::LogOut);
                }
                KeyCode::Char('q') => {
                    let _ = self.action_tx.send(Action::Exit);
                }
                _ => return KeyHandled::Ignored,
            },
            Some(section) => {
                let handled = self
                    .get_component_for_section_mut(section)
                    .handle_key_event(key);

                // the section is left after picking a room, after saving the name,
                // or on an escape the section has no use for
                let is_done = match section {
                    Section::RoomList => key.code == KeyCode::Enter,
                    Section::NameInput => self.name_input_box.take_submitted(),
                    Section::MessageInput => false,
                };

                if is_done || (handled.is_ignored() && key.code == KeyCode::Esc) {
                    self.disable_section(section);
                }
            }
        }

        KeyHandled::Consumed
    }
}

fn calculate_list_offset(height: u16, items_len: usize) -> usize {
    // go back by (container height + 2 for borders) to get the offset
    items_len.saturating_sub((height as usize).saturating_sub(2))
}

fn message_to_line(message: RenderedMessage) -> Line<'static> {
    Line::from(vec![
        Span::from(message.author).bold(),
        Span::raw(format!(": {} ", message.body)),
        Span::from(format!("({})", message.when)).italic().dark_gray(),
    ])
}

impl ComponentRender<()> for ChatPage {
    fn render<B: Backend>(&self, frame: &mut Frame<B>, _props: ()) {
        let [left, middle, right] = *Layout::default()
            .direction(Direction::Horizontal)
            .constraints(
                [
                    Constraint::Percentage(20),
                    Constraint::Percentage(60),
                    Constraint::Percentage(20),
                ]
                .as_ref(),
            )
            .split(frame.size())
        else {
            panic!("The main layout should have 3 chunks")
        };

        let [container_room_list, container_user_info] = *Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(1), Constraint::Length(6)].as_ref())
            .split(left)
        else {
            panic!("The left layout should have 2 chunks")
        };

        self.room_list.render(
            frame,
            room_list::RenderProps {
                border_color: self.calculate_border_color(Section::RoomList),
                area: container_room_list,
            },
        );

        let user_info = Paragraph::new(Text::from(vec![
            Line::from(format!("User: {}", self.props.display_name)),
            Line::from(format!("Server: {}", self.props.backend_addr)),
            Line::from(format!("Chatting for: {} secs", self.props.timer)),
            Line::from(format!("Sending: {}", self.props.pending_posts)),
        ]))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .title("User Information"),
        );
        frame.render_widget(user_info, container_user_info);

        let [container_highlight, container_messages, container_notice, container_input] =
            *Layout::default()
                .direction(Direction::Vertical)
                .constraints(
                    [
                        Constraint::Length(3),
                        Constraint::Min(1),
                        Constraint::Length(1),
                        Constraint::Length(3),
                    ]
                    .as_ref(),
                )
                .split(middle)
        else {
            panic!("The middle layout should have 4 chunks")
        };

        let top_line = match self.props.active_room.as_ref() {
            Some(room) => Line::from(vec![
                "on ".into(),
                Span::from(format!("#{}", room.name)).bold(),
                " for ".into(),
                Span::from(format!(r#""{}""#, room.description)).italic(),
            ]),
            None => Line::from(vec![
                "on ".into(),
                Span::from(format!("#{}", self.props.active_room_name)).bold(),
            ]),
        };

        let room_info = Paragraph::new(Text::from(top_line)).block(
            Block::default()
                .borders(Borders::ALL)
                .title("Active Room Information"),
        );
        frame.render_widget(room_info, container_highlight);

        let lines = self.props.messages.lines(Utc::now());
        let message_offset = calculate_list_offset(container_messages.height, lines.len());
        let messages: Vec<ListItem> = if lines.is_empty() {
            vec![ListItem::new(Line::from(
                Span::from("No messages yet, say hi!").italic(),
            ))]
        } else {
            lines
                .into_iter()
                .skip(message_offset)
                .map(|message| ListItem::new(message_to_line(message)))
                .collect()
        };

        let messages =
            List::new(messages).block(Block::default().borders(Borders::ALL).title("Messages"));
        frame.render_widget(messages, container_messages);

        frame.render_widget(
            Paragraph::new(notice_line(self.props.notice.as_ref())),
            container_notice,
        );

        self.message_input_box.render(
            frame,
            message_input_box::RenderProps {
                border_color: self.calculate_border_color(Section::MessageInput),
                area: container_input,
                show_cursor: self.is_active(Section::MessageInput),
            },
        );

        let [container_name_input, container_usage] = *Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(1)].as_ref())
            .split(right)
        else {
            panic!("The right layout should have 2 chunks")
        };

        self.name_input_box.render(
            frame,
            name_input_box::RenderProps {
                border_color: self.calculate_border_color(Section::NameInput),
                area: container_name_input,
                show_cursor: self.is_active(Section::NameInput),
            },
        );

        let mut usage_text: Text = widget_usage_to_text(self.usage_info());
        usage_text.patch_style(Style::default());
        let usage = Paragraph::new(usage_text)
            .wrap(Wrap { trim: true })
            .block(Block::default().borders(Borders::ALL).title("Usage"));
        frame.render_widget(usage, container_usage);
    }
}

impl HasUsageInfo for ChatPage {
    fn usage_info(&self) -> UsageInfo {
        if let Some(section) = self.active_section {
            let handler: &dyn HasUsageInfo = match section {
                Section::RoomList => &self.room_list,
                Section::MessageInput => &self.message_input_box,
                Section::NameInput => &self.name_input_box,
            };

            handler.usage_info()
        } else {
            UsageInfo {
                description: Some("Select a widget".into()),
                lines: vec![
                    UsageInfoLine {
                        keys: vec!["q".into()],
                        description: "to exit".into(),
                    },
                    UsageInfoLine {
                        keys: vec!["o".into()],
                        description: "to log out".into(),
                    },
                    UsageInfoLine {
                        keys: vec!["←".into(), "→".into()],
                        description: "to hover widgets".into(),
                    },
                    UsageInfoLine {
                        keys: vec!["e".into()],
                        description: format!(
                            "to activate {}",
                            self.get_component_for_section(self.last_hovered_section)
                                .name()
                        ),
                    },
                ],
            }
        }
    }
}
