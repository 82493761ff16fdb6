use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{prelude::*, widgets::*, Frame};
use tokio::sync::mpsc::UnboundedSender;

use crate::state_store::{action::Action, AuthMode, Page, State};
use crate::ui_management::components::{
    input_box::{self, InputBox},
    Component, ComponentRender, KeyHandled,
};

use super::notice_line;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    DisplayName,
    Email,
    Password,
}

impl Field {
    const ALL: [Field; 3] = [Field::DisplayName, Field::Email, Field::Password];

    fn title(&self) -> &'static str {
        match self {
            Field::DisplayName => "Display Name",
            Field::Email => "Email",
            Field::Password => "Password",
        }
    }

    fn next(self) -> Self {
        match self {
            Field::DisplayName => Field::Email,
            Field::Email => Field::Password,
            Field::Password => Field::DisplayName,
        }
    }

    fn previous(self) -> Self {
        match self {
            Field::DisplayName => Field::Password,
            Field::Email => Field::DisplayName,
            Field::Password => Field::Email,
        }
    }
}

struct Props {
    mode: AuthMode,
    pending: bool,
    backend_addr: String,
    notice: Option<chatroom::notice::Notice>,
}

impl From<&State> for Props {
    fn from(state: &State) -> Self {
        Props {
            mode: state.auth_mode,
            pending: state.auth_pending,
            backend_addr: state.backend_addr.clone(),
            notice: state.notice.clone(),
        }
    }
}

/// AuthPage collects the credentials to sign up or log in with
pub struct AuthPage {
    /// Action sender
    action_tx: UnboundedSender<Action>,
    props: Props,
    /// Field receiving the key presses
    focused: Field,
    display_name: InputBox,
    email: InputBox,
    password: InputBox,
}

impl AuthPage {
    fn input_for(&self, field: Field) -> &InputBox {
        match field {
            Field::DisplayName => &self.display_name,
            Field::Email => &self.email,
            Field::Password => &self.password,
        }
    }

    fn input_for_mut(&mut self, field: Field) -> &mut InputBox {
        match field {
            Field::DisplayName => &mut self.display_name,
            Field::Email => &mut self.email,
            Field::Password => &mut self.password,
        }
    }

    fn submit(&mut self) {
        if self.props.pending {
            return;
        }

        let display_name = String::from(self.display_name.text());
        let email = String::from(self.email.text());
        let password = String::from(self.password.text());

        let action = match self.props.mode {
            AuthMode::SignUp => Action::SignUp {
                display_name,
                email,
                password,
            },
            AuthMode::LogIn => Action::LogIn {
                display_name,
                email,
                password,
            },
        };

        let _ = self.action_tx.send(action);
    }
}

impl Component for AuthPage {
    fn new(state: &State, action_tx: UnboundedSender<Action>) -> Self
    where
        Self: Sized,
    {
        AuthPage {
            action_tx: action_tx.clone(),
            props: Props::from(state),
            focused: Field::DisplayName,
            display_name: InputBox::new(state, action_tx.clone()),
            email: InputBox::new(state, action_tx.clone()),
            password: InputBox::new(state, action_tx),
        }
        .move_with_state(state)
    }

    fn move_with_state(mut self, state: &State) -> Self
    where
        Self: Sized,
    {
        // the password never outlives the visit to this page
        if state.page == Page::Chat && !self.password.is_empty() {
            self.password.reset();
            self.focused = Field::DisplayName;
        }

        AuthPage {
            props: Props::from(state),
            ..self
        }
    }

    fn name(&self) -> &str {
        "Auth Page"
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> KeyHandled {
        if key.kind != KeyEventKind::Press {
            return KeyHandled::Ignored;
        }

        match key.code {
            KeyCode::Enter => self.submit(),
            KeyCode::Tab | KeyCode::Down => self.focused = self.focused.next(),
            KeyCode::BackTab | KeyCode::Up => self.focused = self.focused.previous(),
            KeyCode::Esc => {
                let _ = self.action_tx.send(Action::Exit);
            }
            KeyCode::Char('t') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                let _ = self.action_tx.send(Action::ToggleAuthMode);
            }
            _ => {
                let focused = self.focused;
                return self.input_for_mut(focused).handle_key_event(key);
            }
        }

        KeyHandled::Consumed
    }
}

impl ComponentRender<()> for AuthPage {
    fn render<B: Backend>(&self, frame: &mut Frame<B>, _props: ()) {
        let [_, vertical_centered, _] = *Layout::default()
            .direction(Direction::Vertical)
            .constraints(
                [
                    Constraint::Ratio(1, 4),
                    Constraint::Min(1),
                    Constraint::Ratio(1, 4),
                ]
                .as_ref(),
            )
            .split(frame.size())
        else {
            panic!("The main layout should have 3 chunks")
        };

        let [_, both_centered, _] = *Layout::default()
            .direction(Direction::Horizontal)
            .constraints(
                [
                    Constraint::Ratio(1, 4),
                    Constraint::Min(1),
                    Constraint::Ratio(1, 4),
                ]
                .as_ref(),
            )
            .split(vertical_centered)
        else {
            panic!("The horizontal layout should have 3 chunks")
        };

        let [container_title, container_name, container_email, container_password, container_notice, container_help_text] =
            *Layout::default()
                .direction(Direction::Vertical)
                .constraints(
                    [
                        Constraint::Length(2),
                        Constraint::Length(3),
                        Constraint::Length(3),
                        Constraint::Length(3),
                        Constraint::Length(2),
                        Constraint::Min(1),
                    ]
                    .as_ref(),
                )
                .split(both_centered)
        else {
            panic!("The form layout should have 6 chunks")
        };

        let title = Paragraph::new(Text::from(Line::from(vec![
            Span::from(self.props.mode.title()).bold(),
            format!(" on {}", self.props.backend_addr).into(),
        ])));
        frame.render_widget(title, container_title);

        let containers = [container_name, container_email, container_password];
        for (field, area) in Field::ALL.into_iter().zip(containers) {
            let is_focused = field == self.focused;

            self.input_for(field).render(
                frame,
                input_box::RenderProps {
                    title: field.title().into(),
                    area,
                    border_color: if is_focused { Color::Yellow } else { Color::Reset },
                    show_cursor: is_focused && !self.props.pending,
                    masked: field == Field::Password,
                },
            );
        }

        let status = if self.props.pending {
            Line::from(Span::from("Please wait...").italic())
        } else {
            notice_line(self.props.notice.as_ref())
        };
        frame.render_widget(Paragraph::new(status), container_notice);

        let other_mode = self.props.mode.toggled().title();
        let help_text = Paragraph::new(Text::from(vec![
            Line::from(vec![
                "Press ".into(),
                "<Enter>".bold(),
                format!(" to {}, ", self.props.mode.title().to_lowercase()).into(),
                "<Tab>".bold(),
                " to move between fields.".into(),
            ]),
            Line::from(vec![
                "Press ".into(),
                "<Ctrl+T>".bold(),
                format!(" to {} instead, ", other_mode.to_lowercase()).into(),
                "<Esc>".bold(),
                " to exit.".into(),
            ]),
        ]))
        .wrap(Wrap { trim: true });
        frame.render_widget(help_text, container_help_text);
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn press(page: &mut AuthPage, code: KeyCode, modifiers: KeyModifiers) {
        page.handle_key_event(KeyEvent::new(code, modifiers));
    }

    fn type_text(page: &mut AuthPage, text: &str) {
        for c in text.chars() {
            press(page, KeyCode::Char(c), KeyModifiers::NONE);
        }
    }

    #[test]
    fn test_submits_in_the_current_mode() {
        let (action_tx, mut action_rx) = mpsc::unbounded_channel();
        let mut state = State::new("localhost:8080", "anon");
        let mut page = AuthPage::new(&state, action_tx);

        type_text(&mut page, "mario");
        press(&mut page, KeyCode::Tab, KeyModifiers::NONE);
        type_text(&mut page, "mario@example.com");
        press(&mut page, KeyCode::Tab, KeyModifiers::NONE);
        type_text(&mut page, "hunter2");
        press(&mut page, KeyCode::Enter, KeyModifiers::NONE);

        match action_rx.try_recv() {
            Ok(Action::SignUp {
                display_name,
                email,
                password,
            }) => {
                assert_eq!(display_name, "mario");
                assert_eq!(email, "mario@example.com");
                assert_eq!(password, "hunter2");
            }
            other => panic!("expected a sign up, got {:?}", other),
        }

        press(&mut page, KeyCode::Char('t'), KeyModifiers::CONTROL);
        assert!(matches!(action_rx.try_recv(), Ok(Action::ToggleAuthMode)));

        state.auth_mode = AuthMode::LogIn;
        page = page.move_with_state(&state);
        press(&mut page, KeyCode::Enter, KeyModifiers::NONE);
        assert!(matches!(action_rx.try_recv(), Ok(Action::LogIn { .. })));
    }

    #[test]
    fn test_no_resubmit_while_pending() {
        let (action_tx, mut action_rx) = mpsc::unbounded_channel();
        let mut state = State::new("localhost:8080", "anon");
        state.auth_pending = true;
        let mut page = AuthPage::new(&state, action_tx);

        press(&mut page, KeyCode::Enter, KeyModifiers::NONE);
        assert!(action_rx.try_recv().is_err());
    }
}
