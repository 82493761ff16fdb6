use chatroom::notice::{Notice, NoticeKind};
use crossterm::event::KeyEvent;
use ratatui::{
    prelude::Backend,
    style::{Color, Style},
    text::{Line, Span},
    Frame,
};
use tokio::sync::mpsc::UnboundedSender;

use crate::state_store::{action::Action, Page, State};

use self::{auth_page::AuthPage, chat_page::ChatPage};

use super::components::{Component, ComponentRender, KeyHandled};

mod auth_page;
mod chat_page;

struct Props {
    active_page: Page,
}

impl From<&State> for Props {
    fn from(state: &State) -> Self {
        Props {
            active_page: state.page,
        }
    }
}

pub struct AppRouter {
    props: Props,
    //
    auth_page: AuthPage,
    chat_page: ChatPage,
}

impl AppRouter {
    fn get_active_page_component(&self) -> &dyn Component {
        match self.props.active_page {
            Page::Auth => &self.auth_page,
            Page::Chat => &self.chat_page,
        }
    }

    fn get_active_page_component_mut(&mut self) -> &mut dyn Component {
        match self.props.active_page {
            Page::Auth => &mut self.auth_page,
            Page::Chat => &mut self.chat_page,
        }
    }
}

impl Component for AppRouter {
    fn new(state: &State, action_tx: UnboundedSender<Action>) -> Self
    where
        Self: Sized,
    {
        AppRouter {
            props: Props::from(state),
            //
            auth_page: AuthPage::new(state, action_tx.clone()),
            chat_page: ChatPage::new(state, action_tx),
        }
        .move_with_state(state)
    }

    fn move_with_state(self, state: &State) -> Self
    where
        Self: Sized,
    {
        AppRouter {
            props: Props::from(state),
            //
            auth_page: self.auth_page.move_with_state(state),
            chat_page: self.chat_page.move_with_state(state),
        }
    }

    // route all functions to the active page
    fn name(&self) -> &str {
        self.get_active_page_component().name()
    }

    fn handle_key_event(&mut self, key: KeyEvent) -> KeyHandled {
        self.get_active_page_component_mut().handle_key_event(key)
    }
}

impl ComponentRender<()> for AppRouter {
    fn render<B: Backend>(&self, frame: &mut Frame<B>, props: ()) {
        match self.props.active_page {
            Page::Auth => self.auth_page.render(frame, props),
            Page::Chat => self.chat_page.render(frame, props),
        }
    }
}

/// One line for the notice on screen, blank when there is none
fn notice_line(notice: Option<&Notice>) -> Line<'static> {
    match notice {
        Some(notice) => {
            let color = match notice.kind {
                NoticeKind::Error => Color::Red,
                NoticeKind::Success => Color::Green,
            };

            Line::from(Span::styled(
                notice.text.clone(),
                Style::default().fg(color),
            ))
        }
        None => Line::from(""),
    }
}
