use std::{
    io::{self, Stdout},
    panic,
    time::{Duration, Instant},
};

use anyhow::Context;
use crossterm::{
    event::{Event, EventStream, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::prelude::*;
use tokio::sync::{
    broadcast,
    mpsc::{self, UnboundedReceiver},
};
use tokio_stream::StreamExt;

use crate::{
    state_store::{action::Action, State},
    termination::Interrupted,
    ui_management::components::{Component, ComponentRender},
};

use super::pages::AppRouter;

/// Redraws happen at least this often, notices run out on the same beat
const RENDERING_TICK_RATE: Duration = Duration::from_millis(250);

pub struct UiManager {
    action_tx: mpsc::UnboundedSender<Action>,
}

impl UiManager {
    pub fn new() -> (Self, UnboundedReceiver<Action>) {
        let (action_tx, action_rx) = mpsc::unbounded_channel();

        (Self { action_tx }, action_rx)
    }

    pub async fn main_loop(
        self,
        mut state_rx: UnboundedReceiver<State>,
        mut interrupt_rx: broadcast::Receiver<Interrupted>,
    ) -> anyhow::Result<Interrupted> {
        // the first snapshot builds the pages
        let mut state = state_rx
            .recv()
            .await
            .context("the state store stopped before the first state")?;
        let mut app_router = AppRouter::new(&state, self.action_tx.clone());

        install_panic_hook();
        let mut terminal = setup_terminal()?;
        let mut ticker = tokio::time::interval(RENDERING_TICK_RATE);
        let mut crossterm_events = EventStream::new();

        let result: anyhow::Result<Interrupted> = loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if state.expire_notice(Instant::now()) {
                        app_router = app_router.move_with_state(&state);
                    }
                },
                maybe_event = crossterm_events.next() => match maybe_event {
                    Some(Ok(Event::Key(key))) if is_quit(&key) => {
                        let _ = self.action_tx.send(Action::Exit);
                    },
                    Some(Ok(Event::Key(key))) => {
                        app_router.handle_key_event(key);
                    },
                    // the terminal is gone, take the state store down with us
                    None => {
                        let _ = self.action_tx.send(Action::Exit);

                        break Ok(Interrupted::UserInt);
                    },
                    _ => (),
                },
                Some(next) = state_rx.recv() => {
                    state = next;
                    app_router = app_router.move_with_state(&state);
                },
                Ok(interrupted) = interrupt_rx.recv() => {
                    break Ok(interrupted);
                }
            }

            if let Err(err) = terminal
                .draw(|frame| app_router.render(frame, ()))
                .context("could not render to the terminal")
            {
                break Err(err);
            }
        };

        restore_terminal(&mut terminal)?;

        result
    }
}

/// Ctrl+C leaves the app from any page or section
fn is_quit(key: &KeyEvent) -> bool {
    key.kind == KeyEventKind::Press
        && key.code == KeyCode::Char('c')
        && key.modifiers.contains(KeyModifiers::CONTROL)
}

/// Gives the terminal back before a panic message is printed
fn install_panic_hook() {
    let original = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);

        original(info);
    }));
}

fn setup_terminal() -> anyhow::Result<Terminal<CrosstermBackend<Stdout>>> {
    let mut stdout = io::stdout();

    enable_raw_mode()?;

    execute!(stdout, EnterAlternateScreen)?;

    Ok(Terminal::new(CrosstermBackend::new(stdout))?)
}

fn restore_terminal(terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> anyhow::Result<()> {
    disable_raw_mode()?;

    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    Ok(terminal.show_cursor()?)
}
