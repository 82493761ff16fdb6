use std::fmt::Display;

use anyhow::Context;
use colored::Colorize;
use log::{Level, LevelFilter};

/// Dependencies only get to log warnings and errors
const ALLOWED_EXTERNAL_LEVELS: [Level; 2] = [Level::Warn, Level::Error];

pub fn init_logger(level: LevelFilter) -> anyhow::Result<()> {
    fern::Dispatch::new()
        .format(move |out, message, record| {
            let target = Target::from_str(record.target());
            let now = chrono::Local::now();

            out.finish(format_args!(
                "{:^5} {} {:^8} {}",
                level_to_string(&record.level()),
                now.format("%H:%M:%S").to_string().bright_black(),
                target,
                message
            ))
        })
        .level(level)
        .filter(|meta| {
            let target = Target::from_str(meta.target());

            target.is_local() || ALLOWED_EXTERNAL_LEVELS.contains(&meta.level())
        })
        .chain(std::io::stdout())
        .apply()
        .context("a logger was already installed")
}

enum Target {
    External(String),
    Server,
    Chatroom,
    Comms,
}

impl Target {
    fn from_str(target: &str) -> Self {
        match target.split("::").next().unwrap_or_default() {
            "server" => Self::Server,
            "chatroom" => Self::Chatroom,
            "comms" => Self::Comms,
            other => Self::External(other.to_string()),
        }
    }

    fn is_local(&self) -> bool {
        !matches!(self, Self::External(_))
    }
}

impl Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let result = match self {
            Target::External(x) => x.as_str().clear(),
            Target::Server => "SERVER".bright_green(),
            Target::Chatroom => "CHATROOM".bright_purple(),
            Target::Comms => "COMMS".blue(),
        };

        Display::fmt(&result, f)
    }
}

fn level_to_string(level: &Level) -> String {
    match level {
        Level::Error => " ERR ".black().on_red().bold().to_string(),
        Level::Warn => " WRN ".black().on_yellow().bold().to_string(),
        Level::Info => " INF ".black().on_blue().bold().to_string(),
        Level::Debug => " DBG ".white().on_black().to_string(),
        Level::Trace => " TRC ".to_string(),
    }
}
