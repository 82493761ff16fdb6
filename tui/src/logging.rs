use std::path::Path;

use anyhow::Context;
use log::{Level, LevelFilter};

/// Dependencies only get to log warnings and errors
const ALLOWED_EXTERNAL_LEVELS: [Level; 2] = [Level::Warn, Level::Error];
const LOCAL_TARGETS: [&str; 2] = ["tui", "chatroom"];

/// The terminal is busy drawing the UI, so everything goes to `path`
pub fn init_logger(path: &Path) -> anyhow::Result<()> {
    let log_file = fern::log_file(path)
        .with_context(|| format!("could not open the log file {}", path.display()))?;

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{} {:<5} {:<24} {}",
                chrono::Local::now().format("%H:%M:%S%.3f"),
                record.level(),
                record.target(),
                message
            ))
        })
        .level(LevelFilter::Debug)
        .filter(|meta| {
            let crate_name = meta.target().split("::").next().unwrap_or_default();

            LOCAL_TARGETS.contains(&crate_name) || ALLOWED_EXTERNAL_LEVELS.contains(&meta.level())
        })
        .chain(log_file)
        .apply()
        .context("a logger was already installed")
}
