use std::sync::Arc;

use anyhow::Context;
use chatroom::{
    backend::remote::RemoteBackend,
    local_store::{JsonFileStore, LocalStore},
    IdentityGate, RoomSession,
};
use log::info;

use config::Config;
use state_store::StateStore;
use termination::{create_termination, Interrupted};
use ui_management::UiManager;

mod config;
mod logging;
mod state_store;
mod termination;
mod ui_management;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let config = Config::from_env();
    logging::init_logger(&config.log_file)?;

    let local_store: Arc<dyn LocalStore> = Arc::new(JsonFileStore::open(&config.local_store_path)?);
    let backend = Arc::new(
        RemoteBackend::connect(&config.backend_addr)
            .await
            .context("is the server running?")?,
    );
    info!("connected to {}", config.backend_addr);

    let session = RoomSession::restore(backend.clone(), local_store.clone());
    let gate = IdentityGate::new(backend, local_store);

    let (terminator, mut interrupt_rx) = create_termination();
    let (state_store, state_rx) = StateStore::new(&config.backend_addr);
    let (ui_manager, action_rx) = UiManager::new();

    tokio::try_join!(
        state_store.main_loop(
            session,
            gate,
            terminator,
            action_rx,
            interrupt_rx.resubscribe()
        ),
        ui_manager.main_loop(state_rx, interrupt_rx.resubscribe()),
    )?;

    if let Ok(reason) = interrupt_rx.recv().await {
        match reason {
            Interrupted::UserInt => info!("exited per user request"),
            Interrupted::OsSigInt => info!("exited because of an os sig int"),
        }
    } else {
        info!("exited because of an unexpected error");
    }

    Ok(())
}
