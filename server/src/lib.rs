//! A local stand-in for the hosted backend: the in-memory message store and auth provider,
//! reachable over the `comms` transport.

use std::sync::Arc;

use chatroom::backend::memory::MemoryDatabase;
use log::{info, warn};
use tokio::{net::TcpListener, sync::broadcast, task::JoinSet};

pub mod config;
pub mod logging;
mod session;

/// Accept clients on `listener` until a value arrives on `quit_rx`,
/// then wait for every client session to wind down.
pub async fn serve(
    listener: TcpListener,
    database: Arc<MemoryDatabase>,
    mut quit_rx: broadcast::Receiver<()>,
) -> anyhow::Result<()> {
    let mut join_set: JoinSet<anyhow::Result<()>> = JoinSet::new();

    loop {
        tokio::select! {
            _ = quit_rx.recv() => {
                info!("Gracefully shutting down");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((socket, peer)) => {
                    info!("Accepted client from {}", peer);
                    join_set.spawn(session::handle_client_session(
                        database.clone(),
                        quit_rx.resubscribe(),
                        socket,
                    ));
                }
                Err(err) => warn!("Could not accept a client: {}", err),
            },
            Some(finished) = join_set.join_next() => {
                if let Ok(Err(err)) = finished {
                    warn!("Client session ended with an error: {:#}", err);
                }
            }
        }
    }

    while join_set.join_next().await.is_some() {}

    Ok(())
}
