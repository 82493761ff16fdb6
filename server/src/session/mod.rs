use std::sync::Arc;

use chatroom::backend::memory::{MemoryBackend, MemoryDatabase};
use comms::{event, transport};
use log::{debug, info, warn};
use nanoid::nanoid;
use tokio::{net::TcpStream, sync::broadcast};
use tokio_stream::StreamExt;

use self::client_session::ClientSession;

mod client_session;

/// Serves a single client until it disconnects or the server shuts down.
/// Every connection signs in on its own, over the shared database.
pub async fn handle_client_session(
    database: Arc<MemoryDatabase>,
    mut quit_rx: broadcast::Receiver<()>,
    stream: TcpStream,
) -> anyhow::Result<()> {
    let session_id = nanoid!();
    let (mut commands, mut event_writer) = transport::server::split_tcp_stream(stream);

    // nobody is signed in on a fresh connection
    event_writer
        .write(&event::Event::AuthState(event::AuthStateEvent { user: None }))
        .await?;

    let mut client_session = ClientSession::new(&session_id, MemoryBackend::new(database));

    loop {
        tokio::select! {
            cmd = commands.next() => match cmd {
                None => {
                    info!("Client {} disconnected", session_id);
                    break;
                }
                Some(Ok(cmd)) => {
                    debug!("Client {} sent {:?}", session_id, cmd);
                    for event in client_session.handle_command(cmd).await {
                        event_writer.write(&event).await?;
                    }
                }
                Some(Err(err)) => warn!("Client {} sent an unreadable command: {:#}", session_id, err),
            },
            // changes of the client's live queries
            Some(event) = client_session.recv() => {
                event_writer.write(&event).await?;
            }
            Ok(_) = quit_rx.recv() => {
                drop(event_writer);
                info!("Gracefully shutting down client {}", session_id);
                break;
            }
        }
    }

    client_session.unlisten_all().await;

    Ok(())
}
