use std::net::SocketAddr;

use comms::{
    command::{self, UserCommand},
    document::AuthUser,
    event::{self, Event},
    transport,
};
use tokio::net::{TcpListener, TcpStream};
use tokio_stream::StreamExt;

#[tokio::test]
async fn assert_server_client_transport() {
    // bind to any free port so the test can run next to other tests
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("could not bind to a port");
    let addr = listener.local_addr().expect("listener has no local address");

    let (server_collected_commands, client_collected_events) =
        tokio::join!(execute_server(listener), execute_client(addr));

    assert_eq!(
        server_collected_commands.unwrap(),
        vec![
            UserCommand::SignIn(command::SignInCommand {
                request_id: 1,
                email: "mario@example.com".into(),
                password: "its-a-me".into(),
            }),
            UserCommand::Listen(command::ListenCommand {
                request_id: 2,
                room: "general".into(),
            }),
            UserCommand::Unlisten(command::UnlistenCommand { listener_id: 2 }),
        ]
    );

    assert_eq!(client_collected_events.unwrap(), vec![welcome_event()]);
}

fn welcome_event() -> Event {
    Event::AuthState(event::AuthStateEvent {
        user: Some(AuthUser {
            uid: "uid-1".into(),
            email: "mario@example.com".into(),
        }),
    })
}

async fn execute_server(listener: TcpListener) -> anyhow::Result<Vec<command::UserCommand>> {
    // accept the only client connection we will have
    let tcp_stream = match listener.accept().await {
        Ok((tcp_stream, _addr)) => tcp_stream,
        Err(e) => return Err(anyhow::anyhow!("failed to accept client: {}", e)),
    };

    // break the client connection into higher level API for ease of use
    let (mut command_stream, mut event_writer) = transport::server::split_tcp_stream(tcp_stream);
    // store commands received from the client
    let mut collected_commands = Vec::new();

    // tell the client who it is signed in as
    event_writer.write(&welcome_event()).await?;

    // listen for commands from the client until the connection is closed
    while let Some(result) = command_stream.next().await {
        match result {
            // client has sent a valid command which we could read and parse
            Ok(command) => collected_commands.push(command),
            // client has sent a command which we could not read or parse
            Err(e) => return Err(anyhow::anyhow!("failed to read command: {}", e)),
        }
    }

    Ok(collected_commands)
}

async fn execute_client(addr: SocketAddr) -> anyhow::Result<Vec<event::Event>> {
    let tcp_stream = match TcpStream::connect(addr).await {
        Ok(tcp_stream) => tcp_stream,
        Err(e) => return Err(anyhow::anyhow!("failed to connect to server: {}", e)),
    };

    let (mut event_stream, mut command_writer) = transport::client::split_tcp_stream(tcp_stream);
    let mut collected_events = Vec::new();

    // read the welcome event from the server
    match event_stream.next().await {
        Some(Ok(event)) => collected_events.push(event),
        Some(Err(e)) => return Err(anyhow::anyhow!("could not parse event: {}", e)),
        None => return Err(anyhow::anyhow!("server closed the connection")),
    }

    command_writer
        .write(&UserCommand::SignIn(command::SignInCommand {
            request_id: 1,
            email: "mario@example.com".into(),
            password: "its-a-me".into(),
        }))
        .await?;

    command_writer
        .write(&UserCommand::Listen(command::ListenCommand {
            request_id: 2,
            room: "general".into(),
        }))
        .await?;

    command_writer
        .write(&UserCommand::Unlisten(command::UnlistenCommand { listener_id: 2 }))
        .await?;

    Ok(collected_events)
}
