use tokio::net::TcpStream;

use crate::{command, event};

use super::common::{read_json_lines, BoxedStream, JsonLinesWriter};

/// [EventStream] is a stream of [crate::event::Event]s sent by the backend
///
/// # Cancel Safety
///
/// This stream is cancel-safe, meaning that it can be used in [tokio::select]
/// without the risk of missing events.
pub type EventStream = BoxedStream<anyhow::Result<event::Event>>;

/// [CommandWriter] writes [crate::command::UserCommand]s to the backend
pub type CommandWriter = JsonLinesWriter<command::UserCommand>;

/// Splits a TCP stream into a stream of events and a command writer.
///
/// # Arguments
///
/// - `stream` - A [TcpStream] connected to the backend
pub fn split_tcp_stream(stream: TcpStream) -> (EventStream, CommandWriter) {
    let (reader, writer) = stream.into_split();

    (
        read_json_lines(reader, "backend"),
        CommandWriter::new(writer),
    )
}
