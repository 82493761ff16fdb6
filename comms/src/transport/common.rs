use std::{marker::PhantomData, pin::Pin};

use anyhow::Context;
use serde::{de::DeserializeOwned, Serialize};
use tokio::{
    io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader},
    net::tcp::OwnedWriteHalf,
};
use tokio_stream::{wrappers::LinesStream, Stream, StreamExt};

pub const NEW_LINE: &[u8; 2] = b"\r\n";

pub type BoxedStream<Item> = Pin<Box<dyn Stream<Item = Item> + Send>>;

/// Writes values of type `T` as single JSON lines to the underlying writer
pub struct JsonLinesWriter<T, W = OwnedWriteHalf> {
    writer: W,
    _item: PhantomData<fn(&T)>,
}

impl<T: Serialize, W: AsyncWrite + Unpin> JsonLinesWriter<T, W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            _item: PhantomData,
        }
    }

    /// Serialize and write a single item, followed by a line break
    ///
    /// # Cancel Safety
    ///
    /// This method is not cancellation safe. If it is used as the event
    /// in a [tokio::select!] statement and some other
    /// branch completes first, then the item may have been
    /// partially written, but future calls to `write` will start over
    /// from the beginning of the buffer. Causing undefined behaviour.
    pub async fn write(&mut self, item: &T) -> anyhow::Result<()> {
        let mut serialized_bytes = serde_json::to_vec(item)?;
        serialized_bytes.extend_from_slice(NEW_LINE);

        self.writer.write_all(serialized_bytes.as_slice()).await?;

        Ok(())
    }
}

/// Turns a reader into a stream of values of type `T`, one per line.
/// `peer` is only used to make the error messages readable.
pub fn read_json_lines<T, R>(reader: R, peer: &'static str) -> BoxedStream<anyhow::Result<T>>
where
    T: DeserializeOwned + 'static,
    R: AsyncRead + Send + 'static,
{
    Box::pin(
        LinesStream::new(BufReader::new(reader).lines()).map(move |line| {
            line.with_context(|| format!("could not read line from the {}", peer))
                .and_then(|line| {
                    serde_json::from_str::<T>(&line)
                        .with_context(|| format!("failed to deserialize line from the {}", peer))
                })
        }),
    )
}
