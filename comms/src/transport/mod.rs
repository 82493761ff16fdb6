/// Transport over TCP implementation for a client to be able to talk to the backend
#[cfg(feature = "client")]
pub mod client;
#[cfg(any(feature = "client", feature = "server"))]
mod common;
/// Transport over TCP implementation for the backend to serve a single client TCP Stream
#[cfg(feature = "server")]
pub mod server;
