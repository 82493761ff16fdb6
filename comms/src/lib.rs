/// Set of commands which the backend can receive and process
pub mod command;
/// Documents and accounts as they travel over the wire
pub mod document;
/// Set of events, split into replies to a single command and pushed notifications
pub mod event;
/// Implementation of event and command transportation over TCP Streams.
/// Requires 'server' or 'client' features to be enabled and will bring in tokio dependency alongside with other dependencies
pub mod transport;
