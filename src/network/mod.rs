//! Network Module
//!
//! Transports the protocol runs over.
//!
//! ## Architecture
//! - Single acceptor thread ([`Server`])
//! - One thread per connection
//! - TCP, Unix domain sockets, stdio and in-process pipes

mod connection;
mod listener;
mod memory;
mod server;
mod stdio;

pub use connection::{timeout_from_ms, Connection};
pub use listener::{Listener, ACCEPT_BACKOFF};
pub use memory::{duplex, MemoryStream};
pub use server::{Server, ShutdownHandle};
pub use stdio::StdioStream;
