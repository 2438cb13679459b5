//! Listeners
//!
//! Minimal accept interface implemented for TCP and Unix domain sockets.

use std::io::{self, ErrorKind};
use std::net::{TcpListener, TcpStream};
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::net::{UnixListener, UnixStream};

use super::Connection;

/// Pause after a non-fatal accept error before accepting again
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Source of incoming connections
pub trait Listener {
    type Stream: Connection;

    fn accept(&self) -> io::Result<Self::Stream>;

    /// Whether an accept error means the listener itself is unusable
    ///
    /// Anything else (a client resetting mid-handshake, a signal, running
    /// out of descriptors for a moment) is worth retrying.
    fn is_fatal(&self, err: &io::Error) -> bool {
        matches!(
            err.kind(),
            ErrorKind::InvalidInput | ErrorKind::NotConnected | ErrorKind::Unsupported
        )
    }
}

impl Listener for TcpListener {
    type Stream = TcpStream;

    fn accept(&self) -> io::Result<TcpStream> {
        TcpListener::accept(self).map(|(stream, _)| stream)
    }
}

#[cfg(unix)]
impl Listener for UnixListener {
    type Stream = UnixStream;

    fn accept(&self) -> io::Result<UnixStream> {
        UnixListener::accept(self).map(|(stream, _)| stream)
    }
}
