//! Connection streams
//!
//! A [`Connection`] is any duplex stream the server can hand to its own
//! thread, plus the few transport knobs the server needs.

use std::io::{self, Read, Write};
use std::net::TcpStream;
use std::time::Duration;

#[cfg(unix)]
use std::os::unix::net::UnixStream;

/// A duplex stream served by one connection thread
pub trait Connection: Read + Write + Send + 'static {
    /// Human-readable peer identity for logs
    fn peer_label(&self) -> String;

    /// Apply read/write timeouts; `None` blocks forever
    fn set_timeouts(&self, read: Option<Duration>, write: Option<Duration>) -> io::Result<()>;
}

impl Connection for TcpStream {
    fn peer_label(&self) -> String {
        self.peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string())
    }

    fn set_timeouts(&self, read: Option<Duration>, write: Option<Duration>) -> io::Result<()> {
        self.set_nodelay(true)?;
        self.set_read_timeout(read)?;
        self.set_write_timeout(write)?;
        Ok(())
    }
}

#[cfg(unix)]
impl Connection for UnixStream {
    fn peer_label(&self) -> String {
        match self.peer_addr() {
            Ok(addr) => match addr.as_pathname() {
                Some(path) => path.display().to_string(),
                None => "unix:unnamed".to_string(),
            },
            Err(_) => "unknown".to_string(),
        }
    }

    fn set_timeouts(&self, read: Option<Duration>, write: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(read)?;
        self.set_write_timeout(write)?;
        Ok(())
    }
}

/// Convert a millisecond setting into a timeout, `0` meaning none
pub fn timeout_from_ms(ms: u64) -> Option<Duration> {
    if ms > 0 {
        Some(Duration::from_millis(ms))
    } else {
        None
    }
}
