//! In-process duplex stream
//!
//! [`duplex`] returns two connected ends: bytes written to one are read from
//! the other. Handy for running a client and a server in the same process
//! without a socket.

use std::cell::Cell;
use std::io::{self, ErrorKind, Read, Write};
use std::time::Duration;

use crossbeam::channel::{unbounded, Receiver, RecvTimeoutError, Sender};

use super::Connection;

/// One end of an in-process duplex stream
pub struct MemoryStream {
    /// `None` once this side has shut down writing
    tx: Option<Sender<Vec<u8>>>,

    rx: Receiver<Vec<u8>>,

    /// Chunk received but not yet fully read
    pending: Vec<u8>,
    pos: usize,

    read_timeout: Cell<Option<Duration>>,
}

/// Create a connected pair of streams
pub fn duplex() -> (MemoryStream, MemoryStream) {
    let (a_tx, a_rx) = unbounded();
    let (b_tx, b_rx) = unbounded();
    (MemoryStream::new(a_tx, b_rx), MemoryStream::new(b_tx, a_rx))
}

impl MemoryStream {
    fn new(tx: Sender<Vec<u8>>, rx: Receiver<Vec<u8>>) -> Self {
        Self {
            tx: Some(tx),
            rx,
            pending: Vec::new(),
            pos: 0,
            read_timeout: Cell::new(None),
        }
    }

    /// Stop writing; the other end reads EOF once it drains what was sent
    pub fn shutdown_write(&mut self) {
        self.tx = None;
    }

    fn recv(&self) -> io::Result<Option<Vec<u8>>> {
        let received = match self.read_timeout.get() {
            Some(timeout) => self.rx.recv_timeout(timeout),
            None => self.rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
        };

        match received {
            Ok(chunk) => Ok(Some(chunk)),
            Err(RecvTimeoutError::Disconnected) => Ok(None),
            Err(RecvTimeoutError::Timeout) => {
                Err(io::Error::new(ErrorKind::TimedOut, "read timed out"))
            }
        }
    }
}

impl Read for MemoryStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.pos >= self.pending.len() {
            match self.recv()? {
                Some(chunk) => {
                    self.pending = chunk;
                    self.pos = 0;
                }
                None => return Ok(0),
            }
        }

        let n = buf.len().min(self.pending.len() - self.pos);
        buf[..n].copy_from_slice(&self.pending[self.pos..self.pos + n]);
        self.pos += n;
        Ok(n)
    }
}

impl Write for MemoryStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let tx = self
            .tx
            .as_ref()
            .ok_or_else(|| io::Error::new(ErrorKind::BrokenPipe, "write side shut down"))?;

        tx.send(buf.to_vec())
            .map_err(|_| io::Error::new(ErrorKind::BrokenPipe, "peer dropped"))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Connection for MemoryStream {
    fn peer_label(&self) -> String {
        "memory".to_string()
    }

    fn set_timeouts(&self, read: Option<Duration>, _write: Option<Duration>) -> io::Result<()> {
        // Writes never block on an unbounded channel
        self.read_timeout.set(read);
        Ok(())
    }
}
