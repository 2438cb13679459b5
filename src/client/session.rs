//! Client Session
//!
//! The initiating side of a connection.
//!
//! ## Lifecycle
//! ```text
//! connect ──► read greeting ──► Ready ──► command ──► OK / ERR ──► Ready
//!                                  │          │
//!                                  │          └── INQUIRE ──► D… END / CAN
//!                                  └── close: BYE, drop stream
//! ```

use std::collections::HashMap;
use std::io::{ErrorKind, Read, Write};

use crate::error::{AssuanError, Result};
use crate::protocol::{Line, Pipe, WireError};
use super::InquireData;

/// Bytes pulled from an [`InquireData::Reader`] per `D` batch
const STREAM_CHUNK: usize = 4096;

/// Turn a received `ERR` line into an error value
fn peer_error(line: &Line) -> AssuanError {
    match WireError::decode(&line.params_lossy()) {
        Ok(err) => AssuanError::Peer(err),
        Err(e) => e,
    }
}

/// Client side of a connection
///
/// Not meant for concurrent use; wrap it in a mutex if several threads need
/// to share one connection.
pub struct Session<S: Read + Write> {
    pipe: Pipe<S>,

    /// Text of the server's initial `OK`
    greeting: String,
}

impl<S: Read + Write> Session<S> {
    /// Start a session over `stream` and consume the server's greeting
    pub fn connect(stream: S) -> Result<Self> {
        let mut pipe = Pipe::new(stream);

        let line = pipe.read_line()?;
        if line.is("ERR") {
            return Err(peer_error(&line));
        }

        let greeting = line.params_lossy().into_owned();
        tracing::debug!("Session established: {}", greeting);

        Ok(Self { pipe, greeting })
    }

    /// Greeting text sent by the server
    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// Send `BYE` and close the stream
    ///
    /// The server answers `OK`, but nobody waits for it.
    pub fn close(mut self) -> Result<()> {
        self.pipe.write_line("BYE", "")?;
        drop(self.pipe.into_inner());
        Ok(())
    }

    /// Ask the server to reset per-connection state
    pub fn reset(&mut self) -> Result<()> {
        self.pipe.write_line("RESET", "")?;

        let line = self.pipe.read_line()?;
        match line.verb.as_str() {
            "OK" => Ok(()),
            "ERR" => Err(peer_error(&line)),
            other => Err(AssuanError::InvalidResponse(format!(
                "not an OK response: {}",
                other
            ))),
        }
    }

    /// Run a command and collect any data the server sends back
    ///
    /// An `INQUIRE` from the server cannot be answered here; it is cancelled
    /// and the call fails with [`AssuanError::MissingInquireData`].
    pub fn simple_command(&mut self, verb: &str, params: impl AsRef<[u8]>) -> Result<Vec<u8>> {
        self.run(verb, params.as_ref(), &mut HashMap::new())
    }

    /// Run a command, answering server inquiries from `answers`
    pub fn transact(
        &mut self,
        verb: &str,
        params: impl AsRef<[u8]>,
        mut answers: HashMap<String, InquireData>,
    ) -> Result<Vec<u8>> {
        self.run(verb, params.as_ref(), &mut answers)
    }

    /// Set a connection option with `OPTION name = value`
    ///
    /// Only an `ERR` reply is treated as failure.
    pub fn option(&mut self, name: &str, value: &str) -> Result<()> {
        if value.is_empty() {
            self.pipe.write_line("OPTION", name)?;
        } else {
            self.pipe.write_line("OPTION", format!("{} = {}", name, value))?;
        }

        let line = self.pipe.read_line()?;
        if line.is("ERR") {
            return Err(peer_error(&line));
        }
        Ok(())
    }

    /// Underlying stream, for transport-level tweaks such as timeouts
    pub fn get_ref(&self) -> &S {
        self.pipe.get_ref()
    }

    // =========================================================================
    // Transaction loop
    // =========================================================================

    fn run(
        &mut self,
        verb: &str,
        params: &[u8],
        answers: &mut HashMap<String, InquireData>,
    ) -> Result<Vec<u8>> {
        tracing::debug!("Sending command {}", verb);
        self.pipe.write_line(verb, params)?;

        let mut data = Vec::new();
        loop {
            let line = self.pipe.read_line()?;
            match line.verb.as_str() {
                "OK" => return Ok(data),
                "ERR" => return Err(peer_error(&line)),
                "D" => data.extend_from_slice(&line.params),
                "INQUIRE" => self.answer_inquire(&line, answers)?,
                other => tracing::debug!("Ignoring unexpected {} line", other),
            }
        }
    }

    fn answer_inquire(
        &mut self,
        line: &Line,
        answers: &mut HashMap<String, InquireData>,
    ) -> Result<()> {
        let params = line.params_lossy();
        let keyword = params.split(' ').next().unwrap_or_default();
        tracing::debug!("Server inquires {}", keyword);

        let answer = match answers.get_mut(keyword) {
            Some(answer) => answer,
            None => {
                self.cancel_transaction();
                return Err(AssuanError::MissingInquireData(keyword.to_string()));
            }
        };

        match answer {
            InquireData::Bytes(bytes) => self.pipe.write_data(&bytes[..])?,
            InquireData::Reader(reader) => {
                let mut chunk = vec![0u8; STREAM_CHUNK];
                loop {
                    let n = match reader.read(&mut chunk) {
                        Ok(0) => break,
                        Ok(n) => n,
                        Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                        Err(e) => {
                            self.cancel_transaction();
                            return Err(e.into());
                        }
                    };
                    self.pipe.write_data(&chunk[..n])?;
                }
            }
        }

        self.pipe.write_line("END", "")
    }

    /// Send `CAN` and swallow the server's reply so the session stays in step
    ///
    /// Failures here are secondary to whatever made us cancel.
    fn cancel_transaction(&mut self) {
        if let Err(e) = self.pipe.write_line("CAN", "") {
            tracing::debug!("Failed to send CAN: {}", e);
            return;
        }
        loop {
            match self.pipe.read_line() {
                Ok(line) if line.is("OK") || line.is("ERR") => return,
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!("No reply to CAN: {}", e);
                    return;
                }
            }
        }
    }
}
