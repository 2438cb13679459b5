//! Handler-facing side of a connection
//!
//! Handlers never see the raw stream. They get a [`Responder`] through
//! which they can send data, status and comments, or ask the client for
//! more input with an inquiry.

use std::io::{Read, Write};

use crate::error::Result;
use crate::protocol::{ErrorCode, Pipe, WireError};
use super::HandlerError;

/// What a command handler may do on the wire while it runs
///
/// The final `OK`/`ERR` is written by the dispatcher, not the handler.
pub trait Responder {
    /// Send a payload as `D` lines
    fn write_data(&mut self, data: &[u8]) -> Result<()>;

    /// Send an `S KEYWORD text` status line
    fn write_status(&mut self, keyword: &str, text: &str) -> Result<()>;

    /// Send a `# text` comment line
    fn write_comment(&mut self, text: &str) -> Result<()>;

    /// Ask the client for data named `keyword` and wait for it
    ///
    /// A client that answers `CAN` produces a protocol error carrying the
    /// canceled code, suitable for returning straight from the handler.
    fn inquire(&mut self, keyword: &str) -> std::result::Result<Vec<u8>, HandlerError>;
}

impl<S: Read + Write> Responder for Pipe<S> {
    fn write_data(&mut self, data: &[u8]) -> Result<()> {
        Pipe::write_data(self, data)
    }

    fn write_status(&mut self, keyword: &str, text: &str) -> Result<()> {
        Pipe::write_status(self, keyword, text)
    }

    fn write_comment(&mut self, text: &str) -> Result<()> {
        Pipe::write_comment(self, text)
    }

    fn inquire(&mut self, keyword: &str) -> std::result::Result<Vec<u8>, HandlerError> {
        self.write_line("INQUIRE", keyword)?;

        let mut data = Vec::new();
        loop {
            let line = self.read_line()?;
            match line.verb.as_str() {
                "D" => data.extend_from_slice(&line.params),
                "END" => return Ok(data),
                "CAN" => {
                    tracing::debug!("Client canceled inquire {}", keyword);
                    return Err(WireError::assuan(ErrorCode::AssuanCanceled, "canceled").into());
                }
                other => {
                    tracing::debug!("Unexpected {} while inquiring {}", other, keyword);
                    return Err(WireError::assuan(
                        ErrorCode::AssuanUnexpectedCommand,
                        format!("unexpected command {} during inquire", other),
                    )
                    .into());
                }
            }
        }
    }
}
