//! Line framing
//!
//! [`Pipe`] wraps a duplex byte stream and speaks the line format on top of
//! it. Both the client [`Session`](crate::client::Session) and the server
//! dispatcher are built on it.
//!
//! ## Line Format
//! ```text
//! ┌──────────┬────┬────────────────────────────┬────┐
//! │   VERB   │ SP │   percent-escaped params   │ LF │   <= 1000 bytes
//! └──────────┴────┴────────────────────────────┴────┘
//! ```
//!
//! Lines starting with `#` (comment) or `S ` (status) and blank lines are
//! informational; [`Pipe::read_line`] skips them.

use std::borrow::Cow;
use std::io::{ErrorKind, Read, Write};

use bytes::BytesMut;

use crate::error::{AssuanError, Result};
use super::escape::{escape_byte_into, escaped_len, needs_escape, unescape};
use super::WireError;

/// Maximum length of a line, including the trailing line feed
pub const MAX_LINE_LEN: usize = 1000;

/// Room left for payload in a `D` line ("D " prefix and LF)
const DATA_CHUNK_LEN: usize = MAX_LINE_LEN - 3;

/// Bytes requested from the stream per read call
const READ_CHUNK: usize = 1024;

/// A decoded protocol line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    /// Upper-cased verb
    pub verb: String,

    /// Unescaped parameter bytes (empty when absent)
    pub params: Vec<u8>,
}

impl Line {
    /// Parameters as text, if they are valid UTF-8
    pub fn params_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.params).ok()
    }

    /// Parameters as text, replacing invalid UTF-8
    pub fn params_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.params)
    }

    pub fn is(&self, verb: &str) -> bool {
        self.verb == verb
    }
}

/// Encode a single line, rejecting it if it would exceed [`MAX_LINE_LEN`]
pub fn encode_line(verb: &str, params: &[u8]) -> Result<Vec<u8>> {
    if verb.is_empty() || verb.bytes().any(|b| b.is_ascii_whitespace() || b.is_ascii_control()) {
        return Err(AssuanError::InvalidVerb(verb.to_string()));
    }

    let len = if params.is_empty() {
        verb.len() + 1
    } else {
        verb.len() + 1 + escaped_len(params) + 1
    };
    if len > MAX_LINE_LEN {
        return Err(AssuanError::LineTooLong {
            len,
            max: MAX_LINE_LEN,
        });
    }

    let mut line = Vec::with_capacity(len);
    line.extend(verb.bytes().map(|b| b.to_ascii_uppercase()));
    if !params.is_empty() {
        line.push(b' ');
        for &byte in params {
            escape_byte_into(byte, &mut line);
        }
    }
    line.push(b'\n');

    Ok(line)
}

/// Split a raw line (without LF) into verb and unescaped parameters
pub fn parse_line(raw: &[u8]) -> Result<Line> {
    let (verb, params) = match raw.iter().position(|&b| b == b' ') {
        Some(pos) => (&raw[..pos], unescape(&raw[pos + 1..])?),
        None => (raw, Vec::new()),
    };

    Ok(Line {
        verb: String::from_utf8_lossy(verb).to_ascii_uppercase(),
        params,
    })
}

fn is_informational(raw: &[u8]) -> bool {
    raw.iter().all(|b| b.is_ascii_whitespace()) || raw.starts_with(b"#") || raw.starts_with(b"S ")
}

/// Line-oriented reader/writer over a duplex stream
pub struct Pipe<S> {
    /// Bytes read from the stream but not yet consumed as lines
    buf: BytesMut,

    /// Set once the stream reported end of file
    eof: bool,

    stream: S,
}

impl<S: Read + Write> Pipe<S> {
    pub fn new(stream: S) -> Self {
        Self {
            buf: BytesMut::with_capacity(READ_CHUNK),
            eof: false,
            stream,
        }
    }

    // =========================================================================
    // Reading
    // =========================================================================

    /// Read the next command or response line
    ///
    /// Blank, comment and status lines are skipped. Returns
    /// [`AssuanError::ConnectionClosed`] if the stream ends first.
    pub fn read_line(&mut self) -> Result<Line> {
        loop {
            let raw = match self.next_raw_line()? {
                Some(raw) => raw,
                None => return Err(AssuanError::ConnectionClosed),
            };

            if is_informational(&raw) {
                tracing::trace!("<- (skipped) {}", String::from_utf8_lossy(&raw));
                continue;
            }

            tracing::trace!("<- {}", String::from_utf8_lossy(&raw));
            return parse_line(&raw);
        }
    }

    /// Pull one LF-terminated line out of the buffer, reading as needed
    fn next_raw_line(&mut self) -> Result<Option<BytesMut>> {
        loop {
            if let Some(pos) = self.buf.iter().position(|&b| b == b'\n') {
                if pos + 1 > MAX_LINE_LEN {
                    return Err(AssuanError::LineTooLong {
                        len: pos + 1,
                        max: MAX_LINE_LEN,
                    });
                }
                let mut line = self.buf.split_to(pos + 1);
                line.truncate(pos);
                if line.last() == Some(&b'\r') {
                    line.truncate(pos - 1);
                }
                return Ok(Some(line));
            }

            if self.buf.len() >= MAX_LINE_LEN {
                return Err(AssuanError::LineTooLong {
                    len: self.buf.len() + 1,
                    max: MAX_LINE_LEN,
                });
            }

            if self.eof {
                // An unterminated final line is still a line
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let len = self.buf.len();
                return Ok(Some(self.buf.split_to(len)));
            }

            let mut chunk = [0u8; READ_CHUNK];
            match self.stream.read(&mut chunk) {
                Ok(0) => self.eof = true,
                Ok(n) => self.buf.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }

    // =========================================================================
    // Writing
    // =========================================================================

    /// Write `VERB params` as one line
    ///
    /// Nothing is written if the encoded line would be too long.
    pub fn write_line(&mut self, verb: &str, params: impl AsRef<[u8]>) -> Result<()> {
        let line = encode_line(verb, params.as_ref())?;
        tracing::trace!("-> {}", String::from_utf8_lossy(&line[..line.len() - 1]));
        self.stream.write_all(&line)?;
        self.stream.flush()?;
        Ok(())
    }

    /// Send a payload as one or more `D` lines
    ///
    /// An error may occur after some lines were already written. The
    /// transaction is corrupt at that point; the caller should cancel it
    /// rather than keep writing.
    pub fn write_data(&mut self, raw: &[u8]) -> Result<()> {
        if raw.is_empty() {
            return Ok(());
        }

        let mut line = Vec::with_capacity(MAX_LINE_LEN);
        line.extend_from_slice(b"D ");

        for &byte in raw {
            let width = if needs_escape(byte) { 3 } else { 1 };
            if line.len() - 2 + width > DATA_CHUNK_LEN {
                line.push(b'\n');
                self.stream.write_all(&line)?;
                line.truncate(2);
            }
            escape_byte_into(byte, &mut line);
        }

        line.push(b'\n');
        self.stream.write_all(&line)?;
        self.stream.flush()?;
        Ok(())
    }

    /// Write an `ERR` line for `err`
    ///
    /// An overlong message is shortened so the error always fits on the wire.
    pub fn write_error(&mut self, err: &WireError) -> Result<()> {
        let mut err = Cow::Borrowed(err);
        loop {
            match encode_line("ERR", err.encode().as_bytes()) {
                Ok(line) => {
                    tracing::trace!("-> {}", String::from_utf8_lossy(&line[..line.len() - 1]));
                    self.stream.write_all(&line)?;
                    self.stream.flush()?;
                    return Ok(());
                }
                Err(AssuanError::LineTooLong { .. }) if !err.message.is_empty() => {
                    err.to_mut().message.pop();
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Write a `# text` comment line
    pub fn write_comment(&mut self, text: &str) -> Result<()> {
        self.write_line("#", text)
    }

    /// Write an `S KEYWORD text` status line
    pub fn write_status(&mut self, keyword: &str, text: &str) -> Result<()> {
        if text.is_empty() {
            self.write_line("S", keyword)
        } else {
            self.write_line("S", format!("{} {}", keyword, text))
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }

    /// Give back the stream; buffered but unread input is lost
    pub fn into_inner(self) -> S {
        self.stream
    }
}
