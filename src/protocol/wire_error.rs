//! Structured protocol errors
//!
//! An error travels as a single `ERR` line:
//!
//! ```text
//! ERR <n> <message> <<source-name>>
//!
//!   n = (source << 24) | code
//! ```
//!
//! Source and code numbers follow the libgpg-error registry so that real
//! GnuPG peers understand them.

use std::fmt;

use crate::error::{AssuanError, Result};

/// Bits the source occupies once shifted into the combined code
const SOURCE_SHIFT: u32 = 24;
const SOURCE_MASK: u32 = 0x7f;
const CODE_MASK: u32 = 0xffff;

/// Where an error originated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorSource {
    Unknown,
    GpgAgent,
    Pinentry,
    Scd,
    Dirmngr,
    Assuan,
    Other(u32),
}

impl ErrorSource {
    pub fn to_u32(self) -> u32 {
        match self {
            ErrorSource::Unknown => 0,
            ErrorSource::GpgAgent => 4,
            ErrorSource::Pinentry => 5,
            ErrorSource::Scd => 6,
            ErrorSource::Dirmngr => 10,
            ErrorSource::Assuan => 15,
            ErrorSource::Other(n) => n & SOURCE_MASK,
        }
    }

    pub fn from_u32(n: u32) -> Self {
        match n {
            0 => ErrorSource::Unknown,
            4 => ErrorSource::GpgAgent,
            5 => ErrorSource::Pinentry,
            6 => ErrorSource::Scd,
            10 => ErrorSource::Dirmngr,
            15 => ErrorSource::Assuan,
            n => ErrorSource::Other(n),
        }
    }
}

/// Error codes understood by this crate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    General,
    NotFound,
    InvalidValue,
    NotImplemented,
    Canceled,
    UnknownOption,
    AssuanInvalidValue,
    AssuanLineTooLong,
    AssuanUnexpectedCommand,
    UnknownCommand,
    AssuanSyntax,
    AssuanCanceled,
    AssuanParameter,
    Other(u32),
}

impl ErrorCode {
    pub fn to_u32(self) -> u32 {
        match self {
            ErrorCode::General => 1,
            ErrorCode::NotFound => 27,
            ErrorCode::InvalidValue => 55,
            ErrorCode::NotImplemented => 69,
            ErrorCode::Canceled => 99,
            ErrorCode::UnknownOption => 174,
            ErrorCode::AssuanInvalidValue => 261,
            ErrorCode::AssuanLineTooLong => 263,
            ErrorCode::AssuanUnexpectedCommand => 274,
            ErrorCode::UnknownCommand => 275,
            ErrorCode::AssuanSyntax => 276,
            ErrorCode::AssuanCanceled => 277,
            ErrorCode::AssuanParameter => 280,
            ErrorCode::Other(n) => n & CODE_MASK,
        }
    }

    pub fn from_u32(n: u32) -> Self {
        match n {
            1 => ErrorCode::General,
            27 => ErrorCode::NotFound,
            55 => ErrorCode::InvalidValue,
            69 => ErrorCode::NotImplemented,
            99 => ErrorCode::Canceled,
            174 => ErrorCode::UnknownOption,
            261 => ErrorCode::AssuanInvalidValue,
            263 => ErrorCode::AssuanLineTooLong,
            274 => ErrorCode::AssuanUnexpectedCommand,
            275 => ErrorCode::UnknownCommand,
            276 => ErrorCode::AssuanSyntax,
            277 => ErrorCode::AssuanCanceled,
            280 => ErrorCode::AssuanParameter,
            n => ErrorCode::Other(n),
        }
    }
}

/// An error as carried by an `ERR` line
///
/// Two values are equal iff all four fields match. Source and code compare
/// by their numeric value, so `ErrorCode::Other(1)` equals `General`.
#[derive(Debug, Clone, Eq)]
pub struct WireError {
    pub source: ErrorSource,
    pub code: ErrorCode,
    pub source_name: String,
    pub message: String,
}

impl PartialEq for WireError {
    fn eq(&self, other: &Self) -> bool {
        self.source.to_u32() == other.source.to_u32()
            && self.code.to_u32() == other.code.to_u32()
            && self.source_name == other.source_name
            && self.message == other.message
    }
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.source_name.is_empty() {
            write!(f, "{} (code {})", self.message, self.code.to_u32())
        } else {
            write!(f, "{}: {}", self.source_name, self.message)
        }
    }
}

impl std::error::Error for WireError {}

impl WireError {
    /// Build an error; registered numbers given as `Other(n)` are mapped to
    /// their named variant and `<` in the source name becomes `_`
    pub fn new(
        source: ErrorSource,
        code: ErrorCode,
        source_name: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        let mut source_name = source_name.into();
        if source_name.contains('<') {
            source_name = source_name.replace('<', "_");
        }

        Self {
            source: ErrorSource::from_u32(source.to_u32()),
            code: ErrorCode::from_u32(code.to_u32()),
            source_name,
            message: message.into(),
        }
    }

    /// An error raised by the protocol layer itself
    pub fn assuan(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::new(ErrorSource::Assuan, code, "assuan", message)
    }

    pub fn unknown_command() -> Self {
        Self::assuan(ErrorCode::UnknownCommand, "unknown IPC command")
    }

    pub fn not_found() -> Self {
        Self::assuan(ErrorCode::NotFound, "not found")
    }

    pub fn not_implemented() -> Self {
        Self::assuan(ErrorCode::NotImplemented, "not implemented")
    }

    pub fn invalid_option() -> Self {
        Self::assuan(ErrorCode::AssuanInvalidValue, "invalid OPTION syntax")
    }

    /// Combined numeric code as sent on the wire
    pub fn wire_code(&self) -> u32 {
        (self.source.to_u32() << SOURCE_SHIFT) | self.code.to_u32()
    }

    /// Parameters of the `ERR` line (everything after the verb)
    ///
    /// The `<name>` tag is always last, even for an empty name, so a message
    /// that itself ends in `<...>` survives decoding.
    pub fn encode(&self) -> String {
        let mut out = self.wire_code().to_string();
        if !self.message.is_empty() {
            out.push(' ');
            out.push_str(&self.message);
        }
        out.push_str(" <");
        out.push_str(&self.source_name);
        out.push('>');
        out
    }

    /// Parse the parameters of a received `ERR` line
    pub fn decode(params: &str) -> Result<Self> {
        let params = params.trim_start();
        let (number, rest) = match params.split_once(' ') {
            Some((number, rest)) => (number, rest),
            None => (params, ""),
        };

        let n: u32 = number.parse().map_err(|_| {
            AssuanError::InvalidResponse(format!("malformed error code: {:?}", number))
        })?;

        let (message, source_name) = split_source_name(rest);

        Ok(Self {
            source: ErrorSource::from_u32((n >> SOURCE_SHIFT) & SOURCE_MASK),
            code: ErrorCode::from_u32(n & CODE_MASK),
            source_name: source_name.to_string(),
            message: message.to_string(),
        })
    }
}

/// Split `"message <name>"` at its final tag; a missing tag yields an empty name
fn split_source_name(rest: &str) -> (&str, &str) {
    let body = match rest.strip_suffix('>') {
        Some(body) => body,
        None => return (rest, ""),
    };
    match body.rfind('<') {
        Some(open) => {
            let message = &body[..open];
            (message.strip_suffix(' ').unwrap_or(message), &body[open + 1..])
        }
        None => (rest, ""),
    }
}
