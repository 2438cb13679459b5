//! Answers to server inquiries
//!
//! During [`Session::transact`](super::Session::transact) the server may ask
//! for named pieces of data with `INQUIRE <keyword>`. The caller supplies
//! them up front, keyed by keyword.

use std::fmt;
use std::io::Read;

use bytes::Bytes;

/// Payload sent in reply to an `INQUIRE`
pub enum InquireData {
    /// A byte buffer; can answer the same keyword repeatedly
    Bytes(Bytes),

    /// A stream drained on the first inquiry; later inquiries get no data
    Reader(Box<dyn Read + Send>),
}

impl InquireData {
    pub fn reader<R: Read + Send + 'static>(reader: R) -> Self {
        InquireData::Reader(Box::new(reader))
    }
}

impl fmt::Debug for InquireData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InquireData::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            InquireData::Reader(_) => f.write_str("Reader(..)"),
        }
    }
}

impl From<Bytes> for InquireData {
    fn from(bytes: Bytes) -> Self {
        InquireData::Bytes(bytes)
    }
}

impl From<Vec<u8>> for InquireData {
    fn from(bytes: Vec<u8>) -> Self {
        InquireData::Bytes(Bytes::from(bytes))
    }
}

impl From<&[u8]> for InquireData {
    fn from(bytes: &[u8]) -> Self {
        InquireData::Bytes(Bytes::copy_from_slice(bytes))
    }
}

impl From<String> for InquireData {
    fn from(text: String) -> Self {
        InquireData::Bytes(Bytes::from(text))
    }
}

impl From<&str> for InquireData {
    fn from(text: &str) -> Self {
        InquireData::Bytes(Bytes::copy_from_slice(text.as_bytes()))
    }
}
