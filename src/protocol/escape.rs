//! Parameter escaping
//!
//! Any byte may travel inside a parameter once the four bytes that would
//! break line framing are percent-escaped:
//!
//! ```text
//!   CR -> %0D    LF -> %0A    %  -> %25    \  -> %5C
//! ```
//!
//! Nothing else is touched. In particular `+` is *not* a space here, unlike
//! URL encoding.

use crate::error::{AssuanError, Result};

const HEX: &[u8; 16] = b"0123456789ABCDEF";

#[inline]
pub(crate) fn needs_escape(byte: u8) -> bool {
    matches!(byte, b'\r' | b'\n' | b'%' | b'\\')
}

/// Number of bytes `raw` occupies once escaped
pub fn escaped_len(raw: &[u8]) -> usize {
    raw.iter()
        .map(|&b| if needs_escape(b) { 3 } else { 1 })
        .sum()
}

/// Append the escaped form of a single byte to `out`
#[inline]
pub(crate) fn escape_byte_into(byte: u8, out: &mut Vec<u8>) {
    if needs_escape(byte) {
        out.push(b'%');
        out.push(HEX[(byte >> 4) as usize]);
        out.push(HEX[(byte & 0x0f) as usize]);
    } else {
        out.push(byte);
    }
}

/// Escape raw bytes for transmission inside a line
pub fn escape(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(escaped_len(raw));
    for &byte in raw {
        escape_byte_into(byte, &mut out);
    }
    out
}

fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        _ => None,
    }
}

/// Reverse [`escape`]
///
/// Fails with [`AssuanError::Decode`] when a `%` is not followed by two hex
/// digits.
pub fn unescape(text: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len());
    let mut i = 0;

    while i < text.len() {
        let byte = text[i];
        if byte != b'%' {
            out.push(byte);
            i += 1;
            continue;
        }

        let high = text.get(i + 1).copied().and_then(hex_value);
        let low = text.get(i + 2).copied().and_then(hex_value);
        match (high, low) {
            (Some(h), Some(l)) => {
                out.push((h << 4) | l);
                i += 3;
            }
            _ => {
                return Err(AssuanError::Decode(format!(
                    "invalid escape sequence at offset {}",
                    i
                )))
            }
        }
    }

    Ok(out)
}
