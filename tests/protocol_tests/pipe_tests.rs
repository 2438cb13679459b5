//! Pipe Tests
//!
//! These tests verify:
//! - Skipping of comment, status and blank lines
//! - Verb normalization and parameter unescaping
//! - Line length limits on both read and write
//! - Chunking of data lines

#[path = "../common/mod.rs"]
mod common;

use assuan::protocol::{Pipe, MAX_LINE_LEN};
use assuan::{AssuanError, ErrorCode, WireError};
use common::MockStream;

fn pipe(input: &[u8]) -> Pipe<MockStream> {
    Pipe::new(MockStream::new(input))
}

// =============================================================================
// Reading
// =============================================================================

#[test]
fn test_read_skips_informational_lines() {
    let mut pipe = pipe(b"# comment\nS PROGRESS 10\n\n   \nOK done\n");
    let line = pipe.read_line().unwrap();

    assert_eq!(line.verb, "OK");
    assert_eq!(line.params, b"done");
}

#[test]
fn test_read_uppercases_verb() {
    let mut pipe = pipe(b"inquire PASSPHRASE\n");
    let line = pipe.read_line().unwrap();

    assert_eq!(line.verb, "INQUIRE");
    assert_eq!(line.params_str(), Some("PASSPHRASE"));
}

#[test]
fn test_read_without_params() {
    let mut pipe = pipe(b"END\n");
    let line = pipe.read_line().unwrap();

    assert_eq!(line.verb, "END");
    assert!(line.params.is_empty());
}

#[test]
fn test_read_unescapes_params() {
    let mut pipe = pipe(b"D a%0Ab%25c+d\n");
    let line = pipe.read_line().unwrap();

    assert_eq!(line.params, b"a\nb%c+d");
}

#[test]
fn test_read_sequence() {
    let mut pipe = pipe(b"D one\nD two\nOK\n");

    assert_eq!(pipe.read_line().unwrap().params, b"one");
    assert_eq!(pipe.read_line().unwrap().params, b"two");
    assert!(pipe.read_line().unwrap().is("OK"));
}

#[test]
fn test_read_strips_carriage_return() {
    let mut pipe = pipe(b"OK hello\r\n");
    assert_eq!(pipe.read_line().unwrap().params, b"hello");
}

#[test]
fn test_read_unterminated_final_line() {
    let mut pipe = pipe(b"OK");
    assert!(pipe.read_line().unwrap().is("OK"));
}

#[test]
fn test_read_eof_is_connection_closed() {
    let mut pipe = pipe(b"# only a comment\n");
    assert!(matches!(pipe.read_line(), Err(AssuanError::ConnectionClosed)));
}

#[test]
fn test_read_bad_escape_is_decode_error() {
    let mut pipe = pipe(b"D %zz\n");
    assert!(matches!(pipe.read_line(), Err(AssuanError::Decode(_))));
}

#[test]
fn test_read_line_at_limit() {
    let mut input = b"D ".to_vec();
    input.extend(vec![b'x'; MAX_LINE_LEN - 3]);
    input.push(b'\n');
    assert_eq!(input.len(), MAX_LINE_LEN);

    let mut pipe = pipe(&input);
    assert_eq!(pipe.read_line().unwrap().params.len(), MAX_LINE_LEN - 3);
}

#[test]
fn test_read_oversized_line() {
    let mut input = b"D ".to_vec();
    input.extend(vec![b'x'; MAX_LINE_LEN]);
    input.push(b'\n');

    let mut pipe = pipe(&input);
    assert!(matches!(
        pipe.read_line(),
        Err(AssuanError::LineTooLong { .. })
    ));
}

// =============================================================================
// Writing
// =============================================================================

#[test]
fn test_write_line_escapes_and_uppercases() {
    let mut pipe = pipe(b"");
    pipe.write_line("setdesc", "a\r\nb%").unwrap();

    assert_eq!(pipe.get_ref().written(), "SETDESC a%0D%0Ab%25\n");
}

#[test]
fn test_write_line_without_params() {
    let mut pipe = pipe(b"");
    pipe.write_line("NOP", "").unwrap();

    assert_eq!(pipe.get_ref().written(), "NOP\n");
}

#[test]
fn test_write_line_too_long_sends_nothing() {
    let mut pipe = pipe(b"");
    let params = "x".repeat(MAX_LINE_LEN);

    let err = pipe.write_line("SETDESC", &params).unwrap_err();
    assert!(matches!(err, AssuanError::LineTooLong { .. }));
    assert!(pipe.get_ref().output.is_empty());
}

#[test]
fn test_write_line_escaping_counts_toward_limit() {
    let mut pipe = pipe(b"");
    // 400 raw bytes, 1200 once escaped
    let params = "%".repeat(400);

    assert!(pipe.write_line("X", &params).is_err());
    assert!(pipe.get_ref().output.is_empty());
}

#[test]
fn test_write_comment() {
    let mut pipe = pipe(b"");
    pipe.write_comment("GETPIN").unwrap();

    assert_eq!(pipe.get_ref().written(), "# GETPIN\n");
}

#[test]
fn test_write_status() {
    let mut pipe = pipe(b"");
    pipe.write_status("PROGRESS", "1 of 2").unwrap();

    assert_eq!(pipe.get_ref().written(), "S PROGRESS 1 of 2\n");
}

#[test]
fn test_write_error_line() {
    let mut pipe = pipe(b"");
    pipe.write_error(&WireError::unknown_command()).unwrap();

    let code = (15u32 << 24) | 275;
    assert_eq!(
        pipe.get_ref().written(),
        format!("ERR {} unknown IPC command <assuan>\n", code)
    );
}

#[test]
fn test_write_error_truncates_long_message() {
    let mut pipe = pipe(b"");
    let err = WireError::assuan(ErrorCode::General, "m".repeat(2 * MAX_LINE_LEN));
    pipe.write_error(&err).unwrap();

    let written = pipe.get_ref().output.clone();
    assert!(written.len() <= MAX_LINE_LEN);
    assert!(written.starts_with(b"ERR "));
    assert!(written.ends_with(b" <assuan>\n"));
}

// =============================================================================
// Data Lines
// =============================================================================

#[test]
fn test_write_data_empty_writes_nothing() {
    let mut pipe = pipe(b"");
    pipe.write_data(b"").unwrap();

    assert!(pipe.get_ref().output.is_empty());
}

#[test]
fn test_write_data_single_line() {
    let mut pipe = pipe(b"");
    pipe.write_data(b"1234\n").unwrap();

    assert_eq!(pipe.get_ref().written(), "D 1234%0A\n");
}

#[test]
fn test_write_data_chunks_respect_limit() {
    let payload: Vec<u8> = b"ab%\n".iter().cycle().take(5000).copied().collect();

    let mut writer = pipe(b"");
    writer.write_data(&payload).unwrap();
    let output = writer.into_inner().output;

    let lines: Vec<&[u8]> = output
        .split_inclusive(|&b| b == b'\n')
        .collect();
    assert!(lines.len() > 1);
    for line in &lines {
        assert!(line.len() <= MAX_LINE_LEN);
        assert!(line.starts_with(b"D "));
    }

    // Reading the lines back reassembles the payload exactly
    let mut reader = pipe(&output);
    let mut data = Vec::new();
    for _ in 0..lines.len() {
        data.extend(reader.read_line().unwrap().params);
    }
    assert_eq!(data, payload);
}
