//! Shared test helpers

#![allow(dead_code)]

use std::io::{self, BufRead, BufReader, Cursor, Read, Write};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use assuan::network::{duplex, MemoryStream};
use assuan::{ProtoInfo, Result};

/// Stream that replays canned input and records everything written
pub struct MockStream {
    input: Cursor<Vec<u8>>,
    pub output: Vec<u8>,
}

impl MockStream {
    pub fn new(input: &[u8]) -> Self {
        Self {
            input: Cursor::new(input.to_vec()),
            output: Vec::new(),
        }
    }

    pub fn written(&self) -> String {
        String::from_utf8_lossy(&self.output).into_owned()
    }
}

impl Read for MockStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.input.read(buf)
    }
}

impl Write for MockStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.output.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Run `serve` for `proto` on a thread; returns the client end
pub fn spawn_server<T>(proto: ProtoInfo<T>) -> (MemoryStream, JoinHandle<Result<()>>)
where
    T: Default + 'static,
{
    let (client, server) = duplex();
    let proto = Arc::new(proto);
    let handle = thread::spawn(move || assuan::serve(server, &proto));
    (client, handle)
}

/// Client that talks raw lines, so comments and status lines are visible
pub struct RawClient {
    reader: BufReader<MemoryStream>,
}

impl RawClient {
    pub fn new(stream: MemoryStream) -> Self {
        Self {
            reader: BufReader::new(stream),
        }
    }

    pub fn send(&mut self, line: &str) {
        let stream = self.reader.get_mut();
        stream.write_all(line.as_bytes()).unwrap();
        stream.write_all(b"\n").unwrap();
    }

    pub fn send_bytes(&mut self, bytes: &[u8]) {
        self.reader.get_mut().write_all(bytes).unwrap();
    }

    /// Next line without its LF; `None` at EOF
    pub fn recv(&mut self) -> Option<String> {
        let mut line = String::new();
        match self.reader.read_line(&mut line).unwrap() {
            0 => None,
            _ => Some(line.trim_end_matches('\n').to_string()),
        }
    }

    /// Lines up to and including the next OK or ERR
    pub fn recv_until_done(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        while let Some(line) = self.recv() {
            let done = line == "OK" || line.starts_with("OK ") || line.starts_with("ERR ");
            lines.push(line);
            if done {
                break;
            }
        }
        lines
    }
}
