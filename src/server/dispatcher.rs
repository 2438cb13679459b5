//! Command dispatcher
//!
//! Runs the responding side of one connection: greeting, then a loop of
//! read command / dispatch / reply until `BYE`, EOF or a fatal error.
//!
//! ## Failure handling
//! - Protocol errors (unknown command, bad option, handler `Protocol`
//!   errors) are sent as `ERR` and the loop continues.
//! - Transport errors and handler `Fatal` errors end the loop and are
//!   returned from [`serve`]; nothing more is written to the peer.

use std::io::{Read, Write};

use crate::error::Result;
use crate::network::StdioStream;
use crate::protocol::{ErrorCode, Pipe, WireError};
use super::{HandlerError, HandlerResult, ProtoInfo};

/// Verbs handled by the dispatcher itself, as listed by `HELP`
pub const BUILTIN_VERBS: [&str; 5] = ["NOP", "OPTION", "BYE", "RESET", "HELP"];

/// Serve one connection over `stream` until it ends
///
/// Returns `Ok(())` after `BYE`. EOF is reported as
/// [`AssuanError::ConnectionClosed`](crate::AssuanError::ConnectionClosed).
pub fn serve<S, T>(stream: S, proto: &ProtoInfo<T>) -> Result<()>
where
    S: Read + Write,
    T: Default,
{
    tracing::debug!("Accepted session");
    let mut pipe = Pipe::new(stream);
    let mut state = proto.new_state();

    if let Err(e) = pipe.write_line("OK", proto.greeting()) {
        tracing::debug!("Failed to send greeting, dropping session: {}", e);
        return Err(e);
    }

    loop {
        let line = match pipe.read_line() {
            Ok(line) => line,
            Err(e) => {
                tracing::debug!("Read failed, dropping session: {}", e);
                return Err(e);
            }
        };

        let params = match line.params_str() {
            Some(params) => params,
            None => {
                pipe.write_error(&WireError::assuan(
                    ErrorCode::AssuanParameter,
                    "parameters are not valid UTF-8",
                ))?;
                continue;
            }
        };

        match line.verb.as_str() {
            "NOP" => pipe.write_line("OK", "")?,
            "BYE" => {
                // Clients may hang up without waiting for the acknowledgement
                if let Err(e) = pipe.write_line("OK", "") {
                    tracing::debug!("BYE not acknowledged: {}", e);
                }
                tracing::debug!("Session finished");
                return Ok(());
            }
            "RESET" => reset_command(&mut pipe, &mut state, proto)?,
            "OPTION" => option_command(&mut pipe, &mut state, proto, params)?,
            "HELP" => help_command(&mut pipe, proto, params)?,
            verb => match proto.handler(verb) {
                Some(handler) => {
                    tracing::debug!("Protocol command received: {}", verb);
                    let result = handler(&mut pipe, &mut state, params);
                    finish_command(&mut pipe, result)?;
                }
                None => {
                    tracing::debug!("Unknown command: {}", verb);
                    pipe.write_error(&WireError::unknown_command())?;
                }
            },
        }
    }
}

/// Serve a single session over the process's stdin and stdout
pub fn serve_stdio<T: Default>(proto: &ProtoInfo<T>) -> Result<()> {
    serve(StdioStream::new(), proto)
}

/// Translate a handler outcome into the closing `OK` / `ERR`
fn finish_command<S: Read + Write>(pipe: &mut Pipe<S>, result: HandlerResult) -> Result<()> {
    match result {
        Ok(()) => pipe.write_line("OK", ""),
        Err(HandlerError::Protocol(err)) => {
            tracing::debug!("Handler error: {}", err);
            pipe.write_error(&err)
        }
        Err(HandlerError::Fatal(err)) => {
            tracing::warn!("Fatal handler error, dropping session: {}", err);
            Err(err)
        }
    }
}

fn reset_command<S, T>(pipe: &mut Pipe<S>, state: &mut T, proto: &ProtoInfo<T>) -> Result<()>
where
    S: Read + Write,
    T: Default,
{
    tracing::debug!("Session reset");
    match proto.handler("RESET") {
        Some(handler) => {
            let result = handler(pipe, state, "");
            finish_command(pipe, result)
        }
        None => {
            *state = T::default();
            pipe.write_line("OK", "")
        }
    }
}

fn option_command<S, T>(
    pipe: &mut Pipe<S>,
    state: &mut T,
    proto: &ProtoInfo<T>,
    params: &str,
) -> Result<()>
where
    S: Read + Write,
{
    tracing::debug!("Option set request: {}", params);

    let (key, value) = match split_option(params) {
        Some(kv) => kv,
        None => {
            tracing::debug!("Malformed OPTION request");
            return pipe.write_error(&WireError::invalid_option());
        }
    };

    match proto.option_setter() {
        Some(setter) => finish_command(pipe, setter(state, key, value)),
        None => {
            tracing::debug!("No options supported in this protocol");
            pipe.write_error(&WireError::not_implemented())
        }
    }
}

fn help_command<S, T>(pipe: &mut Pipe<S>, proto: &ProtoInfo<T>, params: &str) -> Result<()>
where
    S: Read + Write,
{
    let topic = params.trim();

    if topic.is_empty() {
        for verb in BUILTIN_VERBS {
            pipe.write_comment(verb)?;
        }
        for verb in proto.verbs().filter(|v| !BUILTIN_VERBS.contains(v)) {
            pipe.write_comment(verb)?;
        }
        return pipe.write_line("OK", "");
    }

    match proto.help(&topic.to_ascii_uppercase()) {
        Some(lines) => {
            for line in lines {
                pipe.write_comment(line)?;
            }
            pipe.write_line("OK", "")
        }
        None => {
            tracing::debug!("Help requested for unknown command: {}", topic);
            pipe.write_error(&WireError::not_found())
        }
    }
}

/// Split `key`, `key value`, `key=value` or `key = value`
///
/// The key is made of ASCII letters, digits, `_` and `-`. Returns `None` on
/// anything else.
pub fn split_option(params: &str) -> Option<(&str, &str)> {
    let end = params
        .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_' || c == '-'))
        .unwrap_or(params.len());
    if end == 0 {
        return None;
    }

    let (key, rest) = params.split_at(end);
    if rest.is_empty() {
        return Some((key, ""));
    }
    if !rest.starts_with(|c: char| c == ' ' || c == '=') {
        return None;
    }

    let value = rest.trim_start_matches(' ');
    let value = value.strip_prefix('=').unwrap_or(value);
    Some((key, value.trim_start_matches(' ')))
}
