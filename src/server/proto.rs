//! Protocol blueprint
//!
//! A [`ProtoInfo`] describes one protocol: its greeting, command handlers,
//! help text and per-connection hooks. It is built once and shared
//! read-only by every connection that speaks the protocol.

use std::collections::BTreeMap;
use std::io;

use thiserror::Error;

use crate::error::AssuanError;
use crate::protocol::WireError;
use super::Responder;

/// How a handler can fail
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Reported to the peer as `ERR`; the connection keeps going
    #[error(transparent)]
    Protocol(WireError),

    /// Ends the connection; nothing more is written to the peer
    #[error(transparent)]
    Fatal(AssuanError),
}

impl From<WireError> for HandlerError {
    fn from(err: WireError) -> Self {
        HandlerError::Protocol(err)
    }
}

impl From<AssuanError> for HandlerError {
    fn from(err: AssuanError) -> Self {
        match err {
            // An upstream peer's structured error stays structured
            AssuanError::Peer(err) => HandlerError::Protocol(err),
            err => HandlerError::Fatal(err),
        }
    }
}

impl From<io::Error> for HandlerError {
    fn from(err: io::Error) -> Self {
        HandlerError::Fatal(AssuanError::Io(err))
    }
}

/// Outcome of a command handler
pub type HandlerResult = std::result::Result<(), HandlerError>;

/// Handler for one verb: `(responder, connection state, params)`
pub type CommandHandler<T> =
    Box<dyn Fn(&mut dyn Responder, &mut T, &str) -> HandlerResult + Send + Sync>;

/// Receives `OPTION key value` requests: `(connection state, key, value)`
pub type OptionSetter<T> = Box<dyn Fn(&mut T, &str, &str) -> HandlerResult + Send + Sync>;

/// Produces the initial state of a new connection
pub type StateFactory<T> = Box<dyn Fn() -> T + Send + Sync>;

/// Immutable description of a protocol
pub struct ProtoInfo<T> {
    /// Sent with the first `OK`
    greeting: String,

    /// Upper-cased verb -> handler
    handlers: BTreeMap<String, CommandHandler<T>>,

    /// Upper-cased verb -> help lines
    help: BTreeMap<String, Vec<String>>,

    state_factory: Option<StateFactory<T>>,

    option_setter: Option<OptionSetter<T>>,
}

impl<T: Default> ProtoInfo<T> {
    /// Start describing a protocol with the given greeting
    pub fn builder(greeting: impl Into<String>) -> ProtoInfoBuilder<T> {
        ProtoInfoBuilder {
            proto: ProtoInfo {
                greeting: greeting.into(),
                handlers: BTreeMap::new(),
                help: BTreeMap::new(),
                state_factory: None,
                option_setter: None,
            },
        }
    }

    /// Fresh state for a new connection
    pub fn new_state(&self) -> T {
        match &self.state_factory {
            Some(factory) => factory(),
            None => T::default(),
        }
    }
}

impl<T> ProtoInfo<T> {
    pub fn greeting(&self) -> &str {
        &self.greeting
    }

    /// Handler registered for `verb` (already upper-cased)
    pub fn handler(&self, verb: &str) -> Option<&CommandHandler<T>> {
        self.handlers.get(verb)
    }

    /// Registered verbs in sorted order
    pub fn verbs(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }

    pub fn help(&self, verb: &str) -> Option<&[String]> {
        self.help.get(verb).map(Vec::as_slice)
    }

    pub fn option_setter(&self) -> Option<&OptionSetter<T>> {
        self.option_setter.as_ref()
    }
}

/// Builder for ProtoInfo
pub struct ProtoInfoBuilder<T> {
    proto: ProtoInfo<T>,
}

impl<T> ProtoInfoBuilder<T> {
    /// Replace the greeting
    pub fn greeting(mut self, greeting: impl Into<String>) -> Self {
        self.proto.greeting = greeting.into();
        self
    }

    /// Register a handler; the verb is matched case-insensitively
    pub fn handler<F>(mut self, verb: &str, handler: F) -> Self
    where
        F: Fn(&mut dyn Responder, &mut T, &str) -> HandlerResult + Send + Sync + 'static,
    {
        self.proto
            .handlers
            .insert(verb.to_ascii_uppercase(), Box::new(handler));
        self
    }

    /// Set the help lines shown by `HELP <verb>`
    pub fn help<I, L>(mut self, verb: &str, lines: I) -> Self
    where
        I: IntoIterator<Item = L>,
        L: Into<String>,
    {
        self.proto.help.insert(
            verb.to_ascii_uppercase(),
            lines.into_iter().map(Into::into).collect(),
        );
        self
    }

    /// Use `factory` instead of `T::default()` for new connections
    pub fn state<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.proto.state_factory = Some(Box::new(factory));
        self
    }

    /// Accept `OPTION` commands through `setter`
    pub fn option_setter<F>(mut self, setter: F) -> Self
    where
        F: Fn(&mut T, &str, &str) -> HandlerResult + Send + Sync + 'static,
    {
        self.proto.option_setter = Some(Box::new(setter));
        self
    }

    pub fn build(self) -> ProtoInfo<T> {
        self.proto
    }
}
