//! Server Module
//!
//! The responding side of the protocol.
//!
//! ## Architecture
//! - A [`ProtoInfo`] blueprint describes the protocol once
//! - [`serve`] runs one connection to completion on the calling thread
//! - [`serve_over_listener`] spawns a thread per accepted connection

mod dispatcher;
mod listen;
mod proto;
mod responder;

pub use dispatcher::{serve, serve_stdio, split_option, BUILTIN_VERBS};
pub use listen::serve_over_listener;
pub(crate) use listen::spawn_connection;
pub use proto::{
    CommandHandler, HandlerError, HandlerResult, OptionSetter, ProtoInfo, ProtoInfoBuilder,
    StateFactory,
};
pub use responder::Responder;
