//! # assuan
//!
//! A line-oriented IPC protocol engine, as spoken between GnuPG's agent,
//! pinentry, dirmngr and their clients:
//! - Percent-escaping codec for binary-safe parameters
//! - Line framing with a 1000 byte limit
//! - Client sessions with server-initiated inquiries
//! - Server dispatcher with built-in commands and structured errors
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌──────────────────────┐                 ┌──────────────────────────────┐
//! │    client::Session   │                 │   server::serve (per conn)   │
//! │ simple_command       │                 │  NOP BYE RESET OPTION HELP   │
//! │ transact (INQUIRE)   │                 │  ProtoInfo handlers          │
//! └──────────┬───────────┘                 └──────────────┬───────────────┘
//!            │                                            │
//!            ▼                                            ▼
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                     protocol::Pipe (line framing)                   │
//! │              escape / unescape          WireError (ERR)             │
//! └──────────────────────────────────┬──────────────────────────────────┘
//!                                    │
//!                                    ▼
//!            TCP │ Unix socket │ stdio │ in-process duplex (network)
//! ```
//!
//! ## Logging
//!
//! All diagnostics go through `tracing`. Nothing is printed unless the
//! application installs a subscriber.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;

pub mod protocol;
pub mod client;
pub mod server;
pub mod network;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{AssuanError, Result};
pub use config::Config;
pub use client::{InquireData, Session};
pub use protocol::{ErrorCode, ErrorSource, WireError};
pub use server::{serve, serve_over_listener, HandlerError, HandlerResult, ProtoInfo, Responder};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of the crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
