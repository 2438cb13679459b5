//! Protocol Module
//!
//! Defines the wire protocol shared by client and server.
//!
//! ## Protocol Format
//!
//! Every message is a single line of at most 1000 bytes:
//! ```text
//! VERB[ PARAMS]\n
//! ```
//!
//! ### Responses and control verbs
//! - `OK [text]`            - command finished
//! - `ERR <code> <desc>`    - command failed
//! - `D <data>`             - one chunk of payload
//! - `INQUIRE <keyword>`    - server asks the client for data
//! - `END` / `CAN`          - client ends / cancels an inquire answer
//! - `# text`, `S text`     - comment / status, ignored by readers
//!
//! ### Built-in commands
//! - `NOP`, `BYE`, `RESET`, `OPTION key[=value]`, `HELP [verb]`

mod escape;
mod pipe;
mod wire_error;

pub use escape::{escape, escaped_len, unescape};
pub use pipe::{encode_line, parse_line, Line, Pipe, MAX_LINE_LEN};
pub use wire_error::{ErrorCode, ErrorSource, WireError};
