//! Client Module
//!
//! Drives the initiating side of the protocol: handshake, commands, data
//! collection and answers to server inquiries.

mod inquire;
mod session;

pub use inquire::InquireData;
pub use session::Session;
