//! Utilities shared by the Hiroba binaries: logging setup and time helpers.

pub mod logger;
pub mod time;
