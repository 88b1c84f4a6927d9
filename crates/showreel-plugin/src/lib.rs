//! Showreel plugin output protocol.
//!
//! External plugins run as subprocesses and share a single text stream with
//! their human-readable output. Leveled log lines and numeric progress
//! updates are multiplexed onto that stream with a small STX/ETX header;
//! anything that does not match the header passes through verbatim. This
//! crate implements the wire codec and the reader loop that forwards
//! decoded lines to the host's log sink and progress channel.

pub mod error;
pub mod level;
pub mod reader;
pub mod wire;

pub use error::PluginError;
pub use level::LogLevel;
pub use reader::{LogSink, StreamReader};
pub use wire::{decode_line, encode_line, DecodedLine};
