//! Protocol error types.

use thiserror::Error;

/// Errors that can occur when interpreting a bus frame.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Frame is too short to carry the fields it claims.
    #[error("frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort {
        /// Expected minimum length.
        expected: usize,
        /// Actual length received.
        actual: usize,
    },

    /// Command byte is not one the changer understands.
    #[error("unknown command: 0x{0:02X}")]
    UnknownCommand(u8),

    /// Control task byte is not one the changer understands.
    #[error("unknown control task: 0x{0:02X}")]
    UnknownTask(u8),
}
