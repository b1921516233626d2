//! Error types for the client core.
//!
//! Three layers, matching where a failure can happen in the pipeline:
//! framing (bytes to lines), parsing (line to [`Event`](crate::Event)) and
//! the connection itself (socket I/O and the read loop). Framing and parse
//! errors concern one line only; the read loop logs them and carries on.

use thiserror::Error;

/// Convenience type alias for Results using [`ConnectionError`].
pub type Result<T, E = ConnectionError> = std::result::Result<T, E>;

/// Errors produced while turning raw socket bytes into lines.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum FramingError {
    /// A complete line was not valid UTF-8.
    ///
    /// The raw bytes are kept so the caller can log exactly what arrived.
    #[error("invalid UTF-8 in line at byte {byte_pos}: {details}")]
    InvalidUtf8 {
        /// The raw line as bytes, without its terminator.
        raw_line: Vec<u8>,
        /// Byte position where UTF-8 validation failed.
        byte_pos: usize,
        /// Detailed error message from the UTF-8 decoder.
        details: String,
    },
}

/// Errors produced while parsing one line into an event.
///
/// A parse error only ever concerns a single line: the connection logs it
/// and moves on to the next one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ParseError {
    /// Line was empty after stripping its terminator.
    #[error("empty line")]
    EmptyLine,

    /// Line carried a source prefix but no command token.
    #[error("missing command after source {0:?}")]
    MissingCommand(String),

    /// The command's parameters did not contain enough fields.
    #[error("not enough parameters for {command}: expected {expected}, got {got}")]
    NotEnoughParams {
        /// The command being parsed.
        command: &'static str,
        /// Number of fields the grammar requires.
        expected: usize,
        /// Number of fields actually present.
        got: usize,
    },
}

/// Errors that terminate the connection's read loop.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConnectionError {
    /// I/O error on the socket (anything other than a read timeout).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// The server closed the connection.
    #[error("connection closed by peer")]
    Closed,

    /// The server never sent anything other than NOTICE lines after
    /// registration.
    #[error("no registration reply within {0:?}")]
    RegistrationTimeout(std::time::Duration),
}
