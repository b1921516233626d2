//! Line framing for the raw socket byte stream.
//!
//! The server sends CRLF-terminated lines, but a single socket read can end
//! anywhere: in the middle of a line, between the CR and the LF, or in the
//! middle of a multi-byte UTF-8 sequence. [`LineFramer`] keeps the unfinished
//! tail of each read and hands back only complete lines.
//!
//! Keepalive pings are answered here rather than by a subscriber, so a PING
//! gets its PONG even when nobody listens for it. A line that is not valid
//! UTF-8 comes out as [`Frame::Invalid`] and framing goes on with the next.
//!
//! There is no bound on how much unterminated input is held. A peer that
//! never sends a line terminator grows the fragment without limit.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::error::{ConnectionError, FramingError};

/// Prefix of a keepalive line that must be answered with a PONG.
pub const PING_MARKER: &str = "PING :";

/// One unit of framer output, in the order it was produced.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Frame {
    /// A reply that must be written to the socket immediately.
    Reply(String),
    /// A complete line ready for parsing, without its terminator.
    Line(String),
    /// A complete line that could not be decoded. Only that line is lost.
    Invalid(FramingError),
}

/// Splits a fragmented byte stream into complete protocol lines.
///
/// Usable directly through [`feed`](Self::feed), or as a [`Decoder`] under
/// `tokio_util::codec::FramedRead`.
#[derive(Debug, Default)]
pub struct LineFramer {
    /// Unterminated tail of the data passed to `feed`.
    fragment: BytesMut,
    /// Index of next byte to check for newline
    next_index: usize,
    /// Line held back while its PONG goes out first.
    held: Option<String>,
}

impl LineFramer {
    /// Create a framer with an empty fragment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of bytes currently held as an unterminated fragment.
    pub fn pending(&self) -> usize {
        self.fragment.len()
    }

    /// Feed a chunk of socket data and collect everything it completes.
    ///
    /// Each complete line starting with [`PING_MARKER`] produces a
    /// [`Frame::Reply`] immediately before its [`Frame::Line`]. Lines that are
    /// empty after trimming are dropped. An empty chunk is valid and yields
    /// nothing. This is [`Decoder::decode`] run until it has nothing left.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<Frame> {
        let mut buf = std::mem::take(&mut self.fragment);
        buf.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(frame) = self.next_frame(&mut buf) {
            frames.push(frame);
        }

        self.fragment = buf;
        frames
    }

    fn next_frame(&mut self, src: &mut BytesMut) -> Option<Frame> {
        if let Some(line) = self.held.take() {
            return Some(Frame::Line(line));
        }

        while let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let mut raw = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            raw.truncate(raw.len() - 1);
            if raw.last() == Some(&b'\r') {
                raw.truncate(raw.len() - 1);
            }

            let line = match String::from_utf8(raw.to_vec()) {
                Ok(line) => line,
                Err(e) => {
                    return Some(Frame::Invalid(FramingError::InvalidUtf8 {
                        byte_pos: e.utf8_error().valid_up_to(),
                        details: e.utf8_error().to_string(),
                        raw_line: e.into_bytes(),
                    }));
                }
            };

            if line.trim().is_empty() {
                continue;
            }

            if let Some(reply) = pong_for(&line) {
                self.held = Some(line);
                return Some(Frame::Reply(reply));
            }
            return Some(Frame::Line(line));
        }

        // Nothing terminated in what is left; skip it on the next scan.
        self.next_index = src.len();
        None
    }
}

impl Decoder for LineFramer {
    type Item = Frame;
    type Error = ConnectionError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, ConnectionError> {
        Ok(self.next_frame(src))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Frame>, ConnectionError> {
        let frame = self.next_frame(src);
        if frame.is_none() && !src.is_empty() {
            tracing::debug!(
                bytes = src.len(),
                "dropping unterminated fragment at end of stream"
            );
            src.clear();
            self.next_index = 0;
        }
        Ok(frame)
    }
}

/// Build the PONG reply for a keepalive line, if it is one.
///
/// ```
/// use caradhina::framer::pong_for;
///
/// assert_eq!(pong_for("PING :irc.example"), Some("PONG :irc.example\r\n".to_string()));
/// assert_eq!(pong_for(":nick PRIVMSG #c :PING :x"), None);
/// ```
pub fn pong_for(line: &str) -> Option<String> {
    line.strip_prefix(PING_MARKER)
        .map(|token| format!("PONG :{}\r\n", token))
}
