//! Wire protocol: newline-terminated UTF-8 lines.
//!
//! This module provides the tokio codec for line framing plus constructors
//! for every line the server emits. Messages are plain text terminated by a
//! single `\n`; a trailing `\r` before the terminator is stripped so telnet
//! clients work unmodified.

use bytes::{BufMut, BytesMut};
use thiserror::Error;
use tokio_util::codec::{Decoder, Encoder};

use crate::state::ids::SessionId;

/// Errors produced while framing lines.
#[derive(Debug, Error)]
pub enum LineError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("line too long: {actual} bytes (limit {limit})")]
    TooLong { actual: usize, limit: usize },

    #[error("line is not valid utf-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}

/// Line-based codec that reads and writes newline-terminated messages.
pub struct LineCodec {
    /// Index of the next byte to check for a newline.
    next_index: usize,
    /// Maximum accepted line length in bytes, terminator included.
    max_len: usize,
}

impl LineCodec {
    /// Create a codec with the given maximum line length.
    pub fn new(max_len: usize) -> Self {
        Self {
            next_index: 0,
            max_len,
        }
    }
}

impl Decoder for LineCodec {
    type Item = String;
    type Error = LineError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<String>, LineError> {
        // Look for a newline starting from where the last scan stopped.
        if let Some(offset) = src[self.next_index..].iter().position(|b| *b == b'\n') {
            let line = src.split_to(self.next_index + offset + 1);
            self.next_index = 0;

            if line.len() > self.max_len {
                return Err(LineError::TooLong {
                    actual: line.len(),
                    limit: self.max_len,
                });
            }

            let mut text = String::from_utf8(line.to_vec())?;
            text.pop(); // terminator
            if text.ends_with('\r') {
                text.pop();
            }
            Ok(Some(text))
        } else {
            // No complete line yet - remember where the scan stopped.
            self.next_index = src.len();

            if src.len() > self.max_len {
                return Err(LineError::TooLong {
                    actual: src.len(),
                    limit: self.max_len,
                });
            }
            Ok(None)
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<String>, LineError> {
        let item = self.decode(src)?;
        if item.is_none() {
            // An unterminated trailing fragment is discarded.
            src.clear();
            self.next_index = 0;
        }
        Ok(item)
    }
}

impl<'a> Encoder<&'a str> for LineCodec {
    type Error = LineError;

    fn encode(&mut self, line: &'a str, dst: &mut BytesMut) -> Result<(), LineError> {
        dst.reserve(line.len() + 1);
        dst.put(line.as_bytes());
        dst.put_u8(b'\n');
        Ok(())
    }
}

/// Check that a proposed username is acceptable: at least one character,
/// every character a letter or digit.
pub fn is_valid_username(name: &str) -> bool {
    !name.is_empty() && name.chars().all(char::is_alphanumeric)
}

/// Greeting sent immediately after a connection is accepted.
pub fn greeting(id: SessionId, room: &str) -> String {
    format!("[id: {id}] Welcome to {room}! What is your username?")
}

/// Roster line sent to a client that has just joined.
pub fn roster(others: &[String]) -> String {
    format!("* The room contains: {}", others.join(", "))
}

/// Announcement broadcast when a client joins.
pub fn entered(username: &str) -> String {
    format!("* {username} has entered the room")
}

/// Announcement broadcast when a client leaves.
pub fn left(username: &str) -> String {
    format!("* {username} has left the room")
}

/// A relayed chat line.
pub fn chat(username: &str, text: &str) -> String {
    format!("[{username}] {text}")
}
