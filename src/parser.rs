//! Incremental framing of messages from a byte stream.

use crate::error::{Error, Result};
use crate::message::{calc_message_size, Message, FIXED_HEADER_LENGTH};
use crate::signature::SignatureCache;

/// The state of a [`Parser`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParserState {
    /// Fewer than 16 bytes are buffered.
    AwaitingHeader,
    /// The size of the next message is known, but not all of it is buffered.
    AwaitingBody,
    /// A complete message is buffered.
    MessageReady,
}

/// Splits a byte stream into messages.
///
/// Bytes can be fed in chunks of any size, messages are produced as soon as
/// they have been completely received.
///
/// # Examples
///
/// ```
/// use dbus_wire::{Message, Parser};
///
/// let bytes = Message::method_call("/", "Ping").with_serial(1).serialize()?;
///
/// let mut parser = Parser::new();
/// assert!(parser.feed(&bytes[..10])?.is_empty());
///
/// let messages = parser.feed(&bytes[10..])?;
/// assert_eq!(messages.len(), 1);
/// assert_eq!(messages[0].member(), Some("Ping"));
/// # Ok::<_, dbus_wire::Error>(())
/// ```
#[derive(Debug, Default)]
pub struct Parser {
    buf: Vec<u8>,
    next_message_size: Option<usize>,
    cache: SignatureCache,
    error: Option<Error>,
}

impl Parser {
    /// Construct a new parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Construct a parser which starts out with `bytes` buffered, such as
    /// bytes received right after authentication.
    pub fn with_bytes(bytes: Vec<u8>) -> Self {
        Self {
            buf: bytes,
            ..Self::default()
        }
    }

    /// Add bytes to the buffer and return every message completed by them.
    ///
    /// An error means that the stream is corrupt, the parser should not be
    /// used after that. Messages framed before the corruption are returned
    /// first and the error is raised by the next call.
    pub fn feed(&mut self, bytes: &[u8]) -> Result<Vec<Message>> {
        self.buf.extend_from_slice(bytes);
        self.drain()
    }

    /// Return every complete message which is already buffered.
    pub fn drain(&mut self) -> Result<Vec<Message>> {
        let mut messages = Vec::new();

        loop {
            match self.next_message() {
                Ok(Some(message)) => messages.push(message),
                Ok(None) => return Ok(messages),
                Err(error) if messages.is_empty() => return Err(error),
                Err(error) => {
                    self.error = Some(error);
                    return Ok(messages);
                }
            }
        }
    }

    /// Take the next completely buffered message, if any.
    pub fn next_message(&mut self) -> Result<Option<Message>> {
        if let Some(error) = self.error.take() {
            return Err(error);
        }

        let Some(size) = self.next_message_size()? else {
            return Ok(None);
        };

        if self.buf.len() < size {
            return Ok(None);
        }

        let message = Message::from_buffer_cached(&self.buf[..size], &mut self.cache)?;
        self.buf.drain(..size);
        self.next_message_size = None;
        Ok(Some(message))
    }

    /// The size of the message currently being received, once its header has
    /// been buffered.
    pub fn next_message_size(&mut self) -> Result<Option<usize>> {
        if self.next_message_size.is_none() && self.buf.len() >= FIXED_HEADER_LENGTH {
            self.next_message_size = Some(calc_message_size(&self.buf)?);
        }

        Ok(self.next_message_size)
    }

    /// The current state of the parser.
    pub fn state(&self) -> ParserState {
        match self.next_message_size {
            None => ParserState::AwaitingHeader,
            Some(size) if self.buf.len() < size => ParserState::AwaitingBody,
            Some(_) => ParserState::MessageReady,
        }
    }

    /// The number of bytes buffered but not yet returned as messages.
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }
}

#[cfg(test)]
mod tests {
    use crate::value::Value;
    use crate::{Message, Result};

    use super::{Parser, ParserState};

    fn messages() -> Result<Vec<u8>> {
        let mut bytes = Message::method_call("/a", "First")
            .with_body("as", vec![Value::Array(vec![Value::from("x"), Value::from("yz")])])
            .with_serial(1)
            .serialize()?;

        bytes.extend(
            Message::signal("/b", "org.example.B", "Second")
                .with_body("v", vec![Value::variant("t", Value::UInt64(9))])
                .with_serial(2)
                .serialize()?,
        );

        Ok(bytes)
    }

    #[test]
    fn split_at_every_offset() -> Result<()> {
        let bytes = Message::method_call("/a", "Ping")
            .with_body("(yv)", vec![Value::Struct(vec![Value::Byte(1), Value::variant("s", Value::from("abc"))])])
            .with_serial(1)
            .serialize()?;

        let expected = Parser::new().feed(&bytes)?;
        assert_eq!(expected.len(), 1);

        for n in 1..bytes.len() {
            let mut parser = Parser::new();
            let mut actual = parser.feed(&bytes[..n])?;
            assert!(actual.is_empty(), "{n}");
            actual.extend(parser.feed(&bytes[n..])?);
            assert_eq!(actual, expected, "{n}");
            assert_eq!(parser.buffered(), 0);
        }

        Ok(())
    }

    #[test]
    fn byte_at_a_time() -> Result<()> {
        let bytes = messages()?;
        let mut parser = Parser::new();
        let mut actual = Vec::new();

        for b in &bytes {
            actual.extend(parser.feed(&[*b])?);
        }

        assert_eq!(actual, Parser::new().feed(&bytes)?);
        assert_eq!(actual.len(), 2);
        assert_eq!(actual[0].member(), Some("First"));
        assert_eq!(actual[1].member(), Some("Second"));
        Ok(())
    }

    #[test]
    fn states() -> Result<()> {
        let bytes = messages()?;
        let mut parser = Parser::new();
        assert_eq!(parser.state(), ParserState::AwaitingHeader);

        parser.feed(&bytes[..8])?;
        assert_eq!(parser.state(), ParserState::AwaitingHeader);
        assert_eq!(parser.next_message_size()?, None);

        parser.feed(&bytes[8..20])?;
        assert_eq!(parser.state(), ParserState::AwaitingBody);
        let size = parser.next_message_size()?.unwrap_or_default();
        assert!(size > 20);

        // Feeding the first message and some of the next.
        let messages = parser.feed(&bytes[20..size + 4])?;
        assert_eq!(messages.len(), 1);
        assert_eq!(parser.state(), ParserState::AwaitingHeader);
        assert_eq!(parser.buffered(), 4);
        Ok(())
    }

    #[test]
    fn messages_before_corruption_are_kept() -> Result<()> {
        let mut bytes = messages()?;
        bytes.extend_from_slice(&[b'X'; 16]);

        let mut parser = Parser::new();
        let messages = parser.feed(&bytes)?;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].member(), Some("First"));
        assert_eq!(messages[1].member(), Some("Second"));
        assert_eq!(parser.buffered(), 16);

        let error = parser.drain().unwrap_err();
        assert!(error.is_framing());
        assert!(parser.feed(&[]).is_err());
        Ok(())
    }

    #[test]
    fn corrupt_stream() {
        let mut parser = Parser::new();
        let error = parser.feed(&[b'X'; 16]).unwrap_err();
        assert!(error.is_framing());
    }
}
