use std::error;
use std::fmt;
use std::io;
use std::str::Utf8Error;

use crate::value::Value;
use crate::SignatureError;

/// Result alias using an [`Error`] as the error type by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// An error raised by this crate.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
}

impl Error {
    #[inline]
    pub(crate) fn new(kind: ErrorKind) -> Error {
        Self { kind }
    }

    #[cfg(test)]
    pub(crate) fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Test if the error indicates that the operation would block.
    #[inline]
    pub(crate) fn would_block(&self) -> bool {
        matches!(self.kind, ErrorKind::WouldBlock)
    }

    /// Test if the error is a malformed signature.
    pub fn is_signature(&self) -> bool {
        matches!(self.kind, ErrorKind::Signature(..))
    }

    /// Test if the error is caused by a value that does not match the type it
    /// is being marshalled as.
    pub fn is_marshal(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::TypeMismatch { .. }
                | ErrorKind::ArityMismatch { .. }
                | ErrorKind::InvalidObjectPath(..)
                | ErrorKind::NulInString
                | ErrorKind::StringTooLong(..)
                | ErrorKind::UnexpectedReplySignature { .. }
        )
    }

    /// Test if the error is caused by an array exceeding the 64 MiB size
    /// limit.
    pub fn is_size_limit(&self) -> bool {
        matches!(self.kind, ErrorKind::ArrayTooLong(..))
    }

    /// Test if the error is caused by a truncated or corrupt buffer.
    pub fn is_framing(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::BufferUnderflow
                | ErrorKind::NotNullTerminated
                | ErrorKind::Utf8Error(..)
                | ErrorKind::InvalidBoolean(..)
                | ErrorKind::CorruptObjectPath(..)
                | ErrorKind::InvalidEndianness(..)
                | ErrorKind::InvalidMessageType(..)
                | ErrorKind::InvalidHeaderField(..)
                | ErrorKind::ArrayLengthMismatch
                | ErrorKind::BodyLengthMismatch { .. }
                | ErrorKind::BodyTooLong(..)
                | ErrorKind::HeaderFieldsTooLong(..)
                | ErrorKind::VariantTooDeep
                | ErrorKind::ZeroSerial
                | ErrorKind::ZeroReplySerial
                | ErrorKind::MissingPath
                | ErrorKind::MissingInterface
                | ErrorKind::MissingMember
                | ErrorKind::MissingErrorName
                | ErrorKind::MissingReplySerial
        )
    }

    /// Test if the error is a rejected or malformed SASL authentication.
    pub fn is_authentication(&self) -> bool {
        matches!(
            self.kind,
            ErrorKind::Authentication(..) | ErrorKind::AuthLineTooLong(..)
        )
    }

    /// Get the raw line the bus rejected authentication with.
    pub fn auth_line(&self) -> Option<&[u8]> {
        match &self.kind {
            ErrorKind::Authentication(line) => Some(line),
            _ => None,
        }
    }

    /// Test if the peer closed the connection while data was expected.
    pub fn is_connection_reset(&self) -> bool {
        matches!(self.kind, ErrorKind::ConnectionReset)
    }

    /// Test if the call failed because the connection was closed before a
    /// reply arrived.
    pub fn is_closed(&self) -> bool {
        matches!(self.kind, ErrorKind::ConnectionClosed)
    }

    /// Test if waiting for a reply timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self.kind, ErrorKind::Timeout)
    }

    /// Access the error name and body if this is an error reply sent by the
    /// remote end.
    pub fn response_error(&self) -> Option<(&str, &[Value])> {
        match &self.kind {
            ErrorKind::ResponseError(error_name, body) => Some((error_name, body)),
            _ => None,
        }
    }
}

impl From<SignatureError> for Error {
    #[inline]
    fn from(error: SignatureError) -> Self {
        Self::new(ErrorKind::Signature(error))
    }
}

impl From<io::Error> for Error {
    #[inline]
    fn from(error: io::Error) -> Self {
        match error.kind() {
            io::ErrorKind::WouldBlock => Self::new(ErrorKind::WouldBlock),
            io::ErrorKind::TimedOut => Self::new(ErrorKind::Timeout),
            io::ErrorKind::ConnectionReset | io::ErrorKind::UnexpectedEof => {
                Self::new(ErrorKind::ConnectionReset)
            }
            _ => Self::new(ErrorKind::Io(error)),
        }
    }
}

impl From<Utf8Error> for Error {
    #[inline]
    fn from(error: Utf8Error) -> Self {
        Self::new(ErrorKind::Utf8Error(error))
    }
}

impl From<ErrorKind> for Error {
    #[inline]
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl fmt::Display for Error {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.kind {
            ErrorKind::Io(error) => error.fmt(f),
            ErrorKind::Signature(error) => error.fmt(f),
            ErrorKind::Utf8Error(error) => error.fmt(f),
            ErrorKind::WouldBlock => write!(f, "Would block"),
            ErrorKind::Timeout => write!(f, "Timed out waiting for reply"),
            ErrorKind::TypeMismatch { expected, actual } => {
                write!(f, "Expected value of type `{expected}` but got {actual}")
            }
            ErrorKind::ArityMismatch { expected, actual } => {
                write!(f, "{actual} values supplied for {expected} fields")
            }
            ErrorKind::InvalidObjectPath(path) => write!(f, "Invalid object path {path:?}"),
            ErrorKind::NulInString => write!(f, "String contains a NUL byte"),
            ErrorKind::StringTooLong(length) => {
                write!(f, "String of length {length} is too long (max is 134217728)")
            }
            ErrorKind::UnexpectedReplySignature { expected, actual } => {
                write!(
                    f,
                    "Expected reply with signature {expected:?} but got {actual:?}"
                )
            }
            ErrorKind::ArrayTooLong(length) => {
                write!(f, "Array of length {length} is too long (max is 67108864)")
            }
            ErrorKind::BodyTooLong(length) => {
                write!(f, "Body of length {length} is too long (max is 134217728)")
            }
            ErrorKind::HeaderFieldsTooLong(length) => {
                write!(
                    f,
                    "Header fields of length {length} are too long (max is 67108864)"
                )
            }
            ErrorKind::BufferUnderflow => write!(f, "Buffer underflow"),
            ErrorKind::NotNullTerminated => write!(f, "String is not null terminated"),
            ErrorKind::InvalidBoolean(value) => write!(f, "Invalid boolean value {value}"),
            ErrorKind::CorruptObjectPath(path) => write!(f, "Received invalid object path {path:?}"),
            ErrorKind::InvalidEndianness(byte) => write!(f, "Invalid endianness byte {byte:#04x}"),
            ErrorKind::InvalidMessageType(byte) => write!(f, "Invalid message type {byte}"),
            ErrorKind::InvalidHeaderField(code) => {
                write!(f, "Header field {code} has a value of the wrong type")
            }
            ErrorKind::ArrayLengthMismatch => {
                write!(f, "Array elements do not end at the declared array length")
            }
            ErrorKind::BodyLengthMismatch { declared, actual } => {
                write!(f, "Body declared {declared} bytes but {actual} were used")
            }
            ErrorKind::VariantTooDeep => write!(f, "Variants nested too deeply"),
            ErrorKind::ZeroSerial => write!(f, "Zero in header serial"),
            ErrorKind::ZeroReplySerial => write!(f, "Zero REPLY_SERIAL header"),
            ErrorKind::MissingPath => write!(f, "Missing required PATH header"),
            ErrorKind::MissingInterface => write!(f, "Missing required INTERFACE header"),
            ErrorKind::MissingMember => write!(f, "Missing required MEMBER header"),
            ErrorKind::MissingErrorName => write!(f, "Missing required ERROR_NAME header"),
            ErrorKind::MissingReplySerial => write!(f, "Missing required REPLY_SERIAL header"),
            ErrorKind::Authentication(line) => {
                write!(
                    f,
                    "Authentication failed, bus sent: {:?}",
                    String::from_utf8_lossy(line)
                )
            }
            ErrorKind::AuthLineTooLong(length) => {
                write!(f, "Authentication line of length {length} is too long (max is 16384)")
            }
            ErrorKind::ConnectionReset => write!(f, "Connection reset by peer"),
            ErrorKind::ConnectionClosed => write!(f, "Connection closed"),
            ErrorKind::MissingBus => write!(f, "Missing session bus"),
            ErrorKind::InvalidAddress => write!(f, "Invalid d-bus address"),
            ErrorKind::ResponseError(error_name, body) => match body.first() {
                Some(Value::String(message)) => write!(f, "Response error: {error_name}: {message}"),
                _ => write!(f, "Response error: {error_name}"),
            },
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match &self.kind {
            ErrorKind::Io(error) => Some(error),
            ErrorKind::Signature(error) => Some(error),
            ErrorKind::Utf8Error(error) => Some(error),
            _ => None,
        }
    }
}

#[derive(Debug)]
pub(crate) enum ErrorKind {
    Io(io::Error),
    Signature(SignatureError),
    Utf8Error(Utf8Error),
    WouldBlock,
    Timeout,
    TypeMismatch {
        expected: Box<str>,
        actual: &'static str,
    },
    ArityMismatch {
        expected: usize,
        actual: usize,
    },
    InvalidObjectPath(Box<str>),
    NulInString,
    StringTooLong(usize),
    UnexpectedReplySignature {
        expected: Box<str>,
        actual: Box<str>,
    },
    ArrayTooLong(usize),
    BodyTooLong(usize),
    HeaderFieldsTooLong(usize),
    BufferUnderflow,
    NotNullTerminated,
    InvalidBoolean(u32),
    CorruptObjectPath(Box<str>),
    InvalidEndianness(u8),
    InvalidMessageType(u8),
    InvalidHeaderField(u8),
    ArrayLengthMismatch,
    BodyLengthMismatch {
        declared: usize,
        actual: usize,
    },
    VariantTooDeep,
    ZeroSerial,
    ZeroReplySerial,
    MissingPath,
    MissingInterface,
    MissingMember,
    MissingErrorName,
    MissingReplySerial,
    Authentication(Box<[u8]>),
    AuthLineTooLong(usize),
    ConnectionReset,
    ConnectionClosed,
    MissingBus,
    InvalidAddress,
    ResponseError(Box<str>, Vec<Value>),
}

#[cfg(test)]
mod tests {
    use super::{Error, ErrorKind};

    #[test]
    fn classification_follows_direction() {
        let written = Error::new(ErrorKind::StringTooLong(usize::MAX));
        assert!(written.is_marshal());
        assert!(!written.is_framing());

        let received = Error::new(ErrorKind::CorruptObjectPath("//b".into()));
        assert!(received.is_framing());
        assert!(!received.is_marshal());

        let line = Error::new(ErrorKind::AuthLineTooLong(usize::MAX));
        assert!(line.is_authentication());
        assert!(line.auth_line().is_none());
    }
}
