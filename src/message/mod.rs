//! Encoding and decoding of complete messages.

#[cfg(test)]
mod tests;

pub use self::header::Header;
mod header;

pub use self::message::Message;
mod message;

pub use self::method_call::MethodCall;
mod method_call;

use crate::buf::{padding_to, ReadBuf, MAX_ARRAY_LENGTH, MAX_BODY_LENGTH};
use crate::error::{Error, ErrorKind, Result};
use crate::protocol::Endianness;

/// The size of the fixed part of the header, including the length of the
/// header fields array.
pub const FIXED_HEADER_LENGTH: usize = 16;

/// Calculate the total size of the message starting at `bytes`.
///
/// Only the first 16 bytes are inspected. Declared lengths exceeding the
/// protocol limits are rejected before anything is buffered.
///
/// # Examples
///
/// ```
/// use dbus_wire::message::calc_message_size;
///
/// let header = b"l\x02\x02\x01\x04\0\0\0\x78\x56\x34\x12\x0f\0\0\0";
/// assert_eq!(calc_message_size(header)?, 36);
/// assert!(calc_message_size(&header[..15]).is_err());
/// # Ok::<_, dbus_wire::Error>(())
/// ```
pub fn calc_message_size(bytes: &[u8]) -> Result<usize> {
    let Some(&first) = bytes.first() else {
        return Err(Error::new(ErrorKind::BufferUnderflow));
    };

    if bytes.len() < FIXED_HEADER_LENGTH {
        return Err(Error::new(ErrorKind::BufferUnderflow));
    }

    let Some(endianness) = Endianness::from_raw(first) else {
        return Err(Error::new(ErrorKind::InvalidEndianness(first)));
    };

    let mut buf = ReadBuf::with_position(bytes, 4, endianness);
    let body_length = buf.load::<u32>()? as usize;
    buf.set_position(12);
    let fields_length = buf.load::<u32>()? as usize;

    if body_length > MAX_BODY_LENGTH {
        return Err(Error::new(ErrorKind::BodyTooLong(body_length)));
    }

    if fields_length > MAX_ARRAY_LENGTH {
        return Err(Error::new(ErrorKind::HeaderFieldsTooLong(fields_length)));
    }

    let header_end = FIXED_HEADER_LENGTH + fields_length;
    Ok(header_end + padding_to(header_end, 8) + body_length)
}
