use std::fmt;

use crate::buf::padding_to;
use crate::error::{Error, ErrorKind, Result};
use crate::frame::Frame;
use crate::protocol::Endianness;

/// A read-only cursor over a byte slice which reads values at their protocol
/// alignment.
///
/// The read position is an absolute offset into the slice, so alignment is
/// computed relative to the start of the slice.
///
/// # Examples
///
/// ```
/// use dbus_wire::{Endianness, ReadBuf};
///
/// let mut buf = ReadBuf::new(b"\x07\x00\x00\x00foo bar\x00", Endianness::LITTLE);
/// assert_eq!(buf.position(), 0);
/// assert_eq!(buf.remaining(), 12);
/// ```
#[derive(Clone)]
pub struct ReadBuf<'a> {
    data: &'a [u8],
    read: usize,
    endianness: Endianness,
}

impl<'a> ReadBuf<'a> {
    /// Construct a read buffer over `data`.
    pub fn new(data: &'a [u8], endianness: Endianness) -> Self {
        Self::with_position(data, 0, endianness)
    }

    /// Construct a read buffer over `data` positioned at `read`.
    pub fn with_position(data: &'a [u8], read: usize, endianness: Endianness) -> Self {
        Self {
            data,
            read,
            endianness,
        }
    }

    /// Get the endianness of the buffer.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// The current read position.
    #[inline]
    pub fn position(&self) -> usize {
        self.read
    }

    /// The number of bytes left to read.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.read)
    }

    /// Test if everything has been read.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// Get the unread bytes.
    pub fn get(&self) -> &'a [u8] {
        self.data.get(self.read..).unwrap_or_default()
    }

    /// Restrict the readable region so that it ends at `end`.
    pub(crate) fn limit(&self, end: usize) -> Result<ReadBuf<'a>> {
        let Some(data) = self.data.get(..end) else {
            return Err(Error::new(ErrorKind::BufferUnderflow));
        };

        Ok(ReadBuf::with_position(data, self.read, self.endianness))
    }

    /// Move the read position to `read`.
    pub(crate) fn set_position(&mut self, read: usize) {
        self.read = read;
    }

    /// Align the read side of the buffer, skipping any padding.
    pub(crate) fn align(&mut self, align: usize) -> Result<()> {
        let padding = padding_to(self.read, align);

        if padding > self.remaining() {
            return Err(Error::new(ErrorKind::BufferUnderflow));
        }

        self.read += padding;
        Ok(())
    }

    /// Load a frame of the given type.
    ///
    /// This advances the read cursor of the buffer by the alignment and size of
    /// the type.
    pub(crate) fn load<T>(&mut self) -> Result<T>
    where
        T: Frame,
    {
        self.align(T::SIZE)?;
        let bytes = self.load_bytes(T::SIZE)?;
        Ok(T::decode(bytes, self.endianness))
    }

    /// Load `len` raw bytes.
    pub(crate) fn load_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        let end = self
            .read
            .checked_add(len)
            .ok_or(Error::new(ErrorKind::BufferUnderflow))?;

        let Some(bytes) = self.data.get(self.read..end) else {
            return Err(Error::new(ErrorKind::BufferUnderflow));
        };

        self.read = end;
        Ok(bytes)
    }

    /// Load a slice ending with a NUL byte, excluding the null byte.
    pub(crate) fn load_slice_nul(&mut self, len: usize) -> Result<&'a [u8]> {
        let bytes = self.load_bytes(len)?;

        match self.load_bytes(1)? {
            [0] => Ok(bytes),
            _ => Err(Error::new(ErrorKind::NotNullTerminated)),
        }
    }
}

impl fmt::Debug for ReadBuf<'_> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadBuf")
            .field("len", &self.data.len())
            .field("read", &self.read)
            .field("endianness", &self.endianness)
            .finish()
    }
}
