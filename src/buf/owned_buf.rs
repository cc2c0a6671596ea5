use std::marker::PhantomData;

use crate::buf::{padding_to, ReadBuf};
use crate::frame::Frame;
use crate::protocol::Endianness;

/// An allocated location in the buffer that can be written to later.
pub(crate) struct Alloc<T>(usize, PhantomData<T>);

impl<T> Clone for Alloc<T> {
    #[inline]
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Alloc<T> {}

/// A growable buffer which writes values at their protocol alignment.
///
/// Alignment is computed relative to a base position, so that a buffer can be
/// used to marshal data that will be placed at an arbitrary offset inside of a
/// larger message.
///
/// # Examples
///
/// ```
/// use dbus_wire::{Endianness, OwnedBuf};
///
/// let buf = OwnedBuf::with_endianness(Endianness::LITTLE);
/// assert!(buf.is_empty());
/// assert_eq!(buf.endianness(), Endianness::LITTLE);
/// ```
#[derive(Clone, PartialEq, Eq)]
pub struct OwnedBuf {
    data: Vec<u8>,
    base: usize,
    endianness: Endianness,
}

impl OwnedBuf {
    /// Construct a new empty buffer using native endianness.
    pub fn new() -> Self {
        Self::with_endianness(Endianness::NATIVE)
    }

    /// Construct a new buffer with the specified endianness.
    pub fn with_endianness(endianness: Endianness) -> Self {
        Self::with_base(endianness, 0)
    }

    /// Construct a new buffer whose first byte sits at `base` for alignment
    /// purposes.
    pub fn with_base(endianness: Endianness, base: usize) -> Self {
        Self {
            data: Vec::new(),
            base,
            endianness,
        }
    }

    /// Get the endianness of the buffer.
    pub fn endianness(&self) -> Endianness {
        self.endianness
    }

    /// The logical position of the write cursor, including the base.
    #[inline]
    pub fn position(&self) -> usize {
        self.base + self.data.len()
    }

    /// Test if the buffer is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The number of bytes written.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Get the bytes written so far.
    #[inline]
    pub fn get(&self) -> &[u8] {
        &self.data
    }

    /// Convert into the underlying bytes.
    #[inline]
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }

    /// Read the written bytes back through a [`ReadBuf`].
    pub fn read(&self) -> ReadBuf<'_> {
        ReadBuf::new(&self.data, self.endianness)
    }

    /// Align the write end of the buffer and zero-initialize any padding.
    pub(crate) fn align_mut(&mut self, align: usize) {
        let padding = padding_to(self.position(), align);
        self.data.resize(self.data.len() + padding, 0);
    }

    /// Write the given frame to the buffer at its alignment.
    pub(crate) fn store<T>(&mut self, frame: T)
    where
        T: Frame,
    {
        self.align_mut(T::SIZE);
        let at = self.data.len();
        self.data.resize(at + T::SIZE, 0);
        frame.encode(&mut self.data[at..], self.endianness);
    }

    /// Allocate, zero space for and align data for `T`.
    pub(crate) fn alloc<T>(&mut self) -> Alloc<T>
    where
        T: Frame,
    {
        self.align_mut(T::SIZE);
        let at = self.data.len();
        self.data.resize(at + T::SIZE, 0);
        Alloc(at, PhantomData)
    }

    /// Write the given value at a previously allocated location.
    pub(crate) fn store_at<T>(&mut self, at: Alloc<T>, frame: T)
    where
        T: Frame,
    {
        let Alloc(at, _) = at;
        frame.encode(&mut self.data[at..at + T::SIZE], self.endianness);
    }

    /// Extend the buffer with a slice.
    pub(crate) fn extend_from_slice(&mut self, bytes: &[u8]) {
        self.data.extend_from_slice(bytes);
    }

    /// Extend the buffer with a slice ending with a NUL byte.
    pub(crate) fn extend_from_slice_nul(&mut self, bytes: &[u8]) {
        self.data.reserve(bytes.len() + 1);
        self.data.extend_from_slice(bytes);
        self.data.push(0);
    }

    /// Truncate the buffer to `len` written bytes.
    pub(crate) fn truncate(&mut self, len: usize) {
        self.data.truncate(len);
    }
}

impl Default for OwnedBuf {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for OwnedBuf {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnedBuf")
            .field("len", &self.data.len())
            .field("base", &self.base)
            .field("endianness", &self.endianness)
            .finish()
    }
}
