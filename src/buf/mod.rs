//! Types for dealing with buffers.


pub use self::read_buf::ReadBuf;
mod read_buf;

pub use self::owned_buf::OwnedBuf;
pub(crate) use self::owned_buf::Alloc;
mod owned_buf;

/// The maximum length of an array in bytes.
pub const MAX_ARRAY_LENGTH: usize = 1usize << 26;

/// The maximum length of a message body in bytes.
pub const MAX_BODY_LENGTH: usize = 1usize << 27;

/// Calculate padding with the assumption that alignment is a power of two.
#[inline(always)]
pub(crate) fn padding_to(len: usize, align: usize) -> usize {
    debug_assert!(align.is_power_of_two());
    let mask = align - 1;
    (align - (len & mask)) & mask
}
