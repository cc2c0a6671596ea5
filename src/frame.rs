use crate::protocol::Endianness;

/// A fixed-width value in the protocol.
///
/// Every frame aligns to its own size, which is at most `8`.
pub(crate) trait Frame: Copy {
    /// The size in bytes of the frame, which is also its alignment.
    const SIZE: usize;

    /// Encode the frame into `out` which is exactly [`Frame::SIZE`] bytes.
    fn encode(self, out: &mut [u8], endianness: Endianness);

    /// Decode the frame from `bytes` which is exactly [`Frame::SIZE`] bytes.
    fn decode(bytes: &[u8], endianness: Endianness) -> Self;
}

impl Frame for u8 {
    const SIZE: usize = 1;

    #[inline]
    fn encode(self, out: &mut [u8], _: Endianness) {
        out[0] = self;
    }

    #[inline]
    fn decode(bytes: &[u8], _: Endianness) -> Self {
        bytes[0]
    }
}

macro_rules! impl_number {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Frame for $ty {
                const SIZE: usize = core::mem::size_of::<$ty>();

                #[inline]
                fn encode(self, out: &mut [u8], endianness: Endianness) {
                    let bytes = if endianness == Endianness::BIG {
                        self.to_be_bytes()
                    } else {
                        self.to_le_bytes()
                    };

                    out.copy_from_slice(&bytes);
                }

                #[inline]
                fn decode(bytes: &[u8], endianness: Endianness) -> Self {
                    let mut array = [0; core::mem::size_of::<$ty>()];
                    array.copy_from_slice(bytes);

                    if endianness == Endianness::BIG {
                        <$ty>::from_be_bytes(array)
                    } else {
                        <$ty>::from_le_bytes(array)
                    }
                }
            }
        )*
    }
}

impl_number!(u16, u32, u64);
impl_number!(i16, i32, i64);
impl_number!(f64);
