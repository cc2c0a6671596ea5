//! Parsing of signature strings into [`Type`] descriptors.

#[cfg(test)]
mod tests;

pub use self::signature_error::SignatureError;
mod signature_error;

pub use self::cache::SignatureCache;
mod cache;

use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::ty::{Fixed, Str, Type};

/// The maximum length of a signature in bytes.
pub const MAX_SIGNATURE: usize = 256;

/// The maximum nesting of arrays, and separately of structs and dict entries.
pub const MAX_DEPTH: usize = 32;

/// A parsed signature: a sequence of complete types.
///
/// # Examples
///
/// ```
/// use dbus_wire::Signature;
///
/// let sig = Signature::new("ia{sv}")?;
/// assert_eq!(sig.types().len(), 2);
/// assert_eq!(sig.as_str(), "ia{sv}");
///
/// assert!(Signature::new("a{vs}").is_err());
/// # Ok::<_, dbus_wire::Error>(())
/// ```
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    string: Box<str>,
    types: Arc<[Type]>,
}

impl Signature {
    /// The empty signature.
    pub fn empty() -> Self {
        Self {
            string: Box::from(""),
            types: Arc::from([]),
        }
    }

    /// Parse a signature.
    pub fn new(signature: &str) -> Result<Self> {
        let types = parse_all(signature)?;

        Ok(Self {
            string: signature.into(),
            types: types.into(),
        })
    }

    /// Construct from already parsed parts.
    pub(crate) fn from_parts(string: &str, types: Arc<[Type]>) -> Self {
        Self {
            string: string.into(),
            types,
        }
    }

    /// Parse a signature into its sequence of complete types.
    pub fn parse_all(signature: &str) -> Result<Vec<Type>> {
        Ok(parse_all(signature)?)
    }

    /// Parse a signature which must contain exactly one complete type, such as
    /// the signature of a variant.
    pub fn parse_single(signature: &str) -> Result<Type> {
        Ok(parse_single(signature)?)
    }

    /// The signature as a string.
    pub fn as_str(&self) -> &str {
        &self.string
    }

    /// The complete types of the signature.
    pub fn types(&self) -> &[Type] {
        &self.types
    }

    /// Test if the signature is empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl fmt::Debug for Signature {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Signature").field(&self.string).finish()
    }
}

impl fmt::Display for Signature {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.string)
    }
}

/// Parse one complete type from `signature` starting at byte `pos`.
///
/// Returns the type and the position immediately after it.
///
/// # Examples
///
/// ```
/// use dbus_wire::{parse_signature, Type};
///
/// let (ty, pos) = parse_signature("a{sv}i", 0)?;
/// assert!(matches!(ty, Type::Array(..)));
/// assert_eq!(pos, 5);
///
/// let (ty, pos) = parse_signature("a{sv}i", pos)?;
/// assert_eq!(ty.to_string(), "i");
/// assert_eq!(pos, 6);
/// # Ok::<_, dbus_wire::SignatureError>(())
/// ```
pub fn parse_signature(signature: &str, pos: usize) -> Result<(Type, usize), SignatureError> {
    let bytes = signature.as_bytes();

    if bytes.len() >= MAX_SIGNATURE {
        return Err(SignatureError::SignatureTooLong);
    }

    Cursor::new(bytes, pos).complete(Depth::default(), false)
}

/// Parse every complete type of a signature.
pub(crate) fn parse_all(signature: &str) -> Result<Vec<Type>, SignatureError> {
    let bytes = signature.as_bytes();

    if bytes.len() >= MAX_SIGNATURE {
        return Err(SignatureError::SignatureTooLong);
    }

    let mut cursor = Cursor::new(bytes, 0);
    let mut types = Vec::new();

    while !cursor.is_empty() {
        types.push(cursor.parse(Depth::default(), false)?);
    }

    Ok(types)
}

/// Parse a signature which must be exactly one complete type.
pub(crate) fn parse_single(signature: &str) -> Result<Type, SignatureError> {
    let mut types = parse_all(signature)?;

    if types.len() != 1 {
        return Err(SignatureError::NotSingleCompleteType);
    }

    Ok(types.swap_remove(0))
}

#[derive(Default, Clone, Copy)]
struct Depth {
    arrays: usize,
    structs: usize,
}

/// A cursor over the bytes of a signature.
struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(bytes: &'a [u8], pos: usize) -> Self {
        Self { bytes, pos }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// Parse one complete type, returning it and the position after it.
    fn complete(mut self, depth: Depth, in_array: bool) -> Result<(Type, usize), SignatureError> {
        let ty = self.parse(depth, in_array)?;
        Ok((ty, self.pos))
    }

    fn parse(&mut self, depth: Depth, in_array: bool) -> Result<Type, SignatureError> {
        let Some(code) = self.peek() else {
            return Err(SignatureError::UnexpectedEnd);
        };

        self.pos += 1;

        let ty = match code {
            b'a' => {
                let depth = Depth {
                    arrays: depth.arrays + 1,
                    ..depth
                };

                if depth.arrays > MAX_DEPTH {
                    return Err(SignatureError::ExceededMaximumArrayRecursion);
                }

                if matches!(self.peek(), None | Some(b')' | b'}')) {
                    return Err(SignatureError::MissingArrayElementType);
                }

                Type::Array(Box::new(self.parse(depth, true)?))
            }
            b'(' => {
                let depth = Depth {
                    structs: depth.structs + 1,
                    ..depth
                };

                if depth.structs > MAX_DEPTH {
                    return Err(SignatureError::ExceededMaximumStructRecursion);
                }

                let mut fields = Vec::new();

                loop {
                    match self.peek() {
                        None => return Err(SignatureError::StructStartedButNotEnded),
                        Some(b')') => {
                            self.pos += 1;
                            break;
                        }
                        Some(_) => {
                            fields.push(self.parse(depth, false)?);
                        }
                    }
                }

                if fields.is_empty() {
                    return Err(SignatureError::StructHasNoFields);
                }

                Type::Struct(fields.into())
            }
            b'{' => {
                if !in_array {
                    return Err(SignatureError::DictEntryNotInsideArray);
                }

                let depth = Depth {
                    structs: depth.structs + 1,
                    ..depth
                };

                if depth.structs > MAX_DEPTH {
                    return Err(SignatureError::ExceededMaximumStructRecursion);
                }

                let key = match self.peek() {
                    None => return Err(SignatureError::DictStartedButNotEnded),
                    Some(b'}') => return Err(SignatureError::DictEntryHasNoFields),
                    Some(_) => self.parse(depth, false)?,
                };

                if !key.is_basic() {
                    return Err(SignatureError::DictKeyMustBeBasicType);
                }

                let value = match self.peek() {
                    None => return Err(SignatureError::DictStartedButNotEnded),
                    Some(b'}') => return Err(SignatureError::DictEntryHasOnlyOneField),
                    Some(_) => self.parse(depth, false)?,
                };

                match self.peek() {
                    None => return Err(SignatureError::DictStartedButNotEnded),
                    Some(b'}') => {
                        self.pos += 1;
                    }
                    Some(_) => return Err(SignatureError::DictEntryHasTooManyFields),
                }

                Type::DictEntry(Box::new((key, value)))
            }
            b')' => return Err(SignatureError::StructEndedButNotStarted),
            b'}' => return Err(SignatureError::DictEndedButNotStarted),
            b'v' => Type::Variant,
            b'y' => Type::Fixed(Fixed::Byte),
            b'b' => Type::Fixed(Fixed::Boolean),
            b'n' => Type::Fixed(Fixed::Int16),
            b'q' => Type::Fixed(Fixed::UInt16),
            b'i' => Type::Fixed(Fixed::Int32),
            b'u' => Type::Fixed(Fixed::UInt32),
            b'x' => Type::Fixed(Fixed::Int64),
            b't' => Type::Fixed(Fixed::UInt64),
            b'd' => Type::Fixed(Fixed::Double),
            b'h' => Type::Fixed(Fixed::UnixFd),
            b's' => Type::Str(Str::String),
            b'o' => Type::Str(Str::ObjectPath),
            b'g' => Type::Str(Str::Signature),
            code => return Err(SignatureError::UnknownTypeCode(code)),
        };

        Ok(ty)
    }
}
