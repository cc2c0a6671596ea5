//! Type descriptors produced by parsing a signature.

use std::fmt;

/// A fixed-width scalar type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fixed {
    /// 8-bit unsigned integer (`y`).
    Byte,
    /// Boolean stored as a 32-bit unsigned integer (`b`).
    Boolean,
    /// 16-bit signed integer (`n`).
    Int16,
    /// 16-bit unsigned integer (`q`).
    UInt16,
    /// 32-bit signed integer (`i`).
    Int32,
    /// 32-bit unsigned integer (`u`).
    UInt32,
    /// 64-bit signed integer (`x`).
    Int64,
    /// 64-bit unsigned integer (`t`).
    UInt64,
    /// IEEE 754 double (`d`).
    Double,
    /// Index of a unix file descriptor passed out of band (`h`).
    UnixFd,
}

impl Fixed {
    /// The size in bytes of the type, which is also its alignment.
    pub const fn size(self) -> usize {
        match self {
            Fixed::Byte => 1,
            Fixed::Int16 | Fixed::UInt16 => 2,
            Fixed::Boolean | Fixed::Int32 | Fixed::UInt32 | Fixed::UnixFd => 4,
            Fixed::Int64 | Fixed::UInt64 | Fixed::Double => 8,
        }
    }

    /// The signature code of the type.
    pub const fn code(self) -> u8 {
        match self {
            Fixed::Byte => b'y',
            Fixed::Boolean => b'b',
            Fixed::Int16 => b'n',
            Fixed::UInt16 => b'q',
            Fixed::Int32 => b'i',
            Fixed::UInt32 => b'u',
            Fixed::Int64 => b'x',
            Fixed::UInt64 => b't',
            Fixed::Double => b'd',
            Fixed::UnixFd => b'h',
        }
    }
}

/// A length-prefixed string type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Str {
    /// UTF-8 string (`s`).
    String,
    /// Object path (`o`).
    ObjectPath,
    /// Type signature (`g`).
    Signature,
}

impl Str {
    /// The width in bytes of the length prefix, which is also the alignment.
    pub const fn length_size(self) -> usize {
        match self {
            Str::String | Str::ObjectPath => 4,
            Str::Signature => 1,
        }
    }

    /// The signature code of the type.
    pub const fn code(self) -> u8 {
        match self {
            Str::String => b's',
            Str::ObjectPath => b'o',
            Str::Signature => b'g',
        }
    }
}

/// A complete D-Bus type.
///
/// Types are immutable once parsed and are usually shared by reference, see
/// [`SignatureCache`].
///
/// [`SignatureCache`]: crate::SignatureCache
///
/// # Examples
///
/// ```
/// use dbus_wire::{Signature, Type};
///
/// let ty = Signature::parse_single("a{sv}")?;
/// assert!(matches!(ty, Type::Array(..)));
/// assert_eq!(ty.to_string(), "a{sv}");
/// assert_eq!(ty.alignment(), 4);
/// # Ok::<_, dbus_wire::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// A fixed-width scalar.
    Fixed(Fixed),
    /// A length-prefixed string.
    Str(Str),
    /// A struct with at least one field.
    Struct(Box<[Type]>),
    /// An array of the given element type.
    Array(Box<Type>),
    /// A dict entry, only ever found as the element of an array.
    DictEntry(Box<(Type, Type)>),
    /// A self-describing variant.
    Variant,
}

impl Type {
    /// The boundary this type aligns to before being read or written.
    pub fn alignment(&self) -> usize {
        match self {
            Type::Fixed(fixed) => fixed.size(),
            Type::Str(str) => str.length_size(),
            Type::Struct(..) | Type::DictEntry(..) => 8,
            Type::Array(..) => 4,
            Type::Variant => 1,
        }
    }

    /// Test if the type is basic, which is required for dict keys.
    pub fn is_basic(&self) -> bool {
        matches!(self, Type::Fixed(..) | Type::Str(..))
    }

    /// The size of the type if it has a statically known size.
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            Type::Fixed(fixed) => Some(fixed.size()),
            _ => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Fixed(fixed) => write!(f, "{}", fixed.code() as char),
            Type::Str(str) => write!(f, "{}", str.code() as char),
            Type::Struct(fields) => {
                f.write_str("(")?;

                for field in fields.iter() {
                    field.fmt(f)?;
                }

                f.write_str(")")
            }
            Type::Array(element) => write!(f, "a{element}"),
            Type::DictEntry(entry) => write!(f, "{{{}{}}}", entry.0, entry.1),
            Type::Variant => f.write_str("v"),
        }
    }
}
