//! Native values which are marshalled according to a [`Type`].
//!
//! [`Type`]: crate::Type

use std::cmp::Ordering;

/// A dynamically typed D-Bus value.
///
/// Which variants are accepted for a given [`Type`] is decided when the value
/// is marshalled:
///
/// * Arrays accept [`Value::Array`]. Arrays of bytes additionally accept
///   [`Value::Bytes`], and arrays of dict entries accept [`Value::Dict`] which
///   is written in sorted key order.
/// * Dict entries accept a two-field [`Value::Struct`].
///
/// Unmarshalling produces [`Value::Bytes`] for arrays of bytes, and a
/// [`Value::Array`] of two-field [`Value::Struct`] pairs for arrays of dict
/// entries.
///
/// [`Type`]: crate::Type
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// `y`
    Byte(u8),
    /// `b`
    Boolean(bool),
    /// `n`
    Int16(i16),
    /// `q`
    UInt16(u16),
    /// `i`
    Int32(i32),
    /// `u`
    UInt32(u32),
    /// `x`
    Int64(i64),
    /// `t`
    UInt64(u64),
    /// `d`
    Double(f64),
    /// `h`
    UnixFd(u32),
    /// `s`
    String(String),
    /// `o`
    ObjectPath(String),
    /// `g`
    Signature(String),
    /// A struct or dict entry.
    Struct(Vec<Value>),
    /// An array.
    Array(Vec<Value>),
    /// An array of bytes.
    Bytes(Vec<u8>),
    /// An array of dict entries given as key-value pairs.
    Dict(Vec<(Value, Value)>),
    /// A variant.
    Variant(Box<Variant>),
}

/// A value together with the signature describing it.
#[derive(Debug, Clone, PartialEq)]
pub struct Variant {
    /// The signature of the value, a single complete type.
    pub signature: String,
    /// The contained value.
    pub value: Value,
}

impl Variant {
    /// Construct a new variant.
    pub fn new(signature: impl Into<String>, value: Value) -> Self {
        Self {
            signature: signature.into(),
            value,
        }
    }
}

impl Value {
    /// Construct a variant value.
    ///
    /// # Examples
    ///
    /// ```
    /// use dbus_wire::Value;
    ///
    /// let value = Value::variant("s", Value::from("abc"));
    /// assert!(matches!(value, Value::Variant(..)));
    /// ```
    pub fn variant(signature: impl Into<String>, value: Value) -> Self {
        Value::Variant(Box::new(Variant::new(signature, value)))
    }

    /// Construct an object path value.
    pub fn object_path(path: impl Into<String>) -> Self {
        Value::ObjectPath(path.into())
    }

    /// Construct a signature value.
    pub fn signature(signature: impl Into<String>) -> Self {
        Value::Signature(signature.into())
    }

    /// A short description of the kind of value, used in errors.
    pub(crate) fn describe(&self) -> &'static str {
        match self {
            Value::Byte(..) => "byte",
            Value::Boolean(..) => "boolean",
            Value::Int16(..) => "int16",
            Value::UInt16(..) => "uint16",
            Value::Int32(..) => "int32",
            Value::UInt32(..) => "uint32",
            Value::Int64(..) => "int64",
            Value::UInt64(..) => "uint64",
            Value::Double(..) => "double",
            Value::UnixFd(..) => "unix fd",
            Value::String(..) => "string",
            Value::ObjectPath(..) => "object path",
            Value::Signature(..) => "signature",
            Value::Struct(..) => "struct",
            Value::Array(..) => "array",
            Value::Bytes(..) => "bytes",
            Value::Dict(..) => "dict",
            Value::Variant(..) => "variant",
        }
    }

    /// Access a string-like value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(string) | Value::ObjectPath(string) | Value::Signature(string) => {
                Some(string)
            }
            _ => None,
        }
    }

    /// Access a `u32` value.
    pub fn as_u32(&self) -> Option<u32> {
        match *self {
            Value::UInt32(value) => Some(value),
            _ => None,
        }
    }

    /// Access an `i32` value.
    pub fn as_i32(&self) -> Option<i32> {
        match *self {
            Value::Int32(value) => Some(value),
            _ => None,
        }
    }

    /// Access a `u64` value.
    pub fn as_u64(&self) -> Option<u64> {
        match *self {
            Value::UInt64(value) => Some(value),
            _ => None,
        }
    }

    /// Access a boolean value.
    pub fn as_bool(&self) -> Option<bool> {
        match *self {
            Value::Boolean(value) => Some(value),
            _ => None,
        }
    }

    /// Access the raw bytes of an array of bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Access the elements of an array or the fields of a struct.
    pub fn as_slice(&self) -> Option<&[Value]> {
        match self {
            Value::Array(values) | Value::Struct(values) => Some(values),
            _ => None,
        }
    }

    /// Access the contents of a variant.
    pub fn as_variant(&self) -> Option<&Variant> {
        match self {
            Value::Variant(variant) => Some(variant),
            _ => None,
        }
    }
}

/// Order dict keys, which are always basic values.
///
/// Keys of differing kinds never appear in a well-typed dict, they are ordered
/// by kind only to keep the order total.
pub(crate) fn cmp_keys(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Byte(a), Value::Byte(b)) => a.cmp(b),
        (Value::Boolean(a), Value::Boolean(b)) => a.cmp(b),
        (Value::Int16(a), Value::Int16(b)) => a.cmp(b),
        (Value::UInt16(a), Value::UInt16(b)) => a.cmp(b),
        (Value::Int32(a), Value::Int32(b)) => a.cmp(b),
        (Value::UInt32(a), Value::UInt32(b)) => a.cmp(b),
        (Value::Int64(a), Value::Int64(b)) => a.cmp(b),
        (Value::UInt64(a), Value::UInt64(b)) => a.cmp(b),
        (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
        (Value::UnixFd(a), Value::UnixFd(b)) => a.cmp(b),
        (Value::String(a), Value::String(b))
        | (Value::ObjectPath(a), Value::ObjectPath(b))
        | (Value::Signature(a), Value::Signature(b)) => a.cmp(b),
        (a, b) => a.describe().cmp(b.describe()),
    }
}

macro_rules! from_primitive {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                #[inline]
                fn from(value: $ty) -> Self {
                    Value::$variant(value)
                }
            }
        )*
    }
}

from_primitive! {
    u8 => Byte,
    bool => Boolean,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f64 => Double,
    String => String,
    Vec<u8> => Bytes,
}

impl From<&str> for Value {
    #[inline]
    fn from(value: &str) -> Self {
        Value::String(value.to_owned())
    }
}

impl From<&[u8]> for Value {
    #[inline]
    fn from(value: &[u8]) -> Self {
        Value::Bytes(value.to_vec())
    }
}

impl From<Variant> for Value {
    #[inline]
    fn from(value: Variant) -> Self {
        Value::Variant(Box::new(value))
    }
}
