//! Unmarshalling of [`Value`]s according to a [`Type`].

use std::str::from_utf8;

use crate::buf::{ReadBuf, MAX_ARRAY_LENGTH};
use crate::error::{Error, ErrorKind, Result};
use crate::object_path;
use crate::protocol::Endianness;
use crate::signature;
use crate::ty::{Fixed, Str, Type};
use crate::value::{Value, Variant};

/// The maximum number of variants nested inside of each other.
const MAX_VARIANT_DEPTH: usize = 64;

/// Parse a value of type `ty` from `bytes` starting at offset `pos`.
///
/// Returns the value and the offset immediately after it.
///
/// # Examples
///
/// ```
/// use dbus_wire::{de, Endianness, Signature, Value};
///
/// let ty = Signature::parse_single("u")?;
/// let (value, pos) = de::parse(&ty, &[0x96, 0, 0, 0], 0, Endianness::LITTLE)?;
/// assert_eq!(value, Value::UInt32(150));
/// assert_eq!(pos, 4);
/// # Ok::<_, dbus_wire::Error>(())
/// ```
pub fn parse(ty: &Type, bytes: &[u8], pos: usize, endianness: Endianness) -> Result<(Value, usize)> {
    let mut buf = ReadBuf::with_position(bytes, pos, endianness);
    let value = read(&mut buf, ty)?;
    Ok((value, buf.position()))
}

/// Read a value of type `ty` from `buf`.
pub fn read(buf: &mut ReadBuf<'_>, ty: &Type) -> Result<Value> {
    read_value(buf, ty, 0)
}

/// Read the values of a message body.
pub(crate) fn read_body(buf: &mut ReadBuf<'_>, types: &[Type]) -> Result<Vec<Value>> {
    let mut values = Vec::with_capacity(types.len());

    for ty in types {
        values.push(read(buf, ty)?);
    }

    Ok(values)
}

fn read_value(buf: &mut ReadBuf<'_>, ty: &Type, variants: usize) -> Result<Value> {
    let value = match ty {
        Type::Fixed(fixed) => read_fixed(buf, *fixed)?,
        Type::Str(str) => {
            let string = load_str(buf, *str)?;

            match str {
                Str::String => Value::String(string.to_owned()),
                Str::ObjectPath => {
                    if !object_path::is_valid(string) {
                        return Err(Error::new(ErrorKind::CorruptObjectPath(string.into())));
                    }

                    Value::ObjectPath(string.to_owned())
                }
                Str::Signature => {
                    signature::parse_all(string)?;
                    Value::Signature(string.to_owned())
                }
            }
        }
        Type::Struct(fields) => {
            buf.align(8)?;
            let mut values = Vec::with_capacity(fields.len());

            for field in fields.iter() {
                values.push(read_value(buf, field, variants)?);
            }

            Value::Struct(values)
        }
        Type::DictEntry(entry) => {
            buf.align(8)?;
            let key = read_value(buf, &entry.0, variants)?;
            let value = read_value(buf, &entry.1, variants)?;
            Value::Struct(vec![key, value])
        }
        Type::Array(element) => read_array(buf, element, variants)?,
        Type::Variant => {
            if variants >= MAX_VARIANT_DEPTH {
                return Err(Error::new(ErrorKind::VariantTooDeep));
            }

            Value::Variant(Box::new(read_variant_at(buf, variants + 1)?))
        }
    };

    Ok(value)
}

/// Read a variant.
pub(crate) fn read_variant(buf: &mut ReadBuf<'_>) -> Result<Variant> {
    read_variant_at(buf, 1)
}

fn read_variant_at(buf: &mut ReadBuf<'_>, variants: usize) -> Result<Variant> {
    let signature = load_str(buf, Str::Signature)?;
    let ty = signature::parse_single(signature)?;
    let value = read_value(buf, &ty, variants)?;
    Ok(Variant::new(signature, value))
}

fn read_fixed(buf: &mut ReadBuf<'_>, fixed: Fixed) -> Result<Value> {
    let value = match fixed {
        Fixed::Byte => Value::Byte(buf.load()?),
        Fixed::Boolean => match buf.load::<u32>()? {
            0 => Value::Boolean(false),
            1 => Value::Boolean(true),
            n => return Err(Error::new(ErrorKind::InvalidBoolean(n))),
        },
        Fixed::Int16 => Value::Int16(buf.load()?),
        Fixed::UInt16 => Value::UInt16(buf.load()?),
        Fixed::Int32 => Value::Int32(buf.load()?),
        Fixed::UInt32 => Value::UInt32(buf.load()?),
        Fixed::Int64 => Value::Int64(buf.load()?),
        Fixed::UInt64 => Value::UInt64(buf.load()?),
        Fixed::Double => Value::Double(buf.load()?),
        Fixed::UnixFd => Value::UnixFd(buf.load()?),
    };

    Ok(value)
}

/// Load a length-prefixed string.
fn load_str<'de>(buf: &mut ReadBuf<'de>, str: Str) -> Result<&'de str> {
    let len = match str {
        Str::Signature => buf.load::<u8>()? as usize,
        Str::String | Str::ObjectPath => buf.load::<u32>()? as usize,
    };

    let bytes = buf.load_slice_nul(len)?;
    Ok(from_utf8(bytes)?)
}

fn read_array(buf: &mut ReadBuf<'_>, element: &Type, variants: usize) -> Result<Value> {
    let len = buf.load::<u32>()? as usize;

    if len > MAX_ARRAY_LENGTH {
        return Err(Error::new(ErrorKind::ArrayTooLong(len)));
    }

    // Padding to the element is present even if the array is empty.
    buf.align(element.alignment())?;

    let end = buf.position() + len;
    let mut array = buf.limit(end)?;

    let value = match element {
        Type::Fixed(Fixed::Byte) => Value::Bytes(array.load_bytes(len)?.to_vec()),
        element => {
            let mut values = Vec::new();

            while array.position() < end {
                values.push(read_value(&mut array, element, variants)?);
            }

            Value::Array(values)
        }
    };

    if array.position() != end {
        return Err(Error::new(ErrorKind::ArrayLengthMismatch));
    }

    buf.set_position(end);
    Ok(value)
}
