//! Marshalling of [`Value`]s according to a [`Type`].

use crate::buf::{OwnedBuf, MAX_ARRAY_LENGTH, MAX_BODY_LENGTH};
use crate::error::{Error, ErrorKind, Result};
use crate::object_path;
use crate::protocol::Endianness;
use crate::signature;
use crate::ty::{Fixed, Str, Type};
use crate::value::{cmp_keys, Value, Variant};

/// Serialize `value` as `ty`, as if it was written at offset `pos` of a larger
/// buffer.
///
/// The returned bytes start at `pos` and so include any padding needed to
/// align the value from there.
///
/// # Examples
///
/// ```
/// use dbus_wire::{ser, Endianness, Signature, Value};
///
/// let ty = Signature::parse_single("u")?;
/// let bytes = ser::serialize(&ty, &Value::UInt32(150), 0, Endianness::LITTLE)?;
/// assert_eq!(bytes, [0x96, 0, 0, 0]);
///
/// let ty = Signature::parse_single("s")?;
/// let bytes = ser::serialize(&ty, &Value::from("hi"), 1, Endianness::LITTLE)?;
/// assert_eq!(bytes, b"\0\0\0\x02\0\0\0hi\0");
/// # Ok::<_, dbus_wire::Error>(())
/// ```
pub fn serialize(ty: &Type, value: &Value, pos: usize, endianness: Endianness) -> Result<Vec<u8>> {
    let mut buf = OwnedBuf::with_base(endianness, pos);
    write(&mut buf, ty, value)?;
    Ok(buf.into_vec())
}

/// Write `value` as `ty` to the end of `buf`.
///
/// On error the buffer may contain a partially written value and should be
/// discarded.
pub fn write(buf: &mut OwnedBuf, ty: &Type, value: &Value) -> Result<()> {
    match (ty, value) {
        (Type::Fixed(fixed), value) => write_fixed(buf, *fixed, value),
        (Type::Str(str), value) => write_str(buf, *str, value),
        (Type::Struct(fields), Value::Struct(values)) => write_struct(buf, fields, values),
        (Type::DictEntry(entry), Value::Struct(values)) => {
            let [key, value] = &values[..] else {
                return Err(Error::new(ErrorKind::ArityMismatch {
                    expected: 2,
                    actual: values.len(),
                }));
            };

            write_dict_entry(buf, entry, key, value)
        }
        (Type::Array(element), value) => write_array(buf, element, value),
        (Type::Variant, Value::Variant(variant)) => write_variant(buf, variant),
        (ty, value) => Err(mismatch(ty, value)),
    }
}

/// Write the values of a message body, which is an implicit struct without
/// the struct alignment.
pub(crate) fn write_body(buf: &mut OwnedBuf, types: &[Type], values: &[Value]) -> Result<()> {
    if types.len() != values.len() {
        return Err(Error::new(ErrorKind::ArityMismatch {
            expected: types.len(),
            actual: values.len(),
        }));
    }

    for (ty, value) in types.iter().zip(values) {
        write(buf, ty, value)?;
    }

    Ok(())
}

fn mismatch(ty: &Type, value: &Value) -> Error {
    Error::new(ErrorKind::TypeMismatch {
        expected: ty.to_string().into(),
        actual: value.describe(),
    })
}

fn write_fixed(buf: &mut OwnedBuf, fixed: Fixed, value: &Value) -> Result<()> {
    match (fixed, value) {
        (Fixed::Byte, Value::Byte(value)) => buf.store(*value),
        (Fixed::Boolean, Value::Boolean(value)) => buf.store(u32::from(*value)),
        (Fixed::Int16, Value::Int16(value)) => buf.store(*value),
        (Fixed::UInt16, Value::UInt16(value)) => buf.store(*value),
        (Fixed::Int32, Value::Int32(value)) => buf.store(*value),
        (Fixed::UInt32, Value::UInt32(value)) => buf.store(*value),
        (Fixed::Int64, Value::Int64(value)) => buf.store(*value),
        (Fixed::UInt64, Value::UInt64(value)) => buf.store(*value),
        (Fixed::Double, Value::Double(value)) => buf.store(*value),
        (Fixed::UnixFd, Value::UnixFd(value)) => buf.store(*value),
        (fixed, value) => return Err(mismatch(&Type::Fixed(fixed), value)),
    }

    Ok(())
}

fn write_str(buf: &mut OwnedBuf, str: Str, value: &Value) -> Result<()> {
    // Plain strings are accepted for paths and signatures, but validated.
    let string = match (str, value) {
        (Str::String, Value::String(string)) => string,
        (Str::ObjectPath, Value::ObjectPath(string) | Value::String(string)) => {
            object_path::check(string)?;
            string
        }
        (Str::Signature, Value::Signature(string) | Value::String(string)) => {
            signature::parse_all(string)?;
            string
        }
        (str, value) => return Err(mismatch(&Type::Str(str), value)),
    };

    store_str(buf, str, string)
}

fn store_str(buf: &mut OwnedBuf, str: Str, string: &str) -> Result<()> {
    let bytes = string.as_bytes();

    if bytes.contains(&0) {
        return Err(Error::new(ErrorKind::NulInString));
    }

    match str {
        Str::Signature => {
            let Ok(len) = u8::try_from(bytes.len()) else {
                return Err(Error::from(signature::SignatureError::SignatureTooLong));
            };

            buf.store(len);
        }
        Str::String | Str::ObjectPath => {
            if bytes.len() > MAX_BODY_LENGTH {
                return Err(Error::new(ErrorKind::StringTooLong(bytes.len())));
            }

            buf.store(bytes.len() as u32);
        }
    }

    buf.extend_from_slice_nul(bytes);
    Ok(())
}

fn write_struct(buf: &mut OwnedBuf, fields: &[Type], values: &[Value]) -> Result<()> {
    if fields.len() != values.len() {
        return Err(Error::new(ErrorKind::ArityMismatch {
            expected: fields.len(),
            actual: values.len(),
        }));
    }

    buf.align_mut(8);

    for (field, value) in fields.iter().zip(values) {
        write(buf, field, value)?;
    }

    Ok(())
}

fn write_dict_entry(
    buf: &mut OwnedBuf,
    entry: &(Type, Type),
    key: &Value,
    value: &Value,
) -> Result<()> {
    buf.align_mut(8);
    write(buf, &entry.0, key)?;
    write(buf, &entry.1, value)?;
    Ok(())
}

fn write_array(buf: &mut OwnedBuf, element: &Type, value: &Value) -> Result<()> {
    // Payloads whose size is known up front are rejected before anything is
    // written.
    let known = match (element, value) {
        (Type::Fixed(Fixed::Byte), Value::Bytes(bytes)) => Some(bytes.len()),
        (element, Value::Array(values)) => element
            .fixed_size()
            .map(|size| values.len().saturating_mul(size)),
        _ => None,
    };

    if let Some(len) = known {
        if len > MAX_ARRAY_LENGTH {
            return Err(Error::new(ErrorKind::ArrayTooLong(len)));
        }
    }

    let len = buf.alloc::<u32>();
    buf.align_mut(element.alignment());
    let start = buf.len();

    match (element, value) {
        (Type::Fixed(Fixed::Byte), Value::Bytes(bytes)) => {
            buf.extend_from_slice(bytes);
        }
        (Type::DictEntry(entry), Value::Dict(pairs)) => {
            let mut pairs = pairs.iter().collect::<Vec<_>>();
            pairs.sort_by(|a, b| cmp_keys(&a.0, &b.0));

            for (key, value) in pairs {
                write_dict_entry(buf, entry, key, value)?;
                check_array_length(buf.len() - start)?;
            }
        }
        (element, Value::Array(values)) => {
            for value in values {
                write(buf, element, value)?;
                check_array_length(buf.len() - start)?;
            }
        }
        (element, value) => {
            return Err(mismatch(&Type::Array(Box::new(element.clone())), value));
        }
    }

    let written = buf.len() - start;
    buf.store_at(len, written as u32);
    Ok(())
}

#[inline]
fn check_array_length(len: usize) -> Result<()> {
    if len > MAX_ARRAY_LENGTH {
        return Err(Error::new(ErrorKind::ArrayTooLong(len)));
    }

    Ok(())
}

fn write_variant(buf: &mut OwnedBuf, variant: &Variant) -> Result<()> {
    let ty = signature::parse_single(&variant.signature)?;
    store_str(buf, Str::Signature, &variant.signature)?;
    write(buf, &ty, &variant.value)
}
