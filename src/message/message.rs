use crate::buf::{OwnedBuf, ReadBuf, MAX_ARRAY_LENGTH, MAX_BODY_LENGTH};
use crate::de;
use crate::error::{Error, ErrorKind, Result};
use crate::protocol::{Endianness, Flags, HeaderField, MessageType};
use crate::ser;
use crate::signature::{self, SignatureCache};
use crate::ty::{Fixed, Type};
use crate::value::{Value, Variant};

use super::Header;

/// A D-Bus message: a header and a body of values matching the signature
/// header field.
///
/// # Examples
///
/// ```
/// use dbus_wire::{Message, MessageType, Value};
///
/// let m = Message::method_call("/org/freedesktop/DBus", "GetNameOwner")
///     .with_interface("org.freedesktop.DBus")
///     .with_destination("org.freedesktop.DBus")
///     .with_body("s", vec![Value::from("org.freedesktop.secrets")])
///     .with_serial(1);
///
/// let bytes = m.serialize()?;
/// let m2 = Message::from_buffer(&bytes)?;
///
/// assert_eq!(m2.message_type(), MessageType::METHOD_CALL);
/// assert_eq!(m2.member(), Some("GetNameOwner"));
/// assert_eq!(m2.body(), m.body());
/// # Ok::<_, dbus_wire::Error>(())
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    /// The message header.
    pub header: Header,
    /// The body of the message.
    pub body: Vec<Value>,
}

impl Message {
    /// Construct a message from its parts.
    pub fn new(header: Header, body: Vec<Value>) -> Self {
        Self { header, body }
    }

    /// Construct a method call.
    pub fn method_call(path: &str, member: &str) -> Self {
        let mut header = Header::new(MessageType::METHOD_CALL);
        header
            .fields
            .insert(HeaderField::PATH, Value::object_path(path));
        header
            .fields
            .insert(HeaderField::MEMBER, Value::from(member));
        Self::new(header, Vec::new())
    }

    /// Construct a signal.
    pub fn signal(path: &str, interface: &str, member: &str) -> Self {
        let mut header = Header::new(MessageType::SIGNAL);
        header
            .fields
            .insert(HeaderField::PATH, Value::object_path(path));
        header
            .fields
            .insert(HeaderField::INTERFACE, Value::from(interface));
        header
            .fields
            .insert(HeaderField::MEMBER, Value::from(member));
        Self::new(header, Vec::new())
    }

    /// Construct an empty method return replying to this message.
    ///
    /// The destination of the reply is the sender of this message.
    pub fn method_return(&self) -> Self {
        self.reply(Header::new(MessageType::METHOD_RETURN))
    }

    /// Construct an empty error replying to this message.
    pub fn error(&self, error_name: &str) -> Self {
        let mut header = Header::new(MessageType::ERROR);
        header
            .fields
            .insert(HeaderField::ERROR_NAME, Value::from(error_name));
        self.reply(header)
    }

    fn reply(&self, mut header: Header) -> Self {
        header.endianness = self.header.endianness;
        header
            .fields
            .insert(HeaderField::REPLY_SERIAL, Value::UInt32(self.header.serial));

        if let Some(sender) = self.sender() {
            header
                .fields
                .insert(HeaderField::DESTINATION, Value::from(sender));
        }

        Self::new(header, Vec::new())
    }

    fn with_field(mut self, field: HeaderField, value: Value) -> Self {
        self.header.fields.insert(field, value);
        self
    }

    /// Modify the interface of the message.
    pub fn with_interface(self, interface: &str) -> Self {
        self.with_field(HeaderField::INTERFACE, Value::from(interface))
    }

    /// Modify the destination of the message.
    pub fn with_destination(self, destination: &str) -> Self {
        self.with_field(HeaderField::DESTINATION, Value::from(destination))
    }

    /// Modify the sender of the message.
    pub fn with_sender(self, sender: &str) -> Self {
        self.with_field(HeaderField::SENDER, Value::from(sender))
    }

    /// Modify the flags of the message.
    pub fn with_flags(mut self, flags: Flags) -> Self {
        self.header.flags = flags;
        self
    }

    /// Modify the serial of the message.
    pub fn with_serial(mut self, serial: u32) -> Self {
        self.header.serial = serial;
        self
    }

    /// Modify the endianness the message is written with.
    pub fn with_endianness(mut self, endianness: Endianness) -> Self {
        self.header.endianness = endianness;
        self
    }

    /// Set the body of the message together with its signature.
    ///
    /// The body is checked against the signature when the message is
    /// serialized.
    pub fn with_body(mut self, signature: &str, body: Vec<Value>) -> Self {
        if signature.is_empty() {
            self.header.fields.remove(&HeaderField::SIGNATURE);
        } else {
            self.header
                .fields
                .insert(HeaderField::SIGNATURE, Value::signature(signature));
        }

        self.body = body;
        self
    }

    /// The type of the message.
    pub fn message_type(&self) -> MessageType {
        self.header.message_type
    }

    /// The serial of the message.
    pub fn serial(&self) -> u32 {
        self.header.serial
    }

    /// The flags of the message.
    pub fn flags(&self) -> Flags {
        self.header.flags
    }

    /// The serial this message is a reply to.
    pub fn reply_serial(&self) -> Option<u32> {
        self.header.reply_serial()
    }

    /// The object path of the message.
    pub fn path(&self) -> Option<&str> {
        self.header.path()
    }

    /// The interface of the message.
    pub fn interface(&self) -> Option<&str> {
        self.header.interface()
    }

    /// The member of the message.
    pub fn member(&self) -> Option<&str> {
        self.header.member()
    }

    /// The error name of the message.
    pub fn error_name(&self) -> Option<&str> {
        self.header.error_name()
    }

    /// The destination of the message.
    pub fn destination(&self) -> Option<&str> {
        self.header.destination()
    }

    /// The sender of the message.
    pub fn sender(&self) -> Option<&str> {
        self.header.sender()
    }

    /// The signature of the body.
    pub fn signature(&self) -> &str {
        self.header.signature()
    }

    /// The body of the message.
    pub fn body(&self) -> &[Value] {
        &self.body
    }

    /// Take the body of the message.
    pub fn into_body(self) -> Vec<Value> {
        self.body
    }

    /// Serialize the message.
    ///
    /// The body length written is computed from the body, regardless of what
    /// the header currently says.
    pub fn serialize(&self) -> Result<Vec<u8>> {
        let header = &self.header;
        header.validate()?;

        let endianness = header.endianness;
        let types = signature::parse_all(header.signature())?;

        let mut body = OwnedBuf::with_endianness(endianness);
        ser::write_body(&mut body, &types, &self.body)?;

        if body.len() > MAX_BODY_LENGTH {
            return Err(Error::new(ErrorKind::BodyTooLong(body.len())));
        }

        let mut buf = OwnedBuf::with_endianness(endianness);
        buf.store(endianness.into_raw());
        buf.store(header.message_type.into_raw());
        buf.store(header.flags.bits());
        buf.store(header.version);
        buf.store(body.len() as u32);
        buf.store(header.serial);

        let fields = header
            .fields
            .iter()
            .map(|(field, value)| {
                let signature = field
                    .type_code()
                    .map(|code| char::from(code).to_string())
                    .unwrap_or_default();

                Value::Struct(vec![
                    Value::Byte(field.into_raw()),
                    Value::Variant(Box::new(Variant::new(signature, value.clone()))),
                ])
            })
            .collect::<Vec<_>>();

        ser::write(&mut buf, &fields_type(), &Value::Array(fields))?;

        let fields_length = buf.len() - super::FIXED_HEADER_LENGTH;

        if fields_length > MAX_ARRAY_LENGTH {
            return Err(Error::new(ErrorKind::HeaderFieldsTooLong(fields_length)));
        }

        buf.align_mut(8);
        buf.extend_from_slice(body.get());
        Ok(buf.into_vec())
    }

    /// Parse a complete message from the start of `bytes`.
    ///
    /// Any bytes following the message are ignored. A buffer which is too
    /// short or otherwise malformed is an error.
    pub fn from_buffer(bytes: &[u8]) -> Result<Self> {
        Self::from_buffer_cached(bytes, &mut SignatureCache::new())
    }

    /// Parse a message, looking up body signatures through `cache`.
    pub(crate) fn from_buffer_cached(bytes: &[u8], cache: &mut SignatureCache) -> Result<Self> {
        let Some(&first) = bytes.first() else {
            return Err(Error::new(ErrorKind::BufferUnderflow));
        };

        let Some(endianness) = Endianness::from_raw(first) else {
            return Err(Error::new(ErrorKind::InvalidEndianness(first)));
        };

        let mut buf = ReadBuf::with_position(bytes, 1, endianness);

        let message_type = buf.load::<u8>()?;

        let Some(message_type) = MessageType::from_raw(message_type) else {
            return Err(Error::new(ErrorKind::InvalidMessageType(message_type)));
        };

        let flags = Flags::from_bits(buf.load::<u8>()?);
        let version = buf.load::<u8>()?;
        let body_length = buf.load::<u32>()?;
        let serial = buf.load::<u32>()?;

        let mut header = Header {
            endianness,
            message_type,
            flags,
            version,
            body_length,
            serial,
            ..Header::new(message_type)
        };

        let fields_length = buf.load::<u32>()? as usize;

        if fields_length > MAX_ARRAY_LENGTH {
            return Err(Error::new(ErrorKind::HeaderFieldsTooLong(fields_length)));
        }

        buf.align(8)?;
        let fields_end = buf.position() + fields_length;
        let mut fields = buf.limit(fields_end)?;

        while fields.position() < fields_end {
            fields.align(8)?;
            let code = fields.load::<u8>()?;
            let variant = de::read_variant(&mut fields)?;

            // Unknown header fields must be ignored.
            let Some(field) = HeaderField::from_raw(code) else {
                continue;
            };

            let signature = variant.signature.as_bytes();

            if !matches!(field.type_code(), Some(code) if signature == [code]) {
                return Err(Error::new(ErrorKind::InvalidHeaderField(code)));
            }

            header.fields.insert(field, variant.value);
        }

        if fields.position() != fields_end {
            return Err(Error::new(ErrorKind::ArrayLengthMismatch));
        }

        buf.set_position(fields_end);
        header.validate()?;

        let body_length = body_length as usize;

        if body_length > MAX_BODY_LENGTH {
            return Err(Error::new(ErrorKind::BodyTooLong(body_length)));
        }

        buf.align(8)?;
        let body_start = buf.position();
        let body_end = body_start + body_length;
        let mut body = buf.limit(body_end)?;

        let types = cache.get(header.signature())?;
        let values = de::read_body(&mut body, &types)?;

        if body.position() != body_end {
            return Err(Error::new(ErrorKind::BodyLengthMismatch {
                declared: body_length,
                actual: body.position() - body_start,
            }));
        }

        Ok(Self::new(header, values))
    }
}

/// The type of the header fields array, `a(yv)`.
fn fields_type() -> Type {
    Type::Array(Box::new(Type::Struct(Box::from([
        Type::Fixed(Fixed::Byte),
        Type::Variant,
    ]))))
}
