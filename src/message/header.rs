use std::collections::BTreeMap;

use crate::error::{Error, ErrorKind, Result};
use crate::protocol::{Endianness, Flags, HeaderField, MessageType, PROTOCOL_VERSION};
use crate::value::Value;

/// The header of a message.
///
/// Header fields are stored by code, which keeps them sorted the way they are
/// written.
#[derive(Debug, Clone, PartialEq)]
pub struct Header {
    /// The endianness of the message.
    pub endianness: Endianness,
    /// The type of the message.
    pub message_type: MessageType,
    /// Message flags.
    pub flags: Flags,
    /// The protocol version.
    pub version: u8,
    /// The length of the body as last read or written. It is recomputed every
    /// time the message is serialized.
    pub body_length: u32,
    /// The serial of the message, zero until one has been assigned.
    pub serial: u32,
    /// Header fields.
    pub fields: BTreeMap<HeaderField, Value>,
}

impl Header {
    /// Construct a new header of the given type with no fields.
    pub fn new(message_type: MessageType) -> Self {
        Self {
            endianness: Endianness::NATIVE,
            message_type,
            flags: Flags::EMPTY,
            version: PROTOCOL_VERSION,
            body_length: 0,
            serial: 0,
            fields: BTreeMap::new(),
        }
    }

    /// Get the value of a header field.
    pub fn field(&self, field: HeaderField) -> Option<&Value> {
        self.fields.get(&field)
    }

    fn str_field(&self, field: HeaderField) -> Option<&str> {
        self.field(field)?.as_str()
    }

    /// The object path of a call or signal.
    pub fn path(&self) -> Option<&str> {
        self.str_field(HeaderField::PATH)
    }

    /// The interface of a call or signal.
    pub fn interface(&self) -> Option<&str> {
        self.str_field(HeaderField::INTERFACE)
    }

    /// The member of a call or signal.
    pub fn member(&self) -> Option<&str> {
        self.str_field(HeaderField::MEMBER)
    }

    /// The name of an error.
    pub fn error_name(&self) -> Option<&str> {
        self.str_field(HeaderField::ERROR_NAME)
    }

    /// The serial this message replies to.
    pub fn reply_serial(&self) -> Option<u32> {
        self.field(HeaderField::REPLY_SERIAL)?.as_u32()
    }

    /// The destination of the message.
    pub fn destination(&self) -> Option<&str> {
        self.str_field(HeaderField::DESTINATION)
    }

    /// The sender of the message.
    pub fn sender(&self) -> Option<&str> {
        self.str_field(HeaderField::SENDER)
    }

    /// The signature of the body, empty if the field is absent.
    pub fn signature(&self) -> &str {
        self.str_field(HeaderField::SIGNATURE).unwrap_or_default()
    }

    /// The number of unix file descriptors accompanying the message.
    pub fn unix_fds(&self) -> Option<u32> {
        self.field(HeaderField::UNIX_FDS)?.as_u32()
    }

    /// Check that the fields required by the message type are present.
    pub(crate) fn validate(&self) -> Result<()> {
        if self.serial == 0 {
            return Err(Error::new(ErrorKind::ZeroSerial));
        }

        let missing = |field: HeaderField| !self.fields.contains_key(&field);

        let kind = match self.message_type {
            MessageType::METHOD_CALL | MessageType::SIGNAL if missing(HeaderField::PATH) => {
                ErrorKind::MissingPath
            }
            MessageType::SIGNAL if missing(HeaderField::INTERFACE) => ErrorKind::MissingInterface,
            MessageType::METHOD_CALL | MessageType::SIGNAL if missing(HeaderField::MEMBER) => {
                ErrorKind::MissingMember
            }
            MessageType::ERROR if missing(HeaderField::ERROR_NAME) => ErrorKind::MissingErrorName,
            MessageType::ERROR | MessageType::METHOD_RETURN
                if missing(HeaderField::REPLY_SERIAL) =>
            {
                ErrorKind::MissingReplySerial
            }
            _ if self.reply_serial() == Some(0) => ErrorKind::ZeroReplySerial,
            _ => return Ok(()),
        };

        Err(Error::new(kind))
    }
}
