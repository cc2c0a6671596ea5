//! Types associated with the `org.freedesktop.DBus` interface.

use crate::error::{Error, ErrorKind, Result};
use crate::message::{Message, MethodCall};
use crate::protocol::{raw_enum, raw_set};
use crate::value::Value;

/// Well known destination name.
pub const DESTINATION: &str = "org.freedesktop.DBus";

/// Well known interface name.
pub const INTERFACE: &str = "org.freedesktop.DBus";

/// Well known D-Bus path.
pub const PATH: &str = "/org/freedesktop/DBus";

raw_set! {
    /// The flags to a `RequestName` call.
    #[repr(u32)]
    pub enum NameFlag {
        /// Allow another connection to take the name over with
        /// [`NameFlag::REPLACE_EXISTING`].
        ALLOW_REPLACEMENT = 1,
        /// Take the name over if its current owner allows replacement.
        REPLACE_EXISTING = 2,
        /// Fail instead of waiting in the queue for the name.
        DO_NOT_QUEUE = 4,
    }
}

raw_enum! {
    /// The reply to a `RequestName` call.
    #[repr(u32)]
    pub enum NameReply {
        /// The caller is now the primary owner of the name.
        PRIMARY_OWNER = 1,
        /// The name has another owner and the caller was placed in the queue.
        IN_QUEUE = 2,
        /// The name has another owner and the caller asked not to be queued.
        EXISTS = 3,
        /// The caller already owns the name.
        ALREADY_OWNER = 4,
    }
}

/// Construct the `Hello` call, which every connection sends first to get its
/// unique name.
///
/// # Examples
///
/// ```
/// use dbus_wire::org_freedesktop_dbus;
///
/// let call = org_freedesktop_dbus::hello();
/// assert_eq!(call.message().member(), Some("Hello"));
/// assert_eq!(call.message().destination(), Some("org.freedesktop.DBus"));
/// assert_eq!(call.reply_signature(), Some("s"));
/// ```
pub fn hello() -> MethodCall {
    MethodCall::new(DESTINATION, PATH, INTERFACE, "Hello").with_reply_signature("s")
}

/// Construct a `RequestName` call for the given well-known name.
pub fn request_name(name: &str, flags: NameFlag) -> MethodCall {
    MethodCall::new(DESTINATION, PATH, INTERFACE, "RequestName")
        .with_args("su", vec![Value::from(name), Value::UInt32(flags.bits())])
        .with_reply_signature("u")
}

/// Read the unique name from the reply to [`hello`].
pub(crate) fn unique_name(reply: &Message) -> Result<Box<str>> {
    match reply.body() {
        [Value::String(name)] => Ok(name.as_str().into()),
        _ => Err(Error::new(ErrorKind::UnexpectedReplySignature {
            expected: "s".into(),
            actual: reply.signature().into(),
        })),
    }
}

/// Read the [`NameReply`] from the reply to [`request_name`].
pub(crate) fn name_reply(reply: &Message) -> Result<NameReply> {
    match reply.body() {
        [Value::UInt32(value)] => Ok(NameReply(*value)),
        _ => Err(Error::new(ErrorKind::UnexpectedReplySignature {
            expected: "u".into(),
            actual: reply.signature().into(),
        })),
    }
}
