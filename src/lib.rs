//! A codec for the D-Bus wire protocol, with connection drivers for blocking,
//! single threaded and multi-threaded use.
//!
//! The codec is layered:
//!
//! * [`Signature`] parses type signatures into [`Type`] descriptors.
//! * [`ser`] and [`de`] marshal [`Value`]s according to a descriptor.
//! * [`Message`] encodes and decodes complete messages.
//! * [`Parser`] splits a byte stream into messages.
//! * [`sasl`] implements the authentication handshake which precedes them.
//! * [`Router`] correlates replies with the calls which caused them.
//!
//! The drivers combine these over a unix socket:
//!
//! * [`BlockingConnection`] performs every operation on the calling thread.
//! * [`LocalConnection`] runs its reader inside of a
//!   [`tokio::task::LocalSet`].
//! * [`Connection`] can be shared between tasks on any runtime.
//!
//! # Examples
//!
//! ```
//! use dbus_wire::{de, ser, Endianness, Signature, Value};
//!
//! let ty = Signature::parse_single("a{sv}")?;
//!
//! let value = Value::Array(vec![Value::Struct(vec![
//!     Value::from("token"),
//!     Value::variant("s", Value::from("abc")),
//! ])]);
//!
//! let bytes = ser::serialize(&ty, &value, 0, Endianness::LITTLE)?;
//! let (decoded, pos) = de::parse(&ty, &bytes, 0, Endianness::LITTLE)?;
//!
//! assert_eq!(decoded, value);
//! assert_eq!(pos, bytes.len());
//! # Ok::<_, dbus_wire::Error>(())
//! ```
//!
//! Connecting to the session bus:
//!
//! ```no_run
//! use dbus_wire::{Connection, MethodCall};
//!
//! # #[tokio::main] async fn main() -> dbus_wire::Result<()> {
//! let c = Connection::session_bus().await?;
//! println!("connected as {:?}", c.unique_name());
//!
//! let reply = c.call(MethodCall::new(
//!     "org.freedesktop.DBus",
//!     "/org/freedesktop/DBus",
//!     "org.freedesktop.DBus",
//!     "ListNames",
//! ).with_reply_signature("as")).await?;
//!
//! dbg!(reply.body());
//! # Ok(()) }
//! ```

#[doc(inline)]
pub use self::error::{Error, Result};
mod error;

#[doc(inline)]
pub use self::protocol::{Endianness, Flags, HeaderField, MessageType};
pub mod protocol;

pub use self::buf::{OwnedBuf, ReadBuf};
pub mod buf;

mod frame;

#[doc(inline)]
pub use self::signature::{parse_signature, Signature, SignatureCache, SignatureError};
mod signature;

#[doc(inline)]
pub use self::ty::{Fixed, Str, Type};
mod ty;

#[doc(inline)]
pub use self::value::{Value, Variant};
mod value;

pub mod object_path;

pub mod ser;

pub mod de;

#[doc(inline)]
pub use self::message::{calc_message_size, Header, Message, MethodCall};
pub mod message;

#[doc(inline)]
pub use self::parser::{Parser, ParserState};
mod parser;

pub mod sasl;

#[doc(inline)]
pub use self::router::Router;
pub mod router;

#[doc(inline)]
pub use self::address::BusAddress;
mod address;

mod transport;

#[doc(inline)]
pub use self::blocking::BlockingConnection;
mod blocking;

#[cfg(feature = "tokio")]
mod pending;

#[cfg(feature = "tokio")]
#[doc(inline)]
pub use self::local::LocalConnection;
#[cfg(feature = "tokio")]
mod local;

#[cfg(feature = "tokio")]
#[doc(inline)]
pub use self::connection::Connection;
#[cfg(feature = "tokio")]
mod connection;

pub use self::connection_builder::ConnectionBuilder;
mod connection_builder;

pub mod org_freedesktop_dbus;
