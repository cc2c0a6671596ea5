use crate::value::Value;

use super::Message;

/// A typed description of a method call.
///
/// Besides the message itself this carries the signature the reply is
/// expected to have, which is checked when the reply arrives.
///
/// # Examples
///
/// ```
/// use dbus_wire::{MethodCall, Value};
///
/// let call = MethodCall::new(
///     "org.freedesktop.secrets",
///     "/org/freedesktop/secrets",
///     "org.freedesktop.Secret.Service",
///     "OpenSession",
/// )
/// .with_args("sv", vec![Value::from("plain"), Value::variant("s", Value::from(""))])
/// .with_reply_signature("vo");
///
/// assert_eq!(call.reply_signature(), Some("vo"));
///
/// let (message, reply_signature) = call.into_parts();
/// assert_eq!(message.member(), Some("OpenSession"));
/// assert_eq!(message.signature(), "sv");
/// assert_eq!(reply_signature.as_deref(), Some("vo"));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCall {
    message: Message,
    reply_signature: Option<Box<str>>,
}

impl MethodCall {
    /// Construct a call to `interface.member` on the object at `path` owned
    /// by `destination`.
    pub fn new(destination: &str, path: &str, interface: &str, member: &str) -> Self {
        let message = Message::method_call(path, member)
            .with_interface(interface)
            .with_destination(destination);

        Self {
            message,
            reply_signature: None,
        }
    }

    /// Set the arguments of the call.
    pub fn with_args(mut self, signature: &str, args: Vec<Value>) -> Self {
        self.message = self.message.with_body(signature, args);
        self
    }

    /// Set the signature the reply body must have.
    pub fn with_reply_signature(mut self, signature: &str) -> Self {
        self.reply_signature = Some(signature.into());
        self
    }

    /// The expected reply signature, if any.
    pub fn reply_signature(&self) -> Option<&str> {
        self.reply_signature.as_deref()
    }

    /// Access the message being built.
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Split into the message and the expected reply signature.
    pub fn into_parts(self) -> (Message, Option<Box<str>>) {
        (self.message, self.reply_signature)
    }
}

impl From<MethodCall> for Message {
    #[inline]
    fn from(call: MethodCall) -> Self {
        call.message
    }
}

impl From<Message> for MethodCall {
    /// Wrap a message without placing any expectation on the reply.
    #[inline]
    fn from(message: Message) -> Self {
        Self {
            message,
            reply_signature: None,
        }
    }
}
