//! A connection driven by blocking reads and writes on the calling thread.

use std::collections::VecDeque;
use std::os::unix::net::UnixStream;
use std::time::Duration;

use crate::address::BusAddress;
use crate::error::{Error, ErrorKind, Result};
use crate::message::{Message, MethodCall};
use crate::org_freedesktop_dbus::{self, NameFlag, NameReply};
use crate::parser::Parser;
use crate::router::{Router, Slot};
use crate::sasl::{Auth, Guid};
use crate::transport::{self, RECV_CHUNK};

/// A blocking D-Bus connection.
///
/// Every operation runs on the calling thread. Method calls are sent with
/// [`BlockingConnection::send_and_wait`], which reads from the socket until
/// the reply arrives. Signals and method calls received in the meantime are
/// queued and can be taken with [`BlockingConnection::recv_message`].
///
/// # Examples
///
/// ```no_run
/// use dbus_wire::{BlockingConnection, MethodCall};
///
/// let mut c = BlockingConnection::session_bus()?;
///
/// let call = MethodCall::new(
///     "org.freedesktop.DBus",
///     "/org/freedesktop/DBus",
///     "org.freedesktop.DBus",
///     "ListNames",
/// )
/// .with_reply_signature("as");
///
/// let reply = c.send_and_wait(call)?;
/// dbg!(reply.body());
/// # Ok::<_, dbus_wire::Error>(())
/// ```
pub struct BlockingConnection {
    stream: UnixStream,
    parser: Parser,
    router: Router<Slot>,
    queue: VecDeque<Message>,
    buf: Box<[u8]>,
    guid: Option<Guid>,
    unique_name: Option<Box<str>>,
}

impl BlockingConnection {
    /// Shorthand for connecting to the session bus using the default
    /// configuration.
    pub fn session_bus() -> Result<Self> {
        crate::ConnectionBuilder::new().session_bus().connect_blocking()
    }

    /// Shorthand for connecting to the system bus using the default
    /// configuration.
    pub fn system_bus() -> Result<Self> {
        crate::ConnectionBuilder::new().system_bus().connect_blocking()
    }

    /// Connect to the socket at `address` without authenticating.
    pub fn connect(address: &BusAddress) -> Result<Self> {
        Ok(Self::new(UnixStream::connect(address.path())?))
    }

    /// Wrap an already connected stream which has not been authenticated.
    pub fn new(stream: UnixStream) -> Self {
        Self {
            stream,
            parser: Parser::new(),
            router: Router::new(),
            queue: VecDeque::new(),
            buf: vec![0; RECV_CHUNK].into(),
            guid: None,
            unique_name: None,
        }
    }

    /// Perform the SASL handshake and switch the stream over to messages.
    ///
    /// # Errors
    ///
    /// Errors if the bus rejects the authentication, in which case the error
    /// carries the line it sent.
    ///
    /// A read timeout set with [`BlockingConnection::set_timeout`] also bounds
    /// the handshake.
    pub fn authenticate(&mut self, auth: &Auth) -> Result<&Guid> {
        let (guid, remaining) =
            transport::authenticate(&mut self.stream, auth).map_err(timed_out)?;
        self.parser = Parser::with_bytes(remaining);
        Ok(self.guid.insert(guid))
    }

    /// Send the `Hello` call and record the unique name assigned by the bus.
    pub fn hello(&mut self) -> Result<&str> {
        let reply = self.send_and_wait(org_freedesktop_dbus::hello())?;
        let name = org_freedesktop_dbus::unique_name(&reply)?;
        tracing::debug!(%name, "received unique name");
        Ok(&**self.unique_name.insert(name))
    }

    /// Request the given well-known name.
    pub fn request_name(&mut self, name: &str, flags: NameFlag) -> Result<NameReply> {
        let reply = self.send_and_wait(org_freedesktop_dbus::request_name(name, flags))?;
        org_freedesktop_dbus::name_reply(&reply)
    }

    /// Write raw bytes to the socket.
    pub fn send(&mut self, bytes: &[u8]) -> Result<()> {
        transport::send_all(&mut self.stream, bytes)
    }

    /// Assign the next serial to `message` and send it without waiting for a
    /// reply.
    ///
    /// Returns the serial assigned.
    pub fn send_message(&mut self, message: &mut Message) -> Result<u32> {
        message.header.serial = self.router.next_serial();
        self.send_serialized(message)?;
        Ok(message.header.serial)
    }

    /// Read from the socket once and return the messages which are not
    /// replies to pending calls.
    ///
    /// Replies are handed to the router. The returned list is empty if the
    /// bytes read did not complete any other message.
    ///
    /// # Errors
    ///
    /// Errors with a timeout if a read timeout is set and nothing arrived in
    /// time. Any other error closes the connection and fails every pending
    /// call.
    pub fn recv_messages(&mut self) -> Result<Vec<Message>> {
        match self.recv_messages_inner() {
            Err(e) if e.would_block() || e.is_timeout() => Err(timed_out(e)),
            Err(e) => {
                tracing::debug!(error = %e, "connection closed");
                self.router.close();
                Err(e)
            }
            Ok(messages) => Ok(messages),
        }
    }

    /// Send a method call and block until its reply arrives.
    ///
    /// # Errors
    ///
    /// An error reply from the remote end is returned as an error carrying
    /// its name and body.
    pub fn send_and_wait(&mut self, call: impl Into<MethodCall>) -> Result<Message> {
        let (mut message, reply_signature) = call.into().into_parts();
        let reply = self.router.outgoing_expecting(&mut message, reply_signature);
        let serial = message.serial();

        if let Some(result) = reply.take() {
            return result;
        }

        if let Err(e) = self.send_serialized(&message) {
            self.router.cancel(serial);
            return Err(e);
        }

        loop {
            if let Some(result) = reply.take() {
                return result;
            }

            match self.recv_messages() {
                Ok(messages) => self.queue.extend(messages),
                Err(e) => {
                    self.router.cancel(serial);
                    return Err(e);
                }
            }
        }
    }

    /// Receive the next message which is not a reply to a pending call.
    pub fn recv_message(&mut self) -> Result<Message> {
        loop {
            if let Some(message) = self.queue.pop_front() {
                return Ok(message);
            }

            let messages = self.recv_messages()?;
            self.queue.extend(messages);
        }
    }

    /// Set how long reads block before timing out, `None` blocks forever.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) -> Result<()> {
        self.stream.set_read_timeout(timeout)?;
        Ok(())
    }

    /// The GUID of the bus, once authenticated.
    pub fn guid(&self) -> Option<&Guid> {
        self.guid.as_ref()
    }

    /// The unique name assigned by the bus, once [`BlockingConnection::hello`]
    /// has completed.
    pub fn unique_name(&self) -> Option<&str> {
        self.unique_name.as_deref()
    }

    fn send_serialized(&mut self, message: &Message) -> Result<()> {
        let bytes = message.serialize()?;
        tracing::trace!(serial = message.serial(), ty = ?message.message_type(), "sending");
        transport::send_all(&mut self.stream, &bytes)
    }

    fn recv_messages_inner(&mut self) -> Result<Vec<Message>> {
        let mut messages = self.parser.drain()?;

        if messages.is_empty() {
            let bytes = transport::recv_some(&mut self.stream, &mut self.buf)?;
            messages = self.parser.feed(bytes)?;
        }

        let mut out = Vec::new();

        for message in messages {
            tracing::trace!(serial = message.serial(), ty = ?message.message_type(), "received");
            out.extend(self.router.incoming(message));
        }

        Ok(out)
    }
}

/// Expired socket read timeouts surface as would-block on unix.
fn timed_out(error: Error) -> Error {
    if error.would_block() {
        return Error::new(ErrorKind::Timeout);
    }

    error
}
