//! A connection which can be shared between tasks on a multi-threaded
//! runtime.

use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::unix::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::UnixStream;
use tokio::sync::{self, mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::address::BusAddress;
use crate::error::{Error, ErrorKind, Result};
use crate::message::{Message, MethodCall};
use crate::org_freedesktop_dbus::{self, NameFlag, NameReply};
use crate::parser::Parser;
use crate::pending::{self, Cancel, PendingReply};
use crate::router::{Completion, Router};
use crate::sasl::{Auth, Guid, SaslParser, BEGIN};
use crate::transport::{self, RECV_CHUNK};

type Reply = oneshot::Sender<Result<Message>>;

/// Lock the router, recovering it if another thread panicked while holding
/// the lock.
fn lock<C>(router: &Mutex<Router<C>>) -> MutexGuard<'_, Router<C>> {
    router.lock().unwrap_or_else(PoisonError::into_inner)
}

impl<C> Cancel for Arc<Mutex<Router<C>>>
where
    C: Completion,
{
    #[inline]
    fn cancel(&self, serial: u32) {
        lock(self).cancel(serial);
    }
}

struct Inner {
    writer: sync::Mutex<OwnedWriteHalf>,
    router: Arc<Mutex<Router<Reply>>>,
    signals: Mutex<Option<mpsc::UnboundedReceiver<Message>>>,
    guid: Guid,
    unique_name: OnceLock<Box<str>>,
    reader: JoinHandle<()>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// An asynchronous D-Bus connection.
///
/// Incoming messages are read by a task spawned on the runtime, which
/// resolves the replies of pending calls. The connection is cheap to clone
/// and calls can be made concurrently from any task.
///
/// # Examples
///
/// ```no_run
/// use dbus_wire::{Connection, MethodCall};
///
/// # #[tokio::main] async fn main() -> dbus_wire::Result<()> {
/// let c = Connection::session_bus().await?;
///
/// let call = MethodCall::new(
///     "org.freedesktop.DBus",
///     "/org/freedesktop/DBus",
///     "org.freedesktop.DBus",
///     "GetNameOwner",
/// )
/// .with_args("s", vec!["org.freedesktop.DBus".into()])
/// .with_reply_signature("s");
///
/// let reply = c.call(call).await?;
/// dbg!(reply.body());
/// # Ok(()) }
/// ```
#[derive(Clone)]
pub struct Connection {
    inner: Arc<Inner>,
    timeout: Option<Duration>,
}

impl Connection {
    /// Shorthand for connecting to the session bus using the default
    /// configuration.
    pub async fn session_bus() -> Result<Self> {
        crate::ConnectionBuilder::new().session_bus().connect().await
    }

    /// Shorthand for connecting to the system bus using the default
    /// configuration.
    pub async fn system_bus() -> Result<Self> {
        crate::ConnectionBuilder::new().system_bus().connect().await
    }

    /// Connect to the socket at `address` and authenticate.
    pub async fn connect(address: &BusAddress, auth: &Auth) -> Result<Self> {
        Self::authenticate(UnixStream::connect(address.path()).await?, auth).await
    }

    /// Perform the SASL handshake over `stream` and start reading messages
    /// from it.
    pub async fn authenticate(mut stream: UnixStream, auth: &Auth) -> Result<Self> {
        stream.write_all(&auth.request_line()).await?;

        let mut sasl = SaslParser::new();
        let mut buf = vec![0; RECV_CHUNK];

        loop {
            let n = recv_some(&mut stream, &mut buf).await?;

            if sasl.feed(&buf[..n])? {
                break;
            }
        }

        stream.write_all(BEGIN).await?;
        let (guid, remaining) = transport::finish(sasl)?;

        let (read, write) = stream.into_split();
        let router = Arc::new(Mutex::new(Router::new()));
        let (tx, rx) = mpsc::unbounded_channel();

        let reader = tokio::spawn(read_messages(
            read,
            router.clone(),
            tx,
            Parser::with_bytes(remaining),
        ));

        Ok(Self {
            inner: Arc::new(Inner {
                writer: sync::Mutex::new(write),
                router,
                signals: Mutex::new(Some(rx)),
                guid,
                unique_name: OnceLock::new(),
                reader,
            }),
            timeout: None,
        })
    }

    /// Set the timeout applied by [`Connection::call`].
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Send the `Hello` call and record the unique name assigned by the bus.
    pub async fn hello(&self) -> Result<&str> {
        let reply = self.call(org_freedesktop_dbus::hello()).await?;
        let name = org_freedesktop_dbus::unique_name(&reply)?;
        tracing::debug!(%name, "received unique name");
        Ok(&**self.inner.unique_name.get_or_init(|| name))
    }

    /// Request the given well-known name.
    pub async fn request_name(&self, name: &str, flags: NameFlag) -> Result<NameReply> {
        let reply = self
            .call(org_freedesktop_dbus::request_name(name, flags))
            .await?;
        org_freedesktop_dbus::name_reply(&reply)
    }

    /// Send a method call and wait for its reply.
    ///
    /// Dropping the returned future cancels the call, and a reply arriving
    /// after that is dropped.
    pub async fn call(&self, call: impl Into<MethodCall>) -> Result<Message> {
        match self.timeout {
            Some(timeout) => self.call_timeout(call, timeout).await,
            None => self.call_inner(call.into()).await,
        }
    }

    /// Send a method call and wait at most `timeout` for its reply.
    ///
    /// # Errors
    ///
    /// Errors with a timeout if the reply did not arrive in time.
    pub async fn call_timeout(
        &self,
        call: impl Into<MethodCall>,
        timeout: Duration,
    ) -> Result<Message> {
        match tokio::time::timeout(timeout, self.call_inner(call.into())).await {
            Ok(result) => result,
            Err(..) => Err(Error::new(ErrorKind::Timeout)),
        }
    }

    /// Assign the next serial to `message` and send it without waiting for a
    /// reply.
    pub async fn send_message(&self, message: &mut Message) -> Result<u32> {
        message.header.serial = lock(&self.inner.router).next_serial();
        self.write(message).await?;
        Ok(message.header.serial)
    }

    /// Write raw bytes to the socket.
    pub async fn send(&self, bytes: &[u8]) -> Result<()> {
        let mut writer = self.inner.writer.lock().await;
        writer.write_all(bytes).await?;
        writer.flush().await?;
        tracing::trace!(len = bytes.len(), "sent");
        Ok(())
    }

    /// Take the receiver of messages which are not replies to calls, such as
    /// signals.
    ///
    /// Returns `None` if the receiver was already taken.
    pub fn signals(&self) -> Option<mpsc::UnboundedReceiver<Message>> {
        self.inner
            .signals
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }

    /// The GUID of the bus.
    pub fn guid(&self) -> &Guid {
        &self.inner.guid
    }

    /// The unique name assigned by the bus, once [`Connection::hello`] has
    /// completed.
    pub fn unique_name(&self) -> Option<&str> {
        self.inner.unique_name.get().map(|name| &**name)
    }

    /// Test if the connection has been closed.
    pub fn is_closed(&self) -> bool {
        lock(&self.inner.router).is_closed()
    }

    async fn call_inner(&self, call: MethodCall) -> Result<Message> {
        let (mut message, reply_signature) = call.into_parts();
        let mut rx = lock(&self.inner.router).outgoing_expecting(&mut message, reply_signature);

        // Completed right away if the connection is closed.
        if let Ok(result) = rx.try_recv() {
            return result;
        }

        let reply = PendingReply::new(message.serial(), rx, self.inner.router.clone());
        self.write(&message).await?;
        reply.await
    }

    async fn write(&self, message: &Message) -> Result<()> {
        let bytes = message.serialize()?;
        tracing::trace!(serial = message.serial(), ty = ?message.message_type(), "sending");
        self.send(&bytes).await
    }
}

async fn read_messages(
    mut read: OwnedReadHalf,
    router: Arc<Mutex<Router<Reply>>>,
    signals: mpsc::UnboundedSender<Message>,
    mut parser: Parser,
) {
    if let Err(error) = pump(&mut read, &router, &signals, &mut parser).await {
        tracing::debug!(%error, "connection closed");
    }

    lock(&router).close();
}

async fn pump(
    read: &mut OwnedReadHalf,
    router: &Mutex<Router<Reply>>,
    signals: &mpsc::UnboundedSender<Message>,
    parser: &mut Parser,
) -> Result<()> {
    let mut buf = vec![0; RECV_CHUNK];

    loop {
        let mut messages = parser.drain()?;

        if messages.is_empty() {
            let n = recv_some(read, &mut buf).await?;
            messages = parser.feed(&buf[..n])?;
        }

        let mut router = lock(router);

        for message in messages {
            pending::deliver(&mut router, signals, message);
        }
    }
}

async fn recv_some<R>(read: &mut R, buf: &mut [u8]) -> Result<usize>
where
    R: Unpin + AsyncRead,
{
    match read.read(buf).await? {
        0 => Err(Error::new(ErrorKind::ConnectionReset)),
        n => Ok(n),
    }
}
