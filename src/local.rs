//! A connection driven cooperatively on a single thread.

use std::cell::{OnceCell, RefCell};
use std::io::Write;
use std::os::unix::net::UnixStream;
use std::rc::Rc;
use std::time::Duration;

use tokio::io::unix::AsyncFd;
use tokio::sync::{mpsc, oneshot, Mutex};
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

impl<C> Cancel for Rc<RefCell<Router<C>>>
where
    C: Completion,
{
    #[inline]
    fn cancel(&self, serial: u32) {
        self.borrow_mut().cancel(serial);
    }
}

struct Inner {
    fd: Rc<AsyncFd<UnixStream>>,
    write: Mutex<()>,
    router: Rc<RefCell<Router<Reply>>>,
    signals: RefCell<Option<mpsc::UnboundedReceiver<Message>>>,
    guid: Guid,
    unique_name: OnceCell<Box<str>>,
    reader: JoinHandle<()>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// A D-Bus connection for a single threaded runtime.
///
/// Incoming messages are read by a task spawned with
/// [`tokio::task::spawn_local`], so the connection must be created and used
/// inside of a [`tokio::task::LocalSet`]. Calls suspend until the reader
/// resolves their reply.
///
/// The connection can be cloned to make calls from several local tasks.
///
/// # Examples
///
/// ```no_run
/// use dbus_wire::{ConnectionBuilder, MethodCall};
/// use tokio::task::LocalSet;
///
/// # #[tokio::main(flavor = "current_thread")] async fn main() -> dbus_wire::Result<()> {
/// LocalSet::new().run_until(async {
///     let c = ConnectionBuilder::new().connect_local().await?;
///     println!("{:?}", c.unique_name());
///
///     let reply = c.call(MethodCall::new(
///         "org.freedesktop.DBus",
///         "/org/freedesktop/DBus",
///         "org.freedesktop.DBus",
///         "GetId",
///     )).await?;
///
///     dbg!(reply.body());
///     Ok(())
/// }).await
/// # }
/// ```
#[derive(Clone)]
pub struct LocalConnection {
    inner: Rc<Inner>,
    timeout: Option<Duration>,
}

impl LocalConnection {
    /// Connect to the socket at `address` and authenticate.
    pub async fn connect(address: &BusAddress, auth: &Auth) -> Result<Self> {
        Self::authenticate(UnixStream::connect(address.path())?, auth).await
    }

    /// Perform the SASL handshake over `stream` and start reading messages
    /// from it.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a [`tokio::task::LocalSet`].
    pub async fn authenticate(stream: UnixStream, auth: &Auth) -> Result<Self> {
        stream.set_nonblocking(true)?;
        let fd = AsyncFd::new(stream)?;

        send_all(&fd, &auth.request_line()).await?;

        let mut sasl = SaslParser::new();
        let mut buf = vec![0; RECV_CHUNK];

        loop {
            let n = recv_some(&fd, &mut buf).await?;

            if sasl.feed(&buf[..n])? {
                break;
            }
        }

        send_all(&fd, BEGIN).await?;
        let (guid, remaining) = transport::finish(sasl)?;

        let fd = Rc::new(fd);
        let router = Rc::new(RefCell::new(Router::new()));
        let (tx, rx) = mpsc::unbounded_channel();

        let reader = tokio::task::spawn_local(read_messages(
            fd.clone(),
            router.clone(),
            tx,
            Parser::with_bytes(remaining),
        ));

        Ok(Self {
            inner: Rc::new(Inner {
                fd,
                write: Mutex::new(()),
                router,
                signals: RefCell::new(Some(rx)),
                guid,
                unique_name: OnceCell::new(),
                reader,
            }),
            timeout: None,
        })
    }

    /// Set the timeout applied by [`LocalConnection::call`].
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
    /// Dropping the returned future cancels the call.
    pub async fn call(&self, call: impl Into<MethodCall>) -> Result<Message> {
        match self.timeout {
            Some(timeout) => self.call_timeout(call, timeout).await,
            None => self.call_inner(call.into()).await,
        }
    }

    /// Send a method call and wait at most `timeout` for its reply.
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
        message.header.serial = self.inner.router.borrow_mut().next_serial();
        self.write(message).await?;
        Ok(message.header.serial)
    }

    /// Write raw bytes to the socket.
    pub async fn send(&self, bytes: &[u8]) -> Result<()> {
        let _guard = self.inner.write.lock().await;
        send_all(&self.inner.fd, bytes).await
    }

    /// Take the receiver of messages which are not replies to calls, such as
    /// signals.
    ///
    /// Messages are buffered from the moment the connection is
    /// authenticated. Returns `None` if the receiver was already taken.
    pub fn signals(&self) -> Option<mpsc::UnboundedReceiver<Message>> {
        self.inner.signals.borrow_mut().take()
    }

    /// The GUID of the bus.
    pub fn guid(&self) -> &Guid {
        &self.inner.guid
    }

    /// The unique name assigned by the bus, once
    /// [`LocalConnection::hello`] has completed.
    pub fn unique_name(&self) -> Option<&str> {
        self.inner.unique_name.get().map(|name| &**name)
    }

    /// Test if the connection has been closed.
    pub fn is_closed(&self) -> bool {
        self.inner.router.borrow().is_closed()
    }

    async fn call_inner(&self, call: MethodCall) -> Result<Message> {
        let (mut message, reply_signature) = call.into_parts();

        let mut rx = self
            .inner
            .router
            .borrow_mut()
            .outgoing_expecting(&mut message, reply_signature);

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
    fd: Rc<AsyncFd<UnixStream>>,
    router: Rc<RefCell<Router<Reply>>>,
    signals: mpsc::UnboundedSender<Message>,
    mut parser: Parser,
) {
    if let Err(error) = pump(&fd, &router, &signals, &mut parser).await {
        tracing::debug!(%error, "connection closed");
    }

    router.borrow_mut().close();
}

async fn pump(
    fd: &AsyncFd<UnixStream>,
    router: &RefCell<Router<Reply>>,
    signals: &mpsc::UnboundedSender<Message>,
    parser: &mut Parser,
) -> Result<()> {
    let mut buf = vec![0; RECV_CHUNK];

    loop {
        let mut messages = parser.drain()?;

        if messages.is_empty() {
            let n = recv_some(fd, &mut buf).await?;
            messages = parser.feed(&buf[..n])?;
        }

        for message in messages {
            pending::deliver(&mut router.borrow_mut(), signals, message);
        }
    }
}

async fn send_all(fd: &AsyncFd<UnixStream>, mut bytes: &[u8]) -> Result<()> {
    while !bytes.is_empty() {
        let mut guard = fd.writable().await?;

        match guard.get_inner().write(bytes).map_err(Error::from) {
            Ok(0) => return Err(Error::new(ErrorKind::ConnectionReset)),
            Ok(n) => bytes = &bytes[n..],
            Err(e) if e.would_block() => guard.clear_ready(),
            Err(e) => return Err(e),
        }
    }

    Ok(())
}

async fn recv_some(fd: &AsyncFd<UnixStream>, buf: &mut [u8]) -> Result<usize> {
    loop {
        let mut guard = fd.readable().await?;

        match transport::recv_some(&mut guard.get_inner(), buf) {
            Ok(bytes) => return Ok(bytes.len()),
            Err(e) if e.would_block() => guard.clear_ready(),
            Err(e) => return Err(e),
        }
    }
}
