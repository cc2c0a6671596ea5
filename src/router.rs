//! Correlation of replies with the calls that caused them.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::{Error, ErrorKind, Result};
use crate::message::Message;
use crate::protocol::MessageType;

/// How a pending call is completed.
///
/// Each connection driver supplies its own implementation, and the
/// [`Router`] completes each of them exactly once.
pub trait Completion: Sized {
    /// The handle given to the caller, through which the result is observed.
    type Handle;

    /// Construct a new completion and its handle.
    fn pair() -> (Self, Self::Handle);

    /// Complete the call with the given result.
    fn complete(self, result: Result<Message>);
}

type Shared = Rc<RefCell<Option<Result<Message>>>>;

/// Completion which stores the result in a slot shared with a
/// [`BlockingReply`].
pub struct Slot(Shared);

/// The handle of a [`Slot`], polled by the blocking driver.
#[derive(Clone)]
pub struct BlockingReply(Shared);

impl BlockingReply {
    /// Test if the result is available.
    pub fn is_ready(&self) -> bool {
        self.0.borrow().is_some()
    }

    /// Take the result if it is available.
    pub fn take(&self) -> Option<Result<Message>> {
        self.0.borrow_mut().take()
    }
}

impl Completion for Slot {
    type Handle = BlockingReply;

    fn pair() -> (Self, Self::Handle) {
        let shared = Shared::default();
        (Slot(shared.clone()), BlockingReply(shared))
    }

    fn complete(self, result: Result<Message>) {
        *self.0.borrow_mut() = Some(result);
    }
}

#[cfg(feature = "tokio")]
impl Completion for tokio::sync::oneshot::Sender<Result<Message>> {
    type Handle = tokio::sync::oneshot::Receiver<Result<Message>>;

    fn pair() -> (Self, Self::Handle) {
        tokio::sync::oneshot::channel()
    }

    fn complete(self, result: Result<Message>) {
        // The receiver going away means the caller lost interest.
        let _ = self.send(result);
    }
}

struct Pending<C> {
    completion: C,
    reply_signature: Option<Box<str>>,
}

/// Assigns serials to outgoing calls and resolves them when their replies
/// arrive.
///
/// # Examples
///
/// ```
/// use dbus_wire::router::{Router, Slot};
/// use dbus_wire::Message;
///
/// let mut router = Router::<Slot>::new();
///
/// let mut call = Message::method_call("/", "Ping");
/// let reply = router.outgoing(&mut call);
/// assert_eq!(call.serial(), 1);
/// assert!(router.contains(1));
///
/// let signal = router.incoming(Message::signal("/", "org.example", "Changed").with_serial(9));
/// assert!(signal.is_some());
///
/// assert!(router.incoming(call.method_return().with_serial(2)).is_none());
/// assert!(reply.take().is_some_and(|result| result.is_ok()));
/// assert!(router.is_empty());
/// ```
pub struct Router<C> {
    serial: u32,
    pending: HashMap<u32, Pending<C>>,
    closed: bool,
}

impl<C> Router<C>
where
    C: Completion,
{
    /// Construct a new router.
    pub fn new() -> Self {
        Self {
            serial: 0,
            pending: HashMap::new(),
            closed: false,
        }
    }

    /// Get the next serial, skipping zero when wrapping around.
    pub fn next_serial(&mut self) -> u32 {
        loop {
            self.serial = self.serial.wrapping_add(1);

            if self.serial != 0 && !self.pending.contains_key(&self.serial) {
                return self.serial;
            }
        }
    }

    /// Assign a serial to `message` and register it as awaiting a reply.
    pub fn outgoing(&mut self, message: &mut Message) -> C::Handle {
        self.outgoing_expecting(message, None)
    }

    /// Like [`Router::outgoing`], but the reply must carry the given body
    /// signature.
    pub fn outgoing_expecting(
        &mut self,
        message: &mut Message,
        reply_signature: Option<Box<str>>,
    ) -> C::Handle {
        let serial = self.next_serial();
        message.header.serial = serial;

        let (completion, handle) = C::pair();

        if self.closed {
            completion.complete(Err(Error::new(ErrorKind::ConnectionClosed)));
            return handle;
        }

        self.pending.insert(
            serial,
            Pending {
                completion,
                reply_signature,
            },
        );

        handle
    }

    /// Handle an incoming message.
    ///
    /// Replies to pending calls complete them. Replies nobody is waiting for
    /// are dropped. Every other message is handed back to the caller.
    pub fn incoming(&mut self, message: Message) -> Option<Message> {
        let is_error = match message.message_type() {
            MessageType::METHOD_RETURN => false,
            MessageType::ERROR => true,
            _ => return Some(message),
        };

        let Some(reply_serial) = message.reply_serial() else {
            tracing::debug!(serial = message.serial(), "dropping reply without reply serial");
            return None;
        };

        let Some(pending) = self.pending.remove(&reply_serial) else {
            tracing::debug!(reply_serial, "dropping reply to unknown serial");
            return None;
        };

        let result = if is_error {
            let error_name = message.error_name().unwrap_or_default().into();
            Err(Error::new(ErrorKind::ResponseError(
                error_name,
                message.into_body(),
            )))
        } else {
            match pending.reply_signature {
                Some(expected) if *expected != *message.signature() => {
                    Err(Error::new(ErrorKind::UnexpectedReplySignature {
                        expected,
                        actual: message.signature().into(),
                    }))
                }
                _ => Ok(message),
            }
        };

        pending.completion.complete(result);
        None
    }

    /// Stop waiting for a reply to `serial`. A reply arriving later is
    /// dropped.
    pub fn cancel(&mut self, serial: u32) -> bool {
        let cancelled = self.pending.remove(&serial).is_some();

        if cancelled {
            tracing::debug!(serial, "cancelled pending call");
        }

        cancelled
    }

    /// Close the router, failing every pending call and every call made
    /// after this.
    pub fn close(&mut self) {
        self.closed = true;

        for (_, pending) in self.pending.drain() {
            pending
                .completion
                .complete(Err(Error::new(ErrorKind::ConnectionClosed)));
        }
    }

    /// Test if the router has been closed.
    pub fn is_closed(&self) -> bool {
        self.closed
    }

    /// Test if a reply to `serial` is awaited.
    pub fn contains(&self, serial: u32) -> bool {
        self.pending.contains_key(&serial)
    }

    /// The number of pending calls.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Test if no calls are pending.
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

impl<C> Default for Router<C>
where
    C: Completion,
{
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;
    use crate::value::Value;
    use crate::Message;

    use super::{Router, Slot};

    #[test]
    fn reply_resolves_pending_call() {
        let mut router = Router::<Slot>::new();

        let mut call = Message::method_call("/org/example", "Get");
        let reply = router.outgoing_expecting(&mut call, Some("u".into()));
        assert_eq!(call.serial(), 1);
        assert!(!reply.is_ready());

        let response = call
            .method_return()
            .with_body("u", vec![Value::UInt32(5)])
            .with_serial(10);

        assert!(router.incoming(response).is_none());
        assert!(!router.contains(1));

        let Some(Ok(message)) = reply.take() else {
            panic!("expected reply");
        };

        assert_eq!(message.body(), [Value::UInt32(5)]);
    }

    #[test]
    fn unknown_reply_is_ignored() {
        let mut router = Router::<Slot>::new();
        let mut call = Message::method_call("/", "Ping");
        let reply = router.outgoing(&mut call);

        let stale = Message::method_call("/", "Other")
            .with_serial(77)
            .error("org.example.Error")
            .with_serial(3);

        assert!(router.incoming(stale).is_none());
        assert_eq!(router.len(), 1);
        assert!(router.contains(call.serial()));
        assert!(!reply.is_ready());
    }

    #[test]
    fn error_reply() {
        let mut router = Router::<Slot>::new();
        let mut call = Message::method_call("/", "Ping");
        let reply = router.outgoing(&mut call);

        let error = call
            .error("org.freedesktop.DBus.Error.UnknownMethod")
            .with_body("s", vec![Value::from("no such method")])
            .with_serial(2);

        assert!(router.incoming(error).is_none());

        let Some(Err(error)) = reply.take() else {
            panic!("expected error");
        };

        let (name, body) = error.response_error().unwrap_or_default();
        assert_eq!(name, "org.freedesktop.DBus.Error.UnknownMethod");
        assert_eq!(body, [Value::from("no such method")]);
    }

    #[test]
    fn unexpected_reply_signature() {
        let mut router = Router::<Slot>::new();
        let mut call = Message::method_call("/", "Ping");
        let reply = router.outgoing_expecting(&mut call, Some("s".into()));

        router.incoming(call.method_return().with_serial(2));

        let Some(Err(error)) = reply.take() else {
            panic!("expected error");
        };

        assert!(error.is_marshal());
        assert!(matches!(
            error.kind(),
            ErrorKind::UnexpectedReplySignature { .. }
        ));
    }

    #[test]
    fn non_replies_are_returned() {
        let mut router = Router::<Slot>::new();

        let signal = Message::signal("/", "org.example", "Changed").with_serial(1);
        assert_eq!(router.incoming(signal.clone()), Some(signal));

        let call = Message::method_call("/", "Ping").with_serial(2);
        assert_eq!(router.incoming(call.clone()), Some(call));
    }

    #[test]
    fn cancel_drops_late_reply() {
        let mut router = Router::<Slot>::new();
        let mut call = Message::method_call("/", "Ping");
        let reply = router.outgoing(&mut call);

        assert!(router.cancel(call.serial()));
        assert!(!router.cancel(call.serial()));
        assert!(router.incoming(call.method_return().with_serial(2)).is_none());
        assert!(!reply.is_ready());
    }

    #[test]
    fn close_rejects_pending() {
        let mut router = Router::<Slot>::new();
        let mut a = Message::method_call("/", "A");
        let mut b = Message::method_call("/", "B");
        let ra = router.outgoing(&mut a);
        let rb = router.outgoing(&mut b);

        router.close();
        assert!(router.is_empty());

        for reply in [ra, rb] {
            assert!(reply.take().is_some_and(|r| r.is_err_and(|e| e.is_closed())));
        }

        let mut c = Message::method_call("/", "C");
        let rc = router.outgoing(&mut c);
        assert!(rc.take().is_some_and(|r| r.is_err_and(|e| e.is_closed())));
    }

    #[test]
    fn serials_wrap_around() {
        let mut router = Router::<Slot>::new();
        router.serial = u32::MAX - 1;
        assert_eq!(router.next_serial(), u32::MAX);
        assert_eq!(router.next_serial(), 1);

        let mut call = Message::method_call("/", "Ping");
        let _reply = router.outgoing(&mut call);
        assert_eq!(call.serial(), 2);

        router.serial = 1;
        assert_eq!(router.next_serial(), 3);
    }
}
