use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::{mpsc, oneshot};

use crate::error::{Error, ErrorKind, Result};
use crate::message::Message;
use crate::router::{Completion, Router};

/// Something which can stop waiting for the reply to a serial.
pub(crate) trait Cancel {
    fn cancel(&self, serial: u32);
}

/// A reply being waited for by one of the asynchronous drivers.
///
/// Dropping it before it completes cancels the call, so a reply which
/// arrives later is dropped by the router.
pub(crate) struct PendingReply<C>
where
    C: Cancel,
{
    serial: u32,
    rx: oneshot::Receiver<Result<Message>>,
    router: C,
    done: bool,
}

impl<C> PendingReply<C>
where
    C: Cancel,
{
    pub(crate) fn new(serial: u32, rx: oneshot::Receiver<Result<Message>>, router: C) -> Self {
        Self {
            serial,
            rx,
            router,
            done: false,
        }
    }
}

impl<C> Future for PendingReply<C>
where
    C: Cancel + Unpin,
{
    type Output = Result<Message>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        let result = match Pin::new(&mut this.rx).poll(cx) {
            Poll::Ready(Ok(result)) => result,
            // The router went away without completing the call.
            Poll::Ready(Err(..)) => Err(Error::new(ErrorKind::ConnectionClosed)),
            Poll::Pending => return Poll::Pending,
        };

        this.done = true;
        Poll::Ready(result)
    }
}

impl<C> Drop for PendingReply<C>
where
    C: Cancel,
{
    fn drop(&mut self) {
        if !self.done {
            self.router.cancel(self.serial);
        }
    }
}

/// Route a received message, forwarding anything which is not a reply to
/// `signals`.
pub(crate) fn deliver<C>(
    router: &mut Router<C>,
    signals: &mpsc::UnboundedSender<Message>,
    message: Message,
) where
    C: Completion,
{
    tracing::trace!(serial = message.serial(), ty = ?message.message_type(), "received");

    let Some(message) = router.incoming(message) else {
        return;
    };

    if let Err(error) = signals.send(message) {
        tracing::trace!(serial = error.0.serial(), "no receiver for message");
    }
}
