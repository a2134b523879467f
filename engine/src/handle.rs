use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tokio::sync::oneshot::error::TryRecvError;

use offload_types::{DispatchId, DispatchState, Outcome, WorkError};

use crate::slot::DeliverySlot;

fn lost<O>() -> Outcome<O> {
    Outcome::Failure(WorkError::lost("outcome channel closed without a value").into())
}

/// Proof that a dispatch was started. Awaiting it yields the outcome.
///
/// The future resolves on whatever task awaits it, so caller-side state
/// updates that follow stay on the caller's context. Dropping the handle
/// detaches the worker; it runs to completion and its outcome is discarded.
#[must_use = "dropping a DispatchHandle discards the outcome"]
pub struct DispatchHandle<O> {
    receiver: oneshot::Receiver<Outcome<O>>,
    slot: Arc<DeliverySlot<O>>,
}

impl<O> DispatchHandle<O> {
    pub(crate) fn new(receiver: oneshot::Receiver<Outcome<O>>, slot: Arc<DeliverySlot<O>>) -> Self {
        Self { receiver, slot }
    }

    pub fn id(&self) -> DispatchId {
        self.slot.id()
    }

    pub fn state(&self) -> DispatchState {
        self.slot.state()
    }

    /// True once an outcome has been delivered (it may not have been received yet).
    pub fn is_finished(&self) -> bool {
        self.state().is_terminal()
    }

    /// Take the outcome if it is already here, otherwise give the handle back.
    pub fn try_outcome(mut self) -> Result<Outcome<O>, Self> {
        match self.receiver.try_recv() {
            Ok(outcome) => Ok(outcome),
            Err(TryRecvError::Empty) => Err(self),
            Err(TryRecvError::Closed) => Ok(lost()),
        }
    }
}

impl<O: Send + 'static> DispatchHandle<O> {
    /// Request cancellation. Returns `true` if `Cancelled` was delivered,
    /// `false` if an outcome had already been delivered.
    ///
    /// A running unit is not stopped; interruptible units see the request
    /// through their [`Interrupt`](offload_types::Interrupt).
    pub fn cancel(&self) -> bool {
        Cancellable::cancel(self.slot.as_ref())
    }

    /// A detachable canceller, for cancelling while another task awaits.
    pub fn cancel_handle(&self) -> CancelHandle {
        CancelHandle {
            slot: Arc::clone(&self.slot) as Arc<dyn Cancellable>,
        }
    }
}

impl<O> Future for DispatchHandle<O> {
    type Output = Outcome<O>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.get_mut().receiver).poll(cx) {
            Poll::Ready(Ok(outcome)) => Poll::Ready(outcome),
            Poll::Ready(Err(_)) => Poll::Ready(lost()),
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<O> fmt::Debug for DispatchHandle<O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatchHandle")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

trait Cancellable: Send + Sync {
    fn id(&self) -> DispatchId;
    fn state(&self) -> DispatchState;
    fn cancel(&self) -> bool;
}

impl<O: Send> Cancellable for DeliverySlot<O> {
    fn id(&self) -> DispatchId {
        DeliverySlot::id(self)
    }

    fn state(&self) -> DispatchState {
        DeliverySlot::state(self)
    }

    fn cancel(&self) -> bool {
        let won = DeliverySlot::cancel(self).won();
        if won {
            tracing::info!(dispatch_id = %DeliverySlot::id(self), "Dispatch cancelled");
        } else {
            tracing::debug!(
                dispatch_id = %DeliverySlot::id(self),
                "Cancel ignored, outcome already delivered"
            );
        }
        won
    }
}

/// Cancels one dispatch. Cloneable and independent of the handle's lifetime.
#[derive(Clone)]
pub struct CancelHandle {
    slot: Arc<dyn Cancellable>,
}

impl CancelHandle {
    pub fn id(&self) -> DispatchId {
        self.slot.id()
    }

    pub fn state(&self) -> DispatchState {
        self.slot.state()
    }

    /// Same contract as [`DispatchHandle::cancel`].
    pub fn cancel(&self) -> bool {
        self.slot.cancel()
    }
}

impl fmt::Debug for CancelHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancelHandle")
            .field("id", &self.id())
            .field("state", &self.state())
            .finish()
    }
}
