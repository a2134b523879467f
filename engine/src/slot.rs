//! The single-use delivery point shared by a worker and its handle.
//!
//! The one-shot sender lives behind a mutex together with the dispatch state.
//! Delivering means taking the sender; whoever takes it first (the worker's
//! result, a cancel, or the teardown guard) decides the outcome. The state
//! changes under the same lock, so it never disagrees with what was sent.

use std::sync::{Mutex, MutexGuard, PoisonError};

use tokio::sync::oneshot;

use offload_types::{DispatchId, DispatchState, Failure, InterruptSignal, Outcome};

struct Inner<O> {
    state: DispatchState,
    sender: Option<oneshot::Sender<Outcome<O>>>,
}

pub(crate) struct DeliverySlot<O> {
    id: DispatchId,
    inner: Mutex<Inner<O>>,
    signal: InterruptSignal,
}

/// What happened to a delivery attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// This call sent the outcome and the handle can receive it.
    Sent,
    /// This call won but the handle was already dropped.
    Detached,
    /// Another outcome got there first; this one was discarded.
    AlreadyDelivered,
}

impl Delivery {
    pub(crate) fn won(self) -> bool {
        !matches!(self, Self::AlreadyDelivered)
    }
}

impl<O> DeliverySlot<O> {
    /// A slot for a dispatch that is about to be spawned.
    pub(crate) fn new(
        id: DispatchId,
        sender: oneshot::Sender<Outcome<O>>,
        signal: InterruptSignal,
    ) -> Self {
        Self {
            id,
            inner: Mutex::new(Inner {
                state: DispatchState::Spawning,
                sender: Some(sender),
            }),
            signal,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<O>> {
        // Nothing panics while holding the lock, but never hang a caller on poison.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn id(&self) -> DispatchId {
        self.id
    }

    pub(crate) fn state(&self) -> DispatchState {
        self.lock().state
    }

    /// Called by the worker before computing. Returns `false` if the dispatch
    /// already ended (cancelled before the worker started).
    pub(crate) fn begin(&self) -> bool {
        let mut inner = self.lock();
        match inner.state.transition(DispatchState::Running) {
            Ok(next) => {
                inner.state = next;
                true
            }
            Err(_) => false,
        }
    }

    pub(crate) fn deliver(&self, outcome: Outcome<O>) -> Delivery {
        let mut inner = self.lock();
        let Some(sender) = inner.sender.take() else {
            return Delivery::AlreadyDelivered;
        };

        let next = match &outcome {
            Outcome::Success(_) => DispatchState::Completed,
            Outcome::Failure(Failure::Cancelled) => DispatchState::Cancelled,
            Outcome::Failure(Failure::Computation(_)) => DispatchState::Failed,
        };
        inner.state = match inner.state.transition(next) {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(dispatch_id = %self.id, "{err}");
                next
            }
        };

        match sender.send(outcome) {
            Ok(()) => Delivery::Sent,
            Err(_) => Delivery::Detached,
        }
    }

    /// Deliver `Cancelled` if nothing was delivered yet, then raise the
    /// interrupt. Raising after delivery keeps an interruptible unit from
    /// reporting its own early exit ahead of the cancel.
    pub(crate) fn cancel(&self) -> Delivery {
        let delivery = self.deliver(Outcome::Failure(Failure::Cancelled));
        self.signal.raise();
        delivery
    }
}
