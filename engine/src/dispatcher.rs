use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use thiserror::Error;
use tokio::sync::oneshot;

use offload_config::DispatcherConfig;
use offload_types::{DispatchId, Interrupt, Outcome, WorkError, WorkUnit};

use crate::handle::DispatchHandle;
use crate::slot::{Delivery, DeliverySlot};
use crate::spawn::{Spawn, ThreadSpawner};

/// The worker context could not be created. Returned from [`Dispatcher::run`]
/// itself, never through a handle.
#[derive(Debug, Error)]
#[error("failed to spawn worker for dispatch {id}: {source}")]
pub struct SpawnFailure {
    id: DispatchId,
    #[source]
    source: io::Error,
}

impl SpawnFailure {
    #[must_use]
    pub fn id(&self) -> DispatchId {
        self.id
    }

    #[must_use]
    pub fn kind(&self) -> io::ErrorKind {
        self.source.kind()
    }
}

/// Runs work units on isolated workers, one worker per `run`.
///
/// Owned by the caller; there is no global pool behind it. The only state
/// kept between calls is the counter that names dispatches.
#[derive(Debug)]
pub struct Dispatcher<S = ThreadSpawner> {
    spawner: S,
    next_id: AtomicU64,
}

impl Dispatcher<ThreadSpawner> {
    #[must_use]
    pub fn new() -> Self {
        Self::with_spawner(ThreadSpawner::default())
    }

    #[must_use]
    pub fn from_config(config: &DispatcherConfig) -> Self {
        Self::with_spawner(ThreadSpawner::from_config(config))
    }
}

impl Default for Dispatcher<ThreadSpawner> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: Spawn> Dispatcher<S> {
    pub fn with_spawner(spawner: S) -> Self {
        Self {
            spawner,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn spawner(&self) -> &S {
        &self.spawner
    }

    /// Start `unit` on a fresh worker and return without waiting for it.
    ///
    /// The returned handle resolves to exactly one [`Outcome`]. Errors and
    /// panics inside the unit arrive as `Failure::Computation`; only failing
    /// to create the worker is reported here.
    pub fn run<I, O>(&self, unit: WorkUnit<I, O>) -> Result<DispatchHandle<O>, SpawnFailure>
    where
        I: Send + 'static,
        O: Send + 'static,
    {
        let id = DispatchId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let (sender, receiver) = oneshot::channel();
        let (signal, interrupt) = Interrupt::new_pair();
        let slot = Arc::new(DeliverySlot::new(id, sender, signal));

        let courier = Courier {
            slot: Arc::clone(&slot),
        };
        let job = Box::new(move || courier.run(unit, &interrupt));

        tracing::debug!(dispatch_id = %id, "Spawning worker");
        if let Err(source) = self.spawner.spawn(id, job) {
            tracing::warn!(dispatch_id = %id, error = %source, "Worker spawn failed");
            return Err(SpawnFailure { id, source });
        }

        Ok(DispatchHandle::new(receiver, slot))
    }
}

/// Worker-side owner of a dispatch's delivery duty.
///
/// If the job is dropped before or while running (spawner discarded it, the
/// thread unwound past the catch), the drop delivers a `Lost` failure so the
/// handle still resolves.
struct Courier<O> {
    slot: Arc<DeliverySlot<O>>,
}

impl<O> Courier<O> {
    fn run<I>(self, unit: WorkUnit<I, O>, interrupt: &Interrupt)
    where
        I: Send + 'static,
        O: Send + 'static,
    {
        let id = self.slot.id();
        if !self.slot.begin() {
            tracing::debug!(dispatch_id = %id, "Dispatch ended before worker started");
            return;
        }

        let started = Instant::now();
        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| unit.execute(interrupt))) {
            Ok(result) => Outcome::from(result),
            Err(payload) => {
                let err = WorkError::from_panic(payload.as_ref());
                tracing::warn!(dispatch_id = %id, error = %err, "Work unit panicked");
                Outcome::Failure(err.into())
            }
        };
        let elapsed_ms = started.elapsed().as_millis() as u64;

        match self.slot.deliver(outcome) {
            Delivery::Sent => {
                tracing::debug!(
                    dispatch_id = %id,
                    elapsed_ms,
                    state = %self.slot.state(),
                    "Outcome delivered"
                );
            }
            Delivery::Detached => {
                tracing::debug!(dispatch_id = %id, elapsed_ms, "Outcome dropped, handle is gone");
            }
            Delivery::AlreadyDelivered => {
                tracing::debug!(
                    dispatch_id = %id,
                    elapsed_ms,
                    "Outcome discarded, dispatch already ended"
                );
            }
        }
    }
}

impl<O> Drop for Courier<O> {
    fn drop(&mut self) {
        let lost = WorkError::lost("worker exited without reporting an outcome");
        if self.slot.deliver(Outcome::Failure(lost.into())).won() {
            tracing::debug!(dispatch_id = %self.slot.id(), "Worker torn down before reporting");
        }
    }
}
