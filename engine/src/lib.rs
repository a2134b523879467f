//! Dispatch engine for offload.
//!
//! Runs one [`WorkUnit`] on an isolated worker thread and hands the caller a
//! [`DispatchHandle`] that resolves to exactly one [`Outcome`].
//!
//! ```text
//! caller                         worker thread
//! ------                         -------------
//! Dispatcher::run(unit) ──spawn──▶ Courier::run
//!   │ returns immediately          │ Spawning -> Running
//!   ▼                              │ unit.execute() under catch_unwind
//! handle.await ◀──── one-shot ──── │ deliver(Outcome) -> Completed | Failed
//!   │                              ▼ thread exits
//! handle.cancel() ── races deliver; first to take the sender wins
//! ```
//!
//! The caller and the worker share only the delivery slot and the interrupt
//! flag. The input is moved into the worker and never seen again by the caller.

mod dispatcher;
mod handle;
mod slot;
mod spawn;

pub use dispatcher::{Dispatcher, SpawnFailure};
pub use handle::{CancelHandle, DispatchHandle};
pub use spawn::{Job, Spawn, ThreadSpawner};

pub use offload_types::{
    DispatchId, DispatchState, Failure, Interrupt, Outcome, WorkError, WorkErrorKind, WorkUnit,
};
