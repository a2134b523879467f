//! Core domain types for offload.
//!
//! This crate contains pure domain types with no IO, no async, and minimal dependencies.
//! Everything a dispatch needs to describe itself lives here: the [`WorkUnit`] that
//! crosses into a worker, the [`Outcome`] that comes back, and the [`DispatchState`]
//! machine in between.

// Pedantic lint configuration - these are intentional design choices
#![allow(clippy::missing_errors_doc)] // Result-returning functions are self-explanatory

mod ids;
mod outcome;
mod state;
mod work;

pub use ids::DispatchId;
pub use outcome::{Failure, Outcome, WorkError, WorkErrorKind};
pub use state::{DispatchState, InvalidTransition};
pub use work::{Interrupt, InterruptSignal, InterruptibleWorkFn, WorkFn, WorkUnit};
