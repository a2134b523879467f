//! Work units: a plain function pointer plus the input it will consume.
//!
//! Work functions are `fn` pointers, not closures, so they cannot capture
//! caller state. A closure that captures anything is rejected at compile time:
//!
//! ```compile_fail
//! use offload_types::WorkUnit;
//!
//! let mut seen = 0_u64;
//! let unit = WorkUnit::new(
//!     move |n: u64| {
//!         seen += n;
//!         Ok(seen)
//!     },
//!     5,
//! );
//! ```
//!
//! Non-capturing closures coerce to `fn` pointers and are fine:
//!
//! ```
//! use offload_types::{Interrupt, WorkUnit};
//!
//! let unit = WorkUnit::new(|n: u64| Ok(n * 2), 21);
//! assert_eq!(unit.execute(&Interrupt::never()), Ok(42));
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::WorkError;

/// Work function that runs to completion once started.
pub type WorkFn<I, O> = fn(I) -> Result<O, WorkError>;

/// Work function that may poll an [`Interrupt`] and return early.
pub type InterruptibleWorkFn<I, O> = fn(I, &Interrupt) -> Result<O, WorkError>;

enum Entry<I, O> {
    Plain(WorkFn<I, O>),
    Interruptible(InterruptibleWorkFn<I, O>),
}

/// A deferred computation: entry point plus owned input.
///
/// The input is moved into the worker at dispatch; the caller keeps nothing
/// the worker can reach.
pub struct WorkUnit<I, O> {
    entry: Entry<I, O>,
    input: I,
}

impl<I, O> WorkUnit<I, O>
where
    I: Send + 'static,
    O: Send + 'static,
{
    #[must_use]
    pub fn new(func: WorkFn<I, O>, input: I) -> Self {
        Self {
            entry: Entry::Plain(func),
            input,
        }
    }

    /// A unit whose function is handed the dispatch's [`Interrupt`].
    ///
    /// Cancellation stays best-effort: the function decides how often it looks.
    #[must_use]
    pub fn interruptible(func: InterruptibleWorkFn<I, O>, input: I) -> Self {
        Self {
            entry: Entry::Interruptible(func),
            input,
        }
    }

    #[must_use]
    pub fn input(&self) -> &I {
        &self.input
    }

    #[must_use]
    pub fn is_interruptible(&self) -> bool {
        matches!(self.entry, Entry::Interruptible(_))
    }

    /// Consume the unit and run it on the current thread.
    ///
    /// Panics in the work function are not caught here; the dispatcher wraps
    /// this call at the worker boundary.
    pub fn execute(self, interrupt: &Interrupt) -> Result<O, WorkError> {
        match self.entry {
            Entry::Plain(func) => func(self.input),
            Entry::Interruptible(func) => func(self.input, interrupt),
        }
    }
}

impl<I: fmt::Debug, O> fmt::Debug for WorkUnit<I, O> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.entry {
            Entry::Plain(_) => "plain",
            Entry::Interruptible(_) => "interruptible",
        };
        f.debug_struct("WorkUnit")
            .field("entry", &kind)
            .field("input", &self.input)
            .finish()
    }
}

/// Read side of a cancellation request, observed by interruptible work.
#[derive(Debug, Clone)]
pub struct Interrupt {
    flag: Arc<AtomicBool>,
}

/// Write side of an [`Interrupt`], held by whoever may cancel.
#[derive(Debug, Clone)]
pub struct InterruptSignal {
    flag: Arc<AtomicBool>,
}

impl Interrupt {
    #[must_use]
    pub fn new_pair() -> (InterruptSignal, Interrupt) {
        let flag = Arc::new(AtomicBool::new(false));
        (
            InterruptSignal {
                flag: Arc::clone(&flag),
            },
            Interrupt { flag },
        )
    }

    /// An interrupt nobody can raise, for running work inline.
    #[must_use]
    pub fn never() -> Self {
        Self {
            flag: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn is_requested(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

impl InterruptSignal {
    pub fn raise(&self) {
        self.flag.store(true, Ordering::Release);
    }

    #[must_use]
    pub fn is_raised(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}
