//! The one-shot result of a dispatch.

use std::any::Any;
use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Why a computation failed inside its worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkErrorKind {
    /// The work function returned `Err`.
    Raised,
    /// The work function panicked; the panic was caught at the worker boundary.
    Panicked,
    /// The worker was torn down without reporting anything.
    Lost,
}

impl WorkErrorKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Raised => "raised",
            Self::Panicked => "panicked",
            Self::Lost => "lost",
        }
    }
}

impl fmt::Display for WorkErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error produced by (or on behalf of) a work function.
///
/// This is plain data so it can cross back from the worker as part of an
/// [`Outcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{kind}: {message}")]
pub struct WorkError {
    kind: WorkErrorKind,
    message: String,
}

impl WorkError {
    /// Error a work function returns for its own failures.
    pub fn raised(message: impl Into<String>) -> Self {
        Self {
            kind: WorkErrorKind::Raised,
            message: message.into(),
        }
    }

    pub fn panicked(message: impl Into<String>) -> Self {
        Self {
            kind: WorkErrorKind::Panicked,
            message: message.into(),
        }
    }

    pub fn lost(message: impl Into<String>) -> Self {
        Self {
            kind: WorkErrorKind::Lost,
            message: message.into(),
        }
    }

    /// Build a `Panicked` error from a payload returned by `catch_unwind`.
    ///
    /// `panic!` payloads are either `&'static str` or `String`; anything else
    /// gets a generic message.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "panic with non-string payload".to_string()
        };
        Self::panicked(message)
    }

    #[must_use]
    pub fn kind(&self) -> WorkErrorKind {
        self.kind
    }

    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

/// The failure side of an [`Outcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(tag = "failure", rename_all = "snake_case")]
pub enum Failure {
    #[error("computation failed: {0}")]
    Computation(#[from] WorkError),
    #[error("cancelled before completion")]
    Cancelled,
}

/// Result of one dispatch, delivered exactly once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Outcome<T> {
    Success(T),
    Failure(Failure),
}

impl<T> Outcome<T> {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Failure(Failure::Cancelled))
    }

    #[must_use]
    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Self::Success(_) => None,
            Self::Failure(failure) => Some(failure),
        }
    }

    pub fn into_result(self) -> Result<T, Failure> {
        match self {
            Self::Success(value) => Ok(value),
            Self::Failure(failure) => Err(failure),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Success(value) => Outcome::Success(f(value)),
            Self::Failure(failure) => Outcome::Failure(failure),
        }
    }
}

impl<T> From<Result<T, WorkError>> for Outcome<T> {
    fn from(result: Result<T, WorkError>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(err) => Self::Failure(Failure::Computation(err)),
        }
    }
}
