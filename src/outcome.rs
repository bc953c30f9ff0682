//! Closed, named workflow outcomes
//!
//! Every engine operation returns exactly one [`Outcome`]: a single success
//! shape or one failure drawn from the operation's own failure enum. Failures
//! are data, not errors, so callers branch on them with `match` and the
//! compiler checks that every kind is handled. Outcome-specific fields are only
//! reachable after narrowing to the variant that carries them.

use std::convert::Infallible;
use std::fmt;
use thiserror::Error;
use tracing::debug;

/// A named set of failure kinds for one workflow
pub trait WorkflowFailure: fmt::Debug {
    /// Stable name of this failure kind, e.g. `"tradeAlreadyRespondedTo"`
    fn name(&self) -> &'static str;
}

/// Workflows that cannot fail use `Infallible` as their failure set
impl WorkflowFailure for Infallible {
    fn name(&self) -> &'static str {
        match *self {}
    }
}

/// Name reported for any success
pub const SUCCESS: &str = "success";

/// Result of one workflow: one success shape or one named failure
#[must_use = "an outcome may be a failure that has to be reported"]
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<S, F> {
    Success(S),
    Failure(F),
}

impl<S, F: WorkflowFailure> Outcome<S, F> {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Outcome::Failure(_))
    }

    /// Name of the outcome: [`SUCCESS`] or the failure's name
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Success(_) => SUCCESS,
            Outcome::Failure(failure) => failure.name(),
        }
    }

    pub fn as_success(&self) -> Option<&S> {
        match self {
            Outcome::Success(success) => Some(success),
            Outcome::Failure(_) => None,
        }
    }

    pub fn as_failure(&self) -> Option<&F> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(failure) => Some(failure),
        }
    }

    pub fn success(self) -> Option<S> {
        match self {
            Outcome::Success(success) => Some(success),
            Outcome::Failure(_) => None,
        }
    }

    pub fn failure(self) -> Option<F> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure(failure) => Some(failure),
        }
    }

    pub fn map<T>(self, f: impl FnOnce(S) -> T) -> Outcome<T, F> {
        match self {
            Outcome::Success(success) => Outcome::Success(f(success)),
            Outcome::Failure(failure) => Outcome::Failure(failure),
        }
    }

    pub fn into_result(self) -> Result<S, F> {
        match self {
            Outcome::Success(success) => Ok(success),
            Outcome::Failure(failure) => Err(failure),
        }
    }

    /// Treat any failure as unexpected, keeping only its name
    pub fn into_success(self) -> Result<S, UnexpectedFailure> {
        match self {
            Outcome::Success(success) => Ok(success),
            Outcome::Failure(failure) => Err(UnexpectedFailure { kind: failure.name() }),
        }
    }
}

impl<S> Outcome<S, Infallible> {
    /// Unwrap an outcome whose failure set is empty
    pub fn into_inner(self) -> S {
        match self {
            Outcome::Success(success) => success,
            Outcome::Failure(never) => match never {},
        }
    }
}

/// Build a failure outcome, tracing which workflow produced it
pub(crate) fn failed<S, F: WorkflowFailure>(workflow: &'static str, failure: F) -> Outcome<S, F> {
    debug!(workflow, failure = failure.name(), "Workflow ended in failure");
    Outcome::Failure(failure)
}

/// A failure outcome reached where the caller required a success
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Expected success but got failure \"{kind}\"")]
pub struct UnexpectedFailure {
    pub kind: &'static str,
}
