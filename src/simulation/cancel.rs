// src/simulation/cancel.rs

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Caller-owned cancellation signal for long-running evaluations.
///
/// Clones share the same flag. The engine polls it between permanent
/// evaluations; it never interrupts one in the middle.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    /// A fresh, un-cancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of every evaluation watching this token.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Release);
    }

    /// Whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Acquire)
    }
}

/// Outcome of an evaluation that may be cancelled.
#[derive(Debug, Clone, PartialEq)]
pub enum Completion<T> {
    /// The computation ran to the end.
    Done(T),
    /// The caller's token was triggered first; nothing was recorded.
    Cancelled,
}

impl<T> Completion<T> {
    /// The value, if the computation completed.
    pub fn done(self) -> Option<T> {
        match self {
            Completion::Done(v) => Some(v),
            Completion::Cancelled => None,
        }
    }

    /// `true` for [`Completion::Cancelled`].
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Completion::Cancelled)
    }

    /// Maps the completed value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Completion<U> {
        match self {
            Completion::Done(v) => Completion::Done(f(v)),
            Completion::Cancelled => Completion::Cancelled,
        }
    }
}

/// Returns `Completion::Cancelled` from the enclosing function when the token fired.
macro_rules! bail_if_cancelled {
    ($token:expr) => {
        if $token.is_cancelled() {
            return Ok($crate::simulation::Completion::Cancelled);
        }
    };
}
pub(crate) use bail_if_cancelled;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_the_flag() {
        let token = CancellationToken::new();
        let watcher = token.clone();
        assert!(!watcher.is_cancelled());
        token.cancel();
        assert!(watcher.is_cancelled());
    }

    #[test]
    fn test_completion_helpers() {
        assert_eq!(Completion::Done(2).map(|x| x * 3).done(), Some(6));
        assert!(Completion::<u8>::Cancelled.is_cancelled());
        assert_eq!(Completion::<u8>::Cancelled.done(), None);
    }
}
