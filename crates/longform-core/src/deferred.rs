#![forbid(unsafe_code)]

//! One-shot lazy construction with an explicit failure state.
//!
//! Heavyweight pipeline pieces are built on first use rather than up
//! front. Construction is attempted exactly once; a failed attempt parks
//! the value in `Failed` so every later consumer sees the same answer and
//! can fall back to its documented substitute instead of retrying in a
//! loop. [`Deferred::reset`] re-arms the attempt for explicit
//! user-driven retries.

use std::fmt;

#[derive(Debug)]
enum State<T> {
    Pending,
    Ready(T),
    Failed(String),
}

/// A value constructed on demand: pending, then ready or failed.
#[derive(Debug)]
pub struct Deferred<T> {
    state: State<T>,
}

impl<T> Default for Deferred<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Deferred<T> {
    /// Create an unresolved value.
    pub const fn new() -> Self {
        Self {
            state: State::Pending,
        }
    }

    /// Run `factory` if this value is still pending, recording success or
    /// failure. Returns the value when it is ready after the call. A
    /// failed value stays failed; the factory is not retried.
    pub fn resolve_with<E: fmt::Display>(
        &mut self,
        factory: impl FnOnce() -> Result<T, E>,
    ) -> Option<&T> {
        if let State::Pending = self.state {
            match factory() {
                Ok(value) => self.state = State::Ready(value),
                Err(e) => {
                    let message = e.to_string();
                    tracing::warn!(error = %message, "deferred construction failed");
                    self.state = State::Failed(message);
                }
            }
        }
        self.get()
    }

    /// The resolved value, if construction succeeded.
    pub fn get(&self) -> Option<&T> {
        match &self.state {
            State::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Mutable access to the resolved value.
    pub fn get_mut(&mut self) -> Option<&mut T> {
        match &mut self.state {
            State::Ready(value) => Some(value),
            _ => None,
        }
    }

    /// Whether construction has not been attempted yet.
    pub fn is_pending(&self) -> bool {
        matches!(self.state, State::Pending)
    }

    /// Whether construction succeeded.
    pub fn is_ready(&self) -> bool {
        matches!(self.state, State::Ready(_))
    }

    /// Whether construction failed.
    pub fn is_failed(&self) -> bool {
        matches!(self.state, State::Failed(_))
    }

    /// The recorded failure message, if construction failed.
    pub fn failure(&self) -> Option<&str> {
        match &self.state {
            State::Failed(message) => Some(message),
            _ => None,
        }
    }

    /// Discard any outcome and return to pending, re-arming the next
    /// [`Deferred::resolve_with`].
    pub fn reset(&mut self) {
        self.state = State::Pending;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn starts_pending() {
        let deferred: Deferred<u32> = Deferred::new();
        assert!(deferred.is_pending());
        assert!(!deferred.is_ready());
        assert!(!deferred.is_failed());
        assert_eq!(deferred.get(), None);
    }

    #[test]
    fn resolves_once() {
        let calls = Cell::new(0u32);
        let mut deferred = Deferred::new();
        let factory = || {
            calls.set(calls.get() + 1);
            Ok::<_, String>(7u32)
        };
        assert_eq!(deferred.resolve_with(factory), Some(&7));
        let factory = || {
            calls.set(calls.get() + 1);
            Ok::<_, String>(9u32)
        };
        assert_eq!(deferred.resolve_with(factory), Some(&7));
        assert_eq!(calls.get(), 1);
        assert!(deferred.is_ready());
    }

    #[test]
    fn failure_is_sticky() {
        let calls = Cell::new(0u32);
        let mut deferred: Deferred<u32> = Deferred::new();
        let outcome = deferred.resolve_with(|| {
            calls.set(calls.get() + 1);
            Err::<u32, _>("renderer unavailable")
        });
        assert_eq!(outcome, None);
        assert!(deferred.is_failed());
        assert_eq!(deferred.failure(), Some("renderer unavailable"));

        let outcome = deferred.resolve_with(|| {
            calls.set(calls.get() + 1);
            Ok::<_, String>(1u32)
        });
        assert_eq!(outcome, None);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn reset_rearms_construction() {
        let mut deferred: Deferred<u32> = Deferred::new();
        deferred.resolve_with(|| Err::<u32, _>("first attempt"));
        assert!(deferred.is_failed());

        deferred.reset();
        assert!(deferred.is_pending());
        assert_eq!(deferred.resolve_with(|| Ok::<_, String>(3u32)), Some(&3));
    }

    #[test]
    fn get_mut_reaches_the_value() {
        let mut deferred = Deferred::new();
        deferred.resolve_with(|| Ok::<_, String>(vec![1, 2]));
        if let Some(v) = deferred.get_mut() {
            v.push(3);
        }
        assert_eq!(deferred.get(), Some(&vec![1, 2, 3]));
    }
}
