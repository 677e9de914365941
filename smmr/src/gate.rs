//! One-shot completion signal between the output generation thread and its readers.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

/// Set once, read by any number of waiters. The first `set` wins; later ones are ignored.
pub struct OnceGate<T> {
    value: Mutex<Option<T>>,
    cond: Condvar,
}

impl<T: Clone> OnceGate<T> {
    pub fn new() -> Self {
        OnceGate {
            value: Mutex::new(None),
            cond: Condvar::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        // A waiter panicking while holding the lock leaves the value intact.
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns whether this call was the one that opened the gate.
    pub fn set(&self, value: T) -> bool {
        let mut guard = self.lock();
        if guard.is_some() {
            return false;
        }
        *guard = Some(value);
        self.cond.notify_all();
        true
    }

    pub fn is_set(&self) -> bool {
        self.lock().is_some()
    }

    pub fn get(&self) -> Option<T> {
        self.lock().clone()
    }

    /// Block until the gate is set.
    pub fn wait(&self) -> T {
        let mut guard = self.lock();
        loop {
            if let Some(value) = guard.as_ref() {
                return value.clone();
            }
            guard = self
                .cond
                .wait(guard)
                .unwrap_or_else(PoisonError::into_inner);
        }
    }
}

impl<T: Clone> Default for OnceGate<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Sets the gate to `on_drop` when dropped, unless it was already set.
///
/// Holding one across a fallible operation guarantees waiters are released on every exit
/// path, including early returns and panics.
pub struct GateGuard<'a, T: Clone> {
    gate: &'a OnceGate<T>,
    on_drop: Option<T>,
}

impl<'a, T: Clone> GateGuard<'a, T> {
    pub fn new(gate: &'a OnceGate<T>, on_drop: T) -> Self {
        GateGuard {
            gate,
            on_drop: Some(on_drop),
        }
    }

    pub fn set(mut self, value: T) {
        self.gate.set(value);
        self.on_drop = None;
    }
}

impl<'a, T: Clone> Drop for GateGuard<'a, T> {
    fn drop(&mut self) {
        if let Some(value) = self.on_drop.take() {
            self.gate.set(value);
        }
    }
}
