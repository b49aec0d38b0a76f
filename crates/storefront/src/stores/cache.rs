//! Versioned in-memory slices shared by every store.
//!
//! A [`Slice`] owns one piece of cached remote state. Requests that replace
//! the whole slice take a [`Ticket`] *before* going to the network and hand
//! it back when committing the response. A response is applied only if its
//! ticket is newer than the last one applied, so when two requests race the
//! one issued last wins regardless of which resolves first.
//!
//! Mutations that patch the cache in place (mark-read, set-default,
//! prepend-created) also take a ticket up front and go through
//! [`Slice::patch`]; reads that only sync a row use [`Slice::refresh`].
//! Patches commute with each other, but none survives a
//! [`Slice::reset`] issued after it, and a replacing response issued before
//! an applied patch is discarded.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::debug;

/// Issue order of a slice-replacing request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Ticket(u64);

#[derive(Debug)]
struct Versioned<T> {
    value: T,
    applied: u64,
    /// Highest ticket issued before the last reset.
    floor: u64,
}

/// One store's cached state.
#[derive(Debug)]
pub struct Slice<T> {
    state: RwLock<Versioned<T>>,
    issued: AtomicU64,
}

impl<T: Default> Default for Slice<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Slice<T> {
    pub fn new(value: T) -> Self {
        Self {
            state: RwLock::new(Versioned {
                value,
                applied: 0,
                floor: 0,
            }),
            issued: AtomicU64::new(0),
        }
    }

    /// Reserve a place in line for a request about to be sent.
    pub fn ticket(&self) -> Ticket {
        Ticket(self.issued.fetch_add(1, Ordering::SeqCst) + 1)
    }

    /// Apply `f` if `ticket` is newer than the last applied one.
    ///
    /// Returns `false` (and leaves the state untouched) for stale responses.
    pub fn commit(&self, ticket: Ticket, f: impl FnOnce(&mut T)) -> bool {
        let mut state = self.state.write();
        if ticket.0 <= state.applied {
            debug!(
                ticket = ticket.0,
                applied = state.applied,
                "Discarding stale response"
            );
            return false;
        }
        state.applied = ticket.0;
        f(&mut state.value);
        true
    }

    /// Apply a patch from a mutation issued with `ticket`.
    ///
    /// Returns `None` (and leaves the state untouched) if the slice was reset
    /// after `ticket` was issued.
    pub fn patch<R>(&self, ticket: Ticket, f: impl FnOnce(&mut T) -> R) -> Option<R> {
        let mut state = self.state.write();
        if ticket.0 <= state.floor {
            debug!(
                ticket = ticket.0,
                floor = state.floor,
                "Discarding patch issued before reset"
            );
            return None;
        }
        state.applied = state.applied.max(ticket.0);
        Some(f(&mut state.value))
    }

    /// Sync rows from a read issued with `ticket`.
    ///
    /// Like [`patch`](Self::patch) this is dropped after a reset, but it does
    /// not outrank replacing responses already in flight.
    pub fn refresh(&self, ticket: Ticket, f: impl FnOnce(&mut T)) -> bool {
        let mut state = self.state.write();
        if ticket.0 <= state.floor {
            return false;
        }
        f(&mut state.value);
        true
    }

    /// Read without cloning.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.state.read().value)
    }

    /// Drop cached state and invalidate every in-flight ticket.
    pub fn reset(&self)
    where
        T: Default,
    {
        let mut state = self.state.write();
        let issued = self.issued.load(Ordering::SeqCst);
        state.value = T::default();
        state.applied = issued;
        state.floor = issued;
    }
}

impl<T: Clone> Slice<T> {
    pub fn snapshot(&self) -> T {
        self.state.read().value.clone()
    }
}
