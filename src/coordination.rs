//! A fair shared/exclusive turnstile.
//!
//! Every request draws a ticket and is admitted strictly in ticket order.
//! Runs of consecutive shared requests are admitted together; an
//! exclusive request is admitted once every earlier holder has left, and
//! holds back everything behind it until it is released. Neither side
//! can starve the other.

use std::{
    collections::BTreeSet,
    time::{
        Duration,
        Instant,
    },
};

use parking_lot::{
    Condvar,
    Mutex,
    MutexGuard,
};

use crate::error::{
    Error,
    Result,
};

#[derive(Debug, Default)]
struct State {
    next_ticket: u64,
    /// Tickets below this have been admitted or withdrawn.
    admitted: u64,
    /// Tickets that gave up waiting before their turn came.
    withdrawn: BTreeSet<u64>,
    readers: usize,
    writer: bool,
}

impl State {
    fn draw(&mut self) -> u64 {
        let ticket = self.next_ticket;
        self.next_ticket += 1;
        ticket
    }

    /// Move the admission cursor past `ticket` and any withdrawn tickets
    /// directly behind it.
    fn advance(&mut self) {
        self.admitted += 1;
        while self.withdrawn.remove(&self.admitted) {
            self.admitted += 1;
        }
    }

    fn can_enter(&self, ticket: u64, exclusive: bool) -> bool {
        self.admitted == ticket
            && !self.writer
            && (!exclusive || self.readers == 0)
    }

    fn withdraw(&mut self, ticket: u64) {
        if self.admitted == ticket {
            self.advance();
        } else {
            self.withdrawn.insert(ticket);
        }
    }
}

#[derive(Debug, Default)]
pub struct Turnstile {
    state: Mutex<State>,
    changed: Condvar,
}

impl Turnstile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn acquire_shared(&self) -> SharedGuard<'_> {
        self.enter(false, None);
        SharedGuard { turnstile: self }
    }

    pub fn acquire_exclusive(&self) -> ExclusiveGuard<'_> {
        self.enter(true, None);
        ExclusiveGuard { turnstile: self }
    }

    /// Like [`acquire_shared`](Self::acquire_shared), giving up after
    /// `timeout` with [`Error::LockTimeout`].
    pub fn try_acquire_shared_for(
        &self,
        timeout: Duration,
    ) -> Result<SharedGuard<'_>> {
        if self.enter(false, Some(timeout)) {
            Ok(SharedGuard { turnstile: self })
        } else {
            Err(Error::LockTimeout(timeout))
        }
    }

    pub fn try_acquire_exclusive_for(
        &self,
        timeout: Duration,
    ) -> Result<ExclusiveGuard<'_>> {
        if self.enter(true, Some(timeout)) {
            Ok(ExclusiveGuard { turnstile: self })
        } else {
            Err(Error::LockTimeout(timeout))
        }
    }

    /// Number of shared holders currently admitted.
    pub fn readers(&self) -> usize {
        self.state.lock().readers
    }

    /// Whether an exclusive holder is currently admitted.
    pub fn is_exclusive_held(&self) -> bool {
        self.state.lock().writer
    }

    /// Returns false if the deadline passed before admission.
    fn enter(&self, exclusive: bool, timeout: Option<Duration>) -> bool {
        let deadline = timeout.map(|t| Instant::now() + t);
        let mut state = self.state.lock();
        let ticket = state.draw();

        while !state.can_enter(ticket, exclusive) {
            match deadline {
                None => self.changed.wait(&mut state),
                Some(deadline) => {
                    let timed_out =
                        self.changed.wait_until(&mut state, deadline).timed_out();
                    if timed_out && !state.can_enter(ticket, exclusive) {
                        state.withdraw(ticket);
                        drop(state);
                        self.changed.notify_all();
                        return false;
                    }
                }
            }
        }

        if exclusive {
            state.writer = true;
        } else {
            state.readers += 1;
        }
        state.advance();
        Self::notify(&self.changed, state);
        true
    }

    fn release(&self, exclusive: bool) {
        let mut state = self.state.lock();
        if exclusive {
            state.writer = false;
        } else {
            state.readers -= 1;
        }
        Self::notify(&self.changed, state);
    }

    fn notify(changed: &Condvar, state: MutexGuard<'_, State>) {
        drop(state);
        changed.notify_all();
    }
}

/// Shared admission; released on drop.
#[must_use = "the turnstile is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct SharedGuard<'a> {
    turnstile: &'a Turnstile,
}

impl SharedGuard<'_> {
    /// Whether this guard was issued by `turnstile`.
    pub fn issued_by(&self, turnstile: &Turnstile) -> bool {
        std::ptr::eq(self.turnstile, turnstile)
    }
}

impl Drop for SharedGuard<'_> {
    fn drop(&mut self) {
        self.turnstile.release(false);
    }
}

/// Exclusive admission; released on drop.
#[must_use = "the turnstile is released as soon as the guard is dropped"]
#[derive(Debug)]
pub struct ExclusiveGuard<'a> {
    turnstile: &'a Turnstile,
}

impl ExclusiveGuard<'_> {
    pub fn issued_by(&self, turnstile: &Turnstile) -> bool {
        std::ptr::eq(self.turnstile, turnstile)
    }
}

impl Drop for ExclusiveGuard<'_> {
    fn drop(&mut self) {
        self.turnstile.release(true);
    }
}
