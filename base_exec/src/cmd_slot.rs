//! # Command slot
//!
//! A single-value mailbox between an asynchronous command source and a
//! real-time consumer. The writer may block briefly, the reader never does:
//! it checks an atomic flag and then only attempts to take the lock.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Mutex, PoisonError, TryLockError,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Shared slot holding at most one pending command.
///
/// Cloning the slot gives another handle onto the same command.
#[derive(Debug)]
pub struct CmdSlot<T> {
    inner: Arc<Inner<T>>,
}

#[derive(Debug)]
struct Inner<T> {
    pending: Mutex<Option<T>>,

    /// Set by the writer once a command is stored, cleared by the reader when
    /// it takes the command.
    new_cmd: AtomicBool,
}

/// Outcome of a non-blocking attempt to take a command.
#[derive(Debug, Clone, PartialEq)]
pub enum TryTake<T> {
    /// No new command has been written.
    Empty,

    /// A command is pending but the writer holds the lock, try again next
    /// cycle.
    Contended,

    Taken(T),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T> CmdSlot<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Inner {
                pending: Mutex::new(None),
                new_cmd: AtomicBool::new(false),
            }),
        }
    }

    /// Store a command, replacing any command not yet taken.
    pub fn set(&self, cmd: T) {
        // A poisoned lock only means another writer panicked, the slot
        // contents are still a whole value.
        let mut pending = self
            .inner
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        *pending = Some(cmd);
        self.inner.new_cmd.store(true, Ordering::Release);
    }

    /// Take the pending command without ever blocking.
    pub fn try_take(&self) -> TryTake<T> {
        if !self.inner.new_cmd.load(Ordering::Acquire) {
            return TryTake::Empty;
        }

        let mut pending = match self.inner.pending.try_lock() {
            Ok(p) => p,
            Err(TryLockError::Poisoned(p)) => p.into_inner(),
            Err(TryLockError::WouldBlock) => return TryTake::Contended,
        };

        self.inner.new_cmd.store(false, Ordering::Release);

        match pending.take() {
            Some(cmd) => TryTake::Taken(cmd),
            None => TryTake::Empty,
        }
    }
}

impl<T> Clone for CmdSlot<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> Default for CmdSlot<T> {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_latest_command_wins() {
        let slot = CmdSlot::new();
        let writer = slot.clone();

        assert_eq!(slot.try_take(), TryTake::<u32>::Empty);

        writer.set(1);
        writer.set(2);
        assert_eq!(slot.try_take(), TryTake::Taken(2));
        assert_eq!(slot.try_take(), TryTake::Empty);
    }

    #[test]
    fn test_contended_does_not_block() {
        let slot = CmdSlot::new();
        slot.set(5);

        {
            // Hold the lock as a slow writer would
            let _guard = slot.inner.pending.lock().unwrap();
            assert_eq!(slot.try_take(), TryTake::Contended);
        }

        // The command is still there once the lock is free
        assert_eq!(slot.try_take(), TryTake::Taken(5));
    }

    #[test]
    fn test_across_threads() {
        let slot = CmdSlot::new();
        let writer = slot.clone();

        std::thread::spawn(move || writer.set(String::from("cmd")))
            .join()
            .unwrap();

        assert_eq!(slot.try_take(), TryTake::Taken(String::from("cmd")));
    }
}
