//! Atomic subscription slot guarding a stream's terminal transition.
//!
//! The slot holds one of three values: unset, a live upstream handle, or the
//! cancelled sentinel. The tag lives in an atomic byte and every terminal path
//! claims the transition with a single swap or compare-and-set on it; only the
//! winner performs side effects. Once cancelled, the slot never changes again.
//!
//! The handle itself sits behind a mutex that is only touched while
//! installing it or by the single winner of the transition away from `Live`.

#[cfg(not(loom))]
use std::sync::{
    Mutex,
    MutexGuard,
    atomic::{AtomicU8, Ordering},
};
use std::sync::PoisonError;

#[cfg(loom)]
use loom::sync::{
    Mutex,
    MutexGuard,
    atomic::{AtomicU8, Ordering},
};

const UNSET: u8 = 0;
const LIVE: u8 = 1;
const CANCELLED: u8 = 2;

/// Observable value of a [`SubscriptionSlot`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotState {
    /// No subscription has been installed yet.
    Unset,
    /// A live upstream handle is installed.
    Live,
    /// The cancelled sentinel; terminal.
    Cancelled,
}

/// Why [`SubscriptionSlot::install`] refused a handle.
///
/// The refused handle is handed back so the caller can cancel it.
#[derive(Debug, PartialEq, Eq)]
pub enum Rejected<S> {
    /// A handle was already installed.
    AlreadySubscribed(S),
    /// The slot was cancelled before the handle arrived.
    Cancelled(S),
}

/// Result of [`SubscriptionSlot::cancel`].
#[derive(Debug, PartialEq, Eq)]
pub enum CancelOutcome<S> {
    /// Another transition already claimed the slot.
    AlreadyCancelled,
    /// The slot was claimed before any handle was installed.
    BeforeSubscribe,
    /// The slot was claimed from a live handle, returned for cancellation.
    Active(S),
}

/// Tagged atomic cell: `Unset`, `Live(handle)` or `Cancelled`.
#[derive(Debug)]
pub struct SubscriptionSlot<S> {
    state: AtomicU8,
    handle: Mutex<Option<S>>,
}

impl<S> Default for SubscriptionSlot<S> {
    fn default() -> Self { Self::new() }
}

impl<S> SubscriptionSlot<S> {
    /// Create an unset slot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(UNSET),
            handle: Mutex::new(None),
        }
    }

    /// Current value of the slot.
    #[must_use]
    pub fn state(&self) -> SlotState {
        match self.state.load(Ordering::SeqCst) {
            UNSET => SlotState::Unset,
            LIVE => SlotState::Live,
            _ => SlotState::Cancelled,
        }
    }

    /// Whether the cancelled sentinel has been planted.
    #[must_use]
    pub fn is_cancelled(&self) -> bool { self.state() == SlotState::Cancelled }

    /// Install the first live handle.
    ///
    /// This is the only operation that ever stores a non-sentinel value.
    ///
    /// # Errors
    ///
    /// Returns the handle inside [`Rejected`] when a handle was already
    /// installed or the slot has been cancelled.
    pub fn install(&self, handle: S) -> Result<(), Rejected<S>> {
        let mut guard = self.lock();
        if guard.is_some() {
            return Err(Rejected::AlreadySubscribed(handle));
        }
        if self.state.load(Ordering::SeqCst) != UNSET {
            return Err(Rejected::Cancelled(handle));
        }
        *guard = Some(handle);
        if self
            .state
            .compare_exchange(UNSET, LIVE, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return match guard.take() {
                Some(handle) => Err(Rejected::Cancelled(handle)),
                None => Ok(()),
            };
        }
        Ok(())
    }

    /// Claim the slot for cancellation.
    ///
    /// Exactly one caller observes something other than
    /// [`CancelOutcome::AlreadyCancelled`] over the lifetime of the slot,
    /// counting [`SubscriptionSlot::terminate`] winners as well.
    pub fn cancel(&self) -> CancelOutcome<S> {
        loop {
            match self.state.load(Ordering::SeqCst) {
                CANCELLED => return CancelOutcome::AlreadyCancelled,
                UNSET => {
                    if self
                        .state
                        .compare_exchange(UNSET, CANCELLED, Ordering::SeqCst, Ordering::SeqCst)
                        .is_ok()
                    {
                        return CancelOutcome::BeforeSubscribe;
                    }
                }
                _ => {
                    if self
                        .state
                        .compare_exchange(LIVE, CANCELLED, Ordering::SeqCst, Ordering::SeqCst)
                        .is_err()
                    {
                        return CancelOutcome::AlreadyCancelled;
                    }
                    return match self.lock().take() {
                        Some(handle) => CancelOutcome::Active(handle),
                        None => CancelOutcome::BeforeSubscribe,
                    };
                }
            }
        }
    }

    /// Plant the sentinel unconditionally.
    ///
    /// Returns `true` when this call performed the transition, `false` when
    /// the slot already held the sentinel. Any live handle is dropped without
    /// being cancelled, since its source has already finished.
    pub fn terminate(&self) -> bool {
        let previous = self.state.swap(CANCELLED, Ordering::SeqCst);
        if previous == CANCELLED {
            return false;
        }
        if previous == LIVE {
            drop(self.lock().take());
        }
        true
    }

    fn lock(&self) -> MutexGuard<'_, Option<S>> {
        self.handle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<S: Clone> SubscriptionSlot<S> {
    /// Clone of the live handle, if one is installed.
    #[must_use]
    pub fn live(&self) -> Option<S> {
        if self.state.load(Ordering::SeqCst) != LIVE {
            return None;
        }
        self.lock().clone()
    }
}
