#![cfg(all(feature = "advanced-tests", loom))]
//! Concurrency tests for the subscription slot using loom.
//!
//! These tests exercise `SubscriptionSlot` without Tokio. `loom` explores
//! interleavings to ensure exactly one terminal claim succeeds and that an
//! installed handle is never lost or handed out twice.

use loom::{
    model,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    thread,
};
use wirestream::responder::{CancelOutcome, Rejected, SubscriptionSlot};

#[test]
fn terminal_claims_have_one_winner() {
    model(|| {
        let slot = Arc::new(SubscriptionSlot::new());
        slot.install(1_u8).expect("first install should succeed");
        let winners = Arc::new(AtomicUsize::new(0));

        let terminator = {
            let slot = Arc::clone(&slot);
            let winners = Arc::clone(&winners);
            thread::spawn(move || {
                if slot.terminate() {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            })
        };
        let canceller = {
            let slot = Arc::clone(&slot);
            let winners = Arc::clone(&winners);
            thread::spawn(move || {
                if !matches!(slot.cancel(), CancelOutcome::AlreadyCancelled) {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
            })
        };
        if slot.terminate() {
            winners.fetch_add(1, Ordering::SeqCst);
        }

        terminator.join().expect("terminator thread panicked");
        canceller.join().expect("canceller thread panicked");
        assert_eq!(winners.load(Ordering::SeqCst), 1);
        assert!(slot.is_cancelled());
    });
}

#[test]
fn install_racing_cancel_never_loses_the_handle() {
    model(|| {
        let slot = Arc::new(SubscriptionSlot::new());

        let installer = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || slot.install(7_u8))
        };
        let cancelled = slot.cancel();
        let installed = installer.join().expect("installer thread panicked");

        match (installed, cancelled) {
            (Ok(()), CancelOutcome::Active(handle)) => assert_eq!(handle, 7),
            (Err(Rejected::Cancelled(handle)), CancelOutcome::BeforeSubscribe) => {
                assert_eq!(handle, 7);
            }
            (installed, cancelled) => {
                panic!("unexpected interleaving: {installed:?} / {cancelled:?}")
            }
        }
        assert!(slot.is_cancelled());
        assert_eq!(slot.live(), None);
    });
}

#[test]
fn install_racing_terminate_leaves_slot_cancelled() {
    model(|| {
        let slot = Arc::new(SubscriptionSlot::new());

        let installer = {
            let slot = Arc::clone(&slot);
            thread::spawn(move || slot.install(3_u8).is_ok())
        };
        assert!(slot.terminate());
        installer.join().expect("installer thread panicked");

        assert!(slot.is_cancelled());
        assert_eq!(slot.cancel(), CancelOutcome::AlreadyCancelled);
        assert_eq!(slot.install(4), Err(Rejected::Cancelled(4)));
    });
}
