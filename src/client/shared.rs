#[cfg(feature = "async")]
use core::task::Waker;
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use super::LeaseSnapshot;
use crate::time::Duration;

#[cfg(feature = "async")]
use super::waker::WakerRegistration;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// State shared between a client, its worker and its cancel handles.
#[derive(Debug)]
pub(crate) struct Shared {
    cancelled: Mutex<bool>,
    signal: Condvar,
    latest: Mutex<Option<LeaseSnapshot>>,
    #[cfg(feature = "async")]
    wakers: Mutex<WakerRegistration>,
}

impl Shared {
    pub(crate) fn new() -> Shared {
        Shared {
            cancelled: Mutex::new(false),
            signal: Condvar::new(),
            latest: Mutex::new(None),
            #[cfg(feature = "async")]
            wakers: Mutex::new(WakerRegistration::new()),
        }
    }

    pub(crate) fn cancel(&self) {
        *lock(&self.cancelled) = true;
        self.signal.notify_all();
    }

    pub(crate) fn reset(&self) {
        *lock(&self.cancelled) = false;
    }

    pub(crate) fn is_cancelled(&self) -> bool {
        *lock(&self.cancelled)
    }

    /// Sleep for `duration` unless cancelled first. Returns whether the
    /// client is cancelled.
    pub(crate) fn sleep(&self, duration: Duration) -> bool {
        let guard = lock(&self.cancelled);
        let (guard, _) = self
            .signal
            .wait_timeout_while(guard, duration.into(), |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *guard
    }

    pub(crate) fn publish(&self, snapshot: LeaseSnapshot) {
        *lock(&self.latest) = Some(snapshot);
        #[cfg(feature = "async")]
        lock(&self.wakers).wake_all();
    }

    pub(crate) fn latest(&self) -> Option<LeaseSnapshot> {
        lock(&self.latest).clone()
    }

    #[cfg(feature = "async")]
    pub(crate) fn register_waker(&self, waker: &Waker) {
        lock(&self.wakers).register(waker)
    }

    #[cfg(feature = "async")]
    pub(crate) fn add_waker(&self, waker: &Waker) {
        lock(&self.wakers).add(waker)
    }

    #[cfg(feature = "async")]
    pub(crate) fn clear_wakers(&self) {
        lock(&self.wakers).clear()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_sleep_times_out() {
        let shared = Shared::new();
        assert!(!shared.sleep(Duration::from_millis(5)));
    }

    #[test]
    fn test_cancel_wakes_sleeper() {
        let shared = Arc::new(Shared::new());
        let sleeper = {
            let shared = shared.clone();
            std::thread::spawn(move || shared.sleep(Duration::from_secs(60)))
        };
        std::thread::sleep(std::time::Duration::from_millis(20));
        shared.cancel();
        assert!(sleeper.join().unwrap());
        shared.reset();
        assert!(!shared.is_cancelled());
    }

    #[test]
    fn test_publish_latest() {
        let shared = Shared::new();
        assert_eq!(shared.latest(), None);
        shared.publish(LeaseSnapshot {
            t1: 30,
            ..Default::default()
        });
        assert_eq!(shared.latest().map(|s| s.t1), Some(30));
    }
}
