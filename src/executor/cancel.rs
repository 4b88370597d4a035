//! One-shot cancellation signal shared between a run and whoever may stop it.

use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::thread::{self, JoinHandle};
use std::time::Duration;

#[derive(Debug, Default)]
struct Inner {
    cancelled: Mutex<bool>,
    signal: Condvar,
}

/// Cooperative cancellation token.
///
/// Cloning shares the same signal. Once cancelled, a token stays cancelled.
/// Waiters blocked in [`CancelToken::wait_timeout`] wake as soon as
/// [`CancelToken::cancel`] is called.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    inner: Arc<Inner>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.inner
            .cancelled
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        let mut cancelled = self.lock();
        if !*cancelled {
            *cancelled = true;
            self.inner.signal.notify_all();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.lock()
    }

    /// Block for at most `timeout`, returning early once cancelled.
    ///
    /// Returns whether the token is cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (guard, _) = self
            .inner
            .signal
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(|poison| poison.into_inner());
        *guard
    }

    /// Cancel this token once `delay` elapses, unless it is cancelled sooner.
    pub fn cancel_after(&self, delay: Duration) -> JoinHandle<()> {
        let token = self.clone();
        thread::spawn(move || {
            if !token.wait_timeout(delay) {
                token.cancel();
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    #[test]
    fn test_new_token_is_not_cancelled() {
        let token = CancelToken::new();
        assert!(!token.is_cancelled());
        assert!(!token.wait_timeout(Duration::from_millis(10)));
    }

    #[test]
    fn test_cancel_is_shared_and_monotonic() {
        let token = CancelToken::new();
        let clone = token.clone();

        clone.cancel();
        clone.cancel();

        assert!(token.is_cancelled());
        assert!(token.wait_timeout(Duration::from_millis(0)));
    }

    #[test]
    fn test_wait_wakes_on_cancel() {
        let token = CancelToken::new();
        let canceller = token.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            canceller.cancel();
        });

        let started = Instant::now();
        assert!(token.wait_timeout(Duration::from_secs(10)));
        assert!(started.elapsed() < Duration::from_secs(5));
        handle.join().unwrap();
    }

    #[test]
    fn test_cancel_after_fires() {
        let token = CancelToken::new();
        let handle = token.cancel_after(Duration::from_millis(20));
        handle.join().unwrap();
        assert!(token.is_cancelled());
    }
}
