//! Cooperative cancellation.
//!
//! A [`CancellationToken`] is the out-of-band signal a consumer uses to stop a
//! long-running producer. Producers poll [`CancellationToken::is_cancelled`]
//! between units of work; collaborators that cannot poll (a native engine with
//! its own cancel entry point, for instance) register a hook with
//! [`CancellationToken::on_cancel`].
//!
//! # Example
//!
//! ```
//! use tabula_core::CancellationToken;
//!
//! let token = CancellationToken::new();
//! let worker_token = token.clone();
//!
//! let handle = std::thread::spawn(move || {
//!     let mut produced = 0;
//!     while !worker_token.is_cancelled() && produced < 1_000_000 {
//!         produced += 1;
//!     }
//!     produced
//! });
//!
//! token.cancel();
//! assert!(handle.join().unwrap() <= 1_000_000);
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

type CancelHook = Box<dyn FnOnce() + Send>;

/// Shared stop flag plus one-shot hooks. Every clone observes the same flag.
#[derive(Clone)]
pub struct CancellationToken {
    inner: Arc<CancellationState>,
}

struct CancellationState {
    cancelled: AtomicBool,
    hooks: Mutex<Vec<CancelHook>>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancellationState {
                cancelled: AtomicBool::new(false),
                hooks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Producers poll this between units of work.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Sets the flag. The first call runs the registered hooks on this thread.
    pub fn cancel(&self) {
        if !self.inner.cancelled.swap(true, Ordering::AcqRel) {
            let hooks = std::mem::take(&mut *self.inner.hooks.lock());
            for hook in hooks {
                hook();
            }
        }
    }

    /// Runs `hook` on cancellation, or right away if that already happened.
    pub fn on_cancel<F>(&self, hook: F)
    where
        F: FnOnce() + Send + 'static,
    {
        if self.is_cancelled() {
            hook();
            return;
        }
        let mut hooks = self.inner.hooks.lock();
        if self.is_cancelled() {
            drop(hooks);
            hook();
        } else {
            hooks.push(Box::new(hook));
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CancellationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellationToken")
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn clones_observe_one_flag() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn repeated_cancel_runs_hooks_once() {
        let token = CancellationToken::new();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = calls.clone();
            token.on_cancel(move || {
                calls.fetch_add(1, Ordering::SeqCst);
            });
        }

        token.cancel();
        token.cancel();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn late_hook_runs_immediately() {
        let token = CancellationToken::new();
        token.cancel();

        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();
        token.on_cancel(move || flag.store(true, Ordering::SeqCst));
        assert!(ran.load(Ordering::SeqCst));
    }
}
