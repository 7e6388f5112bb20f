//! Single-flight guard for send batches and connection attempts.
//!
//! Two independent flags. Acquisition is an atomic check-and-set; a second
//! caller is rejected, never queued. Scoped acquisition hands back a
//! [`GuardPermit`] that clears the flag when dropped, so the flag is released
//! on success, on error and when the owning task is aborted.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Which operation a flag protects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GuardFlag {
    /// A send batch is running.
    Sending,
    /// A (re)connection attempt is running.
    Reconnecting,
}

impl fmt::Display for GuardFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GuardFlag::Sending => write!(f, "send_in_flight"),
            GuardFlag::Reconnecting => write!(f, "reconnect_in_flight"),
        }
    }
}

#[derive(Debug, Default)]
pub struct DispatchGuard {
    send_in_flight: AtomicBool,
    reconnect_in_flight: AtomicBool,
}

impl DispatchGuard {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, flag: GuardFlag) -> &AtomicBool {
        match flag {
            GuardFlag::Sending => &self.send_in_flight,
            GuardFlag::Reconnecting => &self.reconnect_in_flight,
        }
    }

    /// Sets the flag if it is clear. Returns false, changing nothing, if held.
    pub fn try_acquire(&self, flag: GuardFlag) -> bool {
        self.slot(flag)
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Clears the flag. Idempotent.
    pub fn release(&self, flag: GuardFlag) {
        self.slot(flag).store(false, Ordering::Release);
    }

    pub fn is_held(&self, flag: GuardFlag) -> bool {
        self.slot(flag).load(Ordering::Acquire)
    }

    /// Scoped acquisition. The flag is cleared when the permit drops.
    pub fn acquire(self: &Arc<Self>, flag: GuardFlag) -> Option<GuardPermit> {
        if self.try_acquire(flag) {
            Some(GuardPermit {
                guard: Arc::clone(self),
                flag,
            })
        } else {
            None
        }
    }
}

/// Proof that a flag is held. Releases it on drop.
#[derive(Debug)]
#[must_use = "dropping the permit releases the guard immediately"]
pub struct GuardPermit {
    guard: Arc<DispatchGuard>,
    flag: GuardFlag,
}

impl GuardPermit {
    pub fn flag(&self) -> GuardFlag {
        self.flag
    }
}

impl Drop for GuardPermit {
    fn drop(&mut self) {
        self.guard.release(self.flag);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_rejected() {
        let guard = DispatchGuard::new();
        assert!(guard.try_acquire(GuardFlag::Sending));
        assert!(!guard.try_acquire(GuardFlag::Sending));
        assert!(guard.is_held(GuardFlag::Sending));
    }

    #[test]
    fn flags_are_independent() {
        let guard = DispatchGuard::new();
        assert!(guard.try_acquire(GuardFlag::Sending));
        assert!(guard.try_acquire(GuardFlag::Reconnecting));
        guard.release(GuardFlag::Sending);
        assert!(!guard.is_held(GuardFlag::Sending));
        assert!(guard.is_held(GuardFlag::Reconnecting));
    }

    #[test]
    fn release_is_idempotent() {
        let guard = DispatchGuard::new();
        guard.release(GuardFlag::Reconnecting);
        guard.release(GuardFlag::Reconnecting);
        assert!(guard.try_acquire(GuardFlag::Reconnecting));
    }

    #[test]
    fn permit_releases_on_drop() {
        let guard = Arc::new(DispatchGuard::new());
        {
            let permit = guard.acquire(GuardFlag::Sending).unwrap();
            assert_eq!(permit.flag(), GuardFlag::Sending);
            assert!(guard.acquire(GuardFlag::Sending).is_none());
        }
        assert!(!guard.is_held(GuardFlag::Sending));
    }

    #[test]
    fn permit_releases_on_early_return() {
        fn validate(guard: &Arc<DispatchGuard>, ok: bool) -> Result<GuardPermit, ()> {
            let permit = guard.acquire(GuardFlag::Sending).ok_or(())?;
            if !ok {
                return Err(());
            }
            Ok(permit)
        }

        let guard = Arc::new(DispatchGuard::new());
        assert!(validate(&guard, false).is_err());
        assert!(!guard.is_held(GuardFlag::Sending));
    }

    #[tokio::test]
    async fn permit_releases_when_task_is_aborted() {
        let guard = Arc::new(DispatchGuard::new());
        let permit = guard.acquire(GuardFlag::Sending).unwrap();

        let task = tokio::spawn(async move {
            let _permit = permit;
            std::future::pending::<()>().await;
        });
        tokio::task::yield_now().await;
        assert!(guard.is_held(GuardFlag::Sending));

        task.abort();
        let _ = task.await;
        assert!(!guard.is_held(GuardFlag::Sending));
    }

    #[tokio::test]
    async fn concurrent_acquirers_get_exactly_one_permit() {
        let guard = Arc::new(DispatchGuard::new());
        let mut handles = Vec::new();
        for _ in 0..16 {
            let guard = guard.clone();
            handles.push(tokio::spawn(async move { guard.try_acquire(GuardFlag::Sending) }));
        }
        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
