//! Device wake-lock held for the duration of a batch.
//!
//! The lock only keeps the phone from sleeping mid-download. Failing to take or
//! drop it is logged and otherwise ignored.

use async_trait::async_trait;
use std::process::{Command, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use crate::{Result, TubesplitError};

/// How long a wake-lock command may take before it is abandoned
const COMMAND_TIMEOUT: Duration = Duration::from_secs(5);

/// Platform facility that can keep the device awake.
///
/// `release` stays synchronous because it runs from `Drop`.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WakeLockFacility: Send + Sync {
    async fn acquire(&self) -> Result<()>;
    fn release(&self) -> Result<()>;
}

/// Termux:API `termux-wake-lock` / `termux-wake-unlock`
pub struct TermuxWakeLock {
    lock_command: String,
    unlock_command: String,
}

impl TermuxWakeLock {
    pub fn new(lock_command: impl Into<String>, unlock_command: impl Into<String>) -> Self {
        Self {
            lock_command: lock_command.into(),
            unlock_command: unlock_command.into(),
        }
    }
}

impl Default for TermuxWakeLock {
    fn default() -> Self {
        Self::new("termux-wake-lock", "termux-wake-unlock")
    }
}

#[async_trait]
impl WakeLockFacility for TermuxWakeLock {
    async fn acquire(&self) -> Result<()> {
        run_async_with_timeout(&self.lock_command, COMMAND_TIMEOUT).await
    }

    fn release(&self) -> Result<()> {
        run_with_timeout(&self.unlock_command, COMMAND_TIMEOUT)
    }
}

/// Used when the wake-lock is switched off in the config
pub struct DisabledWakeLock;

#[async_trait]
impl WakeLockFacility for DisabledWakeLock {
    async fn acquire(&self) -> Result<()> {
        Ok(())
    }

    fn release(&self) -> Result<()> {
        Ok(())
    }
}

/// Keeps the runtime free while the lock command runs
async fn run_async_with_timeout(command: &str, timeout: Duration) -> Result<()> {
    let unavailable = |reason: String| TubesplitError::WakeLockUnavailable(format!("{}: {}", command, reason));

    let status = tokio::process::Command::new(command)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .status();

    match tokio::time::timeout(timeout, status).await {
        Ok(Ok(status)) if status.success() => Ok(()),
        Ok(Ok(status)) => Err(unavailable(format!("exited with {}", status)).into()),
        Ok(Err(e)) => Err(unavailable(e.to_string()).into()),
        Err(_) => Err(unavailable("timed out".to_string()).into()),
    }
}

/// Runs synchronously so it can be called from `Drop`.
fn run_with_timeout(command: &str, timeout: Duration) -> Result<()> {
    let unavailable = |reason: String| TubesplitError::WakeLockUnavailable(format!("{}: {}", command, reason));

    let mut child = Command::new(command)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .map_err(|e| unavailable(e.to_string()))?;

    let deadline = Instant::now() + timeout;
    loop {
        match child.try_wait() {
            Ok(Some(status)) if status.success() => return Ok(()),
            Ok(Some(status)) => return Err(unavailable(format!("exited with {}", status)).into()),
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(unavailable("timed out".to_string()).into());
            }
            Ok(None) => thread::sleep(Duration::from_millis(50)),
            Err(e) => return Err(unavailable(e.to_string()).into()),
        }
    }
}

/// Process-wide wake-lock handle with idempotent acquire/release
pub struct SessionWakeLock {
    facility: Box<dyn WakeLockFacility>,
    held: AtomicBool,
}

impl SessionWakeLock {
    pub fn new(facility: Box<dyn WakeLockFacility>) -> Self {
        Self {
            facility,
            held: AtomicBool::new(false),
        }
    }

    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::SeqCst)
    }

    /// Take the lock; a no-op while already held. Returns whether the lock is held.
    pub async fn acquire(&self) -> bool {
        if self.is_held() {
            return true;
        }
        match self.facility.acquire().await {
            Ok(()) => {
                tracing::info!("Wake lock acquired");
                self.held.store(true, Ordering::SeqCst);
                true
            }
            Err(e) => {
                tracing::warn!("{:#} - continuing without a wake lock", e);
                false
            }
        }
    }

    /// Drop the lock; a no-op when not held.
    pub fn release(&self) {
        if !self.held.swap(false, Ordering::SeqCst) {
            return;
        }
        match self.facility.release() {
            Ok(()) => tracing::info!("Wake lock released"),
            Err(e) => tracing::warn!("{:#}", e),
        }
    }

    /// Acquire now and release when the returned guard goes out of scope
    pub async fn hold(&self) -> WakeLockGuard<'_> {
        self.acquire().await;
        WakeLockGuard { lock: self }
    }
}

/// Releases the session wake-lock when dropped
pub struct WakeLockGuard<'a> {
    lock: &'a SessionWakeLock,
}

impl Drop for WakeLockGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acquire_is_idempotent() {
        let mut facility = MockWakeLockFacility::new();
        facility.expect_acquire().times(1).returning(|| Ok(()));
        facility.expect_release().times(1).returning(|| Ok(()));

        let lock = SessionWakeLock::new(Box::new(facility));
        assert!(lock.acquire().await);
        assert!(lock.acquire().await);
        assert!(lock.is_held());
        lock.release();
        lock.release();
        assert!(!lock.is_held());
    }

    #[test]
    fn test_release_without_acquire_is_noop() {
        let mut facility = MockWakeLockFacility::new();
        facility.expect_release().never();

        let lock = SessionWakeLock::new(Box::new(facility));
        lock.release();
    }

    #[tokio::test]
    async fn test_unavailable_facility_is_not_fatal() {
        let mut facility = MockWakeLockFacility::new();
        facility
            .expect_acquire()
            .times(1)
            .returning(|| Err(TubesplitError::WakeLockUnavailable("no termux-api".into()).into()));
        facility.expect_release().never();

        let lock = SessionWakeLock::new(Box::new(facility));
        {
            let _guard = lock.hold().await;
            assert!(!lock.is_held());
        }
        assert!(!lock.is_held());
    }

    #[tokio::test]
    async fn test_guard_releases_on_scope_exit() {
        let mut facility = MockWakeLockFacility::new();
        facility.expect_acquire().times(1).returning(|| Ok(()));
        facility.expect_release().times(1).returning(|| Ok(()));

        let lock = SessionWakeLock::new(Box::new(facility));
        {
            let _guard = lock.hold().await;
            assert!(lock.is_held());
        }
        assert!(!lock.is_held());
    }

    #[tokio::test]
    async fn test_missing_command_reports_unavailable() {
        let facility = TermuxWakeLock::new("no-such-wake-lock-command", "no-such-wake-unlock-command");
        let err = facility.acquire().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TubesplitError>(),
            Some(TubesplitError::WakeLockUnavailable(_))
        ));

        let err = facility.release().unwrap_err();
        assert!(matches!(
            err.downcast_ref::<TubesplitError>(),
            Some(TubesplitError::WakeLockUnavailable(_))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_slow_lock_command_times_out_without_blocking() {
        let started = Instant::now();
        let ticker = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(50)).await;
            Instant::now()
        });

        let err = run_async_with_timeout("yes", Duration::from_millis(300)).await.unwrap_err();
        assert!(err.to_string().contains("timed out"));

        // The other task ran while the command was pending
        let ticked = ticker.await.unwrap();
        assert!(ticked.duration_since(started) < Duration::from_millis(300));
    }
}
