//! Transient user notifications ("toasts").
//!
//! The wizard engine publishes every notice through a [`Notifier`]; the engine itself never
//! waits on display timing. [`NotificationChannel`] is the timed implementation used by the
//! terminal UI: each notice owns a cancellable dismiss timer keyed to its token, so replacing or
//! dismissing a notice can never let an older timer clear a newer message.

use log::{debug, warn};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_DISMISS_AFTER: Duration = Duration::from_millis(3500);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Error,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Success => "success",
            Severity::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub text: String,
    pub severity: Severity,
    /// Monotonic per session; identifies this notice instance.
    pub token: u64,
}

impl Notice {
    pub fn new(text: impl Into<String>, severity: Severity, token: u64) -> Self {
        Self {
            text: text.into(),
            severity,
            token,
        }
    }
}

pub trait Notifier: Send + Sync {
    /// Show `notice`, replacing whatever is currently displayed.
    fn publish(&self, notice: &Notice);

    /// Hide the current notice (manual close).
    fn dismiss(&self);
}

#[derive(Debug, Default)]
struct ChannelInner {
    current: Option<Notice>,
    timer: Option<CancellationToken>,
}

/// Auto-dismissing notice slot.
///
/// Timers are spawned on the ambient tokio runtime. Without one, notices simply stay until they
/// are replaced or dismissed.
#[derive(Debug, Clone)]
pub struct NotificationChannel {
    inner: Arc<Mutex<ChannelInner>>,
    dismiss_after: Duration,
}

impl NotificationChannel {
    pub fn new(dismiss_after: Duration) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ChannelInner::default())),
            dismiss_after,
        }
    }

    pub fn current(&self) -> Option<Notice> {
        lock(&self.inner).current.clone()
    }

    fn arm_timer(&self, token: u64) -> Option<CancellationToken> {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(h) => h,
            Err(_) => {
                warn!(
                    "[PHASE: notify] [STEP: timer] No async runtime; notice {} will not auto-dismiss",
                    token
                );
                return None;
            }
        };

        let cancel = CancellationToken::new();
        let cancelled = cancel.clone();
        let inner = Arc::clone(&self.inner);
        let after = self.dismiss_after;
        handle.spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(after) => {
                    let mut guard = lock(&inner);
                    if guard.current.as_ref().map(|n| n.token) == Some(token) {
                        debug!("[PHASE: notify] [STEP: timer] Auto-dismissed notice {}", token);
                        guard.current = None;
                        guard.timer = None;
                    }
                }
            }
        });
        Some(cancel)
    }
}

impl Default for NotificationChannel {
    fn default() -> Self {
        Self::new(DEFAULT_DISMISS_AFTER)
    }
}

impl Notifier for NotificationChannel {
    fn publish(&self, notice: &Notice) {
        let mut guard = lock(&self.inner);
        if let Some(previous) = guard.timer.take() {
            previous.cancel();
        }
        guard.current = Some(notice.clone());
        guard.timer = self.arm_timer(notice.token);
    }

    fn dismiss(&self) {
        let mut guard = lock(&self.inner);
        if let Some(timer) = guard.timer.take() {
            timer.cancel();
        }
        guard.current = None;
    }
}

fn lock(inner: &Mutex<ChannelInner>) -> MutexGuard<'_, ChannelInner> {
    inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    fn notice(text: &str, token: u64) -> Notice {
        Notice::new(text, Severity::Info, token)
    }

    #[tokio::test]
    async fn notice_auto_dismisses_after_timeout() {
        let channel = NotificationChannel::new(Duration::from_millis(60));
        channel.publish(&notice("saved", 1));
        assert_eq!(channel.current().map(|n| n.token), Some(1));

        sleep(Duration::from_millis(200)).await;
        assert!(channel.current().is_none(), "notice should be gone");
    }

    #[tokio::test]
    async fn replacing_a_notice_restarts_the_timer() {
        let channel = NotificationChannel::new(Duration::from_millis(150));
        channel.publish(&notice("first", 1));
        sleep(Duration::from_millis(100)).await;
        channel.publish(&notice("second", 2));

        // The first notice's deadline has passed; the second must still be visible.
        sleep(Duration::from_millis(100)).await;
        assert_eq!(channel.current().map(|n| n.text), Some("second".to_string()));

        sleep(Duration::from_millis(200)).await;
        assert!(channel.current().is_none());
    }

    #[tokio::test]
    async fn manual_dismiss_cancels_pending_timer() {
        let channel = NotificationChannel::new(Duration::from_millis(80));
        channel.publish(&notice("first", 1));
        channel.dismiss();
        assert!(channel.current().is_none());

        // A stale timer for token 1 must not clear a notice published later with the same text.
        channel.publish(&notice("first", 2));
        sleep(Duration::from_millis(40)).await;
        assert_eq!(channel.current().map(|n| n.token), Some(2));
    }

    #[test]
    fn without_runtime_notice_stays_until_replaced() {
        let channel = NotificationChannel::new(Duration::from_millis(1));
        channel.publish(&notice("sticky", 7));
        std::thread::sleep(Duration::from_millis(20));
        assert_eq!(channel.current().map(|n| n.token), Some(7));
    }
}
