use futures::future::BoxFuture;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Decides whether an edit must be written without waiting for the quiet
/// period. Receives the section name and the section's new local value.
pub type FlushPredicate = Arc<dyn Fn(&str, &Value) -> bool + Send + Sync>;

/// Commit action run when the quiet period elapses.
pub type CommitFn = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// What [`DebouncedCommit::touch`] decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// A commit will run after the quiet period unless touched again.
    Scheduled,
    /// The pending timer was cancelled; the caller must commit now.
    Immediate,
}

/// Reusable debounce: every touch restarts one quiet-period timer, and the
/// commit runs once the timer survives.
///
/// The timer only covers the wait. Once it fires the commit runs on its own
/// task, so a later touch or [`cancel`](Self::cancel) never interrupts a
/// commit that already started.
pub struct DebouncedCommit {
    quiet_period: Duration,
    flush_now: FlushPredicate,
    commit: CommitFn,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl DebouncedCommit {
    pub fn new(quiet_period: Duration, flush_now: FlushPredicate, commit: CommitFn) -> Self {
        Self {
            quiet_period,
            flush_now,
            commit,
            timer: Mutex::new(None),
        }
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    /// Records an edit of `section`.
    pub fn touch(&self, section: &str, value: &Value) -> Trigger {
        if (self.flush_now)(section, value) {
            self.cancel();
            Trigger::Immediate
        } else {
            self.schedule();
            Trigger::Scheduled
        }
    }

    /// (Re)starts the quiet-period timer.
    pub fn schedule(&self) {
        let commit = self.commit.clone();
        let quiet_period = self.quiet_period;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(quiet_period).await;
            tokio::spawn(commit());
        });

        if let Some(previous) = self.timer().replace(handle) {
            previous.abort();
        }
    }

    /// Drops the pending timer, if any, without committing.
    pub fn cancel(&self) {
        if let Some(previous) = self.timer().take() {
            previous.abort();
        }
    }

    /// Whether a timer is still waiting out the quiet period.
    pub fn is_pending(&self) -> bool {
        self.timer()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    fn timer(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for DebouncedCommit {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counting(counter: Arc<AtomicU32>) -> CommitFn {
        Arc::new(move || -> BoxFuture<'static, ()> {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    fn never() -> FlushPredicate {
        Arc::new(|_: &str, _: &Value| false)
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_touches_commit_once() {
        let commits = Arc::new(AtomicU32::new(0));
        let debounce =
            DebouncedCommit::new(Duration::from_secs(3), never(), counting(commits.clone()));

        for _ in 0..5 {
            assert_eq!(debounce.touch("moderation", &json!({})), Trigger::Scheduled);
            tokio::time::sleep(Duration::from_secs(1)).await;
        }
        assert_eq!(commits.load(Ordering::SeqCst), 0);
        assert!(debounce.is_pending());

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(commits.load(Ordering::SeqCst), 1);
        assert!(!debounce.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_flush_predicate_cancels_timer() {
        let commits = Arc::new(AtomicU32::new(0));
        let debounce = DebouncedCommit::new(
            Duration::from_secs(3),
            Arc::new(|section: &str, _: &Value| section == "mode"),
            counting(commits.clone()),
        );

        debounce.touch("welcome", &json!({}));
        assert_eq!(debounce.touch("mode", &json!("strict")), Trigger::Immediate);
        assert!(!debounce.is_pending());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(commits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_discards_pending_commit() {
        let commits = Arc::new(AtomicU32::new(0));
        let debounce =
            DebouncedCommit::new(Duration::from_secs(3), never(), counting(commits.clone()));

        debounce.touch("welcome", &json!({}));
        drop(debounce);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(commits.load(Ordering::SeqCst), 0);
    }
}
