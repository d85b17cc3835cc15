use tokio::time::Instant;

/// Sync state of one buffered section.
///
/// ```text
/// Clean ──edit──▶ Dirty ──flush──▶ Saving ──ok──▶ JustCommitted ──expire──▶ Clean
///
/// Saving ──err──▶ Dirty
/// Saving ──ok, edited meanwhile──▶ Dirty
/// JustCommitted ──edit──▶ Dirty
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Clean,
    Dirty,
    /// A write carrying buffer revision `revision` is in flight.
    Saving { revision: u64 },
    /// Committed; authoritative refreshes are ignored until `until`.
    JustCommitted { until: Instant },
}

impl SyncState {
    /// A local mutation. Edits during a save keep the save in flight; the
    /// newer revision is picked up once it completes.
    pub fn on_edit(self) -> Self {
        match self {
            Self::Saving { revision } => Self::Saving { revision },
            _ => Self::Dirty,
        }
    }

    /// Starts a write of `revision` if there is anything to write.
    pub fn begin_save(self, revision: u64) -> Option<Self> {
        match self {
            Self::Dirty => Some(Self::Saving { revision }),
            _ => None,
        }
    }

    /// The write succeeded. If the buffer moved past the saved revision the
    /// section is dirty again.
    pub fn on_commit_ok(self, current_revision: u64, until: Instant) -> Self {
        match self {
            Self::Saving { revision } if revision == current_revision => {
                Self::JustCommitted { until }
            }
            Self::Saving { .. } => Self::Dirty,
            other => other,
        }
    }

    /// The write failed; the buffer is kept and retried.
    pub fn on_commit_err(self) -> Self {
        match self {
            Self::Saving { .. } => Self::Dirty,
            other => other,
        }
    }

    /// Expires the post-commit window.
    pub fn settle(self, now: Instant) -> Self {
        match self {
            Self::JustCommitted { until } if now >= until => Self::Clean,
            other => other,
        }
    }

    /// Whether an authoritative read may overwrite this section.
    pub fn accepts_authoritative(self, now: Instant) -> bool {
        self.settle(now) == Self::Clean
    }

    pub fn is_pending(self) -> bool {
        matches!(self, Self::Dirty | Self::Saving { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn test_happy_path() {
        let now = Instant::now();
        let until = now + Duration::from_secs(3);

        let state = SyncState::Clean.on_edit();
        assert_eq!(state, SyncState::Dirty);
        let state = state.begin_save(1).unwrap();
        assert_eq!(state, SyncState::Saving { revision: 1 });
        let state = state.on_commit_ok(1, until);
        assert_eq!(state, SyncState::JustCommitted { until });

        assert!(!state.accepts_authoritative(now));
        assert!(state.accepts_authoritative(until));
        assert_eq!(state.settle(until), SyncState::Clean);
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_during_save_requeues() {
        let until = Instant::now() + Duration::from_secs(3);

        let saving = SyncState::Dirty.begin_save(1).unwrap();
        let still_saving = saving.on_edit();
        assert_eq!(still_saving, saving);
        assert_eq!(still_saving.on_commit_ok(2, until), SyncState::Dirty);
    }

    #[test]
    fn test_failure_returns_to_dirty() {
        let saving = SyncState::Dirty.begin_save(4).unwrap();
        assert_eq!(saving.on_commit_err(), SyncState::Dirty);
    }

    #[test]
    fn test_nothing_to_save() {
        assert!(SyncState::Clean.begin_save(1).is_none());
        assert!(SyncState::Saving { revision: 1 }.begin_save(2).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_after_commit_is_dirty() {
        let until = Instant::now() + Duration::from_secs(3);
        let committed = SyncState::JustCommitted { until };
        assert_eq!(committed.on_edit(), SyncState::Dirty);
        assert!(!SyncState::Dirty.accepts_authoritative(until));
    }
}
