use futures::future::BoxFuture;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tenantsync_core::client::ConfigClient;
use tenantsync_core::config::SessionConfig;
use tenantsync_core::entity::{
    ConfigEntity, merge_shallow, validate_entity_id, validate_section_name,
};
use tenantsync_core::error::Result;
use tokio::time::Instant;

use super::debounce::{CommitFn, DebouncedCommit, FlushPredicate, Trigger};
use super::state::SyncState;

/// Timing and flush behavior of an [`EditSession`].
#[derive(Clone)]
pub struct SessionOptions {
    pub quiet_period: Duration,
    pub just_committed: Duration,
    /// Edits for which this returns true are written immediately.
    pub flush_now: FlushPredicate,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self::from(&SessionConfig::default())
    }
}

impl From<&SessionConfig> for SessionOptions {
    fn from(config: &SessionConfig) -> Self {
        Self {
            quiet_period: Duration::from_millis(config.quiet_period_ms),
            just_committed: Duration::from_millis(config.just_committed_ms),
            flush_now: Arc::new(|_: &str, _: &Value| false),
        }
    }
}

impl SessionOptions {
    /// Writes edits to the named sections without waiting for the quiet
    /// period.
    pub fn flush_immediately(mut self, sections: &[&str]) -> Self {
        let sections: Vec<String> = sections.iter().map(|s| s.to_string()).collect();
        self.flush_now = Arc::new(move |section: &str, _: &Value| {
            sections.iter().any(|s| s == section)
        });
        self
    }
}

struct SectionBuffer {
    value: Value,
    state: SyncState,
    /// Bumped on every local edit.
    revision: u64,
}

impl SectionBuffer {
    fn clean(value: Value) -> Self {
        Self {
            value,
            state: SyncState::Clean,
            revision: 0,
        }
    }
}

struct Buffers {
    initial_load: bool,
    sections: BTreeMap<String, SectionBuffer>,
}

struct SessionShared {
    entity_id: String,
    client: Arc<dyn ConfigClient>,
    just_committed: Duration,
    buffers: Mutex<Buffers>,
    /// Serializes commits so windows close in order.
    commit_lock: tokio::sync::Mutex<()>,
    debounce: DebouncedCommit,
    closed: AtomicBool,
}

/// Optimistic working copy of one entity, as held by one dashboard tab.
///
/// Edits land in the local buffer immediately and reach the store after a
/// quiet period. Authoritative reads never overwrite a section with edits in
/// flight or just committed. Dropping or closing the session discards
/// unflushed edits.
pub struct EditSession {
    shared: Arc<SessionShared>,
}

impl EditSession {
    pub fn new(
        entity_id: impl Into<String>,
        client: Arc<dyn ConfigClient>,
        options: SessionOptions,
    ) -> Result<Self> {
        let entity_id = entity_id.into();
        validate_entity_id(&entity_id)?;

        let shared = Arc::new_cyclic(|weak: &Weak<SessionShared>| {
            let weak = weak.clone();
            let commit: CommitFn = Arc::new(move || -> BoxFuture<'static, ()> {
                let weak = weak.clone();
                Box::pin(async move {
                    if let Some(shared) = weak.upgrade() {
                        // Failures reschedule themselves; nothing to report here.
                        let _ = shared.flush().await;
                    }
                })
            });

            SessionShared {
                entity_id,
                client,
                just_committed: options.just_committed,
                buffers: Mutex::new(Buffers {
                    initial_load: true,
                    sections: BTreeMap::new(),
                }),
                commit_lock: tokio::sync::Mutex::new(()),
                debounce: DebouncedCommit::new(options.quiet_period, options.flush_now, commit),
                closed: AtomicBool::new(false),
            }
        });

        Ok(Self { shared })
    }

    pub fn entity_id(&self) -> &str {
        &self.shared.entity_id
    }

    /// Initial load: the authoritative entity replaces the buffer.
    pub async fn load(&self) -> Result<()> {
        self.refresh().await
    }

    /// Pulls the authoritative entity and reconciles it with the buffer.
    pub async fn refresh(&self) -> Result<()> {
        let entity = self.shared.client.read_entity(&self.shared.entity_id).await?;
        self.shared.apply_authoritative(entity);
        Ok(())
    }

    /// Reconciles an authoritative entity obtained elsewhere (e.g. a poll).
    pub fn apply_authoritative(&self, entity: ConfigEntity) {
        self.shared.apply_authoritative(entity);
    }

    /// Shallow-merges `partial` into the local section and schedules a commit.
    ///
    /// Never blocks on an in-flight save. For sections matched by the flush
    /// predicate the commit runs before this returns and its error, if any,
    /// is returned.
    pub async fn update_section(&self, section: &str, partial: Value) -> Result<()> {
        validate_section_name(section)?;

        let value = self.shared.apply_edit(section, &partial);
        match self.shared.debounce.touch(section, &value) {
            Trigger::Scheduled => Ok(()),
            Trigger::Immediate => self.shared.flush().await,
        }
    }

    /// Writes every dirty section now.
    pub async fn flush(&self) -> Result<()> {
        self.shared.debounce.cancel();
        self.shared.flush().await
    }

    /// Tears the session down. Pending edits are not flushed.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::SeqCst);
        self.shared.debounce.cancel();
        tracing::debug!(
            "[EditSession] Closed session for {}",
            self.shared.entity_id
        );
    }

    pub fn section(&self, name: &str) -> Option<Value> {
        self.shared
            .buffers()
            .sections
            .get(name)
            .map(|buffer| buffer.value.clone())
    }

    pub fn state(&self, name: &str) -> Option<SyncState> {
        let now = Instant::now();
        self.shared
            .buffers()
            .sections
            .get(name)
            .map(|buffer| buffer.state.settle(now))
    }

    /// Whether any section has edits not yet acknowledged by the store.
    pub fn is_dirty(&self) -> bool {
        self.shared
            .buffers()
            .sections
            .values()
            .any(|buffer| buffer.state.is_pending())
    }

    pub fn is_initial_load(&self) -> bool {
        self.shared.buffers().initial_load
    }

    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        self.shared
            .buffers()
            .sections
            .iter()
            .map(|(name, buffer)| (name.clone(), buffer.value.clone()))
            .collect()
    }
}

impl SessionShared {
    fn buffers(&self) -> MutexGuard<'_, Buffers> {
        self.buffers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Applies a local edit and returns the section's new value.
    fn apply_edit(&self, section: &str, partial: &Value) -> Value {
        let mut buffers = self.buffers();
        let buffer = buffers
            .sections
            .entry(section.to_string())
            .or_insert_with(|| SectionBuffer::clean(Value::Object(Default::default())));

        buffer.value = merge_shallow(&buffer.value, partial);
        buffer.revision += 1;
        buffer.state = buffer.state.on_edit();
        buffer.value.clone()
    }

    fn apply_authoritative(&self, entity: ConfigEntity) {
        let now = Instant::now();
        let mut buffers = self.buffers();

        if buffers.initial_load {
            buffers.sections = entity
                .sections
                .into_iter()
                .map(|(name, value)| (name, SectionBuffer::clean(value)))
                .collect();
            buffers.initial_load = false;
            tracing::debug!("[EditSession] Initial load of {}", self.entity_id);
            return;
        }

        let mut skipped = 0usize;
        buffers.sections.retain(|name, buffer| {
            entity.sections.contains_key(name) || !buffer.state.accepts_authoritative(now)
        });
        for (name, value) in entity.sections {
            match buffers.sections.get_mut(&name) {
                Some(buffer) => {
                    buffer.state = buffer.state.settle(now);
                    if buffer.state == SyncState::Clean {
                        buffer.value = value;
                    } else {
                        skipped += 1;
                    }
                }
                None => {
                    buffers.sections.insert(name, SectionBuffer::clean(value));
                }
            }
        }

        if skipped > 0 {
            tracing::debug!(
                "[EditSession] Kept {} local section(s) of {} over authoritative read",
                skipped,
                self.entity_id
            );
        }
    }

    /// Moves every dirty section to saving and writes them one by one.
    async fn flush(&self) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Ok(());
        }
        let _commit = self.commit_lock.lock().await;

        let batch: Vec<(String, Value, u64)> = {
            let mut buffers = self.buffers();
            buffers
                .sections
                .iter_mut()
                .filter_map(|(name, buffer)| {
                    let saving = buffer.state.begin_save(buffer.revision)?;
                    buffer.state = saving;
                    Some((name.clone(), buffer.value.clone(), buffer.revision))
                })
                .collect()
        };
        if batch.is_empty() {
            return Ok(());
        }

        let mut first_error = None;
        for (section, value, revision) in batch {
            let result = self
                .client
                .write_section(&self.entity_id, &section, &value)
                .await;

            let mut buffers = self.buffers();
            let Some(buffer) = buffers.sections.get_mut(&section) else {
                continue;
            };
            match result {
                Ok(stored) => {
                    if buffer.revision == revision {
                        buffer.value = stored;
                    }
                    buffer.state = buffer
                        .state
                        .on_commit_ok(buffer.revision, Instant::now() + self.just_committed);
                }
                Err(e) => {
                    buffer.state = buffer.state.on_commit_err();
                    tracing::warn!(
                        "[EditSession] Failed to save {}/{}: {}",
                        self.entity_id,
                        section,
                        e
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => {
                self.debounce.schedule();
                Err(e)
            }
            None => Ok(()),
        }
    }
}
