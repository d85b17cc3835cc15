//! Fire-and-forget delivery of change events to the agent.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tenantsync_core::propagation::{Notifier, PropagationEvent};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Tail of each entity's delivery chain.
///
/// A receiver resolves once the previous delivery for that entity finished
/// (its sender is dropped). Entries are removed by the delivery that created
/// them if nothing was queued behind it.
#[derive(Default)]
struct DeliveryChains {
    tails: Mutex<HashMap<String, (u64, oneshot::Receiver<()>)>>,
    next_seq: AtomicU64,
}

/// Position of one delivery in its entity's chain.
struct ChainSlot {
    seq: u64,
    previous: Option<oneshot::Receiver<()>>,
    done: oneshot::Sender<()>,
}

impl DeliveryChains {
    fn enqueue(&self, entity_id: &str) -> ChainSlot {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        let (done, done_rx) = oneshot::channel();
        let previous = self
            .tails
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .insert(entity_id.to_string(), (seq, done_rx))
            .map(|(_, rx)| rx);
        ChainSlot {
            seq,
            previous,
            done,
        }
    }

    fn finish(&self, entity_id: &str, seq: u64) {
        let mut tails = self
            .tails
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if tails.get(entity_id).is_some_and(|(tail, _)| *tail == seq) {
            tails.remove(entity_id);
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.tails
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

/// Sends each event once, in the background, bounded by a timeout.
///
/// Delivery outcome never reaches the write path: failures and timeouts are
/// logged and dropped. There is no retry or queue; a missed event is repaired
/// by the agent's own periodic re-read.
///
/// Events for the same entity are delivered one at a time, in the order
/// they were dispatched. Different entities are delivered concurrently.
#[derive(Clone)]
pub struct PropagationDispatcher {
    notifier: Arc<dyn Notifier>,
    timeout: Duration,
    chains: Arc<DeliveryChains>,
}

impl PropagationDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, timeout: Duration) -> Self {
        Self {
            notifier,
            timeout,
            chains: Arc::new(DeliveryChains::default()),
        }
    }

    /// Delivers one event inline. Returns whether the agent acknowledged it.
    pub async fn notify(&self, event: &PropagationEvent) -> bool {
        match tokio::time::timeout(self.timeout, self.notifier.notify(event)).await {
            Ok(Ok(())) => {
                tracing::debug!(
                    "[Propagation] Delivered {}/{}",
                    event.entity_id,
                    event.section
                );
                true
            }
            Ok(Err(e)) => {
                tracing::warn!(
                    "[Propagation] Failed to notify agent for {}/{}: {}",
                    event.entity_id,
                    event.section,
                    e
                );
                false
            }
            Err(_) => {
                tracing::warn!(
                    "[Propagation] Timed out after {:?} notifying agent for {}/{}",
                    self.timeout,
                    event.entity_id,
                    event.section
                );
                false
            }
        }
    }

    /// Schedules delivery without waiting for it.
    ///
    /// The delivery waits for earlier dispatches of the same entity to
    /// finish, so the agent never sees an older section value after a newer
    /// one. The handle is only useful to tests; callers on the write path
    /// drop it.
    pub fn dispatch(&self, event: PropagationEvent) -> JoinHandle<bool> {
        let dispatcher = self.clone();
        let slot = self.chains.enqueue(&event.entity_id);
        tokio::spawn(async move {
            if let Some(previous) = slot.previous {
                // Err only means the earlier delivery is gone; either way it is over
                let _ = previous.await;
            }
            let delivered = dispatcher.notify(&event).await;
            dispatcher.chains.finish(&event.entity_id, slot.seq);
            drop(slot.done);
            delivered
        })
    }
}
