use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::mpsc;

use easel_core::events::{ProgressEvent, ProgressPayload};
use easel_core::ids::SessionId;
use easel_core::slides::PipelineResult;

/// Registry tuning. The defaults match the deployed service; tests shrink
/// them to keep the clock-driven paths fast.
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    /// A session that neither completes nor disconnects is force-evicted
    /// this long after registration.
    pub inactivity_timeout: Duration,
    /// Delay between the completion event and channel teardown, so the
    /// final frame flushes before the stream closes.
    pub completion_grace: Duration,
    pub event_buffer: usize,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            inactivity_timeout: Duration::from_secs(600),
            completion_grace: Duration::from_secs(1),
            event_buffer: 64,
        }
    }
}

struct SessionEntry {
    tx: mpsc::Sender<ProgressEvent>,
    epoch: u64,
    created_at: DateTime<Utc>,
}

/// The subscriber's end of a session's progress channel. Exclusively owned
/// by whoever opened the subscription; the registry keeps only the sender.
pub struct SubscriberHandle {
    pub session_id: SessionId,
    epoch: u64,
    pub rx: mpsc::Receiver<ProgressEvent>,
}

impl SubscriberHandle {
    pub fn epoch(&self) -> u64 {
        self.epoch
    }
}

/// Process-wide table of active progress sessions; the only component that
/// writes to subscriber channels, and the only cross-request shared state.
/// All delivery is best-effort: a missing or dead session costs live
/// visibility, never correctness of the synchronous result path.
pub struct SessionRegistry {
    sessions: DashMap<SessionId, SessionEntry>,
    config: RegistryConfig,
    epochs: AtomicU64,
    self_ref: Weak<SessionRegistry>,
}

impl SessionRegistry {
    pub fn new(config: RegistryConfig) -> Arc<Self> {
        Arc::new_cyclic(|weak| Self {
            sessions: DashMap::new(),
            config,
            epochs: AtomicU64::new(0),
            self_ref: weak.clone(),
        })
    }

    /// Create (or silently replace) the session entry and immediately
    /// enqueue a `connected` event. An inactivity timer is armed; unless
    /// the session completes or disconnects first, the entry is evicted
    /// when it fires. Replacement invalidates the prior entry's timer.
    pub fn register(&self, session_id: &SessionId) -> SubscriberHandle {
        let epoch = self.epochs.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = mpsc::channel(self.config.event_buffer);

        let entry = SessionEntry {
            tx: tx.clone(),
            epoch,
            created_at: Utc::now(),
        };
        if self.sessions.insert(session_id.clone(), entry).is_some() {
            tracing::info!(session_id = %session_id, "Replaced existing progress subscription");
        }

        if tx.try_send(ProgressEvent::connected(session_id.clone())).is_err() {
            tracing::warn!(session_id = %session_id, "Failed to enqueue connected event");
        }

        self.spawn_eviction(
            session_id.clone(),
            epoch,
            self.config.inactivity_timeout,
            "Progress session expired without completion",
        );

        SubscriberHandle {
            session_id: session_id.clone(),
            epoch,
            rx,
        }
    }

    /// Enqueue a `progress` event. Returns false when no observer is
    /// registered or the channel is gone; callers log and continue.
    pub fn publish_progress(&self, session_id: &SessionId, payload: ProgressPayload) -> bool {
        self.publish(session_id, ProgressEvent::progress(session_id.clone(), payload))
    }

    /// Enqueue the final `completed` event, then evict the entry after the
    /// grace delay so the frame flushes before the channel closes.
    pub fn publish_completion(&self, session_id: &SessionId, result: PipelineResult) -> bool {
        let epoch = match self.sessions.get(session_id) {
            Some(entry) => entry.epoch,
            None => {
                tracing::trace!(session_id = %session_id, "No subscriber for session, dropping completion");
                return false;
            }
        };

        let delivered = self.publish(session_id, ProgressEvent::completed(session_id.clone(), result));
        if delivered {
            self.spawn_eviction(
                session_id.clone(),
                epoch,
                self.config.completion_grace,
                "Progress session completed",
            );
        }
        delivered
    }

    /// Explicit teardown (observer closed the stream). Idempotent; a second
    /// call is a no-op returning false.
    pub fn disconnect(&self, session_id: &SessionId) -> bool {
        self.sessions.remove(session_id).is_some()
    }

    /// Teardown scoped to one subscription: removes the entry only if it
    /// still belongs to `epoch`, so a replaced subscriber's drop cannot
    /// evict its successor.
    pub fn release(&self, session_id: &SessionId, epoch: u64) -> bool {
        self.evict_if_epoch(session_id, epoch)
    }

    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }

    pub fn session_age(&self, session_id: &SessionId) -> Option<chrono::Duration> {
        self.sessions
            .get(session_id)
            .map(|entry| Utc::now() - entry.created_at)
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    fn publish(&self, session_id: &SessionId, event: ProgressEvent) -> bool {
        let Some(entry) = self.sessions.get(session_id) else {
            tracing::trace!(session_id = %session_id, "No subscriber for session, dropping event");
            return false;
        };
        let tx = entry.tx.clone();
        let epoch = entry.epoch;
        drop(entry);

        match tx.try_send(event) {
            Ok(()) => true,
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(
                    session_id = %session_id,
                    event_type = event.event_type(),
                    "Progress buffer full, dropping event"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                if self.evict_if_epoch(session_id, epoch) {
                    tracing::warn!(session_id = %session_id, "Subscriber gone, evicting session");
                }
                false
            }
        }
    }

    fn spawn_eviction(&self, session_id: SessionId, epoch: u64, delay: Duration, reason: &'static str) {
        let Some(registry) = self.self_ref.upgrade() else {
            return;
        };
        let _ = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if registry.evict_if_epoch(&session_id, epoch) {
                tracing::info!(session_id = %session_id, "{reason}");
            }
        });
    }

    fn evict_if_epoch(&self, session_id: &SessionId, epoch: u64) -> bool {
        self.sessions
            .remove_if(session_id, |_, entry| entry.epoch == epoch)
            .is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use easel_core::slides::{GenerationApproach, GenerationStats, SlideTask};
    use std::collections::BTreeMap;

    fn small_config() -> RegistryConfig {
        RegistryConfig {
            inactivity_timeout: Duration::from_millis(50),
            completion_grace: Duration::from_millis(20),
            event_buffer: 8,
        }
    }

    fn payload(completed: usize, total: usize) -> ProgressPayload {
        ProgressPayload {
            progress: (1..=completed)
                .map(|n| SlideTask::completed(n as u32, format!("Slide {n}"), "<x/>"))
                .collect(),
            completed,
            total,
            error: None,
        }
    }

    fn result() -> PipelineResult {
        PipelineResult {
            slides: vec![SlideTask::completed(1, "Intro", "<x/>")],
            thumbnails: BTreeMap::new(),
            stats: GenerationStats {
                total_requested: 1,
                total_completed: 1,
                approach: GenerationApproach::PlanDriven,
            },
        }
    }

    #[tokio::test]
    async fn register_delivers_connected_first() {
        let registry = SessionRegistry::new(RegistryConfig::default());
        let sid = SessionId::from_raw("abc");
        let mut handle = registry.register(&sid);

        let event = handle.rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "connected");
        assert_eq!(event.session_id(), &sid);
    }

    #[tokio::test]
    async fn publish_to_unregistered_session_returns_false() {
        let registry = SessionRegistry::new(RegistryConfig::default());
        let delivered = registry.publish_progress(&SessionId::from_raw("ghost"), payload(0, 1));
        assert!(!delivered);
    }

    #[tokio::test]
    async fn publish_to_other_session_does_not_leak() {
        let registry = SessionRegistry::new(RegistryConfig::default());
        let abc = SessionId::from_raw("abc");
        let mut handle = registry.register(&abc);
        let _ = handle.rx.recv().await.unwrap(); // connected

        let delivered = registry.publish_progress(&SessionId::from_raw("xyz"), payload(1, 1));
        assert!(!delivered);

        // "abc" receives nothing beyond its connected event
        assert!(handle.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn events_arrive_in_publish_order() {
        let registry = SessionRegistry::new(RegistryConfig::default());
        let sid = SessionId::from_raw("abc");
        let mut handle = registry.register(&sid);
        let _ = handle.rx.recv().await.unwrap();

        for completed in 1..=3 {
            assert!(registry.publish_progress(&sid, payload(completed, 3)));
        }

        let mut counts = Vec::new();
        for _ in 0..3 {
            if let ProgressEvent::Progress { data, .. } = handle.rx.recv().await.unwrap() {
                counts.push(data.completed);
            }
        }
        assert_eq!(counts, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn completion_evicts_after_grace() {
        let registry = SessionRegistry::new(small_config());
        let sid = SessionId::from_raw("abc");
        let mut handle = registry.register(&sid);
        let _ = handle.rx.recv().await.unwrap();

        assert!(registry.publish_completion(&sid, result()));
        let event = handle.rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "completed");

        // entry still present inside the grace window
        assert_eq!(registry.active_sessions(), 1);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert_eq!(registry.active_sessions(), 0);

        // channel closed from the registry side
        assert!(handle.rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn idle_session_expires_and_stays_unusable() {
        let registry = SessionRegistry::new(small_config());
        let sid = SessionId::from_raw("abc");
        let _handle = registry.register(&sid);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(registry.active_sessions(), 0);
        assert!(!registry.publish_progress(&sid, payload(1, 1)));

        // eviction is idempotent
        assert!(!registry.disconnect(&sid));
        assert!(!registry.disconnect(&sid));
    }

    #[tokio::test]
    async fn replacement_registration_wins() {
        let registry = SessionRegistry::new(RegistryConfig::default());
        let sid = SessionId::from_raw("abc");

        let mut first = registry.register(&sid);
        let _ = first.rx.recv().await.unwrap();

        let mut second = registry.register(&sid);
        let _ = second.rx.recv().await.unwrap();
        assert_eq!(registry.active_sessions(), 1);

        // old channel is closed once its sender is dropped with the entry
        assert!(first.rx.recv().await.is_none());

        assert!(registry.publish_progress(&sid, payload(1, 1)));
        let event = second.rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "progress");
    }

    #[tokio::test]
    async fn stale_release_does_not_evict_successor() {
        let registry = SessionRegistry::new(RegistryConfig::default());
        let sid = SessionId::from_raw("abc");

        let first = registry.register(&sid);
        let first_epoch = first.epoch();
        let _second = registry.register(&sid);

        assert!(!registry.release(&sid, first_epoch));
        assert_eq!(registry.active_sessions(), 1);
    }

    #[tokio::test]
    async fn replacement_outlives_old_timer() {
        let registry = SessionRegistry::new(small_config());
        let sid = SessionId::from_raw("abc");

        let _first = registry.register(&sid);
        tokio::time::sleep(Duration::from_millis(30)).await;
        let _second = registry.register(&sid);

        // old entry's timer fires now; the replacement must survive it
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(registry.active_sessions(), 1);
    }

    #[tokio::test]
    async fn dropped_subscriber_is_evicted_on_publish() {
        let registry = SessionRegistry::new(RegistryConfig::default());
        let sid = SessionId::from_raw("abc");
        let handle = registry.register(&sid);
        drop(handle);

        assert!(!registry.publish_progress(&sid, payload(1, 1)));
        assert_eq!(registry.active_sessions(), 0);
    }

    #[tokio::test]
    async fn full_buffer_drops_event_without_evicting() {
        let registry = SessionRegistry::new(RegistryConfig {
            event_buffer: 1,
            ..RegistryConfig::default()
        });
        let sid = SessionId::from_raw("abc");
        let _handle = registry.register(&sid); // connected fills the buffer

        assert!(!registry.publish_progress(&sid, payload(1, 1)));
        assert_eq!(registry.active_sessions(), 1);
    }

    #[tokio::test]
    async fn session_age_is_tracked() {
        let registry = SessionRegistry::new(RegistryConfig::default());
        let sid = SessionId::from_raw("abc");
        let _handle = registry.register(&sid);
        assert!(registry.session_age(&sid).is_some());
        assert!(registry.session_age(&SessionId::from_raw("ghost")).is_none());
    }
}
