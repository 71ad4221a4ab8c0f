use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cards::{defect_reminder_card, draft_ready_card, MessageCard, NotificationEvent};
use crate::channel::DeliveryChannel;

const DELIVERY_TIMEOUT: StdDuration = StdDuration::from_secs(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BatchCategory {
    DraftReady,
    DefectReminder,
}

impl BatchCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DraftReady => "draft_ready",
            Self::DefectReminder => "defect_reminder",
        }
    }
}

#[derive(Clone, Debug)]
pub struct BatcherSettings {
    pub window_hours: u32,
    pub portal_base_url: String,
}

impl Default for BatcherSettings {
    fn default() -> Self {
        Self { window_hours: 24, portal_base_url: "http://localhost:8080".to_owned() }
    }
}

#[derive(Default)]
struct BatchState {
    pending: Vec<NotificationEvent>,
    last_sent_at: Option<DateTime<Utc>>,
}

/// Collapses bursts of per-document events into one card per rolling window.
///
/// Queues are process-local; events still pending at shutdown are dropped.
pub struct NotificationBatcher {
    channel: Arc<dyn DeliveryChannel>,
    settings: BatcherSettings,
    draft_ready: Mutex<BatchState>,
    defect_reminder: Mutex<BatchState>,
}

impl NotificationBatcher {
    pub fn new(channel: Arc<dyn DeliveryChannel>, settings: BatcherSettings) -> Self {
        Self {
            channel,
            settings,
            draft_ready: Mutex::new(BatchState::default()),
            defect_reminder: Mutex::new(BatchState::default()),
        }
    }

    pub async fn enqueue(&self, category: BatchCategory, event: NotificationEvent) {
        if let Some(handle) = self.enqueue_at(category, event, Utc::now()).await {
            drop(handle);
        }
    }

    /// Appends the event and flushes if the window allows it. Returns the
    /// delivery task handle when a flush was triggered so callers can await it.
    pub async fn enqueue_at(
        &self,
        category: BatchCategory,
        event: NotificationEvent,
        now: DateTime<Utc>,
    ) -> Option<JoinHandle<()>> {
        let mut state = self.state(category).lock().await;
        state.pending.push(event);

        if self.window_open(&state, now) {
            Some(self.flush_locked(category, &mut state, now))
        } else {
            debug!(
                event_name = "notify.batch.queued",
                category = category.as_str(),
                pending = state.pending.len(),
                "event queued inside batch window"
            );
            None
        }
    }

    /// Flushes any category whose window has elapsed. Driven by the periodic
    /// sweep so queued events go out even when no new event arrives.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> Vec<JoinHandle<()>> {
        let mut handles = Vec::new();
        for category in [BatchCategory::DraftReady, BatchCategory::DefectReminder] {
            let mut state = self.state(category).lock().await;
            if !state.pending.is_empty() && self.window_open(&state, now) {
                handles.push(self.flush_locked(category, &mut state, now));
            }
        }
        handles
    }

    pub fn spawn_sweep(self: Arc<Self>, interval_minutes: u32) -> JoinHandle<()> {
        let period = StdDuration::from_secs(u64::from(interval_minutes.max(1)) * 60);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let handles = self.sweep_at(Utc::now()).await;
                for handle in handles {
                    let _ = handle.await;
                }
            }
        })
    }

    fn state(&self, category: BatchCategory) -> &Mutex<BatchState> {
        match category {
            BatchCategory::DraftReady => &self.draft_ready,
            BatchCategory::DefectReminder => &self.defect_reminder,
        }
    }

    fn window_open(&self, state: &BatchState, now: DateTime<Utc>) -> bool {
        match state.last_sent_at {
            None => true,
            Some(last) => now - last >= Duration::hours(i64::from(self.settings.window_hours)),
        }
    }

    // Swaps the queue and stamps the send time under the lock; the delivery
    // call itself runs in a spawned task so the lock is never held across it.
    fn flush_locked(
        &self,
        category: BatchCategory,
        state: &mut BatchState,
        now: DateTime<Utc>,
    ) -> JoinHandle<()> {
        let events = std::mem::take(&mut state.pending);
        state.last_sent_at = Some(now);

        let card = self.render(category, &events);
        let channel = Arc::clone(&self.channel);
        let count = events.len();

        tokio::spawn(async move {
            match tokio::time::timeout(DELIVERY_TIMEOUT, channel.deliver(&card)).await {
                Ok(Ok(())) => {
                    debug!(
                        event_name = "notify.batch.sent",
                        category = category.as_str(),
                        count,
                        "delivered notification batch"
                    );
                }
                Ok(Err(error)) => {
                    warn!(
                        event_name = "notify.batch.failed",
                        category = category.as_str(),
                        count,
                        error = %error,
                        "notification delivery failed; batch dropped"
                    );
                }
                Err(_) => {
                    warn!(
                        event_name = "notify.batch.failed",
                        category = category.as_str(),
                        count,
                        "notification delivery timed out; batch dropped"
                    );
                }
            }
        })
    }

    fn render(&self, category: BatchCategory, events: &[NotificationEvent]) -> MessageCard {
        match category {
            BatchCategory::DraftReady => {
                draft_ready_card(events, &self.settings.portal_base_url)
            }
            BatchCategory::DefectReminder => {
                defect_reminder_card(events, &self.settings.portal_base_url)
            }
        }
    }
}
