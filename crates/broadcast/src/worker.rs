//! BroadcastLoop - turns due notifications into refresh signals

use std::sync::Arc;
use std::time::Duration;

use contracts::{Broadcaster, Notification, RealtimeClient, RealtimeMessage, Topic};
use delay_queue::DelayQueue;
use observability::BroadcastResult;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::stats::{BroadcastStats, StatsSnapshot};

/// Shortest accepted wake interval
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Periodic consumer of the notification queue
pub struct BroadcastLoop<B> {
    queue: Arc<DelayQueue<Notification>>,
    broadcaster: Arc<B>,
    interval: Duration,
    stats: Arc<BroadcastStats>,
}

impl<B> BroadcastLoop<B>
where
    B: Broadcaster + 'static,
{
    pub fn new(
        queue: Arc<DelayQueue<Notification>>,
        broadcaster: Arc<B>,
        interval: Duration,
    ) -> Self {
        Self {
            queue,
            broadcaster,
            interval: interval.max(MIN_INTERVAL),
            stats: Arc::new(BroadcastStats::new()),
        }
    }

    pub fn stats(&self) -> Arc<BroadcastStats> {
        Arc::clone(&self.stats)
    }

    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<StatsSnapshot> {
        tokio::spawn(self.run(cancel))
    }

    /// Run until `cancel` fires
    #[instrument(name = "broadcast_loop", skip_all, fields(interval_ms = self.interval.as_millis() as u64))]
    pub async fn run(self, cancel: CancellationToken) -> StatsSnapshot {
        info!("Broadcast loop started");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => self.wake(&cancel),
            }
        }

        let snapshot = self.stats.snapshot();
        info!(
            notifications = snapshot.notifications,
            messages = snapshot.messages_sent,
            failures = snapshot.send_failures,
            "Broadcast loop stopped"
        );
        snapshot
    }

    /// One drain cycle
    fn wake(&self, cancel: &CancellationToken) {
        self.stats.inc_wakeups();
        if self.queue.is_empty() {
            self.stats.inc_idle_wakeups();
            return;
        }

        let clients = self.broadcaster.clients();
        for item in self.queue.drain_ready() {
            self.deliver(&item.value, &clients);
            if cancel.is_cancelled() {
                debug!("Cancelled mid-drain");
                break;
            }
        }
        observability::record_queue_depth(self.queue.len());
    }

    fn deliver(&self, notification: &Notification, clients: &[B::Client]) {
        self.stats.inc_notifications();
        let topic = notification.topic();
        let mut matched = false;

        let listeners = clients.iter().filter(|client| {
            client.is_subscribed(&topic)
                && client.user_id().as_ref() == Some(&notification.user_id)
        });
        for client in listeners {
            matched = true;
            match client.send(RealtimeMessage::refresh(topic.as_str())) {
                Ok(()) => {
                    self.stats.inc_messages_sent();
                    observability::record_broadcast(BroadcastResult::Sent);
                }
                Err(e) => {
                    warn!(client = %client.id(), error = %e, "Refresh signal dropped");
                    self.stats.inc_send_failures();
                    observability::record_broadcast(BroadcastResult::Failed);
                }
            }
        }

        if !matched {
            self.stats.inc_unmatched();
        }
        debug!(topic = %topic, matched, "Notification broadcast");
    }
}
