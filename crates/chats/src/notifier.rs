//! Publish/subscribe abstraction used for real-time fan-out.
//!
//! Delivery is fire-and-forget: a channel without subscribers drops the event and
//! clients catch up through message history.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, warn};

use crate::types::{Channel, Notification, NotificationEvent};

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification transport unavailable: {0}")]
    Transport(String),
    #[error("failed to encode notification: {0}")]
    Encode(#[from] serde_json::Error),
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn publish(
        &self,
        channel: &Channel,
        event: NotificationEvent,
        payload: Option<&str>,
    ) -> Result<(), NotifyError>;
}

/// Publish and swallow failures. Notifications are best-effort.
pub(crate) async fn publish_best_effort(
    notifier: &dyn Notifier,
    channel: Channel,
    event: NotificationEvent,
    payload: Option<&str>,
) {
    if let Err(error) = notifier.publish(&channel, event, payload).await {
        warn!(channel = %channel, event = %event, error = %error, "dropping notification");
    }
}

/// In-process notification fabric: one broadcast sender per channel key.
#[derive(Clone)]
pub struct BroadcastHub {
    channels: Arc<RwLock<HashMap<String, broadcast::Sender<Notification>>>>,
    capacity: usize,
}

impl BroadcastHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Receive every notification published to `channel` from now on
    pub async fn subscribe(&self, channel: &Channel) -> broadcast::Receiver<Notification> {
        let mut channels = self.channels.write().await;
        channels
            .entry(channel.key())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Hand a notification to local subscribers. Returns how many received it.
    pub async fn deliver(&self, notification: Notification) -> usize {
        let key = notification.channel.key();

        let delivered = {
            let channels = self.channels.read().await;
            match channels.get(&key) {
                Some(sender) => sender.send(notification).ok(),
                None => Some(0),
            }
        };

        match delivered {
            Some(count) => {
                debug!(channel = %key, receivers = count, "delivered notification");
                count
            }
            None => {
                // every receiver is gone, forget the channel
                let mut channels = self.channels.write().await;
                if channels
                    .get(&key)
                    .is_some_and(|sender| sender.receiver_count() == 0)
                {
                    channels.remove(&key);
                }
                debug!(channel = %key, "no subscribers, notification dropped");
                0
            }
        }
    }
}

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new(100)
    }
}

#[async_trait]
impl Notifier for BroadcastHub {
    async fn publish(
        &self,
        channel: &Channel,
        event: NotificationEvent,
        payload: Option<&str>,
    ) -> Result<(), NotifyError> {
        self.deliver(Notification::new(channel.clone(), event, payload))
            .await;
        Ok(())
    }
}
