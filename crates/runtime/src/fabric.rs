//! Redis pub/sub notification fabric shared by every node.
//!
//! Notifications are published as JSON on `<prefix><channel key>`. Each node runs one
//! bridge that pattern-subscribes to `<prefix>*` and hands what it receives to its local
//! [`BroadcastHub`], which feeds that node's WebSocket connections.

use async_trait::async_trait;
use courier_chats::{BroadcastHub, Channel, Notification, NotificationEvent, Notifier, NotifyError};
use futures_util::{future, Stream, StreamExt};
use redis::{
    aio::{ConnectionManager, PubSub},
    AsyncCommands, Client, Msg, RedisResult,
};
use std::pin::pin;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Publishes notifications to redis
#[derive(Clone)]
pub struct RedisNotifier {
    connection: ConnectionManager,
    prefix: String,
}

impl RedisNotifier {
    pub fn new(connection: ConnectionManager, prefix: impl Into<String>) -> Self {
        Self {
            connection,
            prefix: prefix.into(),
        }
    }
}

#[async_trait]
impl Notifier for RedisNotifier {
    async fn publish(
        &self,
        channel: &Channel,
        event: NotificationEvent,
        payload: Option<&str>,
    ) -> Result<(), NotifyError> {
        let body = encode(&Notification::new(channel.clone(), event, payload))?;
        let topic = topic(&self.prefix, channel);

        let mut connection = self.connection.clone();
        let receivers: i64 = connection
            .publish(&topic, body)
            .await
            .map_err(|error| NotifyError::Transport(error.to_string()))?;

        debug!(topic = %topic, event = %event, receivers, "published notification");
        Ok(())
    }
}

/// First delay before resubscribing after the bridge loses redis
const INITIAL_BACKOFF: Duration = Duration::from_millis(500);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Relay every notification published under `prefix` into `hub`.
///
/// The first subscription must succeed. After that the bridge resubscribes with
/// exponential backoff whenever the pub/sub stream ends.
pub async fn spawn_redis_bridge(
    client: Client,
    prefix: String,
    hub: BroadcastHub,
) -> RedisResult<JoinHandle<()>> {
    let pattern = format!("{prefix}*");
    let mut pubsub = subscribe(&client, &pattern).await?;
    info!(pattern = %pattern, "redis bridge subscribed");

    Ok(tokio::spawn(async move {
        loop {
            let relayed = relay(payloads(pubsub.into_on_message()), &hub).await;
            warn!(pattern = %pattern, relayed, "redis bridge lost its subscription");
            pubsub = resubscribe(&client, &pattern).await;
        }
    }))
}

async fn subscribe(client: &Client, pattern: &str) -> RedisResult<PubSub> {
    let mut pubsub = client.get_async_pubsub().await?;
    pubsub.psubscribe(pattern).await?;
    Ok(pubsub)
}

async fn resubscribe(client: &Client, pattern: &str) -> PubSub {
    let mut backoff = INITIAL_BACKOFF;
    loop {
        tokio::time::sleep(backoff).await;
        match subscribe(client, pattern).await {
            Ok(pubsub) => {
                info!(pattern = %pattern, "redis bridge resubscribed");
                return pubsub;
            }
            Err(error) => {
                backoff = next_backoff(backoff);
                warn!(
                    pattern = %pattern,
                    error = %error,
                    retry_in_ms = backoff.as_millis() as u64,
                    "redis bridge resubscribe failed"
                );
            }
        }
    }
}

fn next_backoff(current: Duration) -> Duration {
    current.saturating_mul(2).min(MAX_BACKOFF)
}

/// Payloads of pub/sub messages, skipping the ones that are not text.
fn payloads(messages: impl Stream<Item = Msg>) -> impl Stream<Item = String> {
    messages.filter_map(|message| {
        let payload = match message.get_payload::<String>() {
            Ok(payload) => Some(payload),
            Err(error) => {
                warn!(topic = %message.get_channel_name(), error = %error, "unreadable redis payload");
                None
            }
        };
        future::ready(payload)
    })
}

/// Deliver each well-formed notification to `hub` until `payloads` ends. Returns how many were relayed.
async fn relay(payloads: impl Stream<Item = String>, hub: &BroadcastHub) -> usize {
    let mut payloads = pin!(payloads);
    let mut relayed = 0;
    while let Some(payload) = payloads.next().await {
        match decode(&payload) {
            Some(notification) => {
                hub.deliver(notification).await;
                relayed += 1;
            }
            None => warn!(bytes = payload.len(), "ignoring malformed notification"),
        }
    }
    relayed
}

fn topic(prefix: &str, channel: &Channel) -> String {
    format!("{prefix}{}", channel.key())
}

fn encode(notification: &Notification) -> Result<String, NotifyError> {
    serde_json::to_string(notification).map_err(NotifyError::Encode)
}

fn decode(payload: &str) -> Option<Notification> {
    serde_json::from_str(payload).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic_includes_prefix() {
        assert_eq!(topic("courier:", &Channel::user("bob")), "courier:user:bob");
        assert_eq!(topic("", &Channel::chat("c1")), "chat:c1");
    }

    #[test]
    fn test_wire_format_round_trips() {
        let notification = Notification::new(
            Channel::chat("c1"),
            NotificationEvent::SendResponse,
            Some("c1"),
        );
        let body = encode(&notification).unwrap();
        assert!(body.contains(r#""channel":"chat:c1""#));
        assert!(body.contains(r#""event":"send-response""#));
        assert_eq!(decode(&body), Some(notification));

        assert_eq!(decode(r#"{"channel":"room:1","event":"send-response"}"#), None);
        assert_eq!(decode("not json"), None);
    }

    #[tokio::test]
    async fn test_relay_delivers_until_the_stream_ends() {
        let hub = BroadcastHub::new(8);
        let mut bob = hub.subscribe(&Channel::user("bob")).await;
        let sent = Notification::new(
            Channel::user("bob"),
            NotificationEvent::SendResponse,
            Some("alice"),
        );
        let seen = Notification::new(
            Channel::user("bob"),
            NotificationEvent::SeenResponse,
            Some("alice"),
        );
        let stream = futures_util::stream::iter(vec![
            encode(&sent).unwrap(),
            "not json".to_string(),
            encode(&seen).unwrap(),
        ]);

        assert_eq!(relay(stream, &hub).await, 2);
        assert_eq!(bob.try_recv().unwrap(), sent);
        assert_eq!(bob.try_recv().unwrap(), seen);
        assert!(bob.try_recv().is_err());
    }

    #[test]
    fn test_backoff_doubles_up_to_the_cap() {
        assert_eq!(next_backoff(INITIAL_BACKOFF), Duration::from_secs(1));
        assert_eq!(next_backoff(Duration::from_secs(20)), MAX_BACKOFF);
        assert_eq!(next_backoff(MAX_BACKOFF), MAX_BACKOFF);
    }
}
