//! One WebSocket connection: its channel subscriptions and client event loop

use axum::extract::ws::{Message, WebSocket};
use courier_chats::{BroadcastHub, Channel, Notification};
use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::state::GatewayState;

const OUTBOUND_BUFFER: usize = 64;

/// Client events received from WebSocket
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Heartbeat to keep connection alive
    Ping,
    /// Follow a chat channel the caller participates in
    Subscribe { chat_id: String },
    Unsubscribe { chat_id: String },
}

/// Server events sent to WebSocket clients
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Sent once the initial subscriptions are in place
    Hello {
        user_id: String,
        channels: Vec<String>,
    },
    Pong,
    Subscribed { chat_id: String },
    Unsubscribed { chat_id: String },
    Error { message: String },
    /// A notification published on one of the subscribed channels
    Notification(Notification),
}

/// Forwarding tasks keyed by channel. Dropping the set stops every task.
#[derive(Default)]
struct Subscriptions {
    tasks: HashMap<String, JoinHandle<()>>,
}

impl Subscriptions {
    async fn subscribe(
        &mut self,
        hub: &BroadcastHub,
        channel: Channel,
        outbound: &mpsc::Sender<ServerEvent>,
    ) -> bool {
        let key = channel.key();
        if self.tasks.contains_key(&key) {
            return false;
        }

        let receiver = hub.subscribe(&channel).await;
        let task = tokio::spawn(forward(receiver, outbound.clone(), key.clone()));
        self.tasks.insert(key, task);
        true
    }

    fn unsubscribe(&mut self, channel: &Channel) -> bool {
        match self.tasks.remove(&channel.key()) {
            Some(task) => {
                task.abort();
                true
            }
            None => false,
        }
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.tasks.keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl Drop for Subscriptions {
    fn drop(&mut self) {
        for task in self.tasks.values() {
            task.abort();
        }
    }
}

async fn forward(
    mut receiver: broadcast::Receiver<Notification>,
    outbound: mpsc::Sender<ServerEvent>,
    key: String,
) {
    loop {
        match receiver.recv().await {
            Ok(notification) => {
                if outbound
                    .send(ServerEvent::Notification(notification))
                    .await
                    .is_err()
                {
                    break;
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(channel = %key, skipped, "websocket subscriber lagged");
            }
            Err(broadcast::error::RecvError::Closed) => break,
        }
    }
}

pub(crate) async fn handle_socket(socket: WebSocket, state: Arc<GatewayState>, user_id: String) {
    let (mut sink, mut stream) = socket.split();
    let (outbound, mut outbound_rx) = mpsc::channel::<ServerEvent>(OUTBOUND_BUFFER);

    let send_task = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(text) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(error) => warn!(error = %error, "failed to encode websocket event"),
            }
        }
    });

    let mut subscriptions = Subscriptions::default();
    let mut channels = vec![Channel::user(user_id.as_str())];
    match state.services.chats.groups_for(&user_id).await {
        Ok(groups) => channels.extend(groups.iter().map(|group| group.channel())),
        Err(error) => warn!(user_id = %user_id, error = %error, "could not load groups"),
    }
    for channel in channels {
        subscriptions.subscribe(&state.hub, channel, &outbound).await;
    }

    let _ = outbound
        .send(ServerEvent::Hello {
            user_id: user_id.clone(),
            channels: subscriptions.keys(),
        })
        .await;

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => {
                let reply = match serde_json::from_str::<ClientEvent>(&text) {
                    Ok(event) => {
                        handle_client_event(event, &state, &user_id, &mut subscriptions, &outbound)
                            .await
                    }
                    Err(error) => ServerEvent::Error {
                        message: format!("Unrecognised event: {}", error),
                    },
                };
                if outbound.send(reply).await.is_err() {
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(error) => {
                debug!(user_id = %user_id, error = %error, "websocket receive failed");
                break;
            }
        }
    }

    drop(subscriptions);
    send_task.abort();
    info!(user_id = %user_id, "websocket closed");
}

async fn handle_client_event(
    event: ClientEvent,
    state: &GatewayState,
    user_id: &str,
    subscriptions: &mut Subscriptions,
    outbound: &mpsc::Sender<ServerEvent>,
) -> ServerEvent {
    match event {
        ClientEvent::Ping => ServerEvent::Pong,
        ClientEvent::Subscribe { chat_id } => {
            match state.services.chats.is_participant(&chat_id, user_id).await {
                Ok(true) => {
                    subscriptions
                        .subscribe(&state.hub, Channel::chat(chat_id.as_str()), outbound)
                        .await;
                    ServerEvent::Subscribed { chat_id }
                }
                Ok(false) => ServerEvent::Error {
                    message: format!("Not a participant of chat {}", chat_id),
                },
                Err(error) => ServerEvent::Error {
                    message: error.to_string(),
                },
            }
        }
        ClientEvent::Unsubscribe { chat_id } => {
            subscriptions.unsubscribe(&Channel::chat(chat_id.as_str()));
            ServerEvent::Unsubscribed { chat_id }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use courier_chats::NotificationEvent;
    use std::time::Duration;

    #[test]
    fn test_client_events_parse() {
        assert_eq!(
            serde_json::from_str::<ClientEvent>(r#"{"type":"ping"}"#).unwrap(),
            ClientEvent::Ping
        );
        assert_eq!(
            serde_json::from_str::<ClientEvent>(r#"{"type":"subscribe","chat_id":"c1"}"#).unwrap(),
            ClientEvent::Subscribe {
                chat_id: "c1".to_string()
            }
        );
        assert!(serde_json::from_str::<ClientEvent>(r#"{"type":"send_message"}"#).is_err());
    }

    #[test]
    fn test_notification_event_shape() {
        let event = ServerEvent::Notification(Notification::new(
            Channel::user("bob"),
            NotificationEvent::SendResponse,
            Some("alice"),
        ));

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "notification");
        assert_eq!(value["channel"], "user:bob");
        assert_eq!(value["event"], "send-response");
        assert_eq!(value["payload"], "alice");
    }

    #[tokio::test]
    async fn test_subscriptions_forward_until_dropped() {
        let hub = BroadcastHub::new(8);
        let (outbound, mut outbound_rx) = mpsc::channel(8);
        let channel = Channel::chat("room");

        let mut subscriptions = Subscriptions::default();
        assert!(subscriptions.subscribe(&hub, channel.clone(), &outbound).await);
        assert!(!subscriptions.subscribe(&hub, channel.clone(), &outbound).await);
        assert_eq!(subscriptions.keys(), vec!["chat:room".to_string()]);

        let notification = Notification::new(channel.clone(), NotificationEvent::SeenResponse, None);
        assert_eq!(hub.deliver(notification.clone()).await, 1);

        let received = tokio::time::timeout(Duration::from_secs(1), outbound_rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(received, ServerEvent::Notification(notification));

        assert!(subscriptions.unsubscribe(&channel));
        assert!(!subscriptions.unsubscribe(&channel));
    }
}
