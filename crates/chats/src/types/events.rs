//! Real-time notification addressing and payloads.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Destination of a notification: a chat's broadcast channel or a user's personal feed.
///
/// Serialized as its key, `chat:<id>` or `user:<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Channel {
    Chat(String),
    User(String),
}

impl Channel {
    const CHAT_PREFIX: &'static str = "chat:";
    const USER_PREFIX: &'static str = "user:";

    pub fn chat(id: impl Into<String>) -> Self {
        Channel::Chat(id.into())
    }

    pub fn user(id: impl Into<String>) -> Self {
        Channel::User(id.into())
    }

    pub fn key(&self) -> String {
        self.to_string()
    }

    pub fn parse(key: &str) -> Option<Self> {
        if let Some(id) = key.strip_prefix(Self::CHAT_PREFIX) {
            (!id.is_empty()).then(|| Channel::Chat(id.to_string()))
        } else if let Some(id) = key.strip_prefix(Self::USER_PREFIX) {
            (!id.is_empty()).then(|| Channel::User(id.to_string()))
        } else {
            None
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Channel::Chat(id) => write!(f, "{}{}", Self::CHAT_PREFIX, id),
            Channel::User(id) => write!(f, "{}{}", Self::USER_PREFIX, id),
        }
    }
}

impl From<Channel> for String {
    fn from(channel: Channel) -> Self {
        channel.key()
    }
}

impl TryFrom<String> for Channel {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Channel::parse(&value).ok_or_else(|| format!("invalid channel key: {value}"))
    }
}

/// Named events published to channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NotificationEvent {
    /// A new message landed; payload is the relevant user or chat id
    #[serde(rename = "send-response")]
    SendResponse,
    /// Seen state changed; payload is the relevant user id
    #[serde(rename = "seen-response")]
    SeenResponse,
    /// Someone added the receiver as a contact; no payload
    #[serde(rename = "contact-response")]
    ContactResponse,
}

impl NotificationEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationEvent::SendResponse => "send-response",
            NotificationEvent::SeenResponse => "seen-response",
            NotificationEvent::ContactResponse => "contact-response",
        }
    }
}

impl fmt::Display for NotificationEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single published event, as delivered to subscribers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub channel: Channel,
    pub event: NotificationEvent,
    pub payload: Option<String>,
}

impl Notification {
    pub fn new(channel: Channel, event: NotificationEvent, payload: Option<&str>) -> Self {
        Self {
            channel,
            event,
            payload: payload.map(str::to_string),
        }
    }
}
