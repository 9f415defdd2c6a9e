//! Row entities for the database layer
//!
//! Plain records mirroring the tables; domain rules live in the chats crate.

pub mod chat;
pub mod message;
pub mod user;

pub use chat::{Chat, ChatParticipant, CreateGroupRequest};
pub use message::{ChatMessage, CreateMessageRequest, MessageWithSender};
pub use user::{UpsertUserRequest, User, UserProfile};

use chrono::{SecondsFormat, Utc};

/// Current time as a sortable RFC 3339 timestamp with microsecond precision.
pub(crate) fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
