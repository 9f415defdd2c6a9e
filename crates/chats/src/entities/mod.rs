//! Domain entities for the chat system.

pub mod chat;
pub mod contact;
pub mod message;

pub use chat::{Chat, ChatKind};
pub use contact::ContactEntry;
pub use message::{
    ContentColumns, HistoryMessage, HistoryPage, MediaKind, Message, MessageContent,
};
pub use courier_database::UserProfile;
