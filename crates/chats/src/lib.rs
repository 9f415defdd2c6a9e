//! # Courier Chats Crate
//!
//! Core chat logic for Courier: deciding which conversation a message belongs to,
//! storing it and announcing it, paging history, reconciling seen state, and
//! deriving contact lists.
//!
//! ## Architecture
//!
//! - **Entities**: Domain models (Chat, Message, ContactEntry, ...)
//! - **Services**: Business logic over the `courier-database` repositories
//! - **Notifier**: Publish/subscribe seam for real-time fan-out
//! - **Media**: Seam to the object store that hosts attachments
//! - **Types**: Errors and notification addressing
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use courier_chats::{BroadcastHub, ChatServices, DisabledMediaStore, OutgoingMessage};
//!
//! # async fn run(pool: sqlx::SqlitePool) -> courier_chats::ChatResult<()> {
//! let services = ChatServices::new(pool, Arc::new(BroadcastHub::default()), Arc::new(DisabledMediaStore));
//! let message = services.messages.send("alice", "bob", OutgoingMessage::text("hi")).await?;
//! let page = services.messages.page("bob", "alice", 0).await?;
//! assert_eq!(page.messages[0].id, message.id);
//! # Ok(())
//! # }
//! ```

pub mod entities;
pub mod media;
pub mod notifier;
pub mod services;
pub mod types;
pub mod utils;

pub use entities::{
    Chat, ChatKind, ContactEntry, HistoryMessage, HistoryPage, MediaKind, Message,
    MessageContent, UserProfile,
};
pub use media::{DisabledMediaStore, HttpMediaStore, MediaError, MediaStore, MediaUpload};
pub use notifier::{BroadcastHub, Notifier, NotifyError};
pub use services::{
    ChatService, ChatServices, ContactService, MessageService, OutgoingMessage, SeenService,
    PAGE_SIZE,
};
pub use types::{Channel, ChatError, ChatResult, Notification, NotificationEvent};
