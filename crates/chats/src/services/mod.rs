//! Business logic services for the chat system.

pub mod chat_service;
pub mod contact_service;
pub mod message_service;
pub mod seen_service;

use std::sync::Arc;

use sqlx::SqlitePool;

pub use chat_service::ChatService;
pub use contact_service::ContactService;
pub use message_service::{MessageService, OutgoingMessage, PAGE_SIZE};
pub use seen_service::SeenService;

use crate::media::MediaStore;
use crate::notifier::Notifier;

/// All chat services sharing one pool, notifier, and media store
#[derive(Clone)]
pub struct ChatServices {
    pub chats: ChatService,
    pub messages: MessageService,
    pub seen: SeenService,
    pub contacts: ContactService,
}

impl ChatServices {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn Notifier>, media: Arc<dyn MediaStore>) -> Self {
        let chats = ChatService::new(pool.clone(), notifier.clone());
        Self {
            messages: MessageService::new(pool.clone(), chats.clone(), media, notifier.clone()),
            seen: SeenService::new(pool.clone(), chats.clone(), notifier),
            contacts: ContactService::new(pool),
            chats,
        }
    }
}
