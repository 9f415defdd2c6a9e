//! Message ingestion with real-time fan-out, and history paging.

use std::collections::HashSet;
use std::sync::Arc;

use courier_database::{CreateMessageRequest, MessageRepository};
use sqlx::SqlitePool;
use tracing::{debug, warn};

use super::chat_service::ChatService;
use crate::entities::{Chat, HistoryMessage, HistoryPage, Message, MessageContent};
use crate::media::{MediaStore, MediaUpload};
use crate::notifier::{publish_best_effort, Notifier};
use crate::types::{Channel, ChatError, ChatResult, NotificationEvent};
use crate::utils::Validator;

/// Messages returned per history page
pub const PAGE_SIZE: i64 = 10;

/// Content submitted by a sender before attachments are uploaded
#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
    pub text: Option<String>,
    pub gif: Option<String>,
    pub uploads: Vec<MediaUpload>,
}

impl OutgoingMessage {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.text.as_deref().map_or(true, str::is_empty)
            && self.gif.as_deref().map_or(true, str::is_empty)
            && self.uploads.is_empty()
    }
}

/// Service for sending and reading messages
#[derive(Clone)]
pub struct MessageService {
    chats: ChatService,
    messages: MessageRepository,
    media: Arc<dyn MediaStore>,
    notifier: Arc<dyn Notifier>,
}

impl MessageService {
    pub fn new(
        pool: SqlitePool,
        chats: ChatService,
        media: Arc<dyn MediaStore>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            chats,
            messages: MessageRepository::new(pool),
            media,
            notifier,
        }
    }

    /// Store a message from `sender_id` to `target_id` (a chat id or a user id) and announce it.
    ///
    /// Attachments are uploaded first; any upload or resolution failure aborts before
    /// anything is stored or published.
    pub async fn send(
        &self,
        sender_id: &str,
        target_id: &str,
        outgoing: OutgoingMessage,
    ) -> ChatResult<Message> {
        if outgoing.is_empty() {
            return Err(ChatError::validation(
                "a message needs text, a gif, or an attachment",
            ));
        }
        if let Some(text) = outgoing.text.as_deref() {
            Validator::message_text(text)?;
        }

        let mut kinds = HashSet::new();
        if !outgoing.uploads.iter().all(|upload| kinds.insert(upload.kind)) {
            return Err(ChatError::validation(
                "at most one attachment of each kind is allowed",
            ));
        }

        let mut media = Vec::with_capacity(outgoing.uploads.len());
        for upload in outgoing.uploads {
            let kind = upload.kind;
            let url = self.media.store(upload).await.map_err(|error| {
                warn!(sender_id, kind = kind.as_str(), error = %error, "attachment upload failed");
                ChatError::from(error)
            })?;
            media.push((kind, url));
        }

        let chat = self.chats.resolve(sender_id, target_id).await?;
        let peer = if chat.is_group() {
            None
        } else {
            let peer = chat.peer_of(sender_id).ok_or_else(|| {
                ChatError::validation("sender is not a participant of this chat")
            })?;
            Some(peer.to_string())
        };

        let content = MessageContent::from_parts(outgoing.text, outgoing.gif, media)
            .ok_or_else(|| ChatError::validation("message content is empty"))?;
        let columns = content.to_columns();

        let stored = self
            .messages
            .create(&CreateMessageRequest {
                chat_id: chat.row_id,
                chat_public_id: chat.id.clone(),
                sender_id: sender_id.to_string(),
                body: columns.body,
                gif: columns.gif,
                image_url: columns.image_url,
                audio_url: columns.audio_url,
                video_url: columns.video_url,
            })
            .await?;

        self.fan_out(&chat, sender_id, peer.as_deref()).await;

        Ok(stored.into())
    }

    /// Publish the events announcing a new message in `chat` from `sender_id`.
    ///
    /// `peer` is the other participant of a direct chat and `None` for groups.
    async fn fan_out(&self, chat: &Chat, sender_id: &str, peer: Option<&str>) {
        let notifier = self.notifier.as_ref();

        let Some(peer) = peer else {
            publish_best_effort(
                notifier,
                chat.channel(),
                NotificationEvent::SendResponse,
                Some(&chat.id),
            )
            .await;
            publish_best_effort(
                notifier,
                chat.channel(),
                NotificationEvent::SeenResponse,
                Some(sender_id),
            )
            .await;
            return;
        };

        publish_best_effort(
            notifier,
            Channel::user(peer),
            NotificationEvent::SendResponse,
            Some(sender_id),
        )
        .await;
        publish_best_effort(
            notifier,
            Channel::user(sender_id),
            NotificationEvent::SendResponse,
            Some(sender_id),
        )
        .await;
        publish_best_effort(
            notifier,
            Channel::user(peer),
            NotificationEvent::SeenResponse,
            Some(sender_id),
        )
        .await;
    }

    /// Page `page_index` (zero based, newest first) of the conversation `target` denotes for `caller_id`.
    pub async fn page(&self, target: &str, caller_id: &str, page_index: u32) -> ChatResult<HistoryPage> {
        let chat = self.chats.find_conversation(target, caller_id).await?;
        let chat_row = chat.row_id;

        let total = self.messages.count_for_chat(chat_row).await?;
        let offset = i64::from(page_index) * PAGE_SIZE;
        let messages = self
            .messages
            .page_for_chat(chat_row, PAGE_SIZE, offset)
            .await?
            .into_iter()
            .map(HistoryMessage::from)
            .collect::<Vec<_>>();

        debug!(chat_id = %chat.id, page = page_index, returned = messages.len(), total, "served history page");

        Ok(HistoryPage {
            messages,
            total,
            page: page_index,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::MediaKind;
    use bytes::Bytes;

    #[test]
    fn test_outgoing_message_emptiness() {
        assert!(OutgoingMessage::default().is_empty());
        assert!(OutgoingMessage {
            text: Some(String::new()),
            gif: Some(String::new()),
            uploads: Vec::new(),
        }
        .is_empty());
        assert!(!OutgoingMessage::text("hi").is_empty());
        assert!(!OutgoingMessage {
            uploads: vec![MediaUpload {
                kind: MediaKind::Image,
                file_name: "a.png".to_string(),
                content_type: None,
                bytes: Bytes::new(),
            }],
            ..Default::default()
        }
        .is_empty());
    }
}
