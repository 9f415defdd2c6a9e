//! Seen-state reconciliation for direct chats.

use std::sync::Arc;

use courier_database::MessageRepository;
use sqlx::SqlitePool;
use tracing::info;

use super::chat_service::ChatService;
use crate::notifier::{publish_best_effort, Notifier};
use crate::types::{Channel, ChatResult, NotificationEvent};
use crate::utils::Validator;

#[derive(Clone)]
pub struct SeenService {
    chats: ChatService,
    messages: MessageRepository,
    notifier: Arc<dyn Notifier>,
}

impl SeenService {
    pub fn new(pool: SqlitePool, chats: ChatService, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            chats,
            messages: MessageRepository::new(pool),
            notifier,
        }
    }

    /// Mark every unseen message of the direct chat between `participant_a` and
    /// `participant_b` as seen, whoever sent it, then tell `participant_a` that
    /// `participant_b` has caught up.
    ///
    /// Returns how many messages flipped. Repeating the call changes nothing.
    pub async fn mark_seen(&self, participant_a: &str, participant_b: &str) -> ChatResult<u64> {
        Validator::identifier("receiver", participant_a)?;
        Validator::identifier("viewer", participant_b)?;

        let chat = self.chats.find_direct(participant_a, participant_b).await?;
        let updated = self.messages.mark_chat_seen(chat.row_id).await?;

        if updated > 0 {
            info!(chat_id = %chat.id, updated, viewer = participant_b, "messages marked as seen");
        }

        publish_best_effort(
            self.notifier.as_ref(),
            Channel::user(participant_a),
            NotificationEvent::SeenResponse,
            Some(participant_b),
        )
        .await;

        Ok(updated)
    }
}
