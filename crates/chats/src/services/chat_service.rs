//! Chat identity resolution plus explicit contact and group creation.

use std::sync::Arc;

use courier_database::{ChatRepository, CreateGroupRequest};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::entities::Chat;
use crate::notifier::{publish_best_effort, Notifier};
use crate::types::{Channel, ChatError, ChatResult, NotificationEvent};
use crate::utils::Validator;

/// Service resolving which conversation a sender and target refer to
#[derive(Clone)]
pub struct ChatService {
    chats: ChatRepository,
    notifier: Arc<dyn Notifier>,
}

impl ChatService {
    pub fn new(pool: SqlitePool, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            chats: ChatRepository::new(pool),
            notifier,
        }
    }

    /// Resolve the chat a message from `sender_id` to `target_id` belongs to.
    ///
    /// A target naming an existing chat is returned as is. Otherwise the target is a user
    /// and the direct chat between the two is found or created. Concurrent first contact
    /// between the same pair always yields the same chat.
    pub async fn resolve(&self, sender_id: &str, target_id: &str) -> ChatResult<Chat> {
        Validator::identifier("sender", sender_id)?;
        Validator::identifier("target", target_id)?;

        if let Some(chat) = self.chats.find_by_public_id(target_id).await? {
            debug!(chat_id = %chat.public_id, "target addresses an existing chat");
            return Ok(chat.into());
        }

        if sender_id == target_id {
            return Err(ChatError::validation("cannot start a chat with yourself"));
        }

        let (chat, created) = self
            .chats
            .find_or_create_direct_chat(sender_id, target_id)
            .await?;
        if created {
            info!(chat_id = %chat.public_id, sender_id, target_id, "first contact, created direct chat");
        }
        Ok(chat.into())
    }

    /// Look up the conversation `target` denotes for `caller` without creating anything.
    pub async fn find_conversation(&self, target: &str, caller: &str) -> ChatResult<Chat> {
        Validator::identifier("target", target)?;
        Validator::identifier("caller", caller)?;

        if let Some(chat) = self.chats.find_by_public_id(target).await? {
            return Ok(chat.into());
        }

        self.find_direct(target, caller).await
    }

    /// The direct chat between two users
    pub async fn find_direct(&self, first: &str, second: &str) -> ChatResult<Chat> {
        self.chats
            .find_direct_chat(first, second)
            .await?
            .map(Chat::from)
            .ok_or_else(|| ChatError::chat_not_found(format!("direct chat {first}/{second}")))
    }

    /// Add `peer_id` as a contact of `user_id`, then tell the peer.
    pub async fn create_contact(&self, user_id: &str, peer_id: &str) -> ChatResult<Chat> {
        Validator::identifier("user", user_id)?;
        Validator::identifier("receiver", peer_id)?;
        if user_id == peer_id {
            return Err(ChatError::validation("cannot add yourself as a contact"));
        }

        let (chat, _) = self
            .chats
            .find_or_create_direct_chat(user_id, peer_id)
            .await?;

        publish_best_effort(
            self.notifier.as_ref(),
            Channel::user(peer_id),
            NotificationEvent::ContactResponse,
            None,
        )
        .await;

        Ok(chat.into())
    }

    /// Create a named group administered by `admin_id`.
    ///
    /// Members are de-duplicated and the admin is always included, last.
    pub async fn create_group(
        &self,
        admin_id: &str,
        name: &str,
        members: &[String],
    ) -> ChatResult<Chat> {
        Validator::identifier("admin", admin_id)?;
        Validator::group_name(name)?;

        let mut participants: Vec<String> = Vec::with_capacity(members.len() + 1);
        for member in members {
            Validator::identifier("member", member)?;
            if member != admin_id && !participants.contains(member) {
                participants.push(member.clone());
            }
        }
        participants.push(admin_id.to_string());

        if participants.len() < 2 {
            return Err(ChatError::validation(
                "a group needs at least one member besides the admin",
            ));
        }

        let chat = self
            .chats
            .create_group(&CreateGroupRequest {
                name: name.trim().to_string(),
                admin_id: admin_id.to_string(),
                participants,
            })
            .await?;

        Ok(chat.into())
    }

    /// Every group the user belongs to
    pub async fn groups_for(&self, user_id: &str) -> ChatResult<Vec<Chat>> {
        let groups = self.chats.list_for_user(user_id, true).await?;
        Ok(groups.into_iter().map(Chat::from).collect())
    }

    pub async fn is_participant(&self, chat_id: &str, user_id: &str) -> ChatResult<bool> {
        Ok(self.chats.is_participant(chat_id, user_id).await?)
    }
}
