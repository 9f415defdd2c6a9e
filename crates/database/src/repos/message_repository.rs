//! Repository for message data access operations.

use crate::entities::{now_timestamp, ChatMessage, CreateMessageRequest, MessageWithSender, UserProfile};
use crate::types::DatabaseResult;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

const MESSAGE_COLUMNS: &str = "m.id, m.public_id, m.chat_id, c.public_id AS chat_public_id, m.sender_id, \
     m.body, m.gif, m.image_url, m.audio_url, m.video_url, m.seen, m.created_at";

/// Repository for message database operations
#[derive(Clone)]
pub struct MessageRepository {
    pool: SqlitePool,
}

impl MessageRepository {
    /// Create a new message repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a new unseen message
    pub async fn create(&self, request: &CreateMessageRequest) -> DatabaseResult<ChatMessage> {
        let public_id = cuid2::cuid();
        let now = now_timestamp();

        let result = sqlx::query(
            "INSERT INTO messages
                (public_id, chat_id, sender_id, body, gif, image_url, audio_url, video_url, seen, created_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0, ?)",
        )
        .bind(&public_id)
        .bind(request.chat_id)
        .bind(&request.sender_id)
        .bind(&request.body)
        .bind(&request.gif)
        .bind(&request.image_url)
        .bind(&request.audio_url)
        .bind(&request.video_url)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        let id = result.last_insert_rowid();
        info!(
            message_id = id,
            chat_id = request.chat_id,
            sender_id = %request.sender_id,
            "stored new message"
        );

        Ok(ChatMessage {
            id,
            public_id,
            chat_id: request.chat_id,
            chat_public_id: request.chat_public_id.clone(),
            sender_id: request.sender_id.clone(),
            body: request.body.clone(),
            gif: request.gif.clone(),
            image_url: request.image_url.clone(),
            audio_url: request.audio_url.clone(),
            video_url: request.video_url.clone(),
            seen: false,
            created_at: now,
        })
    }

    /// Total number of messages in a chat
    pub async fn count_for_chat(&self, chat_id: i64) -> DatabaseResult<i64> {
        let count = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE chat_id = ?")
            .bind(chat_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// One window of a chat's messages, newest first, with sender profiles expanded.
    ///
    /// Ordered by insertion, so wall clock steps between writes cannot reorder history.
    pub async fn page_for_chat(
        &self,
        chat_id: i64,
        limit: i64,
        offset: i64,
    ) -> DatabaseResult<Vec<MessageWithSender>> {
        let rows = sqlx::query(&format!(
            "SELECT {MESSAGE_COLUMNS},
                    u.name AS sender_name, u.email AS sender_email,
                    u.mobile AS sender_mobile, u.photo AS sender_photo
             FROM messages m
             JOIN chats c ON c.id = m.chat_id
             LEFT JOIN users u ON u.id = m.sender_id
             WHERE m.chat_id = ?
             ORDER BY m.id DESC
             LIMIT ? OFFSET ?"
        ))
        .bind(chat_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        debug!(chat_id, limit, offset, returned = rows.len(), "loaded message page");

        rows.iter()
            .map(|row| -> DatabaseResult<MessageWithSender> {
                let message = message_from_row(row)?;
                let sender = UserProfile {
                    id: message.sender_id.clone(),
                    name: row.try_get("sender_name")?,
                    email: row.try_get("sender_email")?,
                    mobile: row.try_get("sender_mobile")?,
                    photo: row.try_get("sender_photo")?,
                };
                Ok(MessageWithSender { message, sender })
            })
            .collect()
    }

    /// Mark every message in a chat as seen. Returns how many rows changed.
    pub async fn mark_chat_seen(&self, chat_id: i64) -> DatabaseResult<u64> {
        let result = sqlx::query("UPDATE messages SET seen = 1 WHERE chat_id = ? AND seen = 0")
            .bind(chat_id)
            .execute(&self.pool)
            .await?;

        let updated = result.rows_affected();
        debug!(chat_id, updated, "marked chat messages as seen");
        Ok(updated)
    }
}

fn message_from_row(row: &SqliteRow) -> Result<ChatMessage, sqlx::Error> {
    Ok(ChatMessage {
        id: row.try_get("id")?,
        public_id: row.try_get("public_id")?,
        chat_id: row.try_get("chat_id")?,
        chat_public_id: row.try_get("chat_public_id")?,
        sender_id: row.try_get("sender_id")?,
        body: row.try_get("body")?,
        gif: row.try_get("gif")?,
        image_url: row.try_get("image_url")?,
        audio_url: row.try_get("audio_url")?,
        video_url: row.try_get("video_url")?,
        seen: row.try_get("seen")?,
        created_at: row.try_get("created_at")?,
    })
}
