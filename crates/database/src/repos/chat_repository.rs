//! Repository for chat data access operations.

use std::collections::HashMap;

use crate::entities::chat::pair_key;
use crate::entities::{now_timestamp, Chat, ChatParticipant, CreateGroupRequest, UserProfile};
use crate::types::{DatabaseError, DatabaseResult};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

const CHAT_COLUMNS: &str = "id, public_id, is_group, name, admin_id, created_at";

/// Repository for chat database operations
#[derive(Clone)]
pub struct ChatRepository {
    pool: SqlitePool,
}

impl ChatRepository {
    /// Create a new chat repository
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Find chat by public ID
    pub async fn find_by_public_id(&self, public_id: &str) -> DatabaseResult<Option<Chat>> {
        let row = sqlx::query(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE public_id = ?"
        ))
        .bind(public_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    /// Find the direct chat between two users, in either order
    pub async fn find_direct_chat(&self, first: &str, second: &str) -> DatabaseResult<Option<Chat>> {
        self.find_by_pair_key(&pair_key(first, second)).await
    }

    async fn find_by_pair_key(&self, key: &str) -> DatabaseResult<Option<Chat>> {
        let row = sqlx::query(&format!(
            "SELECT {CHAT_COLUMNS} FROM chats WHERE pair_key = ?"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some(self.hydrate(&row).await?)),
            None => Ok(None),
        }
    }

    /// Return the direct chat between two users, creating it when absent.
    ///
    /// The insert and its participant rows commit together. A concurrent creator
    /// losing the race on `pair_key` fetches the winner's chat instead of failing.
    /// The boolean reports whether this call created the chat.
    pub async fn find_or_create_direct_chat(
        &self,
        first: &str,
        second: &str,
    ) -> DatabaseResult<(Chat, bool)> {
        if first == second {
            return Err(DatabaseError::ValidationError(
                "a direct chat needs two distinct participants".to_string(),
            ));
        }

        let key = pair_key(first, second);
        if let Some(chat) = self.find_by_pair_key(&key).await? {
            return Ok((chat, false));
        }

        let public_id = cuid2::cuid();
        let now = now_timestamp();

        let mut tx = self.pool.begin().await?;
        let inserted = sqlx::query(
            "INSERT INTO chats (public_id, is_group, pair_key, created_at)
             VALUES (?, 0, ?, ?)
             ON CONFLICT(pair_key) DO NOTHING",
        )
        .bind(&public_id)
        .bind(&key)
        .bind(&now)
        .execute(&mut *tx)
        .await;

        let created = match inserted {
            Ok(result) if result.rows_affected() == 1 => {
                let chat_id = result.last_insert_rowid();
                for (position, user_id) in [first, second].into_iter().enumerate() {
                    sqlx::query(
                        "INSERT INTO chat_participants (chat_id, user_id, position) VALUES (?, ?, ?)",
                    )
                    .bind(chat_id)
                    .bind(user_id)
                    .bind(position as i64)
                    .execute(&mut *tx)
                    .await?;
                }
                tx.commit().await?;
                true
            }
            Ok(_) => {
                tx.rollback().await?;
                false
            }
            Err(sqlx::Error::Database(error)) if error.is_unique_violation() => {
                tx.rollback().await?;
                false
            }
            Err(error) => return Err(error.into()),
        };

        let chat = self.find_by_pair_key(&key).await?.ok_or_else(|| {
            DatabaseError::NotFound(format!("direct chat for pair {key} vanished after insert"))
        })?;

        if created {
            info!(chat_id = chat.id, public_id = %chat.public_id, "created new direct chat");
        } else {
            debug!(public_id = %chat.public_id, "direct chat created concurrently, using existing");
        }

        Ok((chat, created))
    }

    /// Create a group chat. Participants are stored in the given order.
    pub async fn create_group(&self, request: &CreateGroupRequest) -> DatabaseResult<Chat> {
        let public_id = cuid2::cuid();
        let now = now_timestamp();

        let mut tx = self.pool.begin().await?;
        let result = sqlx::query(
            "INSERT INTO chats (public_id, is_group, name, admin_id, created_at)
             VALUES (?, 1, ?, ?, ?)",
        )
        .bind(&public_id)
        .bind(&request.name)
        .bind(&request.admin_id)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let chat_id = result.last_insert_rowid();
        for (position, user_id) in request.participants.iter().enumerate() {
            sqlx::query(
                "INSERT INTO chat_participants (chat_id, user_id, position) VALUES (?, ?, ?)",
            )
            .bind(chat_id)
            .bind(user_id)
            .bind(position as i64)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        info!(
            chat_id,
            public_id = %public_id,
            admin_id = %request.admin_id,
            participants = request.participants.len(),
            "created new group chat"
        );

        Ok(Chat {
            id: chat_id,
            public_id,
            is_group: true,
            name: Some(request.name.clone()),
            admin_id: Some(request.admin_id.clone()),
            participants: request.participants.clone(),
            created_at: now,
        })
    }

    /// List the chats a user participates in, oldest first
    pub async fn list_for_user(&self, user_id: &str, is_group: bool) -> DatabaseResult<Vec<Chat>> {
        let rows = sqlx::query(
            "SELECT c.id, c.public_id, c.is_group, c.name, c.admin_id, c.created_at
             FROM chats c
             JOIN chat_participants p ON p.chat_id = c.id
             WHERE p.user_id = ? AND c.is_group = ?
             ORDER BY c.created_at ASC, c.id ASC",
        )
        .bind(user_id)
        .bind(is_group)
        .fetch_all(&self.pool)
        .await?;

        let participants = sqlx::query(
            "SELECT p.chat_id, p.user_id
             FROM chat_participants p
             WHERE p.chat_id IN (SELECT chat_id FROM chat_participants WHERE user_id = ?)
             ORDER BY p.chat_id, p.position",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        let mut by_chat: HashMap<i64, Vec<String>> = HashMap::new();
        for row in participants {
            by_chat
                .entry(row.try_get("chat_id")?)
                .or_default()
                .push(row.try_get("user_id")?);
        }

        rows.iter()
            .map(|row| -> DatabaseResult<Chat> {
                let mut chat = chat_from_row(row)?;
                chat.participants = by_chat.remove(&chat.id).unwrap_or_default();
                Ok(chat)
            })
            .collect()
    }

    /// Every participant of every direct chat the user is in, self included,
    /// ordered by chat age then participant position.
    pub async fn direct_contact_rows(&self, user_id: &str) -> DatabaseResult<Vec<ChatParticipant>> {
        let rows = sqlx::query(
            "SELECT p.chat_id, p.user_id, u.name, u.email, u.mobile, u.photo
             FROM chat_participants p
             JOIN chats c ON c.id = p.chat_id
             LEFT JOIN users u ON u.id = p.user_id
             WHERE c.is_group = 0
               AND p.chat_id IN (SELECT chat_id FROM chat_participants WHERE user_id = ?)
             ORDER BY c.created_at ASC, c.id ASC, p.position ASC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> DatabaseResult<ChatParticipant> {
                Ok(ChatParticipant {
                    chat_id: row.try_get("chat_id")?,
                    profile: UserProfile {
                        id: row.try_get("user_id")?,
                        name: row.try_get("name")?,
                        email: row.try_get("email")?,
                        mobile: row.try_get("mobile")?,
                        photo: row.try_get("photo")?,
                    },
                })
            })
            .collect()
    }

    /// Check whether a user participates in the chat with the given public ID
    pub async fn is_participant(&self, public_id: &str, user_id: &str) -> DatabaseResult<bool> {
        let found: Option<i64> = sqlx::query_scalar(
            "SELECT 1 FROM chat_participants p
             JOIN chats c ON c.id = p.chat_id
             WHERE c.public_id = ? AND p.user_id = ?",
        )
        .bind(public_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(found.is_some())
    }

    async fn hydrate(&self, row: &SqliteRow) -> DatabaseResult<Chat> {
        let mut chat = chat_from_row(row)?;
        chat.participants = sqlx::query_scalar(
            "SELECT user_id FROM chat_participants WHERE chat_id = ? ORDER BY position",
        )
        .bind(chat.id)
        .fetch_all(&self.pool)
        .await?;
        Ok(chat)
    }
}

fn chat_from_row(row: &SqliteRow) -> Result<Chat, sqlx::Error> {
    Ok(Chat {
        id: row.try_get("id")?,
        public_id: row.try_get("public_id")?,
        is_group: row.try_get("is_group")?,
        name: row.try_get("name")?,
        admin_id: row.try_get("admin_id")?,
        participants: Vec::new(),
        created_at: row.try_get("created_at")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_pool;
    use crate::{UpsertUserRequest, UserRepository};

    #[tokio::test]
    async fn test_find_or_create_direct_chat_is_idempotent_in_both_orders() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ChatRepository::new(pool);

        let (first, created) = repo.find_or_create_direct_chat("alice", "bob").await.unwrap();
        assert!(created);
        assert!(!first.is_group);
        assert_eq!(first.participants, vec!["alice".to_string(), "bob".to_string()]);

        let (second, created) = repo.find_or_create_direct_chat("bob", "alice").await.unwrap();
        assert!(!created);
        assert_eq!(second.public_id, first.public_id);
    }

    #[tokio::test]
    async fn test_find_or_create_rejects_self_chat() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ChatRepository::new(pool);

        let result = repo.find_or_create_direct_chat("alice", "alice").await;
        assert!(matches!(result, Err(DatabaseError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_concurrent_first_contact_creates_one_chat() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ChatRepository::new(pool.clone());

        let mut handles = Vec::new();
        for i in 0..16 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                if i % 2 == 0 {
                    repo.find_or_create_direct_chat("alice", "bob").await
                } else {
                    repo.find_or_create_direct_chat("bob", "alice").await
                }
            }));
        }

        let mut ids = Vec::new();
        let mut creations = 0;
        for handle in handles {
            let (chat, created) = handle.await.unwrap().unwrap();
            ids.push(chat.public_id);
            if created {
                creations += 1;
            }
        }

        ids.dedup();
        assert_eq!(ids.len(), 1);
        assert_eq!(creations, 1);

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chats WHERE is_group = 0")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_groups_do_not_share_pair_uniqueness() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ChatRepository::new(pool);

        let request = CreateGroupRequest {
            name: "Weekend".to_string(),
            admin_id: "alice".to_string(),
            participants: vec!["bob".to_string(), "alice".to_string()],
        };

        let first = repo.create_group(&request).await.unwrap();
        let second = repo.create_group(&request).await.unwrap();
        assert_ne!(first.public_id, second.public_id);

        let (direct, created) = repo.find_or_create_direct_chat("alice", "bob").await.unwrap();
        assert!(created);
        assert_ne!(direct.public_id, first.public_id);

        let found = repo.find_by_public_id(&first.public_id).await.unwrap().unwrap();
        assert!(found.is_group);
        assert_eq!(found.name.as_deref(), Some("Weekend"));
        assert_eq!(found.admin_id.as_deref(), Some("alice"));
        assert_eq!(found.participants, request.participants);
    }

    #[tokio::test]
    async fn test_list_for_user_splits_direct_and_group() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ChatRepository::new(pool);

        repo.find_or_create_direct_chat("alice", "bob").await.unwrap();
        repo.find_or_create_direct_chat("carol", "alice").await.unwrap();
        repo.find_or_create_direct_chat("bob", "carol").await.unwrap();
        repo.create_group(&CreateGroupRequest {
            name: "Trio".to_string(),
            admin_id: "alice".to_string(),
            participants: vec!["bob".to_string(), "carol".to_string(), "alice".to_string()],
        })
        .await
        .unwrap();

        let direct = repo.list_for_user("alice", false).await.unwrap();
        assert_eq!(direct.len(), 2);
        assert!(direct.iter().all(|chat| chat.participants.len() == 2));

        let groups = repo.list_for_user("alice", true).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].participants.len(), 3);
    }

    #[tokio::test]
    async fn test_direct_contact_rows_join_profiles() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ChatRepository::new(pool.clone());
        let users = UserRepository::new(pool);

        users
            .upsert(&UpsertUserRequest {
                id: "bob".to_string(),
                name: Some("Bob".to_string()),
                email: Some("bob@example.com".to_string()),
                mobile: None,
                photo: None,
            })
            .await
            .unwrap();

        repo.find_or_create_direct_chat("alice", "bob").await.unwrap();

        let rows = repo.direct_contact_rows("alice").await.unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].profile.id, "alice");
        assert!(rows[0].profile.name.is_none());
        assert_eq!(rows[1].profile.name.as_deref(), Some("Bob"));
    }

    #[tokio::test]
    async fn test_is_participant() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = ChatRepository::new(pool);

        let (chat, _) = repo.find_or_create_direct_chat("alice", "bob").await.unwrap();
        assert!(repo.is_participant(&chat.public_id, "alice").await.unwrap());
        assert!(!repo.is_participant(&chat.public_id, "mallory").await.unwrap());
        assert!(!repo.is_participant("missing", "alice").await.unwrap());
    }
}
