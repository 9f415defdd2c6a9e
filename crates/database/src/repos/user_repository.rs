//! Repository for mirrored user profiles.

use crate::entities::{now_timestamp, UpsertUserRequest, User};
use crate::types::DatabaseResult;
use sqlx::SqlitePool;
use tracing::debug;

/// Repository for user database operations
#[derive(Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Insert a profile or refresh the stored fields of an existing one
    pub async fn upsert(&self, request: &UpsertUserRequest) -> DatabaseResult<User> {
        let now = now_timestamp();

        sqlx::query(
            "INSERT INTO users (id, name, email, mobile, photo, created_at)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                email = excluded.email,
                mobile = excluded.mobile,
                photo = excluded.photo",
        )
        .bind(&request.id)
        .bind(&request.name)
        .bind(&request.email)
        .bind(&request.mobile)
        .bind(&request.photo)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        debug!(user_id = %request.id, "upserted user profile");

        self.find_by_id(&request.id).await.map(|user| {
            user.unwrap_or(User {
                id: request.id.clone(),
                name: request.name.clone(),
                email: request.email.clone(),
                mobile: request.mobile.clone(),
                photo: request.photo.clone(),
                created_at: now,
            })
        })
    }

    pub async fn find_by_id(&self, id: &str) -> DatabaseResult<Option<User>> {
        let user = sqlx::query_as::<_, (String, Option<String>, Option<String>, Option<String>, Option<String>, String)>(
            "SELECT id, name, email, mobile, photo, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?
        .map(|(id, name, email, mobile, photo, created_at)| User {
            id,
            name,
            email,
            mobile,
            photo,
            created_at,
        });

        Ok(user)
    }

    /// All mirrored profiles ordered by id
    pub async fn list(&self) -> DatabaseResult<Vec<User>> {
        let rows = sqlx::query_as::<_, (String, Option<String>, Option<String>, Option<String>, Option<String>, String)>(
            "SELECT id, name, email, mobile, photo, created_at FROM users ORDER BY id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(id, name, email, mobile, photo, created_at)| User {
                id,
                name,
                email,
                mobile,
                photo,
                created_at,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::create_test_pool;

    #[tokio::test]
    async fn test_upsert_refreshes_profile_but_keeps_creation_time() {
        let (pool, _temp_dir) = create_test_pool().await;
        let repo = UserRepository::new(pool);

        let first = repo
            .upsert(&UpsertUserRequest {
                id: "alice".to_string(),
                name: Some("Alice".to_string()),
                email: None,
                mobile: None,
                photo: None,
            })
            .await
            .unwrap();

        let second = repo
            .upsert(&UpsertUserRequest {
                id: "alice".to_string(),
                name: Some("Alice Liddell".to_string()),
                email: Some("alice@example.com".to_string()),
                mobile: None,
                photo: None,
            })
            .await
            .unwrap();

        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.name.as_deref(), Some("Alice Liddell"));
        assert_eq!(repo.list().await.unwrap().len(), 1);
        assert!(repo.find_by_id("bob").await.unwrap().is_none());
    }
}
