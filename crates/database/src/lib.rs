//! Courier Database Crate
//!
//! Connection management, migrations, and repositories for the chat store.

use sqlx::SqlitePool;
use courier_config::DatabaseConfig;

pub mod connection;
pub mod entities;
pub mod migrations;
pub mod repos;
pub mod types;

pub use connection::{prepare_database, DatabaseConnection};
pub use migrations::run_migrations;

pub use repos::{ChatRepository, MessageRepository, UserRepository};

pub use entities::{
    chat::pair_key, Chat, ChatMessage, ChatParticipant, CreateGroupRequest, CreateMessageRequest,
    MessageWithSender, UpsertUserRequest, User, UserProfile,
};

pub use types::{DatabaseError, DatabaseResult};

/// Initialize the database with migrations
pub async fn initialize_database(config: &DatabaseConfig) -> DatabaseResult<SqlitePool> {
    let pool = prepare_database(config)
        .await
        .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

    run_migrations(&pool)
        .await
        .map_err(|e| DatabaseError::MigrationError(e.to_string()))?;

    Ok(pool)
}
