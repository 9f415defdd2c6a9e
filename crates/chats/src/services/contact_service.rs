//! Contact directory derived from chat membership.

use courier_database::ChatRepository;
use sqlx::SqlitePool;
use tracing::debug;

use crate::entities::{Chat, ContactEntry};
use crate::types::ChatResult;
use crate::utils::Validator;

#[derive(Clone)]
pub struct ContactService {
    chats: ChatRepository,
}

impl ContactService {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            chats: ChatRepository::new(pool),
        }
    }

    /// The other participant of each of the user's direct chats, followed by the user's groups.
    pub async fn contacts(&self, user_id: &str) -> ChatResult<Vec<ContactEntry>> {
        Validator::identifier("user", user_id)?;

        // flatten first, then drop self
        let mut entries: Vec<ContactEntry> = self
            .chats
            .direct_contact_rows(user_id)
            .await?
            .into_iter()
            .filter(|row| row.profile.id != user_id)
            .map(|row| ContactEntry::Contact(row.profile))
            .collect();
        let contacts = entries.len();

        let groups = self.chats.list_for_user(user_id, true).await?;
        entries.extend(groups.into_iter().map(|group| ContactEntry::Group(Chat::from(group))));

        debug!(user_id, contacts, groups = entries.len() - contacts, "built contact directory");
        Ok(entries)
    }
}
