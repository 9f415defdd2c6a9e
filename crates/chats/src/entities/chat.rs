use serde::{Deserialize, Serialize};

use crate::types::Channel;

/// A conversation between two users or within a named group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    #[serde(skip)]
    pub(crate) row_id: i64,
    /// Public identifier, stable for the lifetime of the chat
    pub id: String,
    /// Participant user ids in insertion order
    pub participants: Vec<String>,
    pub kind: ChatKind,
    pub created_at: String,
}

/// Whether a chat is a two-party conversation or a group with a name and admin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ChatKind {
    Direct,
    Group { name: String, admin: String },
}

impl Chat {
    pub fn is_group(&self) -> bool {
        matches!(self.kind, ChatKind::Group { .. })
    }

    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    /// The participant of a direct chat that is not `user_id`.
    ///
    /// Returns `None` for groups and for users outside the chat.
    pub fn peer_of(&self, user_id: &str) -> Option<&str> {
        if self.is_group() || !self.has_participant(user_id) {
            return None;
        }
        self.participants
            .iter()
            .map(String::as_str)
            .find(|participant| *participant != user_id)
    }

    /// Broadcast channel shared by every member of the chat
    pub fn channel(&self) -> Channel {
        Channel::Chat(self.id.clone())
    }
}

impl From<courier_database::Chat> for Chat {
    fn from(row: courier_database::Chat) -> Self {
        let kind = if row.is_group {
            ChatKind::Group {
                name: row.name.unwrap_or_default(),
                admin: row.admin_id.unwrap_or_default(),
            }
        } else {
            ChatKind::Direct
        };

        Self {
            row_id: row.id,
            id: row.public_id,
            participants: row.participants,
            kind,
            created_at: row.created_at,
        }
    }
}
