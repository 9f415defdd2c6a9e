//! Chat entity definitions

use serde::{Deserialize, Serialize};

use super::user::UserProfile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chat {
    pub id: i64,
    pub public_id: String,
    pub is_group: bool,
    pub name: Option<String>,
    pub admin_id: Option<String>,
    /// Participant ids in insertion order
    pub participants: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGroupRequest {
    pub name: String,
    pub admin_id: String,
    pub participants: Vec<String>,
}

/// One participant of a chat, joined with the participant's mirrored profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatParticipant {
    pub chat_id: i64,
    pub profile: UserProfile,
}

impl Chat {
    pub fn has_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }
}

/// Order-independent key identifying the direct chat between two users.
///
/// Encoded as a JSON array so that no user id can collide with the separator.
pub fn pair_key(first: &str, second: &str) -> String {
    let (low, high) = if first <= second {
        (first, second)
    } else {
        (second, first)
    };
    serde_json::json!([low, high]).to_string()
}
