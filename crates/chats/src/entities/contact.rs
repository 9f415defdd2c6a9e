use serde::{Deserialize, Serialize};

use super::chat::Chat;
use courier_database::UserProfile;

/// One entry of a user's contact directory: the other side of a direct chat, or a group.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContactEntry {
    Contact(UserProfile),
    Group(Chat),
}
