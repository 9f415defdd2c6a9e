//! Message entity definitions

use serde::{Deserialize, Serialize};

use super::user::UserProfile;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: i64,
    pub public_id: String,
    pub chat_id: i64,
    pub chat_public_id: String,
    pub sender_id: String,
    pub body: Option<String>,
    pub gif: Option<String>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub video_url: Option<String>,
    pub seen: bool,
    pub created_at: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateMessageRequest {
    pub chat_id: i64,
    pub chat_public_id: String,
    pub sender_id: String,
    pub body: Option<String>,
    pub gif: Option<String>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub video_url: Option<String>,
}

/// A message row with its sender's profile expanded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageWithSender {
    pub message: ChatMessage,
    pub sender: UserProfile,
}
