//! Request and response bodies of the REST API

use courier_chats::{
    Chat, ChatKind, ContactEntry, HistoryMessage, HistoryPage, Message, MessageContent,
    UserProfile,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

#[derive(Debug, Serialize, ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub mobile: Option<String>,
    pub photo: Option<String>,
}

impl From<UserProfile> for UserResponse {
    fn from(profile: UserProfile) -> Self {
        Self {
            id: profile.id,
            name: profile.name,
            email: profile.email,
            mobile: profile.mobile,
            photo: profile.photo,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ChatResponse {
    pub id: String,
    pub participants: Vec<String>,
    pub is_group: bool,
    pub name: Option<String>,
    pub admin: Option<String>,
    pub created_at: String,
}

impl From<Chat> for ChatResponse {
    fn from(chat: Chat) -> Self {
        let (is_group, name, admin) = match chat.kind {
            ChatKind::Direct => (false, None, None),
            ChatKind::Group { name, admin } => (true, Some(name), Some(admin)),
        };

        Self {
            id: chat.id,
            participants: chat.participants,
            is_group,
            name,
            admin,
            created_at: chat.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    /// Text, gif, media, or a composite of those
    #[schema(value_type = Option<Object>)]
    pub content: Option<MessageContent>,
    pub seen: bool,
    pub created_at: String,
}

impl From<Message> for MessageResponse {
    fn from(message: Message) -> Self {
        Self {
            id: message.id,
            chat_id: message.chat_id,
            sender_id: message.sender_id,
            content: message.content,
            seen: message.seen,
            created_at: message.created_at,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryMessageResponse {
    pub id: String,
    pub chat_id: String,
    pub sender: UserResponse,
    #[schema(value_type = Option<Object>)]
    pub content: Option<MessageContent>,
    pub seen: bool,
    pub created_at: String,
}

impl From<HistoryMessage> for HistoryMessageResponse {
    fn from(message: HistoryMessage) -> Self {
        Self {
            id: message.id,
            chat_id: message.chat_id,
            sender: message.sender.into(),
            content: message.content,
            seen: message.seen,
            created_at: message.created_at,
        }
    }
}

/// One page of history, newest first
#[derive(Debug, Serialize, ToSchema)]
pub struct HistoryResponse {
    pub result: Vec<HistoryMessageResponse>,
    pub total: i64,
    pub page: u32,
}

impl From<HistoryPage> for HistoryResponse {
    fn from(page: HistoryPage) -> Self {
        Self {
            result: page.messages.into_iter().map(Into::into).collect(),
            total: page.total,
            page: page.page,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams, ToSchema)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    /// Zero based page index, 10 messages per page
    pub page: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SeenResponse {
    /// Messages that flipped to seen
    pub updated: u64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ContactEntryResponse {
    Contact {
        #[serde(flatten)]
        user: UserResponse,
    },
    Group {
        #[serde(flatten)]
        chat: ChatResponse,
    },
}

impl From<ContactEntry> for ContactEntryResponse {
    fn from(entry: ContactEntry) -> Self {
        match entry {
            ContactEntry::Contact(profile) => ContactEntryResponse::Contact {
                user: profile.into(),
            },
            ContactEntry::Group(chat) => ContactEntryResponse::Group { chat: chat.into() },
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateContactRequest {
    pub receiver: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateGroupRequest {
    pub name: String,
    /// Members besides the caller, who becomes admin
    pub users: Vec<String>,
}

/// Multipart form accepted by `POST /api/messages`
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct SendMessageForm {
    /// A user id, or the id of an existing chat
    pub receiver: String,
    pub message: Option<String>,
    pub gif: Option<String>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub image: Option<Vec<u8>>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub audio: Option<Vec<u8>>,
    #[schema(value_type = Option<String>, format = Binary)]
    pub video: Option<Vec<u8>>,
}
