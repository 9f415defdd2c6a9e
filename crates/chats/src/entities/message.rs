use serde::{Deserialize, Serialize};

use courier_database::{ChatMessage, MessageWithSender, UserProfile};

/// Kind of binary attachment a message can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
    Video,
}

impl MediaKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Audio => "audio",
            MediaKind::Video => "video",
        }
    }
}

/// What a message carries. A message with no content at all is not representable here;
/// rows stored without any content surface as `Message::content == None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageContent {
    Text { text: String },
    Gif { reference: String },
    Media { kind: MediaKind, url: String },
    Composite { parts: Vec<MessageContent> },
}

/// Flat column view of a message's content, matching the `messages` table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentColumns {
    pub body: Option<String>,
    pub gif: Option<String>,
    pub image_url: Option<String>,
    pub audio_url: Option<String>,
    pub video_url: Option<String>,
}

impl MessageContent {
    /// Build content from the individually optional slots.
    ///
    /// Empty strings count as absent. Returns `None` when nothing is left, a single
    /// variant when one slot is filled, and `Composite` otherwise.
    pub fn from_parts(
        text: Option<String>,
        gif: Option<String>,
        media: impl IntoIterator<Item = (MediaKind, String)>,
    ) -> Option<Self> {
        let mut parts = Vec::new();

        if let Some(text) = text.filter(|t| !t.is_empty()) {
            parts.push(MessageContent::Text { text });
        }
        if let Some(reference) = gif.filter(|g| !g.is_empty()) {
            parts.push(MessageContent::Gif { reference });
        }
        for (kind, url) in media {
            if !url.is_empty() {
                parts.push(MessageContent::Media { kind, url });
            }
        }

        match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(MessageContent::Composite { parts }),
        }
    }

    /// Rebuild content from stored columns
    pub fn from_columns(columns: ContentColumns) -> Option<Self> {
        let media = [
            (MediaKind::Image, columns.image_url),
            (MediaKind::Audio, columns.audio_url),
            (MediaKind::Video, columns.video_url),
        ]
        .into_iter()
        .filter_map(|(kind, url)| url.map(|url| (kind, url)));

        Self::from_parts(columns.body, columns.gif, media)
    }

    pub fn to_columns(&self) -> ContentColumns {
        let mut columns = ContentColumns::default();
        self.fill_columns(&mut columns);
        columns
    }

    fn fill_columns(&self, columns: &mut ContentColumns) {
        match self {
            MessageContent::Text { text } => columns.body = Some(text.clone()),
            MessageContent::Gif { reference } => columns.gif = Some(reference.clone()),
            MessageContent::Media { kind, url } => {
                let slot = match kind {
                    MediaKind::Image => &mut columns.image_url,
                    MediaKind::Audio => &mut columns.audio_url,
                    MediaKind::Video => &mut columns.video_url,
                };
                *slot = Some(url.clone());
            }
            MessageContent::Composite { parts } => {
                for part in parts {
                    part.fill_columns(columns);
                }
            }
        }
    }
}

/// A stored message. Only `seen` ever changes after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub sender_id: String,
    pub content: Option<MessageContent>,
    pub seen: bool,
    pub created_at: String,
}

impl From<ChatMessage> for Message {
    fn from(row: ChatMessage) -> Self {
        let content = MessageContent::from_columns(ContentColumns {
            body: row.body,
            gif: row.gif,
            image_url: row.image_url,
            audio_url: row.audio_url,
            video_url: row.video_url,
        });

        Self {
            id: row.public_id,
            chat_id: row.chat_public_id,
            sender_id: row.sender_id,
            content,
            seen: row.seen,
            created_at: row.created_at,
        }
    }
}

/// A message as served by history, with the sender's identity expanded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryMessage {
    pub id: String,
    pub chat_id: String,
    pub sender: UserProfile,
    pub content: Option<MessageContent>,
    pub seen: bool,
    pub created_at: String,
}

impl From<MessageWithSender> for HistoryMessage {
    fn from(entry: MessageWithSender) -> Self {
        let message = Message::from(entry.message);
        Self {
            id: message.id,
            chat_id: message.chat_id,
            sender: entry.sender,
            content: message.content,
            seen: message.seen,
            created_at: message.created_at,
        }
    }
}

/// One page of a conversation, newest message first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryPage {
    pub messages: Vec<HistoryMessage>,
    /// Number of messages in the whole conversation
    pub total: i64,
    pub page: u32,
}
