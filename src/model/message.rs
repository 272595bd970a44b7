//! Chat messages: server-confirmed, pending (optimistic) and outgoing

use crate::model::{format, wire};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix of client-generated identifiers for messages still in flight
pub const TEMP_ID_PREFIX: &str = "temp_";

/// Generate a fresh `temp_*` identifier
pub fn new_temp_id() -> String {
    format!("{}{}", TEMP_ID_PREFIX, uuid::Uuid::new_v4())
}

/// Kind of message content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum MessageType {
    /// Plain text
    #[default]
    Text = 0,
    /// Image, content is a placeholder and `file_url` points at the media
    Image = 1,
    /// Video, content is a placeholder and `file_url` points at the media
    Video = 3,
}

impl From<i64> for MessageType {
    fn from(value: i64) -> Self {
        match value {
            1 => Self::Image,
            3 => Self::Video,
            _ => Self::Text,
        }
    }
}

impl From<MessageType> for i64 {
    fn from(kind: MessageType) -> Self {
        kind as i64
    }
}

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum SenderType {
    /// The customer
    #[default]
    Customer = 0,
    /// Clinic staff
    Admin = 1,
}

impl From<i64> for SenderType {
    fn from(value: i64) -> Self {
        if value == 1 { Self::Admin } else { Self::Customer }
    }
}

impl From<SenderType> for i64 {
    fn from(sender: SenderType) -> Self {
        sender as i64
    }
}

/// A message as confirmed by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerMessage {
    /// Server-assigned message id
    #[serde(alias = "MessageId")]
    pub message_id: i64,
    /// Text content, or a placeholder for media
    #[serde(default, alias = "MessageContent", deserialize_with = "wire::nullable")]
    pub message_content: String,
    /// Content kind
    #[serde(default, alias = "MessageType", deserialize_with = "wire::nullable")]
    pub message_type: MessageType,
    /// Media URL, present for non-text messages
    #[serde(default, alias = "FileUrl")]
    pub file_url: Option<String>,
    /// Author kind
    #[serde(default, alias = "SenderType", deserialize_with = "wire::nullable")]
    pub sender_type: SenderType,
    /// Author display name
    #[serde(default, alias = "SenderName", deserialize_with = "wire::nullable")]
    pub sender_name: String,
    /// Creation time
    #[serde(default, alias = "CreatedAt", deserialize_with = "wire::timestamp")]
    pub created_at: Option<DateTime<Utc>>,
}

/// Page of messages as returned by the backend
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MessageListResponse {
    /// Messages in this page
    #[serde(default, alias = "Messages", deserialize_with = "wire::lenient_list")]
    pub messages: Vec<ServerMessage>,
}

/// Media kinds that can be sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// Image upload
    Image,
    /// Video upload
    Video,
}

impl MediaKind {
    /// Message type used on the wire
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Image => MessageType::Image,
            Self::Video => MessageType::Video,
        }
    }

    /// Placeholder content stored for this media kind
    pub fn placeholder(&self) -> &'static str {
        match self {
            Self::Image => format::IMAGE_PLACEHOLDER,
            Self::Video => format::VIDEO_PLACEHOLDER,
        }
    }
}

/// A message the admin wants to send
///
/// Text messages never carry a file URL and media messages always do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutgoingMessage {
    /// Plain text
    Text(String),
    /// Already-uploaded media
    Media {
        /// Media kind
        kind: MediaKind,
        /// Public URL returned by the uploader
        url: String,
    },
}

impl OutgoingMessage {
    /// Content sent to the server
    pub fn content(&self) -> &str {
        match self {
            Self::Text(text) => text,
            Self::Media { kind, .. } => kind.placeholder(),
        }
    }

    /// Message type sent to the server
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Text(_) => MessageType::Text,
            Self::Media { kind, .. } => kind.message_type(),
        }
    }

    /// File URL sent to the server
    pub fn file_url(&self) -> Option<&str> {
        match self {
            Self::Text(_) => None,
            Self::Media { url, .. } => Some(url),
        }
    }

    /// Room list preview for this message
    pub fn preview(&self) -> String {
        format::preview_for(self.content(), self.message_type())
    }
}

/// Identity of a message in a conversation window
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageId {
    /// Confirmed by the server
    Server(i64),
    /// Client-generated, still in flight (`temp_*`)
    Temp(String),
}

impl MessageId {
    /// Whether this id belongs to an in-flight message
    pub fn is_temp(&self) -> bool {
        matches!(self, Self::Temp(_))
    }
}

/// A locally-created message awaiting server confirmation
#[derive(Debug, Clone, PartialEq)]
pub struct PendingMessage {
    /// Temporary id, prefixed with `temp_`
    pub temp_id: String,
    /// Content as it will be sent
    pub content: String,
    /// Content kind
    pub message_type: MessageType,
    /// Media URL, once uploaded
    pub file_url: Option<String>,
    /// Local creation time
    pub created_at: DateTime<Utc>,
}

impl PendingMessage {
    /// Create a pending message for an outgoing message
    pub fn new(outgoing: &OutgoingMessage) -> Self {
        Self {
            temp_id: new_temp_id(),
            content: outgoing.content().to_string(),
            message_type: outgoing.message_type(),
            file_url: outgoing.file_url().map(str::to_string),
            created_at: Utc::now(),
        }
    }
}

/// A message in a conversation window
#[derive(Debug, Clone, PartialEq)]
pub enum ChatMessage {
    /// Optimistic, not yet confirmed
    Pending(PendingMessage),
    /// Confirmed by the server
    Confirmed(ServerMessage),
}

impl ChatMessage {
    /// Identity used for deduplication
    pub fn id(&self) -> MessageId {
        match self {
            Self::Pending(msg) => MessageId::Temp(msg.temp_id.clone()),
            Self::Confirmed(msg) => MessageId::Server(msg.message_id),
        }
    }

    /// Whether this message is still awaiting confirmation
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Text content or media placeholder
    pub fn content(&self) -> &str {
        match self {
            Self::Pending(msg) => &msg.content,
            Self::Confirmed(msg) => &msg.message_content,
        }
    }

    /// Content kind
    pub fn message_type(&self) -> MessageType {
        match self {
            Self::Pending(msg) => msg.message_type,
            Self::Confirmed(msg) => msg.message_type,
        }
    }

    /// Media URL, if any
    pub fn file_url(&self) -> Option<&str> {
        match self {
            Self::Pending(msg) => msg.file_url.as_deref(),
            Self::Confirmed(msg) => msg.file_url.as_deref(),
        }
    }

    /// Author kind; pending messages are always the admin's
    pub fn sender_type(&self) -> SenderType {
        match self {
            Self::Pending(_) => SenderType::Admin,
            Self::Confirmed(msg) => msg.sender_type,
        }
    }

    /// Author display name
    pub fn sender_name(&self) -> &str {
        match self {
            Self::Pending(_) => "",
            Self::Confirmed(msg) => &msg.sender_name,
        }
    }

    /// Creation time, if known
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Pending(msg) => Some(msg.created_at),
            Self::Confirmed(msg) => msg.created_at,
        }
    }

    /// Display-formatted creation time
    pub fn display_time(&self) -> String {
        self.created_at()
            .map(format::message_timestamp)
            .unwrap_or_default()
    }
}

impl From<ServerMessage> for ChatMessage {
    fn from(msg: ServerMessage) -> Self {
        Self::Confirmed(msg)
    }
}
