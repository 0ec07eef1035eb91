//! Telegram Bot API: the subset of wire types the bot reads, and the outbound
//! `Messenger` seam used by command handlers.

pub mod client;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::session::ChatId;

/// Telegram limit for a single text message, in characters.
pub const MAX_TEXT_LEN: usize = 4096;
/// Telegram limit for a photo caption, in characters.
pub const MAX_CAPTION_LEN: usize = 1024;

#[derive(Debug, Clone, Deserialize)]
pub struct Update {
    pub update_id: i64,
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub callback_query: Option<CallbackQuery>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Message {
    pub message_id: i64,
    pub chat: Chat,
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Chat {
    pub id: ChatId,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CallbackQuery {
    pub id: String,
    /// The message carrying the pressed button. Missing for very old messages.
    #[serde(default)]
    pub message: Option<Message>,
    #[serde(default)]
    pub data: Option<String>,
}

impl Update {
    /// Chat the update belongs to, if any.
    pub fn chat_id(&self) -> Option<ChatId> {
        if let Some(message) = &self.message {
            return Some(message.chat.id);
        }
        self.callback_query
            .as_ref()
            .and_then(|q| q.message.as_ref())
            .map(|m| m.chat.id)
    }
}

/// Bot API response envelope.
#[derive(Debug, Deserialize)]
pub struct ApiResponse<T> {
    pub ok: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineButton {
    pub text: String,
    pub callback_data: String,
}

impl InlineButton {
    pub fn new(text: impl Into<String>, callback_data: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            callback_data: callback_data.into(),
        }
    }
}

/// `reply_markup` payload with inline buttons.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct InlineKeyboard {
    pub inline_keyboard: Vec<Vec<InlineButton>>,
}

impl InlineKeyboard {
    /// Keyboard with a single row of buttons.
    pub fn row(buttons: Vec<InlineButton>) -> Self {
        Self {
            inline_keyboard: vec![buttons],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inline_keyboard.iter().all(Vec::is_empty)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PhotoSource {
    /// Uploaded as multipart file content.
    Bytes(Vec<u8>),
    /// Fetched by Telegram itself.
    Url(String),
}

#[derive(Debug)]
pub enum TelegramError {
    Http(String),
    Api { method: String, description: String },
    Decode(String),
}

impl std::fmt::Display for TelegramError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TelegramError::Http(msg) => write!(f, "telegram request failed: {msg}"),
            TelegramError::Api {
                method,
                description,
            } => write!(f, "telegram {method} rejected: {description}"),
            TelegramError::Decode(msg) => write!(f, "unreadable telegram response: {msg}"),
        }
    }
}

impl std::error::Error for TelegramError {}

impl From<reqwest::Error> for TelegramError {
    fn from(e: reqwest::Error) -> Self {
        // reqwest includes the request URL, which carries the bot token.
        TelegramError::Http(e.without_url().to_string())
    }
}

/// Outbound side of the chat transport.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn send_text(
        &self,
        chat_id: ChatId,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), TelegramError>;

    async fn edit_text(
        &self,
        chat_id: ChatId,
        message_id: i64,
        text: &str,
        keyboard: Option<&InlineKeyboard>,
    ) -> Result<(), TelegramError>;

    async fn send_photo(
        &self,
        chat_id: ChatId,
        photo: PhotoSource,
        caption: &str,
    ) -> Result<(), TelegramError>;

    /// Acknowledge a callback query so the client stops its progress indicator.
    async fn answer_callback(&self, callback_id: &str) -> Result<(), TelegramError>;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum Sent {
        Text {
            chat_id: ChatId,
            text: String,
            keyboard: Option<InlineKeyboard>,
        },
        Edit {
            chat_id: ChatId,
            message_id: i64,
            text: String,
            keyboard: Option<InlineKeyboard>,
        },
        Photo {
            chat_id: ChatId,
            photo: PhotoSource,
            caption: String,
        },
        Answer {
            callback_id: String,
        },
    }

    /// Messenger that records everything it is asked to send.
    #[derive(Default)]
    pub struct RecordingMessenger {
        sent: Mutex<Vec<Sent>>,
        reject_photos: Mutex<bool>,
    }

    impl RecordingMessenger {
        pub fn reject_photos(&self) {
            *self.reject_photos.lock() = true;
        }

        pub fn sent(&self) -> Vec<Sent> {
            self.sent.lock().clone()
        }

        /// Texts of sent and edited messages, in order.
        pub fn texts(&self) -> Vec<String> {
            self.sent
                .lock()
                .iter()
                .filter_map(|s| match s {
                    Sent::Text { text, .. } | Sent::Edit { text, .. } => Some(text.clone()),
                    _ => None,
                })
                .collect()
        }

        pub fn last_text(&self) -> Option<String> {
            self.texts().pop()
        }
    }

    #[async_trait]
    impl Messenger for RecordingMessenger {
        async fn send_text(
            &self,
            chat_id: ChatId,
            text: &str,
            keyboard: Option<&InlineKeyboard>,
        ) -> Result<(), TelegramError> {
            self.sent.lock().push(Sent::Text {
                chat_id,
                text: text.to_string(),
                keyboard: keyboard.cloned(),
            });
            Ok(())
        }

        async fn edit_text(
            &self,
            chat_id: ChatId,
            message_id: i64,
            text: &str,
            keyboard: Option<&InlineKeyboard>,
        ) -> Result<(), TelegramError> {
            self.sent.lock().push(Sent::Edit {
                chat_id,
                message_id,
                text: text.to_string(),
                keyboard: keyboard.cloned(),
            });
            Ok(())
        }

        async fn send_photo(
            &self,
            chat_id: ChatId,
            photo: PhotoSource,
            caption: &str,
        ) -> Result<(), TelegramError> {
            if *self.reject_photos.lock() {
                return Err(TelegramError::Api {
                    method: "sendPhoto".into(),
                    description: "Bad Request: IMAGE_PROCESS_FAILED".into(),
                });
            }
            self.sent.lock().push(Sent::Photo {
                chat_id,
                photo,
                caption: caption.to_string(),
            });
            Ok(())
        }

        async fn answer_callback(&self, callback_id: &str) -> Result<(), TelegramError> {
            self.sent.lock().push(Sent::Answer {
                callback_id: callback_id.to_string(),
            });
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_update_deserializes_and_ignores_unknown_fields() {
        let raw = r#"{
            "update_id": 10,
            "message": {
                "message_id": 5,
                "date": 1700000000,
                "from": {"id": 99, "is_bot": false, "first_name": "A"},
                "chat": {"id": 99, "type": "private"},
                "text": "водка"
            }
        }"#;
        let update: Update = serde_json::from_str(raw).unwrap();
        assert_eq!(update.chat_id(), Some(99));
        assert_eq!(update.message.unwrap().text.as_deref(), Some("водка"));
    }

    #[test]
    fn callback_update_takes_chat_from_its_message() {
        let raw = r#"{
            "update_id": 11,
            "callback_query": {
                "id": "cb-1",
                "from": {"id": 99, "is_bot": false, "first_name": "A"},
                "message": {"message_id": 6, "chat": {"id": -100}},
                "data": "/ingredients_2"
            }
        }"#;
        let update: Update = serde_json::from_str(raw).unwrap();
        assert_eq!(update.chat_id(), Some(-100));
        assert_eq!(update.callback_query.unwrap().data.as_deref(), Some("/ingredients_2"));
    }

    #[test]
    fn keyboard_serializes_as_reply_markup() {
        let keyboard = InlineKeyboard::row(vec![InlineButton::new("Next", "/ingredients_1")]);
        assert_eq!(
            serde_json::to_value(&keyboard).unwrap(),
            serde_json::json!({"inline_keyboard": [[{"text": "Next", "callback_data": "/ingredients_1"}]]})
        );
        assert!(!keyboard.is_empty());
        assert!(InlineKeyboard::default().is_empty());
    }
}
