use crate::markup::{escape_html, escape_multiline};
use crate::store::StorageArea;
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub const CHAT_HISTORY_KEY: &str = "foodninja_chat_history_v1";
pub const RECOGNITION_HISTORY_KEY: &str = "foodninja_recognition_history_v1";
pub const DEFAULT_HISTORY_LIMIT: usize = 100;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Ai,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatEntry {
    pub role: ChatRole,
    pub text: String,
}

impl ChatEntry {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
        }
    }

    pub fn ai(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Ai,
            text: text.into(),
        }
    }
}

/// A recognition event before it is stamped and stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewRecognition {
    pub title: String,
    pub body: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct RecognitionEntry {
    pub title: String,
    pub body: String,
    /// Epoch milliseconds.
    pub time: i64,
}

/// Owner of the two persisted history lists.
///
/// Both lists are append-only and keep only the most recent `limit` entries.
/// Reads never fail: absent or unparsable data is an empty list.
#[derive(Clone)]
pub struct HistoryStore {
    storage: Arc<dyn StorageArea>,
    limit: usize,
}

impl HistoryStore {
    pub fn new(storage: Arc<dyn StorageArea>) -> Self {
        Self::with_limit(storage, DEFAULT_HISTORY_LIMIT)
    }

    /// `limit` can only lower the cap; it is clamped to
    /// `1..=DEFAULT_HISTORY_LIMIT`.
    pub fn with_limit(storage: Arc<dyn StorageArea>, limit: usize) -> Self {
        Self {
            storage,
            limit: limit.clamp(1, DEFAULT_HISTORY_LIMIT),
        }
    }

    pub fn load_chat_history(&self) -> Vec<ChatEntry> {
        self.load_list(CHAT_HISTORY_KEY)
    }

    pub fn append_chat(&self, entry: ChatEntry) {
        let mut items = self.load_chat_history();
        items.push(entry);
        self.save_list(CHAT_HISTORY_KEY, items);
    }

    pub fn clear_chat(&self) {
        self.save_list::<ChatEntry>(CHAT_HISTORY_KEY, Vec::new());
    }

    pub fn load_recognition_history(&self) -> Vec<RecognitionEntry> {
        self.load_list(RECOGNITION_HISTORY_KEY)
    }

    /// Stamps `entry` with the current time and appends it.
    pub fn append_recognition(&self, entry: NewRecognition) -> RecognitionEntry {
        let stored = RecognitionEntry {
            title: entry.title,
            body: entry.body,
            time: chrono::Utc::now().timestamp_millis(),
        };
        let mut items = self.load_recognition_history();
        items.push(stored.clone());
        self.save_list(RECOGNITION_HISTORY_KEY, items);
        stored
    }

    pub fn clear_recognition_history(&self) {
        self.save_list::<RecognitionEntry>(RECOGNITION_HISTORY_KEY, Vec::new());
    }

    fn load_list<T: DeserializeOwned>(&self, key: &str) -> Vec<T> {
        let Some(raw) = self.storage.get_item(key) else {
            return Vec::new();
        };
        match serde_json::from_str::<Vec<T>>(&raw) {
            Ok(items) => items,
            Err(e) => {
                warn!("Ignoring unreadable history under '{}': {}", key, e);
                Vec::new()
            }
        }
    }

    fn save_list<T: Serialize>(&self, key: &str, mut items: Vec<T>) {
        if items.len() > self.limit {
            let excess = items.len() - self.limit;
            items.drain(..excess);
        }

        let raw = match serde_json::to_string(&items) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Failed to serialize history '{}': {}", key, e);
                return;
            }
        };

        match self.storage.set_item(key, &raw) {
            Ok(()) => debug!("Saved {} entries under '{}'", items.len(), key),
            Err(e) => warn!("Failed to save history '{}': {}", key, e),
        }
    }
}

pub fn render_chat_history_html(items: &[ChatEntry]) -> String {
    if items.is_empty() {
        return r#"<div style="color:#888;">Chưa có lịch sử.</div>"#.to_string();
    }
    items
        .iter()
        .map(|it| {
            let class = match it.role {
                ChatRole::User => "chatbot-msg-user",
                ChatRole::Ai => "chatbot-msg-ai",
            };
            format!(
                r#"<div class="chatbot-msg {}">{}</div>"#,
                class,
                escape_html(&it.text)
            )
        })
        .collect()
}

pub fn render_recognition_history_html(items: &[RecognitionEntry]) -> String {
    if items.is_empty() {
        return r#"<div style="color:#888;">Chưa có lịch sử nhận diện.</div>"#.to_string();
    }
    items
        .iter()
        .map(|it| {
            format!(
                r#"<div class="history-item"><div class="history-title">{}</div><div class="history-body">{}</div></div>"#,
                escape_html(&it.title),
                escape_multiline(&it.body)
            )
        })
        .collect()
}
