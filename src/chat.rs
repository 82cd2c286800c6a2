//! The floating chat widget.
//!
//! A submission is split in two halves so callers that run requests
//! concurrently can still apply replies correctly: [`ChatSession::begin_submit`]
//! records the user message and a placeholder tagged with a request id, and
//! [`ChatSession::complete`] swaps exactly that placeholder for the reply.

use crate::api::{ApiError, ChatReply, FoodApi};
use crate::history::{ChatEntry, ChatRole, HistoryStore};
use crate::markup::escape_html;
use crate::recognition::render::CONNECTION_ERROR;
use log::{debug, warn};

pub const COMPOSING_PLACEHOLDER: &str = "Đang soạn trả lời...";
pub const NO_REPLY: &str = "Không có câu trả lời.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatState {
    #[default]
    Closed,
    Open,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptItem {
    Message(ChatEntry),
    /// Transient, never persisted.
    Composing { request_id: u64 },
}

/// An issued chat request awaiting its reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingReply {
    pub request_id: u64,
    pub message: String,
}

pub struct ChatSession {
    state: ChatState,
    input: String,
    input_focused: bool,
    transcript: Vec<TranscriptItem>,
    next_request_id: u64,
    history: HistoryStore,
}

/// Display text for a chat round trip.
pub fn reply_text(result: &Result<ChatReply, ApiError>) -> String {
    match result {
        Ok(reply) => match (&reply.error, &reply.response) {
            (Some(error), _) if !error.is_empty() => format!("Lỗi: {}", error),
            (_, Some(response)) if !response.is_empty() => response.clone(),
            _ => NO_REPLY.to_string(),
        },
        Err(_) => CONNECTION_ERROR.to_string(),
    }
}

impl ChatSession {
    pub fn new(history: HistoryStore) -> Self {
        Self {
            state: ChatState::Closed,
            input: String::new(),
            input_focused: false,
            transcript: Vec::new(),
            next_request_id: 1,
            history,
        }
    }

    pub fn state(&self) -> ChatState {
        self.state
    }

    pub fn is_open(&self) -> bool {
        self.state == ChatState::Open
    }

    pub fn open(&mut self) {
        self.state = ChatState::Open;
        self.input_focused = true;
    }

    pub fn close(&mut self) {
        self.state = ChatState::Closed;
        self.input_focused = false;
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn input_focused(&self) -> bool {
        self.input_focused
    }

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    pub fn transcript(&self) -> &[TranscriptItem] {
        &self.transcript
    }

    pub fn is_composing(&self) -> bool {
        self.transcript
            .iter()
            .any(|item| matches!(item, TranscriptItem::Composing { .. }))
    }

    fn show(&mut self, entry: ChatEntry) {
        self.history.append_chat(entry.clone());
        self.transcript.push(TranscriptItem::Message(entry));
    }

    /// Takes the current input. Returns `None` (and changes nothing) when the
    /// widget is closed or the trimmed input is empty.
    pub fn begin_submit(&mut self) -> Option<PendingReply> {
        if !self.is_open() {
            debug!("Ignoring chat submit while the widget is closed");
            return None;
        }

        let message = self.input.trim().to_string();
        if message.is_empty() {
            return None;
        }

        self.show(ChatEntry::user(message.clone()));
        self.input.clear();

        let request_id = self.next_request_id;
        self.next_request_id += 1;
        self.transcript
            .push(TranscriptItem::Composing { request_id });

        Some(PendingReply {
            request_id,
            message,
        })
    }

    /// Replaces the placeholder of `pending` with the reply text.
    pub fn complete(&mut self, pending: PendingReply, result: Result<ChatReply, ApiError>) {
        if let Err(e) = &result {
            warn!("Chat request {} failed: {}", pending.request_id, e);
        }

        let entry = ChatEntry::ai(reply_text(&result));
        self.history.append_chat(entry.clone());

        let slot = self.transcript.iter().position(|item| {
            matches!(item, TranscriptItem::Composing { request_id } if *request_id == pending.request_id)
        });
        match slot {
            Some(index) => self.transcript[index] = TranscriptItem::Message(entry),
            None => self.transcript.push(TranscriptItem::Message(entry)),
        }
    }

    /// Submits `text` and waits for the reply. Returns whether a request was
    /// issued.
    pub async fn submit(&mut self, api: &dyn FoodApi, text: &str) -> bool {
        self.set_input(text);
        let Some(pending) = self.begin_submit() else {
            return false;
        };
        let result = api.chat(&pending.message).await;
        self.complete(pending, result);
        true
    }

    pub fn to_html(&self) -> String {
        self.transcript
            .iter()
            .map(|item| match item {
                TranscriptItem::Message(entry) => {
                    let class = match entry.role {
                        ChatRole::User => "chatbot-msg-user",
                        ChatRole::Ai => "chatbot-msg-ai",
                    };
                    format!(
                        r#"<div class="chatbot-msg {}">{}</div>"#,
                        class,
                        escape_html(&entry.text)
                    )
                }
                TranscriptItem::Composing { .. } => format!(
                    r#"<div class="chatbot-msg chatbot-msg-ai chatbot-msg-pending">{}</div>"#,
                    COMPOSING_PLACEHOLDER
                ),
            })
            .collect()
    }
}
