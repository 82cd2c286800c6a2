//! Application session state and command dispatch.
//!
//! Front-ends translate user gestures into [`AppCommand`]s and read the
//! resulting views back from [`AppState`]; nothing here knows about the
//! widgets that produced a command.

use crate::api::{ApiError, FoodApi, ImageBlob};
use crate::chat::ChatSession;
use crate::history::{HistoryStore, RecognitionEntry};
use crate::recognition::advice::{ask_about, AdviceView};
use crate::recognition::render::{render_connection_error, render_recognition, Rendered};
use crate::recognition::{Recognition, ResultAction, ResultView};
use log::{debug, info, warn};
use std::sync::Arc;

pub const SELECT_IMAGE_FIRST: &str = "Vui lòng chọn ảnh!";

#[derive(Debug, Clone, PartialEq)]
pub enum AppCommand {
    /// A file was picked; it becomes the current image without being sent.
    SelectImage(ImageBlob),
    /// Send the currently selected image.
    Upload,
    /// A camera frame was captured; it replaces the current image and is sent.
    Capture(ImageBlob),
    RetryCapture,
    /// Ask AI about the low-confidence result's top suggestion.
    AskTopAlternative,
    /// A suggested food was picked; AI is asked about it.
    PickAlternative(String),
    OpenChat,
    CloseChat,
    SubmitChat(String),
    ToggleChatHistory,
    ToggleRecognitionHistory,
    ClearChatHistory,
    ClearRecognitionHistory,
}

/// A recognition request in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecognitionTicket {
    generation: u64,
}

pub struct AppState {
    api: Arc<dyn FoodApi>,
    history: HistoryStore,
    selected_image: Option<ImageBlob>,
    result: ResultView,
    advice: Option<AdviceView>,
    notice: Option<String>,
    chat: ChatSession,
    chat_history_visible: bool,
    recognition_history_visible: bool,
    generation: u64,
}

impl AppState {
    pub fn new(api: Arc<dyn FoodApi>, history: HistoryStore) -> Self {
        Self {
            api,
            chat: ChatSession::new(history.clone()),
            history,
            selected_image: None,
            result: ResultView::Idle,
            advice: None,
            notice: None,
            chat_history_visible: false,
            recognition_history_visible: false,
            generation: 0,
        }
    }

    pub fn result(&self) -> &ResultView {
        &self.result
    }

    pub fn advice(&self) -> Option<&AdviceView> {
        self.advice.as_ref()
    }

    /// One-off message for the user (e.g. "pick an image first").
    pub fn notice(&self) -> Option<&str> {
        self.notice.as_deref()
    }

    pub fn selected_image(&self) -> Option<&ImageBlob> {
        self.selected_image.as_ref()
    }

    pub fn chat(&self) -> &ChatSession {
        &self.chat
    }

    pub fn history(&self) -> &HistoryStore {
        &self.history
    }

    pub fn chat_history_visible(&self) -> bool {
        self.chat_history_visible
    }

    pub fn recognition_history_visible(&self) -> bool {
        self.recognition_history_visible
    }

    pub async fn dispatch(&mut self, command: AppCommand) {
        debug!("Dispatching {}", command_name(&command));
        self.notice = None;

        match command {
            AppCommand::SelectImage(image) => {
                self.selected_image = Some(image);
            }
            AppCommand::Upload => match self.selected_image.clone() {
                Some(image) => self.recognize(image).await,
                None => self.notice = Some(SELECT_IMAGE_FIRST.to_string()),
            },
            AppCommand::Capture(image) => {
                self.selected_image = Some(image.clone());
                self.recognize(image).await;
            }
            AppCommand::RetryCapture => {
                self.selected_image = None;
                self.result = ResultView::Idle;
                self.advice = None;
            }
            AppCommand::AskTopAlternative => {
                let target = match &self.result {
                    ResultView::LowConfidence(view) => {
                        view.actions().into_iter().find_map(|action| match action {
                            ResultAction::AskAi { food_name } => Some(food_name),
                            _ => None,
                        })
                    }
                    _ => None,
                };
                match target {
                    Some(food_name) => self.ask_ai(&food_name).await,
                    None => debug!("Ask AI requested without a suggestion, ignoring"),
                }
            }
            AppCommand::PickAlternative(food_name) => self.ask_ai(&food_name).await,
            AppCommand::OpenChat => self.chat.open(),
            AppCommand::CloseChat => self.chat.close(),
            AppCommand::SubmitChat(text) => {
                let api = self.api.clone();
                self.chat.submit(api.as_ref(), &text).await;
            }
            AppCommand::ToggleChatHistory => {
                self.chat_history_visible = !self.chat_history_visible;
            }
            AppCommand::ToggleRecognitionHistory => {
                self.recognition_history_visible = !self.recognition_history_visible;
            }
            AppCommand::ClearChatHistory => self.history.clear_chat(),
            AppCommand::ClearRecognitionHistory => self.history.clear_recognition_history(),
        }
    }

    /// Starts a recognition: shows the loading view and invalidates any
    /// request still in flight.
    pub fn begin_recognition(&mut self) -> RecognitionTicket {
        self.generation += 1;
        self.result = ResultView::Loading;
        self.advice = None;
        RecognitionTicket {
            generation: self.generation,
        }
    }

    /// Applies a recognition outcome. Returns the stored history entry, if the
    /// outcome produced one. Outcomes of superseded requests are dropped.
    pub fn finish_recognition(
        &mut self,
        ticket: RecognitionTicket,
        outcome: Result<Recognition, ApiError>,
    ) -> Option<RecognitionEntry> {
        if ticket.generation != self.generation {
            info!(
                "Dropping stale recognition result (generation {} < {})",
                ticket.generation, self.generation
            );
            return None;
        }

        let Rendered { view, history } = match outcome {
            Ok(recognition) => {
                if let Recognition::Malformed(reason) = &recognition {
                    warn!("Malformed recognition response: {}", reason);
                }
                render_recognition(&recognition)
            }
            Err(e) => {
                warn!("Recognition request failed: {}", e);
                render_connection_error()
            }
        };

        self.result = view;
        history.map(|entry| self.history.append_recognition(entry))
    }

    async fn recognize(&mut self, image: ImageBlob) {
        let ticket = self.begin_recognition();
        let outcome = self.api.predict(&image).await;
        self.finish_recognition(ticket, outcome);
    }

    async fn ask_ai(&mut self, food_name: &str) {
        self.advice = Some(AdviceView::Loading {
            food_name: food_name.to_string(),
        });
        let api = self.api.clone();
        self.advice = Some(ask_about(api.as_ref(), food_name).await);
    }
}

fn command_name(command: &AppCommand) -> &'static str {
    match command {
        AppCommand::SelectImage(_) => "SelectImage",
        AppCommand::Upload => "Upload",
        AppCommand::Capture(_) => "Capture",
        AppCommand::RetryCapture => "RetryCapture",
        AppCommand::AskTopAlternative => "AskTopAlternative",
        AppCommand::PickAlternative(_) => "PickAlternative",
        AppCommand::OpenChat => "OpenChat",
        AppCommand::CloseChat => "CloseChat",
        AppCommand::SubmitChat(_) => "SubmitChat",
        AppCommand::ToggleChatHistory => "ToggleChatHistory",
        AppCommand::ToggleRecognitionHistory => "ToggleRecognitionHistory",
        AppCommand::ClearChatHistory => "ClearChatHistory",
        AppCommand::ClearRecognitionHistory => "ClearRecognitionHistory",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::{AskReply, ChatReply};
    use crate::store::MemoryStorage;
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MockApi {
        predictions: Mutex<VecDeque<Result<Recognition, ApiError>>>,
        predict_calls: Mutex<usize>,
        prompts: Mutex<Vec<String>>,
        chat_calls: Mutex<usize>,
    }

    impl MockApi {
        fn predicting(value: serde_json::Value) -> Self {
            let api = Self::default();
            api.predictions
                .lock()
                .unwrap()
                .push_back(Ok(Recognition::from_value(value)));
            api
        }
    }

    #[async_trait]
    impl FoodApi for MockApi {
        async fn predict(&self, _image: &ImageBlob) -> Result<Recognition, ApiError> {
            *self.predict_calls.lock().unwrap() += 1;
            self.predictions
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(ApiError::Network("no prediction queued".into())))
        }

        async fn chat(&self, _message: &str) -> Result<ChatReply, ApiError> {
            *self.chat_calls.lock().unwrap() += 1;
            Ok(ChatReply {
                response: Some("ok".into()),
                error: None,
            })
        }

        async fn ask_ai(&self, prompt: &str) -> Result<AskReply, ApiError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            Ok(AskReply {
                result: Some("answer".into()),
                error: None,
            })
        }
    }

    fn app(api: MockApi) -> (Arc<MockApi>, AppState) {
        let api = Arc::new(api);
        let history = HistoryStore::new(Arc::new(MemoryStorage::new()));
        (api.clone(), AppState::new(api, history))
    }

    fn image() -> ImageBlob {
        ImageBlob::from_capture(vec![0xff, 0xd8, 0xff])
    }

    #[tokio::test]
    async fn upload_without_image_asks_for_one() {
        let (api, mut app) = app(MockApi::default());
        app.dispatch(AppCommand::Upload).await;
        assert_eq!(app.notice(), Some(SELECT_IMAGE_FIRST));
        assert_eq!(*api.predict_calls.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn confirmed_upload_records_history() {
        let (_, mut app) = app(MockApi::predicting(json!({
            "food_name": "Phở",
            "probability": 0.92,
            "nutrition": {"items": [{"calories": 350}]}
        })));

        app.dispatch(AppCommand::SelectImage(image())).await;
        assert_eq!(app.result(), &ResultView::Idle);
        app.dispatch(AppCommand::Upload).await;

        assert!(matches!(app.result(), ResultView::Confirmed(_)));
        let entries = app.history().load_recognition_history();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].title, "Món: Phở (92.00%)");
    }

    #[tokio::test]
    async fn error_response_records_nothing() {
        let (_, mut app) = app(MockApi::predicting(json!({"error": "model unavailable"})));
        app.dispatch(AppCommand::Capture(image())).await;

        assert!(matches!(app.result(), ResultView::Error { .. }));
        assert!(app.history().load_recognition_history().is_empty());
        assert!(app.selected_image().is_some());
    }

    #[tokio::test]
    async fn network_failure_shows_connection_error() {
        let (_, mut app) = app(MockApi::default());
        app.dispatch(AppCommand::Capture(image())).await;
        assert_eq!(app.result(), &ResultView::ConnectionError);
        assert!(app.history().load_recognition_history().is_empty());
    }

    #[tokio::test]
    async fn low_confidence_follow_ups() {
        let (api, mut app) = app(MockApi::predicting(json!({
            "probability": 0.25,
            "low_confidence": true,
            "alternatives": [
                {"name": "Bún", "probability": 0.25},
                {"name": "Phở", "probability": 0.2}
            ]
        })));

        app.dispatch(AppCommand::Capture(image())).await;
        assert!(matches!(app.result(), ResultView::LowConfidence(_)));
        assert_eq!(app.history().load_recognition_history().len(), 1);

        app.dispatch(AppCommand::AskTopAlternative).await;
        assert!(api.prompts.lock().unwrap()[0].contains("'Bún'"));
        assert!(matches!(app.advice(), Some(AdviceView::Answer { .. })));

        app.dispatch(AppCommand::PickAlternative("Phở".into())).await;
        assert!(api.prompts.lock().unwrap()[1].contains("'Phở'"));

        app.dispatch(AppCommand::RetryCapture).await;
        assert_eq!(app.result(), &ResultView::Idle);
        assert!(app.advice().is_none());
        assert!(app.selected_image().is_none());
    }

    #[tokio::test]
    async fn ask_top_alternative_is_disabled_without_suggestion() {
        let (api, mut app) = app(MockApi::predicting(json!({"probability": 0.1})));
        app.dispatch(AppCommand::Capture(image())).await;
        app.dispatch(AppCommand::AskTopAlternative).await;
        assert!(api.prompts.lock().unwrap().is_empty());
        assert!(app.advice().is_none());
    }

    #[test]
    fn stale_recognition_is_dropped() {
        let (_, mut app) = app(MockApi::default());

        let first = app.begin_recognition();
        let second = app.begin_recognition();

        let newest = app.finish_recognition(
            second,
            Ok(Recognition::from_value(json!({"food_name": "Phở", "probability": 0.9}))),
        );
        assert!(newest.is_some());

        let stale = app.finish_recognition(
            first,
            Ok(Recognition::from_value(json!({"food_name": "Bún", "probability": 0.8}))),
        );
        assert!(stale.is_none());

        let ResultView::Confirmed(view) = app.result() else {
            panic!("expected confirmed view");
        };
        assert_eq!(view.food_name, "Phở");
        assert_eq!(app.history().load_recognition_history().len(), 1);
    }

    #[test]
    fn begin_recognition_shows_loading() {
        let (_, mut app) = app(MockApi::default());
        app.begin_recognition();
        assert_eq!(app.result(), &ResultView::Loading);
    }

    #[tokio::test]
    async fn chat_commands() {
        let (api, mut app) = app(MockApi::default());

        app.dispatch(AppCommand::SubmitChat("hi".into())).await;
        assert_eq!(*api.chat_calls.lock().unwrap(), 0);

        app.dispatch(AppCommand::OpenChat).await;
        app.dispatch(AppCommand::SubmitChat("   ".into())).await;
        assert_eq!(*api.chat_calls.lock().unwrap(), 0);

        app.dispatch(AppCommand::SubmitChat("hi".into())).await;
        assert_eq!(*api.chat_calls.lock().unwrap(), 1);
        assert_eq!(app.history().load_chat_history().len(), 2);

        app.dispatch(AppCommand::CloseChat).await;
        assert!(!app.chat().is_open());
    }

    #[tokio::test]
    async fn history_panel_commands() {
        let (_, mut app) = app(MockApi::predicting(json!({"food_name": "Phở", "probability": 0.9})));
        app.dispatch(AppCommand::Capture(image())).await;
        app.dispatch(AppCommand::OpenChat).await;
        app.dispatch(AppCommand::SubmitChat("hi".into())).await;

        app.dispatch(AppCommand::ToggleRecognitionHistory).await;
        assert!(app.recognition_history_visible());
        app.dispatch(AppCommand::ToggleChatHistory).await;
        assert!(app.chat_history_visible());

        app.dispatch(AppCommand::ClearChatHistory).await;
        assert!(app.history().load_chat_history().is_empty());
        assert_eq!(app.history().load_recognition_history().len(), 1);

        app.dispatch(AppCommand::ClearRecognitionHistory).await;
        assert!(app.history().load_recognition_history().is_empty());
    }
}
