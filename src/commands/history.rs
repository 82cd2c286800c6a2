use super::OutputFormat;
use crate::app::{AppCommand, AppState};
use crate::history::{render_chat_history_html, render_recognition_history_html, ChatRole};
use chrono::{Local, TimeZone};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryKind {
    Chat,
    Recognition,
}

pub async fn clear(app: &mut AppState, kind: HistoryKind) -> Result<(), String> {
    let command = match kind {
        HistoryKind::Chat => AppCommand::ClearChatHistory,
        HistoryKind::Recognition => AppCommand::ClearRecognitionHistory,
    };
    app.dispatch(command).await;
    println!("Đã xóa lịch sử.");
    Ok(())
}

pub fn show(app: &AppState, kind: HistoryKind, format: OutputFormat) -> Result<(), String> {
    match (kind, format) {
        (HistoryKind::Chat, OutputFormat::Html) => {
            println!("{}", render_chat_history_html(&app.history().load_chat_history()))
        }
        (HistoryKind::Recognition, OutputFormat::Html) => println!(
            "{}",
            render_recognition_history_html(&app.history().load_recognition_history())
        ),
        (HistoryKind::Chat, OutputFormat::Text) => {
            let items = app.history().load_chat_history();
            if items.is_empty() {
                println!("Chưa có lịch sử.");
            }
            for item in items {
                let who = match item.role {
                    ChatRole::User => "Bạn",
                    ChatRole::Ai => "AI",
                };
                println!("{}: {}", who, item.text);
            }
        }
        (HistoryKind::Recognition, OutputFormat::Text) => {
            let items = app.history().load_recognition_history();
            if items.is_empty() {
                println!("Chưa có lịch sử nhận diện.");
            }
            for item in items {
                let when = Local
                    .timestamp_millis_opt(item.time)
                    .single()
                    .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_default();
                println!("[{}] {}\n{}\n", when, item.title, item.body);
            }
        }
    }
    Ok(())
}
