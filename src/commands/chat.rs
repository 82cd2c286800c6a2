use super::OutputFormat;
use crate::app::{AppCommand, AppState};
use crate::chat::TranscriptItem;
use log::debug;
use tokio::io::{AsyncBufReadExt, BufReader};

const EXIT_COMMANDS: &[&str] = &["/exit", "/quit"];

fn print_latest_reply(app: &AppState, format: OutputFormat) {
    match format {
        OutputFormat::Html => println!("{}", app.chat().to_html()),
        OutputFormat::Text => {
            if let Some(TranscriptItem::Message(entry)) = app.chat().transcript().last() {
                println!("AI: {}", entry.text);
            }
        }
    }
}

/// Sends one message, or runs an interactive loop over stdin when `message`
/// is `None`.
pub async fn chat(
    app: &mut AppState,
    message: Option<String>,
    format: OutputFormat,
) -> Result<(), String> {
    app.dispatch(AppCommand::OpenChat).await;

    if let Some(message) = message {
        let before = app.chat().transcript().len();
        app.dispatch(AppCommand::SubmitChat(message)).await;
        if app.chat().transcript().len() == before {
            return Err("Message must not be empty".to_string());
        }
        print_latest_reply(app, format);
        app.dispatch(AppCommand::CloseChat).await;
        return Ok(());
    }

    println!("Chat mở. Gõ /exit để thoát.");
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines
        .next_line()
        .await
        .map_err(|e| format!("Failed to read input: {}", e))?
    {
        if EXIT_COMMANDS.iter().any(|cmd| *cmd == line.trim()) {
            break;
        }
        let before = app.chat().transcript().len();
        app.dispatch(AppCommand::SubmitChat(line)).await;
        if app.chat().transcript().len() == before {
            debug!("Skipped empty chat line");
            continue;
        }
        print_latest_reply(app, format);
    }

    app.dispatch(AppCommand::CloseChat).await;
    Ok(())
}
