use super::OutputFormat;
use crate::api::ImageBlob;
use crate::app::{AppCommand, AppState};
use crate::recognition::ResultView;
use std::path::Path;

fn print_result(app: &AppState, format: OutputFormat) {
    if let Some(notice) = app.notice() {
        println!("{}", notice);
    }
    match format {
        OutputFormat::Text => print!("{}", app.result().to_text()),
        OutputFormat::Html => println!("{}", app.result().to_html()),
    }
    if let Some(advice) = app.advice() {
        match format {
            OutputFormat::Text => println!("{}", advice.to_text()),
            OutputFormat::Html => println!("{}", advice.to_html()),
        }
    }
}

/// Uploads the image at `path`; with `ask_ai`, a low-confidence result is
/// followed by an ask-AI round trip for the top suggestion.
pub async fn predict(
    app: &mut AppState,
    path: &Path,
    capture: bool,
    ask_ai: bool,
    format: OutputFormat,
) -> Result<(), String> {
    let image = ImageBlob::from_path(path).await?;

    if capture {
        let frame = ImageBlob::from_capture(image.bytes().to_vec());
        app.dispatch(AppCommand::Capture(frame)).await;
    } else {
        app.dispatch(AppCommand::SelectImage(image)).await;
        app.dispatch(AppCommand::Upload).await;
    }

    if ask_ai && matches!(app.result(), ResultView::LowConfidence(_)) {
        app.dispatch(AppCommand::AskTopAlternative).await;
    }

    print_result(app, format);
    Ok(())
}

pub async fn ask(app: &mut AppState, food_name: &str, format: OutputFormat) -> Result<(), String> {
    let food_name = food_name.trim();
    if food_name.is_empty() {
        return Err("Food name must not be empty".to_string());
    }
    app.dispatch(AppCommand::PickAlternative(food_name.to_string()))
        .await;
    if let Some(advice) = app.advice() {
        match format {
            OutputFormat::Text => println!("{}", advice.to_text()),
            OutputFormat::Html => println!("{}", advice.to_html()),
        }
    }
    Ok(())
}
