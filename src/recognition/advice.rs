use super::render::CONNECTION_ERROR;
use crate::api::{AskReply, FoodApi};
use crate::markup::{escape_html, escape_multiline};
use log::{debug, warn};

pub const ADVICE_LOADING: &str = "AI đang phân tích...";
pub const NO_ANSWER: &str = "Không có câu trả lời.";

/// Prompt sent to `/ask_ai` for a suggested food.
pub fn build_prompt(food_name: &str) -> String {
    format!(
        "Món ăn '{}' có thông tin dinh dưỡng như thế nào? \
         Hãy nêu lợi ích, rủi ro sức khỏe (nếu có) và gợi ý ăn uống lành mạnh. \
         (Trả lời ngắn gọn, dễ hiểu, hướng tới người tiêu dùng)",
        food_name
    )
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdviceView {
    Loading { food_name: String },
    Answer { food_name: String, text: String },
    Error { message: String },
    ConnectionError,
}

impl AdviceView {
    pub fn to_html(&self) -> String {
        match self {
            AdviceView::Loading { food_name } => format!(
                r#"<div class="ai-answer-card"><span class="spinner"></span> {} <b>{}</b></div>"#,
                ADVICE_LOADING,
                escape_html(food_name)
            ),
            AdviceView::Answer { food_name, text } => format!(
                r#"<div class="ai-answer-card"><div class="ai-answer-title">🤖 AI nói về {}</div><div class="ai-answer-content">{}</div></div>"#,
                escape_html(food_name),
                escape_multiline(text)
            ),
            AdviceView::Error { message } => format!(
                r#"<span style="color:#FF6347;">Lỗi: {}</span>"#,
                escape_html(message)
            ),
            AdviceView::ConnectionError => {
                format!(r#"<span style="color:#FF6347;">{}</span>"#, CONNECTION_ERROR)
            }
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            AdviceView::Loading { food_name } => format!("{} {}", ADVICE_LOADING, food_name),
            AdviceView::Answer { food_name, text } => format!("🤖 AI nói về {}\n{}", food_name, text),
            AdviceView::Error { message } => format!("Lỗi: {}", message),
            AdviceView::ConnectionError => CONNECTION_ERROR.to_string(),
        }
    }
}

fn advice_from_reply(food_name: &str, reply: AskReply) -> AdviceView {
    if let Some(error) = reply.error.filter(|e| !e.is_empty()) {
        return AdviceView::Error { message: error };
    }
    AdviceView::Answer {
        food_name: food_name.to_string(),
        text: reply
            .result
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| NO_ANSWER.to_string()),
    }
}

/// Runs one ask-AI round trip for `food_name`. Never fails: every outcome is
/// a displayable view.
pub async fn ask_about(api: &dyn FoodApi, food_name: &str) -> AdviceView {
    debug!("Asking AI about '{}'", food_name);
    match api.ask_ai(&build_prompt(food_name)).await {
        Ok(reply) => advice_from_reply(food_name, reply),
        Err(e) => {
            warn!("Ask AI failed for '{}': {}", food_name, e);
            AdviceView::ConnectionError
        }
    }
}
