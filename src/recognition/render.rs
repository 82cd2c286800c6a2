use super::decision::{classify, Branch};
use super::{Recognition, RecognitionResponse};
use crate::history::NewRecognition;
use crate::markup::{escape_html, escape_multiline, percent_2dp, percent_whole};
use serde_json::Value;

pub const CONNECTION_ERROR: &str = "Lỗi kết nối server!";
pub const LOADING_TEXT: &str = "Đang nhận diện...";
pub const MALFORMED_RESPONSE: &str = "Phản hồi từ server không hợp lệ";
pub const NUTRITION_NOT_FOUND: &str = "Không tìm thấy thông tin dinh dưỡng.";
pub const NO_AI_ANALYSIS: &str = "Không có phân tích AI";
pub const NO_ALTERNATIVES: &str = "Không có món gợi ý, vui lòng chụp lại ảnh.";
pub const ASK_AI_LABEL: &str = "🤖 Hỏi AI về món này";
pub const RETRY_LABEL: &str = "📷 Chụp lại";

/// A follow-up the user can trigger from a rendered result.
#[derive(Debug, Clone, PartialEq)]
pub enum ResultAction {
    PickAlternative { name: String, probability: f64 },
    AskAi { food_name: String },
    RetryCapture,
}

impl ResultAction {
    pub fn label(&self) -> String {
        match self {
            ResultAction::PickAlternative { name, probability } => {
                format!("{} ({}%)", name, percent_whole(*probability))
            }
            ResultAction::AskAi { .. } => ASK_AI_LABEL.to_string(),
            ResultAction::RetryCapture => RETRY_LABEL.to_string(),
        }
    }

    fn to_html(&self) -> String {
        match self {
            ResultAction::PickAlternative { name, .. } => format!(
                r#"<button class="alt-btn" data-food="{}">{}</button>"#,
                escape_html(name),
                escape_html(&self.label())
            ),
            ResultAction::AskAi { food_name } => format!(
                r#"<button class="ask-ai-btn" data-food="{}">{}</button>"#,
                escape_html(food_name),
                ASK_AI_LABEL
            ),
            ResultAction::RetryCapture => {
                format!(r#"<button class="retry-btn">{}</button>"#, RETRY_LABEL)
            }
        }
    }

    fn to_text(&self) -> String {
        match self {
            ResultAction::PickAlternative { .. } => self.label(),
            ResultAction::AskAi { food_name } => format!("→ Hỏi AI về: {}", food_name),
            ResultAction::RetryCapture => "→ Chụp lại ảnh để thử lại".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AlternativeChoice {
    pub name: String,
    pub probability: f64,
}

impl AlternativeChoice {
    pub fn label(&self) -> String {
        format!("{} ({}%)", self.name, percent_whole(self.probability))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LowConfidenceView {
    pub message: String,
    pub probability: f64,
    pub threshold: f64,
    pub alternatives: Vec<AlternativeChoice>,
    /// Food the "ask AI" action targets; `None` disables the action.
    pub ask_ai_target: Option<String>,
}

impl LowConfidenceView {
    pub fn actions(&self) -> Vec<ResultAction> {
        let mut actions: Vec<ResultAction> = self
            .alternatives
            .iter()
            .map(|alt| ResultAction::PickAlternative {
                name: alt.name.clone(),
                probability: alt.probability,
            })
            .collect();
        if let Some(food_name) = &self.ask_ai_target {
            actions.push(ResultAction::AskAi {
                food_name: food_name.clone(),
            });
        }
        actions.push(ResultAction::RetryCapture);
        actions
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ConfirmedView {
    pub food_name: String,
    pub probability: f64,
    /// Pairs from the first nutrition item; `None` when there is none.
    pub nutrition: Option<Vec<(String, String)>>,
    pub ai_answer: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResultView {
    #[default]
    Idle,
    Loading,
    Error {
        message: String,
    },
    ConnectionError,
    LowConfidence(LowConfidenceView),
    Confirmed(ConfirmedView),
}

/// Output of the renderer: what to show, and the history entry to record.
#[derive(Debug, Clone, PartialEq)]
pub struct Rendered {
    pub view: ResultView,
    pub history: Option<NewRecognition>,
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn render(branch: Branch, response: &RecognitionResponse) -> Rendered {
    match branch {
        Branch::Error => Rendered {
            view: ResultView::Error {
                message: response.error_text().unwrap_or(MALFORMED_RESPONSE).to_string(),
            },
            history: None,
        },
        Branch::LowConfidence => render_low_confidence(response),
        Branch::Confirmed => render_confirmed(response),
    }
}

pub fn render_recognition(recognition: &Recognition) -> Rendered {
    match recognition {
        Recognition::Parsed(response) => render(classify(response), response),
        Recognition::Malformed(_) => Rendered {
            view: ResultView::Error {
                message: MALFORMED_RESPONSE.to_string(),
            },
            history: None,
        },
    }
}

/// Rendering for a request that never produced a usable body.
pub fn render_connection_error() -> Rendered {
    Rendered {
        view: ResultView::ConnectionError,
        history: None,
    }
}

fn render_low_confidence(response: &RecognitionResponse) -> Rendered {
    let probability = response.probability();
    let threshold = response.threshold();
    let p = percent_whole(probability);
    let t = percent_whole(threshold);

    let message = match response.message.as_deref() {
        Some(message) if !message.is_empty() => message.to_string(),
        _ => format!(
            "Không chắc chắn về món ăn (độ tin cậy {}% < ngưỡng {}%)",
            p, t
        ),
    };

    let alternatives: Vec<AlternativeChoice> = response
        .alternatives()
        .iter()
        .map(|alt| AlternativeChoice {
            name: alt.name.clone(),
            probability: alt.probability,
        })
        .collect();

    let ask_ai_target = alternatives
        .first()
        .map(|alt| alt.name.clone())
        .filter(|name| !name.trim().is_empty())
        .or_else(|| response.food_name.clone())
        .filter(|name| !name.trim().is_empty());

    let body = if alternatives.is_empty() {
        NO_ALTERNATIVES.to_string()
    } else {
        alternatives
            .iter()
            .map(AlternativeChoice::label)
            .collect::<Vec<_>>()
            .join(", ")
    };

    Rendered {
        history: Some(NewRecognition {
            title: format!("Độ tin cậy thấp: {}% < {}%", p, t),
            body,
        }),
        view: ResultView::LowConfidence(LowConfidenceView {
            message,
            probability,
            threshold,
            alternatives,
            ask_ai_target,
        }),
    }
}

fn render_confirmed(response: &RecognitionResponse) -> Rendered {
    let food_name = response.food_name.clone().unwrap_or_default();
    let probability = response.probability();

    let nutrition = response.first_nutrition_item().map(|item| {
        item.iter()
            .map(|(key, value)| (key.clone(), value_text(value)))
            .collect::<Vec<_>>()
    });

    let ai_answer = response.ai_answer.clone().filter(|a| !a.is_empty());

    Rendered {
        history: Some(NewRecognition {
            title: format!("Món: {} ({}%)", food_name, percent_2dp(probability)),
            body: ai_answer
                .clone()
                .unwrap_or_else(|| NO_AI_ANALYSIS.to_string()),
        }),
        view: ResultView::Confirmed(ConfirmedView {
            food_name,
            probability,
            nutrition,
            ai_answer,
        }),
    }
}

impl ResultView {
    pub fn to_html(&self) -> String {
        match self {
            ResultView::Idle => String::new(),
            ResultView::Loading => format!(
                r#"<span class="spinner"></span> <span style="color:#4CAF50;">{}</span>"#,
                LOADING_TEXT
            ),
            ResultView::Error { message } => format!(
                r#"<span style="color:#FF6347;">Lỗi: {}</span>"#,
                escape_html(message)
            ),
            ResultView::ConnectionError => {
                format!(r#"<span style="color:#FF6347;">{}</span>"#, CONNECTION_ERROR)
            }
            ResultView::LowConfidence(view) => low_confidence_html(view),
            ResultView::Confirmed(view) => confirmed_html(view),
        }
    }

    pub fn to_text(&self) -> String {
        match self {
            ResultView::Idle => String::new(),
            ResultView::Loading => LOADING_TEXT.to_string(),
            ResultView::Error { message } => format!("Lỗi: {}", message),
            ResultView::ConnectionError => CONNECTION_ERROR.to_string(),
            ResultView::LowConfidence(view) => {
                let mut out = format!("⚠️ {}\n", view.message);
                let mut picks = 0;
                for action in view.actions() {
                    if let ResultAction::PickAlternative { .. } = action {
                        picks += 1;
                        out.push_str(&format!("  {}. {}\n", picks, action.to_text()));
                    } else {
                        out.push_str(&action.to_text());
                        out.push('\n');
                    }
                }
                out
            }
            ResultView::Confirmed(view) => {
                let mut out = format!(
                    "🍎 Món ăn: {} (Xác suất: {}%)\n",
                    view.food_name,
                    percent_2dp(view.probability)
                );
                match &view.nutrition {
                    Some(pairs) => {
                        out.push_str("🥗 Thông tin dinh dưỡng:\n");
                        for (key, value) in pairs {
                            out.push_str(&format!("  - {}: {}\n", key, value));
                        }
                    }
                    None => {
                        out.push_str(NUTRITION_NOT_FOUND);
                        out.push('\n');
                    }
                }
                if let Some(answer) = &view.ai_answer {
                    out.push_str("🤖 Phân tích & gợi ý từ AI\n");
                    out.push_str(answer);
                    out.push('\n');
                }
                out
            }
        }
    }
}

fn low_confidence_html(view: &LowConfidenceView) -> String {
    let mut html = format!(
        r#"<div class="low-confidence-card"><div class="low-confidence-message" style="color:#FF8C00;">⚠️ {}</div>"#,
        escape_html(&view.message)
    );

    let (picks, follow_ups): (Vec<ResultAction>, Vec<ResultAction>) = view
        .actions()
        .into_iter()
        .partition(|action| matches!(action, ResultAction::PickAlternative { .. }));

    if !picks.is_empty() {
        html.push_str(r#"<div class="alternatives"><b>Có thể là:</b>"#);
        for action in &picks {
            html.push_str(&action.to_html());
        }
        html.push_str("</div>");
    }

    html.push_str(r#"<div class="result-actions">"#);
    if view.ask_ai_target.is_none() {
        html.push_str(&format!(
            r#"<button class="ask-ai-btn" disabled>{}</button>"#,
            ASK_AI_LABEL
        ));
    }
    for action in &follow_ups {
        html.push_str(&action.to_html());
    }
    html.push_str("</div></div>");
    html
}

fn confirmed_html(view: &ConfirmedView) -> String {
    let mut html = format!(
        r#"<b><span class="food-icon">🍎</span> Món ăn:</b> <span style="color:#388E3C;">{}</span> <span style="font-size:0.95em;">(Xác suất: {}%)</span><br>"#,
        escape_html(&view.food_name),
        percent_2dp(view.probability)
    );

    match &view.nutrition {
        Some(pairs) => {
            html.push_str("<b>🥗 Thông tin dinh dưỡng:</b><ul>");
            for (key, value) in pairs {
                html.push_str(&format!(
                    "<li><b>{}:</b> {}</li>",
                    escape_html(key),
                    escape_html(value)
                ));
            }
            html.push_str("</ul>");
        }
        None => html.push_str(&format!(
            r#"<span style="color:#888;">{}</span>"#,
            NUTRITION_NOT_FOUND
        )),
    }

    if let Some(answer) = &view.ai_answer {
        html.push_str(&format!(
            r#"<div class="ai-answer-card"><div class="ai-answer-title">🤖 Phân tích &amp; gợi ý từ AI</div><div class="ai-answer-content">{}</div></div>"#,
            escape_multiline(answer)
        ));
    }

    html
}
