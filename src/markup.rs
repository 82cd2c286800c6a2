//! Helpers for turning untrusted text into markup-safe fragments.

/// Escapes the five HTML-significant characters.
///
/// Every piece of server or user text that ends up inside rendered markup must
/// go through this function first.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escapes `input` and converts newlines into `<br>` line breaks.
pub fn escape_multiline(input: &str) -> String {
    escape_html(input).replace('\n', "<br>")
}

/// Formats a probability in `[0, 1]` as a two-decimal percentage (`0.92` -> `92.00`).
pub fn percent_2dp(probability: f64) -> String {
    format!("{:.2}", probability * 100.0)
}

/// Formats a probability in `[0, 1]` as a whole percentage (`0.25` -> `25`).
pub fn percent_whole(probability: f64) -> String {
    format!("{}", (probability * 100.0).round() as i64)
}
