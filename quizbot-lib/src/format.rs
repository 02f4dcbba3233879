//! Text helpers shared by the handlers.
//!
//! Outgoing messages use HTML parse mode, so anything a user typed (team
//! names, mostly) goes through [`escape_html`] first.

use crate::store::GameStatus;

/// Placeholder for an empty slot.
pub const DASH: &str = "—";

/// Splits a queue into the team that answers now and the rest.
///
/// ```
/// use quizbot_lib::format::head_and_tail;
///
/// assert_eq!(head_and_tail::<&str>(&[]), ("—".to_string(), "—".to_string()));
/// assert_eq!(
///     head_and_tail(&["Alpha", "Beta", "Gamma"]),
///     ("Alpha".to_string(), "Beta, Gamma".to_string())
/// );
/// ```
pub fn head_and_tail<S: AsRef<str>>(names: &[S]) -> (String, String) {
    match names.split_first() {
        None => (DASH.to_string(), DASH.to_string()),
        Some((head, [])) => (head.as_ref().to_string(), DASH.to_string()),
        Some((head, tail)) => (
            head.as_ref().to_string(),
            tail.iter().map(AsRef::as_ref).collect::<Vec<_>>().join(", "),
        ),
    }
}

/// Renders `1. Name — 3` lines, or `empty_text` when there are no rows.
///
/// Team names are escaped.
pub fn score_table(scores: &[(String, i64)], empty_text: &str) -> String {
    if scores.is_empty() {
        return empty_text.to_string();
    }
    scores
        .iter()
        .enumerate()
        .map(|(idx, (team, score))| format!("{}. {} {} {}", idx + 1, escape_html(team), DASH, score))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Human-readable game status.
pub fn status_label(status: Option<GameStatus>) -> &'static str {
    match status {
        Some(GameStatus::Idle) => "подготовка",
        Some(GameStatus::Running) => "идёт игра",
        Some(GameStatus::Question) => "идёт вопрос",
        Some(GameStatus::Finished) => "игра завершена",
        None => "нет активной игры",
    }
}

/// Escapes `<`, `>`, `&` and `"` for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '&' => out.push_str("&amp;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

/// Joins first and last name, skipping empty parts.
pub fn full_name(first: &str, last: Option<&str>) -> String {
    [Some(first), last]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
