// src/utils/html.rs

/// Escape user-supplied comment text for insertion into HTML.
///
/// Bodies are stored as typed, so markup in them is shown literally rather
/// than interpreted: every HTML-significant character becomes an entity.
pub fn escape_html(input: &str) -> String {
    ammonia::clean_text(input)
}
