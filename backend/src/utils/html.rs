// src/utils/html.rs

/// Sanitizes author-supplied text (quiz titles, descriptions, question content)
/// with ammonia's whitelist: safe inline tags survive, scripts and event
/// handler attributes are stripped.
///
/// Not applied to answer labels: free-text answers are compared verbatim after
/// normalization, and escaping `<` or `&` would change the canonical answer.
pub fn clean_html(input: &str) -> String {
    ammonia::clean(input)
}
