/// Collapse every whitespace run to a single space and trim the ends.
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// [`clean_text`] followed by lower-casing, the form keyword matchers work on.
pub fn normalize_text(text: &str) -> String {
    clean_text(text).to_lowercase()
}
