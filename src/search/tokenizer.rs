use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

/// Hashtags (`#word`) or plain ASCII word runs. Matching is ASCII-only so the
/// output never depends on locale or Unicode tables.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(#[A-Za-z0-9_]+)|([A-Za-z0-9_]+)").expect("token pattern is valid")
});

const STOP_WORDS: &[&str] = &["the", "and", "of", "in", "to", "for", "on", "with", "a", "an"];

pub const HASHTAG_PREFIX: char = '#';

/// Splits `text` into lower-cased, stop-word-free tokens, each kept once in
/// order of first occurrence. Hashtags keep their `#` and are never treated as
/// stop words.
pub fn tokenize(text: &str) -> Vec<String> {
    if text.trim().is_empty() {
        return Vec::new();
    }

    let mut seen = HashSet::new();
    TOKEN_RE
        .find_iter(text)
        .map(|m| m.as_str().to_ascii_lowercase())
        .filter(|token| !STOP_WORDS.contains(&token.as_str()))
        .filter(|token| seen.insert(token.clone()))
        .collect()
}

pub fn extract_hashtags(text: &str) -> Vec<String> {
    tokenize(text).into_iter().filter(|t| is_hashtag(t)).collect()
}

pub fn is_hashtag(token: &str) -> bool {
    token.starts_with(HASHTAG_PREFIX)
}
