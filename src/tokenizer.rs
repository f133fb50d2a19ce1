//! Normalizing tokenizer used before similarity scoring.

use once_cell::sync::Lazy;
use regex::Regex;

/// Token that stands in for any URL.
pub const URL_TOKEN: &str = "url";

const MIN_TOKEN_LEN: usize = 2;
const MAX_TOKEN_LEN: usize = 15;

static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").expect("valid tag pattern"));
static URL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(?:https?://|www\.)\S+").expect("valid url pattern")
});
static WORD_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\p{Alphabetic}+").expect("valid word pattern"));

/// Splits `text` into lower-cased alphabetic tokens.
///
/// Tags are dropped, URLs become [`URL_TOKEN`], and digits, punctuation and tokens outside
/// 2..=15 characters are discarded.
pub fn tokenize(text: &str) -> Vec<String> {
    let without_tags = TAG_RE.replace_all(text, " ");
    let with_placeholders = URL_RE.replace_all(&without_tags, format!(" {} ", URL_TOKEN).as_str());

    WORD_RE
        .find_iter(&with_placeholders)
        .map(|word| word.as_str().to_lowercase())
        .filter(|word| {
            let len = word.chars().count();
            len >= MIN_TOKEN_LEN && len <= MAX_TOKEN_LEN
        })
        .collect()
}

/// Tokenizes node content, treating keyword separators as spaces.
pub fn tokenize_keywords(content: &str) -> Vec<String> {
    tokenize(&content.replace(';', " "))
}
