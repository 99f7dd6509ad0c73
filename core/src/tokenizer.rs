use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Runs of ASCII letters and digits; any other byte, including every byte
    // of a multi-byte character, separates tokens.
    static ref RE: Regex = Regex::new(r"[A-Za-z0-9]+").expect("valid regex");
}

/// Tokens shorter than this many bytes are dropped.
pub const MIN_TOKEN_LEN: usize = 3;

/// Tokenize text into lowercase ASCII alphanumeric tokens of at least three
/// bytes, in input order, duplicates kept.
pub fn tokenize(text: &str) -> Vec<String> {
    RE.find_iter(text)
        .map(|m| m.as_str().to_ascii_lowercase())
        .filter(|t| t.len() >= MIN_TOKEN_LEN)
        .collect()
}
