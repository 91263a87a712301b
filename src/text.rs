//! Text normalization shared by training and serving.
//!
//! Every document, whether it comes from the training corpus or from an HTTP request, goes
//! through [`normalize`] before vectorization. The routine must stay byte-for-byte identical
//! between the two pipelines; the vectorizer vocabulary is built from its output.
//!
//! Steps:
//!
//! 1. Replace every character outside `[a-zA-Z]` with a space.
//! 2. Lowercase.
//! 3. Split on whitespace.
//! 4. Drop English stopwords ([`stopwords::ENGLISH_STOPWORDS`]).
//! 5. Porter-stem the survivors ([`porter::stem`]).
//! 6. Join with single spaces.

pub mod porter;
pub mod stopwords;

use regex::Regex;
use std::sync::OnceLock;

fn non_alphabetic() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new("[^a-zA-Z]").expect("static pattern is valid"))
}

/// Normalize raw article text into a space-separated sequence of stems.
///
/// Returns an empty string for input without alphabetic content.
pub fn normalize(raw_text: &str) -> String {
    let letters_only = non_alphabetic().replace_all(raw_text, " ");
    let lowered = letters_only.to_lowercase();
    let stopwords = stopwords::english();

    lowered
        .split_whitespace()
        .filter(|token| !stopwords.contains(token))
        .map(porter::stem)
        .collect::<Vec<_>>()
        .join(" ")
}
