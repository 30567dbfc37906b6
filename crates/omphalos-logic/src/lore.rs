//! Cipher-style analysis of a single lore text.
//!
//! Looks for hidden messages the way hunters do by hand: acrostics, sentence
//! initials, embedded numbers and repeated words. Pure text processing; the
//! caller supplies the body.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// Words shorter than this are left out of the frequency table.
pub const DEFAULT_MIN_WORD_LENGTH: usize = 4;

/// Entries kept in [`LoreReport::top_words`].
pub const TOP_WORDS: usize = 10;

static SENTENCE_END_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[.!?]+").unwrap());

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d+").unwrap());

static WORD_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[a-zA-Z']+").unwrap());

/// Words as counted by [`nth_words`]: letters, digits and apostrophes.
static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[A-Za-z0-9']+").unwrap());

/// A lore text and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoreText {
    pub identifier: String,
    pub title: String,
    /// e.g. "Codex", "Tourist Beacon"
    pub source: String,
    pub body: String,
}

impl LoreText {
    pub fn new(
        identifier: impl Into<String>,
        title: impl Into<String>,
        source: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            title: title.into(),
            source: source.into(),
            body: body.into(),
        }
    }
}

/// Unix line endings, trailing whitespace stripped from every line.
pub fn normalize_text(text: &str) -> String {
    text.replace("\r\n", "\n")
        .split('\n')
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

/// First non-blank character of each non-blank line.
pub fn first_letters_by_line(body: &str) -> String {
    normalize_text(body)
        .lines()
        .filter_map(|line| line.trim_start().chars().next())
        .collect()
}

/// Last non-blank character of each non-blank line.
pub fn last_letters_by_line(body: &str) -> String {
    normalize_text(body)
        .lines()
        .filter_map(|line| line.trim_end().chars().last())
        .collect()
}

/// First alphabetic character of each sentence (split on `.`, `!`, `?`).
pub fn sentence_initials(body: &str) -> String {
    SENTENCE_END_RE
        .split(&normalize_text(body))
        .filter_map(|sentence| sentence.trim().chars().find(|c| c.is_alphabetic()))
        .collect()
}

/// Runs of digits, in order of appearance.
pub fn numeric_tokens(body: &str) -> Vec<String> {
    NUMBER_RE
        .find_iter(body)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Lower-cased word counts, most frequent first.
///
/// Words shorter than `min_length` characters are skipped. Equal counts keep
/// the order in which the words first appear.
pub fn word_frequency(body: &str, min_length: usize) -> Vec<(String, usize)> {
    let lower = body.to_lowercase();
    let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
    for (pos, m) in WORD_RE.find_iter(&lower).enumerate() {
        let word = m.as_str();
        if word.chars().count() < min_length {
            continue;
        }
        counts.entry(word).or_insert((0, pos)).0 += 1;
    }

    let mut freq: Vec<(&str, usize, usize)> = counts
        .into_iter()
        .map(|(word, (count, first))| (word, count, first))
        .collect();
    freq.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.2.cmp(&b.2)));
    freq.into_iter()
        .map(|(word, count, _)| (word.to_string(), count))
        .collect()
}

/// Pick words by 1-based position and join them with spaces.
/// Out-of-range positions are skipped.
pub fn nth_words(body: &str, positions: &[usize]) -> String {
    let words: Vec<&str> = TOKEN_RE.find_iter(body).map(|m| m.as_str()).collect();
    positions
        .iter()
        .filter(|&&p| p >= 1 && p <= words.len())
        .map(|&p| words[p - 1])
        .collect::<Vec<_>>()
        .join(" ")
}

/// Everything the `lore` command prints for one text.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoreReport {
    pub identifier: String,
    pub title: String,
    pub source: String,
    pub first_letters_by_line: String,
    pub last_letters_by_line: String,
    pub sentence_initials: String,
    pub numeric_tokens: Vec<String>,
    pub top_words: Vec<(String, usize)>,
    /// Present only when positions were requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_words: Option<String>,
}

pub fn analyze_lore(lore: &LoreText, nth: &[usize]) -> LoreReport {
    let mut top_words = word_frequency(&lore.body, DEFAULT_MIN_WORD_LENGTH);
    top_words.truncate(TOP_WORDS);

    LoreReport {
        identifier: lore.identifier.clone(),
        title: lore.title.clone(),
        source: lore.source.clone(),
        first_letters_by_line: first_letters_by_line(&lore.body),
        last_letters_by_line: last_letters_by_line(&lore.body),
        sentence_initials: sentence_initials(&lore.body),
        numeric_tokens: numeric_tokens(&lore.body),
        top_words,
        selected_words: (!nth.is_empty()).then(|| nth_words(&lore.body, nth)),
    }
}
