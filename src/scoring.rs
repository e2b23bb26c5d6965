//! Readability metrics for extracted text.
//!
//! Pure functions only: the same text always yields the same numbers. The
//! headline figure is the Flesch reading ease, clamped to its conventional
//! 0-100 range; the Flesch-Kincaid grade and the raw counts behind both
//! formulas are reported alongside it.

use linkify::LinkFinder;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;
use thiserror::Error;
use utoipa::ToSchema;

/// Fewer words than this cannot produce a meaningful score.
pub const MIN_WORDS: usize = 10;

static SENTENCE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?;:]+(?:\s|$)|\n\s*\n").unwrap());
static VOWEL_GROUP: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[aeiouy]+").unwrap());

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ScoringError {
    #[error("insufficient text: {words} words, at least {required} required")]
    InsufficientText { words: usize, required: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReadingLevel {
    VeryEasy,
    Easy,
    FairlyEasy,
    Standard,
    FairlyDifficult,
    Difficult,
    VeryConfusing,
}

impl ReadingLevel {
    pub fn from_ease(ease: f64) -> Self {
        match ease {
            e if e >= 90.0 => Self::VeryEasy,
            e if e >= 80.0 => Self::Easy,
            e if e >= 70.0 => Self::FairlyEasy,
            e if e >= 60.0 => Self::Standard,
            e if e >= 50.0 => Self::FairlyDifficult,
            e if e >= 30.0 => Self::Difficult,
            _ => Self::VeryConfusing,
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            Self::VeryEasy => "very easy to read",
            Self::Easy => "easy to read",
            Self::FairlyEasy => "fairly easy to read",
            Self::Standard => "plain English",
            Self::FairlyDifficult => "fairly difficult to read",
            Self::Difficult => "difficult to read",
            Self::VeryConfusing => "very confusing to read",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReadabilityMetrics {
    /// Flesch reading ease, 0 (hardest) to 100 (easiest).
    pub flesch_reading_ease: f64,
    /// Flesch-Kincaid US grade level, never negative.
    pub flesch_kincaid_grade: f64,
    pub word_count: usize,
    pub sentence_count: usize,
    pub syllable_count: usize,
    pub avg_sentence_length: f64,
    pub avg_syllables_per_word: f64,
    pub level: ReadingLevel,
}

pub fn score(text: &str) -> Result<ReadabilityMetrics, ScoringError> {
    let prose = strip_links(text);

    let mut word_count = 0usize;
    let mut syllable_count = 0usize;
    let mut sentence_count = 0usize;

    for sentence in SENTENCE_BREAK.split(&prose) {
        let words: Vec<String> = sentence.split_whitespace().filter_map(clean_word).collect();
        if words.is_empty() {
            continue;
        }
        sentence_count += 1;
        word_count += words.len();
        syllable_count += words.iter().map(|w| count_syllables(w)).sum::<usize>();
    }

    if word_count < MIN_WORDS {
        return Err(ScoringError::InsufficientText {
            words: word_count,
            required: MIN_WORDS,
        });
    }

    let words_per_sentence = word_count as f64 / sentence_count as f64;
    let syllables_per_word = syllable_count as f64 / word_count as f64;

    let ease = 206.835 - 1.015 * words_per_sentence - 84.6 * syllables_per_word;
    let grade = 0.39 * words_per_sentence + 11.8 * syllables_per_word - 15.59;
    let flesch_reading_ease = round2(ease.clamp(0.0, 100.0));

    Ok(ReadabilityMetrics {
        flesch_reading_ease,
        flesch_kincaid_grade: round2(grade.max(0.0)),
        word_count,
        sentence_count,
        syllable_count,
        avg_sentence_length: round2(words_per_sentence),
        avg_syllables_per_word: round2(syllables_per_word),
        level: ReadingLevel::from_ease(flesch_reading_ease),
    })
}

/// Drops bare URLs and email addresses, which would otherwise count as
/// single very long words.
fn strip_links(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for link in LinkFinder::new().links(text) {
        out.push_str(&text[last..link.start()]);
        out.push(' ');
        last = link.end();
    }
    out.push_str(&text[last..]);
    out
}

/// Keeps the alphabetic core of a token; tokens without letters are not words.
fn clean_word(token: &str) -> Option<String> {
    let word: String = token
        .chars()
        .filter(|c| c.is_alphabetic() || *c == '\'')
        .collect::<String>()
        .trim_matches('\'')
        .to_lowercase();
    (!word.is_empty()).then_some(word)
}

/// Vowel-group heuristic with the usual silent-e correction.
pub fn count_syllables(word: &str) -> usize {
    let ascii: String = word
        .chars()
        .filter(|c| c.is_ascii_alphabetic())
        .map(|c| c.to_ascii_lowercase())
        .collect();
    if ascii.is_empty() {
        // Non-Latin scripts: one syllable per word keeps the ratios finite
        return 1;
    }

    let mut count = VOWEL_GROUP.find_iter(&ascii).count();
    if count > 1 && ascii.ends_with('e') && !ascii.ends_with("le") && !ascii.ends_with("ee") {
        count -= 1;
    }
    count.max(1)
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
