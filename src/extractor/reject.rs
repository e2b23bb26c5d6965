use std::fmt;

pub const MIN_CONTENT_LENGTH: usize = 250;
pub const MIN_WORD_COUNT: usize = 50;
const MAX_BOILERPLATE_RATIO: f64 = 0.3;

/// Phrases typical of consent walls, login gates and error pages.
const BOILERPLATE_PHRASES: &[&str] = &[
    "cookie",
    "consent",
    "gdpr",
    "privacy policy",
    "terms of service",
    "accept all",
    "manage preferences",
    "subscribe",
    "newsletter",
    "sign in",
    "sign up",
    "log in",
    "forgot password",
    "access denied",
    "not found",
    "please wait",
    "enable javascript",
    "click here",
];

#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    TooShort { chars: usize },
    TooFewWords { words: usize },
    Boilerplate { ratio: f64 },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooShort { chars } => {
                write!(f, "only {chars} characters of text (minimum {MIN_CONTENT_LENGTH})")
            }
            Self::TooFewWords { words } => {
                write!(f, "only {words} words of text (minimum {MIN_WORD_COUNT})")
            }
            Self::Boilerplate { ratio } => {
                write!(f, "text is mostly boilerplate ({:.0}% of words)", ratio * 100.0)
            }
        }
    }
}

/// Decides whether extracted text is prose worth analysing.
pub fn check(text: &str) -> Result<(), RejectReason> {
    let chars = text.chars().count();
    if chars < MIN_CONTENT_LENGTH {
        return Err(RejectReason::TooShort { chars });
    }

    let words = text.split_whitespace().count();
    if words < MIN_WORD_COUNT {
        return Err(RejectReason::TooFewWords { words });
    }

    let ratio = boilerplate_ratio(text, words);
    if ratio > MAX_BOILERPLATE_RATIO {
        return Err(RejectReason::Boilerplate { ratio });
    }

    Ok(())
}

fn boilerplate_ratio(text: &str, total_words: usize) -> f64 {
    let lower = text.to_lowercase();
    let hits: usize = BOILERPLATE_PHRASES
        .iter()
        .map(|phrase| lower.matches(phrase).count() * phrase.split_whitespace().count())
        .sum();
    hits as f64 / total_words as f64
}
