//! Prompt templates, one per dimension.
//!
//! Every template ends with the same response contract (a `Score: N/10`
//! line, an `## Assessment` section, the dimension's own detail sections and
//! a numbered suggestions section) so a single parser handles all four
//! answers.

use std::fmt::Write as _;

use super::Dimension;
use crate::scoring::ReadabilityMetrics;

/// Characters of the document embedded in each prompt.
pub const DOCUMENT_EXCERPT_CHARS: usize = 2000;

fn response_contract(dimension: Dimension) -> String {
    let mut contract = String::from(
        "Format your response exactly like this:\n\
         Score: <0-10, or N/A if you cannot judge>\n\n\
         ## Assessment\n\
         <two to four sentences>\n",
    );
    for heading in dimension.detail_sections() {
        let _ = write!(contract, "\n## {heading}\n<{}>\n", section_hint(heading));
    }
    contract.push_str(
        "\n## Improvement Suggestions\n\
         1. <specific, actionable suggestion>\n\
         2. <specific, actionable suggestion>\n\
         3. <specific, actionable suggestion>",
    );
    contract
}

fn section_hint(heading: &str) -> &'static str {
    match heading {
        "Problem Areas" => "the specific sentences or paragraphs that hurt readability",
        "Structural Elements" => "how headings, lists and paragraphs are used",
        "Flow Issues" => "where the order of information breaks down",
        "Information Gaps" => "what a reader still needs to know",
        "Example Quality" => "how useful the examples are, and which are missing",
        "Voice and Tone" => "whether the voice is customer-focused, clear and concise",
        "Language Issues" => "complex sentences, jargon or passive phrasing to fix",
        _ => "details",
    }
}

pub fn build_prompt(dimension: Dimension, text: &str, metrics: &ReadabilityMetrics) -> String {
    let instructions = match dimension {
        Dimension::Readability => format!(
            "Analyze the readability of this documentation article for a non-technical marketer.\n\
             1. The Flesch reading ease score is {ease:.1} ({level}); the Flesch-Kincaid grade is {grade:.1}.\n\
             2. Explain what this score means for marketing documentation.\n\
             3. Point out the sentences or paragraphs that hurt readability most.\n\
             4. Suggest concrete rewrites a marketer could apply.",
            ease = metrics.flesch_reading_ease,
            level = metrics.level.describe(),
            grade = metrics.flesch_kincaid_grade,
        ),
        Dimension::Structure => "Analyze the structure and flow of this documentation article.\n\
             1. Evaluate headings, subheadings, paragraph length and lists.\n\
             2. Assess whether information flows logically and is easy to navigate.\n\
             3. Identify the structural issues that most need fixing."
            .to_string(),
        Dimension::Completeness => {
            "Analyze the completeness of information and examples in this documentation article.\n\
             1. Assess whether there is enough detail to understand and use the feature.\n\
             2. Evaluate the quality and quantity of the examples.\n\
             3. Identify where more information or examples are needed."
                .to_string()
        }
        Dimension::Style => "Analyze this article against the Microsoft Writing Style Guide.\n\
             1. Voice and tone: is it customer-focused, clear and concise?\n\
             2. Clarity: are there complex sentences or jargon that could be simplified?\n\
             3. Is the language action-oriented enough to guide the reader?"
            .to_string(),
    };

    format!(
        "{instructions}\n\n{}\n\nArticle:\n{}",
        response_contract(dimension),
        excerpt(text, DOCUMENT_EXCERPT_CHARS)
    )
}

/// First `max_chars` characters of `text`, cut on a char boundary.
pub fn excerpt(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
