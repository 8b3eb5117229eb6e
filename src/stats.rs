//! Descriptive statistics and a keyword-based language guess.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;

const WORDS_PER_MINUTE: usize = 200;
const LANGUAGE_SAMPLE_CHARS: usize = 1000;

static SENTENCE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").expect("sentence regex is valid"));
static PARAGRAPH_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").expect("paragraph regex is valid"));

static LANGUAGES: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    [
        ("english", r"(?i)\b(the|and|is|of|to)\b"),
        ("spanish", r"(?i)\b(el|la|de|y|que)\b"),
        ("french", r"(?i)\b(le|la|de|et|est)\b"),
        ("german", r"(?i)\b(der|die|und|ist|ein)\b"),
    ]
    .into_iter()
    .map(|(lang, pattern)| (lang, Regex::new(pattern).expect("language regex is valid")))
    .collect()
});

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentStats {
    pub word_count: usize,
    pub sentence_count: usize,
    pub paragraph_count: usize,
    pub avg_words_per_sentence: usize,
    pub reading_time_minutes: usize,
    pub unique_words: usize,
}

pub fn summarize(text: &str) -> DocumentStats {
    let words: Vec<&str> = text.split_whitespace().collect();
    let word_count = words.len();

    let sentence_count = SENTENCE_BREAK
        .split(text)
        .filter(|s| !s.trim().is_empty())
        .count();
    let paragraph_count = PARAGRAPH_BREAK
        .split(text)
        .filter(|p| !p.trim().is_empty())
        .count();

    let avg_words_per_sentence = if sentence_count == 0 {
        0
    } else {
        (word_count as f64 / sentence_count as f64).round() as usize
    };

    // A word made only of non-letters folds to "", which is counted too.
    let unique_words = words
        .iter()
        .map(|w| {
            w.to_lowercase()
                .chars()
                .filter(|c| c.is_ascii_lowercase())
                .collect::<String>()
        })
        .collect::<HashSet<_>>()
        .len();

    DocumentStats {
        word_count,
        sentence_count,
        paragraph_count,
        avg_words_per_sentence,
        reading_time_minutes: word_count.div_ceil(WORDS_PER_MINUTE),
        unique_words,
    }
}

/// Guess the language from common function words in the opening text.
/// Ties and texts with no hits report `english`.
pub fn detect_language(text: &str) -> &'static str {
    let sample: String = text.chars().take(LANGUAGE_SAMPLE_CHARS).collect();

    let scores: Vec<(&'static str, usize)> = LANGUAGES
        .iter()
        .map(|(lang, re)| (*lang, re.find_iter(&sample).count()))
        .collect();

    let best = scores.iter().map(|(_, n)| *n).max().unwrap_or(0);
    let leaders: Vec<&'static str> = scores
        .iter()
        .filter(|(_, n)| *n == best)
        .map(|(lang, _)| *lang)
        .collect();

    match leaders.as_slice() {
        [only] if best > 0 => *only,
        _ => "english",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_short_text() {
        let stats = summarize("The cat sat. The dog ran.");
        assert_eq!(stats.word_count, 6);
        assert_eq!(stats.sentence_count, 2);
        assert_eq!(stats.avg_words_per_sentence, 3);
        assert_eq!(stats.paragraph_count, 1);
        assert_eq!(stats.reading_time_minutes, 1);
        // the, cat, sat, dog, ran
        assert_eq!(stats.unique_words, 5);
    }

    #[test]
    fn test_summarize_empty() {
        let stats = summarize("");
        assert_eq!(stats.word_count, 0);
        assert_eq!(stats.sentence_count, 0);
        assert_eq!(stats.avg_words_per_sentence, 0);
        assert_eq!(stats.reading_time_minutes, 0);
        assert_eq!(stats.unique_words, 0);
    }

    #[test]
    fn test_paragraphs_and_reading_time() {
        let text = format!("{}\n\n  \n{}", "word ".repeat(150), "word ".repeat(100));
        let stats = summarize(&text);
        assert_eq!(stats.paragraph_count, 2);
        assert_eq!(stats.word_count, 250);
        assert_eq!(stats.reading_time_minutes, 2);
    }

    #[test]
    fn test_unique_words_counts_empty_fold() {
        let stats = summarize("Total: 42 42 total");
        // "total" and "" (from the numbers)
        assert_eq!(stats.unique_words, 2);
    }

    #[test]
    fn test_detect_language() {
        assert_eq!(detect_language("The report is one of the best to read and share"), "english");
        assert_eq!(detect_language("Der Hund und die Katze ist ein Freund"), "german");
        assert_eq!(detect_language("El perro que come y el gato"), "spanish");
        assert_eq!(detect_language("Le chat et le chien est"), "french");
        assert_eq!(detect_language("12345 67890"), "english");
    }

    #[test]
    fn test_detect_language_tie_is_english() {
        // "la" and "de" score for both Spanish and French.
        assert_eq!(detect_language("la casa de papel"), "english");
    }
}
