//! Word-level subtitle cues derived from a narration transcript.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;

/// One timed word from the transcriber, seconds from narration start.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct WordTiming {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

/// A word shown on screen between `start` and `end` (narration-relative).
#[derive(Debug, Clone, PartialEq)]
pub struct SubtitleCue {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

static WHITESPACE_RE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\s+").ok());

fn normalize_word(raw: &str) -> String {
    match WHITESPACE_RE.as_ref() {
        Some(re) => re.replace_all(raw.trim(), " ").into_owned(),
        None => raw.trim().to_string(),
    }
}

/// Builds cues in transcript order. Blank words and timings that are not
/// finite are skipped; an end before its start is clamped to the start.
pub fn cues_from_words(words: &[WordTiming]) -> Vec<SubtitleCue> {
    words
        .iter()
        .filter_map(|w| {
            let word = normalize_word(&w.word);
            if word.is_empty() || !w.start.is_finite() || !w.end.is_finite() {
                return None;
            }
            let start = w.start.max(0.0);
            Some(SubtitleCue {
                word,
                start,
                end: w.end.max(start),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing(word: &str, start: f64, end: f64) -> WordTiming {
        WordTiming {
            word: word.to_string(),
            start,
            end,
        }
    }

    #[test]
    fn test_cues_keep_transcript_order() {
        let words = [
            timing("Dream", 0.0, 0.4),
            timing(" big,", 0.4, 0.9),
            timing("work", 1.2, 1.5),
        ];
        let cues = cues_from_words(&words);

        let text: Vec<&str> = cues.iter().map(|c| c.word.as_str()).collect();
        assert_eq!(text, vec!["Dream", "big,", "work"]);
        assert_eq!(cues[2].start, 1.2);
        assert_eq!(cues[2].end, 1.5);
    }

    #[test]
    fn test_blank_and_broken_words_are_dropped() {
        let words = [
            timing("  ", 0.0, 0.2),
            timing("now", f64::NAN, 1.0),
            timing("go", 2.0, 1.5),
        ];
        let cues = cues_from_words(&words);

        assert_eq!(cues.len(), 1);
        assert_eq!(cues[0].word, "go");
        assert_eq!(cues[0].end, 2.0);
    }

    #[test]
    fn test_empty_transcript_gives_no_cues() {
        assert!(cues_from_words(&[]).is_empty());
    }
}
