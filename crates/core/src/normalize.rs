use crate::error::PipelineError;
use crate::quality::is_meaningful_char;
use regex::Regex;

/// Inputs shorter than this after trimming carry nothing worth keeping.
const MIN_INPUT_CHARS: usize = 50;

/// Minimum sentence length retained by aggressive cleaning.
const AGGRESSIVE_MIN_SENTENCE_CHARS: usize = 30;

const SYMBOL_RUN_PATTERNS: [&str; 5] = [r"-{3,}", r"={3,}", r"_{3,}", r"\*{3,}", r"\.{3,}"];

const BOILERPLATE_PATTERNS: [&str; 8] = [
    r"(?i)copyright\s+©.*?\d{4}",
    r"(?i)all rights reserved",
    r"(?i)privacy policy",
    r"(?i)terms of service",
    r"(?i)cookie policy",
    r"(?i)subscribe to.*?newsletter",
    r"(?i)follow us on",
    r"(?i)share this.*?:",
];

/// Strips noise characters and boilerplate from raw extracted text before
/// scoring and chunking.
pub struct TextNormalizer {
    symbol_runs: Vec<Regex>,
    entity_named: Regex,
    entity_numeric: Regex,
    zero_width: Regex,
    newline_runs: Regex,
    horizontal_whitespace: Regex,
    boilerplate: Vec<Regex>,
}

impl TextNormalizer {
    pub fn new() -> Result<Self, PipelineError> {
        let symbol_runs = SYMBOL_RUN_PATTERNS
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;
        let boilerplate = BOILERPLATE_PATTERNS
            .iter()
            .map(|pattern| Regex::new(pattern))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            symbol_runs,
            entity_named: Regex::new(r"&[a-zA-Z]+;")?,
            entity_numeric: Regex::new(r"&#\d+;")?,
            zero_width: Regex::new(r"[\x{200B}-\x{200F}\x{202A}-\x{202E}\x{FEFF}]")?,
            newline_runs: Regex::new(r"(?:\r?\n[ \t]*){3,}")?,
            horizontal_whitespace: Regex::new(r"[ \t]+")?,
            boilerplate,
        })
    }

    /// Full cleaning flow. Returns an empty string when the trimmed input is
    /// under 50 characters (nothing worth keeping, not an error).
    pub fn normalize(&self, raw_text: &str, aggressive: bool) -> String {
        if raw_text.trim().chars().count() < MIN_INPUT_CHARS {
            return String::new();
        }

        let cleaned = self.remove_noise(raw_text);
        let cleaned = self.remove_boilerplate(&cleaned);
        let cleaned = deduplicate_lines(&cleaned);

        let cleaned = if aggressive {
            keep_meaningful_sentences(&cleaned, AGGRESSIVE_MIN_SENTENCE_CHARS)
        } else {
            cleaned
        };

        cleaned.trim().to_string()
    }

    /// Removes repeated symbol runs, markup entity residue, zero-width
    /// characters, and normalizes whitespace. Runs of two or more blank lines
    /// collapse to exactly one blank line so paragraph boundaries survive.
    fn remove_noise(&self, text: &str) -> String {
        let mut cleaned = text.to_string();
        for pattern in &self.symbol_runs {
            cleaned = pattern.replace_all(&cleaned, " ").into_owned();
        }

        cleaned = self.entity_named.replace_all(&cleaned, " ").into_owned();
        cleaned = self.entity_numeric.replace_all(&cleaned, " ").into_owned();
        cleaned = self.zero_width.replace_all(&cleaned, "").into_owned();
        cleaned = self.newline_runs.replace_all(&cleaned, "\n\n").into_owned();
        cleaned = self
            .horizontal_whitespace
            .replace_all(&cleaned, " ")
            .into_owned();

        let mut lines = Vec::new();
        let mut previous_blank = true;
        for line in cleaned.lines() {
            let line = line.trim();
            if line.is_empty() {
                if !previous_blank {
                    lines.push("");
                }
                previous_blank = true;
            } else {
                lines.push(line);
                previous_blank = false;
            }
        }

        lines.join("\n").trim().to_string()
    }

    /// Strips navigation/footer phrases via case-insensitive pattern match.
    fn remove_boilerplate(&self, text: &str) -> String {
        let mut cleaned = text.to_string();
        for pattern in &self.boilerplate {
            cleaned = pattern.replace_all(&cleaned, "").into_owned();
        }
        cleaned
    }
}

/// Removes exact-duplicate lines (repeated navigation items and the like),
/// keeping the first occurrence and the original order. Blank lines are
/// paragraph separators and are never treated as duplicates.
fn deduplicate_lines(text: &str) -> String {
    let mut seen = std::collections::HashSet::new();
    let mut unique = Vec::new();
    let mut previous_blank = true;

    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            if !previous_blank {
                unique.push("");
            }
            previous_blank = true;
            continue;
        }
        if seen.insert(line) {
            unique.push(line);
            previous_blank = false;
        }
    }

    while unique.last().is_some_and(|line| line.is_empty()) {
        unique.pop();
    }

    unique.join("\n")
}

/// Drops sentences that are too short or mostly non-alphabetic/non-CJK, then
/// rejoins the keepers. Falls back to the input when nothing survives.
fn keep_meaningful_sentences(text: &str, min_chars: usize) -> String {
    let mut kept = Vec::new();

    for sentence in text.split(['。', '！', '？', '\n', '.', '!', '?']) {
        let sentence = sentence.trim();
        let total = sentence.chars().count();
        if total < min_chars {
            continue;
        }

        let meaningful = sentence.chars().filter(|c| is_meaningful_char(*c)).count();
        if meaningful * 2 < total {
            continue;
        }

        kept.push(sentence);
    }

    if kept.is_empty() {
        text.to_string()
    } else {
        kept.join(". ")
    }
}
