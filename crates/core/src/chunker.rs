use crate::error::PipelineError;
use crate::models::PipelineOptions;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;

const SENTENCE_ENDS: [char; 6] = ['。', '！', '？', '.', '!', '?'];

#[derive(Debug, Clone, Copy)]
pub struct ChunkerConfig {
    pub chunk_size_chars: usize,
    pub chunk_overlap_chars: usize,
    pub min_chunk_size: usize,
    pub deduplicate: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            chunk_size_chars: 1_500,
            chunk_overlap_chars: 150,
            min_chunk_size: 100,
            deduplicate: true,
        }
    }
}

impl From<&PipelineOptions> for ChunkerConfig {
    fn from(value: &PipelineOptions) -> Self {
        Self {
            chunk_size_chars: value.chunk_size_chars,
            chunk_overlap_chars: value.chunk_overlap_chars,
            min_chunk_size: value.min_chunk_size,
            deduplicate: value.deduplicate,
        }
    }
}

/// Splits normalized text into overlapping, deduplicated chunks along
/// semantic boundaries: paragraphs first, sentences as the fallback for
/// abnormally long paragraphs. All sizes are measured in characters.
pub struct SemanticChunker {
    config: ChunkerConfig,
    paragraph_split: Regex,
}

impl SemanticChunker {
    pub fn new(config: ChunkerConfig) -> Result<Self, PipelineError> {
        if config.chunk_size_chars == 0 {
            return Err(PipelineError::InvalidChunkConfig(
                "chunk_size_chars must be positive".to_string(),
            ));
        }
        if config.min_chunk_size > config.chunk_size_chars {
            return Err(PipelineError::InvalidChunkConfig(format!(
                "min_chunk_size {} exceeds chunk_size_chars {}",
                config.min_chunk_size, config.chunk_size_chars
            )));
        }
        if config.chunk_overlap_chars >= config.chunk_size_chars {
            return Err(PipelineError::InvalidChunkConfig(format!(
                "chunk_overlap_chars {} must be below chunk_size_chars {}",
                config.chunk_overlap_chars, config.chunk_size_chars
            )));
        }

        Ok(Self {
            config,
            paragraph_split: Regex::new(r"\n\s*\n")?,
        })
    }

    /// Full chunking flow: semantic split, overlap injection, optional
    /// content-hash dedup, minimum-size filter. Input below the minimum chunk
    /// size yields an empty list.
    pub fn chunk(&self, text: &str) -> Vec<String> {
        if text.chars().count() < self.config.min_chunk_size {
            return Vec::new();
        }

        let flat = self.split_by_semantic_boundaries(text);
        let overlapped = self.add_overlap(&flat);
        let deduped = if self.config.deduplicate {
            deduplicate_chunks(overlapped)
        } else {
            overlapped
        };

        deduped
            .into_iter()
            .filter(|chunk| chunk.chars().count() >= self.config.min_chunk_size)
            .collect()
    }

    /// Greedily packs paragraphs into chunks up to the target size. A
    /// paragraph longer than 1.5x the target is itself split into sentences
    /// and packed the same way, so abnormally long paragraphs never force a
    /// mid-sentence cut.
    fn split_by_semantic_boundaries(&self, text: &str) -> Vec<String> {
        let size = self.config.chunk_size_chars;
        let min = self.config.min_chunk_size;

        let paragraphs: Vec<&str> = self
            .paragraph_split
            .split(text)
            .map(str::trim)
            .filter(|paragraph| !paragraph.is_empty())
            .collect();

        let mut chunks = Vec::new();
        let mut current = String::new();

        for paragraph in paragraphs {
            let paragraph_len = paragraph.chars().count();

            if paragraph_len > size + size / 2 {
                flush_chunk(&mut chunks, &mut current, min);

                let mut buffer = String::new();
                for sentence in split_into_sentences(paragraph) {
                    if buffer.chars().count() + sentence.chars().count() <= size {
                        buffer.push_str(&sentence);
                        buffer.push(' ');
                    } else {
                        flush_chunk(&mut chunks, &mut buffer, min);
                        buffer.push_str(&sentence);
                        buffer.push(' ');
                    }
                }

                // The sentence-path leftover seeds the next paragraph buffer.
                if buffer.trim().chars().count() >= min {
                    current = buffer;
                }
            } else if current.chars().count() + paragraph_len <= size {
                current.push_str(paragraph);
                current.push_str("\n\n");
            } else {
                flush_chunk(&mut chunks, &mut current, min);
                current.push_str(paragraph);
                current.push_str("\n\n");
            }
        }

        flush_chunk(&mut chunks, &mut current, min);
        chunks
    }

    /// Prepends the tail of each chunk's predecessor, trimmed back to a
    /// sentence boundary when one exists past the halfway point of the tail.
    /// The tail is taken from the pre-overlap chunk list, so injected text is
    /// never compounded across chunks.
    fn add_overlap(&self, chunks: &[String]) -> Vec<String> {
        let overlap = self.config.chunk_overlap_chars;
        if chunks.is_empty() || overlap == 0 {
            return chunks.to_vec();
        }

        let mut overlapped = Vec::with_capacity(chunks.len());
        for (index, chunk) in chunks.iter().enumerate() {
            if index == 0 {
                overlapped.push(chunk.clone());
                continue;
            }

            let tail = tail_chars(&chunks[index - 1], overlap);
            let tail = trim_to_sentence_boundary(&tail);
            overlapped.push(format!("{tail} {chunk}"));
        }

        overlapped
    }
}

fn flush_chunk(chunks: &mut Vec<String>, buffer: &mut String, min_chars: usize) {
    let trimmed = buffer.trim();
    if !trimmed.is_empty() && trimmed.chars().count() >= min_chars {
        chunks.push(trimmed.to_string());
    }
    buffer.clear();
}

/// Splits into sentences on bilingual sentence-ending punctuation, keeping
/// the punctuation attached. Punctuation-only fragments are dropped.
fn split_into_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut start = 0;
    let mut previous_was_end = false;

    for (byte_index, character) in text.char_indices() {
        let is_end = SENTENCE_ENDS.contains(&character);
        if previous_was_end && !is_end {
            push_sentence(&mut sentences, &text[start..byte_index]);
            start = byte_index;
        }
        previous_was_end = is_end;
    }

    push_sentence(&mut sentences, &text[start..]);
    sentences
}

fn push_sentence(sentences: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    let content = piece.trim_matches(|c: char| SENTENCE_ENDS.contains(&c) || c.is_whitespace());
    if !content.is_empty() {
        sentences.push(piece.to_string());
    }
}

fn tail_chars(text: &str, count: usize) -> String {
    let total = text.chars().count();
    if total <= count {
        return text.to_string();
    }
    text.chars().skip(total - count).collect()
}

/// Keeps the tail through its last sentence-ending mark when that mark lies
/// past the halfway point; otherwise returns the raw tail.
fn trim_to_sentence_boundary(tail: &str) -> String {
    let total = tail.chars().count();
    let mut last_end: Option<(usize, usize)> = None;

    for (char_index, (byte_index, character)) in tail.char_indices().enumerate() {
        if SENTENCE_ENDS.contains(&character) {
            last_end = Some((char_index, byte_index + character.len_utf8()));
        }
    }

    match last_end {
        Some((char_index, byte_end)) if char_index > total / 2 => tail[..byte_end].to_string(),
        _ => tail.to_string(),
    }
}

fn deduplicate_chunks(chunks: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    chunks
        .into_iter()
        .filter(|chunk| {
            let mut hasher = Sha256::new();
            hasher.update(chunk.as_bytes());
            seen.insert(format!("{:x}", hasher.finalize()))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker(config: ChunkerConfig) -> SemanticChunker {
        SemanticChunker::new(config).expect("config should be valid")
    }

    fn paragraph(seed: &str, sentences: usize) -> String {
        (0..sentences)
            .map(|index| format!("{seed} sentence number {index} with some padding words."))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn input_below_minimum_yields_no_chunks() {
        let chunker = chunker(ChunkerConfig::default());
        assert!(chunker.chunk("tiny").is_empty());
        assert!(chunker.chunk("").is_empty());
    }

    #[test]
    fn invalid_configs_are_rejected() {
        let zero_size = SemanticChunker::new(ChunkerConfig {
            chunk_size_chars: 0,
            ..ChunkerConfig::default()
        });
        assert!(zero_size.is_err());

        let overlap_too_large = SemanticChunker::new(ChunkerConfig {
            chunk_size_chars: 100,
            chunk_overlap_chars: 100,
            min_chunk_size: 10,
            deduplicate: true,
        });
        assert!(overlap_too_large.is_err());

        let min_above_size = SemanticChunker::new(ChunkerConfig {
            chunk_size_chars: 100,
            chunk_overlap_chars: 10,
            min_chunk_size: 200,
            deduplicate: true,
        });
        assert!(min_above_size.is_err());
    }

    #[test]
    fn paragraphs_pack_greedily_up_to_size() {
        let config = ChunkerConfig {
            chunk_size_chars: 400,
            chunk_overlap_chars: 0,
            min_chunk_size: 50,
            deduplicate: false,
        };
        let first = paragraph("alpha", 3);
        let second = paragraph("beta", 3);
        let third = paragraph("gamma", 3);
        let text = format!("{first}\n\n{second}\n\n{third}");

        let chunks = chunker(config).chunk(&text);
        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= config.chunk_size_chars);
        }
    }

    #[test]
    fn chunks_cover_source_text_modulo_whitespace() {
        let config = ChunkerConfig {
            chunk_size_chars: 300,
            chunk_overlap_chars: 0,
            min_chunk_size: 20,
            deduplicate: false,
        };
        let text = format!(
            "{}\n\n{}\n\n{}",
            paragraph("alpha", 2),
            paragraph("beta", 2),
            paragraph("gamma", 2)
        );

        let chunks = chunker(config).chunk(&text);
        let rebuilt: String = chunks.join("").chars().filter(|c| !c.is_whitespace()).collect();
        let source: String = text.chars().filter(|c| !c.is_whitespace()).collect();
        assert_eq!(rebuilt, source);
    }

    #[test]
    fn oversized_paragraph_falls_back_to_sentences() {
        let config = ChunkerConfig {
            chunk_size_chars: 200,
            chunk_overlap_chars: 0,
            min_chunk_size: 30,
            deduplicate: false,
        };
        // One paragraph well above 1.5x the chunk size.
        let text = paragraph("delta", 12);
        assert!(text.chars().count() > 300);

        let chunks = chunker(config).chunk(&text);
        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.ends_with('.'), "chunk should end on a sentence: {chunk:?}");
        }
    }

    #[test]
    fn overlap_prefix_is_a_suffix_of_previous_chunk() {
        let config = ChunkerConfig {
            chunk_size_chars: 120,
            chunk_overlap_chars: 20,
            min_chunk_size: 10,
            deduplicate: false,
        };
        // No sentence-ending marks in the first paragraph's tail, so the
        // injected overlap is the raw 20-character suffix.
        let first = "x".repeat(100);
        let second = "second paragraph with enough words to stand alone as a chunk";
        let text = format!("{first}\n\n{second}");

        let chunks = chunker(config).chunk(&text);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0], first);

        let prefix = chunks[1]
            .strip_suffix(&format!(" {second}"))
            .expect("second chunk should end with its own paragraph");
        assert_eq!(prefix.chars().count(), 20);
        assert!(chunks[0].ends_with(prefix));
    }

    #[test]
    fn overlap_tail_is_trimmed_to_a_sentence_boundary() {
        let config = ChunkerConfig {
            chunk_size_chars: 120,
            chunk_overlap_chars: 40,
            min_chunk_size: 10,
            deduplicate: false,
        };
        // Sentence end lands past the halfway point of the 40-char tail.
        let first = format!("{} tail words here. trailing bit", "y".repeat(80));
        let second = "the following paragraph continues the discussion in detail";
        let text = format!("{first}\n\n{second}");

        let chunks = chunker(config).chunk(&text);
        assert_eq!(chunks.len(), 2);

        let prefix = chunks[1]
            .strip_suffix(&format!(" {second}"))
            .expect("second chunk should end with its own paragraph");
        assert!(prefix.ends_with('.'), "overlap should stop at the sentence end: {prefix:?}");
        assert!(!prefix.contains("trailing bit"));
    }

    #[test]
    fn exact_duplicate_chunks_are_dropped() {
        let config = ChunkerConfig {
            chunk_size_chars: 100,
            chunk_overlap_chars: 0,
            min_chunk_size: 20,
            deduplicate: true,
        };
        let block = "repeated navigation block that keeps showing up in crawls.";
        let text = format!("{block}\n\n{block}\n\n{block}");

        let chunks = chunker(config).chunk(&text);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0], block);
    }

    #[test]
    fn duplicates_survive_when_dedup_is_disabled() {
        let config = ChunkerConfig {
            chunk_size_chars: 100,
            chunk_overlap_chars: 0,
            min_chunk_size: 20,
            deduplicate: false,
        };
        let block = "repeated navigation block that keeps showing up in crawls.";
        let text = format!("{block}\n\n{block}");

        let chunks = chunker(config).chunk(&text);
        assert_eq!(chunks.len(), 2);
    }

    #[test]
    fn no_returned_chunk_is_below_minimum_size() {
        let config = ChunkerConfig {
            chunk_size_chars: 200,
            chunk_overlap_chars: 0,
            min_chunk_size: 60,
            deduplicate: true,
        };
        let text = format!("{}\n\nshort leftover.", paragraph("epsilon", 4));

        let chunks = chunker(config).chunk(&text);
        assert!(!chunks.is_empty());
        for chunk in &chunks {
            assert!(chunk.chars().count() >= config.min_chunk_size);
        }
    }
}
