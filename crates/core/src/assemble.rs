use crate::error::AssembleError;
use crate::models::{
    AssemblerOptions, Citation, CitationMap, ContextBundle, FilteredResult, SearchHit,
};
use serde_json::Value;

const SENTENCE_ENDS: [char; 7] = ['。', '！', '？', '.', '!', '?', '\n'];

/// Preview text in the citation map is capped at this many characters.
const PREVIEW_CHARS: usize = 100;

/// Reassembles ranked search hits into a bounded-length context string with a
/// parallel citation map. Stateless across queries; citation ids are local to
/// one assembly call.
pub struct ContextAssembler {
    options: AssemblerOptions,
}

impl ContextAssembler {
    pub fn new(options: AssemblerOptions) -> Result<Self, AssembleError> {
        if options.max_context_length == 0 {
            return Err(AssembleError::InvalidConfig(
                "max_context_length must be positive".to_string(),
            ));
        }
        if options.top_k == 0 {
            return Err(AssembleError::InvalidConfig(
                "top_k must be positive".to_string(),
            ));
        }
        Ok(Self { options })
    }

    /// Sorts hits by score descending, keeps the top k, and accumulates
    /// per-citation blocks until the length budget is spent. A hit that would
    /// exceed the remaining budget is truncated rather than dropped. Empty
    /// input yields empty outputs, not an error.
    pub fn assemble(&self, hits: &[SearchHit]) -> ContextBundle {
        if hits.is_empty() {
            return ContextBundle::default();
        }

        let mut ranked: Vec<&SearchHit> = hits.iter().collect();
        ranked.sort_by(|left, right| right.score.total_cmp(&left.score));

        let mut blocks = Vec::new();
        let mut filtered_results = Vec::new();
        let mut current_length = 0usize;

        for hit in ranked.into_iter().take(self.options.top_k) {
            if current_length >= self.options.max_context_length {
                break;
            }

            let available = self.options.max_context_length - current_length;
            let content = if hit.text.chars().count() > available {
                smart_truncate(&hit.text, available)
            } else {
                hit.text.clone()
            };

            let citation_id = filtered_results.len() + 1;
            let block = format!("[citation {citation_id}] (score: {:.4})\n{content}\n", hit.score);
            current_length += block.chars().count();
            blocks.push(block);

            filtered_results.push(FilteredResult {
                citation_id,
                file_id: hit.file_id.clone(),
                content,
                score: hit.score,
                metadata: hit.metadata.clone(),
            });
        }

        let citations = build_citation_map(&filtered_results);

        ContextBundle {
            context_text: blocks.join("\n"),
            filtered_results,
            citations,
        }
    }
}

fn build_citation_map(filtered_results: &[FilteredResult]) -> CitationMap {
    filtered_results
        .iter()
        .map(|result| {
            let preview = if result.content.chars().count() > PREVIEW_CHARS {
                let cut: String = result.content.chars().take(PREVIEW_CHARS).collect();
                format!("{cut}...")
            } else {
                result.content.clone()
            };

            (
                result.citation_id,
                Citation {
                    file_id: result.file_id.clone(),
                    score: result.score,
                    metadata: result.metadata.clone(),
                    content_preview: preview,
                },
            )
        })
        .collect()
}

/// Truncates to at most `max_chars`, preferring the nearest sentence-ending
/// mark when one lies past the halfway point of the cut; otherwise hard-cuts
/// and appends an ellipsis marker.
fn smart_truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }

    let truncated: String = text.chars().take(max_chars).collect();

    let mut last_end: Option<(usize, usize)> = None;
    for (char_index, (byte_index, character)) in truncated.char_indices().enumerate() {
        if SENTENCE_ENDS.contains(&character) {
            last_end = Some((char_index, byte_index + character.len_utf8()));
        }
    }

    match last_end {
        Some((char_index, byte_end)) if char_index > max_chars / 2 => truncated[..byte_end].to_string(),
        _ => format!("{truncated}..."),
    }
}

/// Renders the citation map into a user-facing references block, one line per
/// citation sorted by id. Empty map renders to an empty string.
pub fn format_citations(citations: &CitationMap) -> String {
    if citations.is_empty() {
        return String::new();
    }

    let mut lines = vec!["References:".to_string()];
    for (citation_id, citation) in citations {
        let description = citation
            .metadata
            .get("description")
            .and_then(Value::as_str)
            .unwrap_or("no description");
        lines.push(format!(
            "[{citation_id}] {} | score: {:.4} | {description}",
            citation.file_id, citation.score
        ));
    }

    lines.join("\n")
}
