use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A document handed over by the crawler/extractor collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDocument {
    pub source_url: String,
    pub title: String,
    pub raw_text: String,
    /// Explicit origin tag; derived from `source_url` when absent.
    pub source_type: Option<SourceType>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Pdf,
    Html,
    LocalPdf,
    Text,
}

impl SourceType {
    pub fn from_source_url(source_url: &str) -> Self {
        if source_url.to_lowercase().ends_with(".pdf") {
            SourceType::Pdf
        } else {
            SourceType::Html
        }
    }
}

/// Multi-factor quality estimate for one text unit. Every component is in [0, 1].
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct QualityScore {
    pub length: f64,
    pub relevance: f64,
    pub readability: f64,
    pub information_density: f64,
    pub overall: f64,
}

impl QualityScore {
    pub fn zero() -> Self {
        Self {
            length: 0.0,
            relevance: 0.0,
            readability: 0.0,
            information_density: 0.0,
            overall: 0.0,
        }
    }
}

/// Closed topical vocabulary; the matching patterns live next to the tagger
/// so adding a category is a data change, not a code change.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    SqlInjection,
    Xss,
    Phishing,
    Ransomware,
    Rce,
    Ddos,
    PenetrationTesting,
    Malware,
    Vulnerability,
    AttackTechnique,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::SqlInjection => "sql_injection",
            Category::Xss => "xss",
            Category::Phishing => "phishing",
            Category::Ransomware => "ransomware",
            Category::Rce => "rce",
            Category::Ddos => "ddos",
            Category::PenetrationTesting => "penetration_testing",
            Category::Malware => "malware",
            Category::Vulnerability => "vulnerability",
            Category::AttackTechnique => "attack_technique",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Structured tags extracted from a chunk's text plus document-level context.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ChunkMetadata {
    pub source_url: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cves: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cwes: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mitre_techniques: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dates: Vec<String>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_chunks: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_type: Option<SourceType>,
}

/// A bounded unit of a document's text, the granularity at which content is
/// indexed and retrieved. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    pub index: usize,
    pub total_chunks: usize,
    pub quality: QualityScore,
    pub metadata: ChunkMetadata,
}

impl Chunk {
    pub fn into_upload_item(self) -> UploadItem {
        UploadItem {
            file: self.text,
            metadata: self.metadata,
        }
    }
}

/// One element of the batch handed to the indexing collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadItem {
    pub file: String,
    pub metadata: ChunkMetadata,
}

fn default_file_id() -> String {
    "unknown".to_string()
}

/// A ranked hit returned by the external search collaborator. Missing fields
/// are tolerated so one malformed hit cannot abort assembly of the rest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(default)]
    pub text: String,
    #[serde(default = "default_file_id")]
    pub file_id: String,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub metadata: Value,
}

/// A SearchHit re-ranked, truncated, and numbered for one assembly call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilteredResult {
    pub citation_id: usize,
    pub file_id: String,
    pub content: String,
    pub score: f64,
    pub metadata: Value,
}

/// Inverse lookup entry keyed by citation id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    pub file_id: String,
    pub score: f64,
    pub metadata: Value,
    pub content_preview: String,
}

pub type CitationMap = BTreeMap<usize, Citation>;

/// Everything the prompt-construction collaborator needs for one query.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContextBundle {
    pub context_text: String,
    pub filtered_results: Vec<FilteredResult>,
    pub citations: CitationMap,
}

/// Ingestion-side configuration surface.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub chunk_size_chars: usize,
    pub chunk_overlap_chars: usize,
    pub min_chunk_size: usize,
    pub quality_threshold: f64,
    pub aggressive_cleaning: bool,
    pub deduplicate: bool,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            chunk_size_chars: 1_500,
            chunk_overlap_chars: 150,
            min_chunk_size: 100,
            quality_threshold: 0.5,
            aggressive_cleaning: false,
            deduplicate: true,
        }
    }
}

/// Query-side configuration surface.
#[derive(Debug, Clone)]
pub struct AssemblerOptions {
    pub max_context_length: usize,
    pub top_k: usize,
    /// Forwarded to the search backend, which filters hits by score before
    /// they reach `assemble`; the assembler itself applies no score cut.
    pub score_threshold: f64,
}

impl Default for AssemblerOptions {
    fn default() -> Self {
        Self {
            max_context_length: 2_000,
            top_k: 5,
            score_threshold: 0.5,
        }
    }
}
