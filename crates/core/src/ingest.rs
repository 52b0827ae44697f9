use crate::chunker::{ChunkerConfig, SemanticChunker};
use crate::error::PipelineError;
use crate::metadata::MetadataTagger;
use crate::models::{Chunk, PipelineOptions, QualityScore, RawDocument, SourceType, UploadItem};
use crate::normalize::TextNormalizer;
use crate::quality::QualityScorer;
use chrono::{DateTime, Utc};
use tracing::{debug, info};

/// One document's trip through the ingestion pipeline: normalize, gate on
/// document quality, chunk, gate each chunk, tag metadata. Rejection degrades
/// to an empty outcome, never an error.
pub struct DocumentPipeline {
    normalizer: TextNormalizer,
    scorer: QualityScorer,
    chunker: SemanticChunker,
    tagger: MetadataTagger,
    options: PipelineOptions,
}

/// Result of processing a single RawDocument.
pub struct ProcessOutcome {
    pub chunks: Vec<Chunk>,
    pub document_score: QualityScore,
    /// Chunks dropped by the per-chunk quality gate.
    pub chunks_dropped: usize,
    pub ingested_at: DateTime<Utc>,
}

impl ProcessOutcome {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn into_upload_items(self) -> Vec<UploadItem> {
        self.chunks.into_iter().map(Chunk::into_upload_item).collect()
    }

    fn rejected(document_score: QualityScore) -> Self {
        Self {
            chunks: Vec::new(),
            document_score,
            chunks_dropped: 0,
            ingested_at: Utc::now(),
        }
    }
}

impl DocumentPipeline {
    pub fn new(options: PipelineOptions) -> Result<Self, PipelineError> {
        Self::with_scorer(options, QualityScorer::new())
    }

    /// Builds a pipeline over an alternate relevance vocabulary.
    pub fn with_scorer(options: PipelineOptions, scorer: QualityScorer) -> Result<Self, PipelineError> {
        Ok(Self {
            normalizer: TextNormalizer::new()?,
            scorer,
            chunker: SemanticChunker::new(ChunkerConfig::from(&options))?,
            tagger: MetadataTagger::new()?,
            options,
        })
    }

    pub fn process(&self, document: &RawDocument) -> ProcessOutcome {
        let normalized = self
            .normalizer
            .normalize(&document.raw_text, self.options.aggressive_cleaning);

        if normalized.is_empty() {
            debug!(source_url = %document.source_url, "nothing worth keeping after normalization");
            return ProcessOutcome::rejected(QualityScore::zero());
        }

        let document_score = self.scorer.score(&normalized);
        if !self
            .scorer
            .is_high_quality(&normalized, self.options.quality_threshold)
        {
            info!(
                source_url = %document.source_url,
                overall = document_score.overall,
                "document rejected by quality gate"
            );
            return ProcessOutcome::rejected(document_score);
        }

        let raw_chunks = self.chunker.chunk(&normalized);
        let total_chunks = raw_chunks.len();
        let source_type = document
            .source_type
            .unwrap_or_else(|| SourceType::from_source_url(&document.source_url));

        let mut chunks = Vec::new();
        let mut chunks_dropped = 0usize;

        for (index, text) in raw_chunks.into_iter().enumerate() {
            // Chunk-local keyword density may differ from the document-level
            // score, so each chunk is gated independently.
            let quality = self.scorer.score(&text);
            if !self
                .scorer
                .is_high_quality(&text, self.options.quality_threshold)
            {
                chunks_dropped += 1;
                continue;
            }

            let mut metadata = self
                .tagger
                .extract(&text, &document.source_url, &document.title);
            metadata.quality_score = Some((quality.overall * 10_000.0).round() / 10_000.0);
            metadata.chunk_index = Some(index);
            metadata.total_chunks = Some(total_chunks);
            metadata.source_type = Some(source_type);

            chunks.push(Chunk {
                text,
                index,
                total_chunks,
                quality,
                metadata,
            });
        }

        info!(
            source_url = %document.source_url,
            kept = chunks.len(),
            total = total_chunks,
            dropped = chunks_dropped,
            "document processed"
        );

        ProcessOutcome {
            chunks,
            document_score,
            chunks_dropped,
            ingested_at: Utc::now(),
        }
    }
}
