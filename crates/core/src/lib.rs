pub mod assemble;
pub mod chunker;
pub mod error;
pub mod ingest;
pub mod metadata;
pub mod models;
pub mod normalize;
pub mod quality;
pub mod stores;
pub mod traits;

pub use assemble::{format_citations, ContextAssembler};
pub use chunker::{ChunkerConfig, SemanticChunker};
pub use error::{AssembleError, PipelineError, SearchError};
pub use ingest::{DocumentPipeline, ProcessOutcome};
pub use metadata::MetadataTagger;
pub use models::{
    AssemblerOptions, Category, Chunk, ChunkMetadata, Citation, CitationMap, ContextBundle,
    FilteredResult, PipelineOptions, QualityScore, RawDocument, SearchHit, SourceType, UploadItem,
};
pub use normalize::TextNormalizer;
pub use quality::{QualityScorer, DEFAULT_SECURITY_KEYWORDS};
pub use stores::VectorServiceStore;
pub use traits::{ChunkIndex, SearchBackend};
