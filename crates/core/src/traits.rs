use crate::error::SearchError;
use crate::models::{SearchHit, UploadItem};
use async_trait::async_trait;

/// Indexing side of the external vector-database service. Batch sizing is
/// owned by the caller; one call uploads one batch.
#[async_trait]
pub trait ChunkIndex {
    async fn upload_items(&self, items: &[UploadItem]) -> Result<Vec<u64>, SearchError>;
}

/// Query side of the external vector-database service.
#[async_trait]
pub trait SearchBackend {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        score_threshold: f64,
    ) -> Result<Vec<SearchHit>, SearchError>;
}
