use crate::error::SearchError;
use crate::models::{SearchHit, UploadItem};
use crate::traits::{ChunkIndex, SearchBackend};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use tracing::warn;
use url::Url;

/// Thin transport to the backend vector-database service. Retries and
/// timeouts live with the caller's HTTP policy, not here.
pub struct VectorServiceStore {
    base_url: Url,
    database: String,
    token: String,
    metric_type: String,
    client: Client,
}

impl VectorServiceStore {
    pub fn new(
        base_url: &str,
        database: impl Into<String>,
        token: impl Into<String>,
    ) -> Result<Self, SearchError> {
        Ok(Self {
            base_url: Url::parse(base_url)?,
            database: database.into(),
            token: token.into(),
            metric_type: "cosine".to_string(),
            client: Client::new(),
        })
    }

    fn endpoint(&self, suffix: &str) -> String {
        format!(
            "{}/databases/{}/{suffix}",
            self.base_url.as_str().trim_end_matches('/'),
            self.database
        )
    }
}

#[async_trait]
impl ChunkIndex for VectorServiceStore {
    async fn upload_items(&self, items: &[UploadItem]) -> Result<Vec<u64>, SearchError> {
        if items.is_empty() {
            return Ok(Vec::new());
        }

        let response = self
            .client
            .post(self.endpoint("files"))
            .json(&json!({
                "files": items,
                "token": self.token,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "vector-service".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let file_ids = parsed
            .pointer("/file_ids")
            .and_then(Value::as_array)
            .map(|ids| ids.iter().filter_map(Value::as_u64).collect())
            .unwrap_or_default();

        Ok(file_ids)
    }
}

#[async_trait]
impl SearchBackend for VectorServiceStore {
    async fn search(
        &self,
        query: &str,
        top_k: usize,
        score_threshold: f64,
    ) -> Result<Vec<SearchHit>, SearchError> {
        let response = self
            .client
            .post(self.endpoint("search"))
            .json(&json!({
                "token": self.token,
                "query": query,
                "top_k": top_k,
                "metric_type": self.metric_type,
                "score_threshold": score_threshold,
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SearchError::BackendResponse {
                backend: "vector-service".to_string(),
                details: response.status().to_string(),
            });
        }

        let parsed: Value = response.json().await?;
        let raw_hits = parsed
            .pointer("/files")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        let mut hits = Vec::new();
        for raw_hit in raw_hits {
            // Missing fields fall back to serde defaults; a hit that cannot
            // be shaped at all is skipped rather than failing the query.
            match serde_json::from_value::<SearchHit>(raw_hit) {
                Ok(hit) => hits.push(hit),
                Err(error) => warn!(%error, "skipping malformed search hit"),
            }
        }

        Ok(hits)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_are_built_from_base_url_and_database() {
        let store = VectorServiceStore::new("http://localhost:9002/api", "common_dataset", "tok")
            .expect("base url parses");

        assert_eq!(
            store.endpoint("search"),
            "http://localhost:9002/api/databases/common_dataset/search"
        );
        assert_eq!(
            store.endpoint("files"),
            "http://localhost:9002/api/databases/common_dataset/files"
        );
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        assert!(VectorServiceStore::new("not a url", "db", "tok").is_err());
    }

    #[test]
    fn partial_hits_deserialize_with_defaults() {
        let raw = serde_json::json!({ "score": 0.7 });
        let hit: SearchHit = serde_json::from_value(raw).expect("hit deserializes");
        assert_eq!(hit.text, "");
        assert_eq!(hit.file_id, "unknown");
        assert_eq!(hit.score, 0.7);
    }
}
