//! OpenSearch repository
//!
//! Talks to the `_count` and `_search` endpoints of one index. Distinct
//! searches are de-duplicated per page after the hits are read, since the
//! store has no native DISTINCT.

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use shiryoku_search::compile::document::{self, DocumentQuery};
use shiryoku_search::{Error, Pagination, Result, SearchRepository, ValidatedSearch};
use std::marker::PhantomData;
use std::sync::Arc;

use crate::config::OpenSearchConfig;

/// HTTP client bound to one index.
pub struct OpenSearchClient {
    client: Client,
    base_url: String,
    index: String,
    credentials: Option<(String, String)>,
}

impl OpenSearchClient {
    pub fn new(config: &OpenSearchConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| Error::backend(format!("Failed to build HTTP client: {e}")))?;
        let credentials = match (&config.username, &config.password) {
            (Some(user), Some(password)) => Some((user.clone(), password.clone())),
            _ => None,
        };
        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
            index: config.index.clone(),
            credentials,
        })
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    fn endpoint(&self, action: &str) -> String {
        format!("{}/{}/{}", self.base_url, self.index, action)
    }

    async fn post(&self, action: &str, body: &JsonValue) -> Result<JsonValue> {
        let url = self.endpoint(action);
        let mut request = self.client.post(&url).json(body);
        if let Some((user, password)) = &self.credentials {
            request = request.basic_auth(user, Some(password));
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::backend(format!("OpenSearch request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::backend(format!(
                "OpenSearch {action} failed with status {status}: {text}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| Error::backend(format!("Invalid OpenSearch {action} response: {e}")))
    }

    pub async fn count(&self, body: &JsonValue) -> Result<u64> {
        parse_count(self.post("_count", body).await?)
    }

    pub async fn search(&self, body: &JsonValue) -> Result<Vec<JsonValue>> {
        parse_hits(self.post("_search", body).await?)
    }
}

#[derive(Deserialize)]
struct CountResponse {
    count: u64,
}

#[derive(Deserialize)]
struct SearchResponse {
    hits: Hits,
}

#[derive(Deserialize)]
struct Hits {
    hits: Vec<Hit>,
}

#[derive(Deserialize)]
struct Hit {
    #[serde(rename = "_source", default)]
    source: JsonValue,
}

fn parse_count(response: JsonValue) -> Result<u64> {
    serde_json::from_value::<CountResponse>(response)
        .map(|r| r.count)
        .map_err(|e| Error::backend(format!("Invalid OpenSearch _count response: {e}")))
}

fn parse_hits(response: JsonValue) -> Result<Vec<JsonValue>> {
    serde_json::from_value::<SearchResponse>(response)
        .map(|r| r.hits.hits.into_iter().map(|h| h.source).collect())
        .map_err(|e| Error::backend(format!("Invalid OpenSearch _search response: {e}")))
}

pub struct OpenSearchRepository<T> {
    client: Arc<OpenSearchClient>,
    _item: PhantomData<fn() -> T>,
}

impl<T> OpenSearchRepository<T> {
    pub fn new(client: Arc<OpenSearchClient>) -> Self {
        Self {
            client,
            _item: PhantomData,
        }
    }
}

#[async_trait]
impl<T> SearchRepository for OpenSearchRepository<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Item = T;
    type Query = DocumentQuery;

    fn compile(&self, search: &ValidatedSearch) -> Result<DocumentQuery> {
        document::compile(search)
    }

    async fn count(&self, query: &DocumentQuery) -> Result<u64> {
        let body = query.count_body();
        tracing::debug!(index = %self.client.index(), body = %body, "Counting documents");
        self.client.count(&body).await
    }

    async fn fetch(&self, query: &DocumentQuery, pagination: &Pagination) -> Result<Vec<T>> {
        let body = query.search_body(pagination);
        tracing::debug!(index = %self.client.index(), body = %body, "Searching documents");

        let mut rows = self.client.search(&body).await?;
        if query.distinct {
            let fetched = rows.len();
            rows = document::deduplicate(rows);
            tracing::debug!(fetched, kept = rows.len(), "Removed duplicate documents");
        }

        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(Error::backend))
            .collect()
    }
}
