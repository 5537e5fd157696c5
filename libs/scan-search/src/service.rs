//! Search service
//!
//! Orchestrates one search against an injected repository:
//! - normalize pagination and validate the request against the registries
//! - compile it for the repository's backend
//! - count all matches, then fetch one page
//!
//! Count and fetch are two independent reads; under concurrent writes the
//! total may not match the rows returned across pages.

use crate::error::Result;
use crate::model::SearchParameters;
use crate::pagination::Pagination;
use crate::schema::FieldRegistry;
use crate::validate::{validate, ValidatedSearch};
use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

/// Response envelope: `{"total": n, "results": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult<T> {
    /// All matches, ignoring pagination.
    pub total: u64,
    pub results: Vec<T>,
}

/// One entity's datastore. Implementations pick the compiler for their
/// backend; the service never inspects the compiled query.
#[async_trait]
pub trait SearchRepository: Send + Sync {
    type Item: Send;
    type Query: Send + Sync;

    fn compile(&self, search: &ValidatedSearch) -> Result<Self::Query>;

    async fn count(&self, query: &Self::Query) -> Result<u64>;

    async fn fetch(&self, query: &Self::Query, pagination: &Pagination)
        -> Result<Vec<Self::Item>>;
}

/// Run one search. Nothing reaches the repository unless validation and
/// compilation succeed.
pub async fn search<R>(
    repository: &R,
    registries: &[&FieldRegistry],
    params: &SearchParameters,
) -> Result<SearchResult<R::Item>>
where
    R: SearchRepository + ?Sized,
{
    let validated = validate(params, registries).inspect_err(|e| {
        tracing::debug!(error = %e, "Rejected search request");
    })?;
    let query = repository.compile(&validated).inspect_err(|e| {
        tracing::debug!(error = %e, "Search request failed to compile");
    })?;

    let total = repository.count(&query).await.inspect_err(|e| {
        tracing::error!(error = %e, "Search count failed");
    })?;
    let results = repository
        .fetch(&query, &validated.pagination)
        .await
        .inspect_err(|e| {
            tracing::error!(error = %e, "Search fetch failed");
        })?;

    tracing::debug!(
        total,
        returned = results.len(),
        page = validated.pagination.page,
        per_page = validated.pagination.per_page,
        "Search completed"
    );
    Ok(SearchResult { total, results })
}

/// A repository bound to the registries that describe its entity.
pub struct SearchService<R: SearchRepository> {
    repository: Arc<R>,
    registries: Vec<Arc<FieldRegistry>>,
}

impl<R: SearchRepository> SearchService<R> {
    /// `registries` are searched in order when resolving field names.
    pub fn new(repository: Arc<R>, registries: Vec<Arc<FieldRegistry>>) -> Self {
        Self {
            repository,
            registries,
        }
    }

    pub fn registries(&self) -> impl Iterator<Item = &FieldRegistry> {
        self.registries.iter().map(|r| r.as_ref())
    }

    /// Validate without touching the repository.
    pub fn validate(&self, params: &SearchParameters) -> Result<ValidatedSearch> {
        let registries: Vec<&FieldRegistry> = self.registries().collect();
        validate(params, &registries)
    }

    /// Validate and compile without touching the datastore.
    pub fn compile(&self, params: &SearchParameters) -> Result<R::Query> {
        self.repository.compile(&self.validate(params)?)
    }

    pub async fn search(&self, params: &SearchParameters) -> Result<SearchResult<R::Item>> {
        let registries: Vec<&FieldRegistry> = self.registries().collect();
        search(self.repository.as_ref(), &registries, params).await
    }
}
