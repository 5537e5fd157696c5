use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use shiryoku_search::compile::{sql, BindValue, SqlQuery};
use shiryoku_search::{Error, Pagination, Result, SearchRepository, ValidatedSearch};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::marker::PhantomData;

use crate::config::DatabaseConfig;

pub async fn connect(config: &DatabaseConfig) -> std::result::Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(&config.url)
        .await
}

/// Searches one relational source. Rows are fetched as JSON objects and
/// deserialized into `T`.
pub struct PgSearchRepository<T> {
    pool: PgPool,
    source: &'static str,
    _item: PhantomData<fn() -> T>,
}

impl<T> PgSearchRepository<T> {
    /// `source` is a trusted table expression, never user input.
    pub fn new(pool: PgPool, source: &'static str) -> Self {
        Self {
            pool,
            source,
            _item: PhantomData,
        }
    }
}

#[async_trait]
impl<T> SearchRepository for PgSearchRepository<T>
where
    T: DeserializeOwned + Send + 'static,
{
    type Item = T;
    type Query = SqlQuery;

    fn compile(&self, search: &ValidatedSearch) -> Result<SqlQuery> {
        sql::compile(search)
    }

    async fn count(&self, query: &SqlQuery) -> Result<u64> {
        let sql = query.build_count_sql(self.source);
        tracing::debug!(sql = %sql, binds = query.binds().len(), "Counting rows");

        let mut query_builder = sqlx::query_scalar::<_, i64>(&sql);
        for value in query.binds().iter().cloned() {
            query_builder = match value {
                BindValue::Text(v) => query_builder.bind(v),
                BindValue::Float(v) => query_builder.bind(v),
                BindValue::Bool(v) => query_builder.bind(v),
                BindValue::TextArray(vs) => query_builder.bind(vs),
                BindValue::FloatArray(vs) => query_builder.bind(vs),
                BindValue::BoolArray(vs) => query_builder.bind(vs),
            };
        }

        let total = query_builder
            .fetch_one(&self.pool)
            .await
            .map_err(Error::backend)?;
        Ok(total.max(0) as u64)
    }

    async fn fetch(&self, query: &SqlQuery, pagination: &Pagination) -> Result<Vec<T>> {
        let sql = query.build_sql(self.source, pagination);
        tracing::debug!(sql = %sql, binds = query.binds().len(), "Fetching page");

        let mut query_builder = sqlx::query_scalar::<_, JsonValue>(&sql);
        for value in query.binds().iter().cloned() {
            query_builder = match value {
                BindValue::Text(v) => query_builder.bind(v),
                BindValue::Float(v) => query_builder.bind(v),
                BindValue::Bool(v) => query_builder.bind(v),
                BindValue::TextArray(vs) => query_builder.bind(vs),
                BindValue::FloatArray(vs) => query_builder.bind(vs),
                BindValue::BoolArray(vs) => query_builder.bind(vs),
            };
        }

        let rows = query_builder
            .fetch_all(&self.pool)
            .await
            .map_err(Error::backend)?;

        rows.into_iter()
            .map(|row| serde_json::from_value(row).map_err(Error::backend))
            .collect()
    }
}
