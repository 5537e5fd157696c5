//! Command implementations. Each returns the JSON document to print.

use anyhow::Context;
use serde::Serialize;
use serde_json::{json, Value as JsonValue};
use shiryoku_search::compile::{document, sql};
use shiryoku_search::validate::validate;
use shiryoku_search::{
    FieldRegistry, SearchParameters, SearchRepository, SearchService, ValidatedSearch,
};
use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use crate::config::Config;
use crate::db::{self, OpenSearchClient, OpenSearchRepository, PgSearchRepository};
use crate::models::{DashboardScan, NmapDocument, ScanResult};
use crate::schema::{Entity, SchemaCatalog, DASHBOARD_SOURCE, SCAN_RESULTS_SOURCE};

/// Read a request body from a file, or stdin for `-`.
pub fn read_request(path: &str) -> anyhow::Result<SearchParameters> {
    let body = if path == "-" {
        let mut body = Vec::new();
        std::io::stdin()
            .read_to_end(&mut body)
            .context("Failed to read request from stdin")?;
        body
    } else {
        std::fs::read(Path::new(path))
            .with_context(|| format!("Failed to read request file {path}"))?
    };
    Ok(SearchParameters::from_json(&body)?)
}

/// `fields`: every registry consulted for the entity, in lookup order.
pub fn describe_fields(catalog: &SchemaCatalog, entity: Entity) -> JsonValue {
    let registries: Vec<JsonValue> = catalog
        .registries(entity)
        .iter()
        .map(|registry| {
            let fields: serde_json::Map<String, JsonValue> = registry
                .describe()
                .into_iter()
                .map(|(name, kind)| (name.to_string(), json!(kind)))
                .collect();
            json!({ "entity": registry.entity(), "fields": fields })
        })
        .collect();
    json!({ "entity": entity.as_str(), "registries": registries })
}

/// `compile`: the backend query a search would run. No datastore I/O.
pub fn compile_request(
    catalog: &SchemaCatalog,
    entity: Entity,
    params: &SearchParameters,
) -> anyhow::Result<JsonValue> {
    let registries = catalog.registries(entity);
    let registries: Vec<&FieldRegistry> = registries.iter().map(|r| r.as_ref()).collect();
    let validated = validate(params, &registries)?;

    let compiled = match entity {
        Entity::Nmap => {
            let query = document::compile(&validated)?;
            json!({
                "backend": "opensearch",
                "count": query.count_body(),
                "search": query.search_body(&validated.pagination),
                "distinct": query.distinct,
            })
        }
        Entity::ScanResults => compile_sql(&validated, SCAN_RESULTS_SOURCE)?,
        Entity::Dashboard => compile_sql(&validated, DASHBOARD_SOURCE)?,
    };
    Ok(compiled)
}

fn compile_sql(validated: &ValidatedSearch, source: &str) -> anyhow::Result<JsonValue> {
    let query = sql::compile(validated)?;
    Ok(json!({
        "backend": "postgres",
        "count": query.build_count_sql(source),
        "search": query.build_sql(source, &validated.pagination),
        "binds": query.binds(),
    }))
}

/// `search`: run the request against the configured datastore.
pub async fn run_search(
    config: &Config,
    catalog: &SchemaCatalog,
    entity: Entity,
    params: &SearchParameters,
) -> anyhow::Result<JsonValue> {
    let registries = catalog.registries(entity);
    match entity {
        Entity::Nmap => {
            let client = OpenSearchClient::new(&config.opensearch)?;
            let repository = OpenSearchRepository::<NmapDocument>::new(Arc::new(client));
            search_with(repository, registries, params).await
        }
        Entity::ScanResults => {
            let pool = connect(config).await?;
            let repository = PgSearchRepository::<ScanResult>::new(pool, SCAN_RESULTS_SOURCE);
            search_with(repository, registries, params).await
        }
        Entity::Dashboard => {
            let pool = connect(config).await?;
            let repository = PgSearchRepository::<DashboardScan>::new(pool, DASHBOARD_SOURCE);
            search_with(repository, registries, params).await
        }
    }
}

async fn connect(config: &Config) -> anyhow::Result<sqlx::PgPool> {
    db::postgres::connect(&config.database)
        .await
        .context("Failed to connect to Postgres")
}

async fn search_with<R>(
    repository: R,
    registries: Vec<Arc<FieldRegistry>>,
    params: &SearchParameters,
) -> anyhow::Result<JsonValue>
where
    R: SearchRepository,
    R::Item: Serialize,
{
    let service = SearchService::new(Arc::new(repository), registries);
    let result = service.search(params).await?;
    Ok(serde_json::to_value(result)?)
}
