mod support;

use serde_json::json;
use shiryoku_cli::commands::{compile_request, describe_fields, read_request};
use shiryoku_cli::{Entity, SchemaCatalog};
use shiryoku_search::Error;
use support::{params, request_file};

#[test]
fn compile_scan_results_to_parameterized_sql() -> anyhow::Result<()> {
    let catalog = SchemaCatalog::new();
    let compiled = compile_request(
        &catalog,
        Entity::ScanResults,
        &params(json!({
            "parameters": ["host", "port"],
            "search": [
                {"parameter": "port_state", "operator": "eq", "value": "open"},
                {"parameter": "host", "operator": "like", "value": "10.0_"}
            ],
            "sort": [{"parameter": "port", "direction": "desc"}],
            "per_page": 10
        })),
    )?;

    assert_eq!(compiled["backend"], "postgres");
    assert_eq!(
        compiled["search"],
        "SELECT row_to_json(q) AS row FROM (\
         SELECT \"h\".\"host\" AS \"host\", \"sr\".\"port\" AS \"port\" \
         FROM scan_results sr JOIN hosts h USING (host_id) \
         WHERE \"sr\".\"port_state\" = $1 AND \"h\".\"host\" ILIKE $2 ESCAPE E'\\\\' \
         ORDER BY \"sr\".\"port\" DESC LIMIT 10 OFFSET 0) q"
    );
    assert_eq!(compiled["binds"], json!(["open", "%10.0\\_%"]));
    Ok(())
}

#[test]
fn compile_nmap_to_a_document_query() -> anyhow::Result<()> {
    let catalog = SchemaCatalog::new();
    let compiled = compile_request(
        &catalog,
        Entity::Nmap,
        &params(json!({
            "search": [
                {"parameter": "port", "operator": "in", "values": [80, 443]},
                {"parameter": "service_name", "operator": "neq", "value": "http"}
            ],
            "page": 2,
            "per_page": 50
        })),
    )?;

    assert_eq!(compiled["backend"], "opensearch");
    assert_eq!(
        compiled["search"],
        json!({
            "query": {"bool": {
                "must": [{"terms": {"port": [80, 443]}}],
                "must_not": [{"term": {"service_name.keyword": "http"}}]
            }},
            "from": 50,
            "size": 50
        })
    );
    Ok(())
}

#[test]
fn unknown_fields_are_rejected_per_entity() {
    let catalog = SchemaCatalog::new();
    let request = params(json!({
        "search": [{"parameter": "script_id", "operator": "eq", "value": "http-title"}]
    }));

    assert!(compile_request(&catalog, Entity::Nmap, &request).is_ok());
    let err = compile_request(&catalog, Entity::Dashboard, &request).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::InvalidField(f)) if f == "script_id"
    ));
}

#[test]
fn fields_lists_registries_in_lookup_order() {
    let catalog = SchemaCatalog::new();
    let described = describe_fields(&catalog, Entity::ScanResults);
    assert_eq!(described["registries"][0]["entity"], "scan_results");
    assert_eq!(described["registries"][1]["entity"], "hosts");
    assert_eq!(described["registries"][0]["fields"]["port"], "number");
}

#[test]
fn request_files_are_decoded() -> anyhow::Result<()> {
    let path = request_file(
        "decode",
        &json!({"search": [{"parameter": "port", "operator": "eq", "value": 22}]}),
    )?;
    let request = read_request(path.to_str().unwrap_or_default())?;
    std::fs::remove_file(&path).ok();
    assert_eq!(request.filters.len(), 1);

    assert!(read_request("/nonexistent/request.json").is_err());
    Ok(())
}

#[test]
fn dashboard_scan_start_filters_compare_epoch_seconds() -> anyhow::Result<()> {
    let catalog = SchemaCatalog::new();
    let compiled = compile_request(
        &catalog,
        Entity::Dashboard,
        &params(json!({
            "search": [{"parameter": "scan_start", "operator": "gt", "value": 1714564800}],
            "sort": [{"parameter": "scan_start", "direction": "desc"}]
        })),
    )?;

    let sql = compiled["search"].as_str().unwrap_or_default();
    assert!(sql.contains("CAST(EXTRACT(EPOCH FROM scan_start) AS BIGINT) AS scan_start"));
    assert!(sql.contains("WHERE \"scan_start\" > $1 ORDER BY \"scan_start\" DESC"));
    assert_eq!(compiled["binds"], json!([1714564800.0]));
    Ok(())
}
