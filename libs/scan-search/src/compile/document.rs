//! Document-store compiler (OpenSearch query DSL).
//!
//! Filters become a `bool` query of `must` / `must_not` clauses. Exact-match
//! clauses and sorting on string fields target the `.keyword` sub-field;
//! numeric and boolean fields, ranges and pattern queries use the raw
//! attribute.

use super::check_pattern;
use crate::error::{Error, Result};
use crate::model::{FilterValue, ScalarOperator, VectorOperator};
use crate::pagination::Pagination;
use crate::schema::{FieldDescriptor, ValueKind};
use crate::validate::{Condition, ResolvedFilter, ValidatedSearch};
use serde_json::{json, Map, Value as JsonValue};
use std::collections::HashSet;

pub const KEYWORD_SUFFIX: &str = ".keyword";

#[derive(Debug, Clone, PartialEq)]
pub struct DocumentQuery {
    pub must: Vec<JsonValue>,
    pub must_not: Vec<JsonValue>,
    pub sort: Vec<JsonValue>,
    /// `_source` includes; empty returns whole documents.
    pub source: Vec<String>,
    /// Rows are de-duplicated after the page is fetched.
    pub distinct: bool,
}

pub fn compile(search: &ValidatedSearch) -> Result<DocumentQuery> {
    let mut query = DocumentQuery {
        must: Vec::new(),
        must_not: Vec::new(),
        sort: search
            .sort
            .iter()
            .map(|s| json!({ exact_field(&s.field): { "order": s.direction.as_str() } }))
            .collect(),
        source: search
            .projection
            .iter()
            .map(|f| f.attribute.clone())
            .collect(),
        distinct: search.distinct,
    };
    for filter in &search.filters {
        push_filter(&mut query, filter)?;
    }
    Ok(query)
}

impl DocumentQuery {
    /// The `query` object. No clauses at all means `match_all`.
    pub fn query(&self) -> JsonValue {
        if self.must.is_empty() && self.must_not.is_empty() {
            return json!({ "match_all": {} });
        }
        let mut bool_query = Map::new();
        if !self.must.is_empty() {
            bool_query.insert("must".to_string(), JsonValue::Array(self.must.clone()));
        }
        if !self.must_not.is_empty() {
            bool_query.insert(
                "must_not".to_string(),
                JsonValue::Array(self.must_not.clone()),
            );
        }
        json!({ "bool": bool_query })
    }

    /// Body for `_count`.
    pub fn count_body(&self) -> JsonValue {
        json!({ "query": self.query() })
    }

    /// Body for `_search`, windowed to one page.
    pub fn search_body(&self, pagination: &Pagination) -> JsonValue {
        let mut body = json!({
            "query": self.query(),
            "from": pagination.offset(),
            "size": pagination.limit(),
        });
        if !self.sort.is_empty() {
            body["sort"] = JsonValue::Array(self.sort.clone());
        }
        if !self.source.is_empty() {
            body["_source"] = json!(self.source);
        }
        body
    }
}

/// Keep the first occurrence of every row, compared by canonical content
/// (object key order ignored).
pub fn deduplicate(rows: Vec<JsonValue>) -> Vec<JsonValue> {
    let mut seen = HashSet::with_capacity(rows.len());
    rows.into_iter()
        .filter(|row| seen.insert(canonical(row)))
        .collect()
}

fn canonical(value: &JsonValue) -> String {
    match value {
        JsonValue::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort();
            let entries: Vec<String> = keys
                .into_iter()
                .map(|k| format!("{}:{}", JsonValue::String(k.clone()), canonical(&map[k])))
                .collect();
            format!("{{{}}}", entries.join(","))
        }
        JsonValue::Array(items) => {
            let items: Vec<String> = items.iter().map(canonical).collect();
            format!("[{}]", items.join(","))
        }
        other => other.to_string(),
    }
}

fn exact_field(field: &FieldDescriptor) -> String {
    match field.kind {
        ValueKind::String => format!("{}{}", field.attribute, KEYWORD_SUFFIX),
        ValueKind::Number | ValueKind::Bool => field.attribute.clone(),
    }
}

fn push_filter(query: &mut DocumentQuery, filter: &ResolvedFilter) -> Result<()> {
    let field = &filter.field;
    let attr = field.attribute.as_str();

    match &filter.condition {
        Condition::Scalar { operator, value } if value.is_null() => match operator {
            ScalarOperator::Eq => query.must_not.push(json!({ "exists": { "field": attr } })),
            ScalarOperator::Neq => query.must.push(json!({ "exists": { "field": attr } })),
            _ => {}
        },
        Condition::Scalar { operator, value } => match operator {
            ScalarOperator::Eq => query.must.push(term(field, value)),
            ScalarOperator::Neq => query.must_not.push(term(field, value)),
            ScalarOperator::Gt => query
                .must
                .push(json!({ "range": { attr: { "gt": value.to_json() } } })),
            ScalarOperator::Lt => query
                .must
                .push(json!({ "range": { attr: { "lt": value.to_json() } } })),
            ScalarOperator::Like => query.must.push(wildcard(field, value)?),
            ScalarOperator::NotLike => query.must_not.push(wildcard(field, value)?),
            ScalarOperator::Regex => {
                let pattern = text_operand(field, value)?;
                check_pattern(field, pattern)?;
                query
                    .must
                    .push(json!({ "regexp": { attr: { "value": pattern } } }));
            }
        },
        Condition::Vector { operator, values } => {
            let values: Vec<JsonValue> = values.iter().map(FilterValue::to_json).collect();
            let clause = json!({ "terms": { exact_field(field): values } });
            match operator {
                VectorOperator::In => query.must.push(clause),
                VectorOperator::NotIn => query.must_not.push(clause),
            }
        }
    }
    Ok(())
}

fn term(field: &FieldDescriptor, value: &FilterValue) -> JsonValue {
    json!({ "term": { exact_field(field): value.to_json() } })
}

fn wildcard(field: &FieldDescriptor, value: &FilterValue) -> Result<JsonValue> {
    let text = text_operand(field, value)?;
    Ok(json!({ "wildcard": { field.attribute.as_str(): { "value": format!("*{}*", text) } } }))
}

fn text_operand<'a>(field: &FieldDescriptor, value: &'a FilterValue) -> Result<&'a str> {
    value.as_text().ok_or_else(|| Error::TypeMismatch {
        field: field.name.clone(),
        expected: field.kind,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::SearchParameters;
    use crate::schema::FieldRegistry;
    use crate::validate::validate;

    fn nmap() -> FieldRegistry {
        FieldRegistry::builder("nmap-scans")
            .string("host")
            .number("port")
            .string("port_state")
            .string("service_name")
            .bool("up")
            .build()
    }

    fn compile_json(body: JsonValue) -> Result<DocumentQuery> {
        let registry = nmap();
        let params = SearchParameters::from_value(body)?;
        compile(&validate(&params, &[&registry])?)
    }

    #[test]
    fn no_filters_match_all() {
        let query = compile_json(json!({})).unwrap();
        assert_eq!(query.query(), json!({"match_all": {}}));
        assert_eq!(
            query.search_body(&Pagination::default()),
            json!({"query": {"match_all": {}}, "from": 0, "size": 100})
        );
    }

    #[test]
    fn terms_use_keyword_only_for_strings() {
        let query = compile_json(json!({
            "search": [
                {"parameter": "port", "operator": "in", "values": [80, 443]},
                {"parameter": "host", "operator": "in", "values": ["10.0.0.1"]}
            ]
        }))
        .unwrap();
        assert_eq!(
            query.must,
            vec![
                json!({"terms": {"port": [80, 443]}}),
                json!({"terms": {"host.keyword": ["10.0.0.1"]}}),
            ]
        );
    }

    #[test]
    fn negated_operators_go_to_must_not() {
        let query = compile_json(json!({
            "search": [
                {"parameter": "port_state", "operator": "neq", "value": "closed"},
                {"parameter": "service_name", "operator": "not like", "value": "http"},
                {"parameter": "port", "operator": "not in", "values": [22]}
            ]
        }))
        .unwrap();
        assert!(query.must.is_empty());
        assert_eq!(
            query.query(),
            json!({"bool": {"must_not": [
                {"term": {"port_state.keyword": "closed"}},
                {"wildcard": {"service_name": {"value": "*http*"}}},
                {"terms": {"port": [22]}}
            ]}})
        );
    }

    #[test]
    fn ranges_regex_and_bools() {
        let query = compile_json(json!({
            "search": [
                {"parameter": "port", "operator": "gt", "value": 1024},
                {"parameter": "port", "operator": "lt", "value": 65535.5},
                {"parameter": "host", "operator": "regex", "value": "10\\.0\\..*"},
                {"parameter": "up", "operator": "eq", "value": true}
            ]
        }))
        .unwrap();
        assert_eq!(
            query.must,
            vec![
                json!({"range": {"port": {"gt": 1024}}}),
                json!({"range": {"port": {"lt": 65535.5}}}),
                json!({"regexp": {"host": {"value": "10\\.0\\..*"}}}),
                json!({"term": {"up": true}}),
            ]
        );
    }

    #[test]
    fn invalid_regex_is_rejected() {
        let err = compile_json(json!({
            "search": [{"parameter": "host", "operator": "regex", "value": "[a-"}]
        }))
        .unwrap_err();
        assert!(matches!(err, Error::InvalidPattern { .. }));
    }

    #[test]
    fn null_operands_become_exists_clauses() {
        let query = compile_json(json!({
            "search": [
                {"parameter": "service_name", "operator": "eq", "value": null},
                {"parameter": "host", "operator": "neq", "value": null},
                {"parameter": "port", "operator": "lt", "value": null}
            ]
        }))
        .unwrap();
        assert_eq!(query.must, vec![json!({"exists": {"field": "host"}})]);
        assert_eq!(
            query.must_not,
            vec![json!({"exists": {"field": "service_name"}})]
        );
    }

    #[test]
    fn paging_sort_and_projection() {
        let query = compile_json(json!({
            "parameters": ["host", "port"],
            "sort": [{"parameter": "host", "direction": "desc"}, {"parameter": "port"}],
            "page": 3,
            "per_page": 25
        }))
        .unwrap();
        let body = query.search_body(&Pagination::normalize(3, 25));
        assert_eq!(body["from"], json!(50));
        assert_eq!(body["size"], json!(25));
        assert_eq!(
            body["sort"],
            json!([{"host.keyword": {"order": "desc"}}, {"port": {"order": "asc"}}])
        );
        assert_eq!(body["_source"], json!(["host", "port"]));
        assert_eq!(query.count_body(), json!({"query": {"match_all": {}}}));
    }

    #[test]
    fn deduplicate_keeps_first_occurrence_ignoring_key_order() {
        let rows = vec![
            json!({"host": "a", "port": 80}),
            json!({"port": 80, "host": "a"}),
            json!({"host": "b", "port": 80}),
            json!({"host": "a", "port": 80}),
        ];
        assert_eq!(
            deduplicate(rows),
            vec![json!({"host": "a", "port": 80}), json!({"host": "b", "port": 80})]
        );
    }

    #[test]
    fn compilation_is_deterministic() {
        let body = json!({
            "parameters": ["host", "port"],
            "search": [
                {"parameter": "port", "operator": "in", "values": [22, 80]},
                {"parameter": "host", "operator": "like", "value": "10.0"},
                {"parameter": "port_state", "operator": "neq", "value": "closed"}
            ],
            "sort": [{"parameter": "port", "direction": "desc"}],
            "page": 2
        });
        let a = compile_json(body.clone()).unwrap();
        let b = compile_json(body).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            a.search_body(&Pagination::normalize(2, 0)),
            b.search_body(&Pagination::normalize(2, 0))
        );
    }

    #[test]
    fn pattern_operators_require_text_operands() {
        let registry = nmap();
        let mut search = validate(
            &SearchParameters::from_value(json!({
                "search": [{"parameter": "host", "operator": "like", "value": "10.0"}]
            }))
            .unwrap(),
            &[&registry],
        )
        .unwrap();
        for operator in [ScalarOperator::Like, ScalarOperator::Regex] {
            search.filters[0].condition = Condition::Scalar {
                operator,
                value: FilterValue::Number(10.0),
            };
            assert!(matches!(
                compile(&search).unwrap_err(),
                Error::TypeMismatch { ref field, .. } if field == "host"
            ));
        }
    }
}
