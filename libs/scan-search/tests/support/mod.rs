use async_trait::async_trait;
use serde_json::{json, Value};
use shiryoku_search::model::{FilterValue, ScalarOperator, SortDirection, VectorOperator};
use shiryoku_search::validate::{Condition, ResolvedFilter, ValidatedSearch};
use shiryoku_search::{Error, FieldRegistry, Pagination, Result, SearchRepository};
use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::Arc;

/// In-memory repository over JSON rows keyed by public field names.
/// Counts every call so tests can assert nothing reached the datastore.
pub struct MemoryRepository {
    rows: Vec<Value>,
    fail_with: Option<String>,
    pub compiles: AtomicUsize,
    pub counts: AtomicUsize,
    pub fetches: AtomicUsize,
}

impl MemoryRepository {
    pub fn new(rows: Vec<Value>) -> Self {
        Self {
            rows,
            fail_with: None,
            compiles: AtomicUsize::new(0),
            counts: AtomicUsize::new(0),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Every count/fetch fails with a backend error.
    pub fn failing(message: &str) -> Self {
        Self {
            fail_with: Some(message.to_string()),
            ..Self::new(Vec::new())
        }
    }

    pub fn calls(&self) -> (usize, usize, usize) {
        (
            self.compiles.load(AtomicOrdering::SeqCst),
            self.counts.load(AtomicOrdering::SeqCst),
            self.fetches.load(AtomicOrdering::SeqCst),
        )
    }

    fn matching(&self, query: &ValidatedSearch) -> Vec<Value> {
        let mut rows: Vec<Value> = self
            .rows
            .iter()
            .filter(|row| query.filters.iter().all(|f| matches_filter(row, f)))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            for sort in &query.sort {
                let ord = compare(&a[&sort.field.name], &b[&sort.field.name]);
                let ord = match sort.direction {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
        rows
    }

    fn check_failure(&self) -> Result<()> {
        match &self.fail_with {
            Some(message) => Err(Error::backend(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl SearchRepository for MemoryRepository {
    type Item = Value;
    type Query = ValidatedSearch;

    fn compile(&self, search: &ValidatedSearch) -> Result<ValidatedSearch> {
        self.compiles.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(search.clone())
    }

    async fn count(&self, query: &ValidatedSearch) -> Result<u64> {
        self.counts.fetch_add(1, AtomicOrdering::SeqCst);
        self.check_failure()?;
        Ok(self.matching(query).len() as u64)
    }

    async fn fetch(&self, query: &ValidatedSearch, pagination: &Pagination) -> Result<Vec<Value>> {
        self.fetches.fetch_add(1, AtomicOrdering::SeqCst);
        self.check_failure()?;
        Ok(self
            .matching(query)
            .into_iter()
            .skip(pagination.offset() as usize)
            .take(pagination.limit() as usize)
            .collect())
    }
}

fn matches_filter(row: &Value, filter: &ResolvedFilter) -> bool {
    let actual = &row[&filter.field.name];
    match &filter.condition {
        Condition::Scalar { operator, value } if value.is_null() => match operator {
            ScalarOperator::Eq => actual.is_null(),
            ScalarOperator::Neq => !actual.is_null(),
            _ => true,
        },
        Condition::Scalar { operator, value } => {
            let expected = value.to_json();
            match operator {
                ScalarOperator::Eq => *actual == expected,
                ScalarOperator::Neq => *actual != expected,
                ScalarOperator::Gt => compare(actual, &expected) == Ordering::Greater,
                ScalarOperator::Lt => compare(actual, &expected) == Ordering::Less,
                ScalarOperator::Like => contains(actual, value),
                ScalarOperator::NotLike => !contains(actual, value),
                ScalarOperator::Regex => matches_pattern(actual, value),
            }
        }
        Condition::Vector { operator, values } => {
            let found = values.iter().any(|v| *actual == v.to_json());
            match operator {
                VectorOperator::In => found,
                VectorOperator::NotIn => !found,
            }
        }
    }
}

fn contains(actual: &Value, needle: &FilterValue) -> bool {
    match (actual.as_str(), needle.as_text()) {
        (Some(a), Some(n)) => a.to_lowercase().contains(&n.to_lowercase()),
        _ => false,
    }
}

fn matches_pattern(actual: &Value, pattern: &FilterValue) -> bool {
    let compiled = pattern.as_text().and_then(|p| regex::Regex::new(p).ok());
    match (actual.as_str(), compiled) {
        (Some(a), Some(re)) => re.is_match(a),
        _ => false,
    }
}

fn compare(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(Ordering::Equal),
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => Ordering::Equal,
    }
}

pub fn ports_registry() -> Arc<FieldRegistry> {
    Arc::new(
        FieldRegistry::builder("ports")
            .string("host")
            .number("port")
            .string("status")
            .string("service_name")
            .build(),
    )
}

pub fn port_rows() -> Vec<Value> {
    vec![
        json!({"host": "10.0.0.1", "port": 443, "status": "open", "service_name": "https"}),
        json!({"host": "10.0.0.2", "port": 443, "status": "open", "service_name": "https"}),
        json!({"host": "10.0.0.3", "port": 443, "status": "filtered", "service_name": null}),
        json!({"host": "10.0.0.1", "port": 22, "status": "open", "service_name": "ssh"}),
        json!({"host": "10.0.0.4", "port": 80, "status": "closed", "service_name": "http"}),
    ]
}
