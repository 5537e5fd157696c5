//! Search request model
//!
//! One request's search intent, as decoded from the wire:
//! - `projection`: fields to return (empty = all)
//! - `filters`: conjunctive conditions, each either a scalar comparison or a
//!   membership test
//! - `sort`: ordered (field, direction) pairs
//! - `distinct`, `page`, `per_page`
//!
//! Values are raw here; they are checked against a field registry by
//! [`crate::validate`] before any compiler sees them.

use crate::error::{Error, Result};
use crate::pagination::Pagination;
use serde_json::Value as JsonValue;

/// A single filter value.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterValue {
    Null,
    String(String),
    Number(f64),
    Bool(bool),
    Sequence(Vec<FilterValue>),
}

impl FilterValue {
    /// Convert a decoded JSON value. Objects are not valid filter values.
    pub fn from_json(value: &JsonValue) -> Result<Self> {
        match value {
            JsonValue::Null => Ok(Self::Null),
            JsonValue::Bool(b) => Ok(Self::Bool(*b)),
            JsonValue::String(s) => Ok(Self::String(s.clone())),
            JsonValue::Number(n) => n.as_f64().map(Self::Number).ok_or_else(|| {
                Error::MalformedInput(format!("number out of range: {}", n))
            }),
            JsonValue::Array(items) => items
                .iter()
                .map(Self::from_json)
                .collect::<Result<Vec<_>>>()
                .map(Self::Sequence),
            JsonValue::Object(_) => Err(Error::MalformedInput(
                "filter values must be scalars or arrays of scalars".to_string(),
            )),
        }
    }

    /// JSON form used by the document compiler. Whole numbers are emitted as
    /// integers so they match integer-mapped fields exactly.
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::String(s) => JsonValue::String(s.clone()),
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Number(n) => {
                if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                    JsonValue::from(*n as i64)
                } else {
                    serde_json::Number::from_f64(*n)
                        .map(JsonValue::Number)
                        .unwrap_or(JsonValue::Null)
                }
            }
            Self::Sequence(items) => JsonValue::Array(items.iter().map(Self::to_json).collect()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Textual form for pattern operators.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }
}

/// Operators comparing a field with one value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarOperator {
    Eq,
    Neq,
    Gt,
    Lt,
    Like,
    NotLike,
    Regex,
}

impl ScalarOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "eq",
            Self::Neq => "neq",
            Self::Gt => "gt",
            Self::Lt => "lt",
            Self::Like => "like",
            Self::NotLike => "not like",
            Self::Regex => "regex",
        }
    }
}

/// Operators testing membership of a field's value in a list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorOperator {
    In,
    NotIn,
}

impl VectorOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::In => "in",
            Self::NotIn => "not in",
        }
    }
}

/// Any recognized operator token. The variant decides the filter shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Scalar(ScalarOperator),
    Vector(VectorOperator),
}

impl Operator {
    pub fn parse(token: &str) -> Option<Self> {
        let op = match token {
            "eq" => Self::Scalar(ScalarOperator::Eq),
            "neq" => Self::Scalar(ScalarOperator::Neq),
            "gt" => Self::Scalar(ScalarOperator::Gt),
            "lt" => Self::Scalar(ScalarOperator::Lt),
            "like" => Self::Scalar(ScalarOperator::Like),
            "not like" | "notLike" => Self::Scalar(ScalarOperator::NotLike),
            "regex" => Self::Scalar(ScalarOperator::Regex),
            "in" => Self::Vector(VectorOperator::In),
            "not in" | "notIn" => Self::Vector(VectorOperator::NotIn),
            _ => return None,
        };
        Some(op)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Scalar(op) => op.as_str(),
            Self::Vector(op) => op.as_str(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScalarFilter {
    pub field: String,
    pub operator: ScalarOperator,
    pub value: FilterValue,
}

/// `values` is kept as decoded; a bare scalar here is rejected by the
/// validator, not the decoder.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorFilter {
    pub field: String,
    pub operator: VectorOperator,
    pub values: FilterValue,
}

/// One filter condition. Exactly one shape, decided by the operator.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Scalar(ScalarFilter),
    Vector(VectorFilter),
}

impl Filter {
    pub fn field(&self) -> &str {
        match self {
            Self::Scalar(f) => &f.field,
            Self::Vector(f) => &f.field,
        }
    }

    pub fn operator(&self) -> Operator {
        match self {
            Self::Scalar(f) => Operator::Scalar(f.operator),
            Self::Vector(f) => Operator::Vector(f.operator),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Case-insensitive; anything but `asc`/`desc` is rejected.
    pub fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }

    /// SQL keyword. Only ever one of the two literals.
    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SortSpec {
    pub field: String,
    pub direction: SortDirection,
}

/// Parsed search request.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchParameters {
    /// Fields to return per row, in request order (empty = all fields).
    pub projection: Vec<String>,
    /// All filters must match (AND).
    pub filters: Vec<Filter>,
    /// Primary sort first.
    pub sort: Vec<SortSpec>,
    pub distinct: bool,
    /// 1-based; 0 means "not set".
    pub page: u64,
    /// 0 means "not set".
    pub per_page: u64,
}

impl SearchParameters {
    pub fn pagination(&self) -> Pagination {
        Pagination::normalize(self.page, self.per_page)
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_sort(mut self, field: &str, direction: SortDirection) -> Self {
        self.sort.push(SortSpec {
            field: field.to_string(),
            direction,
        });
        self
    }

    pub fn with_page(mut self, page: u64, per_page: u64) -> Self {
        self.page = page;
        self.per_page = per_page;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operator_tokens_round_trip_through_parse() {
        for token in [
            "eq", "neq", "gt", "lt", "like", "not like", "regex", "in", "not in",
        ] {
            let op = Operator::parse(token).expect(token);
            assert_eq!(op.as_str(), token);
        }
        assert_eq!(
            Operator::parse("notIn"),
            Some(Operator::Vector(VectorOperator::NotIn))
        );
        assert_eq!(Operator::parse("between"), None);
        assert_eq!(Operator::parse("EQ"), None);
    }

    #[test]
    fn sort_direction_is_case_insensitive_and_closed() {
        assert_eq!(SortDirection::parse("DESC"), Some(SortDirection::Desc));
        assert_eq!(SortDirection::parse("asc"), Some(SortDirection::Asc));
        assert_eq!(SortDirection::parse("asc; DROP TABLE hosts"), None);
    }

    #[test]
    fn filter_value_rejects_objects_and_keeps_sequences_in_order() {
        assert!(FilterValue::from_json(&json!({"a": 1})).is_err());
        assert_eq!(
            FilterValue::from_json(&json!([443, "x", null])).unwrap(),
            FilterValue::Sequence(vec![
                FilterValue::Number(443.0),
                FilterValue::String("x".into()),
                FilterValue::Null,
            ])
        );
    }

    #[test]
    fn whole_numbers_serialize_as_integers() {
        assert_eq!(FilterValue::Number(443.0).to_json(), json!(443));
        assert_eq!(FilterValue::Number(0.5).to_json(), json!(0.5));
    }
}
