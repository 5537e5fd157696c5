//! Wire decoding for search requests.
//!
//! Request body:
//!
//! ```json
//! {
//!   "parameters": ["host", "port"],
//!   "search": [
//!     {"parameter": "status", "operator": "eq", "value": "open"},
//!     {"parameter": "port", "operator": "in", "values": [80, 443]}
//!   ],
//!   "sort": [{"parameter": "host", "direction": "asc"}],
//!   "distinct": false,
//!   "page": 1,
//!   "per_page": 50
//! }
//! ```
//!
//! A search entry is classified by its `operator` alone; only then is the rest
//! of the entry read as a scalar (`value`) or vector (`values`) filter.

use crate::error::{Error, Result};
use crate::model::{
    Filter, FilterValue, Operator, ScalarFilter, SearchParameters, SortDirection, SortSpec,
    VectorFilter,
};
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue};

#[derive(Debug, Deserialize)]
struct RawSearchRequest {
    #[serde(default)]
    parameters: Option<Vec<String>>,
    #[serde(default)]
    search: Option<Vec<JsonValue>>,
    #[serde(default)]
    sort: Option<Vec<RawSort>>,
    #[serde(default)]
    distinct: bool,
    #[serde(default)]
    page: u64,
    #[serde(default)]
    per_page: u64,
}

#[derive(Debug, Deserialize)]
struct RawSort {
    parameter: String,
    #[serde(default)]
    direction: Option<String>,
}

impl SearchParameters {
    /// Decode a request body.
    pub fn from_json(body: &[u8]) -> Result<Self> {
        let raw: RawSearchRequest = serde_json::from_slice(body)?;
        Self::from_raw(raw)
    }

    /// Decode an already-parsed request document.
    pub fn from_value(value: JsonValue) -> Result<Self> {
        let raw: RawSearchRequest = serde_json::from_value(value)?;
        Self::from_raw(raw)
    }

    fn from_raw(raw: RawSearchRequest) -> Result<Self> {
        let filters = raw
            .search
            .unwrap_or_default()
            .iter()
            .map(Filter::from_value)
            .collect::<Result<Vec<_>>>()?;

        let sort = raw
            .sort
            .unwrap_or_default()
            .into_iter()
            .map(|s| {
                let direction = match s.direction.as_deref() {
                    None | Some("") => SortDirection::Asc,
                    Some(d) => SortDirection::parse(d).ok_or_else(|| {
                        Error::MalformedInput(format!("invalid sort direction: {}", d))
                    })?,
                };
                Ok(SortSpec {
                    field: s.parameter,
                    direction,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            projection: raw.parameters.unwrap_or_default(),
            filters,
            sort,
            distinct: raw.distinct,
            page: raw.page,
            per_page: raw.per_page,
        })
    }
}

impl<'de> Deserialize<'de> for SearchParameters {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = RawSearchRequest::deserialize(deserializer)?;
        Self::from_raw(raw).map_err(serde::de::Error::custom)
    }
}

impl Filter {
    /// Decode one search entry: operator first, then the matching shape.
    pub fn from_value(value: &JsonValue) -> Result<Self> {
        let JsonValue::Object(entry) = value else {
            return Err(Error::MalformedInput(
                "search entry must be an object".to_string(),
            ));
        };

        let token = required_str(entry, "operator")?;
        let Some(operator) = Operator::parse(token) else {
            return Err(Error::UnknownOperator(token.to_string()));
        };
        let field = required_str(entry, "parameter")?.to_string();

        match operator {
            Operator::Scalar(operator) => {
                let value = entry.get("value").ok_or_else(|| {
                    Error::MalformedInput(format!(
                        "missing field `value` for operator '{}'",
                        token
                    ))
                })?;
                Ok(Filter::Scalar(ScalarFilter {
                    field,
                    operator,
                    value: FilterValue::from_json(value)?,
                }))
            }
            Operator::Vector(operator) => {
                let values = entry.get("values").ok_or_else(|| {
                    Error::MalformedInput(format!(
                        "missing field `values` for operator '{}'",
                        token
                    ))
                })?;
                Ok(Filter::Vector(VectorFilter {
                    field,
                    operator,
                    values: FilterValue::from_json(values)?,
                }))
            }
        }
    }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = JsonValue::deserialize(deserializer)?;
        Filter::from_value(&value).map_err(serde::de::Error::custom)
    }
}

fn required_str<'a>(entry: &'a Map<String, JsonValue>, key: &str) -> Result<&'a str> {
    match entry.get(key) {
        Some(JsonValue::String(s)) if !s.is_empty() => Ok(s),
        Some(JsonValue::String(_)) | None => {
            Err(Error::MalformedInput(format!("missing field `{}`", key)))
        }
        Some(_) => Err(Error::MalformedInput(format!(
            "field `{}` must be a string",
            key
        ))),
    }
}
