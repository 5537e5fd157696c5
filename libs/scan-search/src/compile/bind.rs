use crate::error::{Error, Result};
use crate::model::FilterValue;
use crate::schema::{FieldDescriptor, ValueKind};
use serde::Serialize;

/// Bind values for `sqlx` queries, in placeholder order (`$1` is index 0).
/// Serializes as the bare value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum BindValue {
    Text(String),
    Float(f64),
    Bool(bool),
    TextArray(Vec<String>),
    FloatArray(Vec<f64>),
    BoolArray(Vec<bool>),
}

pub(super) fn push_bind(bind_params: &mut Vec<BindValue>, value: BindValue) -> usize {
    bind_params.push(value);
    bind_params.len()
}

pub(super) fn push_text(bind_params: &mut Vec<BindValue>, value: String) -> usize {
    push_bind(bind_params, BindValue::Text(value))
}

/// Bind one non-null scalar.
pub(super) fn push_scalar(
    bind_params: &mut Vec<BindValue>,
    field: &FieldDescriptor,
    value: &FilterValue,
) -> Result<usize> {
    let bind = match value {
        FilterValue::String(s) => BindValue::Text(s.clone()),
        FilterValue::Number(n) => BindValue::Float(*n),
        FilterValue::Bool(b) => BindValue::Bool(*b),
        FilterValue::Null | FilterValue::Sequence(_) => return Err(mismatch(field)),
    };
    Ok(push_bind(bind_params, bind))
}

/// Bind a whole value list as one typed array parameter.
pub(super) fn push_array(
    bind_params: &mut Vec<BindValue>,
    field: &FieldDescriptor,
    values: &[FilterValue],
) -> Result<usize> {
    let bind = match field.kind {
        ValueKind::String => BindValue::TextArray(
            values
                .iter()
                .map(|v| v.as_text().map(str::to_string).ok_or_else(|| mismatch(field)))
                .collect::<Result<_>>()?,
        ),
        ValueKind::Number => BindValue::FloatArray(
            values
                .iter()
                .map(|v| match v {
                    FilterValue::Number(n) => Ok(*n),
                    _ => Err(mismatch(field)),
                })
                .collect::<Result<_>>()?,
        ),
        ValueKind::Bool => BindValue::BoolArray(
            values
                .iter()
                .map(|v| match v {
                    FilterValue::Bool(b) => Ok(*b),
                    _ => Err(mismatch(field)),
                })
                .collect::<Result<_>>()?,
        ),
    };
    Ok(push_bind(bind_params, bind))
}

fn mismatch(field: &FieldDescriptor) -> Error {
    Error::TypeMismatch {
        field: field.name.clone(),
        expected: field.kind,
    }
}
