//! Search parameter validation
//!
//! Resolves every field reference (projection, filters, sort) against the
//! supplied registries and checks value kinds. The output carries the
//! resolved [`FieldDescriptor`]s, so compilers only ever see whitelisted
//! backend names and type-checked values.

use crate::error::{Error, Result};
use crate::model::{
    Filter, FilterValue, ScalarOperator, SearchParameters, SortDirection, VectorOperator,
};
use crate::pagination::Pagination;
use crate::schema::{resolve_field, FieldDescriptor, FieldRegistry, ValueKind};

/// Filter condition after validation.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// `value` is a scalar or `Null`, never a sequence.
    Scalar {
        operator: ScalarOperator,
        value: FilterValue,
    },
    /// `values` holds non-null scalars of the field's kind; nulls in the
    /// request list are dropped.
    Vector {
        operator: VectorOperator,
        values: Vec<FilterValue>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedFilter {
    pub field: FieldDescriptor,
    pub condition: Condition,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedSort {
    pub field: FieldDescriptor,
    pub direction: SortDirection,
}

/// A search request that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedSearch {
    pub projection: Vec<FieldDescriptor>,
    pub filters: Vec<ResolvedFilter>,
    pub sort: Vec<ResolvedSort>,
    pub distinct: bool,
    pub pagination: Pagination,
}

/// Validate `params` against `registries`, searched in order.
pub fn validate(
    params: &SearchParameters,
    registries: &[&FieldRegistry],
) -> Result<ValidatedSearch> {
    let lookup = |name: &str| {
        resolve_field(registries, name)
            .cloned()
            .ok_or_else(|| Error::InvalidField(name.to_string()))
    };

    let projection = params
        .projection
        .iter()
        .map(|name| lookup(name))
        .collect::<Result<Vec<_>>>()?;

    let mut filters = Vec::with_capacity(params.filters.len());
    for filter in &params.filters {
        let field = lookup(filter.field())?;
        let condition = match filter {
            Filter::Scalar(f) => {
                check_kind(&field, &f.value)?;
                check_operator(&field, f.operator)?;
                Condition::Scalar {
                    operator: f.operator,
                    value: f.value.clone(),
                }
            }
            Filter::Vector(f) => {
                let FilterValue::Sequence(items) = &f.values else {
                    return Err(Error::NotAnArray(field.name.clone()));
                };
                for item in items {
                    check_kind(&field, item)?;
                }
                Condition::Vector {
                    operator: f.operator,
                    values: items.iter().filter(|v| !v.is_null()).cloned().collect(),
                }
            }
        };
        filters.push(ResolvedFilter { field, condition });
    }

    let sort = params
        .sort
        .iter()
        .map(|s| {
            Ok(ResolvedSort {
                field: lookup(&s.field)?,
                direction: s.direction,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(ValidatedSearch {
        projection,
        filters,
        sort,
        distinct: params.distinct,
        pagination: params.pagination(),
    })
}

fn check_kind(field: &FieldDescriptor, value: &FilterValue) -> Result<()> {
    if field.kind.accepts(value) {
        Ok(())
    } else {
        Err(Error::TypeMismatch {
            field: field.name.clone(),
            expected: field.kind,
        })
    }
}

/// Pattern operators need text; ordering needs an ordered kind. Both backends
/// reject the same combinations this way.
fn check_operator(field: &FieldDescriptor, operator: ScalarOperator) -> Result<()> {
    let supported = match operator {
        ScalarOperator::Eq | ScalarOperator::Neq => true,
        ScalarOperator::Gt | ScalarOperator::Lt => field.kind != ValueKind::Bool,
        ScalarOperator::Like | ScalarOperator::NotLike | ScalarOperator::Regex => {
            field.kind == ValueKind::String
        }
    };
    if supported {
        Ok(())
    } else {
        Err(Error::UnsupportedOperator {
            field: field.name.clone(),
            operator: operator.as_str().to_string(),
            kind: field.kind,
        })
    }
}
