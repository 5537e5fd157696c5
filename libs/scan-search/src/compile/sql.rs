//! Relational compiler.
//!
//! Every column reference comes from a [`FieldDescriptor`] and is quoted;
//! every value is a `$n` placeholder with its [`BindValue`] at index `n - 1`.
//! The only literals spliced into the statement are operator keywords and
//! `ASC` / `DESC`.

use super::bind::{push_array, push_scalar, push_text, BindValue};
use super::check_pattern;
use super::escape::{escape_like_pattern, quote_ident};
use crate::error::{Error, Result};
use crate::model::{FilterValue, ScalarOperator, VectorOperator};
use crate::pagination::Pagination;
use crate::schema::FieldDescriptor;
use crate::validate::{Condition, ResolvedFilter, ValidatedSearch};

/// Compiled relational query: predicates, ordering, select list and binds.
#[derive(Debug, Clone, PartialEq)]
pub struct SqlQuery {
    predicates: Vec<String>,
    order_by: Vec<String>,
    columns: Vec<String>,
    distinct: bool,
    binds: Vec<BindValue>,
}

/// Compile a validated search. Deterministic: the same input always yields
/// the same SQL text and bind list.
pub fn compile(search: &ValidatedSearch) -> Result<SqlQuery> {
    let mut binds = Vec::new();
    let mut predicates = Vec::with_capacity(search.filters.len());
    for filter in &search.filters {
        if let Some(clause) = build_filter_clause(filter, &mut binds)? {
            predicates.push(clause);
        }
    }

    if search.distinct && !search.projection.is_empty() {
        // SELECT DISTINCT requires ORDER BY expressions in the select list.
        if let Some(sort) = search
            .sort
            .iter()
            .find(|s| !search.projection.iter().any(|p| p.name == s.field.name))
        {
            return Err(Error::InvalidSort(format!(
                "{} must be projected to sort a distinct search",
                sort.field.name
            )));
        }
    }

    let order_by = search
        .sort
        .iter()
        .map(|s| format!("{} {}", quote_ident(&s.field.column), s.direction.as_sql()))
        .collect();

    let columns = search
        .projection
        .iter()
        .map(|f| format!("{} AS {}", quote_ident(&f.column), quote_ident(&f.name)))
        .collect();

    Ok(SqlQuery {
        predicates,
        order_by,
        columns,
        distinct: search.distinct,
        binds,
    })
}

impl SqlQuery {
    /// Conjunctive predicates, one per effective filter.
    pub fn predicates(&self) -> &[String] {
        &self.predicates
    }

    /// `col ASC|DESC` entries, primary first.
    pub fn order_by(&self) -> &[String] {
        &self.order_by
    }

    pub fn binds(&self) -> &[BindValue] {
        &self.binds
    }

    pub fn is_distinct(&self) -> bool {
        self.distinct
    }

    /// ` WHERE a AND b`, or empty when nothing filters.
    pub fn where_clause(&self) -> String {
        if self.predicates.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.predicates.join(" AND "))
        }
    }

    /// Page query. Each row comes back as one JSON object keyed by public
    /// field names (or column names when nothing is projected).
    ///
    /// `source` is a trusted table expression supplied by the application,
    /// e.g. `scan_results sr JOIN hosts h USING (host_id)`.
    pub fn build_sql(&self, source: &str, pagination: &Pagination) -> String {
        let mut sql = String::from("SELECT row_to_json(q) AS row FROM (");
        self.push_select(&mut sql, source);
        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            sql.push_str(&self.order_by.join(", "));
        }
        sql.push_str(&format!(
            " LIMIT {} OFFSET {}",
            pagination.limit(),
            pagination.offset()
        ));
        sql.push_str(") q");
        sql
    }

    /// Count of all matching rows, ignoring pagination. Distinct searches
    /// count distinct projected rows.
    pub fn build_count_sql(&self, source: &str) -> String {
        if self.distinct {
            let mut sql = String::from("SELECT COUNT(*) FROM (");
            self.push_select(&mut sql, source);
            sql.push_str(") d");
            sql
        } else {
            format!("SELECT COUNT(*) FROM {}{}", source, self.where_clause())
        }
    }

    fn push_select(&self, sql: &mut String, source: &str) {
        sql.push_str("SELECT ");
        if self.distinct {
            sql.push_str("DISTINCT ");
        }
        if self.columns.is_empty() {
            sql.push('*');
        } else {
            sql.push_str(&self.columns.join(", "));
        }
        sql.push_str(" FROM ");
        sql.push_str(source);
        sql.push_str(&self.where_clause());
    }
}

/// `None` means the filter places no constraint (a null operand for an
/// operator other than eq/neq).
fn build_filter_clause(
    filter: &ResolvedFilter,
    bind_params: &mut Vec<BindValue>,
) -> Result<Option<String>> {
    let field = &filter.field;
    let col = quote_ident(&field.column);

    let clause = match &filter.condition {
        Condition::Scalar { operator, value } if value.is_null() => match operator {
            ScalarOperator::Eq => Some(format!("{col} IS NULL")),
            ScalarOperator::Neq => Some(format!("{col} IS NOT NULL")),
            _ => None,
        },
        Condition::Scalar { operator, value } => {
            Some(build_scalar_clause(field, &col, *operator, value, bind_params)?)
        }
        Condition::Vector { operator, values } => {
            let idx = push_array(bind_params, field, values)?;
            Some(match operator {
                VectorOperator::In => format!("{col} = ANY(${idx})"),
                VectorOperator::NotIn => format!("{col} <> ALL(${idx})"),
            })
        }
    };
    Ok(clause)
}

fn build_scalar_clause(
    field: &FieldDescriptor,
    col: &str,
    operator: ScalarOperator,
    value: &FilterValue,
    bind_params: &mut Vec<BindValue>,
) -> Result<String> {
    let cmp = match operator {
        ScalarOperator::Eq => "=",
        ScalarOperator::Neq => "<>",
        ScalarOperator::Gt => ">",
        ScalarOperator::Lt => "<",
        ScalarOperator::Like | ScalarOperator::NotLike => {
            let text = text_operand(field, value)?;
            let idx = push_text(bind_params, format!("%{}%", escape_like_pattern(text)));
            let not = if operator == ScalarOperator::NotLike {
                "NOT "
            } else {
                ""
            };
            return Ok(format!("{col} {not}ILIKE ${idx} ESCAPE E'\\\\'"));
        }
        ScalarOperator::Regex => {
            let pattern = text_operand(field, value)?;
            check_pattern(field, pattern)?;
            let idx = push_text(bind_params, pattern.to_string());
            return Ok(format!("{col} ~ ${idx}"));
        }
    };
    let idx = push_scalar(bind_params, field, value)?;
    Ok(format!("{col} {cmp} ${idx}"))
}

fn text_operand<'a>(field: &FieldDescriptor, value: &'a FilterValue) -> Result<&'a str> {
    value.as_text().ok_or_else(|| Error::TypeMismatch {
        field: field.name.clone(),
        expected: field.kind,
    })
}
