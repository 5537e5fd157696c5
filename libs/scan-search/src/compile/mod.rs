//! Backend query compilers.
//!
//! Both compilers take a [`ValidatedSearch`](crate::validate::ValidatedSearch)
//! and never see raw field names:
//! - [`sql`]: parameterized predicates and ORDER BY for Postgres
//! - [`document`]: bool must / must_not queries for OpenSearch
//!
//! The two are not interchangeable for pattern operators: SQL `like` is an
//! escaped, case-insensitive substring match, the document `like` is a raw
//! wildcard query.

mod bind;
pub mod document;
mod escape;
pub mod sql;

pub use bind::BindValue;
pub use document::DocumentQuery;
pub use sql::SqlQuery;

use crate::error::{Error, Result};
use crate::schema::FieldDescriptor;

/// Regex syntax is checked before compiling on both paths so a bad pattern
/// never reaches a datastore.
pub(crate) fn check_pattern(field: &FieldDescriptor, pattern: &str) -> Result<()> {
    regex::Regex::new(pattern)
        .map(|_| ())
        .map_err(|e| Error::InvalidPattern {
            field: field.name.clone(),
            message: e.to_string(),
        })
}
