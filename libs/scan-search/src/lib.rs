//! Search specifications for network-scan results.
//!
//! A search request travels through:
//! - [`decode`]: JSON wire format -> [`SearchParameters`]
//! - [`validate`]: field whitelisting against [`FieldRegistry`]s and value
//!   kind checks
//! - [`compile`]: parameterized SQL or an OpenSearch bool query
//! - [`service`]: count + page fetch through a [`SearchRepository`]
//!
//! Everything here is pure except the repository calls made by
//! [`service::search`].

pub mod compile;
pub mod decode;
pub mod error;
pub mod model;
pub mod pagination;
pub mod schema;
pub mod service;
pub mod validate;

pub use error::{Error, Result};
pub use model::{
    Filter, FilterValue, Operator, ScalarFilter, ScalarOperator, SearchParameters, SortDirection,
    SortSpec, VectorFilter, VectorOperator,
};
pub use pagination::Pagination;
pub use schema::{FieldDescriptor, FieldRegistry, ValueKind};
pub use service::{SearchRepository, SearchResult, SearchService};
pub use validate::ValidatedSearch;
