//! Datastore repositories
//!
//! - [`postgres`]: relational entities through the SQL compiler
//! - [`opensearch`]: document entities through the document-query compiler

pub mod opensearch;
pub mod postgres;

pub use opensearch::{OpenSearchClient, OpenSearchRepository};
pub use postgres::PgSearchRepository;
