//! `shiryoku` command-line application: configuration, logging, the scan-data
//! schema catalog and the Postgres / OpenSearch repositories behind the
//! search commands.

pub mod commands;
pub mod config;
pub mod db;
pub mod logging;
pub mod models;
pub mod schema;

pub use config::Config;
pub use schema::{Entity, SchemaCatalog};
