//! Searchable entities and their field registries.
//!
//! Built once at startup and shared read-only.

use clap::ValueEnum;
use shiryoku_search::{FieldDescriptor, FieldRegistry, ValueKind};
use std::fmt;
use std::sync::Arc;

/// Relational source for scan results: results joined with their host.
pub const SCAN_RESULTS_SOURCE: &str = "scan_results sr JOIN hosts h USING (host_id)";
/// Dashboard rows with `scan_start` exposed as epoch seconds, so it compares
/// and decodes as a number.
pub const DASHBOARD_SOURCE: &str = "(SELECT scan_id, \
     CAST(EXTRACT(EPOCH FROM scan_start) AS BIGINT) AS scan_start, \
     host, host_id, hostnames, ports \
     FROM widget_dashboard_scans) d";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Entity {
    /// Per-port nmap documents (OpenSearch)
    Nmap,
    /// Scan results joined with hosts (Postgres)
    ScanResults,
    /// Dashboard (scan, host) rows (Postgres)
    Dashboard,
}

impl Entity {
    pub fn as_str(self) -> &'static str {
        match self {
            Entity::Nmap => "nmap",
            Entity::ScanResults => "scan-results",
            Entity::Dashboard => "dashboard",
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct SchemaCatalog {
    nmap: Arc<FieldRegistry>,
    scan_results: Arc<FieldRegistry>,
    hosts: Arc<FieldRegistry>,
    dashboard: Arc<FieldRegistry>,
}

impl SchemaCatalog {
    pub fn new() -> Self {
        Self {
            nmap: Arc::new(nmap_registry()),
            scan_results: Arc::new(scan_results_registry()),
            hosts: Arc::new(hosts_registry()),
            dashboard: Arc::new(dashboard_registry()),
        }
    }

    /// Registries for an entity in lookup priority order.
    pub fn registries(&self, entity: Entity) -> Vec<Arc<FieldRegistry>> {
        match entity {
            Entity::Nmap => vec![self.nmap.clone()],
            Entity::ScanResults => vec![self.scan_results.clone(), self.hosts.clone()],
            Entity::Dashboard => vec![self.dashboard.clone()],
        }
    }
}

impl Default for SchemaCatalog {
    fn default() -> Self {
        Self::new()
    }
}

fn nmap_registry() -> FieldRegistry {
    FieldRegistry::builder("nmap-scans")
        .string("scan_id")
        .number("scan_start")
        .string("scan_args")
        .string("nmap_version")
        .string("host")
        .string("hostnames")
        .string("host_status")
        .string("mac_address")
        .string("mac_vendor")
        .string("os_name")
        .number("os_accuracy")
        .string("os_cpe")
        .number("port")
        .string("protocol")
        .string("port_state")
        .string("service_name")
        .string("service_product")
        .string("service_version")
        .string("service_extra_info")
        .string("service_tunnel")
        .string("service_cpe")
        .field(FieldDescriptor::new("script_id", ValueKind::String).attribute("scripts.id"))
        .field(
            FieldDescriptor::new("script_output", ValueKind::String).attribute("scripts.output"),
        )
        .build()
}

fn sr(name: &str, kind: ValueKind) -> FieldDescriptor {
    FieldDescriptor::new(name, kind).column(&format!("sr.{name}"))
}

fn h(name: &str, kind: ValueKind) -> FieldDescriptor {
    FieldDescriptor::new(name, kind).column(&format!("h.{name}"))
}

fn scan_results_registry() -> FieldRegistry {
    use ValueKind::*;
    FieldRegistry::builder("scan_results")
        .field(sr("scan_id", String))
        .field(sr("host_id", String))
        .field(sr("port", Number))
        .field(sr("protocol", String))
        .field(sr("port_state", String))
        .field(sr("service_name", String))
        .field(sr("service_product", String))
        .field(sr("service_version", String))
        .field(sr("service_extra_info", String))
        .field(sr("service_tunnel", String))
        .build()
}

fn hosts_registry() -> FieldRegistry {
    use ValueKind::*;
    FieldRegistry::builder("hosts")
        .field(h("host_id", String))
        .field(h("host", String))
        .field(h("host_status", String))
        .field(h("mac_address", String))
        .field(h("mac_vendor", String))
        .field(h("os_name", String))
        .field(h("os_accuracy", Number))
        .build()
}

fn dashboard_registry() -> FieldRegistry {
    FieldRegistry::builder("widget_dashboard_scans")
        .string("scan_id")
        .number("scan_start")
        .string("host")
        .string("host_id")
        .build()
}
