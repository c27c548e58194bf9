//! redb table definitions for the Gantry state store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain types).

use redb::TableDefinition;

/// Jobs keyed by `{namespace}/{name}`.
pub const JOBS: TableDefinition<&str, &[u8]> = TableDefinition::new("jobs");

/// Queue configuration keyed by queue name.
pub const QUEUES: TableDefinition<&str, &[u8]> = TableDefinition::new("queues");

/// Compute clusters keyed by cluster name.
pub const CLUSTERS: TableDefinition<&str, &[u8]> = TableDefinition::new("clusters");
