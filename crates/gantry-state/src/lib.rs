//! Snapshot provider contract and embedded state store.
//!
//! The scheduling engine reads jobs, queues and compute clusters through the
//! [`SnapshotProvider`] trait and writes phase transitions back through it.
//! [`StateStore`] is the bundled implementation, backed by
//! [redb](https://docs.rs/redb).
//!
//! # Architecture
//!
//! All domain types are JSON-serialized into redb's `&[u8]` value columns.
//! Jobs are keyed by `{namespace}/{name}`; queues and clusters by name.
//! Every job write bumps the record's `version`, and transitions are only
//! applied when the caller's expected version and phase still match.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod provider;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use gantry_core::ResourceVector;
pub use provider::{SnapshotProvider, Transition};
pub use store::StateStore;
pub use types::*;
