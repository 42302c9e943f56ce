//! # Trellis Admin
//!
//! Administrative client for the Trellis wide-column store supporting:
//! - Table lifecycle: create, inspect, list, modify column families,
//!   drop rows
//! - Snapshots: create, restore, list, delete, backed by long-running
//!   operations
//! - Replication consistency: token minting, one-shot checks, and
//!   blocking waits
//! - Automatic retries with exponential backoff, gated on idempotency
//! - A non-blocking variant of every call, scheduled on a
//!   [`CompletionQueue`](trellis_core::queue::CompletionQueue)
//!
//! The crate is transport-agnostic: callers supply an
//! [`AdminConnection`] that makes exactly one attempt per call, and the
//! client layers retry, pagination, and operation polling on top.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use trellis_admin::{InstanceName, ListTablesRequest, TableAdmin};
//!
//! # fn demo(connection: impl trellis_admin::AdminConnection + 'static) -> trellis_admin::Result<()> {
//! let instance = InstanceName::new("prod")?;
//! let admin = TableAdmin::new(connection, instance.clone());
//!
//! for table in admin.tables().list(ListTablesRequest::new(instance))? {
//!     println!("{}", table.name);
//! }
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

// Re-export commonly used types
pub use client::{TableAdmin, TableAdminBuilder};
pub use config::{AdminConfig, AdminConfigBuilder, MutationMode};
pub use connection::AdminConnection;
pub use resources::{ConsistencyTokens, Resource, Snapshots, Tables};

// The resilience and protocol layers, re-exported so one import serves
// most callers.
pub use trellis_core::{Error, Result, Status, StatusCode};
pub use trellis_protocol::*;

// Module declarations
pub mod client;
pub mod config;
pub mod connection;
pub mod resources;

/// Prelude module for common imports
///
/// # Examples
///
/// ```rust
/// use trellis_admin::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        AdminConfig, AdminConnection, Error, MutationMode, Result, StatusCode, TableAdmin,
    };
    pub use trellis_core::queue::CompletionQueue;
    pub use trellis_protocol::{
        CheckConsistencyRequest, CreateTableFromSnapshotRequest, CreateTableRequest,
        GenerateConsistencyTokenRequest, InstanceName, ListSnapshotsRequest, ListTablesRequest,
        SnapshotTableRequest, TableConfig, TableName,
    };
}

/// Crate version, taken from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
