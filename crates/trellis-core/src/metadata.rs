//! Per-call addressing metadata attached to every attempt.
//!
//! A [`CallMetadata`] names the resource an operation acts on and carries
//! an invocation id that stays stable across retries, so log lines from
//! all attempts of one logical operation can be correlated.

use tracing::debug;
use uuid::Uuid;

/// Which routing parameter the resource name is sent under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataParam {
    /// The operation acts on children of the resource (create, list).
    Parent,
    /// The operation acts on the resource itself (get, modify, delete).
    Name,
}

/// Addressing metadata for one logical operation.
///
/// Built once per operation and reused unchanged across every retry
/// attempt and status check.
#[derive(Debug, Clone)]
pub struct CallMetadata {
    param: MetadataParam,
    resource: String,
    invocation_id: Uuid,
}

impl CallMetadata {
    /// Metadata for an operation on children of `resource`.
    pub fn parent(resource: impl Into<String>) -> Self {
        Self {
            param: MetadataParam::Parent,
            resource: resource.into(),
            invocation_id: Uuid::new_v4(),
        }
    }

    /// Metadata for an operation on `resource` itself.
    pub fn name(resource: impl Into<String>) -> Self {
        Self {
            param: MetadataParam::Name,
            resource: resource.into(),
            invocation_id: Uuid::new_v4(),
        }
    }

    /// The routing parameter value, e.g. `name=instances/prod/tables/events`.
    pub fn request_params(&self) -> String {
        match self.param {
            MetadataParam::Parent => format!("parent={}", self.resource),
            MetadataParam::Name => format!("name={}", self.resource),
        }
    }

    /// The resource name this operation addresses.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// Identifier shared by every attempt of this logical operation.
    pub fn invocation_id(&self) -> Uuid {
        self.invocation_id
    }

    /// Log the start of one attempt.
    pub fn log_attempt(&self, attempt: u32) {
        debug!(
            invocation_id = %self.invocation_id,
            resource = %self.resource,
            attempt,
            "Starting attempt"
        );
    }
}
