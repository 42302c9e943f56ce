//! Replication consistency types
//!
//! Writes to a table replicate asynchronously across clusters. A
//! consistency token marks a point in the write stream; once every
//! cluster has caught up to that point, checks against the token report
//! [`Consistency::Consistent`].

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque marker for a point in a table's write stream.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConsistencyToken(String);

impl ConsistencyToken {
    /// Wrap a token received from the server.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token's wire form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConsistencyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for ConsistencyToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// Whether replication has caught up to a token.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Consistency {
    /// Every cluster has replicated the writes the token marks.
    Consistent,

    /// At least one cluster is still catching up.
    Inconsistent,
}

impl Consistency {
    /// True once replication has caught up.
    pub fn is_consistent(self) -> bool {
        matches!(self, Consistency::Consistent)
    }
}
