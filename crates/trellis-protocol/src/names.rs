//! Typed resource names for the Trellis administrative API
//!
//! Every administrative RPC addresses a resource by a slash-delimited path
//! such as `instances/prod/tables/events`. These newtypes validate the
//! path once, at construction, so the rest of the client can pass names
//! around without re-checking them. Each type renders its full path via
//! `Display` and parses it back via `FromStr`; malformed input surfaces as
//! [`Error::InvalidName`].

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use trellis_core::{Error, Result};

/// One path segment: leading alphanumeric, then alphanumerics, hyphens,
/// underscores, or dots.
const SEGMENT: &str = "[A-Za-z0-9][-A-Za-z0-9_.]*";

static SEGMENT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^{SEGMENT}$")).expect("Failed to compile segment regex")
});

static INSTANCE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^instances/({SEGMENT})$")).expect("Failed to compile instance name regex")
});

static CLUSTER_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^instances/({SEGMENT})/clusters/({SEGMENT})$"))
        .expect("Failed to compile cluster name regex")
});

static TABLE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^instances/({SEGMENT})/tables/({SEGMENT})$"))
        .expect("Failed to compile table name regex")
});

static SNAPSHOT_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        "^instances/({SEGMENT})/clusters/({SEGMENT})/snapshots/({SEGMENT})$"
    ))
    .expect("Failed to compile snapshot name regex")
});

static OPERATION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!("^operations/({SEGMENT})$"))
        .expect("Failed to compile operation name regex")
});

fn check_segment(id: &str, what: &str) -> Result<()> {
    if SEGMENT_PATTERN.is_match(id) {
        Ok(())
    } else {
        Err(Error::InvalidName(format!("{id:?} is not a valid {what}")))
    }
}

/// Name of a Trellis instance: `instances/{instance}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstanceName {
    instance: String,
}

impl InstanceName {
    /// Build an instance name from its id.
    pub fn new(instance: impl Into<String>) -> Result<Self> {
        let instance = instance.into();
        check_segment(&instance, "instance id")?;
        Ok(Self { instance })
    }

    /// The bare instance id.
    pub fn instance_id(&self) -> &str {
        &self.instance
    }

    /// Name a table within this instance.
    pub fn table(&self, table: impl Into<String>) -> Result<TableName> {
        let table = table.into();
        check_segment(&table, "table id")?;
        Ok(TableName {
            instance: self.instance.clone(),
            table,
        })
    }

    /// Name a cluster within this instance.
    pub fn cluster(&self, cluster: impl Into<String>) -> Result<ClusterName> {
        let cluster = cluster.into();
        check_segment(&cluster, "cluster id")?;
        Ok(ClusterName {
            instance: self.instance.clone(),
            cluster,
        })
    }
}

impl fmt::Display for InstanceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instances/{}", self.instance)
    }
}

impl FromStr for InstanceName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let captures = INSTANCE_PATTERN
            .captures(s)
            .ok_or_else(|| Error::InvalidName(format!("{s:?} is not an instance name")))?;
        Ok(Self {
            instance: captures[1].to_string(),
        })
    }
}

/// Name of a cluster: `instances/{instance}/clusters/{cluster}`.
///
/// Snapshots live under a cluster, so snapshot operations address their
/// parent through this type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ClusterName {
    instance: String,
    cluster: String,
}

impl ClusterName {
    /// Build a cluster name from its ids.
    pub fn new(instance: impl Into<String>, cluster: impl Into<String>) -> Result<Self> {
        InstanceName::new(instance)?.cluster(cluster)
    }

    /// The bare instance id.
    pub fn instance_id(&self) -> &str {
        &self.instance
    }

    /// The bare cluster id.
    pub fn cluster_id(&self) -> &str {
        &self.cluster
    }

    /// The instance this cluster belongs to.
    pub fn instance(&self) -> InstanceName {
        InstanceName {
            instance: self.instance.clone(),
        }
    }

    /// Name a snapshot within this cluster.
    pub fn snapshot(&self, snapshot: impl Into<String>) -> Result<SnapshotName> {
        let snapshot = snapshot.into();
        check_segment(&snapshot, "snapshot id")?;
        Ok(SnapshotName {
            instance: self.instance.clone(),
            cluster: self.cluster.clone(),
            snapshot,
        })
    }
}

impl fmt::Display for ClusterName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instances/{}/clusters/{}", self.instance, self.cluster)
    }
}

impl FromStr for ClusterName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let captures = CLUSTER_PATTERN
            .captures(s)
            .ok_or_else(|| Error::InvalidName(format!("{s:?} is not a cluster name")))?;
        Ok(Self {
            instance: captures[1].to_string(),
            cluster: captures[2].to_string(),
        })
    }
}

/// Name of a table: `instances/{instance}/tables/{table}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TableName {
    instance: String,
    table: String,
}

impl TableName {
    /// Build a table name from its ids.
    pub fn new(instance: impl Into<String>, table: impl Into<String>) -> Result<Self> {
        InstanceName::new(instance)?.table(table)
    }

    /// The bare instance id.
    pub fn instance_id(&self) -> &str {
        &self.instance
    }

    /// The bare table id.
    pub fn table_id(&self) -> &str {
        &self.table
    }

    /// The instance this table belongs to.
    pub fn instance(&self) -> InstanceName {
        InstanceName {
            instance: self.instance.clone(),
        }
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instances/{}/tables/{}", self.instance, self.table)
    }
}

impl FromStr for TableName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let captures = TABLE_PATTERN
            .captures(s)
            .ok_or_else(|| Error::InvalidName(format!("{s:?} is not a table name")))?;
        Ok(Self {
            instance: captures[1].to_string(),
            table: captures[2].to_string(),
        })
    }
}

/// Name of a snapshot:
/// `instances/{instance}/clusters/{cluster}/snapshots/{snapshot}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SnapshotName {
    instance: String,
    cluster: String,
    snapshot: String,
}

impl SnapshotName {
    /// Build a snapshot name from its ids.
    pub fn new(
        instance: impl Into<String>,
        cluster: impl Into<String>,
        snapshot: impl Into<String>,
    ) -> Result<Self> {
        ClusterName::new(instance, cluster)?.snapshot(snapshot)
    }

    /// The bare instance id.
    pub fn instance_id(&self) -> &str {
        &self.instance
    }

    /// The bare cluster id.
    pub fn cluster_id(&self) -> &str {
        &self.cluster
    }

    /// The bare snapshot id.
    pub fn snapshot_id(&self) -> &str {
        &self.snapshot
    }

    /// The cluster this snapshot belongs to.
    pub fn cluster(&self) -> ClusterName {
        ClusterName {
            instance: self.instance.clone(),
            cluster: self.cluster.clone(),
        }
    }
}

impl fmt::Display for SnapshotName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "instances/{}/clusters/{}/snapshots/{}",
            self.instance, self.cluster, self.snapshot
        )
    }
}

impl FromStr for SnapshotName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let captures = SNAPSHOT_PATTERN
            .captures(s)
            .ok_or_else(|| Error::InvalidName(format!("{s:?} is not a snapshot name")))?;
        Ok(Self {
            instance: captures[1].to_string(),
            cluster: captures[2].to_string(),
            snapshot: captures[3].to_string(),
        })
    }
}

/// Name of a long-running operation: `operations/{id}`.
///
/// Assigned by the server when an operation starts; clients only ever
/// echo it back in status checks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OperationName {
    id: String,
}

impl OperationName {
    /// Build an operation name from its id.
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        check_segment(&id, "operation id")?;
        Ok(Self { id })
    }

    /// The bare operation id.
    pub fn operation_id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for OperationName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operations/{}", self.id)
    }
}

impl FromStr for OperationName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let captures = OPERATION_PATTERN
            .captures(s)
            .ok_or_else(|| Error::InvalidName(format!("{s:?} is not an operation name")))?;
        Ok(Self {
            id: captures[1].to_string(),
        })
    }
}

macro_rules! string_conversions {
    ($($name:ty),* $(,)?) => {
        $(
            impl TryFrom<String> for $name {
                type Error = Error;

                fn try_from(value: String) -> Result<Self> {
                    value.parse()
                }
            }

            impl From<$name> for String {
                fn from(name: $name) -> String {
                    name.to_string()
                }
            }
        )*
    };
}

string_conversions!(InstanceName, ClusterName, TableName, SnapshotName, OperationName);
