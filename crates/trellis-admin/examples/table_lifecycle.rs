//! Walkthrough of the table administration API over an in-memory service
//!
//! This example shows how to:
//! 1. Implement [`AdminConnection`] for a toy in-memory Trellis service
//! 2. Create, inspect, and reshape tables with automatic retries
//! 3. Snapshot a table and restore it, polling the operation to completion
//! 4. Wait for replication to catch up with a consistency token
//!
//! The in-memory service fails the first attempt of every retryable RPC
//! with `UNAVAILABLE`, so each step below quietly exercises the retry
//! layer. Run with `RUST_LOG=debug` to watch the attempts.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example table_lifecycle
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use trellis_admin::{
    AdminConfig, AdminConnection, CheckConsistencyRequest, CheckConsistencyResponse, ColumnFamily,
    CreateTableFromSnapshotRequest, CreateTableRequest, DeleteSnapshotRequest, DeleteTableRequest,
    DropRowRangeRequest, Error, FamilyModification, GcRule, GenerateConsistencyTokenRequest,
    GenerateConsistencyTokenResponse, GetOperationRequest, GetSnapshotRequest, GetTableRequest,
    InstanceName, ListSnapshotsPage, ListSnapshotsRequest, ListTablesPage, ListTablesRequest,
    ModifyColumnFamiliesRequest, Operation, OperationName, Snapshot, SnapshotState,
    SnapshotTableRequest, StatusCode, Table, TableAdmin, TableConfig,
};
use trellis_core::metadata::CallMetadata;

/// Server-side work a long-running operation is still doing.
#[derive(Debug)]
enum PendingWork {
    Snapshot { remaining: u32, snapshot: Snapshot },
    Restore { remaining: u32, table: Table },
}

#[derive(Debug, Default)]
struct State {
    tables: BTreeMap<String, Table>,
    snapshots: BTreeMap<String, Snapshot>,
    operations: BTreeMap<String, PendingWork>,
    flaked: BTreeSet<String>,
    inconsistent_checks: u32,
    next_operation: u64,
}

impl State {
    /// Fail the first attempt of each retryable RPC so retries have
    /// work to do. The RPCs the client treats as non-idempotent never
    /// flake, since the client gives those a single attempt.
    fn flake(&mut self, rpc: &str) -> trellis_admin::Result<()> {
        if self.flaked.insert(rpc.to_string()) {
            Err(Error::rpc(StatusCode::Unavailable, "first attempt flake"))
        } else {
            Ok(())
        }
    }

    fn start_operation(&mut self, work: PendingWork) -> trellis_admin::Result<Operation> {
        self.next_operation += 1;
        let name = OperationName::new(format!("op-{}", self.next_operation))?;
        self.operations.insert(name.to_string(), work);
        Ok(Operation::pending(name))
    }
}

/// A whole Trellis deployment in a mutex.
#[derive(Debug, Default)]
struct InMemoryTrellis {
    state: Mutex<State>,
}

impl InMemoryTrellis {
    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AdminConnection for InMemoryTrellis {
    fn create_table(
        &self,
        _metadata: &CallMetadata,
        request: &CreateTableRequest,
    ) -> trellis_admin::Result<Table> {
        let mut state = self.lock();

        let name = request.parent.table(&request.table_id)?;
        if state.tables.contains_key(&name.to_string()) {
            return Err(Error::rpc(StatusCode::AlreadyExists, "table exists"));
        }
        let mut table = Table::new(name.clone());
        for (family, rule) in &request.config.column_families {
            table = table.with_column_family(family.clone(), rule.clone());
        }
        state.tables.insert(name.to_string(), table.clone());
        Ok(table)
    }

    fn get_table(
        &self,
        _metadata: &CallMetadata,
        request: &GetTableRequest,
    ) -> trellis_admin::Result<Table> {
        let mut state = self.lock();
        state.flake("get_table")?;
        state
            .tables
            .get(&request.name.to_string())
            .cloned()
            .ok_or_else(|| Error::rpc(StatusCode::NotFound, "no such table"))
    }

    fn list_tables(
        &self,
        _metadata: &CallMetadata,
        request: &ListTablesRequest,
    ) -> trellis_admin::Result<ListTablesPage> {
        let mut state = self.lock();
        state.flake("list_tables")?;

        // Pages of one, so multi-table listings walk more than one page.
        let tables: Vec<Table> = state
            .tables
            .range(request.page_token.clone()..)
            .filter(|(key, _)| **key != request.page_token)
            .take(1)
            .map(|(_, table)| table.clone())
            .collect();
        let next_page_token = tables
            .last()
            .map(|last| last.name.to_string())
            .filter(|last_key| state.tables.keys().any(|key| key > last_key))
            .unwrap_or_default();
        Ok(ListTablesPage {
            tables,
            next_page_token,
        })
    }

    fn delete_table(
        &self,
        _metadata: &CallMetadata,
        request: &DeleteTableRequest,
    ) -> trellis_admin::Result<()> {
        let mut state = self.lock();
        state.flake("delete_table")?;
        state
            .tables
            .remove(&request.name.to_string())
            .map(|_| ())
            .ok_or_else(|| Error::rpc(StatusCode::NotFound, "no such table"))
    }

    fn modify_column_families(
        &self,
        _metadata: &CallMetadata,
        request: &ModifyColumnFamiliesRequest,
    ) -> trellis_admin::Result<Table> {
        let mut state = self.lock();

        let table = state
            .tables
            .get_mut(&request.name.to_string())
            .ok_or_else(|| Error::rpc(StatusCode::NotFound, "no such table"))?;
        for modification in &request.modifications {
            match modification {
                FamilyModification::Create { id, rule } => {
                    if table.column_families.contains_key(id) {
                        return Err(Error::rpc(StatusCode::AlreadyExists, "family exists"));
                    }
                    table
                        .column_families
                        .insert(id.clone(), ColumnFamily::new(rule.clone()));
                }
                FamilyModification::Update { id, rule } => {
                    let family = table
                        .column_families
                        .get_mut(id)
                        .ok_or_else(|| Error::rpc(StatusCode::NotFound, "no such family"))?;
                    family.gc_rule = Some(rule.clone());
                }
                FamilyModification::Drop { id } => {
                    table
                        .column_families
                        .remove(id)
                        .ok_or_else(|| Error::rpc(StatusCode::NotFound, "no such family"))?;
                }
            }
        }
        Ok(table.clone())
    }

    fn drop_row_range(
        &self,
        _metadata: &CallMetadata,
        request: &DropRowRangeRequest,
    ) -> trellis_admin::Result<()> {
        let mut state = self.lock();
        if !state.tables.contains_key(&request.name.to_string()) {
            return Err(Error::rpc(StatusCode::NotFound, "no such table"));
        }
        Ok(())
    }

    fn generate_consistency_token(
        &self,
        _metadata: &CallMetadata,
        _request: &GenerateConsistencyTokenRequest,
    ) -> trellis_admin::Result<GenerateConsistencyTokenResponse> {
        let mut state = self.lock();
        state.flake("generate_consistency_token")?;
        // Replication takes two checks to catch up.
        state.inconsistent_checks = 2;
        Ok(GenerateConsistencyTokenResponse {
            consistency_token: "demo-token".to_string().into(),
        })
    }

    fn check_consistency(
        &self,
        _metadata: &CallMetadata,
        _request: &CheckConsistencyRequest,
    ) -> trellis_admin::Result<CheckConsistencyResponse> {
        let mut state = self.lock();
        state.flake("check_consistency")?;
        let consistent = state.inconsistent_checks == 0;
        state.inconsistent_checks = state.inconsistent_checks.saturating_sub(1);
        Ok(CheckConsistencyResponse { consistent })
    }

    fn snapshot_table(
        &self,
        _metadata: &CallMetadata,
        request: &SnapshotTableRequest,
    ) -> trellis_admin::Result<Operation> {
        let mut state = self.lock();
        state.flake("snapshot_table")?;

        if !state.tables.contains_key(&request.name.to_string()) {
            return Err(Error::rpc(StatusCode::NotFound, "no such table"));
        }
        let snapshot = Snapshot::new(request.snapshot_name()?)
            .with_source_table(request.name.clone())
            .with_state(SnapshotState::Ready);
        state
            .snapshots
            .insert(snapshot.name.to_string(), snapshot.clone());
        state.start_operation(PendingWork::Snapshot {
            remaining: 2,
            snapshot,
        })
    }

    fn get_snapshot(
        &self,
        _metadata: &CallMetadata,
        request: &GetSnapshotRequest,
    ) -> trellis_admin::Result<Snapshot> {
        let mut state = self.lock();
        state.flake("get_snapshot")?;
        state
            .snapshots
            .get(&request.name.to_string())
            .cloned()
            .ok_or_else(|| Error::rpc(StatusCode::NotFound, "no such snapshot"))
    }

    fn list_snapshots(
        &self,
        _metadata: &CallMetadata,
        _request: &ListSnapshotsRequest,
    ) -> trellis_admin::Result<ListSnapshotsPage> {
        let mut state = self.lock();
        state.flake("list_snapshots")?;
        Ok(ListSnapshotsPage {
            snapshots: state.snapshots.values().cloned().collect(),
            next_page_token: String::new(),
        })
    }

    fn delete_snapshot(
        &self,
        _metadata: &CallMetadata,
        request: &DeleteSnapshotRequest,
    ) -> trellis_admin::Result<()> {
        let mut state = self.lock();
        state.flake("delete_snapshot")?;
        state
            .snapshots
            .remove(&request.name.to_string())
            .map(|_| ())
            .ok_or_else(|| Error::rpc(StatusCode::NotFound, "no such snapshot"))
    }

    fn create_table_from_snapshot(
        &self,
        _metadata: &CallMetadata,
        request: &CreateTableFromSnapshotRequest,
    ) -> trellis_admin::Result<Operation> {
        let mut state = self.lock();
        state.flake("create_table_from_snapshot")?;

        let source = state
            .snapshots
            .get(&request.source_snapshot.to_string())
            .cloned()
            .ok_or_else(|| Error::rpc(StatusCode::NotFound, "no such snapshot"))?;
        let name = request.parent.table(&request.table_id)?;
        let mut table = Table::new(name.clone());
        if let Some(original) = source
            .source_table
            .as_ref()
            .and_then(|source_table| state.tables.get(&source_table.to_string()))
        {
            table.column_families = original.column_families.clone();
        }
        state.tables.insert(name.to_string(), table.clone());
        state.start_operation(PendingWork::Restore {
            remaining: 2,
            table,
        })
    }

    fn get_operation(
        &self,
        _metadata: &CallMetadata,
        request: &GetOperationRequest,
    ) -> trellis_admin::Result<Operation> {
        let mut state = self.lock();
        state.flake("get_operation")?;

        let key = request.name.to_string();
        let work = state
            .operations
            .get_mut(&key)
            .ok_or_else(|| Error::rpc(StatusCode::NotFound, "no such operation"))?;
        match work {
            PendingWork::Snapshot { remaining, .. } | PendingWork::Restore { remaining, .. }
                if *remaining > 0 =>
            {
                *remaining -= 1;
                Ok(Operation::pending(request.name.clone()))
            }
            PendingWork::Snapshot { snapshot, .. } => {
                Operation::completed(request.name.clone(), snapshot)
            }
            PendingWork::Restore { table, .. } => Operation::completed(request.name.clone(), table),
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing for debugging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let instance = InstanceName::new("demo")?;
    let config = AdminConfig::builder()
        .max_attempts(4)
        .initial_backoff(Duration::from_millis(25))
        .initial_poll_delay(Duration::from_millis(50))
        .build();
    let admin = TableAdmin::builder(InMemoryTrellis::default(), instance.clone())
        .config(config)
        .build();

    println!("🗄️  Trellis table lifecycle\n");

    // Create a table with two column families
    let schema = TableConfig::new()
        .with_column_family("profile", GcRule::max_num_versions(1))
        .with_column_family("events", GcRule::max_age(Duration::from_secs(30 * 86400)));
    let orders = admin
        .tables()
        .create(CreateTableRequest::new(instance.clone(), "orders", schema))?;
    println!("✅ Created {}", orders.name);

    // A second table so the listing has pages to walk
    admin.tables().create(CreateTableRequest::new(
        instance.clone(),
        "archive",
        TableConfig::new().with_column_family("raw", GcRule::max_num_versions(2)),
    ))?;

    for table in admin.tables().list(ListTablesRequest::new(instance.clone()))? {
        println!("   • {}", table.name);
    }

    // Reshape the schema: add an audit family, tighten events, drop nothing
    let reshaped = admin.tables().modify_column_families(
        ModifyColumnFamiliesRequest::new(
            orders.name.clone(),
            vec![
                FamilyModification::create("audit", GcRule::max_num_versions(5)),
                FamilyModification::update("events", GcRule::max_age(Duration::from_secs(86400))),
            ],
        ),
    )?;
    println!(
        "✅ Schema now has {} column families",
        reshaped.column_families.len()
    );

    // Wait for replication to catch up with everything written so far
    let token = admin
        .consistency()
        .generate_token(GenerateConsistencyTokenRequest::new(orders.name.clone()))?;
    admin
        .consistency()
        .wait(CheckConsistencyRequest::new(orders.name.clone(), token))?;
    println!("✅ Replicas are consistent");

    // Snapshot the table, then restore it under a new name
    let cluster = instance.cluster("c1")?;
    let snapshot = admin.snapshots().create(
        SnapshotTableRequest::new(orders.name.clone(), cluster.clone(), "pre-migration")
            .with_ttl(Duration::from_secs(7 * 86400))
            .with_description("before the schema migration"),
    )?;
    println!("✅ Snapshot {} is {:?}", snapshot.name, snapshot.state);

    let restored = admin.tables().create_from_snapshot(
        CreateTableFromSnapshotRequest::new(instance.clone(), "orders-replay", snapshot.name.clone()),
    )?;
    println!("✅ Restored into {}", restored.name);

    // Clear out test rows and tidy up
    admin
        .tables()
        .drop_rows_by_prefix(restored.name.clone(), "test-")?;
    admin
        .snapshots()
        .delete(DeleteSnapshotRequest::new(snapshot.name))?;
    admin
        .tables()
        .delete(DeleteTableRequest::new(restored.name))?;
    println!("\n🧹 Cleaned up; every retryable call above survived a flaky first attempt");

    Ok(())
}
