//! Non-blocking administration through a completion queue
//!
//! This example shows how to:
//! 1. Dedicate worker threads to a [`CompletionQueue`]
//! 2. Keep several administrative calls in flight at once
//! 3. Await an in-flight call from async code
//! 4. Shut the queue down and observe cancelled work
//!
//! The directory service here fails its first few fetches, so some of
//! the in-flight calls spend time in the queue's retry timers while the
//! rest complete around them.
//!
//! # Usage
//!
//! ```bash
//! cargo run --example completion_queue
//! ```

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Instant;

use trellis_admin::{
    AdminConfig, AdminConnection, CheckConsistencyRequest, CheckConsistencyResponse,
    CreateTableFromSnapshotRequest, CreateTableRequest, DeleteSnapshotRequest, DeleteTableRequest,
    DropRowRangeRequest, Error, GenerateConsistencyTokenRequest, GenerateConsistencyTokenResponse,
    GetOperationRequest, GetSnapshotRequest, GetTableRequest, InstanceName, ListSnapshotsPage,
    ListSnapshotsRequest, ListTablesPage, ListTablesRequest, ModifyColumnFamiliesRequest,
    Operation, Snapshot, SnapshotTableRequest, StatusCode, Table, TableAdmin,
};
use trellis_core::metadata::CallMetadata;
use trellis_core::queue::CompletionQueue;

fn unsupported<T>() -> trellis_admin::Result<T> {
    Err(Error::rpc(
        StatusCode::Unimplemented,
        "not part of this example",
    ))
}

/// A read-only table directory whose first few fetches fail.
#[derive(Debug)]
struct Directory {
    tables: BTreeMap<String, Table>,
    flakes: Mutex<u32>,
}

impl Directory {
    fn new(instance: &InstanceName, count: usize, flakes: u32) -> trellis_admin::Result<Self> {
        let mut tables = BTreeMap::new();
        for i in 0..count {
            let name = instance.table(format!("t-{i:02}"))?;
            tables.insert(name.to_string(), Table::new(name));
        }
        Ok(Self {
            tables,
            flakes: Mutex::new(flakes),
        })
    }

    fn flake(&self) -> trellis_admin::Result<()> {
        let mut flakes = self.flakes.lock().unwrap_or_else(|e| e.into_inner());
        if *flakes > 0 {
            *flakes -= 1;
            return Err(Error::rpc(StatusCode::Unavailable, "directory hiccup"));
        }
        Ok(())
    }
}

impl AdminConnection for Directory {
    fn get_table(
        &self,
        _metadata: &CallMetadata,
        request: &GetTableRequest,
    ) -> trellis_admin::Result<Table> {
        self.flake()?;
        self.tables
            .get(&request.name.to_string())
            .cloned()
            .ok_or_else(|| Error::rpc(StatusCode::NotFound, "no such table"))
    }

    fn list_tables(
        &self,
        _metadata: &CallMetadata,
        _request: &ListTablesRequest,
    ) -> trellis_admin::Result<ListTablesPage> {
        Ok(ListTablesPage {
            tables: self.tables.values().cloned().collect(),
            next_page_token: String::new(),
        })
    }

    fn create_table(
        &self,
        _metadata: &CallMetadata,
        _request: &CreateTableRequest,
    ) -> trellis_admin::Result<Table> {
        unsupported()
    }

    fn delete_table(
        &self,
        _metadata: &CallMetadata,
        _request: &DeleteTableRequest,
    ) -> trellis_admin::Result<()> {
        unsupported()
    }

    fn modify_column_families(
        &self,
        _metadata: &CallMetadata,
        _request: &ModifyColumnFamiliesRequest,
    ) -> trellis_admin::Result<Table> {
        unsupported()
    }

    fn drop_row_range(
        &self,
        _metadata: &CallMetadata,
        _request: &DropRowRangeRequest,
    ) -> trellis_admin::Result<()> {
        unsupported()
    }

    fn generate_consistency_token(
        &self,
        _metadata: &CallMetadata,
        _request: &GenerateConsistencyTokenRequest,
    ) -> trellis_admin::Result<GenerateConsistencyTokenResponse> {
        unsupported()
    }

    fn check_consistency(
        &self,
        _metadata: &CallMetadata,
        _request: &CheckConsistencyRequest,
    ) -> trellis_admin::Result<CheckConsistencyResponse> {
        unsupported()
    }

    fn snapshot_table(
        &self,
        _metadata: &CallMetadata,
        _request: &SnapshotTableRequest,
    ) -> trellis_admin::Result<Operation> {
        unsupported()
    }

    fn get_snapshot(
        &self,
        _metadata: &CallMetadata,
        _request: &GetSnapshotRequest,
    ) -> trellis_admin::Result<Snapshot> {
        unsupported()
    }

    fn list_snapshots(
        &self,
        _metadata: &CallMetadata,
        _request: &ListSnapshotsRequest,
    ) -> trellis_admin::Result<ListSnapshotsPage> {
        unsupported()
    }

    fn delete_snapshot(
        &self,
        _metadata: &CallMetadata,
        _request: &DeleteSnapshotRequest,
    ) -> trellis_admin::Result<()> {
        unsupported()
    }

    fn create_table_from_snapshot(
        &self,
        _metadata: &CallMetadata,
        _request: &CreateTableFromSnapshotRequest,
    ) -> trellis_admin::Result<Operation> {
        unsupported()
    }

    fn get_operation(
        &self,
        _metadata: &CallMetadata,
        _request: &GetOperationRequest,
    ) -> trellis_admin::Result<Operation> {
        unsupported()
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
    let directory = Directory::new(&instance, 5, 3)?;
    let admin = TableAdmin::builder(directory, instance.clone())
        .config(AdminConfig::builder().max_attempts(5).build())
        .build();

    println!("📮 Completion queue example\n");

    // Two worker threads serve the queue until shutdown
    let queue = CompletionQueue::new();
    let workers: Vec<_> = (0..2)
        .map(|_| {
            let queue = queue.clone();
            std::thread::spawn(move || queue.run())
        })
        .collect();

    // Fire off every fetch up front; the flaky ones retry on the
    // queue's timers while the others complete
    let started = Instant::now();
    let listing = admin
        .tables()
        .list_async(&queue, ListTablesRequest::new(instance.clone()));
    let fetches: Vec<_> = (0..5)
        .map(|i| {
            let request = GetTableRequest::new(instance.table(format!("t-{i:02}"))?);
            Ok(admin.tables().get_async(&queue, request))
        })
        .collect::<trellis_admin::Result<_>>()?;

    println!("📋 Directory lists {} tables", listing.wait()?.len());
    for future in fetches {
        let table = future.wait()?;
        println!("   • fetched {} after {:?}", table.name, started.elapsed());
    }

    // The same futures can be awaited from async code
    let runtime = tokio::runtime::Runtime::new()?;
    let table = runtime.block_on(async {
        admin
            .tables()
            .get_async(&queue, GetTableRequest::new(instance.table("t-00")?))
            .await
    })?;
    println!("⚡ Awaited {} from a tokio task", table.name);

    // Shutting down cancels anything scheduled afterwards
    queue.shutdown();
    for worker in workers {
        worker.join().expect("worker thread panicked");
    }
    let orphan = admin
        .tables()
        .get_async(&queue, GetTableRequest::new(instance.table("t-01")?));
    let error = orphan.wait().unwrap_err();
    println!("🛑 After shutdown: {error}");

    Ok(())
}
