//! Table operations against a mock connection: retry classification,
//! pagination, and restore-from-snapshot polling.

mod common;

use std::time::Duration;

use common::MockConnection;
use mockall::Sequence;
use trellis_admin::{MutationMode, TableAdmin};
use trellis_core::{Error, Status, StatusCode};
use trellis_protocol::{
    CreateTableFromSnapshotRequest, CreateTableRequest, DeleteTableRequest, DropRowsTarget,
    FamilyModification, GcRule, GetTableRequest, ListTablesPage, ListTablesRequest,
    ModifyColumnFamiliesRequest, Operation, Table, TableConfig,
};

fn create_request() -> CreateTableRequest {
    CreateTableRequest::new(
        common::instance(),
        "events",
        TableConfig::new().with_column_family("metrics", GcRule::max_num_versions(3)),
    )
}

#[test]
fn test_create_table_returns_the_created_table() {
    let mut connection = MockConnection::new();
    connection
        .expect_create_table()
        .withf(|metadata, request| {
            metadata.request_params() == "parent=instances/prod" && request.table_id == "events"
        })
        .times(1)
        .returning(|_, request| {
            Ok(Table::new(request.parent.table(&request.table_id).unwrap()))
        });

    let admin = common::admin(connection);
    let table = admin.tables().create(create_request()).unwrap();
    assert_eq!(table.name, common::table_name());
}

#[test]
fn test_create_table_does_not_retry_transient_failures() {
    // The connection may have delivered the request before failing, and a
    // replayed create could land twice. One attempt, error surfaced.
    let mut connection = MockConnection::new();
    connection
        .expect_create_table()
        .times(1)
        .returning(|_, _| Err(common::transient()));

    let admin = common::admin(connection);
    let error = admin.tables().create(create_request()).unwrap_err();
    assert_eq!(error.code(), Some(StatusCode::Unavailable));
    assert!(matches!(common::root(&error), Error::Rpc(_)));
}

#[test]
fn test_create_table_reports_permanent_failures_with_context() {
    let mut connection = MockConnection::new();
    connection
        .expect_create_table()
        .times(1)
        .returning(|_, _| Err(common::permanent()));

    let admin = common::admin(connection);
    let error = admin.tables().create(create_request()).unwrap_err();
    assert_eq!(error.code(), Some(StatusCode::PermissionDenied));
    assert_eq!(error.to_string(), "creating table events in instances/prod");
}

#[test]
fn test_create_table_retries_under_always_retry_mutations() {
    let mut connection = MockConnection::new();
    let mut seq = Sequence::new();
    for _ in 0..2 {
        connection
            .expect_create_table()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Err(common::transient()));
    }
    connection
        .expect_create_table()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(Table::new(common::table_name())));

    let mut config = common::fast_config();
    config.mutation_mode = MutationMode::AlwaysRetry;
    let admin = common::admin_with_config(connection, config);

    let table = admin.tables().create(create_request()).unwrap();
    assert_eq!(table.name, common::table_name());
}

#[test]
fn test_get_table_retries_transient_failures() {
    let mut connection = MockConnection::new();
    let mut seq = Sequence::new();
    connection
        .expect_get_table()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Err(common::transient()));
    connection
        .expect_get_table()
        .withf(|metadata, request| {
            metadata.request_params() == "name=instances/prod/tables/events"
                && request.name == common::table_name()
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, request| Ok(Table::new(request.name.clone())));

    let admin = common::admin(connection);
    let table = admin
        .tables()
        .get(GetTableRequest::new(common::table_name()))
        .unwrap();
    assert_eq!(table.name, common::table_name());
}

#[test]
fn test_get_table_stops_on_permanent_failure() {
    let mut connection = MockConnection::new();
    connection
        .expect_get_table()
        .times(1)
        .returning(|_, _| Err(Error::rpc(StatusCode::NotFound, "no such table")));

    let admin = common::admin(connection);
    let error = admin
        .tables()
        .get(GetTableRequest::new(common::table_name()))
        .unwrap_err();
    assert_eq!(error.code(), Some(StatusCode::NotFound));
    assert_eq!(
        error.to_string(),
        "fetching table instances/prod/tables/events"
    );
}

#[test]
fn test_get_table_exhausts_the_attempt_budget() {
    let mut connection = MockConnection::new();
    connection
        .expect_get_table()
        .times(3)
        .returning(|_, _| Err(common::transient()));

    let admin = common::admin(connection);
    let error = admin
        .tables()
        .get(GetTableRequest::new(common::table_name()))
        .unwrap_err();

    match common::root(&error) {
        Error::RetriesExhausted { attempts, .. } => assert_eq!(*attempts, 3),
        other => panic!("expected retries exhausted, got {other:?}"),
    }
    assert_eq!(error.code(), Some(StatusCode::Unavailable));
    assert!(error.is_permanent());
}

#[test]
fn test_list_tables_walks_every_page() {
    let mut connection = MockConnection::new();
    let mut seq = Sequence::new();
    connection
        .expect_list_tables()
        .withf(|_, request| request.page_token.is_empty())
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| {
            Ok(ListTablesPage {
                tables: vec![
                    Table::new(common::instance().table("t1").unwrap()),
                    Table::new(common::instance().table("t2").unwrap()),
                ],
                next_page_token: "after-t2".to_string(),
            })
        });
    connection
        .expect_list_tables()
        .withf(|_, request| request.page_token == "after-t2")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| {
            Ok(ListTablesPage {
                tables: vec![Table::new(common::instance().table("t3").unwrap())],
                next_page_token: String::new(),
            })
        });

    let admin = common::admin(connection);
    let tables = admin
        .tables()
        .list(ListTablesRequest::new(common::instance()))
        .unwrap();

    let names: Vec<String> = tables.iter().map(|t| t.name.to_string()).collect();
    assert_eq!(
        names,
        vec![
            "instances/prod/tables/t1",
            "instances/prod/tables/t2",
            "instances/prod/tables/t3",
        ]
    );
}

#[test]
fn test_list_tables_retries_a_failed_page_fetch() {
    let mut connection = MockConnection::new();
    let mut seq = Sequence::new();
    connection
        .expect_list_tables()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| {
            Ok(ListTablesPage {
                tables: vec![Table::new(common::instance().table("t1").unwrap())],
                next_page_token: "after-t1".to_string(),
            })
        });
    connection
        .expect_list_tables()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Err(common::transient()));
    connection
        .expect_list_tables()
        .withf(|_, request| request.page_token == "after-t1")
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| {
            Ok(ListTablesPage {
                tables: vec![Table::new(common::instance().table("t2").unwrap())],
                next_page_token: String::new(),
            })
        });

    let admin = common::admin(connection);
    let tables = admin
        .tables()
        .list(ListTablesRequest::new(common::instance()))
        .unwrap();
    assert_eq!(tables.len(), 2);
}

#[test]
fn test_list_tables_reports_unrecoverable_failures() {
    let mut connection = MockConnection::new();
    connection
        .expect_list_tables()
        .times(1)
        .returning(|_, _| Err(common::permanent()));

    let admin = common::admin(connection);
    let error = admin
        .tables()
        .list(ListTablesRequest::new(common::instance()))
        .unwrap_err();
    assert_eq!(error.code(), Some(StatusCode::PermissionDenied));
    assert_eq!(error.to_string(), "listing tables in instances/prod");
}

#[test]
fn test_list_tables_exhausts_retries() {
    let mut connection = MockConnection::new();
    connection
        .expect_list_tables()
        .times(3)
        .returning(|_, _| Err(common::transient()));

    let admin = common::admin(connection);
    let error = admin
        .tables()
        .list(ListTablesRequest::new(common::instance()))
        .unwrap_err();
    assert!(matches!(
        common::root(&error),
        Error::RetriesExhausted { .. }
    ));
}

#[test]
fn test_list_tables_starts_from_the_requests_token() {
    let mut connection = MockConnection::new();
    connection
        .expect_list_tables()
        .withf(|_, request| request.page_token == "resume-here")
        .times(1)
        .returning(|_, _| Ok(ListTablesPage::default()));

    let admin = common::admin(connection);
    let tables = admin
        .tables()
        .list(ListTablesRequest::new(common::instance()).with_page_token("resume-here"))
        .unwrap();
    assert!(tables.is_empty());
}

#[test]
fn test_delete_table_retries_until_success() {
    let mut connection = MockConnection::new();
    let mut seq = Sequence::new();
    connection
        .expect_delete_table()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Err(common::transient()));
    connection
        .expect_delete_table()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Ok(()));

    let admin = common::admin(connection);
    admin
        .tables()
        .delete(DeleteTableRequest::new(common::table_name()))
        .unwrap();
}

#[test]
fn test_modify_column_families_applies_the_changes() {
    let mut connection = MockConnection::new();
    connection
        .expect_modify_column_families()
        .withf(|_, request| {
            request.modifications.len() == 2
                && request.modifications[0].id() == "metrics"
                && request.modifications[1].id() == "obsolete"
        })
        .times(1)
        .returning(|_, request| {
            Ok(Table::new(request.name.clone())
                .with_column_family("metrics", GcRule::max_num_versions(5)))
        });

    let admin = common::admin(connection);
    let table = admin
        .tables()
        .modify_column_families(ModifyColumnFamiliesRequest::new(
            common::table_name(),
            vec![
                FamilyModification::update("metrics", GcRule::max_num_versions(5)),
                FamilyModification::drop("obsolete"),
            ],
        ))
        .unwrap();
    assert!(table.column_families.contains_key("metrics"));
}

#[test]
fn test_modify_column_families_is_not_retried() {
    // A replayed drop of an already-dropped family would fail, so the
    // whole call gets one attempt.
    let mut connection = MockConnection::new();
    connection
        .expect_modify_column_families()
        .times(1)
        .returning(|_, _| Err(common::transient()));

    let admin = common::admin(connection);
    let error = admin
        .tables()
        .modify_column_families(ModifyColumnFamiliesRequest::new(
            common::table_name(),
            vec![FamilyModification::drop("obsolete")],
        ))
        .unwrap_err();
    assert_eq!(error.code(), Some(StatusCode::Unavailable));
}

#[test]
fn test_drop_rows_by_prefix_sends_the_prefix() {
    let mut connection = MockConnection::new();
    connection
        .expect_drop_row_range()
        .withf(|metadata, request| {
            metadata.request_params() == "name=instances/prod/tables/events"
                && request.target == DropRowsTarget::RowKeyPrefix(b"user-".to_vec())
        })
        .times(1)
        .returning(|_, _| Ok(()));

    let admin = common::admin(connection);
    admin
        .tables()
        .drop_rows_by_prefix(common::table_name(), b"user-".to_vec())
        .unwrap();
}

#[test]
fn test_drop_all_rows_is_not_retried() {
    let mut connection = MockConnection::new();
    connection
        .expect_drop_row_range()
        .withf(|_, request| request.target == DropRowsTarget::AllRows)
        .times(1)
        .returning(|_, _| Err(common::transient()));

    let admin = common::admin(connection);
    let error = admin.tables().drop_all_rows(common::table_name()).unwrap_err();
    assert_eq!(error.code(), Some(StatusCode::Unavailable));
    assert_eq!(
        error.to_string(),
        "dropping rows from instances/prod/tables/events"
    );
}

fn restore_request() -> CreateTableFromSnapshotRequest {
    CreateTableFromSnapshotRequest::new(common::instance(), "restored", common::snapshot_name())
}

fn restored_table() -> Table {
    Table::new(common::instance().table("restored").unwrap())
}

#[test]
fn test_restore_polls_until_the_table_is_ready() {
    let mut connection = MockConnection::new();
    connection
        .expect_create_table_from_snapshot()
        .times(1)
        .returning(|_, _| Ok(Operation::pending(common::operation_name())));

    let mut seq = Sequence::new();
    for _ in 0..2 {
        connection
            .expect_get_operation()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_, _| Ok(Operation::pending(common::operation_name())));
    }
    connection
        .expect_get_operation()
        .withf(|metadata, request| {
            metadata.request_params() == "name=operations/op-1"
                && request.name == common::operation_name()
        })
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Operation::completed(common::operation_name(), &restored_table()));

    let admin = common::admin(connection);
    let table = admin.tables().create_from_snapshot(restore_request()).unwrap();
    assert_eq!(table.name.to_string(), "instances/prod/tables/restored");
}

#[test]
fn test_restore_finishing_inline_skips_polling() {
    let mut connection = MockConnection::new();
    connection
        .expect_create_table_from_snapshot()
        .times(1)
        .returning(|_, _| Operation::completed(common::operation_name(), &restored_table()));
    connection.expect_get_operation().times(0);

    let admin = common::admin(connection);
    let table = admin.tables().create_from_snapshot(restore_request()).unwrap();
    assert_eq!(table.name.to_string(), "instances/prod/tables/restored");
}

#[test]
fn test_restore_retries_the_initiating_call() {
    let mut connection = MockConnection::new();
    let mut seq = Sequence::new();
    connection
        .expect_create_table_from_snapshot()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Err(common::transient()));
    connection
        .expect_create_table_from_snapshot()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Operation::completed(common::operation_name(), &restored_table()));

    let admin = common::admin(connection);
    assert!(admin.tables().create_from_snapshot(restore_request()).is_ok());
}

#[test]
fn test_restore_recovers_from_failed_status_checks() {
    let mut connection = MockConnection::new();
    connection
        .expect_create_table_from_snapshot()
        .times(1)
        .returning(|_, _| Ok(Operation::pending(common::operation_name())));

    let mut seq = Sequence::new();
    connection
        .expect_get_operation()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Err(common::transient()));
    connection
        .expect_get_operation()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Operation::completed(common::operation_name(), &restored_table()));

    let admin = common::admin(connection);
    assert!(admin.tables().create_from_snapshot(restore_request()).is_ok());
}

#[test]
fn test_restore_surfaces_the_operations_own_failure() {
    let mut connection = MockConnection::new();
    connection
        .expect_create_table_from_snapshot()
        .times(1)
        .returning(|_, _| Ok(Operation::pending(common::operation_name())));
    connection.expect_get_operation().times(1).returning(|_, _| {
        Ok(Operation::failed(
            common::operation_name(),
            Status::new(StatusCode::FailedPrecondition, "snapshot expired"),
        ))
    });

    let admin = common::admin(connection);
    let error = admin
        .tables()
        .create_from_snapshot(restore_request())
        .unwrap_err();
    assert_eq!(error.code(), Some(StatusCode::FailedPrecondition));
    assert_eq!(
        error.to_string(),
        "restoring instances/prod/clusters/c1/snapshots/nightly into instances/prod/tables/restored"
    );
}

#[test]
fn test_restore_gives_up_when_the_polling_budget_runs_out() {
    let mut connection = MockConnection::new();
    connection
        .expect_create_table_from_snapshot()
        .times(1)
        .returning(|_, _| Ok(Operation::pending(common::operation_name())));
    connection
        .expect_get_operation()
        .returning(|_, _| Ok(Operation::pending(common::operation_name())));

    let mut config = common::fast_config();
    config.poll_deadline = Duration::from_millis(40);
    let admin = common::admin_with_config(connection, config);

    let error = admin
        .tables()
        .create_from_snapshot(restore_request())
        .unwrap_err();
    match common::root(&error) {
        Error::PollingExhausted { operation, .. } => {
            assert_eq!(operation, "instances/prod/tables/restored");
        }
        other => panic!("expected polling exhausted, got {other:?}"),
    }
}

#[test]
fn test_restore_rejects_invalid_table_ids_before_calling() {
    let connection = MockConnection::new();
    let admin = common::admin(connection);

    let request = CreateTableFromSnapshotRequest::new(
        common::instance(),
        "not a table id",
        common::snapshot_name(),
    );
    let error = admin.tables().create_from_snapshot(request).unwrap_err();
    assert!(matches!(error, Error::InvalidName(_)));
}

#[test]
fn test_tables_accessor_is_shared_across_clones() {
    let admin = common::admin(MockConnection::new());
    let clone: TableAdmin = admin.clone();
    assert!(std::ptr::eq(admin.tables(), clone.tables()));
}
