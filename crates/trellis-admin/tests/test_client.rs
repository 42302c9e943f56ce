//! Client construction: builder overrides, configuration plumbing, and
//! state shared between clones.

mod common;

use common::MockConnection;
use mockall::Sequence;
use trellis_admin::{AdminConfig, Resource, TableAdmin};
use trellis_core::idempotency::{AlwaysRetryMutationPolicy, Idempotency, Mutation, MutationBatch};
use trellis_core::retry::LimitedAttemptCount;
use trellis_core::{Error, StatusCode};
use trellis_protocol::{CreateTableRequest, GetTableRequest, Table, TableConfig};

#[test]
fn test_debug_output_names_the_client_and_instance() {
    let admin = common::admin(MockConnection::new());
    let rendered = format!("{admin:?}");
    assert!(rendered.contains("TableAdmin"));
    assert!(rendered.contains("prod"));
}

#[test]
fn test_builder_retry_policy_override_caps_attempts() {
    let mut connection = MockConnection::new();
    connection
        .expect_get_table()
        .times(1)
        .returning(|_, _| Err(common::transient()));

    let admin = TableAdmin::builder(connection, common::instance())
        .retry_policy(LimitedAttemptCount::new(1))
        .build();

    let error = admin
        .tables()
        .get(GetTableRequest::new(common::table_name()))
        .unwrap_err();
    match common::root(&error) {
        Error::RetriesExhausted { attempts, .. } => assert_eq!(*attempts, 1),
        other => panic!("expected retries exhausted, got {other:?}"),
    }
}

#[test]
fn test_builder_mutation_policy_override_retries_creates() {
    let mut connection = MockConnection::new();
    let mut seq = Sequence::new();
    connection
        .expect_create_table()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, _| Err(common::transient()));
    connection
        .expect_create_table()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_, request| {
            Ok(Table::new(request.parent.table(&request.table_id).unwrap()))
        });

    let admin = TableAdmin::builder(connection, common::instance())
        .config(common::fast_config())
        .mutation_policy(AlwaysRetryMutationPolicy)
        .build();

    let request = CreateTableRequest::new(common::instance(), "events", TableConfig::new());
    assert!(admin.tables().create(request).is_ok());
}

#[test]
fn test_config_attempt_budget_is_honored() {
    let mut connection = MockConnection::new();
    connection
        .expect_get_table()
        .times(2)
        .returning(|_, _| Err(common::transient()));

    let config = AdminConfig::builder()
        .max_attempts(2)
        .initial_backoff(std::time::Duration::from_millis(1))
        .build();
    let admin = common::admin_with_config(connection, config);

    let error = admin
        .tables()
        .get(GetTableRequest::new(common::table_name()))
        .unwrap_err();
    assert_eq!(error.code(), Some(StatusCode::Unavailable));
    match common::root(&error) {
        Error::RetriesExhausted { attempts, .. } => assert_eq!(*attempts, 2),
        other => panic!("expected retries exhausted, got {other:?}"),
    }
}

#[test]
fn test_mutation_policy_is_exposed_for_classification() {
    let admin = common::admin(MockConnection::new());
    let policy = admin.mutation_policy();

    assert!(policy.is_idempotent(&Mutation::set_cell_at("cf", "col", 1_700_000, "v")));
    assert!(!policy.is_idempotent(&Mutation::set_cell("cf", "col", "v")));

    let batch: MutationBatch = [
        Mutation::set_cell_at("cf", "col", 1_700_000, "v"),
        Mutation::set_cell("cf", "col", "v"),
    ]
    .into_iter()
    .collect();
    assert_eq!(policy.classify_batch(&batch), Idempotency::NonIdempotent);
}

#[test]
fn test_resources_link_back_to_their_admin() {
    let admin = common::admin(MockConnection::new());
    assert_eq!(admin.tables().admin().instance(), &common::instance());
    assert_eq!(admin.snapshots().admin().instance(), &common::instance());
}

#[test]
fn test_version_matches_the_package() {
    assert_eq!(trellis_admin::VERSION, env!("CARGO_PKG_VERSION"));
}
