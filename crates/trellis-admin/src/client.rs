//! The `TableAdmin` client: policy prototypes plus lazy resource
//! accessors over one [`AdminConnection`].

use std::fmt;
use std::sync::{Arc, OnceLock};

use trellis_core::idempotency::{Idempotency, IdempotentMutationPolicy};
use trellis_core::polling::PollingPolicy;
use trellis_core::retry::{BackoffPolicy, RetryPolicy};
use trellis_protocol::InstanceName;

use crate::config::AdminConfig;
use crate::connection::AdminConnection;
use crate::resources::{ConsistencyTokens, Snapshots, Tables};

/// Administrative client for one Trellis instance.
///
/// The client owns a connection plus one prototype of each policy.
/// Every operation it issues gets fresh clones of the prototypes, so
/// concurrent operations never share retry state, and the client itself
/// is cheap to clone and share across threads.
///
/// # Example
///
/// ```rust,no_run
/// use trellis_admin::{AdminConfig, CreateTableRequest, InstanceName, TableAdmin, TableConfig};
///
/// # fn demo(connection: impl trellis_admin::AdminConnection + 'static) -> trellis_admin::Result<()> {
/// let instance = InstanceName::new("prod")?;
/// let admin = TableAdmin::builder(connection, instance.clone())
///     .config(AdminConfig::builder().max_attempts(5).build())
///     .build();
///
/// let request = CreateTableRequest::new(instance, "events", TableConfig::new());
/// let table = admin.tables().create(request)?;
/// println!("created {}", table.name);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct TableAdmin {
    inner: Arc<AdminInner>,
}

struct AdminInner {
    connection: Arc<dyn AdminConnection>,
    instance: InstanceName,
    retry: Box<dyn RetryPolicy>,
    backoff: Box<dyn BackoffPolicy>,
    polling: Box<dyn PollingPolicy>,
    mutations: Box<dyn IdempotentMutationPolicy>,
    tables: OnceLock<Tables>,
    snapshots: OnceLock<Snapshots>,
    consistency: OnceLock<ConsistencyTokens>,
}

impl TableAdmin {
    /// Create a client with default configuration.
    pub fn new(connection: impl AdminConnection + 'static, instance: InstanceName) -> Self {
        Self::builder(connection, instance).build()
    }

    /// Create a builder for a client with custom policies.
    pub fn builder(
        connection: impl AdminConnection + 'static,
        instance: InstanceName,
    ) -> TableAdminBuilder {
        TableAdminBuilder {
            connection: Arc::new(connection),
            instance,
            config: AdminConfig::default(),
            retry: None,
            backoff: None,
            polling: None,
            mutations: None,
        }
    }

    /// The instance this client administers.
    pub fn instance(&self) -> &InstanceName {
        &self.inner.instance
    }

    /// The configured mutation idempotency policy.
    ///
    /// Exposed so data-plane callers can classify their own batches
    /// under the same rules the client applies to administrative calls.
    pub fn mutation_policy(&self) -> &dyn IdempotentMutationPolicy {
        self.inner.mutations.as_ref()
    }

    /// Table operations: create, get, list, delete, schema changes,
    /// row drops, and restore from snapshot.
    pub fn tables(&self) -> &Tables {
        self.inner.tables.get_or_init(|| Tables::new(self.clone()))
    }

    /// Snapshot operations: create, get, list, delete.
    pub fn snapshots(&self) -> &Snapshots {
        self.inner
            .snapshots
            .get_or_init(|| Snapshots::new(self.clone()))
    }

    /// Replication consistency operations: token generation, checks,
    /// and waiting for consistency.
    pub fn consistency(&self) -> &ConsistencyTokens {
        self.inner
            .consistency
            .get_or_init(|| ConsistencyTokens::new(self.clone()))
    }

    pub(crate) fn connection(&self) -> &Arc<dyn AdminConnection> {
        &self.inner.connection
    }

    pub(crate) fn retry_prototype(&self) -> &dyn RetryPolicy {
        self.inner.retry.as_ref()
    }

    pub(crate) fn backoff_prototype(&self) -> &dyn BackoffPolicy {
        self.inner.backoff.as_ref()
    }

    pub(crate) fn polling_prototype(&self) -> &dyn PollingPolicy {
        self.inner.polling.as_ref()
    }

    /// Map a call site's declared idempotency through the configured
    /// mutation policy.
    pub(crate) fn effective(&self, declared: Idempotency) -> Idempotency {
        self.inner.mutations.effective(declared)
    }
}

impl fmt::Debug for TableAdmin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TableAdmin")
            .field("instance", &self.inner.instance)
            .field("connection", &self.inner.connection)
            .field("retry", &self.inner.retry)
            .field("backoff", &self.inner.backoff)
            .field("polling", &self.inner.polling)
            .field("mutations", &self.inner.mutations)
            .finish_non_exhaustive()
    }
}

/// Builder for a [`TableAdmin`] client.
///
/// Starts from [`AdminConfig::default`]; a [`config`] call swaps in a
/// whole configuration, and the policy setters override whatever the
/// configuration would have produced for that one policy.
///
/// [`config`]: TableAdminBuilder::config
pub struct TableAdminBuilder {
    connection: Arc<dyn AdminConnection>,
    instance: InstanceName,
    config: AdminConfig,
    retry: Option<Box<dyn RetryPolicy>>,
    backoff: Option<Box<dyn BackoffPolicy>>,
    polling: Option<Box<dyn PollingPolicy>>,
    mutations: Option<Box<dyn IdempotentMutationPolicy>>,
}

impl TableAdminBuilder {
    /// Use this configuration instead of the defaults.
    pub fn config(mut self, config: AdminConfig) -> Self {
        self.config = config;
        self
    }

    /// Override the retry policy prototype.
    pub fn retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry = Some(Box::new(policy));
        self
    }

    /// Override the backoff policy prototype.
    pub fn backoff_policy(mut self, policy: impl BackoffPolicy + 'static) -> Self {
        self.backoff = Some(Box::new(policy));
        self
    }

    /// Override the polling policy prototype.
    pub fn polling_policy(mut self, policy: impl PollingPolicy + 'static) -> Self {
        self.polling = Some(Box::new(policy));
        self
    }

    /// Override the mutation idempotency policy.
    pub fn mutation_policy(mut self, policy: impl IdempotentMutationPolicy + 'static) -> Self {
        self.mutations = Some(Box::new(policy));
        self
    }

    /// Build the client.
    ///
    /// # Panics
    ///
    /// Panics if the configuration describes an impossible policy, for
    /// example a zero attempt limit.
    pub fn build(self) -> TableAdmin {
        let retry = self.retry.unwrap_or_else(|| self.config.retry_policy());
        let backoff = self
            .backoff
            .unwrap_or_else(|| self.config.backoff_policy());
        let polling = self
            .polling
            .unwrap_or_else(|| self.config.polling_policy());
        let mutations = self
            .mutations
            .unwrap_or_else(|| self.config.mutation_policy());

        TableAdmin {
            inner: Arc::new(AdminInner {
                connection: self.connection,
                instance: self.instance,
                retry,
                backoff,
                polling,
                mutations,
                tables: OnceLock::new(),
                snapshots: OnceLock::new(),
                consistency: OnceLock::new(),
            }),
        }
    }
}
