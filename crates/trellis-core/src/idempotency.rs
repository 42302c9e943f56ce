//! Idempotency classification for requests and mutations.
//!
//! The retry loop only retries an attempt when repeating it is safe. For
//! most administrative calls that is a fixed property of the call itself,
//! declared at the call site. For row mutations it depends on the shape of
//! the mutation batch, and the rules live in an
//! [`IdempotentMutationPolicy`].

use std::fmt;

/// Whether repeating a request is safe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Idempotency {
    /// Repeating the request with identical inputs produces the same end
    /// state as executing it once.
    Idempotent,
    /// Repeating the request may apply its side effects again.
    NonIdempotent,
}

impl Idempotency {
    /// Whether this classification permits retries.
    pub fn is_idempotent(self) -> bool {
        matches!(self, Idempotency::Idempotent)
    }
}

/// A single change to one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Mutation {
    /// Write a value into one cell.
    SetCell {
        /// Column family name.
        family: String,
        /// Column qualifier within the family.
        qualifier: String,
        /// Cell timestamp in microseconds, or `None` to let the server
        /// assign the current time.
        timestamp_micros: Option<i64>,
        /// Cell contents.
        value: Vec<u8>,
    },
    /// Delete all cells in one column.
    DeleteFromColumn {
        /// Column family name.
        family: String,
        /// Column qualifier within the family.
        qualifier: String,
    },
    /// Delete all cells in one column family.
    DeleteFromFamily {
        /// Column family name.
        family: String,
    },
    /// Delete the whole row.
    DeleteFromRow,
}

impl Mutation {
    /// Write `value` with an explicit, caller-assigned timestamp.
    ///
    /// Callers must not reuse the same timestamp with different values
    /// across retries of distinct logical writes; the retry machinery
    /// treats an explicit timestamp as proof that repeating the write
    /// lands on the same cell with the same contents.
    pub fn set_cell_at(
        family: impl Into<String>,
        qualifier: impl Into<String>,
        timestamp_micros: i64,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Mutation::SetCell {
            family: family.into(),
            qualifier: qualifier.into(),
            timestamp_micros: Some(timestamp_micros),
            value: value.into(),
        }
    }

    /// Write `value` with a server-assigned timestamp.
    ///
    /// Each retry of such a write lands on a different cell, so batches
    /// containing one are not retried under the default policy.
    pub fn set_cell(
        family: impl Into<String>,
        qualifier: impl Into<String>,
        value: impl Into<Vec<u8>>,
    ) -> Self {
        Mutation::SetCell {
            family: family.into(),
            qualifier: qualifier.into(),
            timestamp_micros: None,
            value: value.into(),
        }
    }

    /// Delete all cells in one column.
    pub fn delete_from_column(family: impl Into<String>, qualifier: impl Into<String>) -> Self {
        Mutation::DeleteFromColumn {
            family: family.into(),
            qualifier: qualifier.into(),
        }
    }

    /// Delete all cells in one column family.
    pub fn delete_from_family(family: impl Into<String>) -> Self {
        Mutation::DeleteFromFamily {
            family: family.into(),
        }
    }

    /// Delete the whole row.
    pub fn delete_from_row() -> Self {
        Mutation::DeleteFromRow
    }
}

/// An ordered batch of mutations applied to one row atomically.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MutationBatch {
    mutations: Vec<Mutation>,
}

impl MutationBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a mutation to the batch.
    pub fn push(&mut self, mutation: Mutation) {
        self.mutations.push(mutation);
    }

    /// Iterate over the mutations in application order.
    pub fn iter(&self) -> std::slice::Iter<'_, Mutation> {
        self.mutations.iter()
    }

    /// Number of mutations in the batch.
    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    /// Whether the batch contains no mutations.
    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }
}

impl FromIterator<Mutation> for MutationBatch {
    fn from_iter<I: IntoIterator<Item = Mutation>>(iter: I) -> Self {
        Self {
            mutations: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a MutationBatch {
    type Item = &'a Mutation;
    type IntoIter = std::slice::Iter<'a, Mutation>;

    fn into_iter(self) -> Self::IntoIter {
        self.mutations.iter()
    }
}

/// Decides which mutations are safe to retry.
///
/// Stateless predicates over a mutation's shape. The policy also gets a
/// say on requests whose idempotency is declared at the call site, through
/// [`IdempotentMutationPolicy::effective`].
pub trait IdempotentMutationPolicy: Send + Sync + fmt::Debug {
    /// Whether repeating this single mutation is safe.
    fn is_idempotent(&self, mutation: &Mutation) -> bool;

    /// Classify a whole batch.
    ///
    /// A batch is idempotent iff every mutation in it is; an empty batch
    /// is trivially idempotent.
    fn classify_batch(&self, batch: &MutationBatch) -> Idempotency {
        if batch.iter().all(|m| self.is_idempotent(m)) {
            Idempotency::Idempotent
        } else {
            Idempotency::NonIdempotent
        }
    }

    /// Map a call site's declared idempotency to the one the retry loop
    /// should honor.
    ///
    /// The default keeps the declaration as-is; a policy may widen it.
    fn effective(&self, declared: Idempotency) -> Idempotency {
        declared
    }

    /// A fresh copy of this policy.
    fn clone_policy(&self) -> Box<dyn IdempotentMutationPolicy>;
}

/// The default policy: only mutations that are provably safe are retried.
///
/// Deletes are always idempotent. A [`Mutation::SetCell`] is idempotent
/// iff it carries an explicit caller-assigned timestamp; a server-assigned
/// timestamp would produce a different cell on every retry.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafeIdempotentMutationPolicy;

impl IdempotentMutationPolicy for SafeIdempotentMutationPolicy {
    fn is_idempotent(&self, mutation: &Mutation) -> bool {
        match mutation {
            Mutation::SetCell {
                timestamp_micros, ..
            } => timestamp_micros.is_some(),
            Mutation::DeleteFromColumn { .. }
            | Mutation::DeleteFromFamily { .. }
            | Mutation::DeleteFromRow => true,
        }
    }

    fn clone_policy(&self) -> Box<dyn IdempotentMutationPolicy> {
        Box::new(*self)
    }
}

/// A policy that retries everything.
///
/// Useful for workloads that tolerate duplicate application, for example
/// pipelines whose writes are reconciled downstream. It also upgrades
/// calls declared non-idempotent at the call site.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysRetryMutationPolicy;

impl IdempotentMutationPolicy for AlwaysRetryMutationPolicy {
    fn is_idempotent(&self, _mutation: &Mutation) -> bool {
        true
    }

    fn effective(&self, _declared: Idempotency) -> Idempotency {
        Idempotency::Idempotent
    }

    fn clone_policy(&self) -> Box<dyn IdempotentMutationPolicy> {
        Box::new(*self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deletes_are_idempotent() {
        let policy = SafeIdempotentMutationPolicy;
        let batch: MutationBatch = [
            Mutation::delete_from_column("stats", "daily"),
            Mutation::delete_from_family("stats"),
            Mutation::delete_from_row(),
        ]
        .into_iter()
        .collect();

        assert_eq!(policy.classify_batch(&batch), Idempotency::Idempotent);
    }

    #[test]
    fn test_set_cell_with_timestamp_is_idempotent() {
        let policy = SafeIdempotentMutationPolicy;
        let batch: MutationBatch =
            [Mutation::set_cell_at("stats", "daily", 1_700_000_000_000_000, b"42".to_vec())]
                .into_iter()
                .collect();

        assert_eq!(policy.classify_batch(&batch), Idempotency::Idempotent);
    }

    #[test]
    fn test_server_time_set_cell_is_not_idempotent() {
        let policy = SafeIdempotentMutationPolicy;
        assert!(!policy.is_idempotent(&Mutation::set_cell("stats", "daily", b"42".to_vec())));
    }

    #[test]
    fn test_one_unsafe_mutation_taints_the_batch() {
        let policy = SafeIdempotentMutationPolicy;
        let batch: MutationBatch = [
            Mutation::delete_from_row(),
            Mutation::set_cell_at("stats", "daily", 12345, b"a".to_vec()),
            Mutation::set_cell("stats", "hourly", b"b".to_vec()),
        ]
        .into_iter()
        .collect();

        assert_eq!(policy.classify_batch(&batch), Idempotency::NonIdempotent);
    }

    #[test]
    fn test_empty_batch_is_idempotent() {
        let policy = SafeIdempotentMutationPolicy;
        assert_eq!(
            policy.classify_batch(&MutationBatch::new()),
            Idempotency::Idempotent
        );
    }

    #[test]
    fn test_always_retry_accepts_everything() {
        let policy = AlwaysRetryMutationPolicy;
        let batch: MutationBatch = [Mutation::set_cell("stats", "daily", b"42".to_vec())]
            .into_iter()
            .collect();

        assert_eq!(policy.classify_batch(&batch), Idempotency::Idempotent);
        assert_eq!(
            policy.effective(Idempotency::NonIdempotent),
            Idempotency::Idempotent
        );
    }

    #[test]
    fn test_safe_policy_honors_declared_idempotency() {
        let policy = SafeIdempotentMutationPolicy;
        assert_eq!(
            policy.effective(Idempotency::NonIdempotent),
            Idempotency::NonIdempotent
        );
        assert_eq!(
            policy.effective(Idempotency::Idempotent),
            Idempotency::Idempotent
        );
    }
}
