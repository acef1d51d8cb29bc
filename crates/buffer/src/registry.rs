//! QueueRegistry - the single mutual-exclusion boundary of the buffer.
//!
//! All per-tenant queues, the dedup index and the aggregate pending count
//! live behind one lock. Callers only ever see owned snapshots, never the
//! containers themselves.

use std::collections::BTreeMap;

use contracts::{Record, SubmitStatus, TenantKey};
use tokio::sync::Mutex;
use tracing::{debug, instrument, trace};

use crate::dedup::DedupIndex;
use crate::queue::TenantQueue;

/// Result of [`QueueRegistry::enqueue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Record queued; `pending` is the aggregate count right after the append
    Accepted { pending: usize },
    /// Same `(tenant_id, external_id)` was accepted before
    Duplicate,
}

impl EnqueueOutcome {
    pub fn status(&self) -> SubmitStatus {
        match self {
            Self::Accepted { .. } => SubmitStatus::Accepted,
            Self::Duplicate => SubmitStatus::Duplicate,
        }
    }
}

/// Records captured by one flush, grouped by tenant in key order
#[derive(Debug, Default)]
pub struct Snapshot {
    tenants: BTreeMap<TenantKey, Vec<Record>>,
}

impl Snapshot {
    pub fn is_empty(&self) -> bool {
        self.tenants.is_empty()
    }

    /// Number of tenants with captured records
    pub fn tenant_count(&self) -> usize {
        self.tenants.len()
    }

    /// Number of captured records across all tenants
    pub fn record_count(&self) -> usize {
        self.tenants.values().map(Vec::len).sum()
    }

    pub fn get(&self, tenant: &TenantKey) -> Option<&[Record]> {
        self.tenants.get(tenant).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TenantKey, &[Record])> {
        self.tenants.iter().map(|(k, v)| (k, v.as_slice()))
    }
}

impl IntoIterator for Snapshot {
    type Item = (TenantKey, Vec<Record>);
    type IntoIter = std::collections::btree_map::IntoIter<TenantKey, Vec<Record>>;

    fn into_iter(self) -> Self::IntoIter {
        self.tenants.into_iter()
    }
}

#[derive(Debug, Default)]
struct RegistryState {
    queues: BTreeMap<TenantKey, TenantQueue>,
    dedup: DedupIndex,
    /// Always equals the sum of queue lengths; only touched by the methods below
    pending: usize,
}

impl RegistryState {
    fn enqueue(&mut self, tenant: TenantKey, record: Record) -> EnqueueOutcome {
        if let Some(external_id) = record.external_id() {
            if !self.dedup.insert(&tenant.tenant_id, external_id) {
                return EnqueueOutcome::Duplicate;
            }
        }

        self.queues.entry(tenant).or_default().push(record);
        self.pending += 1;

        EnqueueOutcome::Accepted {
            pending: self.pending,
        }
    }

    fn take_snapshot(&mut self) -> Snapshot {
        let tenants = std::mem::take(&mut self.queues)
            .into_iter()
            .filter(|(_, queue)| !queue.is_empty())
            .map(|(tenant, mut queue)| (tenant, queue.take_all()))
            .collect();
        self.pending = 0;
        Snapshot { tenants }
    }

    fn requeue(&mut self, tenant: TenantKey, records: Vec<Record>) {
        if records.is_empty() {
            return;
        }
        self.pending += records.len();
        self.queues.entry(tenant).or_default().prepend(records);
    }

    #[cfg(test)]
    fn queued_total(&self) -> usize {
        self.queues.values().map(TenantQueue::len).sum()
    }
}

/// Owner of every pending record, the dedup index and the aggregate count
#[derive(Debug, Default)]
pub struct QueueRegistry {
    state: Mutex<RegistryState>,
}

impl QueueRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept a record unless its `(tenant_id, external_id)` was seen before.
    ///
    /// The duplicate check and the append share one critical section, so two
    /// concurrent submissions of the same identifier cannot both be accepted.
    #[instrument(
        name = "registry_enqueue",
        skip(self, record),
        fields(tenant = %tenant)
    )]
    pub async fn enqueue(&self, tenant: TenantKey, record: Record) -> EnqueueOutcome {
        let outcome = self.state.lock().await.enqueue(tenant, record);
        trace!(?outcome, "Enqueue");
        outcome
    }

    /// Capture and empty every tenant queue, resetting the pending count.
    ///
    /// Records enqueued after this returns belong to the next snapshot.
    #[instrument(name = "registry_snapshot_and_clear", skip(self))]
    pub async fn snapshot_and_clear(&self) -> Snapshot {
        let snapshot = self.state.lock().await.take_snapshot();
        debug!(
            tenants = snapshot.tenant_count(),
            records = snapshot.record_count(),
            "Snapshot taken"
        );
        snapshot
    }

    /// Put undelivered records back ahead of anything queued for the tenant.
    #[instrument(
        name = "registry_requeue",
        skip(self, records),
        fields(tenant = %tenant, records = records.len())
    )]
    pub async fn requeue(&self, tenant: TenantKey, records: Vec<Record>) {
        self.state.lock().await.requeue(tenant, records);
    }

    /// Records waiting across all tenants
    pub async fn pending_count(&self) -> usize {
        self.state.lock().await.pending
    }

    /// Records waiting for one tenant
    pub async fn tenant_len(&self, tenant: &TenantKey) -> usize {
        self.state
            .lock()
            .await
            .queues
            .get(tenant)
            .map_or(0, TenantQueue::len)
    }

    /// Copy of one tenant's pending records in delivery order
    pub async fn tenant_records(&self, tenant: &TenantKey) -> Vec<Record> {
        self.state
            .lock()
            .await
            .queues
            .get(tenant)
            .map(|queue| queue.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Tenants with at least one pending record
    pub async fn tenant_count(&self) -> usize {
        self.state
            .lock()
            .await
            .queues
            .values()
            .filter(|queue| !queue.is_empty())
            .count()
    }

    /// Number of `(tenant_id, external_id)` pairs ever accepted
    pub async fn dedup_len(&self) -> usize {
        self.state.lock().await.dedup.len()
    }
}
