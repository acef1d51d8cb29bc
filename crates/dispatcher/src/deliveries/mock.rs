//! MockDelivery - in-memory delivery target with failure injection
//!
//! Keeps every accepted batch so callers can inspect exactly what went
//! downstream. Used by tests and by `--dry-run` style tooling.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use contracts::{Batch, ContractError, Delivery, DeliveryReceipt, Record, TenantKey};
use tracing::debug;

/// A batch accepted by [`MockDelivery`]
#[derive(Debug, Clone, PartialEq)]
pub struct DeliveredBatch {
    pub tenant: TenantKey,
    pub records: Vec<Record>,
    pub index: usize,
    pub total: usize,
}

/// Delivery target that records batches instead of sending them
#[derive(Debug)]
pub struct MockDelivery {
    name: String,
    calls: AtomicUsize,
    failing: AtomicBool,
    latency: Duration,
    fail_once: Mutex<HashSet<(TenantKey, usize)>>,
    delivered: Mutex<Vec<DeliveredBatch>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockDelivery {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            latency: Duration::ZERO,
            fail_once: Mutex::new(HashSet::new()),
            delivered: Mutex::new(Vec::new()),
        }
    }

    /// Simulate downstream latency on every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Reject every call while `failing` is set (simulated outage)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Reject the next attempt of batch `index` (zero-based) for `tenant`
    pub fn fail_once(&self, tenant: TenantKey, index: usize) {
        lock(&self.fail_once).insert((tenant, index));
    }

    /// Number of delivery calls, successful or not
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every accepted batch in acceptance order
    pub fn delivered(&self) -> Vec<DeliveredBatch> {
        lock(&self.delivered).clone()
    }

    /// Accepted records of one tenant, concatenated in acceptance order
    pub fn delivered_records(&self, tenant: &TenantKey) -> Vec<Record> {
        lock(&self.delivered)
            .iter()
            .filter(|batch| &batch.tenant == tenant)
            .flat_map(|batch| batch.records.iter().cloned())
            .collect()
    }

    fn should_fail(&self, tenant: &TenantKey, index: usize) -> bool {
        if self.failing.load(Ordering::SeqCst) {
            return true;
        }
        lock(&self.fail_once).remove(&(tenant.clone(), index))
    }

    fn accept(&self, batch: &Batch<'_>) {
        lock(&self.delivered).push(DeliveredBatch {
            tenant: batch.tenant.clone(),
            records: batch.records.to_vec(),
            index: batch.index,
            total: batch.total,
        });
    }
}

impl Delivery for MockDelivery {
    fn name(&self) -> &str {
        &self.name
    }

    async fn deliver(&self, batch: Batch<'_>) -> Result<DeliveryReceipt, ContractError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        if self.should_fail(batch.tenant, batch.index) {
            debug!(target_name = %self.name, call, %batch, "Simulated delivery failure");
            return Err(ContractError::delivery_rejected(
                &self.name,
                503,
                format!("simulated failure on call {call}"),
            ));
        }

        self.accept(&batch);
        Ok(DeliveryReceipt::with_status(200))
    }
}
