//! Flush cycle reports

use std::fmt;
use std::time::Duration;

use contracts::TenantKey;

use crate::error::DispatcherError;

/// What started a flush cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// Pending count reached the batch size during a submit
    Threshold,
    /// Periodic background task
    Interval,
    /// Explicit call (shutdown drain, status tooling)
    Manual,
}

impl FlushTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Threshold => "threshold",
            Self::Interval => "interval",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How one tenant's share of a flush cycle ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TenantOutcome {
    /// Every batch was accepted downstream
    Delivered { batches: usize, records: usize },
    /// Batch `failed_batch` (zero-based) failed; it and every later batch
    /// were requeued
    Failed {
        delivered_batches: usize,
        delivered_records: usize,
        failed_batch: usize,
        total_batches: usize,
        requeued: usize,
        /// Status code of the failed call; `None` when there was no response
        status: Option<u16>,
        error: String,
    },
}

/// Per-tenant result within a flush cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TenantReport {
    pub tenant: TenantKey,
    pub outcome: TenantOutcome,
}

impl TenantReport {
    pub fn is_delivered(&self) -> bool {
        matches!(self.outcome, TenantOutcome::Delivered { .. })
    }

    pub fn delivered_records(&self) -> usize {
        match self.outcome {
            TenantOutcome::Delivered { records, .. } => records,
            TenantOutcome::Failed {
                delivered_records, ..
            } => delivered_records,
        }
    }

    pub fn requeued(&self) -> usize {
        match self.outcome {
            TenantOutcome::Delivered { .. } => 0,
            TenantOutcome::Failed { requeued, .. } => requeued,
        }
    }
}

/// Overall result of a flush cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushResult {
    /// Snapshot was empty; nothing sent
    Empty,
    /// Every tenant's batches were delivered
    Success,
    /// At least one tenant failed; the others count as fully delivered
    PartialFailure,
}

impl FlushResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Success => "success",
            Self::PartialFailure => "partial_failure",
        }
    }
}

/// Result of one snapshot → send → (requeue) cycle
#[derive(Debug, Clone)]
pub struct FlushReport {
    pub trigger: FlushTrigger,
    pub tenants: Vec<TenantReport>,
    pub duration: Duration,
}

impl FlushReport {
    pub fn empty(trigger: FlushTrigger) -> Self {
        Self {
            trigger,
            tenants: Vec::new(),
            duration: Duration::ZERO,
        }
    }

    pub fn result(&self) -> FlushResult {
        if self.tenants.is_empty() {
            FlushResult::Empty
        } else if self.tenants.iter().all(TenantReport::is_delivered) {
            FlushResult::Success
        } else {
            FlushResult::PartialFailure
        }
    }

    /// `true` unless some tenant failed
    pub fn is_success(&self) -> bool {
        self.result() != FlushResult::PartialFailure
    }

    pub fn failed_tenants(&self) -> Vec<&TenantKey> {
        self.tenants
            .iter()
            .filter(|report| !report.is_delivered())
            .map(|report| &report.tenant)
            .collect()
    }

    pub fn tenant(&self, tenant: &TenantKey) -> Option<&TenantReport> {
        self.tenants.iter().find(|report| &report.tenant == tenant)
    }

    pub fn records_delivered(&self) -> usize {
        self.tenants.iter().map(TenantReport::delivered_records).sum()
    }

    pub fn records_requeued(&self) -> usize {
        self.tenants.iter().map(TenantReport::requeued).sum()
    }

    /// Turn a partial failure into [`DispatcherError::DeliveryFailed`]
    pub fn into_result(self) -> Result<Self, DispatcherError> {
        if self.is_success() {
            Ok(self)
        } else {
            Err(DispatcherError::DeliveryFailed {
                tenants: self
                    .failed_tenants()
                    .into_iter()
                    .map(ToString::to_string)
                    .collect(),
            })
        }
    }
}
