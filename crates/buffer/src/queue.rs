//! Per-tenant FIFO of pending records.

use std::collections::VecDeque;

use contracts::Record;

/// Ordered pending records of one tenant
#[derive(Debug, Default)]
pub struct TenantQueue {
    records: VecDeque<Record>,
}

impl TenantQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a newly accepted record
    #[inline]
    pub fn push(&mut self, record: Record) {
        self.records.push_back(record);
    }

    /// Put previously snapshotted records back in front of everything queued,
    /// keeping their relative order
    pub fn prepend(&mut self, records: Vec<Record>) {
        if self.records.is_empty() {
            self.records = VecDeque::from(records);
            return;
        }
        for record in records.into_iter().rev() {
            self.records.push_front(record);
        }
    }

    /// Remove and return every record in arrival order
    pub fn take_all(&mut self) -> Vec<Record> {
        std::mem::take(&mut self.records).into()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
