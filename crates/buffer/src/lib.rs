//! # Buffer
//!
//! In-memory record buffer shared by all producers.
//!
//! 负责：
//! - 按 `TenantKey` 分组的 FIFO 队列
//! - 基于 `(tenant_id, external_id)` 的去重
//! - 聚合积压计数，驱动阈值 flush
//!
//! ## 使用示例
//!
//! ```ignore
//! use buffer::{EnqueueOutcome, QueueRegistry};
//!
//! let registry = QueueRegistry::new();
//! if let EnqueueOutcome::Accepted { pending } = registry.enqueue(tenant, record).await {
//!     // compare `pending` against the batch size
//! }
//! let snapshot = registry.snapshot_and_clear().await;
//! ```

mod dedup;
mod queue;
mod registry;

pub use dedup::DedupIndex;
pub use queue::TenantQueue;
pub use registry::{EnqueueOutcome, QueueRegistry, Snapshot};

// Re-export contracts types
pub use contracts::{Record, SubmitStatus, TenantKey};
