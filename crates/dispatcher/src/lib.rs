//! # Dispatcher
//!
//! 批量投递模块。
//!
//! 负责：
//! - 按阈值 / 定时触发 flush
//! - 按租户切分批次并顺序投递
//! - 投递失败时把未发送记录放回队首
//! - 内置投递目标 (http / file / log / mock)

pub mod deliveries;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod pipeline;
pub mod report;
pub mod requeue;
pub mod scheduler;

pub use contracts::{Batch, Delivery, DeliveryReceipt, Record, SubmitStatus, TenantKey};
pub use deliveries::{
    create_delivery, AnyDelivery, DeliveredBatch, FileDelivery, HttpDelivery, HttpDeliveryConfig,
    LogDelivery, MockDelivery,
};
pub use dispatcher::{BatchDispatcher, DispatchSettings};
pub use error::DispatcherError;
pub use handle::IntervalHandle;
pub use metrics::{MetricsSnapshot, PipelineMetrics};
pub use pipeline::{BatchPipeline, SubmitOutcome};
pub use report::{FlushReport, FlushResult, FlushTrigger, TenantOutcome, TenantReport};
pub use requeue::RequeueManager;
pub use scheduler::FlushScheduler;
