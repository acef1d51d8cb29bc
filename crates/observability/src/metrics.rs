//! 批处理管道指标收集模块
//!
//! 通过 `metrics` facade 记录指标；未安装 recorder 时这些调用是空操作。

use std::collections::HashMap;

use contracts::{SubmitStatus, TenantKey};
use metrics::{counter, gauge, histogram};

/// 记录一次提交结果
pub fn record_submission(tenant: &TenantKey, status: SubmitStatus) {
    counter!(
        "batch_relay_submissions_total",
        "tenant_id" => tenant.tenant_id.to_string(),
        "status" => status.as_str()
    )
    .increment(1);
}

/// 记录当前积压记录数
pub fn record_pending(pending: usize) {
    gauge!("batch_relay_pending_records").set(pending as f64);
}

/// 记录一批投递成功
pub fn record_batch_delivered(tenant: &TenantKey, records: usize, latency_ms: f64) {
    let tenant_id = tenant.tenant_id.to_string();
    counter!("batch_relay_batches_total", "tenant_id" => tenant_id.clone(), "status" => "success")
        .increment(1);
    counter!("batch_relay_records_delivered_total", "tenant_id" => tenant_id).increment(records as u64);
    histogram!("batch_relay_delivery_latency_ms").record(latency_ms);
}

/// 记录一批投递失败
///
/// `reason` 取自 `ContractError::reason()` (rejected / transport / timeout ...)
pub fn record_batch_failed(tenant: &TenantKey, reason: &'static str, latency_ms: f64) {
    counter!(
        "batch_relay_batches_total",
        "tenant_id" => tenant.tenant_id.to_string(),
        "status" => "failure",
        "reason" => reason
    )
    .increment(1);
    histogram!("batch_relay_delivery_latency_ms").record(latency_ms);
}

/// 记录重新入队的记录数
pub fn record_requeued(tenant: &TenantKey, records: usize) {
    counter!(
        "batch_relay_records_requeued_total",
        "tenant_id" => tenant.tenant_id.to_string()
    )
    .increment(records as u64);
}

/// 记录一次 flush 周期
pub fn record_flush_cycle(trigger: &'static str, result: &'static str, duration_ms: f64) {
    counter!(
        "batch_relay_flush_cycles_total",
        "trigger" => trigger,
        "result" => result
    )
    .increment(1);
    histogram!("batch_relay_flush_duration_ms", "trigger" => trigger).record(duration_ms);
}

/// 投递统计聚合器
///
/// 在内存中聚合一次运行的投递结果，便于输出摘要。
#[derive(Debug, Clone, Default)]
pub struct DeliveryStatsAggregator {
    /// 成功批次数
    pub batches_delivered: u64,

    /// 失败批次数
    pub batches_failed: u64,

    /// 成功投递的记录数
    pub records_delivered: u64,

    /// 重新入队的记录数
    pub records_requeued: u64,

    /// 批次延迟统计 (毫秒)
    pub latency_stats: RunningStats,

    /// 各失败原因计数
    pub failure_reasons: HashMap<String, u64>,
}

impl DeliveryStatsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录成功批次
    pub fn observe_delivered(&mut self, records: usize, latency_ms: f64) {
        self.batches_delivered += 1;
        self.records_delivered += records as u64;
        self.latency_stats.push(latency_ms);
    }

    /// 记录失败批次及其随后被重新入队的记录数
    pub fn observe_failed(&mut self, reason: &str, requeued: usize, latency_ms: f64) {
        self.batches_failed += 1;
        self.records_requeued += requeued as u64;
        self.latency_stats.push(latency_ms);
        *self.failure_reasons.entry(reason.to_string()).or_insert(0) += 1;
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        let total = self.batches_delivered + self.batches_failed;
        MetricsSummary {
            batches_delivered: self.batches_delivered,
            batches_failed: self.batches_failed,
            records_delivered: self.records_delivered,
            records_requeued: self.records_requeued,
            failure_rate: if total > 0 {
                self.batches_failed as f64 / total as f64 * 100.0
            } else {
                0.0
            },
            latency_ms: StatsSummary::from(&self.latency_stats),
            failure_reasons: self.failure_reasons.clone(),
        }
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub batches_delivered: u64,
    pub batches_failed: u64,
    pub records_delivered: u64,
    pub records_requeued: u64,
    pub failure_rate: f64,
    pub latency_ms: StatsSummary,
    pub failure_reasons: HashMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Delivery Summary ===")?;
        writeln!(f, "Batches delivered: {}", self.batches_delivered)?;
        writeln!(
            f,
            "Batches failed: {} ({:.2}%)",
            self.batches_failed, self.failure_rate
        )?;
        writeln!(f, "Records delivered: {}", self.records_delivered)?;
        writeln!(f, "Records requeued: {}", self.records_requeued)?;
        writeln!(f, "Batch latency (ms): {}", self.latency_ms)?;

        if !self.failure_reasons.is_empty() {
            writeln!(f, "Failure reasons:")?;
            for (reason, count) in &self.failure_reasons {
                writeln!(f, "  {}: {}", reason, count)?;
            }
        }

        Ok(())
    }
}

/// 统计摘要
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            write!(f, "N/A")
        } else {
            write!(
                f,
                "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
                self.min, self.max, self.mean, self.std_dev, self.count
            )
        }
    }
}

/// 在线统计计算器 (Welford's algorithm)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    /// 添加新值
    pub fn push(&mut self, value: f64) {
        self.count += 1;

        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
        } else {
            self.min = self.min.min(value);
            self.max = self.max.max(value);

            let delta = value - self.mean;
            self.mean += delta / self.count as f64;
            let delta2 = value - self.mean;
            self.m2 += delta * delta2;
        }
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 样本方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_counts() {
        let mut aggregator = DeliveryStatsAggregator::new();

        aggregator.observe_delivered(20, 120.0);
        aggregator.observe_failed("rejected", 25, 80.0);

        let summary = aggregator.summary();
        assert_eq!(summary.batches_delivered, 1);
        assert_eq!(summary.batches_failed, 1);
        assert_eq!(summary.records_delivered, 20);
        assert_eq!(summary.records_requeued, 25);
        assert!((summary.failure_rate - 50.0).abs() < 1e-10);
        assert_eq!(summary.failure_reasons.get("rejected"), Some(&1));
        assert_eq!(summary.latency_ms.count, 2);
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = DeliveryStatsAggregator::new();
        aggregator.observe_delivered(5, 10.0);

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Batches delivered: 1"));
        assert!(output.contains("(0.00%)"));
    }

    #[test]
    fn test_recording_without_recorder_is_noop() {
        let tenant = TenantKey::new("t", "a");
        record_submission(&tenant, SubmitStatus::Accepted);
        record_pending(3);
        record_batch_delivered(&tenant, 3, 1.0);
        record_flush_cycle("threshold", "success", 1.0);
    }
}
