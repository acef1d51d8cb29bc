//! PipelineConfig - Config Loader 输出
//!
//! 描述批处理参数 (batch size / 间隔 / 超时) 与下游投递目标。

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use validator::Validate;

/// 配置版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// 完整的管道配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PipelineConfig {
    /// 配置版本
    #[serde(default)]
    pub version: ConfigVersion,

    /// 批处理参数
    #[serde(default)]
    #[validate(nested)]
    pub batching: BatchingConfig,

    /// 下游投递目标
    #[validate(nested)]
    pub delivery: DeliveryConfig,
}

/// 批处理参数
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BatchingConfig {
    /// 每批最大记录数，同时也是触发 flush 的积压阈值
    #[serde(default = "default_batch_size")]
    #[validate(range(min = 1))]
    pub batch_size: usize,

    /// 同一 tenant 相邻两批之间的等待时间 (毫秒)
    #[serde(default = "default_wait_interval_ms")]
    pub wait_interval_ms: u64,

    /// 周期性 flush 的间隔 (毫秒)
    #[serde(default = "default_flush_interval_ms")]
    #[validate(range(min = 1))]
    pub flush_interval_ms: u64,

    /// 单次投递调用的超时 (毫秒)
    #[serde(default = "default_delivery_timeout_ms")]
    #[validate(range(min = 1))]
    pub delivery_timeout_ms: u64,
}

impl BatchingConfig {
    pub fn wait_interval(&self) -> Duration {
        Duration::from_millis(self.wait_interval_ms)
    }

    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }
}

impl Default for BatchingConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            wait_interval_ms: default_wait_interval_ms(),
            flush_interval_ms: default_flush_interval_ms(),
            delivery_timeout_ms: default_delivery_timeout_ms(),
        }
    }
}

fn default_batch_size() -> usize {
    20
}

fn default_wait_interval_ms() -> u64 {
    600
}

fn default_flush_interval_ms() -> u64 {
    30_000
}

fn default_delivery_timeout_ms() -> u64 {
    15_000
}

/// 投递目标配置
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct DeliveryConfig {
    /// 目标名称 (用于日志/指标)
    #[validate(length(min = 1))]
    pub name: String,

    /// 目标类型
    pub delivery_type: DeliveryType,

    /// 类型特定参数
    #[serde(default)]
    pub params: HashMap<String, String>,
}

/// 投递目标类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryType {
    /// HTTP POST (JSON)
    Http,
    /// 追加写入 NDJSON 文件
    File,
    /// 仅记录日志
    Log,
}

impl DeliveryType {
    /// 该类型必须提供的参数
    pub fn required_params(&self) -> &'static [&'static str] {
        match self {
            Self::Http => &["url"],
            Self::File => &["path"],
            Self::Log => &[],
        }
    }
}
