//! # Observability
//!
//! 可观测性模块：Tracing + Prometheus 指标。
//!
//! ## 功能
//!
//! - Tracing 初始化 (JSON/Pretty/Compact 格式，按 CLI 详细程度选择级别)
//! - Prometheus 指标导出
//! - 节点执行、帧接收、相机超时等采集指标
//! - 信号/数据线程步进耗时聚合
//!
//! ## 使用示例
//!
//! ```ignore
//! use observability::{metrics, LogFormat, ObservabilityConfig};
//!
//! let config = ObservabilityConfig::from_verbosity(1, false, LogFormat::Json);
//! observability::init_with_config(&config)?;
//!
//! metrics::record_node_executed("signal", "LoopByCount");
//! metrics::record_frames_received(&[frame_id]);
//! ```

pub mod metrics;

use anyhow::{Context, Result};
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

// Re-exports
pub use crate::metrics::{
    record_acquisition_finished, record_camera_timeout, record_frames_received,
    record_frames_skipped, record_node_executed, record_node_failure, record_response_delivered,
    AcquisitionMetricsAggregator, MetricsSummary, RunningStats, StatsSummary,
};

/// 日志初始化配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObservabilityConfig {
    /// 日志格式
    pub log_format: LogFormat,
    /// 默认过滤指令 (RUST_LOG 未设置时使用)
    pub default_directive: String,
    /// 是否允许 RUST_LOG 覆盖默认指令
    pub env_override: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_format: LogFormat::Pretty,
            default_directive: "info".to_string(),
            env_override: true,
        }
    }
}

impl ObservabilityConfig {
    /// 按 `-v` 次数与 `--quiet` 选择日志级别
    ///
    /// `quiet` 固定为 `warn`，不受 RUST_LOG 影响。
    pub fn from_verbosity(verbose: u8, quiet: bool, log_format: LogFormat) -> Self {
        if quiet {
            return Self {
                log_format,
                default_directive: "warn".to_string(),
                env_override: false,
            };
        }
        let level = match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        Self {
            log_format,
            default_directive: level.to_string(),
            env_override: true,
        }
    }

    fn filter(&self) -> EnvFilter {
        if self.env_override {
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&self.default_directive))
        } else {
            EnvFilter::new(&self.default_directive)
        }
    }
}

/// 日志格式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// JSON 结构化日志 (含线程名，便于区分 signal/data 线程)
    Json,
    /// 人类可读格式
    #[default]
    Pretty,
    /// 紧凑单行格式
    Compact,
}

/// 初始化全局 tracing subscriber
pub fn init_with_config(config: &ObservabilityConfig) -> Result<()> {
    let fmt_layer = match config.log_format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_thread_names(true)
            .with_file(true)
            .with_line_number(true)
            .boxed(),
        LogFormat::Pretty => fmt::layer().pretty().with_thread_names(true).boxed(),
        LogFormat::Compact => fmt::layer().compact().with_thread_names(true).boxed(),
    };

    tracing_subscriber::registry()
        .with(config.filter())
        .with(fmt_layer)
        .try_init()
        .context("Failed to initialize tracing subscriber")?;

    tracing::debug!(
        log_format = ?config.log_format,
        directive = %config.default_directive,
        "Logging initialized"
    );
    Ok(())
}

/// 仅初始化 Prometheus 指标（不初始化 Tracing）
///
/// 用于 Tracing 已由其他模块初始化的场景。
pub fn init_metrics_only(port: u16) -> Result<()> {
    let builder = PrometheusBuilder::new();
    builder
        .with_http_listener(([0, 0, 0, 0], port))
        .install()
        .context("Failed to install Prometheus recorder")?;

    tracing::info!(port = port, "Prometheus metrics endpoint initialized");
    Ok(())
}
