//! 特征引擎指标收集模块
//!
//! 记录节点执行、响应交付、帧接收与相机超时等运行指标。

use std::collections::BTreeMap;
use std::time::Duration;

use contracts::FrameId;
use metrics::{counter, gauge, histogram};

/// 记录节点执行
///
/// `side` 为 `"signal"` 或 `"data"`。
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_node_executed;
///
/// let (result, is_end) = node.run(frame_ids)?;
/// record_node_executed("data", node.name());
/// ```
pub fn record_node_executed(side: &str, node: &str) {
    counter!(
        "feature_engine_nodes_executed_total",
        "side" => side.to_string(),
        "node" => node.to_string()
    )
    .increment(1);
}

/// 记录节点回调失败
pub fn record_node_failure(side: &str, node: &str) {
    counter!(
        "feature_engine_node_failures_total",
        "side" => side.to_string(),
        "node" => node.to_string()
    )
    .increment(1);
}

/// 记录响应交付 (数据节点 -> 信号节点)
pub fn record_response_delivered(node: &str, wait: Duration) {
    counter!(
        "feature_engine_responses_total",
        "node" => node.to_string()
    )
    .increment(1);
    histogram!("feature_engine_response_wait_ms").record(wait.as_secs_f64() * 1000.0);
}

/// 记录数据线程收到的帧
pub fn record_frames_received(frame_ids: &[FrameId]) {
    if frame_ids.is_empty() {
        return;
    }
    counter!("feature_engine_frames_received_total").increment(frame_ids.len() as u64);
    if let Some(last) = frame_ids.iter().max() {
        gauge!("feature_engine_last_frame_id").set(*last as f64);
    }
}

/// 记录被跳过的帧 (重同步后属于已完成步骤的帧)
pub fn record_frames_skipped(count: usize) {
    counter!("feature_engine_frames_skipped_total").increment(count as u64);
}

/// 记录相机超时
pub fn record_camera_timeout() {
    counter!("feature_engine_camera_timeouts_total").increment(1);
}

/// 记录采集结束
pub fn record_acquisition_finished(outcome: &str, duration: Duration) {
    counter!(
        "feature_engine_acquisitions_total",
        "outcome" => outcome.to_string()
    )
    .increment(1);
    histogram!("feature_engine_acquisition_duration_s").record(duration.as_secs_f64());
}

/// 采集指标聚合器
///
/// 每个采集线程各持有一个，线程结束后合并。
#[derive(Debug, Clone, Default)]
pub struct AcquisitionMetricsAggregator {
    /// 信号线程步进次数
    pub signal_ticks: u64,

    /// 数据线程步进次数
    pub data_steps: u64,

    /// 跳过的帧数
    pub frames_skipped: u64,

    /// 信号步进耗时 (毫秒)
    pub tick_stats: RunningStats,

    /// 数据步进耗时 (毫秒)
    pub step_stats: RunningStats,

    /// 各节点执行次数
    pub node_counts: BTreeMap<String, u64>,
}

impl AcquisitionMetricsAggregator {
    /// 创建新的聚合器
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一次信号步进
    pub fn record_tick(&mut self, elapsed: Duration) {
        self.signal_ticks += 1;
        self.tick_stats.push(elapsed.as_secs_f64() * 1000.0);
    }

    /// 记录一次数据步进
    pub fn record_step(&mut self, elapsed: Duration) {
        self.data_steps += 1;
        self.step_stats.push(elapsed.as_secs_f64() * 1000.0);
    }

    pub fn record_skipped(&mut self, count: usize) {
        self.frames_skipped += count as u64;
    }

    /// 累加节点执行次数
    pub fn record_node(&mut self, node: &str, runs: u64) {
        *self.node_counts.entry(node.to_string()).or_insert(0) += runs;
    }

    /// 合并另一个线程的统计
    pub fn merge(&mut self, other: &AcquisitionMetricsAggregator) {
        self.signal_ticks += other.signal_ticks;
        self.data_steps += other.data_steps;
        self.frames_skipped += other.frames_skipped;
        self.tick_stats.merge(&other.tick_stats);
        self.step_stats.merge(&other.step_stats);
        for (node, count) in &other.node_counts {
            *self.node_counts.entry(node.clone()).or_insert(0) += count;
        }
    }

    /// 生成摘要报告
    pub fn summary(&self) -> MetricsSummary {
        MetricsSummary {
            signal_ticks: self.signal_ticks,
            data_steps: self.data_steps,
            frames_skipped: self.frames_skipped,
            tick_ms: StatsSummary::from(&self.tick_stats),
            step_ms: StatsSummary::from(&self.step_stats),
            node_counts: self.node_counts.clone(),
        }
    }

    /// 重置统计
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// 指标摘要
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub signal_ticks: u64,
    pub data_steps: u64,
    pub frames_skipped: u64,
    pub tick_ms: StatsSummary,
    pub step_ms: StatsSummary,
    pub node_counts: BTreeMap<String, u64>,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Acquisition Metrics Summary ===")?;
        writeln!(f, "Signal ticks: {}", self.signal_ticks)?;
        writeln!(f, "Data steps: {}", self.data_steps)?;
        writeln!(f, "Frames skipped: {}", self.frames_skipped)?;
        writeln!(f, "Signal tick (ms): {}", self.tick_ms)?;
        writeln!(f, "Data step (ms): {}", self.step_ms)?;

        if !self.node_counts.is_empty() {
            writeln!(f, "Node executions:")?;
            for (node, count) in &self.node_counts {
                writeln!(f, "  {}: {}", node, count)?;
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

    /// 合并两组统计 (Chan 并行算法)
    pub fn merge(&mut self, other: &RunningStats) {
        if other.count == 0 {
            return;
        }
        if self.count == 0 {
            *self = other.clone();
            return;
        }

        let count = self.count + other.count;
        let delta = other.mean - self.mean;
        self.mean += delta * other.count as f64 / count as f64;
        self.m2 += other.m2 + delta * delta * (self.count * other.count) as f64 / count as f64;
        self.min = self.min.min(other.min);
        self.max = self.max.max(other.max);
        self.count = count;
    }

    /// 样本数量
    pub fn count(&self) -> u64 {
        self.count
    }

    /// 均值
    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// 方差
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    /// 标准差
    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    /// 最小值
    pub fn min(&self) -> f64 {
        self.min
    }

    /// 最大值
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

        for value in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(value);
        }

        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_running_stats_merge_matches_sequential() {
        let mut left = RunningStats::default();
        let mut right = RunningStats::default();
        let mut all = RunningStats::default();

        for value in [1.0, 2.0, 3.0] {
            left.push(value);
            all.push(value);
        }
        for value in [4.0, 5.0] {
            right.push(value);
            all.push(value);
        }

        left.merge(&right);
        assert_eq!(left.count(), all.count());
        assert!((left.mean() - all.mean()).abs() < 1e-10);
        assert!((left.variance() - all.variance()).abs() < 1e-10);
        assert!((left.max() - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_merge() {
        let mut signal = AcquisitionMetricsAggregator::new();
        signal.record_tick(Duration::from_millis(2));
        signal.record_node("A", 1);

        let mut data = AcquisitionMetricsAggregator::new();
        data.record_step(Duration::from_millis(4));
        data.record_node("A", 1);
        data.record_skipped(3);

        signal.merge(&data);
        assert_eq!(signal.signal_ticks, 1);
        assert_eq!(signal.data_steps, 1);
        assert_eq!(signal.frames_skipped, 3);
        assert_eq!(signal.node_counts.get("A"), Some(&2));
    }

    #[test]
    fn test_summary_display() {
        let mut aggregator = AcquisitionMetricsAggregator::new();
        aggregator.record_tick(Duration::from_millis(10));
        aggregator.record_node("LoopByCount", 3);

        let output = format!("{}", aggregator.summary());
        assert!(output.contains("Signal ticks: 1"));
        assert!(output.contains("LoopByCount: 3"));
        assert!(output.contains("Data step (ms): N/A"));
    }
}
