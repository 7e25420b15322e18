//! Session 指标收集模块
//!
//! 记录遥测流会话的帧计数、节流、转换失败和下游投递指标。

use metrics::{counter, gauge, histogram};

/// 记录会话开始
///
/// # Example
///
/// ```ignore
/// use observability::metrics::{record_session_ended, record_session_started};
///
/// record_session_started("acc");
/// // ... 会话运行 ...
/// record_session_ended("acc");
/// ```
pub fn record_session_started(source: &str) {
    counter!("simracing_sessions_total", "source" => source.to_string()).increment(1);
    gauge!("simracing_sessions_active").increment(1.0);
}

/// 记录会话结束
pub fn record_session_ended(source: &str) {
    gauge!("simracing_sessions_active").decrement(1.0);
    counter!("simracing_sessions_ended_total", "source" => source.to_string()).increment(1);
}

/// 记录 Producer 产生的遥测帧
pub fn record_frame_received(source: &str) {
    counter!("simracing_frames_received_total", "source" => source.to_string()).increment(1);
}

/// 记录被节流丢弃的帧
pub fn record_frame_throttled(source: &str) {
    counter!("simracing_frames_throttled_total", "source" => source.to_string()).increment(1);
}

/// 记录转换失败的帧
pub fn record_conversion_failure(source: &str) {
    counter!("simracing_conversion_failures_total", "source" => source.to_string())
        .increment(1);
}

/// 记录 Producer 上报的错误
pub fn record_producer_error(source: &str) {
    counter!("simracing_producer_errors_reported_total", "source" => source.to_string())
        .increment(1);
}

/// 记录帧投递到 sink
pub fn record_frame_forwarded(sink_name: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "simracing_frames_forwarded_total",
        "sink" => sink_name.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// 记录单次 sink 投递耗时
pub fn record_sink_latency_ms(sink_name: &str, latency_ms: f64) {
    histogram!("simracing_sink_latency_ms", "sink" => sink_name.to_string()).record(latency_ms);
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
