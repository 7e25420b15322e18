//! # Supervisor
//!
//! 单会话遥测流监管模块。
//!
//! 负责：
//! - 按数据源标识启动唯一的 producer
//! - 在单一事件循环中汇聚帧、错误与取消信号
//! - 以丢弃方式限速 (默认 60 fps)，不排队、不延迟
//! - 取消时向需要的 producer 发送一次停止指令并有界等待其退出

pub mod error;
pub mod metrics;
pub mod rate_limiter;
pub mod session;
pub mod sinks;
mod supervisor;

pub use contracts::{FrameSink, PublishStatus, SessionState};
pub use error::SupervisorError;
pub use metrics::{MetricsSnapshot, SessionMetrics};
pub use rate_limiter::{RateLimiter, Throttle, DEFAULT_FRAME_INTERVAL};
pub use session::{subscribe, subscribe_with_producer, SessionHandle};
pub use sinks::{create_sink, AnySink, FileSink, LogSink, NetworkSink};
pub use supervisor::SessionReport;
