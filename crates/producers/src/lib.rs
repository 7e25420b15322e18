//! # Producers
//!
//! 遥测数据采集模块。
//!
//! 负责：
//! - 监听 UDP 遥测包 (DiRT Rally 2.0 / Forza / OutGauge)
//! - 轮询共享内存页 (ACC / iRacing)
//! - 将解码后的 `TelemetryFrame` 送入有界通道，错误单独上报

pub mod decoders;
pub mod error;
pub mod metrics;
pub mod mock;
pub mod producer;
pub mod registry;
pub mod shared_memory;
pub mod udp;

pub use error::ProducerError;
pub use self::metrics::{ProducerMetrics, ProducerMetricsSnapshot};
pub use mock::{MockProducer, MockProducerConfig};
pub use producer::{
    ChannelOptions, Producer, ProducerContext, ProducerControl, ProducerHandle, ProducerOutputs,
    ShutdownReport,
};
pub use registry::producer_for;
pub use shared_memory::{Page, PageDecoder, SharedMemoryProducer};
pub use udp::{PacketDecoder, UdpProducer};
