//! StreamerConfig - Config Loader output
//!
//! Stream tuning, per-source producer settings and the downstream sink.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;
use validator::Validate;

use crate::SourceId;

/// Default target delivery rate (frames per second)
pub const DEFAULT_TARGET_FPS: u32 = 60;

/// Default shared-memory poll interval (1/60 s)
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_nanos(1_000_000_000 / 60);

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete streamer configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct StreamerConfig {
    /// Config version
    #[serde(default)]
    pub version: ConfigVersion,

    /// Supervisor tuning
    #[serde(default)]
    #[validate(nested)]
    pub stream: StreamConfig,

    /// Producer settings per source
    #[serde(default)]
    #[validate(nested)]
    pub sources: SourcesConfig,

    /// Downstream sink
    #[serde(default)]
    pub sink: SinkConfig,
}

/// Supervisor tuning
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct StreamConfig {
    /// Outbound rate target; the throttle interval is `1 / target_fps`
    #[serde(default = "default_target_fps")]
    #[validate(range(min = 1, max = 1000))]
    pub target_fps: u32,

    /// Producer -> supervisor frame channel capacity
    #[serde(default = "default_frame_channel_capacity")]
    #[validate(range(min = 1))]
    pub frame_channel_capacity: usize,

    /// Producer -> supervisor error channel capacity
    #[serde(default = "default_error_channel_capacity")]
    #[validate(range(min = 1))]
    pub error_channel_capacity: usize,

    /// Upper bound on waiting for a producer task after shutdown
    #[serde(default = "default_shutdown_timeout_ms")]
    #[validate(range(min = 1))]
    pub shutdown_timeout_ms: u64,

    /// Upper bound on a single sink delivery
    #[serde(default = "default_sink_timeout_ms")]
    #[validate(range(min = 1))]
    pub sink_timeout_ms: u64,
}

fn default_target_fps() -> u32 {
    DEFAULT_TARGET_FPS
}

fn default_frame_channel_capacity() -> usize {
    64
}

fn default_error_channel_capacity() -> usize {
    16
}

fn default_shutdown_timeout_ms() -> u64 {
    500
}

fn default_sink_timeout_ms() -> u64 {
    1000
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            target_fps: default_target_fps(),
            frame_channel_capacity: default_frame_channel_capacity(),
            error_channel_capacity: default_error_channel_capacity(),
            shutdown_timeout_ms: default_shutdown_timeout_ms(),
            sink_timeout_ms: default_sink_timeout_ms(),
        }
    }
}

impl StreamConfig {
    /// Minimum spacing between two forwarded frames
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs(1) / self.target_fps.max(1)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }

    pub fn sink_timeout(&self) -> Duration {
        Duration::from_millis(self.sink_timeout_ms)
    }
}

/// Producer settings, one entry per source
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SourcesConfig {
    #[serde(default)]
    pub dirt_rally_2: UdpSourceConfig,

    #[serde(default)]
    pub forza_horizon_5: UdpSourceConfig,

    #[serde(default)]
    pub forza_motorsport_2023: UdpSourceConfig,

    #[serde(default)]
    pub outgauge: UdpSourceConfig,

    #[serde(default)]
    #[validate(nested)]
    pub acc: SharedMemorySourceConfig,

    #[serde(default)]
    #[validate(nested)]
    pub iracing: SharedMemorySourceConfig,
}

impl SourcesConfig {
    /// UDP settings for a listener-backed source
    pub fn udp(&self, source: SourceId) -> Option<&UdpSourceConfig> {
        match source {
            SourceId::DirtRally2 => Some(&self.dirt_rally_2),
            SourceId::ForzaHorizon5 => Some(&self.forza_horizon_5),
            SourceId::ForzaMotorsport2023 => Some(&self.forza_motorsport_2023),
            SourceId::OutGauge => Some(&self.outgauge),
            SourceId::Acc | SourceId::IRacing => None,
        }
    }

    /// Shared-memory settings for a polled source
    pub fn shared_memory(&self, source: SourceId) -> Option<&SharedMemorySourceConfig> {
        match source {
            SourceId::Acc => Some(&self.acc),
            SourceId::IRacing => Some(&self.iracing),
            _ => None,
        }
    }

    pub fn is_enabled(&self, source: SourceId) -> bool {
        self.udp(source)
            .map(|c| c.enabled)
            .or_else(|| self.shared_memory(source).map(|c| c.enabled))
            .unwrap_or(false)
    }
}

/// UDP listener source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UdpSourceConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Listen address; falls back to the game's customary port
    #[serde(default)]
    pub bind_addr: Option<String>,
}

impl Default for UdpSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_addr: None,
        }
    }
}

impl UdpSourceConfig {
    /// Effective listen address for `source`
    pub fn resolve_bind_addr(&self, source: SourceId) -> String {
        self.bind_addr
            .clone()
            .unwrap_or_else(|| default_bind_addr(source).to_string())
    }
}

/// Customary listen address per UDP source
pub fn default_bind_addr(source: SourceId) -> &'static str {
    match source {
        SourceId::DirtRally2 => "0.0.0.0:20777",
        SourceId::ForzaHorizon5 => "0.0.0.0:9999",
        SourceId::ForzaMotorsport2023 => "0.0.0.0:5300",
        SourceId::OutGauge => "0.0.0.0:4444",
        SourceId::Acc | SourceId::IRacing => "",
    }
}

/// Shared-memory polled source
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SharedMemorySourceConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Path of the mapped page; falls back to the bridge default
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Poll interval (ms); defaults to 1/60 s
    #[serde(default)]
    #[validate(range(min = 1))]
    pub poll_interval_ms: Option<u64>,
}

impl Default for SharedMemorySourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            poll_interval_ms: None,
        }
    }
}

impl SharedMemorySourceConfig {
    /// Effective page path for `source`
    pub fn resolve_path(&self, source: SourceId) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_shared_memory_path(source)))
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval_ms
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_POLL_INTERVAL)
    }
}

/// Default page location as exposed by a shared-memory bridge on Linux
pub fn default_shared_memory_path(source: SourceId) -> &'static str {
    match source {
        SourceId::Acc => "/dev/shm/acpmf_physics",
        SourceId::IRacing => "/dev/shm/Local\\IRSDKMemMapFileName",
        _ => "",
    }
}

fn default_enabled() -> bool {
    true
}

/// Sink configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Sink name
    pub name: String,

    /// Sink type
    pub sink_type: SinkType,

    /// Type specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            name: "log".to_string(),
            sink_type: SinkType::Log,
            params: HashMap::new(),
        }
    }
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// JSON lines file
    File,
    /// Network output (UDP)
    Network,
}
