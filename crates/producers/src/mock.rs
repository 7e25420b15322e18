//! Mock Producer
//!
//! 用于无游戏环境的测试。

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use contracts::{
    AccTelemetry, ControlDirective, DirtRallyTelemetry, ForzaTelemetry, IRacingTelemetry,
    IRacingValue, OutGaugeTelemetry, SourceId, TelemetryFrame, Vector3,
};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::error::ProducerError;
use crate::producer::{next_directive, Producer, ProducerContext};

/// Mock Producer 配置
#[derive(Debug, Clone)]
pub struct MockProducerConfig {
    /// 数据源
    pub source: SourceId,

    /// 发送间隔
    pub interval: Duration,

    /// 发送指定帧数后退出
    pub max_frames: Option<u64>,

    /// 每 N 个 tick 上报一次解码错误（替代该帧）
    pub error_every: Option<u64>,

    /// 是否监听控制通道（默认跟随数据源）
    pub with_control: bool,

    /// 忽略取消和停止指令，用于测试关闭超时
    pub ignore_shutdown: bool,
}

impl MockProducerConfig {
    /// 以固定频率 (Hz) 发送
    pub fn at_rate(source: SourceId, rate_hz: u32) -> Self {
        Self {
            source,
            interval: Duration::from_secs(1) / rate_hz.max(1),
            max_frames: None,
            error_every: None,
            with_control: source.uses_control_channel(),
            ignore_shutdown: false,
        }
    }
}

/// Mock Producer
///
/// 按固定间隔生成模拟遥测帧，并统计收到的停止指令。
pub struct MockProducer {
    config: MockProducerConfig,
    stop_directives: Arc<AtomicU64>,
}

impl MockProducer {
    /// 创建新的 Mock Producer
    pub fn new(config: MockProducerConfig) -> Self {
        Self {
            config,
            stop_directives: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 已收到的停止指令数
    pub fn stop_directives(&self) -> Arc<AtomicU64> {
        self.stop_directives.clone()
    }

    async fn run(self, mut ctx: ProducerContext) {
        let config = self.config;
        let mut control = ctx.control.take();
        let mut ticker = tokio::time::interval(config.interval);
        let mut seq: u64 = 0;

        debug!(
            source = %config.source,
            interval_us = config.interval.as_micros() as u64,
            "mock producer started"
        );

        if config.ignore_shutdown {
            // 持有所有通道不放，直到被 abort
            loop {
                ticker.tick().await;
            }
        }

        loop {
            tokio::select! {
                biased;
                directive = next_directive(&mut control) => {
                    if directive == Some(ControlDirective::Stop) {
                        self.stop_directives.fetch_add(1, Ordering::SeqCst);
                    }
                    break;
                }
                _ = ctx.cancel.cancelled() => break,
                _ = ticker.tick() => {
                    if config.max_frames.is_some_and(|max| seq >= max) {
                        break;
                    }
                    seq += 1;

                    if config.error_every.is_some_and(|n| n > 0 && seq % n == 0) {
                        ctx.report(ProducerError::decode(
                            config.source,
                            format!("mock error at {seq}"),
                        ));
                        continue;
                    }

                    if !ctx.emit(synthetic_frame(config.source, seq)).await {
                        break;
                    }
                    trace!(source = %config.source, seq, "mock frame sent");
                }
            }
        }

        debug!(source = %config.source, seq, "mock producer stopped");
    }
}

impl Producer for MockProducer {
    fn source(&self) -> SourceId {
        self.config.source
    }

    fn wants_control(&self) -> bool {
        self.config.with_control
    }

    fn spawn(self: Box<Self>, ctx: ProducerContext) -> JoinHandle<()> {
        tokio::spawn((*self).run(ctx))
    }
}

/// 为指定数据源生成一帧可转换的模拟数据
pub fn synthetic_frame(source: SourceId, seq: u64) -> TelemetryFrame {
    let captured_at = Utc::now();
    let t = seq as f32;
    match source {
        SourceId::DirtRally2 => TelemetryFrame::DirtRally(DirtRallyTelemetry {
            captured_at,
            run_time: t / 60.0,
            speed: 20.0 + t % 10.0,
            gear: 3.0,
            rpm: 5000.0,
            ..Default::default()
        }),
        SourceId::ForzaHorizon5 | SourceId::ForzaMotorsport2023 => {
            let is_motorsport = source == SourceId::ForzaMotorsport2023;
            TelemetryFrame::Forza(ForzaTelemetry {
                captured_at,
                source,
                is_race_on: true,
                timestamp_ms: seq as u32,
                engine_max_rpm: 8000.0,
                engine_idle_rpm: 900.0,
                current_engine_rpm: 4000.0 + t,
                acceleration: Vector3::default(),
                velocity: Vector3::new(0.0, 0.0, 30.0),
                yaw: 0.0,
                pitch: 0.0,
                roll: 0.0,
                position: Vector3::default(),
                speed: 30.0,
                power: 150_000.0,
                torque: 300.0,
                tire_temp: [80.0; 4],
                boost: 0.0,
                fuel: 0.8,
                distance_traveled: t,
                best_lap: 0.0,
                last_lap: 0.0,
                current_lap: t / 60.0,
                current_race_time: t / 60.0,
                lap_number: 1,
                race_position: 1,
                accel: 200,
                brake: 0,
                clutch: 0,
                handbrake: 0,
                gear: 3,
                steer: 0,
                tire_wear: is_motorsport.then_some([0.1; 4]),
                track_ordinal: is_motorsport.then_some(1),
            })
        }
        SourceId::OutGauge => TelemetryFrame::OutGauge(OutGaugeTelemetry {
            captured_at,
            time: seq as u32,
            car: "mock".to_string(),
            gear: 3,
            speed: 25.0,
            rpm: 4500.0,
            ..Default::default()
        }),
        SourceId::Acc => TelemetryFrame::Acc(AccTelemetry {
            captured_at,
            packet_id: seq as i32,
            gear: 3,
            rpm: 6000,
            speed_kmh: 150.0,
            ..Default::default()
        }),
        SourceId::IRacing => TelemetryFrame::IRacing(IRacingTelemetry {
            captured_at,
            tick: seq as i32,
            variables: [
                ("Speed".to_string(), IRacingValue::Float(40.0)),
                ("Gear".to_string(), IRacingValue::Int(3)),
            ]
            .into_iter()
            .collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::DataFrame;

    #[test]
    fn test_synthetic_frames_convert() {
        for source in SourceId::ALL {
            let frame = synthetic_frame(source, 1);
            assert_eq!(frame.source(), source);
            let df = DataFrame::try_from(&frame).unwrap();
            assert_eq!(df.name, source.as_str());
        }
    }

    #[test]
    fn test_control_follows_source() {
        let acc = MockProducer::new(MockProducerConfig::at_rate(SourceId::Acc, 60));
        let dirt = MockProducer::new(MockProducerConfig::at_rate(SourceId::DirtRally2, 60));
        assert!(acc.wants_control());
        assert!(!dirt.wants_control());
    }
}
