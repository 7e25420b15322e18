//! TelemetryFrame - Producer 输出
//!
//! 各模拟器解码后的归一化遥测数据。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SourceId;

/// 遥测帧
///
/// 每个 Session 只有一个 Producer 产生帧；帧创建后不可变。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryFrame {
    /// DiRT Rally 2.0 UDP 数据
    DirtRally(DirtRallyTelemetry),

    /// Forza Horizon 5 / Forza Motorsport 2023 UDP 数据
    Forza(ForzaTelemetry),

    /// OutGauge (LFS / BeamNG) UDP 数据
    OutGauge(OutGaugeTelemetry),

    /// ACC 共享内存物理页
    Acc(AccTelemetry),

    /// iRacing 共享内存变量
    IRacing(IRacingTelemetry),
}

impl TelemetryFrame {
    /// 采集时间
    pub fn captured_at(&self) -> DateTime<Utc> {
        match self {
            Self::DirtRally(t) => t.captured_at,
            Self::Forza(t) => t.captured_at,
            Self::OutGauge(t) => t.captured_at,
            Self::Acc(t) => t.captured_at,
            Self::IRacing(t) => t.captured_at,
        }
    }

    /// 产生该帧的数据源
    pub fn source(&self) -> SourceId {
        match self {
            Self::DirtRally(_) => SourceId::DirtRally2,
            Self::Forza(t) => t.source,
            Self::OutGauge(_) => SourceId::OutGauge,
            Self::Acc(_) => SourceId::Acc,
            Self::IRacing(_) => SourceId::IRacing,
        }
    }
}

/// DiRT Rally 2.0 遥测 (extradata=3)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DirtRallyTelemetry {
    pub captured_at: DateTime<Utc>,

    /// 本次运行时间 (s)
    pub run_time: f32,
    /// 单圈时间 (s)
    pub lap_time: f32,
    /// 单圈距离 (m)
    pub lap_distance: f32,
    /// 赛段进度 (0..1)
    pub progress: f32,

    pub position: Vector3,
    /// 速度 (m/s)
    pub speed: f32,

    /// 悬挂位置 [RL, RR, FL, FR]
    pub suspension_position: [f32; 4],
    /// 轮速 [RL, RR, FL, FR]
    pub wheel_speed: [f32; 4],

    pub throttle: f32,
    pub steering: f32,
    pub brake: f32,
    pub clutch: f32,
    /// 档位 (-1 倒档, 0 空档)
    pub gear: f32,

    pub g_force_lat: f32,
    pub g_force_lon: f32,

    pub current_lap: f32,
    /// 发动机转速 (rpm，已换算)
    pub rpm: f32,
    pub car_position: f32,
    pub total_laps: f32,
    pub max_rpm: f32,
    pub max_gears: f32,
}

/// Forza 遥测 (sled + dash)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForzaTelemetry {
    pub captured_at: DateTime<Utc>,

    /// FH5 或 FM2023
    pub source: SourceId,

    pub is_race_on: bool,
    pub timestamp_ms: u32,

    pub engine_max_rpm: f32,
    pub engine_idle_rpm: f32,
    pub current_engine_rpm: f32,

    pub acceleration: Vector3,
    pub velocity: Vector3,

    pub yaw: f32,
    pub pitch: f32,
    pub roll: f32,

    pub position: Vector3,
    /// 速度 (m/s)
    pub speed: f32,
    /// 功率 (W)
    pub power: f32,
    /// 扭矩 (Nm)
    pub torque: f32,

    /// 胎温 [FL, FR, RL, RR]
    pub tire_temp: [f32; 4],

    pub boost: f32,
    pub fuel: f32,
    pub distance_traveled: f32,

    pub best_lap: f32,
    pub last_lap: f32,
    pub current_lap: f32,
    pub current_race_time: f32,

    pub lap_number: u16,
    pub race_position: u8,

    /// 0..255
    pub accel: u8,
    pub brake: u8,
    pub clutch: u8,
    pub handbrake: u8,
    pub gear: u8,
    /// -127..127
    pub steer: i8,

    /// 仅 FM2023：胎耗 [FL, FR, RL, RR]
    pub tire_wear: Option<[f32; 4]>,
    /// 仅 FM2023：赛道编号
    pub track_ordinal: Option<i32>,
}

/// OutGauge 遥测
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutGaugeTelemetry {
    pub captured_at: DateTime<Utc>,

    /// 游戏内时间 (ms)
    pub time: u32,
    pub car: String,
    pub flags: u16,
    /// 0 = R, 1 = N, 2 = 1 档
    pub gear: u8,
    pub player_id: u8,

    /// 速度 (m/s)
    pub speed: f32,
    pub rpm: f32,
    /// 涡轮 (bar)
    pub turbo: f32,
    pub engine_temp: f32,
    /// 油量 (0..1)
    pub fuel: f32,
    pub oil_pressure: f32,
    pub oil_temp: f32,

    pub dash_lights: u32,
    pub show_lights: u32,

    pub throttle: f32,
    pub brake: f32,
    pub clutch: f32,

    pub display1: String,
    pub display2: String,

    /// 可选 ID (96 字节包)
    pub id: Option<i32>,
}

/// ACC 物理页
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccTelemetry {
    pub captured_at: DateTime<Utc>,

    pub packet_id: i32,
    pub gas: f32,
    pub brake: f32,
    pub fuel: f32,
    /// 0 = R, 1 = N, 2 = 1 档
    pub gear: i32,
    pub rpm: i32,
    pub steer_angle: f32,
    pub speed_kmh: f32,
    pub velocity: Vector3,
    /// 加速度 (G)
    pub acc_g: Vector3,
    pub heading: f32,
    pub pitch: f32,
    pub roll: f32,
}

/// iRacing 变量快照
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IRacingTelemetry {
    pub captured_at: DateTime<Utc>,

    /// 数据缓冲区 tick
    pub tick: i32,

    /// 变量名 -> 值
    pub variables: BTreeMap<String, IRacingValue>,
}

/// iRacing 标量变量值
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IRacingValue {
    Bool(bool),
    Int(i32),
    Float(f32),
    Double(f64),
}

/// 3D 向量
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vector3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vector3 {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}
