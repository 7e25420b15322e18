//! DataFrame - sink wire shape
//!
//! A flat, ordered set of named values plus a capture time. Every
//! `TelemetryFrame` variant converts into it at a single point.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    AccTelemetry, ContractError, DirtRallyTelemetry, ForzaTelemetry, IRacingTelemetry,
    IRacingValue, OutGaugeTelemetry, TelemetryFrame, Vector3,
};

/// A single field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Flag(bool),
    Integer(i64),
    Number(f64),
    Text(String),
}

/// Named field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
}

/// Frame handed to a `FrameSink`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataFrame {
    /// Source identifier the frame came from
    pub name: String,

    /// Capture time of the underlying sample
    pub time: DateTime<Utc>,

    /// Fields in producer order
    pub fields: Vec<Field>,
}

impl DataFrame {
    /// Create an empty frame
    pub fn new(name: impl Into<String>, time: DateTime<Utc>) -> Self {
        Self {
            name: name.into(),
            time,
            fields: Vec::new(),
        }
    }

    /// Look up a field by name
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    fn number(&mut self, name: &str, value: impl Into<f64>) -> &mut Self {
        self.push(name, FieldValue::Number(value.into()))
    }

    fn integer(&mut self, name: &str, value: impl Into<i64>) -> &mut Self {
        self.push(name, FieldValue::Integer(value.into()))
    }

    fn flag(&mut self, name: &str, value: bool) -> &mut Self {
        self.push(name, FieldValue::Flag(value))
    }

    fn text(&mut self, name: &str, value: &str) -> &mut Self {
        self.push(name, FieldValue::Text(value.to_string()))
    }

    fn vector(&mut self, prefix: &str, v: Vector3) -> &mut Self {
        self.number(&format!("{prefix}X"), v.x)
            .number(&format!("{prefix}Y"), v.y)
            .number(&format!("{prefix}Z"), v.z)
    }

    fn corners(&mut self, prefix: &str, suffixes: [&str; 4], values: [f32; 4]) -> &mut Self {
        for (suffix, value) in suffixes.into_iter().zip(values) {
            self.number(&format!("{prefix}{suffix}"), value);
        }
        self
    }

    fn push(&mut self, name: &str, value: FieldValue) -> &mut Self {
        self.fields.push(Field {
            name: name.to_string(),
            value,
        });
        self
    }
}

const DIRT_CORNERS: [&str; 4] = ["RL", "RR", "FL", "FR"];
const FORZA_CORNERS: [&str; 4] = ["FL", "FR", "RL", "RR"];

impl TryFrom<&TelemetryFrame> for DataFrame {
    type Error = ContractError;

    fn try_from(frame: &TelemetryFrame) -> Result<Self, Self::Error> {
        let mut out = DataFrame::new(frame.source().as_str(), frame.captured_at());
        match frame {
            TelemetryFrame::DirtRally(t) => dirt_rally_fields(&mut out, t),
            TelemetryFrame::Forza(t) => forza_fields(&mut out, t),
            TelemetryFrame::OutGauge(t) => outgauge_fields(&mut out, t),
            TelemetryFrame::Acc(t) => acc_fields(&mut out, t)?,
            TelemetryFrame::IRacing(t) => iracing_fields(&mut out, t)?,
        }
        Ok(out)
    }
}

fn dirt_rally_fields(out: &mut DataFrame, t: &DirtRallyTelemetry) {
    out.number("RunTime", t.run_time)
        .number("LapTime", t.lap_time)
        .number("LapDistance", t.lap_distance)
        .number("Progress", t.progress)
        .vector("Position", t.position)
        .number("Speed", t.speed)
        .corners("SuspensionPosition", DIRT_CORNERS, t.suspension_position)
        .corners("WheelSpeed", DIRT_CORNERS, t.wheel_speed)
        .number("Throttle", t.throttle)
        .number("Steering", t.steering)
        .number("Brake", t.brake)
        .number("Clutch", t.clutch)
        .number("Gear", t.gear)
        .number("GForceLat", t.g_force_lat)
        .number("GForceLon", t.g_force_lon)
        .number("CurrentLap", t.current_lap)
        .number("RPM", t.rpm)
        .number("CarPosition", t.car_position)
        .number("TotalLaps", t.total_laps)
        .number("MaxRPM", t.max_rpm)
        .number("MaxGears", t.max_gears);
}

fn forza_fields(out: &mut DataFrame, t: &ForzaTelemetry) {
    out.flag("IsRaceOn", t.is_race_on)
        .integer("TimestampMS", t.timestamp_ms)
        .number("EngineMaxRpm", t.engine_max_rpm)
        .number("EngineIdleRpm", t.engine_idle_rpm)
        .number("CurrentEngineRpm", t.current_engine_rpm)
        .vector("Acceleration", t.acceleration)
        .vector("Velocity", t.velocity)
        .number("Yaw", t.yaw)
        .number("Pitch", t.pitch)
        .number("Roll", t.roll)
        .vector("Position", t.position)
        .number("Speed", t.speed)
        .number("Power", t.power)
        .number("Torque", t.torque)
        .corners("TireTemp", FORZA_CORNERS, t.tire_temp)
        .number("Boost", t.boost)
        .number("Fuel", t.fuel)
        .number("DistanceTraveled", t.distance_traveled)
        .number("BestLap", t.best_lap)
        .number("LastLap", t.last_lap)
        .number("CurrentLap", t.current_lap)
        .number("CurrentRaceTime", t.current_race_time)
        .integer("LapNumber", t.lap_number)
        .integer("RacePosition", t.race_position)
        .integer("Accel", t.accel)
        .integer("Brake", t.brake)
        .integer("Clutch", t.clutch)
        .integer("HandBrake", t.handbrake)
        .integer("Gear", t.gear)
        .integer("Steer", t.steer);

    if let Some(wear) = t.tire_wear {
        out.corners("TireWear", FORZA_CORNERS, wear);
    }
    if let Some(track) = t.track_ordinal {
        out.integer("TrackOrdinal", track);
    }
}

fn outgauge_fields(out: &mut DataFrame, t: &OutGaugeTelemetry) {
    out.integer("Time", t.time)
        .text("Car", &t.car)
        .integer("Flags", t.flags)
        .integer("Gear", t.gear)
        .integer("PLID", t.player_id)
        .number("Speed", t.speed)
        .number("RPM", t.rpm)
        .number("Turbo", t.turbo)
        .number("EngTemp", t.engine_temp)
        .number("Fuel", t.fuel)
        .number("OilPressure", t.oil_pressure)
        .number("OilTemp", t.oil_temp)
        .integer("DashLights", t.dash_lights)
        .integer("ShowLights", t.show_lights)
        .number("Throttle", t.throttle)
        .number("Brake", t.brake)
        .number("Clutch", t.clutch)
        .text("Display1", &t.display1)
        .text("Display2", &t.display2);

    if let Some(id) = t.id {
        out.integer("ID", id);
    }
}

fn acc_fields(out: &mut DataFrame, t: &AccTelemetry) -> Result<(), ContractError> {
    if t.packet_id == 0 {
        return Err(ContractError::conversion(
            out.name.clone(),
            "physics page not live (packet id 0)",
        ));
    }

    out.integer("PacketId", t.packet_id)
        .number("Gas", t.gas)
        .number("Brake", t.brake)
        .number("Fuel", t.fuel)
        .integer("Gear", t.gear)
        .integer("RPM", t.rpm)
        .number("SteerAngle", t.steer_angle)
        .number("SpeedKmh", t.speed_kmh)
        .vector("Velocity", t.velocity)
        .vector("AccG", t.acc_g)
        .number("Heading", t.heading)
        .number("Pitch", t.pitch)
        .number("Roll", t.roll);
    Ok(())
}

fn iracing_fields(out: &mut DataFrame, t: &IRacingTelemetry) -> Result<(), ContractError> {
    if t.variables.is_empty() {
        return Err(ContractError::conversion(
            out.name.clone(),
            "no telemetry variables in sample",
        ));
    }

    out.integer("Tick", t.tick);
    for (name, value) in &t.variables {
        match *value {
            IRacingValue::Bool(v) => out.flag(name, v),
            IRacingValue::Int(v) => out.integer(name, v),
            IRacingValue::Float(v) => out.number(name, v),
            IRacingValue::Double(v) => out.number(name, v),
        };
    }
    Ok(())
}
