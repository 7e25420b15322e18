//! Forza "Data Out" UDP decoder
//!
//! Every packet starts with the 232-byte sled block. The dash block follows,
//! shifted by 12 bytes on Horizon titles. Motorsport 2023 appends tire wear
//! and the track ordinal.

use chrono::Utc;
use contracts::{ForzaTelemetry, SourceId, TelemetryFrame};

use super::common::Fields;
use crate::error::ProducerError;
use crate::udp::PacketDecoder;

/// Byte layout of one Forza title
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForzaLayout {
    pub packet_len: usize,
    pub dash_offset: usize,
    pub has_wear: bool,
}

impl ForzaLayout {
    pub const HORIZON_5: Self = Self {
        packet_len: 324,
        dash_offset: 244,
        has_wear: false,
    };

    pub const MOTORSPORT_2023: Self = Self {
        packet_len: 331,
        dash_offset: 232,
        has_wear: true,
    };
}

const WEAR_OFFSET: usize = 311;
const TRACK_ORDINAL_OFFSET: usize = 327;

#[derive(Debug, Clone, Copy)]
pub struct ForzaDecoder {
    source: SourceId,
    layout: ForzaLayout,
}

impl ForzaDecoder {
    pub fn horizon5() -> Self {
        Self {
            source: SourceId::ForzaHorizon5,
            layout: ForzaLayout::HORIZON_5,
        }
    }

    pub fn motorsport2023() -> Self {
        Self {
            source: SourceId::ForzaMotorsport2023,
            layout: ForzaLayout::MOTORSPORT_2023,
        }
    }
}

impl PacketDecoder for ForzaDecoder {
    fn source(&self) -> SourceId {
        self.source
    }

    fn decode(&mut self, packet: &[u8]) -> Result<TelemetryFrame, ProducerError> {
        if packet.len() != self.layout.packet_len {
            return Err(ProducerError::decode(
                self.source,
                format!(
                    "expected {} bytes, got {}",
                    self.layout.packet_len,
                    packet.len()
                ),
            ));
        }

        let f = Fields::new(packet);
        let d = self.layout.dash_offset;

        let (tire_wear, track_ordinal) = if self.layout.has_wear {
            (
                Some([
                    f.f32(WEAR_OFFSET),
                    f.f32(WEAR_OFFSET + 4),
                    f.f32(WEAR_OFFSET + 8),
                    f.f32(WEAR_OFFSET + 12),
                ]),
                Some(f.i32(TRACK_ORDINAL_OFFSET)),
            )
        } else {
            (None, None)
        };

        Ok(TelemetryFrame::Forza(ForzaTelemetry {
            captured_at: Utc::now(),
            source: self.source,
            is_race_on: f.i32(0) != 0,
            timestamp_ms: f.u32(4),
            engine_max_rpm: f.f32(8),
            engine_idle_rpm: f.f32(12),
            current_engine_rpm: f.f32(16),
            acceleration: f.vector3(20),
            velocity: f.vector3(32),
            yaw: f.f32(56),
            pitch: f.f32(60),
            roll: f.f32(64),
            position: f.vector3(d),
            speed: f.f32(d + 12),
            power: f.f32(d + 16),
            torque: f.f32(d + 20),
            tire_temp: [
                f.f32(d + 24),
                f.f32(d + 28),
                f.f32(d + 32),
                f.f32(d + 36),
            ],
            boost: f.f32(d + 40),
            fuel: f.f32(d + 44),
            distance_traveled: f.f32(d + 48),
            best_lap: f.f32(d + 52),
            last_lap: f.f32(d + 56),
            current_lap: f.f32(d + 60),
            current_race_time: f.f32(d + 64),
            lap_number: f.u16(d + 68),
            race_position: f.u8(d + 70),
            accel: f.u8(d + 71),
            brake: f.u8(d + 72),
            clutch: f.u8(d + 73),
            handbrake: f.u8(d + 74),
            gear: f.u8(d + 75),
            steer: f.i8(d + 76),
            tire_wear,
            track_ordinal,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet(layout: ForzaLayout) -> Vec<u8> {
        let mut p = vec![0u8; layout.packet_len];
        let d = layout.dash_offset;
        p[0..4].copy_from_slice(&1i32.to_le_bytes());
        p[16..20].copy_from_slice(&7200.0f32.to_le_bytes());
        p[d + 12..d + 16].copy_from_slice(&55.5f32.to_le_bytes());
        p[d + 68..d + 70].copy_from_slice(&3u16.to_le_bytes());
        p[d + 75] = 5;
        p[d + 76] = (-20i8) as u8;
        p
    }

    #[test]
    fn test_horizon_dash_is_shifted() {
        let frame = ForzaDecoder::horizon5()
            .decode(&packet(ForzaLayout::HORIZON_5))
            .unwrap();
        let TelemetryFrame::Forza(t) = frame else {
            panic!("unexpected frame variant");
        };

        assert_eq!(t.source, SourceId::ForzaHorizon5);
        assert!(t.is_race_on);
        assert_eq!(t.current_engine_rpm, 7200.0);
        assert_eq!(t.speed, 55.5);
        assert_eq!(t.lap_number, 3);
        assert_eq!(t.gear, 5);
        assert_eq!(t.steer, -20);
        assert!(t.tire_wear.is_none());
    }

    #[test]
    fn test_motorsport_extras() {
        let mut p = packet(ForzaLayout::MOTORSPORT_2023);
        p[WEAR_OFFSET..WEAR_OFFSET + 4].copy_from_slice(&0.25f32.to_le_bytes());
        p[TRACK_ORDINAL_OFFSET..TRACK_ORDINAL_OFFSET + 4].copy_from_slice(&860i32.to_le_bytes());

        let frame = ForzaDecoder::motorsport2023().decode(&p).unwrap();
        let TelemetryFrame::Forza(t) = frame else {
            panic!("unexpected frame variant");
        };

        assert_eq!(t.source, SourceId::ForzaMotorsport2023);
        assert_eq!(t.speed, 55.5);
        assert_eq!(t.tire_wear.map(|w| w[0]), Some(0.25));
        assert_eq!(t.track_ordinal, Some(860));
    }

    #[test]
    fn test_wrong_length_rejected() {
        let p = packet(ForzaLayout::MOTORSPORT_2023);
        assert!(ForzaDecoder::horizon5().decode(&p).is_err());
        assert!(ForzaDecoder::motorsport2023().decode(&p[..311]).is_err());
    }
}
