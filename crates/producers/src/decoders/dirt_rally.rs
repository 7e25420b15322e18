//! DiRT Rally 2.0 UDP decoder (`extradata=3`)
//!
//! The packet is a flat run of 66 little-endian `f32` values.

use chrono::Utc;
use contracts::{DirtRallyTelemetry, SourceId, TelemetryFrame, Vector3};

use crate::error::ProducerError;
use crate::udp::PacketDecoder;

const FIELD_COUNT: usize = 66;

/// Minimum datagram length
pub const DIRT_RALLY_PACKET_LEN: usize = FIELD_COUNT * 4;

// Engine speeds are sent divided by ten.
const RPM_SCALE: f32 = 10.0;

#[derive(Debug, Default, Clone, Copy)]
pub struct DirtRallyDecoder;

impl DirtRallyDecoder {
    fn values(packet: &[u8]) -> [f32; FIELD_COUNT] {
        let raw: [u32; FIELD_COUNT] = bytemuck::pod_read_unaligned(&packet[..DIRT_RALLY_PACKET_LEN]);
        raw.map(|word| f32::from_bits(u32::from_le(word)))
    }
}

impl PacketDecoder for DirtRallyDecoder {
    fn source(&self) -> SourceId {
        SourceId::DirtRally2
    }

    fn decode(&mut self, packet: &[u8]) -> Result<TelemetryFrame, ProducerError> {
        if packet.len() < DIRT_RALLY_PACKET_LEN {
            return Err(ProducerError::decode(
                SourceId::DirtRally2,
                format!(
                    "expected at least {DIRT_RALLY_PACKET_LEN} bytes, got {}",
                    packet.len()
                ),
            ));
        }

        let v = Self::values(packet);
        Ok(TelemetryFrame::DirtRally(DirtRallyTelemetry {
            captured_at: Utc::now(),
            run_time: v[0],
            lap_time: v[1],
            lap_distance: v[2],
            progress: v[3],
            position: Vector3::new(v[4], v[5], v[6]),
            speed: v[7],
            suspension_position: [v[17], v[18], v[19], v[20]],
            wheel_speed: [v[25], v[26], v[27], v[28]],
            throttle: v[29],
            steering: v[30],
            brake: v[31],
            clutch: v[32],
            gear: v[33],
            g_force_lat: v[34],
            g_force_lon: v[35],
            current_lap: v[36],
            rpm: v[37] * RPM_SCALE,
            car_position: v[39],
            total_laps: v[60],
            max_rpm: v[63] * RPM_SCALE,
            max_gears: v[65],
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn packet_with(values: &[(usize, f32)]) -> Vec<u8> {
        let mut packet = vec![0u8; DIRT_RALLY_PACKET_LEN];
        for &(index, value) in values {
            packet[index * 4..index * 4 + 4].copy_from_slice(&value.to_le_bytes());
        }
        packet
    }

    #[test]
    fn test_decode_fields() {
        let packet = packet_with(&[(7, 31.5), (33, 4.0), (37, 650.0), (63, 800.0), (28, 40.0)]);
        let frame = DirtRallyDecoder.decode(&packet).unwrap();

        let TelemetryFrame::DirtRally(t) = frame else {
            panic!("unexpected frame variant");
        };
        assert_eq!(t.speed, 31.5);
        assert_eq!(t.gear, 4.0);
        assert_eq!(t.rpm, 6500.0);
        assert_eq!(t.max_rpm, 8000.0);
        assert_eq!(t.wheel_speed[3], 40.0);
    }

    #[test]
    fn test_short_packet_rejected() {
        let err = DirtRallyDecoder.decode(&[0u8; 100]).unwrap_err();
        assert!(matches!(
            err,
            ProducerError::Decode {
                source_id: SourceId::DirtRally2,
                ..
            }
        ));
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let mut packet = packet_with(&[(0, 12.0)]);
        packet.extend_from_slice(&[0xff; 8]);
        assert!(DirtRallyDecoder.decode(&packet).is_ok());
    }
}
