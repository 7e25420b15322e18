//! OutGauge UDP decoder (Live for Speed, BeamNG.drive)

use chrono::Utc;
use contracts::{OutGaugeTelemetry, SourceId, TelemetryFrame};

use super::common::Fields;
use crate::error::ProducerError;
use crate::udp::PacketDecoder;

const BASE_LEN: usize = 92;
const WITH_ID_LEN: usize = 96;

#[derive(Debug, Default, Clone, Copy)]
pub struct OutGaugeDecoder;

impl PacketDecoder for OutGaugeDecoder {
    fn source(&self) -> SourceId {
        SourceId::OutGauge
    }

    fn decode(&mut self, packet: &[u8]) -> Result<TelemetryFrame, ProducerError> {
        if packet.len() != BASE_LEN && packet.len() != WITH_ID_LEN {
            return Err(ProducerError::decode(
                SourceId::OutGauge,
                format!(
                    "expected {BASE_LEN} or {WITH_ID_LEN} bytes, got {}",
                    packet.len()
                ),
            ));
        }

        let f = Fields::new(packet);
        Ok(TelemetryFrame::OutGauge(OutGaugeTelemetry {
            captured_at: Utc::now(),
            time: f.u32(0),
            car: f.text(4, 4),
            flags: f.u16(8),
            gear: f.u8(10),
            player_id: f.u8(11),
            speed: f.f32(12),
            rpm: f.f32(16),
            turbo: f.f32(20),
            engine_temp: f.f32(24),
            fuel: f.f32(28),
            oil_pressure: f.f32(32),
            oil_temp: f.f32(36),
            dash_lights: f.u32(40),
            show_lights: f.u32(44),
            throttle: f.f32(48),
            brake: f.f32(52),
            clutch: f.f32(56),
            display1: f.text(60, 16),
            display2: f.text(76, 16),
            id: (packet.len() == WITH_ID_LEN).then(|| f.i32(92)),
        }))
    }
}
