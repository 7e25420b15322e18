//! Assetto Corsa Competizione physics page (`acpmf_physics`)

use std::io;

use chrono::Utc;
use contracts::{AccTelemetry, SourceId, TelemetryFrame};

use super::common::Fields;
use crate::shared_memory::{Page, PageDecoder};

/// Bytes read from the start of the physics page
pub const ACC_PHYSICS_PAGE_LEN: usize = 220;

/// Emits a sample each time the page's packet id moves.
#[derive(Debug, Default)]
pub struct AccPhysicsDecoder {
    last_packet_id: Option<i32>,
    buf: Vec<u8>,
}

impl AccPhysicsDecoder {
    fn parse(data: &[u8]) -> AccTelemetry {
        let f = Fields::new(data);
        AccTelemetry {
            captured_at: Utc::now(),
            packet_id: f.i32(0),
            gas: f.f32(4),
            brake: f.f32(8),
            fuel: f.f32(12),
            gear: f.i32(16),
            rpm: f.i32(20),
            steer_angle: f.f32(24),
            speed_kmh: f.f32(28),
            velocity: f.vector3(32),
            acc_g: f.vector3(44),
            heading: f.f32(208),
            pitch: f.f32(212),
            roll: f.f32(216),
        }
    }
}

impl PageDecoder for AccPhysicsDecoder {
    fn source(&self) -> SourceId {
        SourceId::Acc
    }

    fn poll(&mut self, page: &mut dyn Page) -> io::Result<Option<TelemetryFrame>> {
        self.buf.resize(ACC_PHYSICS_PAGE_LEN, 0);
        page.read_exact_at(0, &mut self.buf)?;

        let sample = Self::parse(&self.buf);
        if self.last_packet_id == Some(sample.packet_id) {
            return Ok(None);
        }
        self.last_packet_id = Some(sample.packet_id);
        Ok(Some(TelemetryFrame::Acc(sample)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn page(packet_id: i32, gear: i32) -> Cursor<Vec<u8>> {
        let mut p = vec![0u8; ACC_PHYSICS_PAGE_LEN];
        p[0..4].copy_from_slice(&packet_id.to_le_bytes());
        p[16..20].copy_from_slice(&gear.to_le_bytes());
        p[212..216].copy_from_slice(&0.05f32.to_le_bytes());
        Cursor::new(p)
    }

    #[test]
    fn test_emits_only_on_new_packet() {
        let mut decoder = AccPhysicsDecoder::default();

        let frame = decoder.poll(&mut page(5, 3)).unwrap().unwrap();
        let TelemetryFrame::Acc(t) = frame else {
            panic!("unexpected frame variant");
        };
        assert_eq!(t.packet_id, 5);
        assert_eq!(t.gear, 3);
        assert_eq!(t.pitch, 0.05);

        assert!(decoder.poll(&mut page(5, 4)).unwrap().is_none());
        assert!(decoder.poll(&mut page(6, 4)).unwrap().is_some());
    }

    #[test]
    fn test_short_page_is_io_error() {
        let mut decoder = AccPhysicsDecoder::default();
        let mut short = Cursor::new(vec![0u8; 64]);
        assert!(decoder.poll(&mut short).is_err());
    }
}
