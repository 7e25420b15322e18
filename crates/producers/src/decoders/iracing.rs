//! iRacing SDK memory-mapped telemetry
//!
//! The page starts with a fixed header, followed by variable descriptors and
//! a ring of up to four data buffers. The buffer with the highest tick is
//! the freshest one.

use std::collections::BTreeMap;
use std::io;

use chrono::Utc;
use contracts::{IRacingTelemetry, IRacingValue, SourceId, TelemetryFrame};

use super::common::Fields;
use crate::shared_memory::{Page, PageDecoder};

const HEADER_LEN: usize = 112;
const VAR_HEADER_LEN: usize = 144;
const MAX_BUFFERS: usize = 4;
const VAR_BUF_OFFSET: usize = 48;
const VAR_BUF_STRIDE: usize = 16;
const STATUS_CONNECTED: i32 = 1;
const MAX_VARS: i32 = 4096;
/// Real sessions use a few KiB per buffer
const MAX_BUF_LEN: i32 = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VarType {
    Char,
    Bool,
    Int,
    BitField,
    Float,
    Double,
}

impl VarType {
    fn from_raw(raw: i32) -> Option<Self> {
        match raw {
            0 => Some(Self::Char),
            1 => Some(Self::Bool),
            2 => Some(Self::Int),
            3 => Some(Self::BitField),
            4 => Some(Self::Float),
            5 => Some(Self::Double),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
struct VarHeader {
    name: String,
    var_type: VarType,
    offset: usize,
    count: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    version: i32,
    status: i32,
    num_vars: i32,
    var_header_offset: i32,
    num_buf: i32,
    buf_len: i32,
}

impl Header {
    fn parse(f: &Fields<'_>) -> Self {
        Self {
            version: f.i32(0),
            status: f.i32(4),
            num_vars: f.i32(24),
            var_header_offset: f.i32(28),
            num_buf: f.i32(32),
            buf_len: f.i32(36),
        }
    }

    fn layout_key(&self) -> (i32, i32, i32) {
        (self.version, self.num_vars, self.var_header_offset)
    }
}

/// Emits the scalar variables of the freshest buffer each time its tick moves.
#[derive(Debug, Default)]
pub struct IRacingDecoder {
    last_tick: Option<i32>,
    layout: Option<((i32, i32, i32), Vec<VarHeader>)>,
    buf: Vec<u8>,
}

fn invalid(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, message.into())
}

impl IRacingDecoder {
    fn var_headers(&mut self, page: &mut dyn Page, header: &Header) -> io::Result<&[VarHeader]> {
        let key = header.layout_key();
        let stale = self.layout.as_ref().map(|(k, _)| *k != key).unwrap_or(true);
        if stale {
            if !(0..=MAX_VARS).contains(&header.num_vars) || header.var_header_offset < 0 {
                return Err(invalid(format!(
                    "implausible variable table ({} vars at {})",
                    header.num_vars, header.var_header_offset
                )));
            }
            let mut raw = vec![0u8; header.num_vars as usize * VAR_HEADER_LEN];
            page.read_exact_at(header.var_header_offset as u64, &mut raw)?;

            let vars = raw
                .chunks_exact(VAR_HEADER_LEN)
                .filter_map(|chunk| {
                    let f = Fields::new(chunk);
                    Some(VarHeader {
                        var_type: VarType::from_raw(f.i32(0))?,
                        offset: usize::try_from(f.i32(4)).ok()?,
                        count: f.i32(8),
                        name: f.text(16, 32),
                    })
                })
                .collect();
            self.layout = Some((key, vars));
        }

        Ok(self
            .layout
            .as_ref()
            .map(|(_, vars)| vars.as_slice())
            .unwrap_or_default())
    }
}

impl PageDecoder for IRacingDecoder {
    fn source(&self) -> SourceId {
        SourceId::IRacing
    }

    fn poll(&mut self, page: &mut dyn Page) -> io::Result<Option<TelemetryFrame>> {
        let mut raw = [0u8; HEADER_LEN];
        page.read_exact_at(0, &mut raw)?;
        let f = Fields::new(&raw);
        let header = Header::parse(&f);

        if header.status & STATUS_CONNECTED == 0 {
            return Ok(None);
        }

        let buffers = (header.num_buf.clamp(0, MAX_BUFFERS as i32)) as usize;
        let Some((tick, buf_offset)) = (0..buffers)
            .map(|i| {
                let at = VAR_BUF_OFFSET + i * VAR_BUF_STRIDE;
                (f.i32(at), f.i32(at + 4))
            })
            .max_by_key(|&(tick, _)| tick)
        else {
            return Ok(None);
        };

        if self.last_tick == Some(tick) {
            return Ok(None);
        }
        if !(1..=MAX_BUF_LEN).contains(&header.buf_len) || buf_offset < 0 {
            return Err(invalid(format!(
                "implausible data buffer ({} bytes at {})",
                header.buf_len, buf_offset
            )));
        }

        // The scratch buffer is only kept after a good read.
        let mut data = std::mem::take(&mut self.buf);
        data.resize(header.buf_len as usize, 0);
        page.read_exact_at(buf_offset as u64, &mut data)?;
        let variables = scalars(self.var_headers(page, &header)?, &data);
        self.buf = data;

        self.last_tick = Some(tick);
        Ok(Some(TelemetryFrame::IRacing(IRacingTelemetry {
            captured_at: Utc::now(),
            tick,
            variables,
        })))
    }
}

/// Single-valued variables; arrays and strings are skipped.
fn scalars(vars: &[VarHeader], data: &[u8]) -> BTreeMap<String, IRacingValue> {
    let f = Fields::new(data);
    vars.iter()
        .filter(|v| v.count == 1 && !v.name.is_empty())
        .filter_map(|v| {
            let value = match v.var_type {
                VarType::Char => return None,
                VarType::Bool => IRacingValue::Bool(f.u8(v.offset) != 0),
                VarType::Int | VarType::BitField => IRacingValue::Int(f.i32(v.offset)),
                VarType::Float => IRacingValue::Float(f.f32(v.offset)),
                VarType::Double => IRacingValue::Double(f.f64(v.offset)),
            };
            Some((v.name.clone(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const VARS_AT: usize = HEADER_LEN;
    const BUF_LEN: usize = 32;

    fn put_i32(p: &mut [u8], at: usize, v: i32) {
        p[at..at + 4].copy_from_slice(&v.to_le_bytes());
    }

    fn var(p: &mut [u8], index: usize, var_type: i32, offset: i32, count: i32, name: &str) {
        let at = VARS_AT + index * VAR_HEADER_LEN;
        put_i32(p, at, var_type);
        put_i32(p, at + 4, offset);
        put_i32(p, at + 8, count);
        p[at + 16..at + 16 + name.len()].copy_from_slice(name.as_bytes());
    }

    /// Two data buffers; buffer 1 is fresher.
    fn page(status: i32, ticks: [i32; 2], speed: f32) -> Cursor<Vec<u8>> {
        let buf0 = VARS_AT + 4 * VAR_HEADER_LEN;
        let buf1 = buf0 + BUF_LEN;
        let mut p = vec![0u8; buf1 + BUF_LEN];

        put_i32(&mut p, 0, 2);
        put_i32(&mut p, 4, status);
        put_i32(&mut p, 8, 60);
        put_i32(&mut p, 24, 4);
        put_i32(&mut p, 28, VARS_AT as i32);
        put_i32(&mut p, 32, 2);
        put_i32(&mut p, 36, BUF_LEN as i32);
        put_i32(&mut p, VAR_BUF_OFFSET, ticks[0]);
        put_i32(&mut p, VAR_BUF_OFFSET + 4, buf0 as i32);
        put_i32(&mut p, VAR_BUF_OFFSET + 16, ticks[1]);
        put_i32(&mut p, VAR_BUF_OFFSET + 20, buf1 as i32);

        var(&mut p, 0, 4, 0, 1, "Speed");
        var(&mut p, 1, 2, 4, 1, "Gear");
        var(&mut p, 2, 1, 8, 1, "OnPitRoad");
        var(&mut p, 3, 4, 12, 4, "CarIdxLap");

        p[buf1..buf1 + 4].copy_from_slice(&speed.to_le_bytes());
        put_i32(&mut p, buf1 + 4, 3);
        p[buf1 + 8] = 1;
        Cursor::new(p)
    }

    #[test]
    fn test_reads_freshest_buffer() {
        let mut decoder = IRacingDecoder::default();
        let frame = decoder.poll(&mut page(1, [10, 11], 52.0)).unwrap().unwrap();

        let TelemetryFrame::IRacing(t) = frame else {
            panic!("unexpected frame variant");
        };
        assert_eq!(t.tick, 11);
        assert_eq!(t.variables.get("Speed"), Some(&IRacingValue::Float(52.0)));
        assert_eq!(t.variables.get("Gear"), Some(&IRacingValue::Int(3)));
        assert_eq!(t.variables.get("OnPitRoad"), Some(&IRacingValue::Bool(true)));
        assert!(!t.variables.contains_key("CarIdxLap"));
    }

    #[test]
    fn test_same_tick_yields_nothing() {
        let mut decoder = IRacingDecoder::default();
        assert!(decoder.poll(&mut page(1, [10, 11], 52.0)).unwrap().is_some());
        assert!(decoder.poll(&mut page(1, [10, 11], 53.0)).unwrap().is_none());
        assert!(decoder.poll(&mut page(1, [12, 11], 53.0)).unwrap().is_some());
    }

    #[test]
    fn test_oversized_buffer_rejected_without_allocating() {
        let mut p = page(1, [10, 11], 52.0).into_inner();
        put_i32(&mut p, 36, 1_000_000_000);

        let mut decoder = IRacingDecoder::default();
        let err = decoder.poll(&mut Cursor::new(p)).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
        assert_eq!(decoder.buf.capacity(), 0);
    }

    #[test]
    fn test_failed_read_releases_buffer() {
        let mut decoder = IRacingDecoder::default();
        assert!(decoder.poll(&mut page(1, [10, 11], 52.0)).unwrap().is_some());
        assert!(decoder.buf.capacity() >= BUF_LEN);

        // Fresher tick whose buffer points past the end of the page.
        let mut p = page(1, [10, 12], 52.0).into_inner();
        let past_end = p.len() as i32;
        put_i32(&mut p, VAR_BUF_OFFSET + 20, past_end);

        assert!(decoder.poll(&mut Cursor::new(p)).is_err());
        assert_eq!(decoder.buf.capacity(), 0);
    }

    #[test]
    fn test_disconnected_sim_yields_nothing() {
        let mut decoder = IRacingDecoder::default();
        assert!(decoder.poll(&mut page(0, [10, 11], 52.0)).unwrap().is_none());
    }
}
