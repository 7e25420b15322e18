//! Little-endian field readers over a length-checked packet

use bytes::Buf;

/// Fixed-offset reader over a packet whose length was already validated.
///
/// Offsets past the end read as zero instead of panicking.
#[derive(Clone, Copy)]
pub(crate) struct Fields<'a> {
    data: &'a [u8],
}

impl<'a> Fields<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn at(&self, offset: usize, width: usize) -> Option<&'a [u8]> {
        self.data.get(offset..offset.checked_add(width)?)
    }

    pub(crate) fn f32(&self, offset: usize) -> f32 {
        self.at(offset, 4).map(|mut b| b.get_f32_le()).unwrap_or_default()
    }

    pub(crate) fn f64(&self, offset: usize) -> f64 {
        self.at(offset, 8).map(|mut b| b.get_f64_le()).unwrap_or_default()
    }

    pub(crate) fn i32(&self, offset: usize) -> i32 {
        self.at(offset, 4).map(|mut b| b.get_i32_le()).unwrap_or_default()
    }

    pub(crate) fn u32(&self, offset: usize) -> u32 {
        self.at(offset, 4).map(|mut b| b.get_u32_le()).unwrap_or_default()
    }

    pub(crate) fn u16(&self, offset: usize) -> u16 {
        self.at(offset, 2).map(|mut b| b.get_u16_le()).unwrap_or_default()
    }

    pub(crate) fn u8(&self, offset: usize) -> u8 {
        self.data.get(offset).copied().unwrap_or_default()
    }

    pub(crate) fn i8(&self, offset: usize) -> i8 {
        self.u8(offset) as i8
    }

    pub(crate) fn vector3(&self, offset: usize) -> contracts::Vector3 {
        contracts::Vector3::new(
            self.f32(offset),
            self.f32(offset + 4),
            self.f32(offset + 8),
        )
    }

    /// NUL-terminated ASCII text in a fixed-width slot
    pub(crate) fn text(&self, offset: usize, width: usize) -> String {
        let raw = self.at(offset, width).unwrap_or_default();
        let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
        String::from_utf8_lossy(&raw[..end]).into_owned()
    }
}
