//! Big-endian byte cursor with checked reads and absolute seeking.

use crate::error::{Level2Error, Level2Result};

/// Read position over a borrowed byte slice.
///
/// Every read is bounds-checked and reports a [`Level2Error::ShortRead`]
/// tagged with the structure being decoded, so a truncated chunk never panics.
#[derive(Debug, Clone)]
pub struct ByteCursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    /// Move to an absolute offset. Offsets past the end are clamped so the
    /// next read reports a short read instead of wrapping.
    pub fn seek(&mut self, offset: usize) {
        self.pos = offset.min(self.data.len());
    }

    pub fn skip(&mut self, n: usize) {
        self.seek(self.pos.saturating_add(n));
    }

    /// Check that `needed` bytes are available without consuming them.
    pub fn require(&self, needed: usize, context: &'static str) -> Level2Result<()> {
        if self.remaining() < needed {
            return Err(Level2Error::ShortRead {
                context,
                offset: self.pos,
                needed,
                available: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn peek(&self, n: usize) -> Option<&'a [u8]> {
        self.data.get(self.pos..self.pos.checked_add(n)?)
    }

    pub fn read_bytes(&mut self, n: usize, context: &'static str) -> Level2Result<&'a [u8]> {
        self.require(n, context)?;
        let bytes = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self, context: &'static str) -> Level2Result<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N, context)?);
        Ok(out)
    }

    pub fn read_u8(&mut self, context: &'static str) -> Level2Result<u8> {
        Ok(self.read_array::<1>(context)?[0])
    }

    pub fn read_u16(&mut self, context: &'static str) -> Level2Result<u16> {
        Ok(u16::from_be_bytes(self.read_array(context)?))
    }

    pub fn read_u32(&mut self, context: &'static str) -> Level2Result<u32> {
        Ok(u32::from_be_bytes(self.read_array(context)?))
    }

    pub fn read_i32(&mut self, context: &'static str) -> Level2Result<i32> {
        Ok(i32::from_be_bytes(self.read_array(context)?))
    }

    pub fn read_f32(&mut self, context: &'static str) -> Level2Result<f32> {
        Ok(f32::from_be_bytes(self.read_array(context)?))
    }
}
