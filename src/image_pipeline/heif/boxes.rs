//! ISOBMFF box serialization and parsing primitives.
//!
//! Every box is `size: u32 | type: [u8; 4] | payload`, big-endian. Full boxes
//! prefix the payload with `version: u8 | flags: u24`.

use crate::image_pipeline::common::error::{CombineError, Result};

pub type FourCC = [u8; 4];

pub fn fourcc_str(kind: &FourCC) -> String {
    String::from_utf8_lossy(kind).into_owned()
}

#[derive(Default)]
pub struct BoxWriter {
    buf: Vec<u8>,
}

impl BoxWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }

    pub fn u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub fn u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    pub fn fourcc(&mut self, kind: &FourCC) {
        self.buf.extend_from_slice(kind);
    }

    /// Null-terminated UTF-8 string.
    pub fn cstr(&mut self, value: &str) {
        self.buf.extend_from_slice(value.as_bytes());
        self.buf.push(0);
    }

    pub fn bytes(&mut self, value: &[u8]) {
        self.buf.extend_from_slice(value);
    }

    pub fn write_box<F>(&mut self, kind: &FourCC, body: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        let start = self.buf.len();
        self.u32(0);
        self.fourcc(kind);
        body(self)?;

        let size = u32::try_from(self.buf.len() - start).map_err(|_| {
            CombineError::WriteFailed(format!("'{}' box exceeds 4 GiB", fourcc_str(kind)))
        })?;
        self.buf[start..start + 4].copy_from_slice(&size.to_be_bytes());
        Ok(())
    }

    pub fn write_full_box<F>(&mut self, kind: &FourCC, version: u8, flags: u32, body: F) -> Result<()>
    where
        F: FnOnce(&mut Self) -> Result<()>,
    {
        self.write_box(kind, |w| {
            w.u32((u32::from(version) << 24) | (flags & 0x00FF_FFFF));
            body(w)
        })
    }
}

/// Cursor over a byte slice with bounds-checked big-endian reads.
pub struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(CombineError::MalformedContainer(format!(
                "needed {} bytes at offset {}, only {} left",
                len,
                self.pos,
                self.remaining()
            )));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self) -> Result<u32> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u64(&mut self) -> Result<u64> {
        let b = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(b);
        Ok(u64::from_be_bytes(raw))
    }

    pub fn f64(&mut self) -> Result<f64> {
        Ok(f64::from_bits(self.u64()?))
    }

    pub fn fourcc(&mut self) -> Result<FourCC> {
        let b = self.take(4)?;
        Ok([b[0], b[1], b[2], b[3]])
    }

    /// Reads an unsigned integer of 0, 4 or 8 bytes, as used by `iloc`.
    pub fn sized(&mut self, size: u8) -> Result<u64> {
        match size {
            0 => Ok(0),
            4 => Ok(u64::from(self.u32()?)),
            8 => self.u64(),
            other => Err(CombineError::MalformedContainer(format!("unsupported field size {other}"))),
        }
    }

    pub fn cstr(&mut self) -> Result<String> {
        let rest = &self.data[self.pos..];
        let end = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
        let value = String::from_utf8_lossy(&rest[..end]).into_owned();
        self.pos += (end + 1).min(rest.len());
        Ok(value)
    }

    /// `(version, flags)` header of a full box.
    pub fn full_box_header(&mut self) -> Result<(u8, u32)> {
        let word = self.u32()?;
        Ok(((word >> 24) as u8, word & 0x00FF_FFFF))
    }

    pub fn rest(&mut self) -> &'a [u8] {
        let slice = &self.data[self.pos..];
        self.pos = self.data.len();
        slice
    }
}

/// One parsed box: its type, payload, and payload offset within the buffer
/// the iteration started from.
#[derive(Debug, Clone, Copy)]
pub struct RawBox<'a> {
    pub kind: FourCC,
    pub payload: &'a [u8],
    pub payload_offset: usize,
}

/// Iterates sibling boxes in `data`. Handles 64-bit `largesize` and
/// size `0` (box extends to the end).
pub struct BoxIter<'a> {
    data: &'a [u8],
    pos: usize,
    base: usize,
}

impl<'a> BoxIter<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0, base: 0 }
    }

    /// `base` is the absolute offset of `data[0]`.
    pub fn with_base(data: &'a [u8], base: usize) -> Self {
        Self { data, pos: 0, base }
    }

    fn next_box(&mut self) -> Result<RawBox<'a>> {
        let start = self.pos;
        let mut reader = ByteReader::new(&self.data[start..]);
        let size32 = reader.u32()?;
        let kind = reader.fourcc()?;

        let (header, size) = match size32 {
            0 => (8, self.data.len() - start),
            1 => {
                let large = usize::try_from(reader.u64()?).map_err(|_| {
                    CombineError::MalformedContainer("box size overflows usize".to_string())
                })?;
                (16, large)
            }
            n => (8, n as usize),
        };

        if size < header || size > self.data.len() - start {
            return Err(CombineError::MalformedContainer(format!(
                "'{}' box at offset {} has invalid size {}",
                fourcc_str(&kind),
                self.base + start,
                size
            )));
        }

        self.pos = start + size;
        Ok(RawBox {
            kind,
            payload: &self.data[start + header..start + size],
            payload_offset: self.base + start + header,
        })
    }
}

impl<'a> Iterator for BoxIter<'a> {
    type Item = Result<RawBox<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.pos >= self.data.len() {
            return None;
        }
        match self.next_box() {
            Ok(raw) => Some(Ok(raw)),
            Err(e) => {
                self.pos = self.data.len();
                Some(Err(e))
            }
        }
    }
}
