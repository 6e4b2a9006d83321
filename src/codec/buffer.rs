// clusterconfig-core/src/codec/buffer.rs

use std::io::{Cursor, Seek, SeekFrom, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::format::{NodeHeader, HEADER_SIZE};
use crate::error::{Result, SettingsError};

/// Converts a byte or item count to its `i32` wire form.
pub(crate) fn wire_length(len: usize) -> Result<i32> {
    i32::try_from(len)
        .map_err(|_| SettingsError::InvalidArgument(format!("length {} exceeds i32 range", len)))
}

/// Bounds-checked little-endian reader over a borrowed buffer.
///
/// Slices and strings are returned borrowed from the source buffer, so
/// skipping and copying nodes never allocates.
#[derive(Debug, Clone)]
pub struct BinaryReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> BinaryReader<'a> {
    pub fn new(buffer: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(buffer),
        }
    }

    pub fn buffer(&self) -> &'a [u8] {
        *self.cursor.get_ref()
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn set_position(&mut self, position: usize) -> Result<()> {
        let available = self.buffer().len();
        if position > available {
            return Err(SettingsError::Truncated {
                offset: position,
                needed: 0,
                available,
            });
        }
        self.cursor.set_position(position as u64);
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        self.buffer().len().saturating_sub(self.position())
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    /// Fails with `Truncated` unless `needed` more bytes are available.
    pub fn ensure(&self, needed: usize) -> Result<()> {
        let available = self.remaining();
        if needed > available {
            return Err(SettingsError::Truncated {
                offset: self.position(),
                needed,
                available,
            });
        }
        Ok(())
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        self.ensure(1)?;
        Ok(self.cursor.read_u8()?)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    pub fn read_i32(&mut self) -> Result<i32> {
        self.ensure(4)?;
        Ok(self.cursor.read_i32::<LittleEndian>()?)
    }

    pub fn read_i64(&mut self) -> Result<i64> {
        self.ensure(8)?;
        Ok(self.cursor.read_i64::<LittleEndian>()?)
    }

    /// Reads an `i32` length or count, rejecting negative values.
    pub fn read_length(&mut self) -> Result<usize> {
        let offset = self.position();
        let raw = self.read_i32()?;
        usize::try_from(raw)
            .map_err(|_| SettingsError::Malformed(format!("negative length {} at offset {}", raw, offset)))
    }

    pub fn read_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure(len)?;
        let start = self.position();
        let buffer = self.buffer();
        self.cursor.set_position((start + len) as u64);
        Ok(&buffer[start..start + len])
    }

    /// Reads an `i32`-length-prefixed UTF-8 string.
    pub fn read_str(&mut self) -> Result<&'a str> {
        let len = self.read_length()?;
        let offset = self.position();
        let bytes = self.read_slice(len)?;
        std::str::from_utf8(bytes)
            .map_err(|e| SettingsError::Malformed(format!("invalid UTF-8 at offset {}: {}", offset, e)))
    }

    pub fn skip(&mut self, len: usize) -> Result<()> {
        self.ensure(len)?;
        self.cursor.set_position((self.position() + len) as u64);
        Ok(())
    }

    pub fn read_header(&mut self) -> Result<NodeHeader> {
        self.ensure(HEADER_SIZE)?;
        NodeHeader::read_from(&mut self.cursor)
    }

    /// Reads the next header without consuming it.
    pub fn peek_header(&mut self) -> Result<NodeHeader> {
        let start = self.position();
        let header = self.read_header();
        self.cursor.set_position(start as u64);
        header
    }
}

/// Little-endian writer into a growable buffer.
#[derive(Debug, Default)]
pub struct BinaryWriter {
    cursor: Cursor<Vec<u8>>,
}

/// A 4-byte hole left in the output for a value known only later
/// (an Object's child count or a node's content length).
#[derive(Debug)]
#[must_use = "a reserved slot must be filled"]
pub struct ReservedSlot {
    position: u64,
}

impl BinaryWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            cursor: Cursor::new(Vec::with_capacity(capacity)),
        }
    }

    pub fn position(&self) -> usize {
        self.cursor.position() as usize
    }

    pub fn write_u8(&mut self, value: u8) -> Result<()> {
        Ok(self.cursor.write_u8(value)?)
    }

    pub fn write_bool(&mut self, value: bool) -> Result<()> {
        self.write_u8(u8::from(value))
    }

    pub fn write_i32(&mut self, value: i32) -> Result<()> {
        Ok(self.cursor.write_i32::<LittleEndian>(value)?)
    }

    pub fn write_i64(&mut self, value: i64) -> Result<()> {
        Ok(self.cursor.write_i64::<LittleEndian>(value)?)
    }

    pub fn write_length(&mut self, len: usize) -> Result<()> {
        self.write_i32(wire_length(len)?)
    }

    pub fn write_bytes(&mut self, bytes: &[u8]) -> Result<()> {
        Ok(self.cursor.write_all(bytes)?)
    }

    /// Writes an `i32`-length-prefixed UTF-8 string.
    pub fn write_str(&mut self, value: &str) -> Result<()> {
        self.write_length(value.len())?;
        self.write_bytes(value.as_bytes())
    }

    pub fn write_header(&mut self, header: &NodeHeader) -> Result<()> {
        header.write_to(&mut self.cursor)
    }

    pub fn reserve_i32(&mut self) -> Result<ReservedSlot> {
        let position = self.cursor.position();
        self.write_i32(0)?;
        Ok(ReservedSlot { position })
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.cursor.into_inner()
    }
}

impl ReservedSlot {
    /// Offset of the first byte after the slot.
    pub fn end(&self) -> usize {
        self.position as usize + 4
    }

    /// Writes `value` into the slot and restores the writer to the end of the output.
    pub fn fill(self, writer: &mut BinaryWriter, value: i32) -> Result<()> {
        let resume_at = writer.cursor.position();
        writer.cursor.seek(SeekFrom::Start(self.position))?;
        writer.write_i32(value)?;
        writer.cursor.seek(SeekFrom::Start(resume_at))?;
        Ok(())
    }
}
