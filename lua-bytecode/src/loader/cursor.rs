//! Bounds-checked sequential reader over a chunk buffer

use crate::error::LoadErrorKind;
use crate::loader::header::{INSTRUCTION_SIZE, INTEGER_SIZE, INT_SIZE, NUMBER_SIZE, SIZE_T_SIZE};
use byteorder::{ByteOrder, LittleEndian};

pub type ReadResult<T> = std::result::Result<T, LoadErrorKind>;

/// Most entries reserved up front for a count-prefixed sequence. In-memory
/// entries can be far larger than their encoded form, so a count that fits
/// the buffer can still ask for gigabytes; longer sequences grow as read.
pub(crate) const MAX_PREALLOC: usize = 4096;

/// Empty vector with room for `count` entries, capped at [`MAX_PREALLOC`]
pub(crate) fn preallocate<T>(count: usize) -> Vec<T> {
    Vec::with_capacity(count.min(MAX_PREALLOC))
}

/// Reader over a borrowed buffer. No read ever goes past the end of the
/// buffer; a short read fails with `BufferUnderrun` and leaves the offset
/// where it was.
#[derive(Debug)]
pub struct ByteCursor<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> ByteCursor<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    pub fn offset(&self) -> usize {
        self.offset
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    /// Fail unless at least `n` more bytes are available
    pub fn ensure(&self, n: usize) -> ReadResult<()> {
        if n > self.remaining() {
            return Err(LoadErrorKind::BufferUnderrun {
                requested: n,
                remaining: self.remaining(),
            });
        }
        Ok(())
    }

    pub fn read_raw(&mut self, n: usize) -> ReadResult<&'a [u8]> {
        self.ensure(n)?;
        let bytes = &self.buf[self.offset..self.offset + n];
        self.offset += n;
        Ok(bytes)
    }

    /// Read up to `n` bytes, fewer if the buffer ends first. Used for
    /// literal fields, where a short buffer is a mismatch rather than an
    /// underrun.
    pub fn read_up_to(&mut self, n: usize) -> &'a [u8] {
        let n = n.min(self.remaining());
        let bytes = &self.buf[self.offset..self.offset + n];
        self.offset += n;
        bytes
    }

    pub fn read_byte(&mut self) -> ReadResult<u8> {
        Ok(self.read_raw(1)?[0])
    }

    /// C `int`: counts, line numbers, pc ranges
    pub fn read_int(&mut self) -> ReadResult<i32> {
        Ok(LittleEndian::read_i32(self.read_raw(INT_SIZE)?))
    }

    pub fn read_size_t(&mut self) -> ReadResult<u64> {
        Ok(LittleEndian::read_u64(self.read_raw(SIZE_T_SIZE)?))
    }

    /// Integer constant, widened to 64 bits
    pub fn read_integer(&mut self) -> ReadResult<i64> {
        Ok(LittleEndian::read_i32(self.read_raw(INTEGER_SIZE)?) as i64)
    }

    pub fn read_number(&mut self) -> ReadResult<f64> {
        Ok(LittleEndian::read_f64(self.read_raw(NUMBER_SIZE)?))
    }

    pub fn read_instruction(&mut self) -> ReadResult<u32> {
        Ok(LittleEndian::read_u32(self.read_raw(INSTRUCTION_SIZE)?))
    }

    /// Read a count prefix for a sequence whose entries take at least
    /// `min_entry_size` bytes each, rejecting counts the rest of the buffer
    /// could never hold before anything is allocated for them.
    ///
    /// The count is stored as a C `int`; it is reinterpreted as unsigned so
    /// negative counts become huge ones and fail the same check.
    pub fn read_count(&mut self, min_entry_size: usize) -> ReadResult<usize> {
        let count = self.read_int()? as u32 as usize;
        let needed = count
            .checked_mul(min_entry_size)
            .unwrap_or(usize::MAX);
        self.ensure(needed)?;
        Ok(count)
    }

    /// Size-prefixed string. A one-byte prefix holds `len + 1`; `0xFF`
    /// escapes to a full size_t. A stored size of zero means "no string".
    pub fn read_string(&mut self) -> ReadResult<Option<&'a [u8]>> {
        let mut size = self.read_byte()? as u64;
        if size == 0xFF {
            size = self.read_size_t()?;
        }
        if size == 0 {
            return Ok(None);
        }
        let len = usize::try_from(size - 1).map_err(|_| LoadErrorKind::BufferUnderrun {
            requested: usize::MAX,
            remaining: self.remaining(),
        })?;
        self.read_raw(len).map(Some)
    }
}
