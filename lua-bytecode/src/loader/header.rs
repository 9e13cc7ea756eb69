//! Chunk header validation

use crate::error::{HeaderField, LoadErrorKind, SizeField};
use crate::loader::cursor::{ByteCursor, ReadResult};
use crate::{LUA_SIGNATURE, LUAC_DATA, LUAC_FORMAT, LUAC_INT, LUAC_NUM, LUAC_VERSION};

/// Primitive widths this loader reads
pub const INT_SIZE: usize = 4;
pub const SIZE_T_SIZE: usize = 8;
pub const INSTRUCTION_SIZE: usize = 4;
pub const INTEGER_SIZE: usize = 4;
pub const NUMBER_SIZE: usize = 8;

/// Widths declared by a chunk, in header order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub int_size: u8,
    pub size_t_size: u8,
    pub instruction_size: u8,
    pub integer_size: u8,
    pub number_size: u8,
}

impl Header {
    /// The only layout this loader accepts
    pub const NATIVE: Header = Header {
        int_size: INT_SIZE as u8,
        size_t_size: SIZE_T_SIZE as u8,
        instruction_size: INSTRUCTION_SIZE as u8,
        integer_size: INTEGER_SIZE as u8,
        number_size: NUMBER_SIZE as u8,
    };

    fn fields(&self) -> [(SizeField, u8); 5] {
        [
            (SizeField::Int, self.int_size),
            (SizeField::SizeT, self.size_t_size),
            (SizeField::Instruction, self.instruction_size),
            (SizeField::Integer, self.integer_size),
            (SizeField::Float, self.number_size),
        ]
    }

    /// Read and validate the header preamble. Checks run in chunk order and
    /// the first failure wins.
    pub fn read(cursor: &mut ByteCursor<'_>) -> ReadResult<Header> {
        check_literal(cursor, HeaderField::Signature, LUA_SIGNATURE)?;
        check_literal(cursor, HeaderField::Version, &[LUAC_VERSION])?;
        check_literal(cursor, HeaderField::Format, &[LUAC_FORMAT])?;
        check_literal(cursor, HeaderField::Tail, LUAC_DATA)?;

        let sizes = cursor.read_raw(5)?;
        let header = Header {
            int_size: sizes[0],
            size_t_size: sizes[1],
            instruction_size: sizes[2],
            integer_size: sizes[3],
            number_size: sizes[4],
        };
        for ((field, actual), (_, expected)) in header.fields().into_iter().zip(Self::NATIVE.fields()) {
            if actual != expected {
                return Err(LoadErrorKind::SizeMismatch {
                    field,
                    expected,
                    actual,
                });
            }
        }

        if cursor.read_integer()? != LUAC_INT {
            return Err(LoadErrorKind::EndiannessMismatch);
        }
        if cursor.read_number()? != LUAC_NUM {
            return Err(LoadErrorKind::FloatFormatMismatch);
        }

        Ok(header)
    }
}

fn check_literal(
    cursor: &mut ByteCursor<'_>,
    field: HeaderField,
    expected: &[u8],
) -> ReadResult<()> {
    let actual = cursor.read_up_to(expected.len());
    if actual != expected {
        return Err(LoadErrorKind::HeaderMismatch {
            field,
            expected: expected.to_vec(),
            actual: actual.to_vec(),
        });
    }
    Ok(())
}
