//! Function record reading

use crate::core::constants::Intern;
use crate::core::instructions::Instruction;
use crate::core::prototype::{Prototype, UpvalueDesc};
use crate::error::LoadErrorKind;
use crate::loader::constants::read_constants;
use crate::loader::cursor::{ByteCursor, ReadResult, preallocate};
use crate::loader::debug::read_debug;
use crate::loader::header::{INSTRUCTION_SIZE, INT_SIZE};
use tracing::trace;

/// Smallest encoded function record: an absent source byte, the two line
/// numbers, three flag bytes and seven empty count prefixes
pub(crate) const MIN_FUNCTION_SIZE: usize = 1 + 2 * INT_SIZE + 3 + 7 * INT_SIZE;

/// Builds the prototype tree of one chunk, recursing once per nested
/// function
pub(crate) struct PrototypeBuilder<'c, 'a, I: Intern + ?Sized> {
    cursor: &'c mut ByteCursor<'a>,
    interner: &'c I,
    max_depth: usize,
}

impl<'c, 'a, I: Intern + ?Sized> PrototypeBuilder<'c, 'a, I> {
    pub fn new(cursor: &'c mut ByteCursor<'a>, interner: &'c I, max_depth: usize) -> Self {
        Self {
            cursor,
            interner,
            max_depth,
        }
    }

    /// Read the root function record
    pub fn read_root(&mut self) -> ReadResult<Prototype> {
        self.read_function(None, 0)
    }

    fn read_function(&mut self, parent_source: Option<&[u8]>, depth: usize) -> ReadResult<Prototype> {
        if depth > self.max_depth {
            return Err(LoadErrorKind::NestingTooDeep {
                limit: self.max_depth,
            });
        }

        let start = self.cursor.offset();
        let source = match self.cursor.read_string()? {
            Some(source) if !source.is_empty() => Some(source.to_vec()),
            // Nested functions share their parent's source
            _ => parent_source.map(<[u8]>::to_vec),
        };

        let mut proto = Prototype {
            source,
            line_defined: self.cursor.read_int()?,
            last_line_defined: self.cursor.read_int()?,
            num_params: self.cursor.read_byte()?,
            is_vararg: self.cursor.read_byte()? != 0,
            max_stack_size: self.cursor.read_byte()?,
            ..Default::default()
        };

        proto.code = self.read_code()?;
        proto.constants = read_constants(self.cursor, self.interner)?;
        proto.upvalues = self.read_upvalues()?;
        proto.protos = self.read_protos(proto.source.as_deref(), depth)?;
        read_debug(self.cursor, &mut proto)?;

        trace!(
            offset = start,
            depth,
            line = proto.line_defined,
            instructions = proto.code.len(),
            constants = proto.constants.len(),
            "read function"
        );
        Ok(proto)
    }

    fn read_code(&mut self) -> ReadResult<Vec<Instruction>> {
        let count = self.cursor.read_count(INSTRUCTION_SIZE)?;
        let mut code = preallocate(count);
        for _ in 0..count {
            code.push(Instruction::decode(self.cursor.read_instruction()?));
        }
        Ok(code)
    }

    fn read_upvalues(&mut self) -> ReadResult<Vec<UpvalueDesc>> {
        let count = self.cursor.read_count(2)?;
        let mut upvalues = preallocate(count);
        for _ in 0..count {
            upvalues.push(UpvalueDesc {
                in_stack: self.cursor.read_byte()? != 0,
                index: self.cursor.read_byte()?,
                name: None,
            });
        }
        Ok(upvalues)
    }

    fn read_protos(&mut self, source: Option<&[u8]>, depth: usize) -> ReadResult<Vec<Prototype>> {
        let count = self.cursor.read_count(MIN_FUNCTION_SIZE)?;
        let mut protos = preallocate(count);
        for _ in 0..count {
            protos.push(self.read_function(source, depth + 1)?);
        }
        Ok(protos)
    }
}
