//! Chunk writer
//!
//! Writes closures back out in the layout the loader reads, so a loaded
//! chunk can be cached, shipped, or compared structurally after a reload.

use crate::core::constants::Constant;
use crate::core::prototype::{Closure, Prototype};
use crate::{LUA_SIGNATURE, LUAC_DATA, LUAC_FORMAT, LUAC_INT, LUAC_NUM, LUAC_VERSION};
use crate::loader::Header;
use byteorder::{LittleEndian, WriteBytesExt};
use std::io::{self, Write};

pub struct ChunkWriter<W: Write> {
    out: W,
    strip: bool,
}

impl<W: Write> ChunkWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, strip: false }
    }

    /// Omit line info, local and upvalue names, and source names
    pub fn strip(mut self, strip: bool) -> Self {
        self.strip = strip;
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    pub fn write_closure(&mut self, closure: &Closure) -> io::Result<()> {
        self.write_header()?;
        self.out.write_u8(closure.upvalue_count())?;
        self.write_function(closure.proto(), None)?;
        metrics::counter!("lua_bytecode.chunks_dumped").increment(1);
        Ok(())
    }

    fn write_header(&mut self) -> io::Result<()> {
        let native = Header::NATIVE;
        self.out.write_all(LUA_SIGNATURE)?;
        self.out.write_u8(LUAC_VERSION)?;
        self.out.write_u8(LUAC_FORMAT)?;
        self.out.write_all(LUAC_DATA)?;
        self.out.write_all(&[
            native.int_size,
            native.size_t_size,
            native.instruction_size,
            native.integer_size,
            native.number_size,
        ])?;
        self.out.write_i32::<LittleEndian>(LUAC_INT as i32)?;
        self.out.write_f64::<LittleEndian>(LUAC_NUM)
    }

    fn write_function(&mut self, proto: &Prototype, parent_source: Option<&[u8]>) -> io::Result<()> {
        let source = if self.strip || proto.source() == parent_source {
            None
        } else {
            proto.source()
        };
        self.write_string(source)?;
        self.write_int(proto.line_defined())?;
        self.write_int(proto.last_line_defined())?;
        self.out.write_u8(proto.num_params())?;
        self.out.write_u8(proto.is_vararg() as u8)?;
        self.out.write_u8(proto.max_stack_size())?;

        self.write_count(proto.code().len())?;
        for ins in proto.code() {
            self.out.write_u32::<LittleEndian>(ins.raw)?;
        }

        self.write_count(proto.constants().len())?;
        for constant in proto.constants() {
            self.write_constant(constant)?;
        }

        self.write_count(proto.upvalues().len())?;
        for upvalue in proto.upvalues() {
            self.out.write_u8(upvalue.in_stack as u8)?;
            self.out.write_u8(upvalue.index)?;
        }

        self.write_count(proto.protos().len())?;
        for child in proto.protos() {
            self.write_function(child, proto.source())?;
        }

        self.write_debug(proto)
    }

    fn write_constant(&mut self, constant: &Constant) -> io::Result<()> {
        self.out.write_u8(constant.tag())?;
        match constant {
            Constant::Nil => Ok(()),
            Constant::Boolean(b) => self.out.write_u8(*b as u8),
            Constant::Float(n) => self.out.write_f64::<LittleEndian>(*n),
            Constant::Integer(i) => {
                let narrow = i32::try_from(*i).map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("integer constant {i} does not fit in 4 bytes"),
                    )
                })?;
                self.out.write_i32::<LittleEndian>(narrow)
            }
            Constant::String(s) => self.write_string(Some(s.as_bytes())),
        }
    }

    fn write_debug(&mut self, proto: &Prototype) -> io::Result<()> {
        if self.strip {
            return (0..3).try_for_each(|_| self.write_int(0));
        }

        self.write_count(proto.line_info().len())?;
        for line in proto.line_info() {
            self.write_int(*line)?;
        }

        self.write_count(proto.local_vars().len())?;
        for local in proto.local_vars() {
            self.write_string(Some(&local.name))?;
            self.write_int(local.start_pc)?;
            self.write_int(local.end_pc)?;
        }

        self.write_count(proto.upvalues().len())?;
        for upvalue in proto.upvalues() {
            self.write_string(upvalue.name.as_deref())?;
        }
        Ok(())
    }

    fn write_int(&mut self, value: i32) -> io::Result<()> {
        self.out.write_i32::<LittleEndian>(value)
    }

    fn write_count(&mut self, count: usize) -> io::Result<()> {
        let count = i32::try_from(count)
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidData, "sequence too long for chunk"))?;
        self.write_int(count)
    }

    fn write_string(&mut self, s: Option<&[u8]>) -> io::Result<()> {
        let Some(bytes) = s else {
            return self.out.write_u8(0);
        };
        let size = bytes.len() + 1;
        if size < 0xFF {
            self.out.write_u8(size as u8)?;
        } else {
            self.out.write_u8(0xFF)?;
            self.out.write_u64::<LittleEndian>(size as u64)?;
        }
        self.out.write_all(bytes)
    }
}

/// Serialize a closure into a new buffer
pub fn dump(closure: &Closure, strip: bool) -> io::Result<Vec<u8>> {
    let mut writer = ChunkWriter::new(Vec::new()).strip(strip);
    writer.write_closure(closure)?;
    Ok(writer.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::constants::{Intern, StringInterner};
    use crate::core::instructions::Instruction;
    use crate::core::opcodes::OpCode;
    use crate::core::prototype::{LocalVar, UpvalueDesc};
    use crate::loader::Loader;
    use pretty_assertions::assert_eq;

    fn sample(interner: &StringInterner) -> Closure {
        let child = Prototype {
            source: Some(b"@main.lua".to_vec()),
            line_defined: 2,
            last_line_defined: 4,
            num_params: 1,
            max_stack_size: 2,
            code: vec![Instruction::abc(OpCode::RETURN, 0, 1, 0)],
            line_info: vec![4],
            local_vars: vec![LocalVar {
                name: b"n".to_vec(),
                start_pc: 0,
                end_pc: 1,
            }],
            ..Default::default()
        };
        let root = Prototype {
            source: Some(b"@main.lua".to_vec()),
            is_vararg: true,
            max_stack_size: 2,
            code: vec![
                Instruction::abx(OpCode::CLOSURE, 0, 0),
                Instruction::abx(OpCode::LOADK, 1, 0),
                Instruction::abc(OpCode::RETURN, 0, 1, 0),
            ],
            constants: vec![
                Constant::String(interner.intern(&[b'q'; 300])),
                Constant::Integer(-9),
            ],
            upvalues: vec![UpvalueDesc {
                in_stack: true,
                index: 0,
                name: Some(b"_ENV".to_vec()),
            }],
            protos: vec![child],
            line_info: vec![4, 1, 5],
            ..Default::default()
        };
        Closure::new(root, 1)
    }

    #[test]
    fn test_round_trip() {
        let interner = StringInterner::new();
        let closure = sample(&interner);
        let bytes = dump(&closure, false).unwrap();
        let loaded = Loader::new(&interner).load(&bytes, "=test").unwrap();
        assert_eq!(loaded, closure);
    }

    #[test]
    fn test_child_source_written_as_absent() {
        let interner = StringInterner::new();
        let closure = sample(&interner);
        let full = dump(&closure, false).unwrap();
        // The root source appears once; the child inherits it
        let needle = b"@main.lua";
        let hits = full.windows(needle.len()).filter(|w| w == needle).count();
        assert_eq!(hits, 1);
    }

    #[test]
    fn test_stripped_round_trip() {
        let interner = StringInterner::new();
        let closure = sample(&interner);
        let bytes = dump(&closure, true).unwrap();
        let loaded = Loader::new(&interner).load(&bytes, "=test").unwrap();

        let mut expected = closure.into_proto();
        expected.strip_debug();
        expected.source = None;
        expected.protos[0].source = None;
        assert_eq!(loaded.proto(), &expected);
    }

    #[test]
    fn test_wide_integer_rejected() {
        let proto = Prototype {
            constants: vec![Constant::Integer(i64::MAX)],
            ..Default::default()
        };
        let err = dump(&Closure::new(proto, 0), false).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }
}
