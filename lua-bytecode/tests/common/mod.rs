use lua_bytecode::{LUA_SIGNATURE, LUAC_DATA, LUAC_FORMAT, LUAC_NUM, LUAC_VERSION};

/// Assembles chunk bytes field by field
///
/// Tests that need a malformed chunk build a valid one and then patch the
/// offending bytes, so every helper writes exactly what `luac` would.
#[derive(Default)]
pub struct ChunkBuilder {
    bytes: Vec<u8>,
}

#[allow(dead_code)]
impl ChunkBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Standard header for 4-byte int, 8-byte size_t, 4-byte instruction,
    /// 4-byte integer and 8-byte float
    pub fn header(mut self) -> Self {
        self.bytes.extend_from_slice(LUA_SIGNATURE);
        self.bytes.push(LUAC_VERSION);
        self.bytes.push(LUAC_FORMAT);
        self.bytes.extend_from_slice(LUAC_DATA);
        self.bytes.extend_from_slice(&[4, 8, 4, 4, 8]);
        self.bytes.extend_from_slice(&0x5678i32.to_le_bytes());
        self.bytes.extend_from_slice(&LUAC_NUM.to_le_bytes());
        self
    }

    pub fn byte(mut self, b: u8) -> Self {
        self.bytes.push(b);
        self
    }

    pub fn int(mut self, value: i32) -> Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn number(mut self, value: f64) -> Self {
        self.bytes.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn string(mut self, s: Option<&[u8]>) -> Self {
        match s {
            None => self.bytes.push(0),
            Some(s) if s.len() + 1 < 0xFF => {
                self.bytes.push((s.len() + 1) as u8);
                self.bytes.extend_from_slice(s);
            }
            Some(s) => {
                self.bytes.push(0xFF);
                self.bytes.extend_from_slice(&(s.len() as u64 + 1).to_le_bytes());
                self.bytes.extend_from_slice(s);
            }
        }
        self
    }

    /// Source, line range, params, vararg flag and stack size
    pub fn function_start(self, source: Option<&[u8]>, line: i32, last_line: i32) -> Self {
        self.string(source)
            .int(line)
            .int(last_line)
            .byte(0)
            .byte(1)
            .byte(2)
    }

    pub fn code(mut self, code: &[u32]) -> Self {
        self = self.int(code.len() as i32);
        for ins in code {
            self.bytes.extend_from_slice(&ins.to_le_bytes());
        }
        self
    }

    /// Upvalue descriptors as (in_stack, index) pairs
    pub fn upvalues(mut self, upvalues: &[(u8, u8)]) -> Self {
        self = self.int(upvalues.len() as i32);
        for &(in_stack, index) in upvalues {
            self.bytes.push(in_stack);
            self.bytes.push(index);
        }
        self
    }

    /// Empty line info, locals and upvalue names
    pub fn no_debug(self) -> Self {
        self.int(0).int(0).int(0)
    }

    /// Smallest well-formed function record: one RETURN, nothing else
    pub fn empty_function(self, source: Option<&[u8]>, line: i32) -> Self {
        self.function_start(source, line, line)
            .code(&[RETURN_0_1])
            .int(0)
            .upvalues(&[])
            .int(0)
            .no_debug()
    }

    pub fn raw(mut self, bytes: &[u8]) -> Self {
        self.bytes.extend_from_slice(bytes);
        self
    }

    pub fn build(self) -> Vec<u8> {
        self.bytes
    }
}

/// `RETURN 0 1`
#[allow(dead_code)]
pub const RETURN_0_1: u32 = 38 | (1 << 23);

/// A chunk whose root has no constants, no children and one `_ENV` upvalue
#[allow(dead_code)]
pub fn minimal_chunk() -> Vec<u8> {
    ChunkBuilder::new()
        .header()
        .byte(1)
        .function_start(Some(b"@min.lua"), 0, 0)
        .code(&[RETURN_0_1])
        .int(0)
        .upvalues(&[(1, 0)])
        .int(0)
        .no_debug()
        .build()
}

/// Offset of the first byte after the header
#[allow(dead_code)]
pub const HEADER_LEN: usize = 4 + 1 + 1 + 6 + 5 + 4 + 8;
