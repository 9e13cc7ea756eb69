//! Opcode definitions for Lua 5.3 bytecode

use std::fmt;

/// Addressing form of an instruction word
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(non_camel_case_types)]
pub enum OpMode {
    iABC,
    iABx,
    iAsBx,
    iAx,
}

/// Primary opcode enumeration (6 bits)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
#[allow(non_camel_case_types)] // Opcodes follow the reference instruction naming
pub enum OpCode {
    // Loads and moves
    MOVE = 0,
    LOADK = 1,
    LOADKX = 2,
    LOADBOOL = 3,
    LOADNIL = 4,

    // Upvalues and tables
    GETUPVAL = 5,
    GETTABUP = 6,
    GETTABLE = 7,
    SETTABUP = 8,
    SETUPVAL = 9,
    SETTABLE = 10,
    NEWTABLE = 11,
    SELF = 12,

    // Arithmetic and bitwise
    ADD = 13,
    SUB = 14,
    MUL = 15,
    MOD = 16,
    POW = 17,
    DIV = 18,
    IDIV = 19,
    BAND = 20,
    BOR = 21,
    BXOR = 22,
    SHL = 23,
    SHR = 24,
    UNM = 25,
    BNOT = 26,
    NOT = 27,
    LEN = 28,
    CONCAT = 29,

    // Control flow
    JMP = 30,
    EQ = 31,
    LT = 32,
    LE = 33,
    TEST = 34,
    TESTSET = 35,
    CALL = 36,
    TAILCALL = 37,
    RETURN = 38,
    FORLOOP = 39,
    FORPREP = 40,
    TFORCALL = 41,
    TFORLOOP = 42,

    // Construction
    SETLIST = 43,
    CLOSURE = 44,
    VARARG = 45,
    EXTRAARG = 46,
}

impl OpCode {
    /// Number of defined opcodes
    pub const COUNT: usize = 47;

    const ALL: [OpCode; Self::COUNT] = [
        OpCode::MOVE,
        OpCode::LOADK,
        OpCode::LOADKX,
        OpCode::LOADBOOL,
        OpCode::LOADNIL,
        OpCode::GETUPVAL,
        OpCode::GETTABUP,
        OpCode::GETTABLE,
        OpCode::SETTABUP,
        OpCode::SETUPVAL,
        OpCode::SETTABLE,
        OpCode::NEWTABLE,
        OpCode::SELF,
        OpCode::ADD,
        OpCode::SUB,
        OpCode::MUL,
        OpCode::MOD,
        OpCode::POW,
        OpCode::DIV,
        OpCode::IDIV,
        OpCode::BAND,
        OpCode::BOR,
        OpCode::BXOR,
        OpCode::SHL,
        OpCode::SHR,
        OpCode::UNM,
        OpCode::BNOT,
        OpCode::NOT,
        OpCode::LEN,
        OpCode::CONCAT,
        OpCode::JMP,
        OpCode::EQ,
        OpCode::LT,
        OpCode::LE,
        OpCode::TEST,
        OpCode::TESTSET,
        OpCode::CALL,
        OpCode::TAILCALL,
        OpCode::RETURN,
        OpCode::FORLOOP,
        OpCode::FORPREP,
        OpCode::TFORCALL,
        OpCode::TFORLOOP,
        OpCode::SETLIST,
        OpCode::CLOSURE,
        OpCode::VARARG,
        OpCode::EXTRAARG,
    ];

    /// Parse opcode from the 6-bit opcode field. Unknown values are not an
    /// error at load time, so this returns `None` rather than failing.
    pub fn from_byte(byte: u8) -> Option<Self> {
        Self::ALL.get(byte as usize).copied()
    }

    pub fn name(&self) -> &'static str {
        match self {
            OpCode::MOVE => "MOVE",
            OpCode::LOADK => "LOADK",
            OpCode::LOADKX => "LOADKX",
            OpCode::LOADBOOL => "LOADBOOL",
            OpCode::LOADNIL => "LOADNIL",
            OpCode::GETUPVAL => "GETUPVAL",
            OpCode::GETTABUP => "GETTABUP",
            OpCode::GETTABLE => "GETTABLE",
            OpCode::SETTABUP => "SETTABUP",
            OpCode::SETUPVAL => "SETUPVAL",
            OpCode::SETTABLE => "SETTABLE",
            OpCode::NEWTABLE => "NEWTABLE",
            OpCode::SELF => "SELF",
            OpCode::ADD => "ADD",
            OpCode::SUB => "SUB",
            OpCode::MUL => "MUL",
            OpCode::MOD => "MOD",
            OpCode::POW => "POW",
            OpCode::DIV => "DIV",
            OpCode::IDIV => "IDIV",
            OpCode::BAND => "BAND",
            OpCode::BOR => "BOR",
            OpCode::BXOR => "BXOR",
            OpCode::SHL => "SHL",
            OpCode::SHR => "SHR",
            OpCode::UNM => "UNM",
            OpCode::BNOT => "BNOT",
            OpCode::NOT => "NOT",
            OpCode::LEN => "LEN",
            OpCode::CONCAT => "CONCAT",
            OpCode::JMP => "JMP",
            OpCode::EQ => "EQ",
            OpCode::LT => "LT",
            OpCode::LE => "LE",
            OpCode::TEST => "TEST",
            OpCode::TESTSET => "TESTSET",
            OpCode::CALL => "CALL",
            OpCode::TAILCALL => "TAILCALL",
            OpCode::RETURN => "RETURN",
            OpCode::FORLOOP => "FORLOOP",
            OpCode::FORPREP => "FORPREP",
            OpCode::TFORCALL => "TFORCALL",
            OpCode::TFORLOOP => "TFORLOOP",
            OpCode::SETLIST => "SETLIST",
            OpCode::CLOSURE => "CLOSURE",
            OpCode::VARARG => "VARARG",
            OpCode::EXTRAARG => "EXTRAARG",
        }
    }

    /// Addressing form used to decode this opcode's operands
    pub fn mode(&self) -> OpMode {
        match self {
            OpCode::LOADK | OpCode::LOADKX | OpCode::CLOSURE => OpMode::iABx,

            OpCode::JMP | OpCode::FORLOOP | OpCode::FORPREP | OpCode::TFORLOOP => OpMode::iAsBx,

            OpCode::EXTRAARG => OpMode::iAx,

            _ => OpMode::iABC,
        }
    }

    /// Check if this opcode modifies control flow
    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            OpCode::JMP
                | OpCode::EQ
                | OpCode::LT
                | OpCode::LE
                | OpCode::TEST
                | OpCode::TESTSET
                | OpCode::CALL
                | OpCode::TAILCALL
                | OpCode::RETURN
                | OpCode::FORLOOP
                | OpCode::FORPREP
                | OpCode::TFORCALL
                | OpCode::TFORLOOP
        )
    }

    /// Whether the B and C fields of this opcode may address the constant
    /// pool (RK operands)
    pub fn uses_rk(&self) -> (bool, bool) {
        match self {
            OpCode::GETTABUP | OpCode::GETTABLE | OpCode::SELF => (false, true),
            OpCode::SETTABUP
            | OpCode::SETTABLE
            | OpCode::ADD
            | OpCode::SUB
            | OpCode::MUL
            | OpCode::MOD
            | OpCode::POW
            | OpCode::DIV
            | OpCode::IDIV
            | OpCode::BAND
            | OpCode::BOR
            | OpCode::BXOR
            | OpCode::SHL
            | OpCode::SHR
            | OpCode::EQ
            | OpCode::LT
            | OpCode::LE => (true, true),
            _ => (false, false),
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opcode_from_byte() {
        assert_eq!(OpCode::from_byte(0), Some(OpCode::MOVE));
        assert_eq!(OpCode::from_byte(30), Some(OpCode::JMP));
        assert_eq!(OpCode::from_byte(46), Some(OpCode::EXTRAARG));
        assert_eq!(OpCode::from_byte(47), None);
        assert_eq!(OpCode::from_byte(63), None);
    }

    #[test]
    fn test_table_matches_discriminants() {
        for (i, op) in OpCode::ALL.iter().enumerate() {
            assert_eq!(*op as usize, i, "{op} is out of order");
        }
    }

    #[test]
    fn test_opcode_properties() {
        assert_eq!(OpCode::MOVE.mode(), OpMode::iABC);
        assert_eq!(OpCode::LOADK.mode(), OpMode::iABx);
        assert_eq!(OpCode::FORPREP.mode(), OpMode::iAsBx);
        assert_eq!(OpCode::EXTRAARG.mode(), OpMode::iAx);

        assert!(OpCode::JMP.is_control_flow());
        assert!(!OpCode::ADD.is_control_flow());

        assert_eq!(OpCode::ADD.uses_rk(), (true, true));
        assert_eq!(OpCode::GETTABLE.uses_rk(), (false, true));
        assert_eq!(OpCode::MOVE.uses_rk(), (false, false));
        assert_eq!(OpCode::TFORLOOP.to_string(), "TFORLOOP");
    }
}
