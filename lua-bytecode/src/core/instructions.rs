//! Instruction decoding and encoding for Lua 5.3 bytecode
//!
//! Every instruction is one 32-bit word. Reading from the most significant
//! bit, the three addressing forms are laid out as:
//!
//! ```text
//! iABC:  [B:9][C:9][A:8][OP:6]
//! iABx:  [  Bx:18 ][A:8][OP:6]
//! iAsBx: [ sBx:18 ][A:8][OP:6]
//! iAx:   [     Ax:26    ][OP:6]
//! ```
//!
//! `sBx` is stored as `Bx` biased by [`MAXARG_SBX`].

use crate::core::opcodes::{OpCode, OpMode};
use std::fmt;

pub const SIZE_OP: u32 = 6;
pub const SIZE_A: u32 = 8;
pub const SIZE_B: u32 = 9;
pub const SIZE_C: u32 = 9;
pub const SIZE_BX: u32 = SIZE_C + SIZE_B;
pub const SIZE_AX: u32 = SIZE_C + SIZE_B + SIZE_A;

pub const POS_OP: u32 = 0;
pub const POS_A: u32 = POS_OP + SIZE_OP;
pub const POS_C: u32 = POS_A + SIZE_A;
pub const POS_B: u32 = POS_C + SIZE_C;
pub const POS_BX: u32 = POS_C;
pub const POS_AX: u32 = POS_A;

pub const MAXARG_BX: u32 = (1 << SIZE_BX) - 1;
pub const MAXARG_SBX: i32 = (MAXARG_BX >> 1) as i32;
pub const MAXARG_AX: u32 = (1 << SIZE_AX) - 1;

/// Bit set in a B or C operand when it indexes the constant pool
pub const BITRK: u16 = 1 << (SIZE_B - 1);

/// Mask with `n` one bits starting at bit `p`
const fn mask1(n: u32, p: u32) -> u32 {
    (!((!0u32) << n)) << p
}

#[inline]
const fn field(word: u32, pos: u32, size: u32) -> u32 {
    (word >> pos) & mask1(size, 0)
}

/// Decoded 32-bit instruction
///
/// All fields are extracted regardless of the opcode; which of them are
/// meaningful depends on the opcode's [`OpMode`], see [`Instruction::operands`].
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Instruction {
    pub raw: u32,
    pub opcode: u8,
    pub a: u8,
    pub b: u16,
    pub c: u16,
    pub bx: u32,
    pub ax: u32,
    pub sbx: i32,
}

/// Operands of an instruction, shaped by its addressing form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operands {
    ABC { a: u8, b: u16, c: u16 },
    ABx { a: u8, bx: u32 },
    AsBx { a: u8, sbx: i32 },
    Ax { ax: u32 },
}

impl Instruction {
    /// Split a raw word into its fields. Never fails; unknown opcodes are
    /// left for the interpreter to reject.
    pub const fn decode(raw: u32) -> Self {
        let bx = field(raw, POS_BX, SIZE_BX);
        Self {
            raw,
            opcode: field(raw, POS_OP, SIZE_OP) as u8,
            a: field(raw, POS_A, SIZE_A) as u8,
            b: field(raw, POS_B, SIZE_B) as u16,
            c: field(raw, POS_C, SIZE_C) as u16,
            bx,
            ax: field(raw, POS_AX, SIZE_AX),
            sbx: bx as i32 - MAXARG_SBX,
        }
    }

    pub const fn abc(op: OpCode, a: u8, b: u16, c: u16) -> Self {
        Self::decode(
            (op as u32) << POS_OP
                | (a as u32) << POS_A
                | (b as u32 & mask1(SIZE_B, 0)) << POS_B
                | (c as u32 & mask1(SIZE_C, 0)) << POS_C,
        )
    }

    pub const fn abx(op: OpCode, a: u8, bx: u32) -> Self {
        Self::decode((op as u32) << POS_OP | (a as u32) << POS_A | (bx & MAXARG_BX) << POS_BX)
    }

    /// `sbx` is meaningful in `-MAXARG_SBX..=MAXARG_SBX + 1`; values outside
    /// that range wrap within the 18-bit field like any other operand.
    pub const fn asbx(op: OpCode, a: u8, sbx: i32) -> Self {
        Self::abx(op, a, sbx.wrapping_add(MAXARG_SBX) as u32)
    }

    pub const fn ax(op: OpCode, ax: u32) -> Self {
        Self::decode((op as u32) << POS_OP | (ax & MAXARG_AX) << POS_AX)
    }

    /// The opcode, if it is one this format defines
    pub fn op(&self) -> Option<OpCode> {
        OpCode::from_byte(self.opcode)
    }

    /// The fields this instruction's opcode actually carries, or `None` for
    /// an unknown opcode
    pub fn operands(&self) -> Option<Operands> {
        let op = self.op()?;
        Some(match op.mode() {
            OpMode::iABC => Operands::ABC {
                a: self.a,
                b: self.b,
                c: self.c,
            },
            OpMode::iABx => Operands::ABx {
                a: self.a,
                bx: self.bx,
            },
            OpMode::iAsBx => Operands::AsBx {
                a: self.a,
                sbx: self.sbx,
            },
            OpMode::iAx => Operands::Ax { ax: self.ax },
        })
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        self.raw.to_le_bytes()
    }
}

/// Whether an RK operand refers to the constant pool
pub fn is_k(operand: u16) -> bool {
    operand & BITRK != 0
}

/// Constant pool index encoded in an RK operand
pub fn index_k(operand: u16) -> u16 {
    operand & !BITRK
}

impl fmt::Debug for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.op(), self.operands()) {
            (Some(op), Some(operands)) => {
                write!(f, "{op}")?;
                match operands {
                    Operands::ABC { a, b, c } => write!(f, " {a} {b} {c}"),
                    Operands::ABx { a, bx } => write!(f, " {a} {bx}"),
                    Operands::AsBx { a, sbx } => write!(f, " {a} {sbx}"),
                    Operands::Ax { ax } => write!(f, " {ax}"),
                }
            }
            _ => write!(f, "INVALID({:#010x})", self.raw),
        }
    }
}
