pub mod constants;
pub mod instructions;
pub mod opcodes;
pub mod prototype;

// Re-export core types
pub use self::constants::{Constant, Intern, LuaStr, StringInterner};
pub use self::instructions::{Instruction, Operands};
pub use self::opcodes::{OpCode, OpMode};
pub use self::prototype::{Closure, LocalVar, Prototype, UpvalueDesc};
