//! Human-readable listing of loaded prototypes
//!
//! Output follows the shape of `luac -l`:
//!
//! ```text
//! main <@hello.lua:0,0> (4 instructions)
//! 0+ params, 2 slots, 1 upvalue, 0 locals, 2 constants, 0 functions
//!         1       [1]     GETTABUP        0 0 -1  ; _ENV "print"
//!         2       [1]     LOADK           1 -2    ; "hello"
//!         3       [1]     CALL            0 2 1
//!         4       [1]     RETURN          0 1
//! ```

use crate::core::instructions::{Instruction, Operands, index_k, is_k};
use crate::core::opcodes::OpCode;
use crate::core::prototype::Prototype;
use std::fmt;

#[derive(Debug, Clone)]
pub struct ListingConfig {
    pub show_constants: bool,
    pub show_locals: bool,
    pub show_upvalues: bool,
    pub recursive: bool,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            show_constants: false,
            show_locals: false,
            show_upvalues: false,
            recursive: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Listing {
    config: ListingConfig,
}

impl Listing {
    pub fn new() -> Self {
        Self::default()
    }

    /// Include constant, local and upvalue tables (`luac -l -l`)
    pub fn full() -> Self {
        Self::new()
            .show_constants(true)
            .show_locals(true)
            .show_upvalues(true)
    }

    pub fn show_constants(mut self, show: bool) -> Self {
        self.config.show_constants = show;
        self
    }

    pub fn show_locals(mut self, show: bool) -> Self {
        self.config.show_locals = show;
        self
    }

    pub fn show_upvalues(mut self, show: bool) -> Self {
        self.config.show_upvalues = show;
        self
    }

    pub fn recursive(mut self, recursive: bool) -> Self {
        self.config.recursive = recursive;
        self
    }

    /// A `Display` view of `proto` under this configuration
    pub fn display<'a>(&'a self, proto: &'a Prototype) -> ListingView<'a> {
        ListingView {
            config: &self.config,
            proto,
        }
    }

    pub fn render(&self, proto: &Prototype) -> String {
        self.display(proto).to_string()
    }
}

pub struct ListingView<'a> {
    config: &'a ListingConfig,
    proto: &'a Prototype,
}

impl fmt::Display for ListingView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_function(f, self.config, self.proto)
    }
}

fn plural(n: usize) -> &'static str {
    if n == 1 { "" } else { "s" }
}

fn write_function(f: &mut fmt::Formatter<'_>, config: &ListingConfig, proto: &Prototype) -> fmt::Result {
    write_header(f, proto)?;
    for (pc, ins) in proto.code().iter().enumerate() {
        write_instruction(f, proto, pc, ins)?;
    }
    if config.show_constants {
        writeln!(f, "constants ({}):", proto.constants().len())?;
        for (i, k) in proto.constants().iter().enumerate() {
            writeln!(f, "\t{}\t{k}", i + 1)?;
        }
    }
    if config.show_locals {
        writeln!(f, "locals ({}):", proto.local_vars().len())?;
        for (i, local) in proto.local_vars().iter().enumerate() {
            writeln!(
                f,
                "\t{i}\t{}\t{}\t{}",
                String::from_utf8_lossy(&local.name),
                local.start_pc as i64 + 1,
                local.end_pc as i64 + 1
            )?;
        }
    }
    if config.show_upvalues {
        writeln!(f, "upvalues ({}):", proto.upvalues().len())?;
        for (i, upvalue) in proto.upvalues().iter().enumerate() {
            writeln!(
                f,
                "\t{i}\t{}\t{}\t{}",
                upvalue_name(proto, i),
                upvalue.in_stack as u8,
                upvalue.index
            )?;
        }
    }
    if config.recursive {
        for child in proto.protos() {
            writeln!(f)?;
            write_function(f, config, child)?;
        }
    }
    Ok(())
}

fn write_header(f: &mut fmt::Formatter<'_>, proto: &Prototype) -> fmt::Result {
    let n = proto.code().len();
    writeln!(
        f,
        "{} <{}:{},{}> ({n} instruction{})",
        if proto.is_main() { "main" } else { "function" },
        proto.source_lossy(),
        proto.line_defined(),
        proto.last_line_defined(),
        plural(n)
    )?;

    let params = proto.num_params() as usize;
    let slots = proto.max_stack_size() as usize;
    let upvalues = proto.upvalues().len();
    let locals = proto.local_vars().len();
    let constants = proto.constants().len();
    let functions = proto.protos().len();
    writeln!(
        f,
        "{params}{} param{}, {slots} slot{}, {upvalues} upvalue{}, {locals} local{}, {constants} constant{}, {functions} function{}",
        if proto.is_vararg() { "+" } else { "" },
        plural(params),
        plural(slots),
        plural(upvalues),
        plural(locals),
        plural(constants),
        plural(functions)
    )
}

fn upvalue_name(proto: &Prototype, index: usize) -> String {
    match proto.upvalues().get(index).and_then(|u| u.name.as_deref()) {
        Some(name) => String::from_utf8_lossy(name).into_owned(),
        None => "-".to_string(),
    }
}

fn constant_text(proto: &Prototype, index: usize) -> String {
    match proto.constant(index) {
        Some(k) => k.to_string(),
        None => "?".to_string(),
    }
}

/// RK operand as luac prints it: constants as negative one-based indices
fn rk(operand: u16) -> i32 {
    if is_k(operand) {
        -1 - index_k(operand) as i32
    } else {
        operand as i32
    }
}

fn write_instruction(f: &mut fmt::Formatter<'_>, proto: &Prototype, pc: usize, ins: &Instruction) -> fmt::Result {
    write!(f, "\t{}\t", pc + 1)?;
    match proto.line_at(pc) {
        Some(line) => write!(f, "[{line}]\t")?,
        None => write!(f, "[-]\t")?,
    }

    let (Some(op), Some(operands)) = (ins.op(), ins.operands()) else {
        return writeln!(f, "{:<9}\t{:#010x}", "UNKNOWN", ins.raw);
    };
    write!(f, "{:<9}\t", op.name())?;

    let (b_rk, c_rk) = op.uses_rk();
    match operands {
        Operands::ABC { a, b, c } => {
            let b = if b_rk { rk(b) } else { b as i32 };
            let c = if c_rk { rk(c) } else { c as i32 };
            write!(f, "{a} {b} {c}")?;
        }
        Operands::ABx { a, bx } if op == OpCode::LOADK => write!(f, "{a} {}", -1 - bx as i64)?,
        Operands::ABx { a, bx } => write!(f, "{a} {bx}")?,
        Operands::AsBx { a, sbx } => write!(f, "{a} {sbx}")?,
        Operands::Ax { ax } => write!(f, "{}", -1 - ax as i64)?,
    }

    match op {
        OpCode::LOADK => write!(f, "\t; {}", constant_text(proto, ins.bx as usize))?,
        OpCode::GETUPVAL | OpCode::SETUPVAL => {
            write!(f, "\t; {}", upvalue_name(proto, ins.b as usize))?
        }
        OpCode::GETTABUP => {
            write!(f, "\t; {}", upvalue_name(proto, ins.b as usize))?;
            if is_k(ins.c) {
                write!(f, " {}", constant_text(proto, index_k(ins.c) as usize))?;
            }
        }
        OpCode::SETTABUP => {
            write!(f, "\t; {}", upvalue_name(proto, ins.a as usize))?;
            for operand in [ins.b, ins.c] {
                if is_k(operand) {
                    write!(f, " {}", constant_text(proto, index_k(operand) as usize))?;
                }
            }
        }
        OpCode::JMP | OpCode::FORLOOP | OpCode::FORPREP | OpCode::TFORLOOP => {
            write!(f, "\t; to {}", pc as i64 + ins.sbx as i64 + 2)?
        }
        OpCode::CLOSURE => write!(f, "\t; function[{}]", ins.bx)?,
        _ if (b_rk || c_rk) && (is_k(ins.b) || is_k(ins.c)) => {
            let show = |operand: u16, used: bool| {
                if used && is_k(operand) {
                    constant_text(proto, index_k(operand) as usize)
                } else {
                    "-".to_string()
                }
            };
            write!(f, "\t; {} {}", show(ins.b, b_rk), show(ins.c, c_rk))?
        }
        _ => {}
    }
    writeln!(f)
}
