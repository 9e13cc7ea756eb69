//! Function prototypes and the closure produced by a load

use crate::core::constants::Constant;
use crate::core::instructions::Instruction;

/// Describes where a function's upvalue is captured from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpvalueDesc {
    /// Captured from the enclosing function's registers (`true`) or from
    /// the enclosing function's own upvalues (`false`)
    pub in_stack: bool,
    pub index: u8,
    /// Debug-only; filled from the debug section
    pub name: Option<Vec<u8>>,
}

/// Live range of a local variable, in instruction indices
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalVar {
    pub name: Vec<u8>,
    pub start_pc: i32,
    pub end_pc: i32,
}

/// Static description of one function
///
/// Children are owned exclusively by their parent, so a chunk forms a tree.
/// Prototypes are read-only once a load returns.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Prototype {
    pub(crate) source: Option<Vec<u8>>,
    pub(crate) line_defined: i32,
    pub(crate) last_line_defined: i32,
    pub(crate) num_params: u8,
    pub(crate) is_vararg: bool,
    pub(crate) max_stack_size: u8,
    pub(crate) code: Vec<Instruction>,
    pub(crate) constants: Vec<Constant>,
    pub(crate) upvalues: Vec<UpvalueDesc>,
    pub(crate) protos: Vec<Prototype>,
    pub(crate) line_info: Vec<i32>,
    pub(crate) local_vars: Vec<LocalVar>,
}

impl Prototype {
    /// Source name, inherited from the parent when the chunk omits it.
    /// `None` only for a root function dumped without a source.
    pub fn source(&self) -> Option<&[u8]> {
        self.source.as_deref()
    }

    pub fn source_lossy(&self) -> String {
        match &self.source {
            Some(s) => String::from_utf8_lossy(s).into_owned(),
            None => "=?".to_string(),
        }
    }

    pub fn line_defined(&self) -> i32 {
        self.line_defined
    }

    pub fn last_line_defined(&self) -> i32 {
        self.last_line_defined
    }

    pub fn num_params(&self) -> u8 {
        self.num_params
    }

    pub fn is_vararg(&self) -> bool {
        self.is_vararg
    }

    pub fn max_stack_size(&self) -> u8 {
        self.max_stack_size
    }

    pub fn code(&self) -> &[Instruction] {
        &self.code
    }

    pub fn constants(&self) -> &[Constant] {
        &self.constants
    }

    pub fn constant(&self, index: usize) -> Option<&Constant> {
        self.constants.get(index)
    }

    pub fn upvalues(&self) -> &[UpvalueDesc] {
        &self.upvalues
    }

    pub fn protos(&self) -> &[Prototype] {
        &self.protos
    }

    pub fn line_info(&self) -> &[i32] {
        &self.line_info
    }

    /// Source line of instruction `pc`, if debug info was kept
    pub fn line_at(&self, pc: usize) -> Option<i32> {
        self.line_info.get(pc).copied()
    }

    pub fn local_vars(&self) -> &[LocalVar] {
        &self.local_vars
    }

    /// Whether this is the main chunk rather than a nested function
    pub fn is_main(&self) -> bool {
        self.line_defined == 0
    }

    /// Number of prototypes in this tree, including this one
    pub fn count(&self) -> usize {
        1 + self.protos.iter().map(Prototype::count).sum::<usize>()
    }

    pub(crate) fn strip_debug(&mut self) {
        self.line_info = Vec::new();
        self.local_vars = Vec::new();
        for upvalue in &mut self.upvalues {
            upvalue.name = None;
        }
        for child in &mut self.protos {
            child.strip_debug();
        }
    }
}

/// A loaded root function ready to be installed on the VM's stack
#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    proto: Prototype,
    upvalue_count: u8,
}

impl Closure {
    /// Pair a root prototype with the upvalue count declared in the chunk.
    /// The loader only builds closures whose counts agree.
    pub(crate) fn new(proto: Prototype, upvalue_count: u8) -> Self {
        Self {
            proto,
            upvalue_count,
        }
    }

    pub fn proto(&self) -> &Prototype {
        &self.proto
    }

    pub fn upvalue_count(&self) -> u8 {
        self.upvalue_count
    }

    pub fn into_proto(self) -> Prototype {
        self.proto
    }
}
