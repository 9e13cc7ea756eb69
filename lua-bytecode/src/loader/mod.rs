//! Precompiled chunk loader
//!
//! Turns a dumped chunk into a [`Closure`] over its root [`Prototype`]. A
//! load either returns a fully built tree or fails with a [`LoadError`];
//! nothing partially built escapes.
//!
//! ## Example
//!
//! ```ignore
//! use lua_bytecode::{Loader, StringInterner};
//!
//! let interner = StringInterner::new();
//! let closure = Loader::new(&interner)
//!     .keep_debug_info(false)
//!     .load(&bytes, "@main.luac")?;
//! ```

mod constants;
mod cursor;
mod debug;
mod function;
mod header;

pub use self::cursor::{ByteCursor, ReadResult};
pub use self::header::{
    Header, INSTRUCTION_SIZE, INT_SIZE, INTEGER_SIZE, NUMBER_SIZE, SIZE_T_SIZE,
};

use crate::core::constants::Intern;
use crate::core::prototype::{Closure, Prototype};
use crate::error::{LoadError, LoadErrorKind, Result};
use self::function::PrototypeBuilder;
use tracing::{debug, warn};

#[derive(Debug, Clone)]
pub struct LoaderConfig {
    /// Deepest nesting of function records accepted; the root is depth 0
    pub max_depth: usize,
    /// Keep line info, local names and upvalue names on the result
    pub keep_debug_info: bool,
}

impl LoaderConfig {
    pub const DEFAULT_MAX_DEPTH: usize = 200;
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            max_depth: Self::DEFAULT_MAX_DEPTH,
            keep_debug_info: true,
        }
    }
}

/// Configured chunk loader over an injected string table
pub struct Loader<'i, I: Intern + ?Sized> {
    interner: &'i I,
    config: LoaderConfig,
}

impl<'i, I: Intern + ?Sized> Loader<'i, I> {
    pub fn new(interner: &'i I) -> Self {
        Self::with_config(interner, LoaderConfig::default())
    }

    pub fn with_config(interner: &'i I, config: LoaderConfig) -> Self {
        Self { interner, config }
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.config.max_depth = max_depth;
        self
    }

    pub fn keep_debug_info(mut self, keep: bool) -> Self {
        self.config.keep_debug_info = keep;
        self
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    /// Load a chunk. `chunk_name` is only used to label errors.
    pub fn load(&self, bytes: &[u8], chunk_name: &str) -> Result<Closure> {
        debug!(chunk = chunk_name, len = bytes.len(), "loading precompiled chunk");

        match self.load_closure(bytes) {
            Ok(closure) => {
                let prototypes = closure.proto().count();
                metrics::counter!("lua_bytecode.chunks_loaded").increment(1);
                metrics::counter!("lua_bytecode.prototypes_loaded").increment(prototypes as u64);
                debug!(chunk = chunk_name, prototypes, "loaded precompiled chunk");
                Ok(closure)
            }
            Err(kind) => {
                let err = LoadError::new(chunk_name, kind);
                metrics::counter!("lua_bytecode.chunks_rejected").increment(1);
                warn!(error = %err, "rejected precompiled chunk");
                Err(err)
            }
        }
    }

    fn load_closure(&self, bytes: &[u8]) -> ReadResult<Closure> {
        let mut cursor = ByteCursor::new(bytes);
        Header::read(&mut cursor)?;

        let upvalue_count = cursor.read_byte()?;
        let mut proto =
            PrototypeBuilder::new(&mut cursor, self.interner, self.config.max_depth).read_root()?;

        check_upvalues(upvalue_count, &proto)?;
        if !self.config.keep_debug_info {
            proto.strip_debug();
        }
        if cursor.remaining() > 0 {
            debug!(trailing = cursor.remaining(), "ignoring bytes after root function");
        }

        Ok(Closure::new(proto, upvalue_count))
    }
}

fn check_upvalues(declared: u8, proto: &Prototype) -> ReadResult<()> {
    if declared as usize != proto.upvalues().len() {
        return Err(LoadErrorKind::UpvalueCountMismatch {
            expected: declared as usize,
            actual: proto.upvalues().len(),
        });
    }
    Ok(())
}

/// Load a chunk with the default configuration
pub fn load<I: Intern + ?Sized>(bytes: &[u8], chunk_name: &str, interner: &I) -> Result<Closure> {
    Loader::new(interner).load(bytes, chunk_name)
}
