//! Lua 5.3 precompiled chunk loading
//!
//! Reads the binary chunks `luac` writes, validates their header against the
//! layout this build expects, and rebuilds the function prototype tree they
//! describe. Strings found in a chunk are interned through a caller-supplied
//! [`Intern`] implementation so loaded constants share storage with the
//! rest of the host.
//!
//! Also provided: a writer for the same format ([`dump`]) and a `luac -l`
//! style listing ([`Listing`]).

#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod core;
pub mod dump;
pub mod error;
pub mod listing;
pub mod loader;

pub use crate::core::{
    Closure, Constant, Instruction, Intern, LocalVar, LuaStr, OpCode, OpMode, Operands,
    Prototype, StringInterner, UpvalueDesc,
};
pub use crate::dump::{ChunkWriter, dump};
pub use crate::error::{LoadError, LoadErrorKind, Result};
pub use crate::listing::{Listing, ListingConfig};
pub use crate::loader::{Loader, LoaderConfig, load};

/// First bytes of every chunk
pub const LUA_SIGNATURE: &[u8; 4] = b"\x1bLua";

/// Major and minor version, one nibble each
pub const LUAC_VERSION: u8 = 0x53;

/// 0 is the official format
pub const LUAC_FORMAT: u8 = 0;

/// Catches text-mode conversions of the chunk
pub const LUAC_DATA: &[u8; 6] = b"\x19\x93\r\n\x1a\n";

/// Integer sample used to detect byte order
pub const LUAC_INT: i64 = 0x5678;

/// Float sample used to detect the float format
pub const LUAC_NUM: f64 = 370.5;
