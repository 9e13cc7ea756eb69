//! Error types for chunk loading

use std::fmt;
use thiserror::Error;

/// Literal header field compared byte-for-byte against the expected value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HeaderField {
    Signature,
    Version,
    Format,
    Tail,
}

impl HeaderField {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeaderField::Signature => "signature",
            HeaderField::Version => "version",
            HeaderField::Format => "format",
            HeaderField::Tail => "tail",
        }
    }
}

impl fmt::Display for HeaderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Primitive width declared in the chunk header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SizeField {
    Int,
    SizeT,
    Instruction,
    Integer,
    Float,
}

impl SizeField {
    pub fn as_str(&self) -> &'static str {
        match self {
            SizeField::Int => "int",
            SizeField::SizeT => "size_t",
            SizeField::Instruction => "instruction",
            SizeField::Integer => "integer",
            SizeField::Float => "float",
        }
    }
}

impl fmt::Display for SizeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a load failed
///
/// The `Display` text is the cause fragment of the final message; it reads
/// naturally when followed by "precompiled chunk".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LoadErrorKind {
    #[error("{field} mismatch (expected {expected:02x?}, found {actual:02x?}) in")]
    HeaderMismatch {
        field: HeaderField,
        expected: Vec<u8>,
        actual: Vec<u8>,
    },

    #[error("{field} size mismatch (expected {expected}, found {actual}) in")]
    SizeMismatch {
        field: SizeField,
        expected: u8,
        actual: u8,
    },

    #[error("endianness mismatch in")]
    EndiannessMismatch,

    #[error("float format mismatch in")]
    FloatFormatMismatch,

    #[error("unrecognized constant tag {tag:#04x} in")]
    UnrecognizedConstantTag { tag: u8 },

    #[error("upvalue count mismatch (closure declares {expected}, function has {actual}) in")]
    UpvalueCountMismatch { expected: usize, actual: usize },

    #[error("truncated (needed {requested} bytes, {remaining} left)")]
    BufferUnderrun { requested: usize, remaining: usize },

    #[error("{names} upvalue names for {upvalues} upvalues in")]
    UpvalueNameOverflow { upvalues: usize, names: usize },

    #[error("functions nested deeper than {limit} in")]
    NestingTooDeep { limit: usize },
}

/// A failed load, tagged with the name of the chunk being loaded
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{chunk}: {kind} precompiled chunk")]
pub struct LoadError {
    pub chunk: String,
    pub kind: LoadErrorKind,
}

impl LoadError {
    /// Attach a chunk name to a failure. `@file` and `=label` names are
    /// shown without their prefix; a name that is itself binary data is
    /// shown as "binary string".
    pub fn new(chunk_name: &str, kind: LoadErrorKind) -> Self {
        Self {
            chunk: display_name(chunk_name).to_string(),
            kind,
        }
    }

    pub fn kind(&self) -> &LoadErrorKind {
        &self.kind
    }
}

fn display_name(chunk_name: &str) -> &str {
    if let Some(rest) = chunk_name
        .strip_prefix('@')
        .or_else(|| chunk_name.strip_prefix('='))
    {
        rest
    } else if chunk_name.starts_with('\x1b') {
        "binary string"
    } else {
        chunk_name
    }
}

/// Convenient Result type
pub type Result<T> = std::result::Result<T, LoadError>;
