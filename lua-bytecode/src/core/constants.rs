//! Constant values and string interning

use ahash::AHashMap;
use parking_lot::RwLock;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Constant type tags as they appear in a chunk
pub mod tag {
    pub const NIL: u8 = 0x00;
    pub const BOOLEAN: u8 = 0x01;
    pub const NUMFLT: u8 = 0x03;
    pub const NUMINT: u8 = 0x03 | (1 << 4);
    pub const SHRSTR: u8 = 0x04;
    pub const LNGSTR: u8 = 0x04 | (1 << 4);
}

/// Longest string written with the short-string tag
pub const MAX_SHORT_LEN: usize = 40;

/// Handle to an interned byte string
///
/// Cloning shares the underlying bytes. Two handles are equal when their
/// contents are equal, whichever table produced them.
#[derive(Clone)]
pub struct LuaStr {
    pub id: u32,
    pub data: Arc<[u8]>,
}

impl LuaStr {
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether both handles point at the same allocation
    pub fn ptr_eq(&self, other: &LuaStr) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

impl PartialEq for LuaStr {
    fn eq(&self, other: &Self) -> bool {
        self.data == other.data
    }
}

impl Eq for LuaStr {}

impl Hash for LuaStr {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.data.hash(state);
    }
}

impl fmt::Debug for LuaStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.data))
    }
}

/// String interning capability handed to the loader
///
/// Implementations must return equal handles for equal bytes, and must be
/// safe to call from several loads at once if the host runs loads in
/// parallel.
pub trait Intern {
    fn intern(&self, bytes: &[u8]) -> LuaStr;
}

impl<T: Intern + ?Sized> Intern for &T {
    fn intern(&self, bytes: &[u8]) -> LuaStr {
        (**self).intern(bytes)
    }
}

impl<T: Intern + ?Sized> Intern for Arc<T> {
    fn intern(&self, bytes: &[u8]) -> LuaStr {
        (**self).intern(bytes)
    }
}

/// Thread-safe string table for deduplicating constant strings
#[derive(Debug, Default)]
pub struct StringInterner {
    /// Map from string content to interned ID
    string_to_id: RwLock<AHashMap<Arc<[u8]>, u32>>,

    /// Map from ID to string content (for resolution)
    id_to_string: RwLock<Vec<Arc<[u8]>>>,
}

impl StringInterner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve an ID back to string content
    pub fn resolve(&self, id: u32) -> Option<LuaStr> {
        let id_map = self.id_to_string.read();
        id_map.get(id as usize).map(|data| LuaStr {
            id,
            data: data.clone(),
        })
    }

    /// Get current count of interned strings
    pub fn count(&self) -> usize {
        self.id_to_string.read().len()
    }
}

impl Intern for StringInterner {
    fn intern(&self, bytes: &[u8]) -> LuaStr {
        // Try to find existing string first (read lock only)
        {
            let string_map = self.string_to_id.read();
            if let Some(&id) = string_map.get(bytes) {
                let data = self.id_to_string.read()[id as usize].clone();
                return LuaStr { id, data };
            }
        }

        let mut string_map = self.string_to_id.write();

        // Double-check in case another thread added it
        if let Some(&id) = string_map.get(bytes) {
            let data = self.id_to_string.read()[id as usize].clone();
            return LuaStr { id, data };
        }

        let data: Arc<[u8]> = Arc::from(bytes);
        let mut id_map = self.id_to_string.write();
        let id = id_map.len() as u32;
        id_map.push(data.clone());
        string_map.insert(data.clone(), id);

        LuaStr { id, data }
    }
}

/// A constant pool entry
#[derive(Debug, Clone, PartialEq)]
pub enum Constant {
    Nil,
    Boolean(bool),
    Float(f64),
    Integer(i64),
    String(LuaStr),
}

impl Constant {
    pub fn type_name(&self) -> &'static str {
        match self {
            Constant::Nil => "nil",
            Constant::Boolean(_) => "boolean",
            Constant::Float(_) => "float",
            Constant::Integer(_) => "integer",
            Constant::String(_) => "string",
        }
    }

    /// Tag byte this constant is written with
    pub fn tag(&self) -> u8 {
        match self {
            Constant::Nil => tag::NIL,
            Constant::Boolean(_) => tag::BOOLEAN,
            Constant::Float(_) => tag::NUMFLT,
            Constant::Integer(_) => tag::NUMINT,
            Constant::String(s) if s.len() <= MAX_SHORT_LEN => tag::SHRSTR,
            Constant::String(_) => tag::LNGSTR,
        }
    }

    pub fn as_str(&self) -> Option<&LuaStr> {
        match self {
            Constant::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Constant::Nil => f.write_str("nil"),
            Constant::Boolean(b) => write!(f, "{b}"),
            Constant::Float(n) if n.fract() == 0.0 && n.is_finite() => write!(f, "{n:.1}"),
            Constant::Float(n) => write!(f, "{n}"),
            Constant::Integer(i) => write!(f, "{i}"),
            Constant::String(s) => write!(f, "{:?}", String::from_utf8_lossy(s.as_bytes())),
        }
    }
}
