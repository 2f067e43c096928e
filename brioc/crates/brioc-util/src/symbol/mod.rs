//! Symbol module - String interning.
//!
//! A [`Symbol`] is a compact 4-byte handle to a string stored in a global,
//! thread-safe string table. Identifiers appear thousands of times in a
//! compilation; interning them makes comparison an integer compare and
//! keeps every side table small.
//!
//! Names with special meaning to the analyzer (`this`, `constructor`, the
//! primitive type names, the `len` builtin, the `exception` marker) are
//! pre-interned at fixed indices and exposed as constants in [`kw`].
//!
//! # Example
//!
//! ```
//! use brioc_util::symbol::{kw, Symbol};
//!
//! let a = Symbol::intern("contador");
//! let b = Symbol::intern("contador");
//! assert_eq!(a, b);
//! assert_eq!(a.as_str(), "contador");
//!
//! assert_eq!(kw::THIS, Symbol::intern("this"));
//! ```

mod interner;

use crate::error::{SymbolError, SymbolResult};
use interner::STRING_TABLE;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// An interned string identifier
///
/// `Symbol` is exactly 4 bytes; equality and hashing operate on the index
/// alone. Two symbols are equal iff they intern the same string.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Symbol {
    /// Index into the global string table
    index: u32,
}

impl Symbol {
    /// Intern a string, returning its symbol
    ///
    /// Thread-safe; repeated calls with the same string return the same
    /// symbol.
    pub fn intern(string: &str) -> Self {
        STRING_TABLE.intern(string)
    }

    /// Get the string value associated with this symbol
    ///
    /// # Panics
    ///
    /// Panics if the symbol was not produced by [`Symbol::intern`] (e.g. a
    /// deserialized index from a foreign table).
    pub fn as_str(self) -> &'static str {
        STRING_TABLE
            .lookup(self.index)
            .expect("Symbol index not present in the string table")
    }

    /// Fallible variant of [`Symbol::as_str`]
    pub fn try_as_str(self) -> SymbolResult<&'static str> {
        STRING_TABLE
            .lookup(self.index)
            .ok_or(SymbolError::NotFound { index: self.index })
    }

    /// Get the raw index value
    pub fn as_u32(self) -> u32 {
        self.index
    }

    const fn from_index(index: u32) -> Self {
        Self { index }
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match STRING_TABLE.lookup(self.index) {
            Some(s) => write!(f, "Symbol({:?})", s),
            None => write!(f, "Symbol(#{})", self.index),
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// Symbols serialize as plain strings so the JSON AST and the symbol table
// dump are readable and independent of interner state.
impl Serialize for Symbol {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Symbol {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Symbol::intern(&s))
    }
}

/// Names known to the analyzer, pre-interned at fixed indices
///
/// The order here must match the `KNOWN_SYMBOLS` list in the interner.
pub mod kw {
    use super::Symbol;

    pub const THIS: Symbol = Symbol::from_index(0);
    pub const CONSTRUCTOR: Symbol = Symbol::from_index(1);
    pub const SUPER: Symbol = Symbol::from_index(2);
    pub const LEN: Symbol = Symbol::from_index(3);
    pub const EXCEPTION: Symbol = Symbol::from_index(4);
    pub const INT: Symbol = Symbol::from_index(5);
    pub const INTEGER: Symbol = Symbol::from_index(6);
    pub const FLOAT: Symbol = Symbol::from_index(7);
    pub const BOOL: Symbol = Symbol::from_index(8);
    pub const BOOLEAN: Symbol = Symbol::from_index(9);
    pub const STRING: Symbol = Symbol::from_index(10);
    pub const VOID: Symbol = Symbol::from_index(11);
    pub const NULL: Symbol = Symbol::from_index(12);
    pub const TRUE: Symbol = Symbol::from_index(13);
    pub const FALSE: Symbol = Symbol::from_index(14);
    pub const PRINT: Symbol = Symbol::from_index(15);
}
