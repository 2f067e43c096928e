//! String interner implementation backed by DashMap.
//!
//! The table is global and thread-safe: multiple independent pipelines may
//! run in parallel (spawned by a build server, say) and share the interner
//! without coordination. Strings are heap-allocated once and intentionally
//! leaked to obtain `'static` references; the set of distinct identifiers
//! in a compilation is bounded, so this never grows unexpectedly.

use ahash::RandomState;
use dashmap::DashMap;
use std::sync::{LazyLock, RwLock};

use super::Symbol;

/// Strings pre-interned at startup, in index order
///
/// The `kw` constants in the parent module name these indices; keep the two
/// lists in sync.
pub(super) const KNOWN_SYMBOLS: &[&str] = &[
    "this",
    "constructor",
    "super",
    "len",
    "exception",
    "int",
    "integer",
    "float",
    "bool",
    "boolean",
    "string",
    "void",
    "null",
    "true",
    "false",
    "print",
];

/// Global string table instance
pub(super) static STRING_TABLE: LazyLock<StringTable> = LazyLock::new(|| {
    let table = StringTable::new();
    for s in KNOWN_SYMBOLS {
        table.intern(s);
    }
    table
});

/// Thread-safe string table
pub(super) struct StringTable {
    /// Maps interned string to its symbol index
    map: DashMap<&'static str, u32, RandomState>,

    /// Storage for index-to-string lookup
    strings: RwLock<Vec<&'static str>>,
}

impl StringTable {
    fn new() -> Self {
        Self {
            map: DashMap::with_capacity_and_hasher(256, RandomState::new()),
            strings: RwLock::new(Vec::with_capacity(256)),
        }
    }

    /// Intern a string
    ///
    /// Fast path is a lock-free map hit. On a miss the write lock on the
    /// index vector serializes insertion; the map is re-checked under the
    /// lock so racing threads agree on one index per string.
    pub fn intern(&self, string: &str) -> Symbol {
        if let Some(entry) = self.map.get(string) {
            return Symbol::from_index(*entry.value());
        }

        let mut strings = self
            .strings
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        if let Some(entry) = self.map.get(string) {
            return Symbol::from_index(*entry.value());
        }

        let interned: &'static str = Box::leak(string.to_owned().into_boxed_str());
        let index = strings.len() as u32;
        strings.push(interned);
        self.map.insert(interned, index);

        Symbol::from_index(index)
    }

    /// Get the string for an index
    pub fn lookup(&self, index: u32) -> Option<&'static str> {
        self.strings
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get(index as usize)
            .copied()
    }
}
