//! brioc-util - Core Utilities and Foundation Types
//!
//! This crate provides the foundation every other brioc crate builds on:
//!
//! - [`Span`]: source locations with byte offsets and line/column info
//! - [`Diagnostic`] / [`Handler`]: position-tagged error collection
//! - [`Idx`] / [`IndexVec`] / [`define_idx!`]: typed indices into arenas
//! - [`Symbol`]: interned strings with O(1) comparison
//!
//! Entities that reference each other across the compiler (scopes, symbols,
//! classes, syntax nodes) are addressed by typed `u32` ids into `IndexVec`
//! arenas instead of pointers, so cyclic structures like "class owns member
//! scope, scope knows its owner class" need no ownership cycles.

pub mod diagnostic;
pub mod error;
pub mod index_vec;
pub mod span;
pub mod symbol;

pub use diagnostic::{Diagnostic, Handler, Level};
pub use error::{SymbolError, SymbolResult};
pub use index_vec::{Idx, IndexVec};
pub use span::Span;
pub use symbol::{kw, Symbol};

// Re-export commonly used hash collections
pub use rustc_hash::FxHashMap;
pub use rustc_hash::FxHashSet;
