//! brioc-tac - Three-Address-Code Generation
//!
//! Lowers the checked syntax tree into a flat, append-only stream of
//! quadruples with explicit labels and jumps. The emitter consults the
//! checker's type map (for array element tags) but never mutates it; it
//! tolerates `Null`-typed nodes so partial output is available even when
//! diagnostics exist.

pub mod emitter;
pub mod tac;
pub mod temp;

pub use emitter::Emitter;
pub use tac::{OpCode, Operand, Quad};
pub use temp::TempManager;
