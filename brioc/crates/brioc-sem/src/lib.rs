//! brioc-sem - Semantic Analysis
//!
//! Two of the three pipeline passes live here, sharing the symbol and type
//! model:
//!
//! 1. **Scope builder** ([`ScopeBuilder`]): walks the tree in source order,
//!    creates the lexical scope arena, declares every symbol (constants,
//!    variables, parameters, functions, classes, `this`, loop and catch
//!    binders) and records which scope is active at each scope-creating
//!    node.
//! 2. **Type checker** ([`TypeChecker`]): computes a type for every
//!    expression bottom-up, memoized per node, validates statements,
//!    assignments, calls and method overrides, and refines the types of
//!    unannotated declarations.
//!
//! Every semantic failure is recoverable: the pass records a positioned
//! diagnostic and continues with [`Ty::Null`] so dependent checks stay
//! quiet instead of cascading.

pub mod checker;
pub mod scope_builder;
pub mod table;
pub mod types;

pub use checker::{TypeChecker, TypeMap};
pub use scope_builder::ScopeBuilder;
pub use table::{ClassInfo, Scope, ScopeId, SymbolId, SymbolInfo, SymbolKind, SymbolTable};
pub use types::{unify_numeric, ClassId, Ty};
