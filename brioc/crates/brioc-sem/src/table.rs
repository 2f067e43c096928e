//! The arena symbol table.
//!
//! Scopes, symbols and classes live in three `IndexVec` arenas addressed by
//! typed ids, so the cyclic shape "class owns its member scope / the scope
//! knows its owner class" is just a pair of ids. Scopes are created by the
//! scope builder and never destroyed; the type checker only rewrites the
//! types of inferred declarations.
//!
//! Scope member maps are `IndexMap`s: insertion order is the declaration
//! order, which diagnostics and the symbol-table dump rely on.

use crate::types::{ClassId, Ty};
use brioc_ast::NodeId;
use brioc_util::{define_idx, FxHashMap, IndexVec, Symbol};
use indexmap::IndexMap;

define_idx!(ScopeId);
define_idx!(SymbolId);

/// A named region of lexical visibility
#[derive(Debug, Clone)]
pub struct Scope {
    /// Enclosing scope; `None` only for the global scope
    pub parent: Option<ScopeId>,
    /// Display name ("global", "block", "func add", "class Point", ...)
    pub name: String,
    /// Declared symbols in declaration order
    pub symbols: IndexMap<Symbol, SymbolId>,
    /// Set when this is a class member scope
    pub owner: Option<ClassId>,
}

/// An entry in a scope
#[derive(Debug, Clone)]
pub struct SymbolInfo {
    pub name: Symbol,
    pub kind: SymbolKind,
}

/// Symbol payload, tagged by kind
#[derive(Debug, Clone)]
pub enum SymbolKind {
    /// Variable, constant, parameter, loop or catch binder, `this`
    Var { ty: Ty, is_const: bool },
    /// Function or method; parameters are `Var` symbols in declaration order
    Func { ret: Ty, params: Vec<SymbolId> },
    /// Class; superclass and member scope live in the class arena
    Class(ClassId),
}

impl SymbolInfo {
    /// The value type of the symbol: a variable's type, a function's return
    /// type, the class type for a class.
    pub fn value_ty(&self, table: &SymbolTable) -> Ty {
        match &self.kind {
            SymbolKind::Var { ty, .. } => ty.clone(),
            SymbolKind::Func { ret, .. } => ret.clone(),
            SymbolKind::Class(id) => table.class_ty(*id),
        }
    }

    pub fn is_const(&self) -> bool {
        matches!(self.kind, SymbolKind::Var { is_const: true, .. })
    }
}

/// Class metadata
#[derive(Debug, Clone)]
pub struct ClassInfo {
    pub name: Symbol,
    pub superclass: Option<ClassId>,
    /// Member scope holding fields, methods and the implicit `this`
    pub scope: ScopeId,
}

/// The symbol table: scope tree, symbol arena, class arena and the
/// node-to-scope map produced by the scope builder.
#[derive(Debug)]
pub struct SymbolTable {
    pub scopes: IndexVec<ScopeId, Scope>,
    pub symbols: IndexVec<SymbolId, SymbolInfo>,
    pub classes: IndexVec<ClassId, ClassInfo>,
    /// Scope active at each scope-creating syntax node
    pub scope_map: FxHashMap<NodeId, ScopeId>,
    /// The pre-created global scope
    pub global: ScopeId,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut scopes = IndexVec::new();
        let global = scopes.push(Scope {
            parent: None,
            name: "global".to_owned(),
            symbols: IndexMap::new(),
            owner: None,
        });

        Self {
            scopes,
            symbols: IndexVec::new(),
            classes: IndexVec::new(),
            scope_map: FxHashMap::default(),
            global,
        }
    }

    /// Create a child scope
    pub fn new_scope(&mut self, parent: ScopeId, name: impl Into<String>) -> ScopeId {
        self.scopes.push(Scope {
            parent: Some(parent),
            name: name.into(),
            symbols: IndexMap::new(),
            owner: None,
        })
    }

    /// Create a class member scope
    pub fn new_class_scope(
        &mut self,
        parent: ScopeId,
        name: impl Into<String>,
        owner: ClassId,
    ) -> ScopeId {
        self.scopes.push(Scope {
            parent: Some(parent),
            name: name.into(),
            symbols: IndexMap::new(),
            owner: Some(owner),
        })
    }

    /// Declare a symbol in a scope
    ///
    /// Returns `None` without inserting when the name is already taken in
    /// that scope; the first declaration wins.
    pub fn define(&mut self, scope: ScopeId, info: SymbolInfo) -> Option<SymbolId> {
        if self.scopes[scope].symbols.contains_key(&info.name) {
            return None;
        }
        let name = info.name;
        let id = self.symbols.push(info);
        self.scopes[scope].symbols.insert(name, id);
        Some(id)
    }

    /// Look a name up in a single scope, without walking parents
    pub fn lookup_local(&self, scope: ScopeId, name: Symbol) -> Option<SymbolId> {
        self.scopes[scope].symbols.get(&name).copied()
    }

    /// Resolve a name by walking the parent chain
    pub fn resolve(&self, scope: ScopeId, name: Symbol) -> Option<SymbolId> {
        let mut current = Some(scope);
        while let Some(id) = current {
            if let Some(sym) = self.lookup_local(id, name) {
                return Some(sym);
            }
            current = self.scopes[id].parent;
        }
        None
    }

    /// Member walk: look a name up in a class and then its superclasses,
    /// returning the first hit.
    pub fn resolve_member(&self, class: ClassId, name: Symbol) -> Option<SymbolId> {
        let mut current = Some(class);
        while let Some(id) = current {
            let info = &self.classes[id];
            if let Some(sym) = self.lookup_local(info.scope, name) {
                return Some(sym);
            }
            current = info.superclass;
        }
        None
    }

    pub fn symbol(&self, id: SymbolId) -> &SymbolInfo {
        &self.symbols[id]
    }

    pub fn symbol_mut(&mut self, id: SymbolId) -> &mut SymbolInfo {
        &mut self.symbols[id]
    }

    /// The nominal type of a class
    pub fn class_ty(&self, id: ClassId) -> Ty {
        Ty::class(id, self.classes[id].name)
    }

    /// True when `sub` transitively inherits from `sup`
    pub fn is_subclass(&self, sub: ClassId, sup: ClassId) -> bool {
        let mut current = self.classes[sub].superclass;
        while let Some(id) = current {
            if id == sup {
                return true;
            }
            current = self.classes[id].superclass;
        }
        false
    }

    /// The assignability predicate
    ///
    /// Holds for structural equality, `Float ← Int` widening, a `Null`
    /// destination (the inference placeholder), arrays of equal dimensions
    /// with at most base-level widening, and class upcasts along the
    /// inheritance chain.
    pub fn can_assign(&self, dst: &Ty, src: &Ty) -> bool {
        if dst == src {
            return true;
        }
        if *dst == Ty::Float && *src == Ty::Int {
            return true;
        }
        if *dst == Ty::Null {
            return true;
        }
        if let (
            Ty::Array {
                base: dst_base,
                dims: dst_dims,
            },
            Ty::Array {
                base: src_base,
                dims: src_dims,
            },
        ) = (dst, src)
        {
            if dst_dims != src_dims {
                return false;
            }
            if dst_base == src_base {
                return true;
            }
            return **dst_base == Ty::Float && **src_base == Ty::Int;
        }
        if let (Some(dst_id), Some(src_id)) = (dst.class_id(), src.class_id()) {
            return dst_id == src_id || self.is_subclass(src_id, dst_id);
        }
        false
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
