//! Scope/declaration pass.
//!
//! Walks the tree in source order keeping a `current` scope pointer.
//! `block`, `for`, `foreach`, function and class declarations each open a
//! fresh child scope and record themselves in the node-to-scope map;
//! `while`, `do-while` and `switch` only adjust the depth counters the
//! structural checks rely on.
//!
//! Type annotations are resolved here: a primitive name or a class visible
//! at the point of use. Unannotated declarations stay `Null` until the type
//! checker infers them.

use crate::table::{SymbolInfo, SymbolKind, SymbolTable};
use crate::types::Ty;
use brioc_ast::{
    Block, ClassDecl, ClassMember, FuncDecl, Program, Stmt, TypeRef, VarDecl,
};
use brioc_util::{kw, Handler, Span, Symbol};
use tracing::debug;

/// The scope builder pass
pub struct ScopeBuilder<'a> {
    table: SymbolTable,
    current: crate::table::ScopeId,
    handler: &'a Handler,
    loop_depth: u32,
    switch_depth: u32,
}

impl<'a> ScopeBuilder<'a> {
    /// Run the pass over a program, producing the populated symbol table
    pub fn build(program: &Program, handler: &'a Handler) -> SymbolTable {
        let table = SymbolTable::new();
        let global = table.global;
        let mut builder = ScopeBuilder {
            table,
            current: global,
            handler,
            loop_depth: 0,
            switch_depth: 0,
        };

        debug!("scope builder: start");
        builder.table.scope_map.insert(program.id, builder.current);
        for stmt in &program.body {
            builder.walk_stmt(stmt);
        }
        debug!(
            scopes = builder.table.scopes.len(),
            symbols = builder.table.symbols.len(),
            "scope builder: done"
        );
        debug_assert_eq!(builder.loop_depth, 0);
        debug_assert_eq!(builder.switch_depth, 0);
        builder.table
    }

    fn walk_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Var(decl) => self.declare_var(decl),
            Stmt::Func(func) => self.declare_func(func),
            Stmt::Class(class) => self.declare_class(class),
            Stmt::Block(block) => self.walk_block(block),
            Stmt::If(s) => {
                self.walk_block(&s.then_block);
                if let Some(els) = &s.else_block {
                    self.walk_block(els);
                }
            }
            Stmt::While(s) => {
                self.loop_depth += 1;
                self.walk_block(&s.body);
                self.loop_depth -= 1;
            }
            Stmt::DoWhile(s) => {
                self.loop_depth += 1;
                self.walk_block(&s.body);
                self.loop_depth -= 1;
            }
            Stmt::For(s) => {
                let prev = self.current;
                self.current = self.table.new_scope(prev, "for");
                self.table.scope_map.insert(s.id, self.current);
                self.loop_depth += 1;

                if let Some(init) = &s.init {
                    self.walk_stmt(init);
                }
                if let Some(step) = &s.step {
                    self.walk_stmt(step);
                }
                self.walk_block(&s.body);

                self.loop_depth -= 1;
                self.current = prev;
            }
            Stmt::Foreach(s) => {
                let prev = self.current;
                self.current = self.table.new_scope(prev, "foreach");
                self.table.scope_map.insert(s.id, self.current);
                self.loop_depth += 1;

                // binder type is refined by the type checker
                self.define_var(s.binder, Ty::Null, false, s.span);
                self.walk_block(&s.body);

                self.loop_depth -= 1;
                self.current = prev;
            }
            Stmt::Switch(s) => {
                self.switch_depth += 1;
                for case in &s.cases {
                    for stmt in &case.body {
                        self.walk_stmt(stmt);
                    }
                }
                if let Some(default) = &s.default {
                    for stmt in default {
                        self.walk_stmt(stmt);
                    }
                }
                self.switch_depth -= 1;
            }
            Stmt::Try(s) => {
                self.walk_block(&s.try_block);

                // the catch binder lives in the catch block's scope
                let prev = self.current;
                self.current = self.table.new_scope(prev, "block");
                self.table.scope_map.insert(s.catch_block.id, self.current);
                self.define_var(s.binder, Ty::Null, false, s.span);
                for stmt in &s.catch_block.stmts {
                    self.walk_stmt(stmt);
                }
                self.current = prev;
            }
            Stmt::Assign(_)
            | Stmt::Expr(_)
            | Stmt::Return(_)
            | Stmt::Break(_)
            | Stmt::Continue(_)
            | Stmt::Print(_) => {}
        }
    }

    fn walk_block(&mut self, block: &Block) {
        let prev = self.current;
        self.current = self.table.new_scope(prev, "block");
        self.table.scope_map.insert(block.id, self.current);
        for stmt in &block.stmts {
            self.walk_stmt(stmt);
        }
        self.current = prev;
    }

    fn declare_var(&mut self, decl: &VarDecl) {
        let ty = match &decl.annotation {
            Some(ann) => self.resolve_type_ref(ann),
            None => Ty::Null,
        };
        let defined = self.define_var(decl.name, ty, decl.is_const, decl.span);
        if !defined {
            let kind = if decl.is_const { "Constant" } else { "Variable" };
            self.handler.error(
                decl.span,
                format!("{} '{}' redeclared in this scope", kind, decl.name),
            );
        }
    }

    fn define_var(&mut self, name: Symbol, ty: Ty, is_const: bool, _span: Span) -> bool {
        self.table
            .define(
                self.current,
                SymbolInfo {
                    name,
                    kind: SymbolKind::Var { ty, is_const },
                },
            )
            .is_some()
    }

    fn declare_func(&mut self, func: &FuncDecl) {
        let ret = match &func.ret {
            Some(ann) => self.resolve_type_ref(ann),
            None => Ty::Void,
        };

        let func_id = self.table.define(
            self.current,
            SymbolInfo {
                name: func.name,
                kind: SymbolKind::Func {
                    ret,
                    params: Vec::new(),
                },
            },
        );
        if func_id.is_none() {
            self.handler
                .error(func.span, format!("Function '{}' redeclared", func.name));
        }

        let prev = self.current;
        self.current = self.table.new_scope(prev, format!("func {}", func.name));
        self.table.scope_map.insert(func.id, self.current);

        for param in &func.params {
            let ty = self.resolve_type_ref(&param.ty);
            let param_sym = self.table.define(
                self.current,
                SymbolInfo {
                    name: param.name,
                    kind: SymbolKind::Var {
                        ty,
                        is_const: false,
                    },
                },
            );
            match param_sym {
                Some(id) => {
                    if let Some(fid) = func_id {
                        if let SymbolKind::Func { params, .. } = &mut self.table.symbol_mut(fid).kind
                        {
                            params.push(id);
                        }
                    }
                }
                None => {
                    self.handler
                        .error(param.span, format!("Parameter '{}' duplicated", param.name));
                }
            }
        }

        self.walk_block(&func.body);
        self.current = prev;
    }

    fn declare_class(&mut self, class: &ClassDecl) {
        let superclass = class.superclass.and_then(|name| {
            let sym = self.table.resolve(self.current, name);
            match sym.map(|id| &self.table.symbol(id).kind) {
                Some(SymbolKind::Class(cid)) => Some(*cid),
                _ => {
                    self.handler
                        .error(class.span, format!("Superclase '{}' no encontrada", name));
                    None
                }
            }
        });

        let prev = self.current;
        let class_scope = self.table.scopes.next_index();
        let class_id = self.table.classes.push(crate::table::ClassInfo {
            name: class.name,
            superclass,
            scope: class_scope,
        });
        self.table
            .new_class_scope(prev, format!("class {}", class.name), class_id);

        let defined = self.table.define(
            prev,
            SymbolInfo {
                name: class.name,
                kind: SymbolKind::Class(class_id),
            },
        );
        if defined.is_none() {
            self.handler
                .error(class.span, format!("Class '{}' redeclared", class.name));
        }

        self.table.scope_map.insert(class.id, class_scope);
        self.current = class_scope;

        let this_ty = self.table.class_ty(class_id);
        self.define_var(kw::THIS, this_ty, true, class.span);

        for member in &class.members {
            match member {
                ClassMember::Field(field) => self.declare_var(field),
                ClassMember::Method(method) => self.declare_func(method),
            }
        }

        self.current = prev;
    }

    /// Resolve a syntactic annotation to a semantic type
    ///
    /// Primitive names first; otherwise a class visible from the current
    /// scope. Unknown names diagnose and recover with `Null`.
    fn resolve_type_ref(&mut self, ann: &TypeRef) -> Ty {
        let base = if ann.name == kw::INT || ann.name == kw::INTEGER {
            Ty::Int
        } else if ann.name == kw::FLOAT {
            Ty::Float
        } else if ann.name == kw::BOOL || ann.name == kw::BOOLEAN {
            Ty::Bool
        } else if ann.name == kw::STRING {
            Ty::String
        } else if ann.name == kw::VOID {
            Ty::Void
        } else if ann.name == kw::NULL {
            Ty::Null
        } else {
            let sym = self.table.resolve(self.current, ann.name);
            match sym.map(|id| &self.table.symbol(id).kind) {
                Some(SymbolKind::Class(cid)) => self.table.class_ty(*cid),
                _ => {
                    self.handler
                        .error(ann.span, format!("Tipo desconocido '{}'", ann.name));
                    Ty::Null
                }
            }
        };

        if ann.dims > 0 {
            Ty::array(base, ann.dims)
        } else {
            base
        }
    }
}
