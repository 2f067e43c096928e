//! Type-checking pass.
//!
//! Expressions are typed bottom-up and memoized per node; statements are
//! visited for their validation side effects. The pass consumes the scope
//! builder's output, re-entering recorded scopes as it walks, and mutates
//! only one thing in the table: the type of unannotated declarations once
//! their initializer (or the foreach collection) is known.
//!
//! An expression that fails to check gets [`Ty::Null`], which assigns to
//! and from everything relevant, so one error does not fan out into a
//! cascade of follow-ups.

use crate::table::{ScopeId, SymbolId, SymbolKind, SymbolTable};
use crate::types::{unify_numeric, ClassId, Ty};
use brioc_ast::{
    AssignStmt, Block, CallExpr, ClassDecl, ClassMember, Expr, FuncDecl, NewExpr, NodeId, Place,
    Program, Stmt, UnOp, VarDecl,
};
use brioc_ast::BinOp;
use brioc_util::{kw, FxHashMap, Handler, Span, Symbol};
use tracing::debug;

/// Expression types memoized by node id
pub type TypeMap = FxHashMap<NodeId, Ty>;

/// What a call target resolved to
enum Callee {
    Func(SymbolId),
    Class(ClassId),
    Value(Ty),
}

/// The type-checking pass
pub struct TypeChecker<'a> {
    table: &'a mut SymbolTable,
    handler: &'a Handler,
    current: ScopeId,
    types: TypeMap,
    fn_ret_stack: Vec<Ty>,
    loop_depth: u32,
    switch_depth: u32,
}

impl<'a> TypeChecker<'a> {
    /// Run the pass over a program, producing the expression type map
    pub fn check(program: &Program, table: &'a mut SymbolTable, handler: &'a Handler) -> TypeMap {
        let global = table.global;
        let mut checker = TypeChecker {
            table,
            handler,
            current: global,
            types: TypeMap::default(),
            fn_ret_stack: Vec::new(),
            loop_depth: 0,
            switch_depth: 0,
        };

        debug!("type checker: start");
        for stmt in &program.body {
            checker.check_stmt(stmt);
        }
        debug!(typed_nodes = checker.types.len(), "type checker: done");
        debug_assert!(checker.fn_ret_stack.is_empty());
        checker.types
    }

    fn set(&mut self, id: NodeId, ty: Ty) -> Ty {
        self.types.insert(id, ty.clone());
        ty
    }

    fn sym_ty(&self, id: SymbolId) -> Ty {
        let table: &SymbolTable = self.table;
        table.symbol(id).value_ty(table)
    }

    fn expect_bool(&mut self, span: Span, ty: &Ty) {
        if *ty != Ty::Bool {
            self.handler
                .error(span, format!("Se esperaba bool, se obtuvo {}", ty));
        }
    }

    /// Switch to the scope recorded for a node, returning the previous one
    fn enter(&mut self, node: NodeId) -> ScopeId {
        let prev = self.current;
        if let Some(scope) = self.table.scope_map.get(&node) {
            self.current = *scope;
        }
        prev
    }

    // ------------------------------------------------------------------
    // statements
    // ------------------------------------------------------------------

    fn check_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Var(decl) => self.check_var_decl(decl),
            Stmt::Assign(assign) => self.check_assign(assign),
            Stmt::Expr(s) => {
                self.check_expr(&s.expr);
            }
            Stmt::Func(func) => self.check_func(func),
            Stmt::Class(class) => self.check_class(class),
            Stmt::Block(block) => self.check_block(block),
            Stmt::If(s) => {
                let cond_ty = self.check_expr(&s.cond);
                self.expect_bool(s.cond.span(), &cond_ty);
                self.check_block(&s.then_block);
                if let Some(els) = &s.else_block {
                    self.check_block(els);
                }
            }
            Stmt::While(s) => {
                let cond_ty = self.check_expr(&s.cond);
                self.expect_bool(s.cond.span(), &cond_ty);
                self.loop_depth += 1;
                self.check_block(&s.body);
                self.loop_depth -= 1;
            }
            Stmt::DoWhile(s) => {
                self.loop_depth += 1;
                self.check_block(&s.body);
                self.loop_depth -= 1;
                let cond_ty = self.check_expr(&s.cond);
                self.expect_bool(s.cond.span(), &cond_ty);
            }
            Stmt::For(s) => {
                let prev = self.enter(s.id);
                self.loop_depth += 1;

                if let Some(init) = &s.init {
                    self.check_stmt(init);
                }
                if let Some(cond) = &s.cond {
                    let cond_ty = self.check_expr(cond);
                    self.expect_bool(cond.span(), &cond_ty);
                }
                if let Some(step) = &s.step {
                    self.check_stmt(step);
                }
                self.check_block(&s.body);

                self.loop_depth -= 1;
                self.current = prev;
            }
            Stmt::Foreach(s) => {
                let prev = self.enter(s.id);
                self.loop_depth += 1;

                let coll_ty = self.check_expr(&s.iterable);
                let elem_ty = match coll_ty.element_type() {
                    Some(elem) => elem,
                    None => {
                        self.handler.error(
                            s.span,
                            format!("foreach espera un arreglo; recibió {}", coll_ty),
                        );
                        Ty::Null
                    }
                };

                match self.table.resolve(self.current, s.binder) {
                    Some(binder) => {
                        if let SymbolKind::Var { ty, .. } = &mut self.table.symbol_mut(binder).kind
                        {
                            *ty = elem_ty;
                        }
                    }
                    None => {
                        self.handler.error(
                            s.span,
                            format!("Interno: variable '{}' no encontrada en foreach", s.binder),
                        );
                    }
                }

                self.check_block(&s.body);

                self.loop_depth -= 1;
                self.current = prev;
            }
            Stmt::Switch(s) => {
                let scrut_ty = self.check_expr(&s.scrutinee);
                self.switch_depth += 1;

                for case in &s.cases {
                    let case_ty = self.check_expr(&case.value);
                    if !self.table.can_assign(&scrut_ty, &case_ty)
                        && !self.table.can_assign(&case_ty, &scrut_ty)
                    {
                        self.handler.error(
                            case.value.span(),
                            format!(
                                "case incompatible con el valor del switch: {} y {}",
                                scrut_ty, case_ty
                            ),
                        );
                    }
                    for stmt in &case.body {
                        self.check_stmt(stmt);
                    }
                }
                if let Some(default) = &s.default {
                    for stmt in default {
                        self.check_stmt(stmt);
                    }
                }

                self.switch_depth -= 1;
            }
            Stmt::Try(s) => {
                self.check_block(&s.try_block);
                self.check_block(&s.catch_block);
            }
            Stmt::Return(s) => {
                let expected = self.fn_ret_stack.last().cloned().unwrap_or(Ty::Void);
                if expected == Ty::Void {
                    if s.value.is_some() {
                        self.handler
                            .error(s.span, "return no debe llevar expresión en función void");
                    }
                    return;
                }
                match &s.value {
                    None => {
                        self.handler
                            .error(s.span, format!("se esperaba return de tipo {}", expected));
                    }
                    Some(value) => {
                        let ty = self.check_expr(value);
                        if !self.table.can_assign(&expected, &ty) {
                            self.handler.error(
                                s.span,
                                format!("return: esperado {}, recibido {}", expected, ty),
                            );
                        }
                    }
                }
            }
            Stmt::Break(s) => {
                if self.loop_depth == 0 && self.switch_depth == 0 {
                    self.handler
                        .error(s.span, "break fuera de un ciclo o switch");
                }
            }
            Stmt::Continue(s) => {
                if self.loop_depth == 0 {
                    self.handler.error(s.span, "'continue' fuera de un bucle");
                }
            }
            Stmt::Print(s) => {
                self.check_expr(&s.value);
            }
        }
    }

    fn check_block(&mut self, block: &Block) {
        let prev = self.enter(block.id);
        for stmt in &block.stmts {
            self.check_stmt(stmt);
        }
        self.current = prev;
    }

    fn check_var_decl(&mut self, decl: &VarDecl) {
        let sym_id = match self.table.resolve(self.current, decl.name) {
            Some(id) => id,
            None => {
                let kind = if decl.is_const { "const" } else { "variable" };
                self.handler.error(
                    decl.span,
                    format!("Interno: {} '{}' no encontrada", kind, decl.name),
                );
                if let Some(init) = &decl.init {
                    self.check_expr(init);
                }
                return;
            }
        };

        if decl.is_const && decl.init.is_none() {
            self.handler
                .error(decl.span, format!("Const '{}' requiere inicializador", decl.name));
            return;
        }

        let init_ty = decl.init.as_ref().map(|init| self.check_expr(init));

        match (decl.annotation.is_none(), init_ty) {
            (true, Some(init_ty)) => {
                // inference: the declaration adopts the initializer's type
                if let SymbolKind::Var { ty, .. } = &mut self.table.symbol_mut(sym_id).kind {
                    *ty = init_ty;
                }
            }
            (false, Some(init_ty)) => {
                let declared = self.sym_ty(sym_id);
                if !self.table.can_assign(&declared, &init_ty) {
                    let message = if decl.is_const {
                        format!(
                            "Const '{}': esperado {}, recibido {}",
                            decl.name, declared, init_ty
                        )
                    } else {
                        format!(
                            "No se puede asignar {} a {} en '{}'",
                            init_ty, declared, decl.name
                        )
                    };
                    self.handler.error(decl.span, message);
                }
            }
            _ => {}
        }
    }

    fn check_assign(&mut self, assign: &AssignStmt) {
        match &assign.target {
            Place::Name { name, span, .. } => {
                let rhs_ty = self.check_expr(&assign.value);
                self.apply_name_assignment(assign.id, *name, rhs_ty, *span);
            }
            Place::Property {
                recv, name, span, ..
            } => {
                let recv_ty = self.check_expr(recv);
                let rhs_ty = self.check_expr(&assign.value);
                self.apply_property_assignment(assign.id, &recv_ty, *name, &rhs_ty, *span);
            }
            Place::Index {
                recv, index, span, ..
            } => {
                let recv_ty = self.check_expr(recv);
                let idx_ty = self.check_expr(index);
                let rhs_ty = self.check_expr(&assign.value);
                self.apply_index_assignment(assign.id, &recv_ty, &idx_ty, &rhs_ty, *span);
            }
        }
    }

    fn apply_name_assignment(&mut self, node: NodeId, name: Symbol, rhs_ty: Ty, span: Span) {
        let sym_id = match self.table.resolve(self.current, name) {
            Some(id) => id,
            None => {
                self.handler.error(span, format!("'{}' no declarado", name));
                self.set(node, rhs_ty);
                return;
            }
        };

        let (ty, is_const) = match &self.table.symbol(sym_id).kind {
            SymbolKind::Var { ty, is_const } => (ty.clone(), *is_const),
            _ => {
                self.handler.error(span, "El lado izquierdo no es asignable");
                self.set(node, Ty::Null);
                return;
            }
        };

        if is_const {
            self.handler
                .error(span, format!("No se puede asignar a const '{}'", name));
            self.set(node, ty);
            return;
        }
        if !self.table.can_assign(&ty, &rhs_ty) {
            self.handler
                .error(span, format!("Asignación incompatible: {} y {}", ty, rhs_ty));
        }
        self.set(node, ty);
    }

    fn apply_property_assignment(
        &mut self,
        node: NodeId,
        recv_ty: &Ty,
        prop: Symbol,
        rhs_ty: &Ty,
        span: Span,
    ) {
        let class_id = match recv_ty.class_id() {
            Some(id) => id,
            None => {
                self.handler.error(
                    span,
                    format!("No se puede asignar propiedad '{}' sobre tipo {}", prop, recv_ty),
                );
                self.set(node, rhs_ty.clone());
                return;
            }
        };

        let psym = match self.table.resolve_member(class_id, prop) {
            Some(id) => id,
            None => {
                self.handler
                    .error(span, format!("Propiedad '{}' no existe", prop));
                self.set(node, rhs_ty.clone());
                return;
            }
        };

        if self.table.symbol(psym).is_const() {
            let ty = self.sym_ty(psym);
            self.handler
                .error(span, format!("La propiedad '{}' es const", prop));
            self.set(node, ty);
            return;
        }

        let prop_ty = self.sym_ty(psym);
        if !self.table.can_assign(&prop_ty, rhs_ty) {
            self.handler.error(
                span,
                format!("Asignación incompatible a '{}': {} = {}", prop, prop_ty, rhs_ty),
            );
        }
        self.set(node, prop_ty);
    }

    fn apply_index_assignment(
        &mut self,
        node: NodeId,
        recv_ty: &Ty,
        idx_ty: &Ty,
        rhs_ty: &Ty,
        span: Span,
    ) {
        let elem_ty = match recv_ty.element_type() {
            Some(elem) => elem,
            None => {
                self.handler.error(span, "Indexación sobre no-arreglo");
                self.set(node, rhs_ty.clone());
                return;
            }
        };
        if *idx_ty != Ty::Int {
            self.handler.error(span, "Índice de arreglo debe ser integer");
        }
        if !self.table.can_assign(&elem_ty, rhs_ty) {
            self.handler.error(
                span,
                format!("Asignación incompatible en arreglo: {} = {}", elem_ty, rhs_ty),
            );
        }
        self.set(node, elem_ty);
    }

    fn check_func(&mut self, func: &FuncDecl) {
        let ret = match self.table.resolve(self.current, func.name) {
            Some(id) => match &self.table.symbol(id).kind {
                SymbolKind::Func { ret, .. } => ret.clone(),
                _ => Ty::Void,
            },
            None => {
                self.handler.error(
                    func.span,
                    format!("Interno: función '{}' no encontrada", func.name),
                );
                Ty::Void
            }
        };

        let prev = self.enter(func.id);
        self.fn_ret_stack.push(ret);

        for param in &func.params {
            if let Some(id) = self.table.resolve(self.current, param.name) {
                if self.sym_ty(id) == Ty::Void {
                    self.handler
                        .error(param.span, "Un parámetro no puede ser de tipo void");
                }
            }
        }

        self.check_block(&func.body);

        self.fn_ret_stack.pop();
        self.current = prev;
    }

    fn check_class(&mut self, class: &ClassDecl) {
        let prev = self.enter(class.id);
        let class_id = self.table.scopes[self.current].owner;

        for member in &class.members {
            match member {
                ClassMember::Field(field) => self.check_var_decl(field),
                ClassMember::Method(method) => self.check_func(method),
            }
        }

        if let Some(class_id) = class_id {
            if self.table.classes[class_id].superclass.is_some() {
                for member in &class.members {
                    if let ClassMember::Method(method) = member {
                        self.check_override(class_id, method);
                    }
                }
            }
        }

        self.current = prev;
    }

    /// Overriding methods must match the inherited signature exactly:
    /// same parameter count, equal parameter types, equal return type.
    fn check_override(&mut self, class_id: ClassId, method: &FuncDecl) {
        let superclass = match self.table.classes[class_id].superclass {
            Some(id) => id,
            None => return,
        };
        let super_sym = match self.table.resolve_member(superclass, method.name) {
            Some(id) => id,
            None => return,
        };
        let own_scope = self.table.classes[class_id].scope;
        let own_sym = match self.table.lookup_local(own_scope, method.name) {
            Some(id) => id,
            None => return,
        };

        let (own_ret, own_params) = match &self.table.symbol(own_sym).kind {
            SymbolKind::Func { ret, params } => (ret.clone(), params.clone()),
            _ => return,
        };
        let (super_ret, super_params) = match &self.table.symbol(super_sym).kind {
            SymbolKind::Func { ret, params } => (ret.clone(), params.clone()),
            _ => return,
        };

        if own_params.len() != super_params.len() {
            self.handler.error(
                method.span,
                format!(
                    "Override inválido de '{}': espera {} parámetros, la superclase define {}",
                    method.name,
                    own_params.len(),
                    super_params.len()
                ),
            );
            return;
        }

        for (own, sup) in own_params.iter().zip(super_params.iter()) {
            let own_ty = self.sym_ty(*own);
            let super_ty = self.sym_ty(*sup);
            if own_ty != super_ty {
                self.handler.error(
                    method.span,
                    format!(
                        "Override inválido de '{}': tipo de parámetro {} no coincide con {}",
                        method.name, own_ty, super_ty
                    ),
                );
                return;
            }
        }

        if own_ret != super_ret {
            self.handler.error(
                method.span,
                format!(
                    "Override inválido de '{}': tipo de retorno {} no coincide con {}",
                    method.name, own_ret, super_ret
                ),
            );
        }
    }

    // ------------------------------------------------------------------
    // expressions
    // ------------------------------------------------------------------

    fn check_expr(&mut self, expr: &Expr) -> Ty {
        match expr {
            Expr::Literal(e) => {
                let ty = match e.value {
                    brioc_ast::LiteralValue::Int(_) => Ty::Int,
                    brioc_ast::LiteralValue::Float(_) => Ty::Float,
                    brioc_ast::LiteralValue::Str(_) => Ty::String,
                    brioc_ast::LiteralValue::Bool(_) => Ty::Bool,
                    brioc_ast::LiteralValue::Null => Ty::Null,
                };
                self.set(e.id, ty)
            }
            Expr::Ident(e) => {
                match self.table.resolve(self.current, e.name) {
                    Some(id) => match &self.table.symbol(id).kind {
                        SymbolKind::Var { ty, .. } => {
                            let ty = ty.clone();
                            self.set(e.id, ty)
                        }
                        // function and class names denote the symbol itself;
                        // as a value they carry no data type
                        SymbolKind::Func { .. } | SymbolKind::Class(_) => self.set(e.id, Ty::Null),
                    },
                    None => {
                        self.handler
                            .error(e.span, format!("'{}' no declarado", e.name));
                        self.set(e.id, Ty::Null)
                    }
                }
            }
            Expr::ArrayLit(e) => {
                let elem_types: Vec<Ty> =
                    e.elements.iter().map(|el| self.check_expr(el)).collect();
                let ty = self.array_literal_type(&elem_types, e.span);
                self.set(e.id, ty)
            }
            Expr::Index(e) => {
                let recv_ty = self.check_expr(&e.recv);
                let idx_ty = self.check_expr(&e.index);

                let elem_ty = match recv_ty.element_type() {
                    Some(elem) => elem,
                    None => {
                        self.handler.error(e.span, "Indexación sobre no-arreglo");
                        return self.set(e.id, Ty::Null);
                    }
                };
                if idx_ty != Ty::Int {
                    self.handler.error(e.span, "Índice de arreglo debe ser integer");
                }
                self.set(e.id, elem_ty)
            }
            Expr::Property(e) => {
                let recv_ty = self.check_expr(&e.recv);
                let class_id = match recv_ty.class_id() {
                    Some(id) => id,
                    None => {
                        self.handler.error(
                            e.span,
                            format!(
                                "No se puede acceder propiedad '{}' sobre tipo {}",
                                e.name, recv_ty
                            ),
                        );
                        return self.set(e.id, Ty::Null);
                    }
                };
                match self.table.resolve_member(class_id, e.name) {
                    Some(psym) => match &self.table.symbol(psym).kind {
                        SymbolKind::Var { ty, .. } => {
                            let ty = ty.clone();
                            self.set(e.id, ty)
                        }
                        SymbolKind::Func { .. } | SymbolKind::Class(_) => self.set(e.id, Ty::Null),
                    },
                    None => {
                        self.handler
                            .error(e.span, format!("Propiedad '{}' no existe", e.name));
                        self.set(e.id, Ty::Null)
                    }
                }
            }
            Expr::Call(e) => self.check_call(e),
            Expr::New(e) => self.check_new(e),
            Expr::This(e) => match self.table.resolve(self.current, kw::THIS) {
                Some(id) => {
                    let ty = self.sym_ty(id);
                    self.set(e.id, ty)
                }
                None => {
                    self.handler.error(e.span, "Uso de 'this' fuera de una clase");
                    self.set(e.id, Ty::Null)
                }
            },
            Expr::Unary(e) => {
                let operand_ty = self.check_expr(&e.expr);
                match e.op {
                    UnOp::Neg => {
                        if operand_ty.is_numeric() {
                            self.set(e.id, operand_ty)
                        } else {
                            self.handler.error(
                                e.span,
                                format!("Operación - requiere un número, recibió {}", operand_ty),
                            );
                            self.set(e.id, Ty::Null)
                        }
                    }
                    UnOp::Not => {
                        self.expect_bool(e.span, &operand_ty);
                        self.set(e.id, Ty::Bool)
                    }
                }
            }
            Expr::Binary(e) => {
                let left = self.check_expr(&e.left);
                let right = self.check_expr(&e.right);
                let ty = self.binary_type(e.op, &left, &right, e.span);
                self.set(e.id, ty)
            }
            Expr::Ternary(e) => {
                let cond_ty = self.check_expr(&e.cond);
                self.expect_bool(e.cond.span(), &cond_ty);

                let then_ty = self.check_expr(&e.then_expr);
                let else_ty = self.check_expr(&e.else_expr);
                let ty = self.ternary_type(&then_ty, &else_ty, e.span);
                self.set(e.id, ty)
            }
        }
    }

    fn array_literal_type(&mut self, elem_types: &[Ty], span: Span) -> Ty {
        if elem_types.is_empty() {
            self.handler.error(
                span,
                "No se puede inferir el tipo de un arreglo vacío; anota el tipo (p. ej. int[])",
            );
            return Ty::array(Ty::Null, 1);
        }

        let any_array = elem_types.iter().any(Ty::is_array);
        if any_array {
            if !elem_types.iter().all(Ty::is_array) {
                self.handler.error(
                    span,
                    "Arreglo irregular: mezcla de elemento escalar y subarreglo.",
                );
                return Ty::array(Ty::Null, 1);
            }

            let (first_base, inner_dims) = match &elem_types[0] {
                Ty::Array { base, dims } => ((**base).clone(), *dims),
                _ => unreachable!("all elements checked to be arrays"),
            };
            for elem in &elem_types[1..] {
                let dims = match elem {
                    Ty::Array { dims, .. } => *dims,
                    _ => unreachable!("all elements checked to be arrays"),
                };
                if dims != inner_dims {
                    self.handler.error(
                        span,
                        "Arreglo irregular: dimensiones distintas entre elementos.",
                    );
                    return Ty::array(Ty::Null, inner_dims + 1);
                }
            }

            let mut base = first_base;
            for elem in &elem_types[1..] {
                let elem_base = match elem {
                    Ty::Array { base, .. } => (**base).clone(),
                    _ => unreachable!("all elements checked to be arrays"),
                };
                match unify_numeric(&base, &elem_base) {
                    Some(unified) => base = unified,
                    None => {
                        self.handler.error(
                            span,
                            format!("Tipos incompatibles en arreglo: {} y {}", base, elem_base),
                        );
                        return Ty::array(Ty::Null, inner_dims + 1);
                    }
                }
            }
            Ty::array(base, inner_dims + 1)
        } else {
            let mut base = elem_types[0].clone();
            for elem in &elem_types[1..] {
                match unify_numeric(&base, elem) {
                    Some(unified) => base = unified,
                    None => {
                        self.handler.error(
                            span,
                            format!("Tipos incompatibles en arreglo: {} y {}", base, elem),
                        );
                        return Ty::array(Ty::Null, 1);
                    }
                }
            }
            Ty::array(base, 1)
        }
    }

    fn binary_type(&mut self, op: BinOp, left: &Ty, right: &Ty, span: Span) -> Ty {
        match op {
            BinOp::Add | BinOp::Sub => {
                if left.is_numeric() && right.is_numeric() {
                    if *left == Ty::Float || *right == Ty::Float {
                        Ty::Float
                    } else {
                        Ty::Int
                    }
                } else if op == BinOp::Add && (*left == Ty::String || *right == Ty::String) {
                    Ty::String
                } else {
                    self.handler.error(
                        span,
                        format!("operación {} inválida para {} y {}", op.as_str(), left, right),
                    );
                    Ty::Null
                }
            }
            BinOp::Mul => {
                if left.is_numeric() && right.is_numeric() {
                    if *left == Ty::Float || *right == Ty::Float {
                        Ty::Float
                    } else {
                        Ty::Int
                    }
                } else {
                    self.handler.error(
                        span,
                        format!("Operación * inválida para {} y {}", left, right),
                    );
                    Ty::Null
                }
            }
            BinOp::Div => {
                // division always yields float, int/int included
                if left.is_numeric() && right.is_numeric() {
                    Ty::Float
                } else {
                    self.handler.error(
                        span,
                        format!("Operación / inválida para {} y {}", left, right),
                    );
                    Ty::Null
                }
            }
            BinOp::Mod => {
                if *left == Ty::Int && *right == Ty::Int {
                    Ty::Int
                } else {
                    self.handler.error(
                        span,
                        format!("Operación % requiere enteros, recibió {} y {}", left, right),
                    );
                    // assume the intended result was an integer
                    Ty::Int
                }
            }
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                if !left.is_numeric() || !right.is_numeric() {
                    self.handler.error(
                        span,
                        format!(
                            "Comparación {} requiere números, recibió {} y {}",
                            op.as_str(),
                            left,
                            right
                        ),
                    );
                }
                Ty::Bool
            }
            BinOp::Eq | BinOp::Ne => {
                if !self.table.can_assign(left, right) && !self.table.can_assign(right, left) {
                    self.handler.error(
                        span,
                        format!(
                            "Comparación {} entre tipos incompatibles: {} y {}",
                            op.as_str(),
                            left,
                            right
                        ),
                    );
                }
                Ty::Bool
            }
            BinOp::And | BinOp::Or => {
                if *left != Ty::Bool || *right != Ty::Bool {
                    self.handler.error(
                        span,
                        format!(
                            "Operación {} requiere booleanos, recibió {} y {}",
                            op.as_str(),
                            left,
                            right
                        ),
                    );
                }
                Ty::Bool
            }
        }
    }

    fn ternary_type(&mut self, then_ty: &Ty, else_ty: &Ty, span: Span) -> Ty {
        if then_ty == else_ty {
            return then_ty.clone();
        }

        if let (
            Ty::Array {
                base: then_base,
                dims: then_dims,
            },
            Ty::Array {
                base: else_base,
                dims: else_dims,
            },
        ) = (then_ty, else_ty)
        {
            if then_dims == else_dims {
                if let Some(unified) = unify_numeric(then_base, else_base) {
                    return Ty::array(unified, *then_dims);
                }
            }
            self.handler.error(
                span,
                format!("Tipos incompatibles en ternario: {} y {}", then_ty, else_ty),
            );
            return Ty::array(Ty::Null, *then_dims);
        }

        if let Some(unified) = unify_numeric(then_ty, else_ty) {
            return unified;
        }

        self.handler.error(
            span,
            format!("Tipos incompatibles en ternario: {} y {}", then_ty, else_ty),
        );
        Ty::Null
    }

    fn check_callee(&mut self, expr: &Expr) -> Callee {
        match expr {
            Expr::Ident(e) => match self.table.resolve(self.current, e.name) {
                Some(id) => {
                    let kind = self.table.symbol(id).kind.clone();
                    match kind {
                        SymbolKind::Var { ty, .. } => {
                            self.set(e.id, ty.clone());
                            Callee::Value(ty)
                        }
                        SymbolKind::Func { .. } => {
                            self.set(e.id, Ty::Null);
                            Callee::Func(id)
                        }
                        SymbolKind::Class(class_id) => {
                            self.set(e.id, Ty::Null);
                            Callee::Class(class_id)
                        }
                    }
                }
                None => {
                    self.handler
                        .error(e.span, format!("'{}' no declarado", e.name));
                    self.set(e.id, Ty::Null);
                    Callee::Value(Ty::Null)
                }
            },
            Expr::Property(e) => {
                let recv_ty = self.check_expr(&e.recv);
                let class_id = match recv_ty.class_id() {
                    Some(id) => id,
                    None => {
                        self.handler.error(
                            e.span,
                            format!(
                                "No se puede acceder propiedad '{}' sobre tipo {}",
                                e.name, recv_ty
                            ),
                        );
                        self.set(e.id, Ty::Null);
                        return Callee::Value(Ty::Null);
                    }
                };
                match self.table.resolve_member(class_id, e.name) {
                    Some(psym) => {
                        let kind = self.table.symbol(psym).kind.clone();
                        match kind {
                            SymbolKind::Func { .. } => {
                                self.set(e.id, Ty::Null);
                                Callee::Func(psym)
                            }
                            SymbolKind::Var { ty, .. } => {
                                self.set(e.id, ty.clone());
                                Callee::Value(ty)
                            }
                            SymbolKind::Class(class_id) => {
                                self.set(e.id, Ty::Null);
                                Callee::Class(class_id)
                            }
                        }
                    }
                    None => {
                        self.handler
                            .error(e.span, format!("Propiedad '{}' no existe", e.name));
                        self.set(e.id, Ty::Null);
                        Callee::Value(Ty::Null)
                    }
                }
            }
            other => Callee::Value(self.check_expr(other)),
        }
    }

    fn check_call(&mut self, call: &CallExpr) -> Ty {
        let args_ty: Vec<Ty> = call.args.iter().map(|a| self.check_expr(a)).collect();

        match self.check_callee(&call.callee) {
            Callee::Func(fid) => {
                let (name, ret, params) = match &self.table.symbol(fid).kind {
                    SymbolKind::Func { ret, params } => {
                        (self.table.symbol(fid).name, ret.clone(), params.clone())
                    }
                    _ => unreachable!("Callee::Func always carries a function symbol"),
                };

                if params.len() != args_ty.len() {
                    self.handler.error(
                        call.span,
                        format!(
                            "'{}' espera {} args, recibió {}",
                            name,
                            params.len(),
                            args_ty.len()
                        ),
                    );
                    return self.set(call.id, ret);
                }
                for (i, (param, arg)) in params.iter().zip(args_ty.iter()).enumerate() {
                    let param_ty = self.sym_ty(*param);
                    if !self.table.can_assign(&param_ty, arg) {
                        self.handler.error(
                            call.span,
                            format!(
                                "Arg {} de '{}': esperado {}, recibió {}",
                                i + 1,
                                name,
                                param_ty,
                                arg
                            ),
                        );
                    }
                }
                self.set(call.id, ret)
            }
            Callee::Class(class_id) => {
                self.check_constructor_args(class_id, &args_ty, call.span);
                let ty = self.table.class_ty(class_id);
                self.set(call.id, ty)
            }
            Callee::Value(_) => {
                self.handler.error(call.span, "expresión no invocable");
                self.set(call.id, Ty::Null)
            }
        }
    }

    fn check_new(&mut self, e: &NewExpr) -> Ty {
        let class_id = match self.table.resolve(self.current, e.class_name) {
            Some(id) => match &self.table.symbol(id).kind {
                SymbolKind::Class(class_id) => *class_id,
                _ => {
                    self.handler.error(
                        e.span,
                        format!("Tipo de clase '{}' no encontrado", e.class_name),
                    );
                    return self.set(e.id, Ty::Null);
                }
            },
            None => {
                self.handler.error(
                    e.span,
                    format!("Tipo de clase '{}' no encontrado", e.class_name),
                );
                return self.set(e.id, Ty::Null);
            }
        };

        let args_ty: Vec<Ty> = e.args.iter().map(|a| self.check_expr(a)).collect();
        self.check_constructor_args(class_id, &args_ty, e.span);

        let ty = self.table.class_ty(class_id);
        self.set(e.id, ty)
    }

    fn check_constructor_args(&mut self, class_id: ClassId, args_ty: &[Ty], span: Span) {
        let class_name = self.table.classes[class_id].name;
        let ctor = self
            .table
            .resolve_member(class_id, kw::CONSTRUCTOR)
            .and_then(|id| match &self.table.symbol(id).kind {
                SymbolKind::Func { params, .. } => Some(params.clone()),
                _ => None,
            });

        match ctor {
            Some(params) => {
                if params.len() != args_ty.len() {
                    self.handler.error(
                        span,
                        format!(
                            "constructor de {} espera {} args, recibió {}",
                            class_name,
                            params.len(),
                            args_ty.len()
                        ),
                    );
                    return;
                }
                for (i, (param, arg)) in params.iter().zip(args_ty.iter()).enumerate() {
                    let param_ty = self.sym_ty(*param);
                    if !self.table.can_assign(&param_ty, arg) {
                        self.handler.error(
                            span,
                            format!(
                                "Arg {} del constructor de {}: esperado {}, recibió {}",
                                i + 1,
                                class_name,
                                param_ty,
                                arg
                            ),
                        );
                    }
                }
            }
            None => {
                if !args_ty.is_empty() {
                    self.handler.error(
                        span,
                        format!(
                            "{} no tiene constructor que acepte {} args",
                            class_name,
                            args_ty.len()
                        ),
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scope_builder::ScopeBuilder;
    use brioc_ast::AstBuilder;

    fn analyze(program: &Program) -> (SymbolTable, TypeMap, Handler) {
        let handler = Handler::new();
        let mut table = ScopeBuilder::build(program, &handler);
        let types = TypeChecker::check(program, &mut table, &handler);
        (table, types, handler)
    }

    fn messages(handler: &Handler) -> Vec<String> {
        handler.diagnostics().iter().map(|d| d.message.clone()).collect()
    }

    fn assert_message(handler: &Handler, needle: &str) {
        let all = messages(handler);
        assert!(
            all.iter().any(|m| m.contains(needle)),
            "expected a diagnostic containing {:?}, got {:?}",
            needle,
            all
        );
    }

    #[test]
    fn test_unannotated_declaration_infers_type() {
        let mut b = AstBuilder::new();
        let init = b.int(1);
        let decl = b.let_decl("a", None, Some(init));
        let program = b.program(vec![decl]);

        let (table, _, handler) = analyze(&program);
        assert!(!handler.has_errors());
        let id = table.resolve(table.global, Symbol::intern("a")).unwrap();
        assert_eq!(table.symbol(id).value_ty(&table), Ty::Int);
    }

    #[test]
    fn test_annotated_declaration_mismatch() {
        // let a: integer = "hola";
        let mut b = AstBuilder::new();
        let ann = b.ty("integer", 0);
        let init = b.string("hola");
        let decl = b.let_decl("a", Some(ann), Some(init));
        let program = b.program(vec![decl]);

        let (_, _, handler) = analyze(&program);
        assert_message(&handler, "No se puede asignar String a Int en 'a'");
    }

    #[test]
    fn test_widening_declaration_accepted() {
        // let f: float = 3;
        let mut b = AstBuilder::new();
        let ann = b.ty("float", 0);
        let init = b.int(3);
        let decl = b.let_decl("f", Some(ann), Some(init));
        let program = b.program(vec![decl]);

        let (_, _, handler) = analyze(&program);
        assert!(!handler.has_errors());
    }

    #[test]
    fn test_const_requires_initializer() {
        let mut b = AstBuilder::new();
        let ann = b.ty("integer", 0);
        let decl = b.const_decl("k", Some(ann), None);
        let program = b.program(vec![decl]);

        let (_, _, handler) = analyze(&program);
        assert_message(&handler, "Const 'k' requiere inicializador");
    }

    #[test]
    fn test_const_reassignment() {
        let mut b = AstBuilder::new();
        let init = b.int(1);
        let decl = b.const_decl("k", None, Some(init));
        let two = b.int(2);
        let assign = b.assign_name("k", two);
        let program = b.program(vec![decl, assign]);

        let (_, _, handler) = analyze(&program);
        assert_message(&handler, "No se puede asignar a const 'k'");
    }

    #[test]
    fn test_undeclared_identifier() {
        let mut b = AstBuilder::new();
        let y = b.ident("y");
        let stmt = b.expr_stmt(y);
        let program = b.program(vec![stmt]);

        let (_, _, handler) = analyze(&program);
        assert_message(&handler, "'y' no declarado");
    }

    #[test]
    fn test_return_type_mismatch() {
        // function f(x: integer): integer { return "x"; }
        let mut b = AstBuilder::new();
        let tx = b.ty("integer", 0);
        let px = b.param("x", tx);
        let ret_ann = b.ty("integer", 0);
        let ret_val = b.string("x");
        let ret = b.return_stmt(Some(ret_val));
        let func = b.func_decl("f", vec![px], Some(ret_ann), vec![ret]);
        let program = b.program(vec![func]);

        let (_, _, handler) = analyze(&program);
        assert_message(&handler, "return: esperado Int, recibido String");
    }

    #[test]
    fn test_void_function_rejects_return_value() {
        let mut b = AstBuilder::new();
        let one = b.int(1);
        let ret = b.return_stmt(Some(one));
        let func = b.func_decl("f", vec![], None, vec![ret]);
        let program = b.program(vec![func]);

        let (_, _, handler) = analyze(&program);
        assert_message(&handler, "return no debe llevar expresión en función void");
    }

    #[test]
    fn test_missing_return_value() {
        let mut b = AstBuilder::new();
        let ret_ann = b.ty("integer", 0);
        let ret = b.return_stmt(None);
        let func = b.func_decl("f", vec![], Some(ret_ann), vec![ret]);
        let program = b.program(vec![func]);

        let (_, _, handler) = analyze(&program);
        assert_message(&handler, "se esperaba return de tipo Int");
    }

    #[test]
    fn test_call_arity_and_argument_types() {
        let mut b = AstBuilder::new();
        let ta = b.ty("integer", 0);
        let pa = b.param("a", ta);
        let ret_ann = b.ty("integer", 0);
        let func = b.func_decl("f", vec![pa], Some(ret_ann), vec![]);

        let callee = b.ident("f");
        let wrong_count = b.call(callee, vec![]);
        let s1 = b.expr_stmt(wrong_count);

        let callee2 = b.ident("f");
        let arg = b.string("no");
        let wrong_type = b.call(callee2, vec![arg]);
        let s2 = b.expr_stmt(wrong_type);

        let program = b.program(vec![func, s1, s2]);
        let (_, _, handler) = analyze(&program);
        assert_message(&handler, "'f' espera 1 args, recibió 0");
        assert_message(&handler, "Arg 1 de 'f': esperado Int, recibió String");
    }

    #[test]
    fn test_call_result_type_is_memoized() {
        let mut b = AstBuilder::new();
        let ret_ann = b.ty("integer", 0);
        let one = b.int(1);
        let ret = b.return_stmt(Some(one));
        let func = b.func_decl("f", vec![], Some(ret_ann), vec![ret]);
        let callee = b.ident("f");
        let call = b.call(callee, vec![]);
        let call_id = call.id();
        let decl = b.let_decl("x", None, Some(call));
        let program = b.program(vec![func, decl]);

        let (_, types, handler) = analyze(&program);
        assert!(!handler.has_errors());
        assert_eq!(types[&call_id], Ty::Int);
    }

    #[test]
    fn test_this_outside_class() {
        let mut b = AstBuilder::new();
        let this = b.this();
        let stmt = b.expr_stmt(this);
        let program = b.program(vec![stmt]);

        let (_, _, handler) = analyze(&program);
        assert_message(&handler, "Uso de 'this' fuera de una clase");
    }

    #[test]
    fn test_break_and_continue_contexts() {
        let mut b = AstBuilder::new();
        let brk = b.break_stmt();
        let cont = b.continue_stmt();
        let program = b.program(vec![brk, cont]);

        let (_, _, handler) = analyze(&program);
        assert_message(&handler, "break fuera de un ciclo o switch");
        assert_message(&handler, "'continue' fuera de un bucle");
    }

    #[test]
    fn test_continue_inside_switch_alone_is_invalid() {
        let mut b = AstBuilder::new();
        let scrut = b.int(1);
        let case_val = b.int(1);
        let cont = b.continue_stmt();
        let brk = b.break_stmt();
        let case = b.switch_case(case_val, vec![cont, brk]);
        let switch = b.switch_stmt(scrut, vec![case], None);
        let program = b.program(vec![switch]);

        let (_, _, handler) = analyze(&program);
        // break is fine inside a switch, continue is not
        assert_message(&handler, "'continue' fuera de un bucle");
        let all = messages(&handler);
        assert!(!all.iter().any(|m| m.contains("break fuera")), "{:?}", all);
    }

    #[test]
    fn test_loop_condition_must_be_bool() {
        let mut b = AstBuilder::new();
        let cond = b.int(1);
        let while_stmt = b.while_stmt(cond, vec![]);
        let program = b.program(vec![while_stmt]);

        let (_, _, handler) = analyze(&program);
        assert_message(&handler, "Se esperaba bool, se obtuvo Int");
    }

    #[test]
    fn test_switch_equality_dispatch() {
        // an int scrutinee accepts int cases and rejects string cases
        let mut b = AstBuilder::new();
        let init = b.int(2);
        let decl = b.let_decl("x", None, Some(init));
        let scrut = b.ident("x");
        let ok_val = b.int(1);
        let ok_case = b.switch_case(ok_val, vec![]);
        let bad_val = b.string("uno");
        let bad_case = b.switch_case(bad_val, vec![]);
        let switch = b.switch_stmt(scrut, vec![ok_case, bad_case], None);
        let program = b.program(vec![decl, switch]);

        let (_, _, handler) = analyze(&program);
        assert_eq!(handler.error_count(), 1);
        assert_message(&handler, "case incompatible con el valor del switch: Int y String");
    }

    #[test]
    fn test_arithmetic_rules() {
        let mut b = AstBuilder::new();
        // 1 / 2 yields Float
        let l = b.int(1);
        let r = b.int(2);
        let div = b.binary(l, BinOp::Div, r);
        let div_id = div.id();
        let s1 = b.expr_stmt(div);
        // 1.0 % 2 is rejected, result assumed Int
        let fl = b.float(1.0);
        let two = b.int(2);
        let md = b.binary(fl, BinOp::Mod, two);
        let md_id = md.id();
        let s2 = b.expr_stmt(md);
        // "a" + 1 concatenates
        let sa = b.string("a");
        let one = b.int(1);
        let cat = b.binary(sa, BinOp::Add, one);
        let cat_id = cat.id();
        let s3 = b.expr_stmt(cat);
        let program = b.program(vec![s1, s2, s3]);

        let (_, types, handler) = analyze(&program);
        assert_eq!(types[&div_id], Ty::Float);
        assert_eq!(types[&md_id], Ty::Int);
        assert_eq!(types[&cat_id], Ty::String);
        assert_message(&handler, "Operación % requiere enteros, recibió Float y Int");
    }

    #[test]
    fn test_invalid_addition() {
        let mut b = AstBuilder::new();
        let l = b.int(1);
        let r = b.boolean(true);
        let add = b.binary(l, BinOp::Add, r);
        let stmt = b.expr_stmt(add);
        let program = b.program(vec![stmt]);

        let (_, _, handler) = analyze(&program);
        assert_message(&handler, "operación + inválida para Int y Bool");
    }

    #[test]
    fn test_comparison_and_logic() {
        let mut b = AstBuilder::new();
        let l = b.string("a");
        let r = b.int(1);
        let cmp = b.binary(l, BinOp::Lt, r);
        let s1 = b.expr_stmt(cmp);
        let t = b.boolean(true);
        let one = b.int(1);
        let and = b.binary(t, BinOp::And, one);
        let s2 = b.expr_stmt(and);
        let program = b.program(vec![s1, s2]);

        let (_, _, handler) = analyze(&program);
        assert_message(&handler, "Comparación < requiere números, recibió String y Int");
        assert_message(&handler, "Operación && requiere booleanos, recibió Bool y Int");
    }

    #[test]
    fn test_equality_between_incompatible_types() {
        let mut b = AstBuilder::new();
        let l = b.string("a");
        let r = b.boolean(true);
        let eq = b.binary(l, BinOp::Eq, r);
        let stmt = b.expr_stmt(eq);
        let program = b.program(vec![stmt]);

        let (_, _, handler) = analyze(&program);
        assert_message(&handler, "Comparación == entre tipos incompatibles: String y Bool");
    }

    #[test]
    fn test_array_literal_typing() {
        let mut b = AstBuilder::new();
        // [1, 2.0] unifies to Float[]
        let one = b.int(1);
        let two = b.float(2.0);
        let arr = b.array(vec![one, two]);
        let arr_id = arr.id();
        let s1 = b.expr_stmt(arr);
        let program = b.program(vec![s1]);

        let (_, types, handler) = analyze(&program);
        assert!(!handler.has_errors());
        assert_eq!(types[&arr_id], Ty::array(Ty::Float, 1));
    }

    #[test]
    fn test_empty_array_literal() {
        let mut b = AstBuilder::new();
        let arr = b.array(vec![]);
        let arr_id = arr.id();
        let stmt = b.expr_stmt(arr);
        let program = b.program(vec![stmt]);

        let (_, types, handler) = analyze(&program);
        assert_message(&handler, "No se puede inferir el tipo de un arreglo vacío");
        assert_eq!(types[&arr_id], Ty::array(Ty::Null, 1));
    }

    #[test]
    fn test_irregular_array_literals() {
        let mut b = AstBuilder::new();
        // [[1], 2] mixes scalar and subarray
        let one = b.int(1);
        let inner = b.array(vec![one]);
        let two = b.int(2);
        let mixed = b.array(vec![inner, two]);
        let s1 = b.expr_stmt(mixed);
        // [1, "x"] has incompatible bases
        let three = b.int(3);
        let sx = b.string("x");
        let bad = b.array(vec![three, sx]);
        let s2 = b.expr_stmt(bad);
        let program = b.program(vec![s1, s2]);

        let (_, _, handler) = analyze(&program);
        assert_message(&handler, "Arreglo irregular: mezcla de elemento escalar y subarreglo.");
        assert_message(&handler, "Tipos incompatibles en arreglo: Int y String");
    }

    #[test]
    fn test_nested_array_literal() {
        let mut b = AstBuilder::new();
        let a1 = b.int(1);
        let a2 = b.int(2);
        let inner1 = b.array(vec![a1, a2]);
        let a3 = b.int(3);
        let a4 = b.int(4);
        let inner2 = b.array(vec![a3, a4]);
        let outer = b.array(vec![inner1, inner2]);
        let outer_id = outer.id();
        let stmt = b.expr_stmt(outer);
        let program = b.program(vec![stmt]);

        let (_, types, handler) = analyze(&program);
        assert!(!handler.has_errors());
        assert_eq!(types[&outer_id], Ty::array(Ty::Int, 2));
    }

    #[test]
    fn test_indexing() {
        let mut b = AstBuilder::new();
        let one = b.int(1);
        let arr = b.array(vec![one]);
        let decl = b.let_decl("xs", None, Some(arr));
        // xs[0] : Int
        let xs = b.ident("xs");
        let zero = b.int(0);
        let idx = b.index(xs, zero);
        let idx_id = idx.id();
        let s1 = b.expr_stmt(idx);
        // xs["a"] rejects the index
        let xs2 = b.ident("xs");
        let sa = b.string("a");
        let bad = b.index(xs2, sa);
        let s2 = b.expr_stmt(bad);
        // 1[0] is not an array
        let lit = b.int(1);
        let zero2 = b.int(0);
        let not_arr = b.index(lit, zero2);
        let s3 = b.expr_stmt(not_arr);
        let program = b.program(vec![decl, s1, s2, s3]);

        let (_, types, handler) = analyze(&program);
        assert_eq!(types[&idx_id], Ty::Int);
        assert_message(&handler, "Índice de arreglo debe ser integer");
        assert_message(&handler, "Indexación sobre no-arreglo");
    }

    #[test]
    fn test_foreach_refines_binder() {
        let mut b = AstBuilder::new();
        let one = b.int(1);
        let two = b.int(2);
        let arr = b.array(vec![one, two]);
        let decl = b.let_decl("xs", None, Some(arr));
        let xs = b.ident("xs");
        let item = b.ident("item");
        let use_item = b.print_stmt(item);
        let foreach = b.foreach_stmt("item", xs, vec![use_item]);
        let program = b.program(vec![decl, foreach]);

        let (table, _, handler) = analyze(&program);
        assert!(!handler.has_errors());
        let foreach_id = match &program.body[1] {
            Stmt::Foreach(s) => s.id,
            _ => unreachable!(),
        };
        let scope = table.scope_map[&foreach_id];
        let binder = table.lookup_local(scope, Symbol::intern("item")).unwrap();
        assert_eq!(table.symbol(binder).value_ty(&table), Ty::Int);
    }

    #[test]
    fn test_foreach_requires_array() {
        let mut b = AstBuilder::new();
        let one = b.int(1);
        let foreach = b.foreach_stmt("item", one, vec![]);
        let program = b.program(vec![foreach]);

        let (_, _, handler) = analyze(&program);
        assert_message(&handler, "foreach espera un arreglo; recibió Int");
    }

    #[test]
    fn test_ternary_unification() {
        let mut b = AstBuilder::new();
        let cond = b.boolean(true);
        let one = b.int(1);
        let two = b.float(2.0);
        let tern = b.ternary(cond, one, two);
        let tern_id = tern.id();
        let s1 = b.expr_stmt(tern);
        let cond2 = b.boolean(false);
        let a = b.int(1);
        let s = b.string("x");
        let bad = b.ternary(cond2, a, s);
        let s2 = b.expr_stmt(bad);
        let program = b.program(vec![s1, s2]);

        let (_, types, handler) = analyze(&program);
        assert_eq!(types[&tern_id], Ty::Float);
        assert_message(&handler, "Tipos incompatibles en ternario: Int y String");
    }

    #[test]
    fn test_class_members_and_property_access() {
        let mut b = AstBuilder::new();
        let ann = b.ty("integer", 0);
        let field = b.field("x", Some(ann), None);
        let class = b.class_decl("Point", None, vec![field]);
        let p_new = b.new_object("Point", vec![]);
        let decl = b.let_decl("p", None, Some(p_new));
        let p = b.ident("p");
        let access = b.property(p, "x");
        let access_id = access.id();
        let s1 = b.expr_stmt(access);
        let p2 = b.ident("p");
        let missing = b.property(p2, "nada");
        let s2 = b.expr_stmt(missing);
        let program = b.program(vec![class, decl, s1, s2]);

        let (_, types, handler) = analyze(&program);
        assert_eq!(types[&access_id], Ty::Int);
        assert_message(&handler, "Propiedad 'nada' no existe");
    }

    #[test]
    fn test_constructor_checking() {
        let mut b = AstBuilder::new();
        let tx = b.ty("integer", 0);
        let px = b.param("x", tx);
        let body_this = b.this();
        let body_x = b.ident("x");
        let set_x = b.assign_property(body_this, "x", body_x);
        let ctor = b.method("constructor", vec![px], None, vec![set_x]);
        let ann = b.ty("integer", 0);
        let field = b.field("x", Some(ann), None);
        let class = b.class_decl("Point", None, vec![field, ctor]);

        let ok_arg = b.int(1);
        let ok = b.new_object("Point", vec![ok_arg]);
        let d1 = b.let_decl("a", None, Some(ok));
        let bad = b.new_object("Point", vec![]);
        let d2 = b.let_decl("c", None, Some(bad));
        let bad_arg = b.string("x");
        let bad2 = b.new_object("Point", vec![bad_arg]);
        let d3 = b.let_decl("d", None, Some(bad2));
        let program = b.program(vec![class, d1, d2, d3]);

        let (_, _, handler) = analyze(&program);
        assert_message(&handler, "constructor de Point espera 1 args, recibió 0");
        assert_message(&handler, "Arg 1 del constructor de Point: esperado Int, recibido String");
    }

    #[test]
    fn test_new_without_constructor_and_args() {
        let mut b = AstBuilder::new();
        let class = b.class_decl("Vacia", None, vec![]);
        let arg = b.int(1);
        let bad = b.new_object("Vacia", vec![arg]);
        let decl = b.let_decl("v", None, Some(bad));
        let program = b.program(vec![class, decl]);

        let (_, _, handler) = analyze(&program);
        assert_message(&handler, "Vacia no tiene constructor que acepte 1 args");
    }

    #[test]
    fn test_unknown_class_in_new() {
        let mut b = AstBuilder::new();
        let bad = b.new_object("Fantasma", vec![]);
        let decl = b.let_decl("f", None, Some(bad));
        let program = b.program(vec![decl]);

        let (_, _, handler) = analyze(&program);
        assert_message(&handler, "Tipo de clase 'Fantasma' no encontrado");
    }

    #[test]
    fn test_subclass_substitutability() {
        let mut b = AstBuilder::new();
        let base = b.class_decl("Animal", None, vec![]);
        let derived = b.class_decl("Perro", Some("Animal"), vec![]);
        let ann = b.ty("Animal", 0);
        let pup = b.new_object("Perro", vec![]);
        let ok = b.let_decl("a", Some(ann), Some(pup));
        let ann2 = b.ty("Perro", 0);
        let beast = b.new_object("Animal", vec![]);
        let bad = b.let_decl("p", Some(ann2), Some(beast));
        let program = b.program(vec![base, derived, ok, bad]);

        let (_, _, handler) = analyze(&program);
        assert_eq!(handler.error_count(), 1);
        assert_message(&handler, "No se puede asignar Animal a Perro en 'p'");
    }

    #[test]
    fn test_method_call_through_instance() {
        let mut b = AstBuilder::new();
        let ret_ann = b.ty("integer", 0);
        let one = b.int(1);
        let ret = b.return_stmt(Some(one));
        let method = b.method("valor", vec![], Some(ret_ann), vec![ret]);
        let class = b.class_decl("Caja", None, vec![method]);
        let obj = b.new_object("Caja", vec![]);
        let decl = b.let_decl("c", None, Some(obj));
        let c = b.ident("c");
        let target = b.property(c, "valor");
        let call = b.call(target, vec![]);
        let call_id = call.id();
        let use_it = b.let_decl("v", None, Some(call));
        let program = b.program(vec![class, decl, use_it]);

        let (table, types, handler) = analyze(&program);
        assert!(!handler.has_errors());
        assert_eq!(types[&call_id], Ty::Int);
        let v = table.resolve(table.global, Symbol::intern("v")).unwrap();
        assert_eq!(table.symbol(v).value_ty(&table), Ty::Int);
    }

    #[test]
    fn test_override_parameter_type_mismatch() {
        let mut b = AstBuilder::new();
        let tx = b.ty("int", 0);
        let px = b.param("x", tx);
        let m_a = b.method("m", vec![px], None, vec![]);
        let class_a = b.class_decl("A", None, vec![m_a]);
        let tx2 = b.ty("string", 0);
        let px2 = b.param("x", tx2);
        let m_b = b.method("m", vec![px2], None, vec![]);
        let class_b = b.class_decl("B", Some("A"), vec![m_b]);
        let program = b.program(vec![class_a, class_b]);

        let (_, _, handler) = analyze(&program);
        assert_message(
            &handler,
            "Override inválido de 'm': tipo de parámetro String no coincide con Int",
        );
    }

    #[test]
    fn test_override_return_type_mismatch() {
        let mut b = AstBuilder::new();
        let tx = b.ty("int", 0);
        let px = b.param("x", tx);
        let m_a = b.method("m", vec![px], None, vec![]);
        let class_a = b.class_decl("A", None, vec![m_a]);
        let tx2 = b.ty("int", 0);
        let px2 = b.param("x", tx2);
        let ret_ann = b.ty("string", 0);
        let sx = b.string("x");
        let ret = b.return_stmt(Some(sx));
        let m_b = b.method("m", vec![px2], Some(ret_ann), vec![ret]);
        let class_b = b.class_decl("B", Some("A"), vec![m_b]);
        let program = b.program(vec![class_a, class_b]);

        let (_, _, handler) = analyze(&program);
        assert_message(
            &handler,
            "Override inválido de 'm': tipo de retorno String no coincide con Void",
        );
    }

    #[test]
    fn test_override_arity_mismatch() {
        let mut b = AstBuilder::new();
        let tx = b.ty("int", 0);
        let px = b.param("x", tx);
        let m_a = b.method("m", vec![px], None, vec![]);
        let class_a = b.class_decl("A", None, vec![m_a]);
        let m_b = b.method("m", vec![], None, vec![]);
        let class_b = b.class_decl("B", Some("A"), vec![m_b]);
        let program = b.program(vec![class_a, class_b]);

        let (_, _, handler) = analyze(&program);
        assert_message(
            &handler,
            "Override inválido de 'm': espera 0 parámetros, la superclase define 1",
        );
    }

    #[test]
    fn test_override_matching_signature_is_quiet() {
        let mut b = AstBuilder::new();
        let tx = b.ty("int", 0);
        let px = b.param("x", tx);
        let m_a = b.method("m", vec![px], None, vec![]);
        let class_a = b.class_decl("A", None, vec![m_a]);
        let tx2 = b.ty("int", 0);
        let px2 = b.param("x", tx2);
        let ann = b.ty("int", 0);
        let x = b.ident("x");
        let use_x = b.const_decl("a", Some(ann), Some(x));
        let m_b = b.method("m", vec![px2], None, vec![use_x]);
        let class_b = b.class_decl("B", Some("A"), vec![m_b]);
        let program = b.program(vec![class_a, class_b]);

        let (_, _, handler) = analyze(&program);
        assert!(!handler.has_errors(), "{:?}", messages(&handler));
    }

    #[test]
    fn test_void_parameter_rejected() {
        let mut b = AstBuilder::new();
        let tv = b.ty("void", 0);
        let pv = b.param("x", tv);
        let func = b.func_decl("f", vec![pv], None, vec![]);
        let program = b.program(vec![func]);

        let (_, _, handler) = analyze(&program);
        assert_message(&handler, "Un parámetro no puede ser de tipo void");
    }

    #[test]
    fn test_index_assignment() {
        let mut b = AstBuilder::new();
        let one = b.int(1);
        let arr = b.array(vec![one]);
        let decl = b.let_decl("xs", None, Some(arr));
        let xs = b.ident("xs");
        let zero = b.int(0);
        let sx = b.string("x");
        let bad = b.assign_index(xs, zero, sx);
        let program = b.program(vec![decl, bad]);

        let (_, _, handler) = analyze(&program);
        assert_message(&handler, "Asignación incompatible en arreglo: Int = String");
    }

    #[test]
    fn test_checker_is_idempotent() {
        let mut b = AstBuilder::new();
        let init = b.int(1);
        let decl = b.let_decl("x", None, Some(init));
        let x = b.ident("x");
        let two = b.int(2);
        let sum = b.binary(x, BinOp::Add, two);
        let assign = b.assign_name("x", sum);
        let bad = b.ident("nadie");
        let stmt = b.expr_stmt(bad);
        let program = b.program(vec![decl, assign, stmt]);

        let handler = Handler::new();
        let mut table = ScopeBuilder::build(&program, &handler);
        let first = TypeChecker::check(&program, &mut table, &handler);
        let after_first = handler.diagnostics().len();
        let second = TypeChecker::check(&program, &mut table, &handler);

        assert_eq!(first, second);
        assert_eq!(handler.diagnostics().len(), after_first * 2);
        // the second run repeats the same diagnostics, adds none
        let diags = handler.diagnostics();
        assert_eq!(diags[..after_first], diags[after_first..]);
    }
}
