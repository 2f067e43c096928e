//! TAC generation pass.
//!
//! Walks the checked tree and appends quadruples. Every compound
//! expression produces a *place* (a temporary or a named storage);
//! temporaries are released right after the quadruple consuming them, so
//! the pool stays small and ids are reused deterministically.
//!
//! Control flow lowers to labels and explicit jumps. Labels are produced
//! by a monotone counter under a per-construct hint, so every label in a
//! stream is unique. Loops push `(continue_target, break_target)` pairs;
//! switches push their end label; `break`/`continue` resolve against the
//! innermost entry and degrade to no-ops outside any (the checker already
//! reported those).

use crate::tac::{OpCode, Operand, Quad};
use crate::temp::TempManager;
use brioc_ast::{
    AssignStmt, BinOp, Block, CallExpr, ClassDecl, ClassMember, Expr, FuncDecl, LiteralValue,
    Place, Program, Stmt, UnOp,
};
use brioc_sem::{checker::TypeMap, Ty};
use brioc_util::{kw, Symbol};
use tracing::debug;

/// The TAC emitter
pub struct Emitter<'a> {
    types: &'a TypeMap,
    quads: Vec<Quad>,
    temps: TempManager,
    label_counter: u32,
    /// `(continue_target, break_target)` per enclosing loop
    loop_stack: Vec<(String, String)>,
    /// break target per enclosing switch
    switch_stack: Vec<String>,
}

impl<'a> Emitter<'a> {
    /// Lower a program into its quadruple stream
    pub fn generate(program: &Program, types: &'a TypeMap) -> Vec<Quad> {
        let mut emitter = Emitter {
            types,
            quads: Vec::new(),
            temps: TempManager::new(),
            label_counter: 0,
            loop_stack: Vec::new(),
            switch_stack: Vec::new(),
        };

        debug!("tac emitter: start");
        for stmt in &program.body {
            emitter.emit_stmt(stmt);
        }
        debug!(quads = emitter.quads.len(), "tac emitter: done");
        debug_assert!(emitter.loop_stack.is_empty());
        debug_assert!(emitter.switch_stack.is_empty());
        emitter.quads
    }

    fn emit(
        &mut self,
        op: OpCode,
        arg1: Option<Operand>,
        arg2: Option<Operand>,
        result: Option<Operand>,
    ) {
        let id = self.quads.len() as u32;
        self.quads.push(Quad {
            id,
            op,
            arg1,
            arg2,
            result,
        });
    }

    fn new_label(&mut self, hint: &str) -> String {
        self.label_counter += 1;
        format!("{}{}", hint, self.label_counter)
    }

    fn release(&mut self, operand: &Operand) {
        self.temps.release(operand);
    }

    fn label(&mut self, name: &str) {
        self.emit(OpCode::Label, None, None, Some(Operand::Label(name.to_owned())));
    }

    fn goto(&mut self, target: &str) {
        self.emit(OpCode::Goto, None, None, Some(Operand::Label(target.to_owned())));
    }

    fn branch(&mut self, op: OpCode, cond: Operand, target: &str) {
        self.emit(op, Some(cond), None, Some(Operand::Label(target.to_owned())));
    }

    // ------------------------------------------------------------------
    // statements
    // ------------------------------------------------------------------

    fn emit_stmt(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Var(decl) => {
                if let Some(init) = &decl.init {
                    let value = self.emit_expr(init);
                    self.emit(
                        OpCode::Assign,
                        Some(value.clone()),
                        None,
                        Some(Operand::Name(decl.name)),
                    );
                    self.release(&value);
                }
            }
            Stmt::Assign(assign) => self.emit_assign(assign),
            Stmt::Expr(s) => {
                let value = self.emit_expr(&s.expr);
                self.release(&value);
            }
            Stmt::Func(func) => self.emit_func(func),
            Stmt::Class(class) => self.emit_class(class),
            Stmt::Block(block) => self.emit_block(block),
            Stmt::If(s) => {
                let cond = self.emit_expr(&s.cond);
                let else_label = self.new_label("Lif_else_");

                self.branch(OpCode::IfFalse, cond.clone(), &else_label);
                self.release(&cond);

                self.emit_block(&s.then_block);

                match &s.else_block {
                    Some(els) => {
                        let end_label = self.new_label("Lif_end_");
                        self.goto(&end_label);
                        self.label(&else_label);
                        self.emit_block(els);
                        self.label(&end_label);
                    }
                    None => {
                        // no end jump when there is nothing to jump over
                        self.label(&else_label);
                    }
                }
            }
            Stmt::While(s) => {
                let test_label = self.new_label("Lwhile_test_");
                let body_label = self.new_label("Lwhile_body_");
                let end_label = self.new_label("Lwhile_end_");

                self.loop_stack.push((test_label.clone(), end_label.clone()));

                self.label(&test_label);
                let cond = self.emit_expr(&s.cond);
                self.branch(OpCode::IfFalse, cond.clone(), &end_label);
                self.release(&cond);

                self.label(&body_label);
                self.emit_block(&s.body);
                self.goto(&test_label);
                self.label(&end_label);

                self.loop_stack.pop();
            }
            Stmt::DoWhile(s) => {
                let body_label = self.new_label("Ldo_body_");
                let cond_label = self.new_label("Ldo_cond_");
                let end_label = self.new_label("Ldo_end_");

                self.loop_stack.push((cond_label.clone(), end_label.clone()));

                self.label(&body_label);
                self.emit_block(&s.body);

                self.label(&cond_label);
                let cond = self.emit_expr(&s.cond);
                self.branch(OpCode::IfTrue, cond.clone(), &body_label);
                self.release(&cond);
                self.label(&end_label);

                self.loop_stack.pop();
            }
            Stmt::For(s) => {
                if let Some(init) = &s.init {
                    self.emit_stmt(init);
                }

                let test_label = self.new_label("Lfor_test_");
                let incr_label = self.new_label("Lfor_incr_");
                let end_label = self.new_label("Lfor_end_");

                self.loop_stack.push((incr_label.clone(), end_label.clone()));

                self.label(&test_label);
                if let Some(cond) = &s.cond {
                    let cond_place = self.emit_expr(cond);
                    self.branch(OpCode::IfFalse, cond_place.clone(), &end_label);
                    self.release(&cond_place);
                }

                self.emit_block(&s.body);

                self.label(&incr_label);
                if let Some(step) = &s.step {
                    self.emit_stmt(step);
                }
                self.goto(&test_label);
                self.label(&end_label);

                self.loop_stack.pop();
            }
            Stmt::Foreach(s) => self.emit_foreach(s),
            Stmt::Switch(s) => self.emit_switch(s),
            Stmt::Try(s) => {
                let catch_label = self.new_label("Lcatch_");
                let end_label = self.new_label("Ltry_end_");

                self.emit(
                    OpCode::TryBegin,
                    None,
                    None,
                    Some(Operand::Label(catch_label.clone())),
                );
                self.emit_block(&s.try_block);
                self.emit(OpCode::TryEnd, None, None, None);
                self.goto(&end_label);

                self.label(&catch_label);
                self.emit(
                    OpCode::Assign,
                    Some(Operand::Name(kw::EXCEPTION)),
                    None,
                    Some(Operand::Name(s.binder)),
                );
                self.emit_block(&s.catch_block);
                self.label(&end_label);
            }
            Stmt::Return(s) => match &s.value {
                Some(value) => {
                    let place = self.emit_expr(value);
                    self.emit(OpCode::Return, Some(place.clone()), None, None);
                    self.release(&place);
                }
                None => {
                    self.emit(OpCode::Return, None, None, None);
                }
            },
            Stmt::Break(_) => {
                // a switch break wins over the enclosing loop's
                if let Some(target) = self.switch_stack.last().cloned() {
                    self.goto(&target);
                } else if let Some((_, target)) = self.loop_stack.last().cloned() {
                    self.goto(&target);
                }
                // outside both: the checker already reported it
            }
            Stmt::Continue(_) => {
                if let Some((target, _)) = self.loop_stack.last().cloned() {
                    self.goto(&target);
                }
            }
            Stmt::Print(s) => {
                let value = self.emit_expr(&s.value);
                self.emit(OpCode::Print, Some(value.clone()), None, None);
                self.release(&value);
            }
        }
    }

    fn emit_block(&mut self, block: &Block) {
        for stmt in &block.stmts {
            self.emit_stmt(stmt);
        }
    }

    fn emit_assign(&mut self, assign: &AssignStmt) {
        match &assign.target {
            Place::Name { name, .. } => {
                let value = self.emit_expr(&assign.value);
                self.emit(
                    OpCode::Assign,
                    Some(value.clone()),
                    None,
                    Some(Operand::Name(*name)),
                );
                self.release(&value);
            }
            Place::Property { recv, name, .. } => {
                let recv_place = self.emit_expr(recv);
                let value = self.emit_expr(&assign.value);
                self.emit(
                    OpCode::SetProp,
                    Some(recv_place.clone()),
                    Some(Operand::Name(*name)),
                    Some(value.clone()),
                );
                self.release(&recv_place);
                self.release(&value);
            }
            Place::Index { recv, index, .. } => {
                let recv_place = self.emit_expr(recv);
                let index_place = self.emit_expr(index);
                let value = self.emit_expr(&assign.value);
                self.emit(
                    OpCode::IndexSet,
                    Some(recv_place.clone()),
                    Some(index_place.clone()),
                    Some(value.clone()),
                );
                self.release(&recv_place);
                self.release(&index_place);
                self.release(&value);
            }
        }
    }

    fn emit_func(&mut self, func: &FuncDecl) {
        let func_label = format!("func_{}", func.name);
        self.emit(OpCode::Label, None, None, Some(Operand::Label(func_label)));

        // formals carry their name in the result field; call arguments
        // carry the value in arg1
        for param in &func.params {
            self.emit(OpCode::Param, None, None, Some(Operand::Name(param.name)));
        }

        self.emit_block(&func.body);
        self.emit(OpCode::EndFunc, None, None, Some(Operand::Name(func.name)));
    }

    fn emit_class(&mut self, class: &ClassDecl) {
        self.emit(
            OpCode::Class,
            class.superclass.map(Operand::Name),
            None,
            Some(Operand::Name(class.name)),
        );

        for member in &class.members {
            match member {
                ClassMember::Field(field) => {
                    if let Some(init) = &field.init {
                        let value = self.emit_expr(init);
                        self.emit(
                            OpCode::Assign,
                            Some(value.clone()),
                            None,
                            Some(Operand::Name(field.name)),
                        );
                        self.release(&value);
                    }
                }
                ClassMember::Method(method) => self.emit_func(method),
            }
        }

        self.emit(OpCode::EndClass, None, None, Some(Operand::Name(class.name)));
    }

    fn emit_foreach(&mut self, s: &brioc_ast::ForeachStmt) {
        let array = self.emit_expr(&s.iterable);

        // length once, up front
        self.emit(OpCode::Param, Some(array.clone()), None, None);
        let length = self.temps.new_temp();
        self.emit(
            OpCode::Call,
            Some(Operand::Name(kw::LEN)),
            Some(Operand::Int(1)),
            Some(length.clone()),
        );

        let index = self.temps.new_temp();
        self.emit(OpCode::Assign, Some(Operand::Int(0)), None, Some(index.clone()));

        let test_label = self.new_label("Lforeach_test_");
        let end_label = self.new_label("Lforeach_end_");

        self.loop_stack.push((test_label.clone(), end_label.clone()));

        self.label(&test_label);
        let in_range = self.temps.new_temp();
        self.emit(
            OpCode::Lt,
            Some(index.clone()),
            Some(length.clone()),
            Some(in_range.clone()),
        );
        self.branch(OpCode::IfFalse, in_range.clone(), &end_label);
        self.release(&in_range);

        // body prelude: load the current element into the binder
        let element = self.temps.new_temp();
        self.emit(
            OpCode::IndexGet,
            Some(array.clone()),
            Some(index.clone()),
            Some(element.clone()),
        );
        self.emit(
            OpCode::Assign,
            Some(element.clone()),
            None,
            Some(Operand::Name(s.binder)),
        );
        self.release(&element);

        self.emit_block(&s.body);

        self.emit(
            OpCode::Add,
            Some(index.clone()),
            Some(Operand::Int(1)),
            Some(index.clone()),
        );
        self.goto(&test_label);
        self.label(&end_label);

        self.loop_stack.pop();
        self.release(&index);
        self.release(&length);
        self.release(&array);
    }

    fn emit_switch(&mut self, s: &brioc_ast::SwitchStmt) {
        let scrutinee = self.emit_expr(&s.scrutinee);

        let case_labels: Vec<String> = s
            .cases
            .iter()
            .map(|_| self.new_label("Lcase_"))
            .collect();
        let default_label = s.default.as_ref().map(|_| self.new_label("Ldefault_"));
        let end_label = self.new_label("Lswitch_end_");

        self.switch_stack.push(end_label.clone());

        for (case, label) in s.cases.iter().zip(&case_labels) {
            let case_value = self.emit_expr(&case.value);
            let matched = self.temps.new_temp();
            self.emit(
                OpCode::Eq,
                Some(scrutinee.clone()),
                Some(case_value.clone()),
                Some(matched.clone()),
            );
            self.branch(OpCode::IfTrue, matched.clone(), label);
            self.release(&matched);
            self.release(&case_value);
        }

        // unmatched scrutinee falls through to default, or straight to end
        match &default_label {
            Some(label) => self.goto(label),
            None => self.goto(&end_label),
        }

        for (case, label) in s.cases.iter().zip(&case_labels) {
            self.label(label);
            for stmt in &case.body {
                self.emit_stmt(stmt);
            }
        }

        if let (Some(default), Some(label)) = (&s.default, default_label) {
            self.label(&label);
            for stmt in default {
                self.emit_stmt(stmt);
            }
        }

        self.label(&end_label);
        self.release(&scrutinee);
        self.switch_stack.pop();
    }

    // ------------------------------------------------------------------
    // expressions
    // ------------------------------------------------------------------

    fn emit_expr(&mut self, expr: &Expr) -> Operand {
        match expr {
            Expr::Literal(e) => match &e.value {
                LiteralValue::Int(v) => Operand::Int(*v),
                LiteralValue::Float(v) => Operand::Float(*v),
                LiteralValue::Str(s) => Operand::Str(s.clone()),
                LiteralValue::Bool(b) => Operand::Int(i64::from(*b)),
                LiteralValue::Null => Operand::Null,
            },
            Expr::Ident(e) => Operand::Name(e.name),
            Expr::This(_) => Operand::Name(kw::THIS),
            Expr::ArrayLit(e) => {
                let tag = self.element_tag(e.id);
                let array = self.temps.new_temp();
                self.emit(
                    OpCode::NewArr,
                    Some(Operand::Name(Symbol::intern(tag))),
                    Some(Operand::Int(e.elements.len() as i64)),
                    Some(array.clone()),
                );
                for (i, element) in e.elements.iter().enumerate() {
                    let value = self.emit_expr(element);
                    self.emit(
                        OpCode::IndexSet,
                        Some(array.clone()),
                        Some(Operand::Int(i as i64)),
                        Some(value.clone()),
                    );
                    self.release(&value);
                }
                array
            }
            Expr::Index(e) => {
                let array = self.emit_expr(&e.recv);
                let index = self.emit_expr(&e.index);
                let result = self.temps.new_temp();
                self.emit(
                    OpCode::IndexGet,
                    Some(array.clone()),
                    Some(index.clone()),
                    Some(result.clone()),
                );
                self.release(&array);
                self.release(&index);
                result
            }
            Expr::Property(e) => {
                let recv = self.emit_expr(&e.recv);
                let result = self.temps.new_temp();
                self.emit(
                    OpCode::GetProp,
                    Some(recv.clone()),
                    Some(Operand::Name(e.name)),
                    Some(result.clone()),
                );
                self.release(&recv);
                result
            }
            Expr::Call(e) => self.emit_call(e),
            Expr::New(e) => {
                for arg in &e.args {
                    let value = self.emit_expr(arg);
                    self.emit(OpCode::Param, Some(value.clone()), None, None);
                    self.release(&value);
                }
                let result = self.temps.new_temp();
                self.emit(
                    OpCode::New,
                    Some(Operand::Name(e.class_name)),
                    Some(Operand::Int(e.args.len() as i64)),
                    Some(result.clone()),
                );
                result
            }
            Expr::Unary(e) => {
                let value = self.emit_expr(&e.expr);
                let result = self.temps.new_temp();
                match e.op {
                    UnOp::Neg => {
                        self.emit(
                            OpCode::Sub,
                            Some(Operand::Int(0)),
                            Some(value.clone()),
                            Some(result.clone()),
                        );
                    }
                    UnOp::Not => {
                        self.emit(OpCode::Not, Some(value.clone()), None, Some(result.clone()));
                    }
                }
                self.release(&value);
                result
            }
            Expr::Binary(e) => match e.op {
                BinOp::And => self.emit_logical_and(e),
                BinOp::Or => self.emit_logical_or(e),
                op => {
                    let left = self.emit_expr(&e.left);
                    let right = self.emit_expr(&e.right);
                    let result = self.temps.new_temp();
                    self.emit(
                        binop_opcode(op),
                        Some(left.clone()),
                        Some(right.clone()),
                        Some(result.clone()),
                    );
                    self.release(&left);
                    self.release(&right);
                    result
                }
            },
            Expr::Ternary(e) => {
                let cond = self.emit_expr(&e.cond);
                let result = self.temps.new_temp();
                let else_label = self.new_label("Ltern_else_");
                let end_label = self.new_label("Ltern_end_");

                self.branch(OpCode::IfFalse, cond.clone(), &else_label);
                self.release(&cond);

                let then_value = self.emit_expr(&e.then_expr);
                self.emit(
                    OpCode::Assign,
                    Some(then_value.clone()),
                    None,
                    Some(result.clone()),
                );
                self.release(&then_value);
                self.goto(&end_label);

                self.label(&else_label);
                let else_value = self.emit_expr(&e.else_expr);
                self.emit(
                    OpCode::Assign,
                    Some(else_value.clone()),
                    None,
                    Some(result.clone()),
                );
                self.release(&else_value);
                self.label(&end_label);

                result
            }
        }
    }

    /// `a && b` materializes 0/1 through explicit jumps; both operand
    /// values are computed into places before the tests.
    fn emit_logical_and(&mut self, e: &brioc_ast::BinaryExpr) -> Operand {
        let left = self.emit_expr(&e.left);
        let right = self.emit_expr(&e.right);

        let result = self.temps.new_temp();
        let false_label = self.new_label("Land_false_");
        let end_label = self.new_label("Land_end_");

        self.branch(OpCode::IfFalse, left.clone(), &false_label);
        self.release(&left);
        self.branch(OpCode::IfFalse, right.clone(), &false_label);
        self.release(&right);
        self.emit(OpCode::Assign, Some(Operand::Int(1)), None, Some(result.clone()));
        self.goto(&end_label);
        self.label(&false_label);
        self.emit(OpCode::Assign, Some(Operand::Int(0)), None, Some(result.clone()));
        self.label(&end_label);

        result
    }

    /// `a || b`, symmetric to `&&` with the constants reversed
    fn emit_logical_or(&mut self, e: &brioc_ast::BinaryExpr) -> Operand {
        let left = self.emit_expr(&e.left);
        let right = self.emit_expr(&e.right);

        let result = self.temps.new_temp();
        let true_label = self.new_label("Lor_true_");
        let end_label = self.new_label("Lor_end_");

        self.branch(OpCode::IfTrue, left.clone(), &true_label);
        self.release(&left);
        self.branch(OpCode::IfTrue, right.clone(), &true_label);
        self.release(&right);
        self.emit(OpCode::Assign, Some(Operand::Int(0)), None, Some(result.clone()));
        self.goto(&end_label);
        self.label(&true_label);
        self.emit(OpCode::Assign, Some(Operand::Int(1)), None, Some(result.clone()));
        self.label(&end_label);

        result
    }

    fn emit_call(&mut self, call: &CallExpr) -> Operand {
        // a plain function name is used directly; anything else (a method
        // load, a computed callee) is evaluated to a place first
        let callee = match &call.callee {
            Expr::Ident(e) => Operand::Name(e.name),
            other => self.emit_expr(other),
        };

        let arg_values: Vec<Operand> = call.args.iter().map(|a| self.emit_expr(a)).collect();
        for value in &arg_values {
            self.emit(OpCode::Param, Some(value.clone()), None, None);
            self.release(value);
        }

        let result = self.temps.new_temp();
        self.emit(
            OpCode::Call,
            Some(callee.clone()),
            Some(Operand::Int(call.args.len() as i64)),
            Some(result.clone()),
        );
        self.release(&callee);
        result
    }

    /// The `newarr` element tag, derived from the checked array type
    fn element_tag(&self, node: brioc_ast::NodeId) -> &'static str {
        match self.types.get(&node) {
            Some(Ty::Array { base, .. }) => match **base {
                Ty::Int => "int",
                Ty::Float => "float",
                Ty::Bool => "bool",
                Ty::String => "string",
                Ty::Class { .. } => "ref",
                _ => "any",
            },
            _ => "any",
        }
    }
}

fn binop_opcode(op: BinOp) -> OpCode {
    match op {
        BinOp::Add => OpCode::Add,
        BinOp::Sub => OpCode::Sub,
        BinOp::Mul => OpCode::Mul,
        BinOp::Div => OpCode::Div,
        BinOp::Mod => OpCode::Mod,
        BinOp::Lt => OpCode::Lt,
        BinOp::Le => OpCode::Le,
        BinOp::Gt => OpCode::Gt,
        BinOp::Ge => OpCode::Ge,
        BinOp::Eq => OpCode::Eq,
        BinOp::Ne => OpCode::Ne,
        BinOp::And | BinOp::Or => unreachable!("short-circuit operators lower through jumps"),
    }
}
