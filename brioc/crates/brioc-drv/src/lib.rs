//! brioc-drv - Pipeline Driver
//!
//! Runs the three passes in order over an already-parsed syntax tree and
//! packages their outputs:
//!
//! ```text
//! Program ──► [Scope Builder] ──► SymbolTable + diagnostics
//!         ──► [Type Checker]  ──► TypeMap     + diagnostics
//!         ──► [TAC Emitter]   ──► Quadruples
//! ```
//!
//! The driver also builds the JSON dumps that form the external output
//! contract: the scope tree with its symbols, the quadruple stream, and
//! the positioned diagnostics. Nothing is persisted; all outputs are
//! in-memory values handed to the caller.

use brioc_ast::Program;
use brioc_sem::{checker::TypeMap, ScopeBuilder, SymbolKind, SymbolTable, TypeChecker};
use brioc_tac::{Emitter, Quad};
use brioc_util::{Diagnostic, Handler};
use serde::Serialize;
use tracing::debug_span;

/// Everything one compilation produces
pub struct Analysis {
    pub table: SymbolTable,
    pub types: TypeMap,
    pub diagnostics: Vec<Diagnostic>,
    pub quads: Vec<Quad>,
}

impl Analysis {
    /// Exit-code semantics: success iff there are no diagnostics
    pub fn is_clean(&self) -> bool {
        self.diagnostics.is_empty()
    }
}

/// Run scope building, type checking and TAC emission over a program
///
/// Diagnostics come out in pass order (scope, then types); within a pass
/// they follow source order. The emitter runs even when diagnostics exist
/// so partial TAC is available.
pub fn compile(program: &Program) -> Analysis {
    let handler = Handler::new();

    let mut table = {
        let _span = debug_span!("scope_builder").entered();
        ScopeBuilder::build(program, &handler)
    };
    let types = {
        let _span = debug_span!("type_checker").entered();
        TypeChecker::check(program, &mut table, &handler)
    };
    let quads = {
        let _span = debug_span!("tac_emitter").entered();
        Emitter::generate(program, &types)
    };

    Analysis {
        table,
        types,
        diagnostics: handler.diagnostics(),
        quads,
    }
}

/// One scope in the symbol-table dump
#[derive(Debug, Serialize)]
pub struct ScopeDump {
    pub id: String,
    pub name: String,
    pub symbols: Vec<SymbolDump>,
    pub children: Vec<ScopeDump>,
}

/// One symbol in the dump, with a kind-dependent payload
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum SymbolDump {
    Var {
        kind: &'static str,
        name: String,
        #[serde(rename = "type")]
        ty: String,
    },
    Func {
        kind: &'static str,
        name: String,
        #[serde(rename = "returnType")]
        return_type: String,
        params: Vec<ParamDump>,
    },
    Class {
        kind: &'static str,
        name: String,
        #[serde(rename = "super")]
        superclass: Option<String>,
    },
}

/// A function parameter in the dump
#[derive(Debug, Serialize)]
pub struct ParamDump {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

/// Build the symbol-table dump: a tree rooted at the global scope
///
/// Scope ids follow arena order (`sc_0` is global), children follow
/// creation order, symbols follow declaration order; the result is
/// deterministic for a given program.
pub fn symbol_table_dump(table: &SymbolTable) -> ScopeDump {
    dump_scope(table, table.global)
}

fn dump_scope(table: &SymbolTable, scope_id: brioc_sem::ScopeId) -> ScopeDump {
    let scope = &table.scopes[scope_id];

    let symbols = scope
        .symbols
        .values()
        .map(|sym_id| dump_symbol(table, *sym_id))
        .collect();

    let children = table
        .scopes
        .iter_enumerated()
        .filter(|(_, s)| s.parent == Some(scope_id))
        .map(|(child_id, _)| dump_scope(table, child_id))
        .collect();

    ScopeDump {
        id: format!("sc_{}", scope_id.0),
        name: scope.name.clone(),
        symbols,
        children,
    }
}

fn dump_symbol(table: &SymbolTable, sym_id: brioc_sem::SymbolId) -> SymbolDump {
    let info = table.symbol(sym_id);
    match &info.kind {
        SymbolKind::Var { ty, is_const } => SymbolDump::Var {
            kind: if *is_const { "const" } else { "var" },
            name: info.name.to_string(),
            ty: ty.to_string(),
        },
        SymbolKind::Func { ret, params } => SymbolDump::Func {
            kind: "func",
            name: info.name.to_string(),
            return_type: ret.to_string(),
            params: params
                .iter()
                .map(|param_id| {
                    let param = table.symbol(*param_id);
                    ParamDump {
                        name: param.name.to_string(),
                        ty: param.value_ty(table).to_string(),
                    }
                })
                .collect(),
        },
        SymbolKind::Class(class_id) => SymbolDump::Class {
            kind: "class",
            name: info.name.to_string(),
            superclass: table.classes[*class_id]
                .superclass
                .map(|sup| table.classes[sup].name.to_string()),
        },
    }
}
