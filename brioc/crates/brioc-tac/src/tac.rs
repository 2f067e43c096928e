//! Quadruple definitions.
//!
//! A quadruple is one IR instruction: an opcode, up to two operands and an
//! optional result/destination. The serialized shape is the external
//! contract: `{ id, op, arg1?, arg2?, result? }` with operand values as
//! primitive literals or identifier strings.

use brioc_util::Symbol;
use serde::ser::SerializeStruct;
use serde::{Serialize, Serializer};
use std::fmt;

/// The closed opcode set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    /// `=` assign
    Assign,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Lt,
    Le,
    Gt,
    Ge,
    Eq,
    Ne,
    /// logical negation
    Not,
    /// define label
    Label,
    /// unconditional branch
    Goto,
    /// branch if nonzero
    IfTrue,
    /// branch if zero
    IfFalse,
    /// call argument push, or a formal's name in a function prologue
    Param,
    /// call, receive return value
    Call,
    Return,
    /// allocate array
    NewArr,
    /// `[]` load element
    IndexGet,
    /// `[]=` store element
    IndexSet,
    /// construct object
    New,
    /// load member
    GetProp,
    /// store member
    SetProp,
    /// class region markers
    Class,
    EndClass,
    /// function region end marker
    EndFunc,
    /// install exception handler
    TryBegin,
    /// uninstall exception handler
    TryEnd,
    /// builtin output
    Print,
}

impl OpCode {
    pub fn as_str(self) -> &'static str {
        match self {
            OpCode::Assign => "=",
            OpCode::Add => "+",
            OpCode::Sub => "-",
            OpCode::Mul => "*",
            OpCode::Div => "/",
            OpCode::Mod => "%",
            OpCode::Lt => "<",
            OpCode::Le => "<=",
            OpCode::Gt => ">",
            OpCode::Ge => ">=",
            OpCode::Eq => "==",
            OpCode::Ne => "!=",
            OpCode::Not => "not",
            OpCode::Label => "label",
            OpCode::Goto => "goto",
            OpCode::IfTrue => "ifTrue",
            OpCode::IfFalse => "ifFalse",
            OpCode::Param => "param",
            OpCode::Call => "call",
            OpCode::Return => "return",
            OpCode::NewArr => "newarr",
            OpCode::IndexGet => "[]",
            OpCode::IndexSet => "[]=",
            OpCode::New => "new",
            OpCode::GetProp => "getprop",
            OpCode::SetProp => "setprop",
            OpCode::Class => "class",
            OpCode::EndClass => "endclass",
            OpCode::EndFunc => "endfunc",
            OpCode::TryBegin => "trybegin",
            OpCode::TryEnd => "tryend",
            OpCode::Print => "print",
        }
    }
}

impl fmt::Display for OpCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Serialize for OpCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A quadruple operand: a literal, a named place, a temporary or a label
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Int(i64),
    Float(f64),
    /// String literal content, displayed and serialized with its quotes
    Str(String),
    /// Null marker
    Null,
    /// Named identifier: variable, parameter, function, class or property
    Name(Symbol),
    /// Temporary place `t<seq>`
    Temp(u32),
    /// Label name referenced by jumps and markers
    Label(String),
}

impl Operand {
    pub fn is_temp(&self) -> bool {
        matches!(self, Operand::Temp(_))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Int(v) => write!(f, "{}", v),
            Operand::Float(v) => write!(f, "{}", v),
            Operand::Str(s) => write!(f, "\"{}\"", s),
            Operand::Null => write!(f, "null"),
            Operand::Name(n) => write!(f, "{}", n),
            Operand::Temp(n) => write!(f, "t{}", n),
            Operand::Label(l) => write!(f, "{}", l),
        }
    }
}

impl Serialize for Operand {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Operand::Int(v) => serializer.serialize_i64(*v),
            Operand::Float(v) => serializer.serialize_f64(*v),
            Operand::Str(s) => serializer.serialize_str(&format!("\"{}\"", s)),
            Operand::Null => serializer.serialize_str("null"),
            Operand::Name(n) => serializer.serialize_str(n.as_str()),
            Operand::Temp(n) => serializer.serialize_str(&format!("t{}", n)),
            Operand::Label(l) => serializer.serialize_str(l),
        }
    }
}

/// One IR instruction
#[derive(Debug, Clone, PartialEq)]
pub struct Quad {
    pub id: u32,
    pub op: OpCode,
    pub arg1: Option<Operand>,
    pub arg2: Option<Operand>,
    pub result: Option<Operand>,
}

impl fmt::Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:>4}: {}", self.id, self.op)?;
        if let Some(arg1) = &self.arg1 {
            write!(f, " {}", arg1)?;
        }
        if let Some(arg2) = &self.arg2 {
            write!(f, ", {}", arg2)?;
        }
        if let Some(result) = &self.result {
            write!(f, " -> {}", result)?;
        }
        Ok(())
    }
}

impl Serialize for Quad {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let fields = 2
            + usize::from(self.arg1.is_some())
            + usize::from(self.arg2.is_some())
            + usize::from(self.result.is_some());
        let mut s = serializer.serialize_struct("Quad", fields)?;
        s.serialize_field("id", &self.id)?;
        s.serialize_field("op", &self.op)?;
        if let Some(arg1) = &self.arg1 {
            s.serialize_field("arg1", arg1)?;
        }
        if let Some(arg2) = &self.arg2 {
            s.serialize_field("arg2", arg2)?;
        }
        if let Some(result) = &self.result {
            s.serialize_field("result", result)?;
        }
        s.end()
    }
}
