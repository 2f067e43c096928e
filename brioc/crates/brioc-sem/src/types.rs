//! The semantic type model.
//!
//! Types form a closed set: five primitive tags plus `Null`, multi-
//! dimensional arrays, and nominal class types. Primitive equality is tag
//! equality; two arrays are equal iff they share base and dimensions; class
//! types compare by the identity of the declaring class.
//!
//! `Null` doubles as the recovery type: expressions that already produced a
//! diagnostic get `Null` so downstream checks stay quiet, and unannotated
//! declarations carry `Null` until the checker infers their type.

use brioc_util::{define_idx, Symbol};
use std::fmt;

define_idx!(ClassId);

/// A type in the Brio type system
#[derive(Debug, Clone, PartialEq)]
pub enum Ty {
    Int,
    Float,
    Bool,
    String,
    Void,
    /// Null literal type, inference placeholder, and recovery type
    Null,
    /// Multi-dimensional array; `base` is never itself an array
    Array { base: Box<Ty>, dims: u32 },
    /// Nominal class type, compared by the declaring class' id
    Class { id: ClassId, name: Symbol },
}

impl Ty {
    /// Build an array type, flattening a nested array base
    ///
    /// `array(int[], 1)` yields `int[][]`; the base of an `Array` is always
    /// a scalar type and `dims` is at least 1.
    pub fn array(base: Ty, dims: u32) -> Ty {
        debug_assert!(dims >= 1);
        match base {
            Ty::Array {
                base: inner,
                dims: inner_dims,
            } => Ty::Array {
                base: inner,
                dims: inner_dims + dims,
            },
            scalar => Ty::Array {
                base: Box::new(scalar),
                dims,
            },
        }
    }

    /// Shorthand for a class type
    pub fn class(id: ClassId, name: Symbol) -> Ty {
        Ty::Class { id, name }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Ty::Int | Ty::Float)
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Ty::Array { .. })
    }

    pub fn is_class(&self) -> bool {
        matches!(self, Ty::Class { .. })
    }

    pub fn class_id(&self) -> Option<ClassId> {
        match self {
            Ty::Class { id, .. } => Some(*id),
            _ => None,
        }
    }

    /// The type of one indexing step into an array
    ///
    /// `int[][]` yields `int[]`, `int[]` yields `int`. Returns `None` for
    /// non-arrays.
    pub fn element_type(&self) -> Option<Ty> {
        match self {
            Ty::Array { base, dims } => {
                if *dims > 1 {
                    Some(Ty::Array {
                        base: base.clone(),
                        dims: dims - 1,
                    })
                } else {
                    Some((**base).clone())
                }
            }
            _ => None,
        }
    }
}

impl fmt::Display for Ty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Ty::Int => write!(f, "Int"),
            Ty::Float => write!(f, "Float"),
            Ty::Bool => write!(f, "Bool"),
            Ty::String => write!(f, "String"),
            Ty::Void => write!(f, "Void"),
            Ty::Null => write!(f, "Null"),
            Ty::Array { base, dims } => {
                write!(f, "{}", base)?;
                for _ in 0..*dims {
                    write!(f, "[]")?;
                }
                Ok(())
            }
            Ty::Class { name, .. } => write!(f, "{}", name),
        }
    }
}

/// Numeric unification: `Float` if either side is `Float` and both are
/// numeric, `Int` if both are `Int`, absent otherwise. Equal non-numeric
/// types unify to themselves.
pub fn unify_numeric(a: &Ty, b: &Ty) -> Option<Ty> {
    if a == b {
        return Some(a.clone());
    }
    if a.is_numeric() && b.is_numeric() {
        return Some(Ty::Float);
    }
    None
}
