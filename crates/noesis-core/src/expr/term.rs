//! Expression kernel - term syntax
//!
//! A single tagged sum type over the five term forms (`Variable`, `Value`,
//! `Abstraction`, `Application`, `SufficientReason`) rather than a class
//! hierarchy with a dispatcher: matching on the tag is exhaustive and needs
//! no reflective lookup.

use crate::value::{BaseType, Type};
use serde::{Deserialize, Serialize};

/// A well-formed (source, target, value) triple for `SufficientReason`:
/// `(Existence, Goodness, 3)` or `(Goodness, Truth, 2)`.
pub fn sufficient_reason_is_well_formed(source: BaseType, target: BaseType, value: i64) -> bool {
    matches!(
        (source, target, value),
        (BaseType::Existence, BaseType::Goodness, 3) | (BaseType::Goodness, BaseType::Truth, 2)
    )
}

/// A typed expression in the applied lambda calculus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    /// A free or bound variable with its declared type.
    Variable { name: String, ty: Type },
    /// A concrete value (e.g. a truth-value constant) with its type.
    Value { symbol: String, ty: Type },
    /// `\x:ty. body` - binds `name` of type `bound_ty` in `body`.
    Abstraction {
        name: String,
        bound_ty: Type,
        body: Box<Expr>,
    },
    /// Function application `func(arg)`.
    Application { func: Box<Expr>, arg: Box<Expr> },
    /// The sufficient-reason primitive, well-formed only for two specific
    /// (source, target, value) triples — see [`sufficient_reason_is_well_formed`].
    SufficientReason {
        source: BaseType,
        target: BaseType,
        value: i64,
    },
}

impl Expr {
    pub fn var(name: impl Into<String>, ty: Type) -> Self {
        Expr::Variable { name: name.into(), ty }
    }

    pub fn value(symbol: impl Into<String>, ty: Type) -> Self {
        Expr::Value { symbol: symbol.into(), ty }
    }

    pub fn abs(name: impl Into<String>, bound_ty: Type, body: Expr) -> Self {
        Expr::Abstraction {
            name: name.into(),
            bound_ty,
            body: Box::new(body),
        }
    }

    pub fn app(func: Expr, arg: Expr) -> Self {
        Expr::Application {
            func: Box::new(func),
            arg: Box::new(arg),
        }
    }

    pub fn sufficient_reason(source: BaseType, target: BaseType, value: i64) -> Self {
        Expr::SufficientReason { source, target, value }
    }

    /// True for the two truth-value constants that participate in the
    /// classical truth-table reductions over `Prop`.
    pub fn as_truth_constant(&self) -> Option<bool> {
        match self {
            Expr::Value { symbol, ty: Type::Base(BaseType::Prop) } if symbol == "TrueProp" => Some(true),
            Expr::Value { symbol, ty: Type::Base(BaseType::Prop) } if symbol == "FalseProp" => Some(false),
            _ => None,
        }
    }

    /// True iff this expression is a weak-head normal form: a value,
    /// variable, abstraction, or (partially applied) sufficient-reason
    /// operator/constant that cannot reduce further.
    pub fn is_whnf(&self) -> bool {
        matches!(
            self,
            Expr::Value { .. } | Expr::Variable { .. } | Expr::Abstraction { .. } | Expr::SufficientReason { .. }
        )
    }
}
