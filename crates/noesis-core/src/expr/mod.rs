//! Typed applied lambda calculus: term syntax, a bidirectional type
//! checker, and a fuel-bounded call-by-value evaluator.

mod eval;
mod term;
mod typecheck;

pub use eval::{evaluate, false_prop, true_prop, truth_operator, EvalError};
pub use term::{sufficient_reason_is_well_formed, Expr};
pub use typecheck::{type_check, TypeEnv, TypeError};
