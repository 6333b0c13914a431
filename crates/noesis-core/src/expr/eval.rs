//! Call-by-value evaluator for the expression kernel
//!
//! Capture-avoiding substitution over the tagged [`Expr`] sum, bounded by a
//! caller-supplied fuel budget so a divergent reduction (e.g. an
//! applied self-application) terminates with an error rather than looping
//! forever.

use super::term::Expr;
use crate::value::{BaseType, Type};
use thiserror::Error;

/// Errors raised during evaluation.
#[derive(Debug, Clone, Error)]
pub enum EvalError {
    #[error("evaluation did not terminate within {0} reduction steps")]
    FuelExhausted(u32),

    #[error("applied a non-function value: {0:?}")]
    NotApplicable(Expr),
}

/// Evaluate `expr` to weak-head normal form under call-by-value, spending at
/// most `fuel` reduction steps. Each application that actually reduces
/// (substitutes or rewrites via a truth-table rule) costs one unit of fuel;
/// expressions already in WHNF cost nothing.
pub fn evaluate(expr: &Expr, fuel: u32) -> Result<Expr, EvalError> {
    let mut current = expr.clone();
    let mut remaining = fuel;

    loop {
        match step(&current)? {
            Some(next) => {
                if remaining == 0 {
                    return Err(EvalError::FuelExhausted(fuel));
                }
                remaining -= 1;
                current = next;
            }
            None => return Ok(current),
        }
    }
}

/// Perform a single reduction step, or `None` if `expr` is already
/// irreducible: a WHNF, or a "stuck" application (e.g. a partially applied
/// operator, or an operator applied to a non-constant argument).
fn step(expr: &Expr) -> Result<Option<Expr>, EvalError> {
    match expr {
        Expr::Variable { .. } | Expr::Value { .. } | Expr::Abstraction { .. } | Expr::SufficientReason { .. } => {
            Ok(None)
        }

        Expr::Application { func, arg } => {
            if let Some(reduced) = step(func)? {
                return Ok(Some(Expr::app(reduced, (**arg).clone())));
            }
            if let Some(reduced) = step(arg)? {
                return Ok(Some(Expr::app((**func).clone(), reduced)));
            }
            // Both sides are now irreducible; try to fire this application
            // as a redex.
            reduce_redex(func, arg)
        }
    }
}

/// `func` and `arg` are both irreducible. Fire the application if it is a
/// beta-redex (abstraction applied to an argument) or a saturated
/// truth-table operator; otherwise this is a stuck (possibly partial)
/// application and there is nothing left to do.
fn reduce_redex(func: &Expr, arg: &Expr) -> Result<Option<Expr>, EvalError> {
    if let Expr::Abstraction { name, body, .. } = func {
        return Ok(Some(substitute(body, name, arg)));
    }
    if let Some(result) = reduce_truth_table(func, arg) {
        return result.map(Some);
    }
    if let Expr::Value { ty: Type::Base(_), .. } = func {
        return Err(EvalError::NotApplicable(func.clone()));
    }
    Ok(None)
}

/// Substitute `value` for every free occurrence of `name` in `body`,
/// respecting shadowing: substitution does not descend past a binder that
/// re-introduces `name`, and never captures a free variable of `value`
/// because `value` is always in WHNF here (closed, or itself already
/// substituted) before it is ever spliced in.
fn substitute(body: &Expr, name: &str, value: &Expr) -> Expr {
    match body {
        Expr::Variable { name: var_name, .. } if var_name == name => value.clone(),
        Expr::Variable { .. } | Expr::Value { .. } | Expr::SufficientReason { .. } => body.clone(),

        Expr::Abstraction { name: bound, bound_ty, body: inner } => {
            if bound == name {
                // `name` is rebound here; occurrences inside are a distinct
                // variable and must not be touched.
                body.clone()
            } else {
                Expr::abs(bound.clone(), bound_ty.clone(), substitute(inner, name, value))
            }
        }

        Expr::Application { func, arg } => Expr::app(
            substitute(func, name, value),
            substitute(arg, name, value),
        ),
    }
}

/// The classical truth-table reductions over `Prop`: `NOT`, `AND`, `OR`,
/// `IMPLIES`, `EQ`, modeled as curried `SufficientReason`-shaped operator
/// values tagged by `symbol`. Returns `None` if `func` is not one of these
/// operators (in which case ordinary application/partial-application rules
/// apply); `Some(Err(..))` only if a recognized operator is fully applied to
/// non-constant arguments.
fn reduce_truth_table(func: &Expr, arg: &Expr) -> Option<Result<Expr, EvalError>> {
    let (op, applied) = match func {
        Expr::Application { func: inner_func, arg: first_arg } => match inner_func.as_ref() {
            Expr::Value { symbol, ty: Type::Function { .. } } if is_binary_op(symbol) => {
                (symbol.as_str(), vec![(**first_arg).clone(), arg.clone()])
            }
            _ => return None,
        },
        Expr::Value { symbol, ty: Type::Function { .. } } if is_unary_op(symbol) => {
            (symbol.as_str(), vec![arg.clone()])
        }
        _ => return None,
    };

    let bools: Option<Vec<bool>> = applied.iter().map(Expr::as_truth_constant).collect();
    let bools = match bools {
        Some(b) => b,
        // Not yet fully applied to constants: leave as a (possibly partial)
        // application for the caller to keep reducing its arguments, or this
        // is genuinely stuck (a free variable standing in for a Prop).
        None => return None,
    };

    let result = match (op, bools.as_slice()) {
        ("NOT", [a]) => !a,
        ("AND", [a, b]) => *a && *b,
        ("OR", [a, b]) => *a || *b,
        ("IMPLIES", [a, b]) => !a || *b,
        ("EQ", [a, b]) => a == b,
        _ => return Some(Err(EvalError::NotApplicable(func.clone()))),
    };

    Some(Ok(truth_constant(result)))
}

fn is_unary_op(symbol: &str) -> bool {
    symbol == "NOT"
}

fn is_binary_op(symbol: &str) -> bool {
    matches!(symbol, "AND" | "OR" | "IMPLIES" | "EQ")
}

fn truth_constant(value: bool) -> Expr {
    let symbol = if value { "TrueProp" } else { "FalseProp" };
    Expr::value(symbol, Type::base(BaseType::Prop))
}

/// A truth-value operator as a curried function value, for building
/// `NOT x`, `AND x y`, and friends in test and service code.
pub fn truth_operator(symbol: &str) -> Expr {
    let prop = Type::base(BaseType::Prop);
    let ty = if is_unary_op(symbol) {
        Type::func(prop.clone(), prop)
    } else {
        Type::func(prop.clone(), Type::func(prop.clone(), prop))
    };
    Expr::value(symbol, ty)
}

/// `TrueProp` as an [`Expr`].
pub fn true_prop() -> Expr {
    truth_constant(true)
}

/// `FalseProp` as an [`Expr`].
pub fn false_prop() -> Expr {
    truth_constant(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::BaseType;

    #[test]
    fn identity_applied_to_a_value_reduces_to_that_value() {
        let identity = Expr::abs(
            "x",
            Type::base(BaseType::Truth),
            Expr::var("x", Type::base(BaseType::Truth)),
        );
        let arg = Expr::value("v", Type::base(BaseType::Truth));
        let applied = Expr::app(identity, arg.clone());
        assert_eq!(evaluate(&applied, 10).unwrap(), arg);
    }

    #[test]
    fn substitution_respects_shadowing() {
        // (\x. \x. x) applied to `a` should leave the inner `x` untouched,
        // reducing to `\x. x`, not to `a`.
        let inner = Expr::abs("x", Type::base(BaseType::Prop), Expr::var("x", Type::base(BaseType::Prop)));
        let outer = Expr::abs("x", Type::base(BaseType::Prop), inner.clone());
        let arg = Expr::value("a", Type::base(BaseType::Prop));
        let applied = Expr::app(outer, arg);
        assert_eq!(evaluate(&applied, 10).unwrap(), inner);
    }

    #[test]
    fn fuel_exhaustion_is_reported() {
        // (\x. x x) (\x. x x) never reaches WHNF.
        let omega_body = |x: Expr| Expr::app(x.clone(), x);
        let omega = Expr::abs(
            "x",
            Type::func(Type::base(BaseType::Prop), Type::base(BaseType::Prop)),
            omega_body(Expr::var("x", Type::func(Type::base(BaseType::Prop), Type::base(BaseType::Prop)))),
        );
        let applied = Expr::app(omega.clone(), omega);
        assert!(matches!(evaluate(&applied, 50), Err(EvalError::FuelExhausted(50))));
    }

    #[test]
    fn not_true_is_false() {
        let expr = Expr::app(truth_operator("NOT"), true_prop());
        assert_eq!(evaluate(&expr, 5).unwrap(), false_prop());
    }

    #[test]
    fn and_is_curried_and_short_circuits_on_constants_only() {
        let expr = Expr::app(Expr::app(truth_operator("AND"), true_prop()), false_prop());
        assert_eq!(evaluate(&expr, 5).unwrap(), false_prop());
    }

    #[test]
    fn implies_matches_classical_truth_table() {
        let cases = [
            (false, false, true),
            (false, true, true),
            (true, false, false),
            (true, true, true),
        ];
        for (a, b, expected) in cases {
            let lhs = if a { true_prop() } else { false_prop() };
            let rhs = if b { true_prop() } else { false_prop() };
            let expr = Expr::app(Expr::app(truth_operator("IMPLIES"), lhs), rhs);
            let want = if expected { true_prop() } else { false_prop() };
            assert_eq!(evaluate(&expr, 5).unwrap(), want);
        }
    }

    #[test]
    fn eq_on_props_is_boolean_equality() {
        let expr = Expr::app(Expr::app(truth_operator("EQ"), true_prop()), true_prop());
        assert_eq!(evaluate(&expr, 5).unwrap(), true_prop());
    }

    #[test]
    fn partially_applied_and_stays_stuck_unreduced() {
        let partial = Expr::app(truth_operator("AND"), true_prop());
        let result = evaluate(&partial, 5).unwrap();
        assert_eq!(result, partial);
    }

    #[test]
    fn sufficient_reason_applied_to_a_value_is_stuck_unreduced() {
        let sr = Expr::sufficient_reason(BaseType::Existence, BaseType::Goodness, 3);
        let arg = Expr::value("e", Type::base(BaseType::Existence));
        let applied = Expr::app(sr, arg);
        let result = evaluate(&applied, 5).unwrap();
        assert_eq!(result, applied);
    }
}
