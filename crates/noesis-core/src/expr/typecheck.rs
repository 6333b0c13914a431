//! Bidirectional type checker for the expression kernel

use super::term::{sufficient_reason_is_well_formed, Expr};
use crate::value::Type;
use std::collections::HashMap;
use thiserror::Error;

/// A typing environment: variable name -> declared type.
#[derive(Debug, Clone, Default)]
pub struct TypeEnv(HashMap<String, Type>);

impl TypeEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.0.insert(name.into(), ty);
        self
    }

    pub fn get(&self, name: &str) -> Option<&Type> {
        self.0.get(name)
    }
}

/// A type error, carrying the offending subterm for diagnostics.
#[derive(Debug, Clone, Error)]
pub enum TypeError {
    #[error("expected a function type, got {actual} in {offending}")]
    NotAFunction { actual: Type, offending: String },

    #[error("argument type mismatch: expected {expected}, got {actual} in {offending}")]
    ArgumentMismatch {
        expected: Type,
        actual: Type,
        offending: String,
    },

    #[error("ill-formed sufficient-reason term: {offending}")]
    IllFormedSufficientReason { offending: String },
}

/// Type-check `expr` against `env`.
pub fn type_check(expr: &Expr, env: &TypeEnv) -> Result<Type, TypeError> {
    match expr {
        Expr::Variable { name, ty } => match env.get(name) {
            // Environment binding wins (reflects shadowing introduced by
            // enclosing abstractions); otherwise fall back to the
            // variable's own annotation.
            Some(env_ty) => Ok(env_ty.clone()),
            None => Ok(ty.clone()),
        },

        Expr::Value { ty, .. } => Ok(ty.clone()),

        Expr::Abstraction { name, bound_ty, body } => {
            let inner_env = env.clone().with(name.clone(), bound_ty.clone());
            let body_ty = type_check(body, &inner_env)?;
            Ok(Type::func(bound_ty.clone(), body_ty))
        }

        Expr::Application { func, arg } => {
            let func_ty = type_check(func, env)?;
            let (domain, codomain) = func_ty.as_function().ok_or_else(|| TypeError::NotAFunction {
                actual: func_ty.clone(),
                offending: format!("{func:?}"),
            })?;
            let arg_ty = type_check(arg, env)?;
            if *domain != arg_ty {
                return Err(TypeError::ArgumentMismatch {
                    expected: domain.clone(),
                    actual: arg_ty,
                    offending: format!("{arg:?}"),
                });
            }
            Ok(codomain.clone())
        }

        Expr::SufficientReason { source, target, value } => {
            if !sufficient_reason_is_well_formed(*source, *target, *value) {
                return Err(TypeError::IllFormedSufficientReason {
                    offending: format!("{expr:?}"),
                });
            }
            Ok(Type::func(Type::base(*source), Type::base(*target)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::BaseType;

    #[test]
    fn variable_falls_back_to_its_own_annotation_outside_any_binder() {
        let expr = Expr::var("x", Type::base(BaseType::Prop));
        let env = TypeEnv::new();
        assert_eq!(type_check(&expr, &env).unwrap(), Type::base(BaseType::Prop));
    }

    #[test]
    fn environment_binding_shadows_the_variable_s_own_annotation() {
        let expr = Expr::var("x", Type::base(BaseType::Prop));
        let env = TypeEnv::new().with("x", Type::base(BaseType::Existence));
        assert_eq!(type_check(&expr, &env).unwrap(), Type::base(BaseType::Existence));
    }

    #[test]
    fn abstraction_introduces_arrow_type() {
        let expr = Expr::abs(
            "x",
            Type::base(BaseType::Prop),
            Expr::var("x", Type::base(BaseType::Prop)),
        );
        let ty = type_check(&expr, &TypeEnv::new()).unwrap();
        assert_eq!(ty, Type::func(Type::base(BaseType::Prop), Type::base(BaseType::Prop)));
    }

    #[test]
    fn application_requires_matching_argument_type() {
        let identity = Expr::abs(
            "x",
            Type::base(BaseType::Prop),
            Expr::var("x", Type::base(BaseType::Prop)),
        );
        let bad_arg = Expr::value("3", Type::base(BaseType::Existence));
        let applied = Expr::app(identity, bad_arg);
        assert!(matches!(
            type_check(&applied, &TypeEnv::new()),
            Err(TypeError::ArgumentMismatch { .. })
        ));
    }

    #[test]
    fn sufficient_reason_yields_function_type() {
        let sr = Expr::sufficient_reason(BaseType::Existence, BaseType::Goodness, 3);
        let ty = type_check(&sr, &TypeEnv::new()).unwrap();
        assert_eq!(ty, Type::func(Type::base(BaseType::Existence), Type::base(BaseType::Goodness)));
    }

    #[test]
    fn ill_formed_sufficient_reason_is_rejected() {
        let sr = Expr::sufficient_reason(BaseType::Existence, BaseType::Truth, 1);
        assert!(matches!(
            type_check(&sr, &TypeEnv::new()),
            Err(TypeError::IllFormedSufficientReason { .. })
        ));
    }

    #[test]
    fn subject_reduction_holds_for_applied_identity() {
        // typeof(identity applied to a well-typed argument) == typeof(argument)
        let identity = Expr::abs(
            "x",
            Type::base(BaseType::Truth),
            Expr::var("x", Type::base(BaseType::Truth)),
        );
        let arg = Expr::value("v", Type::base(BaseType::Truth));
        let applied = Expr::app(identity, arg);
        let ty = type_check(&applied, &TypeEnv::new()).unwrap();
        assert_eq!(ty, Type::base(BaseType::Truth));
    }
}
