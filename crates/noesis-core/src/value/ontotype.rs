//! Ontological type tags for the expression kernel
//!
//! One of `{Existence, Goodness, Truth, Prop}`, plus function types formed
//! recursively as `(domain: tag, codomain: tag | function-type)`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A primitive ontological type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BaseType {
    Existence,
    Goodness,
    Truth,
    Prop,
}

impl fmt::Display for BaseType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BaseType::Existence => "Existence",
            BaseType::Goodness => "Goodness",
            BaseType::Truth => "Truth",
            BaseType::Prop => "Prop",
        };
        write!(f, "{s}")
    }
}

/// A type in the kernel's type system: either a base tag or a function type
/// `domain -> codomain`, built up recursively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Type {
    Base(BaseType),
    Function {
        domain: Box<Type>,
        codomain: Box<Type>,
    },
}

impl Type {
    /// Construct a base type.
    pub fn base(tag: BaseType) -> Self {
        Type::Base(tag)
    }

    /// Construct a function type `domain -> codomain`.
    pub fn func(domain: Type, codomain: Type) -> Self {
        Type::Function {
            domain: Box::new(domain),
            codomain: Box::new(codomain),
        }
    }

    /// `Some((domain, codomain))` if this is a function type.
    pub fn as_function(&self) -> Option<(&Type, &Type)> {
        match self {
            Type::Function { domain, codomain } => Some((domain, codomain)),
            Type::Base(_) => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Base(tag) => write!(f, "{tag}"),
            Type::Function { domain, codomain } => write!(f, "{domain} -> {codomain}"),
        }
    }
}
