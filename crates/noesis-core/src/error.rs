//! Engine-wide error taxonomy
//!
//! A single closed enumeration at the public boundary (`KnowledgeService`).
//! Lower layers keep narrower error types (`StoreError`, `KdTreeError`,
//! `TypeError`, `EvalError`) and convert into this one at the façade.

use thiserror::Error;

/// Top-level error returned by `KnowledgeService` operations.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum EngineError {
    /// Referenced node does not exist.
    #[error("unknown node: {0}")]
    UnknownNode(String),

    /// One or both relation endpoints do not exist.
    #[error("missing relation endpoint: {0}")]
    MissingEndpoint(String),

    /// Argument out of its documented domain (negative k, out-of-range component, ...).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Expression failed to type-check.
    #[error("type error: {0}")]
    TypeError(String),

    /// Beta-reduction exhausted its fuel budget before reaching normal form.
    #[error("evaluation timeout: fuel exhausted after {0} steps")]
    EvaluationTimeout(u32),

    /// A caller-supplied deadline elapsed before the operation completed.
    #[error("operation timed out")]
    Timeout,

    /// A caller-supplied step budget was exhausted (store scans, searches).
    #[error("fuel exhausted")]
    FuelExhausted,

    /// Persistent-store initialization failed; the service is running in
    /// ephemeral mode. Logged, not fatal — callers may ignore this variant
    /// if they only care that the operation itself completed.
    #[error("store unavailable, running ephemeral: {0}")]
    StoreUnavailable(String),

    /// Operation attempted after `shutdown()`.
    #[error("service is closed")]
    ServiceClosed,

    /// A persisted blob failed to deserialize; treated as absent.
    #[error("corrupted record: {0}")]
    Corrupted(String),

    /// The attached capability token is missing or expired.
    #[error("invalid or expired capability token")]
    Unauthorized,
}

/// Convenience result alias for service-level operations.
pub type Result<T> = std::result::Result<T, EngineError>;

impl From<crate::storage::StoreError> for EngineError {
    fn from(err: crate::storage::StoreError) -> Self {
        use crate::storage::StoreError as SE;
        match err {
            SE::NotFound(id) => EngineError::UnknownNode(id),
            SE::MissingEndpoint(id) => EngineError::MissingEndpoint(id),
            SE::Corrupted(id, source) => EngineError::Corrupted(format!("{id}: {source}")),
            SE::Database(e) => EngineError::StoreUnavailable(e.to_string()),
            SE::Io(e) => EngineError::StoreUnavailable(e.to_string()),
            SE::Init(msg) => EngineError::StoreUnavailable(msg),
        }
    }
}

impl From<crate::expr::TypeError> for EngineError {
    fn from(err: crate::expr::TypeError) -> Self {
        EngineError::TypeError(err.to_string())
    }
}

impl From<crate::expr::EvalError> for EngineError {
    fn from(err: crate::expr::EvalError) -> Self {
        match err {
            crate::expr::EvalError::FuelExhausted(steps) => EngineError::EvaluationTimeout(steps),
            crate::expr::EvalError::NotApplicable(expr) => EngineError::TypeError(format!("applied a non-function value: {expr:?}")),
        }
    }
}
