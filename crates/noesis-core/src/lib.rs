//! # Noesis Core
//!
//! An ontological knowledge engine: queries are mapped into a trinity
//! vector (existence, goodness, truth), positioned on the complex plane by
//! an escape-time iteration, classified into a modal status, and stored as
//! nodes and typed relations in a persistent, spatially-indexed knowledge
//! base.
//!
//! - **Value types**: [`TrinityVector`], [`FractalPosition`], [`Type`], [`ModalStatus`]
//! - **Expression kernel**: a typed applied lambda calculus over ontological
//!   types, with a bidirectional type checker and a fuel-bounded
//!   call-by-value evaluator (see [`expr`]).
//! - **Escape-time positioner**: [`fractal::position_of`] iterates
//!   `z <- z^2 + c` to produce a [`FractalPosition`].
//! - **Modal classifier**: [`modal::classify`] maps a trinity vector to one
//!   of four modal statuses plus a coherence scalar.
//! - **Spatial indices**: an exact k-d tree (see [`index`]) over both the
//!   trinity vector and the complex-plane position.
//! - **Node cache** and **persistent store**: see [`cache`] and [`storage`].
//! - **Knowledge service**: [`KnowledgeService`], the public façade.
//!
//! ## Quick start
//!
//! ```
//! use noesis_core::{Capability, EngineConfig, KnowledgeService, PositionInput, TrinityVector};
//! use chrono::Duration;
//!
//! let service = KnowledgeService::open(EngineConfig {
//!     persistence_enabled: false,
//!     ..EngineConfig::default()
//! });
//! let cap = Capability::issue(Duration::minutes(5));
//!
//! let node = service
//!     .create_node(&cap, "is mercy good?", TrinityVector::new(0.8, 0.7, 0.9), PositionInput::Derive, None, None)
//!     .unwrap();
//! assert_eq!(node.payload().get("modal_status").unwrap(), "Actual");
//! ```

pub mod cache;
pub mod config;
pub mod error;
pub mod expr;
pub mod fractal;
pub mod index;
pub mod modal;
pub mod node;
pub mod service;
pub mod storage;
pub mod value;

pub use cache::NodeCache;
pub use config::{ConfigError, EngineConfig};
pub use error::{EngineError, Result};
pub use expr::{evaluate, type_check, EvalError, Expr, TypeEnv, TypeError};
pub use fractal::{position_from_complex, position_of, position_of_default};
pub use index::{PositionIndex, TrinityIndex};
pub use modal::classify;
pub use node::{Direction, OntologicalNode, Relation};
pub use service::{Capability, KnowledgeService, PositionInput};
pub use storage::{Store, StoreError};
pub use value::{BaseType, FractalPosition, ModalStatus, TrinityVector, Type};

/// Crate version, as declared in `Cargo.toml`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convenience re-exports for the common path: open a service, issue a
/// capability, create and query nodes.
pub mod prelude {
    pub use crate::{
        Capability, Direction, EngineConfig, EngineError, KnowledgeService, OntologicalNode, PositionInput, Relation,
        TrinityVector,
    };
}
