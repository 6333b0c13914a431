//! Value types - trinity vector, fractal position, ontological type tag,
//! modal status
//!
//! Plain, structurally-comparable data. Construction enforces invariants
//! (trinity components are clamped); nothing here performs I/O.

mod modal;
mod ontotype;
mod position;
mod trinity;

pub use modal::ModalStatus;
pub use ontotype::{BaseType, Type};
pub use position::FractalPosition;
pub use trinity::TrinityVector;
