//! Modal classifier
//!
//! Deterministic function mapping a trinity vector to `(status, coherence)`.
//! Necessity gates on truth, existence, and coherence all clearing a high
//! bar; actuality on a simple majority split; possibility on a low floor.

use crate::value::{ModalStatus, TrinityVector};

/// Classify a trinity vector into one of the four modal statuses, returning
/// its coherence alongside. Rules apply in order, first match wins.
pub fn classify(trinity: &TrinityVector) -> (ModalStatus, f64) {
    let coherence = trinity.coherence();
    let (e, t) = (trinity.existence(), trinity.truth());

    let status = if t >= 0.95 && e >= 0.90 && coherence >= 0.90 {
        ModalStatus::Necessary
    } else if t > 0.50 && e > 0.50 {
        ModalStatus::Actual
    } else if t > 0.05 && e > 0.05 {
        ModalStatus::Possible
    } else {
        ModalStatus::Impossible
    };

    (status, coherence)
}
