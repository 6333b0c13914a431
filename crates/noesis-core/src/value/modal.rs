//! Modal status - the coarse classification over a trinity vector

use serde::{Deserialize, Serialize};

/// One of four modal statuses a node can be classified into, see
/// [`crate::modal::classify`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ModalStatus {
    Necessary,
    Actual,
    Possible,
    Impossible,
}

impl std::fmt::Display for ModalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ModalStatus::Necessary => "Necessary",
            ModalStatus::Actual => "Actual",
            ModalStatus::Possible => "Possible",
            ModalStatus::Impossible => "Impossible",
        };
        write!(f, "{s}")
    }
}
