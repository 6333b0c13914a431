//! Trinity vector - the semantic coordinate of a node
//!
//! A triple (existence, goodness, truth) in \[0, 1\]^3. Components are
//! clamped on construction so the invariant holds for every value that
//! exists, not just values that pass validation.

use serde::{Deserialize, Serialize};

/// Triple (E, G, T) of reals in `[0, 1]`, clamped on construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrinityVector {
    existence: f64,
    goodness: f64,
    truth: f64,
}

impl TrinityVector {
    /// Construct a trinity vector, clamping each component into `[0, 1]`.
    pub fn new(existence: f64, goodness: f64, truth: f64) -> Self {
        Self {
            existence: existence.clamp(0.0, 1.0),
            goodness: goodness.clamp(0.0, 1.0),
            truth: truth.clamp(0.0, 1.0),
        }
    }

    /// Existence component.
    pub fn existence(&self) -> f64 {
        self.existence
    }

    /// Goodness component.
    pub fn goodness(&self) -> f64 {
        self.goodness
    }

    /// Truth component.
    pub fn truth(&self) -> f64 {
        self.truth
    }

    /// The three components as a plain array, ordered (E, G, T) — this is
    /// the point fed to the 3-D k-d tree.
    pub fn as_point(&self) -> [f64; 3] {
        [self.existence, self.goodness, self.truth]
    }

    /// Derived coherence scalar: `g / (e*t)` clamped to `[0, 1]`, `0` when
    /// `e*t <= 0`, exactly `1` when `g >= e*t`. Computed on demand, never
    /// stored.
    pub fn coherence(&self) -> f64 {
        let et = self.existence * self.truth;
        if et <= 0.0 {
            return 0.0;
        }
        (self.goodness / et).min(1.0)
    }
}

impl Default for TrinityVector {
    fn default() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }
}
