//! Fractal position - the escape-time record produced by §4.C
//!
//! Immutable after construction; only `crate::fractal` builds one.

use serde::{Deserialize, Serialize};

/// Record (c_real, c_imag, iterations, in_set, escape_radius) produced by
/// iterating `z <- z^2 + c` from zero.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FractalPosition {
    c_real: f64,
    c_imag: f64,
    iterations: u32,
    in_set: bool,
    escape_radius: f64,
}

impl FractalPosition {
    /// Construct a position record. Not part of the public API outside this
    /// crate — only the escape-time positioner produces these.
    pub(crate) fn new(c_real: f64, c_imag: f64, iterations: u32, in_set: bool, escape_radius: f64) -> Self {
        Self {
            c_real,
            c_imag,
            iterations,
            in_set,
            escape_radius,
        }
    }

    /// Real part of `c`.
    pub fn c_real(&self) -> f64 {
        self.c_real
    }

    /// Imaginary part of `c`.
    pub fn c_imag(&self) -> f64 {
        self.c_imag
    }

    /// Iteration count at which escape occurred, or `max_iter` if the point
    /// never escaped.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// True iff the point is (numerically) a member of the set: iteration
    /// reached `max_iter` without `|z| > escape_radius`.
    pub fn in_set(&self) -> bool {
        self.in_set
    }

    /// The escape radius this position was computed against.
    pub fn escape_radius(&self) -> f64 {
        self.escape_radius
    }

    /// The two real coordinates as a point for the 2-D k-d tree.
    pub fn as_point(&self) -> [f64; 2] {
        [self.c_real, self.c_imag]
    }
}
