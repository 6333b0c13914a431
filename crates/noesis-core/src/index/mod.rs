//! Spatial indices over the trinity vector and complex-plane positions.

mod kdtree;

pub use kdtree::KdTree;

/// Index over trinity vectors, `[existence, goodness, truth]`.
pub type TrinityIndex = KdTree<3>;

/// Index over fractal positions, `[c_real, c_imag]`.
pub type PositionIndex = KdTree<2>;
