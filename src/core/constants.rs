//! Numerical constants shared by the constructors and the engine.

/// Default tolerances and thresholds.
pub mod bosim_constants {
    /// Maximum entrywise deviation of `U†U` from the identity accepted as unitary.
    pub const UNITARITY_TOLERANCE: f64 = 1e-8;
    /// Accepted deviation for Hermiticity, unit diagonal and the smallest eigenvalue of a Gram matrix.
    pub const GRAM_TOLERANCE: f64 = 1e-8;
    /// Accepted deviation of a probability distribution's total from 1.
    pub const NORMALIZATION_TOLERANCE: f64 = 1e-6;
    /// Gram weights below this magnitude contribute nothing to a permutation sum.
    pub const NEGLIGIBLE_WEIGHT: f64 = 1e-14;
    /// Largest photon number accepted; Ryser's subset walk indexes subsets with one `usize`.
    pub const MAX_PHOTONS: usize = usize::BITS as usize - 1;
    /// Largest generating-function grid a partition distribution may need.
    pub const MAX_GRID_POINTS: usize = 1 << 24;
    /// Used for the Fourier grid `e^(2πi k / (n+1))`
    pub const TAU: f64 = std::f64::consts::TAU;
}
