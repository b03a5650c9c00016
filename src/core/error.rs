//! Error handling logic

use std::fmt;

/// Error types raised at the boundary of the probability engine.
///
/// Every failure is detected before any numeric work starts. No error is ever
/// turned into a silent zero probability; a cancelled computation is reported
/// through [`Completion::Cancelled`](crate::simulation::Completion) instead.
#[derive(Debug, Clone, PartialEq, Eq)] // Eq useful for testing error variants
pub enum BosonError {
    /// Mode counts disagree between the input, the interferometer and the
    /// output measurement (or between two occupations being combined).
    DimensionMismatch {
        /// DimensionMismatch failure message
        message: String
    },

    /// A Gram matrix is not Hermitian, has a non-unit diagonal, is not
    /// positive semidefinite, or has the wrong size for the input.
    InvalidGramMatrix {
        /// InvalidGramMatrix failure message
        message: String
    },

    /// The interferometer matrix is not square or not unitary beyond tolerance.
    InvalidInterferometer {
        /// InvalidInterferometer failure message
        message: String
    },

    /// Input and output photon totals differ for an exact detection event.
    PhotonNumberMismatch {
        /// Photons entering the interferometer
        input: usize,
        /// Photons requested at the output
        output: usize,
    },

    /// The (input type, measurement) pair has no algorithm in the dispatch table.
    UnsupportedCombination {
        /// UnsupportedCombination failure message
        message: String
    },

    /// An operation is inconsistent with the value it was applied to
    /// (e.g. expanding an already lossy occupation, detector probabilities outside [0, 1]).
    InvalidOperation {
        /// InvalidOperation failure message
        message: String
    },
}

impl BosonError {
    pub(crate) fn dimension(message: impl Into<String>) -> Self {
        BosonError::DimensionMismatch { message: message.into() }
    }

    pub(crate) fn gram(message: impl Into<String>) -> Self {
        BosonError::InvalidGramMatrix { message: message.into() }
    }

    pub(crate) fn interferometer(message: impl Into<String>) -> Self {
        BosonError::InvalidInterferometer { message: message.into() }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        BosonError::InvalidOperation { message: message.into() }
    }
}

impl fmt::Display for BosonError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BosonError::DimensionMismatch { message } => write!(f, "Dimension Mismatch: {}", message),
            BosonError::InvalidGramMatrix { message } => write!(f, "Invalid Gram Matrix: {}", message),
            BosonError::InvalidInterferometer { message } => write!(f, "Invalid Interferometer: {}", message),
            BosonError::PhotonNumberMismatch { input, output } => {
                write!(f, "Photon Number Mismatch: {} photons in, {} photons requested out", input, output)
            }
            BosonError::UnsupportedCombination { message } => write!(f, "Unsupported Combination: {}", message),
            BosonError::InvalidOperation { message } => write!(f, "Invalid Operation: {}", message),
        }
    }
}

// Implement the standard Error trait to allow for easy integration with Rust error handling.
impl std::error::Error for BosonError {}
