//! Error types in ica-utils
//!

use thiserror::Error;

use ndarray::ShapeError;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The correlation method is neither `pearson` nor `spearman`
    #[error("invalid correlation method {0}, expected `pearson` or `spearman`")]
    InvalidMethod(String),
    /// Estimated and true sources do not share their shape
    #[error("shape mismatch: estimated sources are {estimated:?}, true sources are {truth:?}")]
    ShapeMismatch {
        estimated: (usize, usize),
        truth: (usize, usize),
    },
    /// Estimated and true state sequences differ in length
    #[error("length mismatch: estimated sequence has {estimated} steps, true sequence has {truth}")]
    LengthMismatch { estimated: usize, truth: usize },
    /// A label does not fit into the square label space spanned by the estimate
    #[error("label {label} does not fit into {nstates} estimated states")]
    LabelCardinalityMismatch { label: usize, nstates: usize },
    #[error("invalid parameter {0}")]
    InvalidParameter(String),
    #[error("not enough samples")]
    NotEnoughSamples,
    /// No sampled configuration had two distinct points
    #[error("no trial produced a strictly positive separation")]
    NoSeparation,
    #[error("non-finite value encountered in {0}")]
    NonFiniteValue(String),
    #[error("invalid ndarray shape {0}")]
    NdShape(#[from] ShapeError),
}
