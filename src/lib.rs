//! `ica-utils` collects the numerical helpers around the estimation of independent components
//! and latent state sequences.
//!
//! Independent components and hidden states are only identified up to a permutation, and
//! the models estimating them need well conditioned invertible layers and well separated
//! state means. This crate provides
//!
//! * sampling of uniform and of maximally distant points on the unit hypersphere, see
//!   [`sphere`]
//! * l2 normalization of weight matrices and an empirical condition number threshold for
//!   their initialization, see [`conditioning`]
//! * the smooth leaky ReLU activation, see [`activation`]
//! * matching of estimated sources or state labels to the ground truth with a minimum cost
//!   assignment, see [`matching`]
//!
//! All randomized routines take their random generator explicitly, there is no global state.
//!
//! ```
//! use ica_utils::prelude::*;
//! use ndarray::array;
//!
//! let mut estimated = array![0, 0, 1, 1];
//! let truth = array![1, 1, 0, 0];
//!
//! let accuracy = clustering_accuracy(&mut estimated, &truth).unwrap();
//! assert_eq!(accuracy, 1.0);
//! assert_eq!(estimated, truth);
//! ```

pub mod activation;
pub mod assignment;
pub mod conditioning;
pub mod correlation;
pub mod error;
mod float;
pub mod matching;
mod param_guard;
pub mod prelude;
pub mod sphere;

pub use error::{Error, Result};
pub use float::Float;
pub use param_guard::ParamGuard;
