//! ica-utils prelude.
//!
//! This module contains the most used types, type aliases, traits and
//! functions that you can import easily as a group.
//!

#[doc(no_inline)]
pub use crate::error::{Error, Result};

#[doc(no_inline)]
pub use crate::{Float, ParamGuard};

#[doc(no_inline)]
pub use crate::activation::{smooth_leaky_relu, softplus, SmoothLeakyRelu};

#[doc(no_inline)]
pub use crate::conditioning::{
    condition_number, find_mat_cond_thresh, l2_normalize, l2_normalize_inplace, CondThreshold,
};

#[doc(no_inline)]
pub use crate::correlation::CorrelationMethod;

#[doc(no_inline)]
pub use crate::matching::{clustering_accuracy, match_sources, match_state_indices, SourceMatching};

#[doc(no_inline)]
pub use crate::sphere::{
    dists_on_sphere, sample_distant_nsphere_points, sample_n_sphere, DistantPoints,
};
