//! Smooth leaky ReLU activation
//!
//! `f(x) = alpha * x + (1 - alpha) * softplus(x)`
//!
//! For `alpha = 1` this is the identity, for `alpha = 0` the softplus. Values in between keep
//! the function strictly increasing, so layers using it stay invertible.
use ndarray::{Array, ArrayBase, Data, Dimension};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::Float;

/// `log(1 + exp(x))`, evaluated without overflow for large `x`
pub fn softplus<F: Float>(x: F) -> F {
    x.max(F::zero()) + (-x.abs()).exp().ln_1p()
}

pub fn smooth_leaky_relu<F: Float>(x: F, alpha: F) -> F {
    alpha * x + (F::one() - alpha) * softplus(x)
}

/// Smooth leaky ReLU with a fixed slope
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SmoothLeakyRelu<F> {
    slope: F,
}

impl<F: Float> Default for SmoothLeakyRelu<F> {
    fn default() -> Self {
        Self::new(F::one())
    }
}

impl<F: Float> SmoothLeakyRelu<F> {
    pub fn new(slope: F) -> Self {
        SmoothLeakyRelu { slope }
    }

    pub fn slope(&self) -> F {
        self.slope
    }

    pub fn apply(&self, x: F) -> F {
        smooth_leaky_relu(x, self.slope)
    }

    /// Apply the activation elementwise
    pub fn apply_array<D: Data<Elem = F>, I: Dimension>(&self, x: &ArrayBase<D, I>) -> Array<F, I> {
        x.mapv(|x| self.apply(x))
    }

    /// Turn the activation into a plain unary function
    pub fn into_fn(self) -> impl Fn(F) -> F {
        move |x| smooth_leaky_relu(x, self.slope)
    }
}
