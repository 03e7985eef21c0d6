//! Conditioning of uniformly initialized weight matrices
//!
//! Invertible mixing layers are initialized with uniform weights and column-wise l2
//! normalization. Some of these draws are close to singular, so [`CondThreshold`] estimates an
//! empirical percentile of the condition number over many draws. Draws above the threshold can
//! then be rejected.
use nalgebra::DMatrix;
use ndarray::{Array1, Array2, ArrayBase, Axis, Data, DataMut, Ix2};
use ndarray_rand::rand::SeedableRng;
use ndarray_rand::rand_distr::Uniform;
use ndarray_rand::RandomExt;
use noisy_float::{checkers::NumChecker, NoisyFloat};
use rand_xoshiro::Xoshiro256Plus;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::param_guard::ParamGuard;
use crate::Float;

/// Normalize the lanes of `w` along `axis` to unit euclidean norm
///
/// `Axis(0)` normalizes every column, `Axis(1)` every row. Lanes of zero norm become NaN.
pub fn l2_normalize_inplace<F: Float, S: DataMut<Elem = F>>(
    w: &mut ArrayBase<S, Ix2>,
    axis: Axis,
) {
    let norms = w.map_axis(axis, |lane| lane.dot(&lane).sqrt());
    *w /= &norms.insert_axis(axis);
}

/// Return a copy of `w` with the lanes along `axis` normalized to unit euclidean norm
pub fn l2_normalize<F: Float, D: Data<Elem = F>>(w: &ArrayBase<D, Ix2>, axis: Axis) -> Array2<F> {
    let mut w = w.to_owned();
    l2_normalize_inplace(&mut w, axis);
    w
}

/// Condition number of `w` in the 2-norm
///
/// This is the ratio of the largest to the smallest singular value, infinite for singular
/// matrices.
///
/// # Errors
///
/// If `w` is empty or contains non-finite values.
pub fn condition_number<F: Float, D: Data<Elem = F>>(w: &ArrayBase<D, Ix2>) -> Result<F> {
    if w.is_empty() {
        return Err(Error::InvalidParameter(
            "condition number of an empty matrix".into(),
        ));
    }
    if w.iter().any(|x| !x.is_finite()) {
        return Err(Error::NonFiniteValue("condition number input".into()));
    }

    let (nrows, ncols) = w.dim();
    let matrix = DMatrix::from_fn(nrows, ncols, |i, j| w[(i, j)].to_f64().unwrap_or(f64::NAN));
    let (largest, smallest) = matrix
        .singular_values()
        .iter()
        .fold((0f64, f64::INFINITY), |(largest, smallest), &s| {
            (largest.max(s), smallest.min(s))
        });

    Ok(F::cast(largest / smallest))
}

/// Empirical condition number threshold of uniformly initialized weight matrices
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct CondThreshold<F> {
    threshold: F,
    condition_numbers: Array1<F>,
}

impl<F: Float> CondThreshold<F> {
    /// Estimate the threshold for `dim x dim` matrices
    pub fn params(dim: usize) -> CondThresholdParams<F> {
        CondThresholdParams::new(dim)
    }

    /// Condition number at the requested percentile
    pub fn threshold(&self) -> F {
        self.threshold
    }

    /// All observed condition numbers in ascending order
    pub fn condition_numbers(&self) -> &Array1<F> {
        &self.condition_numbers
    }

    /// Whether `w`, once its columns are l2 normalized, is conditioned at least as well as the
    /// threshold
    pub fn accepts<D: Data<Elem = F>>(&self, w: &ArrayBase<D, Ix2>) -> Result<bool> {
        let cond = condition_number(&l2_normalize(w, Axis(0)))?;
        Ok(cond <= self.threshold)
    }
}

/// Estimate the condition number threshold of `dim x dim` weight matrices
///
/// Draws `iters` matrices uniformly in `weight_range`, normalizes their columns and returns the
/// condition number at rank `floor(iters * ratio)` of the ascending list. The random generator
/// is seeded with `seed` on every call.
pub fn find_mat_cond_thresh<F: Float>(
    dim: usize,
    weight_range: (F, F),
    iters: usize,
    ratio: F,
    seed: u64,
) -> Result<F> {
    CondThreshold::params(dim)
        .weight_range(weight_range.0, weight_range.1)
        .iters(iters)
        .ratio(ratio)
        .seed(seed)
        .estimate()
        .map(|estimate| estimate.threshold())
}

/// The set of checked parameters of the [condition threshold estimate](CondThreshold)
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct CondThresholdValidParams<F> {
    /// Number of rows and columns of the weight matrices
    dim: usize,
    /// Bounds of the uniform weight initializer
    weight_range: (F, F),
    /// Number of sampled matrices
    iters: usize,
    /// Percentile of the condition numbers, in `[0, 1)`
    ratio: F,
    /// Seed of the random generator
    seed: u64,
}

impl<F: Float> CondThresholdValidParams<F> {
    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn weight_range(&self) -> (F, F) {
        self.weight_range
    }

    pub fn iters(&self) -> usize {
        self.iters
    }

    pub fn ratio(&self) -> F {
        self.ratio
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Sample the weight matrices and pick the condition number at the requested percentile
    pub fn estimate(&self) -> Result<CondThreshold<F>> {
        let mut rng = Xoshiro256Plus::seed_from_u64(self.seed);
        let (low, high) = self.weight_range;
        let init = Uniform::new(low, high);

        let mut conds = (0..self.iters)
            .map(|_| {
                let mut w = Array2::<F>::random_using((self.dim, self.dim), &init, &mut rng);
                l2_normalize_inplace(&mut w, Axis(0));
                let cond = condition_number(&w)?;

                NoisyFloat::<F, NumChecker>::try_new(cond)
                    .ok_or_else(|| Error::NonFiniteValue("condition number".into()))
            })
            .collect::<Result<Vec<_>>>()?;
        conds.sort_unstable();

        let rank = F::cast(self.iters) * self.ratio;
        let rank = rank.floor().to_usize().unwrap_or(0).min(self.iters - 1);
        let condition_numbers = conds.into_iter().map(|c| c.raw()).collect::<Array1<_>>();
        let threshold = condition_numbers[rank];

        debug!(
            dim = self.dim,
            iters = self.iters,
            rank,
            threshold = %threshold,
            "estimated condition number threshold"
        );

        Ok(CondThreshold {
            threshold,
            condition_numbers,
        })
    }
}

/// A helper struct to construct [checked parameters](CondThresholdValidParams) with the
/// builder pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct CondThresholdParams<F>(CondThresholdValidParams<F>);

impl<F: Float> CondThresholdParams<F> {
    /// Defaults are provided if optional parameters are not specified:
    /// * `weight_range = (-1, 1)`
    /// * `iters = 10000`
    /// * `ratio = 0.25`
    /// * `seed = 0`
    pub fn new(dim: usize) -> Self {
        Self(CondThresholdValidParams {
            dim,
            weight_range: (-F::one(), F::one()),
            iters: 10_000,
            ratio: F::cast(0.25),
            seed: 0,
        })
    }

    /// Bounds of the uniform weight initializer, `low` inclusive and `high` exclusive
    pub fn weight_range(mut self, low: F, high: F) -> Self {
        self.0.weight_range = (low, high);
        self
    }

    /// Change the number of sampled matrices
    pub fn iters(mut self, iters: usize) -> Self {
        self.0.iters = iters;
        self
    }

    /// Change the percentile, for example `0.25` for the lower quartile
    pub fn ratio(mut self, ratio: F) -> Self {
        self.0.ratio = ratio;
        self
    }

    /// Set seed for random number generator for reproducible results.
    pub fn seed(mut self, seed: u64) -> Self {
        self.0.seed = seed;
        self
    }

    /// Check the parameters and estimate the threshold
    pub fn estimate(&self) -> Result<CondThreshold<F>> {
        self.check_ref()?.estimate()
    }
}

impl<F: Float> ParamGuard for CondThresholdParams<F> {
    type Checked = CondThresholdValidParams<F>;
    type Error = Error;

    fn check_ref(&self) -> Result<&Self::Checked> {
        let (low, high) = self.0.weight_range;

        if self.0.dim == 0 {
            Err(Error::InvalidParameter("dim cannot be 0".into()))
        } else if self.0.iters == 0 {
            Err(Error::InvalidParameter("iters cannot be 0".into()))
        } else if !(self.0.ratio >= F::zero() && self.0.ratio < F::one()) {
            Err(Error::InvalidParameter(format!(
                "ratio has to be in [0, 1), got {}",
                self.0.ratio
            )))
        } else if !(low.is_finite() && high.is_finite() && low < high) {
            Err(Error::InvalidParameter(format!(
                "weight range [{}, {}) is empty or unbounded",
                low, high
            )))
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
