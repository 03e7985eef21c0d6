//! Sampling of (maximally distant) points on the unit hypersphere
//!
//! Points are drawn uniformly on the `(n - 1)`-sphere embedded in `n` dimensions with
//! Marsaglia's method: a vector of independent standard normal components is divided by its
//! euclidean norm.
//!
//! [`DistantPoints`] repeats this draw many times and keeps the configuration whose closest
//! pair of points is the farthest apart, a random approximation to the Tammes problem. It is
//! used to place the means of latent states as far from each other as possible.
use ndarray::{Array2, ArrayBase, Axis, Data, Ix2};
use ndarray_rand::rand::{Rng, SeedableRng};
use ndarray_rand::rand_distr::StandardNormal;
use ndarray_rand::RandomExt;
use rand_xoshiro::Xoshiro256Plus;
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::conditioning::l2_normalize_inplace;
use crate::error::{Error, Result};
use crate::param_guard::ParamGuard;
use crate::Float;

/// Sample `npoints` points uniformly on the unit sphere in `ndim` dimensions
///
/// Returns a matrix of shape `(npoints, ndim)` where every row has unit euclidean norm.
///
/// # Errors
///
/// If `ndim` or `npoints` is zero.
pub fn sample_n_sphere<F: Float, R: Rng + ?Sized>(
    ndim: usize,
    npoints: usize,
    rng: &mut R,
) -> Result<Array2<F>> {
    if ndim == 0 {
        return Err(Error::InvalidParameter(
            "the sphere needs at least one dimension".into(),
        ));
    }
    if npoints == 0 {
        return Err(Error::InvalidParameter(
            "at least one point has to be sampled".into(),
        ));
    }

    let mut points =
        Array2::<f64>::random_using((npoints, ndim), StandardNormal, rng).mapv(F::cast);
    l2_normalize_inplace(&mut points, Axis(1));

    Ok(points)
}

/// Squared great-circle distances between all rows of `points`
///
/// The diagonal is set to `-1` to tell a point apart from a distinct point at distance zero.
pub fn dists_on_sphere<F: Float, D: Data<Elem = F>>(points: &ArrayBase<D, Ix2>) -> Array2<F> {
    let npoints = points.nrows();

    Array2::from_shape_fn((npoints, npoints), |(i, j)| {
        if i == j {
            return -F::one();
        }

        // rounding may push the dot product of (near) identical points past one
        let cos = points.row(i).dot(&points.row(j)).max(-F::one()).min(F::one());
        let angle = cos.acos();
        angle * angle
    })
}

/// Smallest strictly positive entry of a distance matrix
///
/// Returns `None` if no entry is positive, for example when only a single point was sampled.
pub fn min_separation<F: Float, D: Data<Elem = F>>(dists: &ArrayBase<D, Ix2>) -> Option<F> {
    dists
        .iter()
        .copied()
        .filter(|dist| *dist > F::zero())
        .fold(None, |min, dist| match min {
            Some(min) if min <= dist => Some(min),
            _ => Some(dist),
        })
}

/// Sample `npoints` maximally distant points on the unit sphere in `ndim` dimensions
///
/// Draws `iters` independent configurations and returns the one whose closest pair of points
/// is the farthest apart.
///
/// # Errors
///
/// See [`DistantPointsParams`] for the parameter checks and [`Error::NoSeparation`] when no
/// configuration contained two distinct points.
pub fn sample_distant_nsphere_points<F: Float, R: Rng + ?Sized>(
    ndim: usize,
    npoints: usize,
    iters: usize,
    rng: &mut R,
) -> Result<Array2<F>> {
    let params = DistantPointsParams::new(ndim, npoints, ()).iters(iters);
    let params = params.check_ref()?;

    best_of_trials(params.ndim(), params.npoints(), params.iters(), rng)
        .map(DistantPoints::into_points)
}

fn best_of_trials<F: Float, R: Rng + ?Sized>(
    ndim: usize,
    npoints: usize,
    iters: usize,
    rng: &mut R,
) -> Result<DistantPoints<F>> {
    let trials = (0..iters).map(|_| -> Result<_> {
        let points = sample_n_sphere::<F, _>(ndim, npoints, &mut *rng)?;
        let separation = min_separation(&dists_on_sphere(&points));
        Ok((separation, points))
    });

    // the best separation starts at zero, so only trials with two distinct points can win
    let (separation, points) = trials.enumerate().try_fold(
        (F::zero(), None),
        |(best, best_points), (iter, trial)| -> Result<_> {
            let (separation, points) = trial?;
            match separation {
                Some(separation) if separation > best => {
                    trace!(iter, separation = %separation, "improved separation");
                    Ok((separation, Some(points)))
                }
                _ => Ok((best, best_points)),
            }
        },
    )?;

    let points = points.ok_or(Error::NoSeparation)?;
    debug!(ndim, npoints, iters, separation = %separation, "distant point search finished");

    Ok(DistantPoints { points, separation })
}

/// Best configuration found by the distant point search
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct DistantPoints<F> {
    points: Array2<F>,
    separation: F,
}

impl<F: Float> DistantPoints<F> {
    /// Search parameters with a fixed-seed random generator
    pub fn params(ndim: usize, npoints: usize) -> DistantPointsParams<Xoshiro256Plus> {
        DistantPointsParams::new(ndim, npoints, Xoshiro256Plus::seed_from_u64(42))
    }

    /// Search parameters with a user provided random generator
    pub fn params_with_rng<R: Rng>(ndim: usize, npoints: usize, rng: R) -> DistantPointsParams<R> {
        DistantPointsParams::new(ndim, npoints, rng)
    }

    /// Points of the configuration as matrix of shape `(npoints, ndim)`
    pub fn points(&self) -> &Array2<F> {
        &self.points
    }

    /// Squared angular distance between the closest pair of points
    pub fn separation(&self) -> F {
        self.separation
    }

    pub fn into_points(self) -> Array2<F> {
        self.points
    }
}

/// The set of checked parameters of the [distant point search](DistantPoints)
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct DistantPointsValidParams<R> {
    /// Dimension of the space the sphere is embedded in
    ndim: usize,
    /// Number of points in every configuration
    npoints: usize,
    /// Number of independent configurations drawn
    iters: usize,
    /// The random number generator
    rng: R,
}

impl<R> DistantPointsValidParams<R> {
    pub fn ndim(&self) -> usize {
        self.ndim
    }

    pub fn npoints(&self) -> usize {
        self.npoints
    }

    pub fn iters(&self) -> usize {
        self.iters
    }

    /// Returns the random generator
    pub fn rng(&self) -> &R {
        &self.rng
    }
}

impl<R: Rng + Clone> DistantPointsValidParams<R> {
    /// Run the search on a copy of the random generator
    ///
    /// Calling this twice on the same parameters returns the same configuration.
    pub fn search<F: Float>(&self) -> Result<DistantPoints<F>> {
        let mut rng = self.rng.clone();
        best_of_trials(self.ndim, self.npoints, self.iters, &mut rng)
    }
}

/// A helper struct to construct [checked parameters](DistantPointsValidParams) with the
/// builder pattern.
#[derive(Debug, Clone, PartialEq)]
pub struct DistantPointsParams<R>(DistantPointsValidParams<R>);

impl<R> DistantPointsParams<R> {
    /// Look for `npoints` points on the sphere in `ndim` dimensions
    ///
    /// Defaults are provided if optional parameters are not specified:
    /// * `iters = 100000`
    pub fn new(ndim: usize, npoints: usize, rng: R) -> Self {
        Self(DistantPointsValidParams {
            ndim,
            npoints,
            iters: 100_000,
            rng,
        })
    }

    /// Change the number of sampled configurations
    pub fn iters(mut self, iters: usize) -> Self {
        self.0.iters = iters;
        self
    }

    /// Change the random generator
    pub fn with_rng<R2>(self, rng: R2) -> DistantPointsParams<R2> {
        DistantPointsParams(DistantPointsValidParams {
            ndim: self.0.ndim,
            npoints: self.0.npoints,
            iters: self.0.iters,
            rng,
        })
    }
}

impl<R: Rng + Clone> DistantPointsParams<R> {
    /// Check the parameters and run the search
    pub fn search<F: Float>(&self) -> Result<DistantPoints<F>> {
        self.check_ref()?.search()
    }
}

impl<R> ParamGuard for DistantPointsParams<R> {
    type Checked = DistantPointsValidParams<R>;
    type Error = Error;

    fn check_ref(&self) -> Result<&Self::Checked> {
        if self.0.ndim == 0 {
            Err(Error::InvalidParameter("ndim cannot be 0".into()))
        } else if self.0.npoints < 2 {
            Err(Error::InvalidParameter(format!(
                "at least two points are needed for a separation, got {}",
                self.0.npoints
            )))
        } else if self.0.iters == 0 {
            Err(Error::InvalidParameter("iters cannot be 0".into()))
        } else {
            Ok(&self.0)
        }
    }

    fn check(self) -> Result<Self::Checked> {
        self.check_ref()?;
        Ok(self.0)
    }
}
