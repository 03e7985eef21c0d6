//! Cross-correlation between the columns of two matrices
use std::fmt;
use std::str::FromStr;

use ndarray::{concatenate, s, Array2, ArrayBase, Axis, Data, Ix2};
use ndarray_stats::CorrelationExt;
use noisy_float::{checkers::FiniteChecker, NoisyFloat};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::Float;

/// Correlation coefficient used to compare sources
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CorrelationMethod {
    /// Pearson product-moment correlation
    Pearson,
    /// Spearman rank correlation
    Spearman,
}

impl Default for CorrelationMethod {
    fn default() -> Self {
        CorrelationMethod::Pearson
    }
}

impl FromStr for CorrelationMethod {
    type Err = Error;

    fn from_str(method: &str) -> Result<Self> {
        match method {
            "pearson" => Ok(CorrelationMethod::Pearson),
            "spearman" => Ok(CorrelationMethod::Spearman),
            other => Err(Error::InvalidMethod(other.to_string())),
        }
    }
}

impl fmt::Display for CorrelationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CorrelationMethod::Pearson => write!(f, "pearson"),
            CorrelationMethod::Spearman => write!(f, "spearman"),
        }
    }
}

/// Rank the values of every column, starting at one
///
/// Tied values receive the average of the ranks they span.
///
/// # Errors
///
/// If a value is NaN or infinite.
pub fn rank_columns<F: Float, D: Data<Elem = F>>(x: &ArrayBase<D, Ix2>) -> Result<Array2<F>> {
    let mut ranks = Array2::zeros(x.raw_dim());

    for (column, mut out) in x.axis_iter(Axis(1)).zip(ranks.axis_iter_mut(Axis(1))) {
        let keys = column
            .iter()
            .map(|&v| {
                NoisyFloat::<F, FiniteChecker>::try_new(v)
                    .ok_or_else(|| Error::NonFiniteValue("rank input".into()))
            })
            .collect::<Result<Vec<_>>>()?;
        let mut order = (0..keys.len()).collect::<Vec<_>>();
        order.sort_by_key(|&idx| keys[idx]);

        let mut start = 0;
        while start < order.len() {
            let mut end = start + 1;
            while end < order.len() && column[order[end]] == column[order[start]] {
                end += 1;
            }

            // mean of the one-based ranks start + 1 ..= end
            let rank = F::cast(start + end + 1) / F::cast(2);
            for &idx in &order[start..end] {
                out[idx] = rank;
            }
            start = end;
        }
    }

    Ok(ranks)
}

/// Correlation between every column of `x` and every column of `y`
///
/// Both matrices hold one observation per row. Entry `(i, j)` of the result is the correlation
/// of column `i` of `x` with column `j` of `y`. Constant columns produce NaN entries.
///
/// # Errors
///
/// If the number of rows differs, fewer than two observations are given or an observation is
/// NaN or infinite.
pub fn cross_correlation<F: Float, D1: Data<Elem = F>, D2: Data<Elem = F>>(
    x: &ArrayBase<D1, Ix2>,
    y: &ArrayBase<D2, Ix2>,
    method: CorrelationMethod,
) -> Result<Array2<F>> {
    if x.nrows() != y.nrows() {
        return Err(Error::ShapeMismatch {
            estimated: y.dim(),
            truth: x.dim(),
        });
    }
    if x.nrows() < 2 {
        return Err(Error::NotEnoughSamples);
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return Err(Error::NonFiniteValue("correlation input".into()));
    }

    let stacked = match method {
        CorrelationMethod::Pearson => concatenate(Axis(1), &[x.view(), y.view()])?,
        CorrelationMethod::Spearman => {
            concatenate(Axis(1), &[rank_columns(x)?.view(), rank_columns(y)?.view()])?
        }
    };

    // variables are expected along the rows
    let corr = stacked
        .t()
        .pearson_correlation()
        .map_err(|_| Error::NotEnoughSamples)?;

    let nx = x.ncols();
    Ok(corr.slice(s![..nx, nx..]).to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array1};

    #[test]
    fn autotraits() {
        fn has_autotraits<T: Send + Sync + Sized + Unpin>() {}
        has_autotraits::<CorrelationMethod>();
    }

    #[test]
    fn parse_method() {
        assert_eq!("pearson".parse::<CorrelationMethod>().unwrap(), CorrelationMethod::Pearson);
        assert_eq!(
            "spearman".parse::<CorrelationMethod>().unwrap(),
            CorrelationMethod::Spearman
        );
        assert!(matches!(
            "kendall".parse::<CorrelationMethod>(),
            Err(Error::InvalidMethod(method)) if method == "kendall"
        ));
        assert_eq!(CorrelationMethod::Spearman.to_string(), "spearman");
    }

    #[test]
    fn ranks_with_ties() {
        let x = array![[10., 1.], [30., 1.], [20., 2.], [20., 0.]];
        let ranks = rank_columns(&x).unwrap();

        assert_abs_diff_eq!(ranks.column(0), array![1., 4., 2.5, 2.5], epsilon = 1e-12);
        assert_abs_diff_eq!(ranks.column(1), array![2.5, 2.5, 4., 1.], epsilon = 1e-12);
    }

    #[test]
    fn pearson_of_linear_relations() {
        let t = Array1::linspace(0., 1., 20);
        let x = ndarray::stack![Axis(1), t, t.mapv(|v| v * v)];
        let y = ndarray::stack![Axis(1), t.mapv(|v| -2. * v + 1.), t.mapv(|v| 3. * v)];

        let corr = cross_correlation(&x, &y, CorrelationMethod::Pearson).unwrap();
        assert_eq!(corr.dim(), (2, 2));
        assert_abs_diff_eq!(corr[(0, 0)], -1., epsilon = 1e-10);
        assert_abs_diff_eq!(corr[(0, 1)], 1., epsilon = 1e-10);
        assert!(corr[(1, 1)] < 1. && corr[(1, 1)] > 0.9);
    }

    #[test]
    fn spearman_of_monotone_relations() {
        let t = Array1::linspace(0.1, 3., 30);
        let x = t.clone().insert_axis(Axis(1));
        let y = ndarray::stack![Axis(1), t.mapv(f64::exp), t.mapv(|v| -v.powi(3))];

        let corr = cross_correlation(&x, &y, CorrelationMethod::Spearman).unwrap();
        assert_eq!(corr.dim(), (1, 2));
        assert_abs_diff_eq!(corr, array![[1., -1.]], epsilon = 1e-10);
    }

    #[test]
    fn mismatching_observations() {
        let x = Array2::<f64>::zeros((4, 2));
        let y = Array2::<f64>::zeros((5, 2));
        assert!(matches!(
            cross_correlation(&x, &y, CorrelationMethod::Pearson),
            Err(Error::ShapeMismatch { .. })
        ));

        let x = Array2::<f64>::zeros((1, 2));
        assert!(matches!(
            cross_correlation(&x, &x, CorrelationMethod::Spearman),
            Err(Error::NotEnoughSamples)
        ));
    }

    #[test]
    fn ranks_of_non_finite_values() {
        let x = array![[1., 0.], [f64::NAN, 2.], [3., 1.]];
        assert!(matches!(rank_columns(&x), Err(Error::NonFiniteValue(_))));

        let x = array![[1.], [f64::INFINITY], [3.]];
        assert!(matches!(rank_columns(&x), Err(Error::NonFiniteValue(_))));
    }
}
