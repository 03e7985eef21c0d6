//! Minimum cost bipartite assignment
//!
//! Thin adapter around the Kuhn-Munkres solver of `pathfinding`. The solver only accepts
//! integer weights and at least as many columns as rows, so wide and tall cost matrices are
//! handled here and float costs are quantized to fixed point first.
use std::iter::Sum;

use ndarray::{ArrayBase, Data, Ix2};
use num_traits::{Bounded, Signed, Zero};
use pathfinding::kuhn_munkres::kuhn_munkres_min;
use pathfinding::matrix::Matrix;

use crate::error::{Error, Result};
use crate::Float;

/// Largest magnitude of a quantized float cost
const FIXED_POINT_SCALE: f64 = (1u64 << 40) as f64;

/// Solve the assignment problem for an integer cost matrix
///
/// Returns the row indices and the matched column indices, both of length `min(nrows, ncols)`
/// and sorted by row. The total cost of the pairs is minimal.
pub fn linear_sum_assignment<C, D>(cost: &ArrayBase<D, Ix2>) -> Result<(Vec<usize>, Vec<usize>)>
where
    C: Bounded + Sum<C> + Zero + Signed + Ord + Copy,
    D: Data<Elem = C>,
{
    let (nrows, ncols) = cost.dim();
    if nrows == 0 || ncols == 0 {
        return Ok((Vec::new(), Vec::new()));
    }

    let transposed = nrows > ncols;
    let cost = if transposed { cost.t() } else { cost.view() };
    let weights = Matrix::from_vec(cost.nrows(), cost.ncols(), cost.iter().copied().collect())
        .map_err(|err| Error::InvalidParameter(format!("assignment cost matrix: {:?}", err)))?;

    let (_, assignment) = kuhn_munkres_min(&weights);

    let mut pairs = assignment
        .into_iter()
        .enumerate()
        .map(|(row, col)| if transposed { (col, row) } else { (row, col) })
        .collect::<Vec<_>>();
    pairs.sort_unstable();

    Ok(pairs.into_iter().unzip())
}

/// Solve the assignment problem for a float cost matrix
///
/// Costs are scaled so that the largest magnitude maps to `2^40` and rounded, which keeps the
/// optimum exact up to differences below `max|cost| * 2^-40`.
///
/// # Errors
///
/// If any cost is NaN or infinite.
pub fn linear_sum_assignment_float<F: Float, D: Data<Elem = F>>(
    cost: &ArrayBase<D, Ix2>,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if cost.iter().any(|c| !c.is_finite()) {
        return Err(Error::NonFiniteValue("assignment cost matrix".into()));
    }

    let max_abs = cost.iter().fold(F::zero(), |max, c| max.max(c.abs()));
    let scale = if max_abs > F::zero() {
        F::cast(FIXED_POINT_SCALE) / max_abs
    } else {
        F::one()
    };
    let quantized = cost.mapv(|c| (c * scale).round().to_i64().unwrap_or(0));

    linear_sum_assignment(&quantized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array2};

    fn total<C: Copy + Sum<C>>(cost: &Array2<C>, rows: &[usize], cols: &[usize]) -> C {
        rows.iter().zip(cols).map(|(&i, &j)| cost[(i, j)]).sum()
    }

    #[test]
    fn square_integer_costs() {
        // the same matrix as in the scipy documentation
        let cost = array![[4i64, 1, 3], [2, 0, 5], [3, 2, 2]];
        let (rows, cols) = linear_sum_assignment(&cost).unwrap();

        assert_eq!(rows, vec![0, 1, 2]);
        assert_eq!(cols, vec![1, 0, 2]);
        assert_eq!(total(&cost, &rows, &cols), 5);
    }

    #[test]
    fn rectangular_costs() {
        let wide = array![[5i64, 1, 9, 4], [2, 8, 7, 3]];
        let (rows, cols) = linear_sum_assignment(&wide).unwrap();
        assert_eq!(rows, vec![0, 1]);
        assert_eq!(cols, vec![1, 0]);

        let tall = wide.t().to_owned();
        let (rows, cols) = linear_sum_assignment(&tall).unwrap();
        assert_eq!(rows, vec![0, 1]);
        assert_eq!(cols, vec![1, 0]);
        assert_eq!(total(&tall, &rows, &cols), 3);
    }

    #[test]
    fn negative_float_costs() {
        let corr = array![[0.1, 0.9, 0.3], [0.8, 0.2, 0.1], [0.2, 0.3, 0.7]];
        let (rows, cols) = linear_sum_assignment_float(&corr.mapv(|c: f64| -c)).unwrap();

        assert_eq!(rows, vec![0, 1, 2]);
        assert_eq!(cols, vec![1, 0, 2]);
    }

    #[test]
    fn zero_costs_and_empty_matrices() {
        let (rows, cols) = linear_sum_assignment_float(&Array2::<f64>::zeros((2, 2))).unwrap();
        assert_eq!(rows, vec![0, 1]);
        assert_eq!(cols.len(), 2);

        let (rows, cols) = linear_sum_assignment(&Array2::<i64>::zeros((0, 3))).unwrap();
        assert!(rows.is_empty() && cols.is_empty());
    }

    #[test]
    fn non_finite_costs() {
        let cost = array![[1., f64::NAN], [0., 1.]];
        assert!(matches!(
            linear_sum_assignment_float(&cost),
            Err(Error::NonFiniteValue(_))
        ));
    }
}
