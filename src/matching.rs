//! Matching of estimated and true components under unknown permutation
//!
//! Independent components and latent states are only identified up to their order. Before
//! estimates can be compared with the ground truth, estimated and true indices are paired with
//! a minimum cost assignment:
//!
//! * [`match_sources`] pairs continuous sources by their absolute correlation
//! * [`match_state_indices`] and [`clustering_accuracy`] pair discrete state labels
use std::collections::HashSet;

use ndarray::{Array2, ArrayBase, Axis, Data, DataMut, Ix1, Ix2};
#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};
use tracing::debug;

use crate::assignment::{linear_sum_assignment, linear_sum_assignment_float};
use crate::correlation::{cross_correlation, CorrelationMethod};
use crate::error::{Error, Result};
use crate::Float;

/// Estimated sources aligned with the true sources
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
#[derive(Debug, Clone, PartialEq)]
pub struct SourceMatching<F> {
    mean_abs_corr: F,
    sorted_sources: Array2<F>,
    indices: Vec<usize>,
}

impl<F: Float> SourceMatching<F> {
    /// Mean absolute correlation between the matched pairs of sources
    pub fn mean_abs_corr(&self) -> F {
        self.mean_abs_corr
    }

    /// Estimated sources with their columns in the order of the true sources
    pub fn sorted_sources(&self) -> &Array2<F> {
        &self.sorted_sources
    }

    /// Column of the estimated sources matched to every true source
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn into_sorted_sources(self) -> Array2<F> {
        self.sorted_sources
    }
}

/// Match estimated sources to true sources by their correlation
///
/// Both matrices hold one observation per row and one source per column. The pairing
/// maximizes the total absolute correlation, so sources recovered with flipped sign are
/// matched as well. Column `i` of the sorted sources is column `indices[i]` of `estimated`.
///
/// # Errors
///
/// If the matrices differ in shape, have no columns or fewer than two rows, or a source is
/// constant or holds NaN or infinite values.
pub fn match_sources<F: Float, D1: Data<Elem = F>, D2: Data<Elem = F>>(
    estimated: &ArrayBase<D1, Ix2>,
    truth: &ArrayBase<D2, Ix2>,
    method: CorrelationMethod,
) -> Result<SourceMatching<F>> {
    if estimated.dim() != truth.dim() {
        return Err(Error::ShapeMismatch {
            estimated: estimated.dim(),
            truth: truth.dim(),
        });
    }
    if estimated.ncols() == 0 {
        return Err(Error::InvalidParameter(
            "sources need at least one component".into(),
        ));
    }

    let abs_corr = cross_correlation(truth, estimated, method)?.mapv(|c| c.abs());
    let (rows, indices) = linear_sum_assignment_float(&abs_corr.mapv(|c| -c))?;

    let mean_abs_corr = rows
        .iter()
        .zip(&indices)
        .map(|(&i, &j)| abs_corr[(i, j)])
        .sum::<F>()
        / F::cast(indices.len());
    let sorted_sources = estimated.select(Axis(1), &indices);

    debug!(
        %method,
        ncomponents = indices.len(),
        mean_abs_corr = %mean_abs_corr,
        "matched sources"
    );

    Ok(SourceMatching {
        mean_abs_corr,
        sorted_sources,
        indices,
    })
}

/// Match estimated state labels to true state labels
///
/// With `K` the number of distinct estimated labels, all labels have to lie in `0..K`. The
/// returned mapping relabels estimated state `k` as true state `mapping[k]`.
///
/// The score of a pair `(k, l)` is the number of time steps at which the indicator sequences
/// `estimated == k` and `truth == l` agree, which includes the steps where neither label is
/// present. This differs from the usual co-occurrence count of a confusion matrix. For label
/// sets that fit into `0..K` both scores lead to the same optimal mapping.
///
/// # Errors
///
/// If the sequences differ in length, are empty, or a label does not fit into `0..K`.
pub fn match_state_indices<S1: Data<Elem = usize>, S2: Data<Elem = usize>>(
    estimated: &ArrayBase<S1, Ix1>,
    truth: &ArrayBase<S2, Ix1>,
) -> Result<Vec<usize>> {
    if estimated.len() != truth.len() {
        return Err(Error::LengthMismatch {
            estimated: estimated.len(),
            truth: truth.len(),
        });
    }
    if estimated.is_empty() {
        return Err(Error::NotEnoughSamples);
    }

    let nstates = estimated.iter().collect::<HashSet<_>>().len();
    if let Some(&label) = estimated.iter().chain(truth.iter()).find(|&&l| l >= nstates) {
        return Err(Error::LabelCardinalityMismatch { label, nstates });
    }

    let cost = Array2::from_shape_fn((nstates, nstates), |(k, l)| {
        let agreement = estimated
            .iter()
            .zip(truth.iter())
            .filter(|&(&est, &tru)| (est == k) == (tru == l))
            .count();
        -(agreement as i64)
    });
    let (_, mapping) = linear_sum_assignment(&cost)?;

    debug!(nstates, ?mapping, "matched state indices");

    Ok(mapping)
}

/// Ratio of time steps at which the estimated state is correct
///
/// The estimated labels are first matched to the true labels with [`match_state_indices`] and
/// `estimated` is relabeled in place with the resulting mapping.
pub fn clustering_accuracy<S1: DataMut<Elem = usize>, S2: Data<Elem = usize>>(
    estimated: &mut ArrayBase<S1, Ix1>,
    truth: &ArrayBase<S2, Ix1>,
) -> Result<f64> {
    let mapping = match_state_indices(&*estimated, truth)?;
    estimated.mapv_inplace(|label| mapping[label]);

    let correct = estimated
        .iter()
        .zip(truth.iter())
        .filter(|(est, tru)| est == tru)
        .count();

    Ok(correct as f64 / estimated.len() as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array, Array1};
    use ndarray_rand::rand::{Rng, SeedableRng};
    use ndarray_rand::rand_distr::{StandardNormal, Uniform};
    use ndarray_rand::RandomExt;
    use rand_xoshiro::Xoshiro256Plus;

    #[test]
    fn autotraits() {
        fn has_autotraits<T: Send + Sync + Sized + Unpin>() {}
        has_autotraits::<SourceMatching<f64>>();
        has_autotraits::<Error>();
    }

    #[test]
    fn permuted_sources_are_recovered() {
        let mut rng = Xoshiro256Plus::seed_from_u64(42);
        let truth: Array2<f64> = Array::random_using((500, 4), StandardNormal, &mut rng);

        // estimated column j is true column perm[j]
        let perm = [2, 0, 3, 1];
        let estimated = truth.select(Axis(1), &perm);

        for &method in &[CorrelationMethod::Pearson, CorrelationMethod::Spearman] {
            let matching = match_sources(&estimated, &truth, method).unwrap();

            assert_eq!(matching.indices(), &[1, 3, 0, 2]);
            for (true_idx, &est_idx) in matching.indices().iter().enumerate() {
                assert_eq!(perm[est_idx], true_idx);
            }
            assert_abs_diff_eq!(matching.mean_abs_corr(), 1., epsilon = 1e-10);
            assert_abs_diff_eq!(matching.sorted_sources(), &truth, epsilon = 1e-12);
        }
    }

    #[test]
    fn sign_flips_and_noise() {
        let mut rng = Xoshiro256Plus::seed_from_u64(3);
        let truth: Array2<f64> = Array::random_using((1000, 3), Uniform::new(-1., 1.), &mut rng);
        let noise: Array2<f64> = Array::random_using((1000, 3), StandardNormal, &mut rng);

        let mut estimated = truth.select(Axis(1), &[1, 2, 0]) + noise * 0.05;
        estimated.column_mut(0).mapv_inplace(|x| -x);

        let matching = match_sources(&estimated, &truth, CorrelationMethod::Pearson).unwrap();
        assert_eq!(matching.indices(), &[2, 0, 1]);
        assert!(matching.mean_abs_corr() > 0.95 && matching.mean_abs_corr() <= 1.);
    }

    #[test]
    fn mismatching_sources() {
        let a = Array2::<f64>::zeros((10, 3));
        let b = Array2::<f64>::zeros((10, 2));
        assert!(matches!(
            match_sources(&a, &b, CorrelationMethod::Pearson),
            Err(Error::ShapeMismatch { .. })
        ));

        let b = Array2::<f64>::zeros((9, 3));
        assert!(matches!(
            match_sources(&a, &b, CorrelationMethod::Spearman),
            Err(Error::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn constant_sources_fail() {
        let a = array![[1., 2.], [1., 3.], [1., 5.]];
        assert!(matches!(
            match_sources(&a, &a, CorrelationMethod::Pearson),
            Err(Error::NonFiniteValue(_))
        ));
    }

    #[test]
    fn non_finite_sources_fail() {
        let mut rng = Xoshiro256Plus::seed_from_u64(5);
        let truth: Array2<f64> = Array::random_using((200, 3), StandardNormal, &mut rng);
        let mut estimated = truth.clone();
        estimated[(5, 0)] = f64::NAN;
        estimated[(50, 0)] = f64::NAN;

        for &method in &[CorrelationMethod::Pearson, CorrelationMethod::Spearman] {
            assert!(matches!(
                match_sources(&estimated, &truth, method),
                Err(Error::NonFiniteValue(_))
            ));
        }

        estimated[(5, 0)] = f64::INFINITY;
        estimated[(50, 0)] = 0.;
        assert!(matches!(
            match_sources(&estimated, &truth, CorrelationMethod::Spearman),
            Err(Error::NonFiniteValue(_))
        ));
    }

    #[test]
    fn swapped_labels() {
        let estimated = array![0, 0, 1, 1];
        let truth = array![1, 1, 0, 0];

        assert_eq!(match_state_indices(&estimated, &truth).unwrap(), vec![1, 0]);

        let mut relabeled = estimated.clone();
        assert_abs_diff_eq!(clustering_accuracy(&mut relabeled, &truth).unwrap(), 1.);
        assert_eq!(relabeled, truth);
    }

    #[test]
    fn accuracy_of_identical_sequences() {
        let mut rng = Xoshiro256Plus::seed_from_u64(5);
        let seq = Array1::from_shape_fn(200, |_| rng.gen_range(0..5usize));

        let mut estimated = seq.clone();
        assert_abs_diff_eq!(clustering_accuracy(&mut estimated, &seq).unwrap(), 1.);
        assert_eq!(estimated, seq);
    }

    #[test]
    fn accuracy_ignores_label_order() {
        let mut rng = Xoshiro256Plus::seed_from_u64(8);
        let truth = Array1::from_shape_fn(300, |_| rng.gen_range(0..4usize));
        // flip a fifth of the labels
        let estimated = truth.mapv(|label| {
            if rng.gen_bool(0.2) {
                rng.gen_range(0..4usize)
            } else {
                label
            }
        });

        let mut original = estimated.clone();
        let reference = clustering_accuracy(&mut original, &truth).unwrap();
        assert!(reference > 0.7 && reference < 1.);

        let relabel = [3, 0, 2, 1];
        let mut permuted = estimated.mapv(|label| relabel[label]);
        let accuracy = clustering_accuracy(&mut permuted, &truth).unwrap();

        assert_abs_diff_eq!(accuracy, reference);
        assert_eq!(permuted, original);
    }

    #[test]
    fn partial_agreement() {
        let mut estimated = array![2, 2, 0, 0, 1, 1, 1];
        let truth = array![0, 0, 1, 1, 2, 2, 0];

        assert_eq!(
            match_state_indices(&estimated, &truth).unwrap(),
            vec![1, 2, 0]
        );
        assert_eq!(clustering_accuracy(&mut estimated, &truth).unwrap(), 6. / 7.);
    }

    #[test]
    fn invalid_label_sequences() {
        assert!(matches!(
            match_state_indices(&array![0, 1, 1], &array![0, 1]),
            Err(Error::LengthMismatch {
                estimated: 3,
                truth: 2
            })
        ));

        assert!(matches!(
            match_state_indices(&Array1::<usize>::zeros(0), &Array1::<usize>::zeros(0)),
            Err(Error::NotEnoughSamples)
        ));

        // two estimated states cannot be matched to three true states
        assert!(matches!(
            match_state_indices(&array![0, 1, 1], &array![0, 1, 2]),
            Err(Error::LabelCardinalityMismatch { label: 2, nstates: 2 })
        ));

        // estimated labels have to be numbered from zero
        assert!(matches!(
            match_state_indices(&array![0, 2, 2], &array![0, 1, 1]),
            Err(Error::LabelCardinalityMismatch { label: 2, nstates: 2 })
        ));
    }
}
