// src/simulation/detection.rs

//! Exact photon-count probabilities for the three distinguishability models.
//!
//! All three share the transition matrix `M[a][b] = U[out_a][in_b]` built from
//! the output and input mode lists, and the normalisation `∏ r_i! ∏ s_j!`.

use super::cancel::{CancellationToken, Completion, bail_if_cancelled};
use super::permanent::{next_permutation, permanent, submatrix};
use crate::core::constants::bosim_constants::NEGLIGIBLE_WEIGHT;
use crate::core::{BosonError, GramMatrix, ModeOccupation};
use nalgebra::DMatrix;
use num_complex::Complex;
use num_traits::One;
use tracing::trace;

fn normalisation(input: &ModeOccupation, output: &ModeOccupation) -> f64 {
    input.factorial_product() * output.factorial_product()
}

/// Indistinguishable photons: `|Perm(M)|² / (∏ r! ∏ s!)`.
pub(crate) fn bosonic_probability(u: &DMatrix<Complex<f64>>, input: &ModeOccupation, output: &ModeOccupation) -> f64 {
    let m = submatrix(u, &output.mode_list(), &input.mode_list());
    permanent(&m).norm_sqr() / normalisation(input, output)
}

/// Classical particles: `Perm(|M|²) / (∏ r! ∏ s!)`, no phase coherence.
pub(crate) fn distinguishable_probability(
    u: &DMatrix<Complex<f64>>,
    input: &ModeOccupation,
    output: &ModeOccupation,
) -> f64 {
    let m = submatrix(u, &output.mode_list(), &input.mode_list()).map(|z| z.norm_sqr());
    permanent(&m) / normalisation(input, output)
}

/// Partially distinguishable photons.
///
/// `P = Σ_ν (∏_b S[ν(b)][b]) · Perm(W_ν) / (∏ r! ∏ s!)` with
/// `W_ν[a][b] = M[a][b] · conj(M[a][ν(b)])`. This is the double sum over
/// permutations `σ, τ` folded onto `ν = τ∘σ⁻¹`; permutations whose Gram
/// weight vanishes are skipped, so the identity Gram matrix costs a single
/// permanent and the all-ones matrix reproduces `|Perm(M)|²`.
///
/// The token is polled before each of the (up to `n!`) permanents.
pub(crate) fn partdist_probability(
    u: &DMatrix<Complex<f64>>,
    input: &ModeOccupation,
    output: &ModeOccupation,
    gram: &GramMatrix,
    cancel: &CancellationToken,
) -> Result<Completion<f64>, BosonError> {
    let m = submatrix(u, &output.mode_list(), &input.mode_list());
    let n = m.nrows();
    let mut nu: Vec<usize> = (0..n).collect();
    let mut total = Complex::new(0.0, 0.0);
    let mut evaluated = 0usize;
    loop {
        bail_if_cancelled!(cancel);
        let weight = (0..n).fold(Complex::<f64>::one(), |acc, b| acc * gram.overlap(nu[b], b));
        if weight.norm() > NEGLIGIBLE_WEIGHT {
            let w = DMatrix::from_fn(n, n, |a, b| m[(a, b)] * m[(a, nu[b])].conj());
            total += weight * permanent(&w);
            evaluated += 1;
        }
        if !next_permutation(&mut nu) {
            break;
        }
    }
    trace!(n, evaluated, imaginary_residue = total.im, "weighted permanent sum");
    Ok(Completion::Done(total.re / normalisation(input, output)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Interferometer;
    use crate::core::interferometer::beam_splitter_matrix;
    use crate::core::random::rng_from_seed;

    const TEST_TOLERANCE: f64 = 1e-10;

    fn hom() -> Result<DMatrix<Complex<f64>>, BosonError> {
        beam_splitter_matrix(std::f64::consts::FRAC_1_SQRT_2)
    }

    #[test]
    fn test_hong_ou_mandel_bosonic_and_classical() -> Result<(), BosonError> {
        let u = hom()?;
        let input = ModeOccupation::new(vec![1, 1]);
        let bunched = ModeOccupation::new(vec![2, 0]);
        let split = ModeOccupation::new(vec![1, 1]);
        assert!((bosonic_probability(&u, &input, &bunched) - 0.5).abs() < TEST_TOLERANCE);
        assert!(bosonic_probability(&u, &input, &split).abs() < TEST_TOLERANCE);
        assert!((distinguishable_probability(&u, &input, &bunched) - 0.25).abs() < TEST_TOLERANCE);
        assert!((distinguishable_probability(&u, &input, &split) - 0.5).abs() < TEST_TOLERANCE);
        Ok(())
    }

    #[test]
    fn test_partdist_reduces_to_extremes() -> Result<(), BosonError> {
        let mut rng = rng_from_seed(Some(21));
        let u = Interferometer::random(4, &mut rng).u().clone();
        let input = ModeOccupation::new(vec![1, 1, 1, 0]);
        let token = CancellationToken::new();
        for output in ModeOccupation::all_with(3, 4) {
            let boson = bosonic_probability(&u, &input, &output);
            let classical = distinguishable_probability(&u, &input, &output);
            let pd_boson = partdist_probability(&u, &input, &output, &GramMatrix::bosonic(3), &token)?.done();
            let pd_classical =
                partdist_probability(&u, &input, &output, &GramMatrix::distinguishable(3), &token)?.done();
            assert!(pd_boson.is_some_and(|p| (p - boson).abs() < TEST_TOLERANCE), "{}", output);
            assert!(pd_classical.is_some_and(|p| (p - classical).abs() < TEST_TOLERANCE), "{}", output);
        }
        Ok(())
    }

    #[test]
    fn test_partdist_hom_dip_is_linear_in_overlap() -> Result<(), BosonError> {
        // P(1,1) = (1 − x²)/2 for two photons with overlap x on a balanced beam splitter
        let u = hom()?;
        let input = ModeOccupation::new(vec![1, 1]);
        let split = ModeOccupation::new(vec![1, 1]);
        let token = CancellationToken::new();
        for x in [0.0, 0.3, 0.7, 1.0] {
            let p = partdist_probability(&u, &input, &split, &GramMatrix::one_parameter(2, x)?, &token)?.done();
            assert!(p.is_some_and(|p| (p - (1.0 - x * x) / 2.0).abs() < TEST_TOLERANCE));
        }
        Ok(())
    }

    #[test]
    fn test_partdist_respects_cancellation() -> Result<(), BosonError> {
        let u = hom()?;
        let input = ModeOccupation::new(vec![1, 1]);
        let token = CancellationToken::new();
        token.cancel();
        let outcome = partdist_probability(&u, &input, &input, &GramMatrix::bosonic(2), &token)?;
        assert!(outcome.is_cancelled());
        Ok(())
    }
}
