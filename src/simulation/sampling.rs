// src/simulation/sampling.rs

//! Exact samplers for the ideal output distribution and the detector noise
//! model applied on top of them.
//!
//! Every sampler draws from the same distribution the FockDetection
//! probabilities describe; they differ only in cost.

use super::cancel::{CancellationToken, Completion, bail_if_cancelled};
use super::permanent::{permanent, submatrix};
use crate::core::random::coin;
use crate::core::{BosonError, ModeOccupation};
use nalgebra::DMatrix;
use num_complex::Complex;
use rand::distr::weighted::WeightedIndex;
use rand::distr::{Distribution, StandardUniform};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::trace;

/// Classical particles: each photon leaves its input mode `i` for output `j`
/// with probability `|U[j][i]|²`, independently of the others.
///
/// # Errors
/// `BosonError::InvalidInterferometer` if a column of `u` carries no weight.
pub(crate) fn sample_distinguishable(
    u: &DMatrix<Complex<f64>>,
    input: &ModeOccupation,
    rng: &mut StdRng,
) -> Result<ModeOccupation, BosonError> {
    let mut counts = vec![0usize; u.nrows()];
    for mode in input.mode_list() {
        let weights: Vec<f64> = u.column(mode).iter().map(|z| z.norm_sqr()).collect();
        let out = WeightedIndex::new(&weights)
            .map_err(|e| BosonError::interferometer(format!("column {} of the unitary: {}", mode, e)))?;
        counts[out.sample(rng)] += 1;
    }
    Ok(ModeOccupation::new(counts))
}

/// Clifford–Clifford chain sampling for indistinguishable photons.
///
/// The input columns of `u` are shuffled into `A` (`m×n`). Output modes
/// `r_1, r_2, …` are drawn one at a time; at step `k` the weight of mode `i` is
/// `|Perm(A[r_1..r_{k-1}, i ; 0..k])|²`, expanded along the new row as
/// `|Σ_l A[i][l] · Perm(A[r_1..r_{k-1} ; 0..k \ l])|²` so that only `k` minors
/// are computed per step, shared by all `m` candidate modes.
///
/// The token is polled once per step.
pub(crate) fn sample_bosonic(
    u: &DMatrix<Complex<f64>>,
    input: &ModeOccupation,
    rng: &mut StdRng,
    cancel: &CancellationToken,
) -> Result<Completion<ModeOccupation>, BosonError> {
    let m = u.nrows();
    let mut columns = input.mode_list();
    columns.shuffle(rng);
    let all_rows: Vec<usize> = (0..m).collect();
    let a = submatrix(u, &all_rows, &columns);
    let n = columns.len();

    let mut rows: Vec<usize> = Vec::with_capacity(n);
    for k in 1..=n {
        bail_if_cancelled!(cancel);
        let minors: Vec<Complex<f64>> = (0..k)
            .map(|l| {
                let cols: Vec<usize> = (0..k).filter(|&c| c != l).collect();
                permanent(&DMatrix::from_fn(k - 1, k - 1, |x, y| a[(rows[x], cols[y])]))
            })
            .collect();
        let weights: Vec<f64> = (0..m)
            .map(|i| {
                minors
                    .iter()
                    .enumerate()
                    .fold(Complex::new(0.0, 0.0), |acc, (l, p)| acc + a[(i, l)] * p)
                    .norm_sqr()
            })
            .collect();
        let next = WeightedIndex::new(&weights)
            .map_err(|e| BosonError::interferometer(format!("chain sampling step {}: {}", k, e)))?;
        rows.push(next.sample(rng));
    }
    trace!(n, m, ?rows, "chain sample");

    let mut counts = vec![0usize; m];
    for r in rows {
        counts[r] += 1;
    }
    Ok(Completion::Done(ModeOccupation::new(counts)))
}

/// Photons with pairwise overlap `x`.
///
/// Writing each internal state as `√x|0⟩ + √(1−x)|i⟩` with private `|i⟩`
/// makes the input an incoherent mixture in which every photon independently
/// sits in the shared state with probability `x`. The shared group is sampled
/// bosonically and the others as classical particles; their counts add.
///
/// `input` must be collision free.
pub(crate) fn sample_one_parameter(
    u: &DMatrix<Complex<f64>>,
    input: &ModeOccupation,
    x: f64,
    rng: &mut StdRng,
    cancel: &CancellationToken,
) -> Result<Completion<ModeOccupation>, BosonError> {
    let m = input.m();
    let joins = coin(x)?;
    let mut shared = vec![0usize; m];
    let mut private = vec![0usize; m];
    for mode in input.mode_list() {
        if joins.sample(rng) {
            shared[mode] += 1;
        } else {
            private[mode] += 1;
        }
    }
    let shared = ModeOccupation::new(shared);
    let private = ModeOccupation::new(private);
    trace!(indistinguishable = shared.n(), distinguishable = private.n(), "mixture component");

    let Completion::Done(coherent) = sample_bosonic(u, &shared, rng, cancel)? else {
        return Ok(Completion::Cancelled);
    };
    let classical = sample_distinguishable(u, &private, rng)?;
    Ok(Completion::Done(coherent.checked_add(&classical)?))
}

/// Inverse-CDF sampling over every output pattern of `n` photons in `m` modes.
///
/// Patterns are visited in [`ModeOccupation::all_with`] order and their
/// probabilities accumulated until the drawn uniform is exceeded; nothing is
/// stored. If round-off leaves the total just below the draw, the last
/// pattern with positive probability is returned.
pub(crate) fn sample_direct<F>(
    n: usize,
    m: usize,
    rng: &mut StdRng,
    cancel: &CancellationToken,
    mut probability: F,
) -> Result<Completion<ModeOccupation>, BosonError>
where
    F: FnMut(&ModeOccupation) -> Result<Completion<f64>, BosonError>,
{
    let target: f64 = StandardUniform.sample(rng);
    let mut cumulative = 0.0;
    let mut fallback = None;
    let mut visited = 0usize;
    for pattern in ModeOccupation::all_with(n, m) {
        bail_if_cancelled!(cancel);
        let Completion::Done(p) = probability(&pattern)? else {
            return Ok(Completion::Cancelled);
        };
        visited += 1;
        cumulative += p;
        if target < cumulative {
            trace!(visited, "direct sample");
            return Ok(Completion::Done(pattern));
        }
        if p > 0.0 {
            fallback = Some(pattern);
        }
    }
    trace!(visited, cumulative, "direct sample fell through to the last nonzero pattern");
    fallback
        .map(Completion::Done)
        .ok_or_else(|| BosonError::invalid("output distribution has no nonzero pattern"))
}

/// Reads an ideal sample through imperfect detectors on the first `m_real` modes.
///
/// A detector holding photons reports none with probability `p_no_count`;
/// afterwards any detector registers one extra (dark) count with probability
/// `p_dark`. Environment modes beyond `m_real` keep their ideal counts.
///
/// # Errors
/// `BosonError::InvalidOperation` if either probability lies outside `[0, 1]`.
pub(crate) fn apply_detector_noise(
    mut sample: ModeOccupation,
    m_real: usize,
    p_dark: f64,
    p_no_count: f64,
    rng: &mut StdRng,
) -> Result<ModeOccupation, BosonError> {
    let dark = coin(p_dark)?;
    let miss = coin(p_no_count)?;
    for count in sample.state_mut().iter_mut().take(m_real) {
        if *count > 0 && miss.sample(rng) {
            *count = 0;
        }
        if dark.sample(rng) {
            *count += 1;
        }
    }
    Ok(sample)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Interferometer;
    use crate::core::random::rng_from_seed;
    use crate::simulation::detection::bosonic_probability;
    use std::collections::HashMap;

    fn histogram<F>(draws: usize, mut draw: F) -> Result<HashMap<ModeOccupation, f64>, BosonError>
    where
        F: FnMut() -> Result<ModeOccupation, BosonError>,
    {
        let mut counts = HashMap::new();
        for _ in 0..draws {
            *counts.entry(draw()?).or_insert(0.0) += 1.0 / draws as f64;
        }
        Ok(counts)
    }

    #[test]
    fn test_chain_sampler_matches_permanents() -> Result<(), BosonError> {
        let mut rng = rng_from_seed(Some(5));
        let u = Interferometer::random(3, &mut rng).u().clone();
        let input = ModeOccupation::new(vec![1, 1, 0]);
        let token = CancellationToken::new();
        let draws = 20_000;
        let observed = histogram(draws, || {
            sample_bosonic(&u, &input, &mut rng, &token)?
                .done()
                .ok_or_else(|| BosonError::invalid("cancelled"))
        })?;
        for pattern in ModeOccupation::all_with(2, 3) {
            let expected = bosonic_probability(&u, &input, &pattern);
            let seen = observed.get(&pattern).copied().unwrap_or(0.0);
            assert!((seen - expected).abs() < 0.02, "{}: {} vs {}", pattern, seen, expected);
        }
        Ok(())
    }

    #[test]
    fn test_samples_conserve_photons() -> Result<(), BosonError> {
        let mut rng = rng_from_seed(Some(9));
        let u = Interferometer::random(5, &mut rng).u().clone();
        let input = ModeOccupation::new(vec![1, 0, 1, 1, 0]);
        let token = CancellationToken::new();
        for _ in 0..50 {
            assert_eq!(sample_distinguishable(&u, &input, &mut rng)?.n(), 3);
            let mixed = sample_one_parameter(&u, &input, 0.5, &mut rng, &token)?.done();
            assert_eq!(mixed.map(|s| s.n()), Some(3));
        }
        Ok(())
    }

    #[test]
    fn test_detector_noise_extremes() -> Result<(), BosonError> {
        let mut rng = rng_from_seed(Some(1));
        let ideal = ModeOccupation::new(vec![2, 0, 1, 1]);
        // certain miss, no dark counts: physical modes empty, environment untouched
        let missed = apply_detector_noise(ideal.clone(), 2, 0.0, 1.0, &mut rng)?;
        assert_eq!(missed.state(), &[0, 0, 1, 1]);
        // certain dark count on every physical detector
        let dark = apply_detector_noise(ideal.clone(), 2, 1.0, 0.0, &mut rng)?;
        assert_eq!(dark.state(), &[3, 1, 1, 1]);
        let ideal_again = apply_detector_noise(ideal.clone(), 4, 0.0, 0.0, &mut rng)?;
        assert_eq!(ideal_again, ideal);
        assert!(apply_detector_noise(ideal, 4, 1.2, 0.0, &mut rng).is_err());
        Ok(())
    }

    #[test]
    fn test_detector_noise_rates_are_independent_per_detector() -> Result<(), BosonError> {
        let mut rng = rng_from_seed(Some(13));
        let (p_dark, p_no_count) = (0.2, 0.3);
        let ideal = ModeOccupation::new(vec![1, 0, 1]);
        let draws = 20_000;
        let mut lit_silent = [0usize; 3];
        let mut lit_double = 0usize;
        let mut empty_dark = 0usize;
        let mut both = 0usize;
        for _ in 0..draws {
            let noisy = apply_detector_noise(ideal.clone(), 3, p_dark, p_no_count, &mut rng)?;
            let state = noisy.state();
            lit_silent[state[0].min(2)] += 1;
            if state[2] == 2 {
                lit_double += 1;
            }
            if state[1] == 1 {
                empty_dark += 1;
            }
            if state[0] == 0 && state[1] == 1 {
                both += 1;
            }
        }
        let rate = |c: usize| c as f64 / draws as f64;
        // a lit detector reads 0 on a miss without a dark count, 2 on a hit plus a dark count
        let silent = p_no_count * (1.0 - p_dark);
        let single = (1.0 - p_no_count) * (1.0 - p_dark) + p_no_count * p_dark;
        let double = (1.0 - p_no_count) * p_dark;
        assert!((rate(lit_silent[0]) - silent).abs() < 0.015);
        assert!((rate(lit_silent[1]) - single).abs() < 0.015);
        assert!((rate(lit_silent[2]) - double).abs() < 0.015);
        assert!((rate(lit_double) - double).abs() < 0.015);
        assert!((rate(empty_dark) - p_dark).abs() < 0.015);
        // joint rate across two detectors factorises
        assert!((rate(both) - silent * p_dark).abs() < 0.01);
        Ok(())
    }

    #[test]
    fn test_cancelled_chain_sampler() -> Result<(), BosonError> {
        let mut rng = rng_from_seed(Some(2));
        let u = Interferometer::fourier(3).u().clone();
        let token = CancellationToken::new();
        token.cancel();
        let outcome = sample_bosonic(&u, &ModeOccupation::new(vec![1, 1, 1]), &mut rng, &token)?;
        assert!(outcome.is_cancelled());
        Ok(())
    }
}
