// src/simulation/partition.rs

//! Photon-count distributions over the bins of a partition.
//!
//! With one variable `z_l` per bin, the generating function
//!
//! ```text
//! G(z) = Σ_k P(k) ∏_l z_l^{k_l} = Perm((Σ_l z_l H_l) ∘ S) / ∏ r_i!
//! ```
//!
//! where `H_l[a][b] = Σ_{j ∈ K_l} conj(U[j][in_a]) · U[j][in_b]` and `S` is the
//! Gram matrix. `G` is homogeneous of degree `n`, so the last bin variable is
//! fixed to 1 and `G` is sampled on the `(n+1)^(k-1)` grid of roots of unity.
//! An inverse discrete Fourier transform then recovers every `P(k)` at once,
//! without visiting the fine-grained output patterns.

use super::cancel::{CancellationToken, Completion, bail_if_cancelled};
use super::permanent::permanent;
use super::results::CountDistribution;
use crate::core::constants::bosim_constants::{MAX_GRID_POINTS, TAU};
use crate::core::{BosonError, Distinguishability, Input, ModeOccupation, Partition};
use nalgebra::DMatrix;
use num_complex::Complex;
use num_traits::{One, Zero};
use std::collections::HashMap;
use tracing::{trace, warn};

/// Bin-restricted overlap matrices `H_l`, one per bin, computed once.
fn bin_matrices(u: &DMatrix<Complex<f64>>, modes_in: &[usize], partition: &Partition) -> Vec<DMatrix<Complex<f64>>> {
    let n = modes_in.len();
    partition
        .subsets()
        .iter()
        .map(|bin| {
            let rows = bin.modes();
            DMatrix::from_fn(n, n, |a, b| {
                rows.iter()
                    .map(|&j| u[(j, modes_in[a])].conj() * u[(j, modes_in[b])])
                    .fold(Complex::zero(), |acc, x| acc + x)
            })
        })
        .collect()
}

/// Base-`(n+1)` digits of a grid index, least significant first.
fn digits(mut index: usize, base: usize, len: usize) -> Vec<usize> {
    let mut out = Vec::with_capacity(len);
    for _ in 0..len {
        out.push(index % base);
        index /= base;
    }
    out
}

/// Number of grid points `(n+1)^(bins-1)` the generating function is sampled on.
///
/// # Errors
/// `BosonError::InvalidOperation` when the grid exceeds `MAX_GRID_POINTS`.
pub(crate) fn grid_points(n: usize, bins: usize) -> Result<usize, BosonError> {
    let d = bins.saturating_sub(1);
    n.checked_add(1)
        .zip(u32::try_from(d).ok())
        .and_then(|(base, d)| base.checked_pow(d))
        .filter(|&points| points <= MAX_GRID_POINTS)
        .ok_or_else(|| {
            BosonError::invalid(format!(
                "{} photons over {} bins need more than {} generating-function evaluations",
                n, bins, MAX_GRID_POINTS
            ))
        })
}

/// Separable inverse DFT over a `d`-dimensional grid of side `base`, in place.
fn inverse_dft(values: &mut Vec<Complex<f64>>, base: usize, d: usize) {
    let twiddle: Vec<Complex<f64>> =
        (0..base).map(|p| Complex::from_polar(1.0, -TAU * p as f64 / base as f64)).collect();
    let scale = base as f64;
    let mut stride = 1;
    for _ in 0..d {
        let mut transformed = vec![Complex::zero(); values.len()];
        for (g, slot) in transformed.iter_mut().enumerate() {
            let k = (g / stride) % base;
            let origin = g - k * stride;
            *slot = (0..base)
                .map(|x| values[origin + x * stride] * twiddle[(k * x) % base])
                .fold(Complex::zero(), |acc, v| acc + v)
                / scale;
        }
        *values = transformed;
        stride *= base;
    }
}

/// `Perm((Σ_l z_l H_l) ∘ S)`, specialised for the two extreme Gram matrices.
fn generating_function(
    h: &[DMatrix<Complex<f64>>],
    z: &[Complex<f64>],
    input: &Input,
) -> Complex<f64> {
    let n = input.n();
    let mut combined: DMatrix<Complex<f64>> = DMatrix::zeros(n, n);
    for (h_l, z_l) in h.iter().zip(z) {
        combined += h_l * *z_l;
    }
    match input.distinguishability() {
        Distinguishability::Bosonic => permanent(&combined),
        Distinguishability::Distinguishable => combined.diagonal().iter().fold(Complex::one(), |acc, x| acc * x),
        Distinguishability::PartDist => permanent(&combined.component_mul(input.gram().matrix())),
    }
}

/// Full count distribution over the bins of `partition`.
///
/// `partition` must cover every mode of `u` (see [`Partition::completed`]).
/// Grid points are split into contiguous chunks evaluated on `workers` scoped
/// threads; each worker polls `cancel` before every permanent.
///
/// Small negative round-off (above `−tolerance`) is clamped to zero.
pub(crate) fn partition_distribution(
    u: &DMatrix<Complex<f64>>,
    input: &Input,
    partition: &Partition,
    workers: usize,
    tolerance: f64,
    cancel: &CancellationToken,
) -> Result<Completion<CountDistribution>, BosonError> {
    let n = input.n();
    let bins = partition.len();
    let modes_in = input.occupation().mode_list();
    let h = bin_matrices(u, &modes_in, partition);
    let points = grid_points(n, bins)?;
    let base = n + 1;
    let d = bins.saturating_sub(1);
    let norm = input.occupation().factorial_product();
    let roots: Vec<Complex<f64>> = (0..base).map(|p| Complex::from_polar(1.0, TAU * p as f64 / base as f64)).collect();
    trace!(n, bins, points, workers, "partition generating function grid");

    let evaluate = |g: usize| -> Complex<f64> {
        let mut z: Vec<Complex<f64>> = digits(g, base, d).into_iter().map(|x| roots[x]).collect();
        z.push(Complex::one());
        generating_function(&h, &z[..bins], input) / norm
    };

    let mut values = vec![Complex::zero(); points];
    let workers = workers.clamp(1, points.max(1));
    let chunk = points.div_ceil(workers).max(1);
    let completed = std::thread::scope(|scope| -> Result<bool, BosonError> {
        let evaluate = &evaluate;
        let handles: Vec<_> = values
            .chunks_mut(chunk)
            .enumerate()
            .map(|(c, slot)| {
                scope.spawn(move || {
                    for (offset, value) in slot.iter_mut().enumerate() {
                        if cancel.is_cancelled() {
                            return false;
                        }
                        *value = evaluate(c * chunk + offset);
                    }
                    true
                })
            })
            .collect();
        let mut completed = true;
        for handle in handles {
            completed &= handle
                .join()
                .map_err(|_| BosonError::invalid("partition worker thread panicked"))?;
        }
        Ok(completed)
    })?;
    if !completed {
        return Ok(Completion::Cancelled);
    }
    bail_if_cancelled!(cancel);

    inverse_dft(&mut values, base, d);

    let mut probabilities = HashMap::new();
    for (g, value) in values.iter().enumerate() {
        let mut counts = digits(g, base, d);
        let placed: usize = counts.iter().sum();
        if placed > n {
            continue;
        }
        if bins > 0 {
            counts.push(n - placed);
        }
        let mut p = value.re;
        if p < 0.0 {
            if p < -tolerance {
                warn!(p, counts = ?counts, "negative count probability beyond tolerance");
            }
            p = 0.0;
        }
        probabilities.insert(ModeOccupation::new(counts), p);
    }
    Ok(Completion::Done(CountDistribution::new(partition.clone(), probabilities)))
}
