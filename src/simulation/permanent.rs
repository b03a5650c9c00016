// src/simulation/permanent.rs

//! Matrix permanents and the combinatorial helpers around them.

use nalgebra::{DMatrix, Scalar};
use num_complex::Complex;
use num_traits::Num;
use std::ops::Neg;

/// Permanent of a square matrix by Ryser's formula with Gray-code subset updates.
///
/// `perm(A) = (−1)^n Σ_{S ⊆ [n]} (−1)^{|S|} ∏_i Σ_{j ∈ S} a_ij`, visiting the
/// subsets in Gray-code order so each step adds or removes a single column:
/// `O(2^n · n)` operations, exact. The empty matrix has permanent 1.
///
/// Generic over the scalar so the same routine serves complex amplitudes and
/// the real `|U|²` matrices of classical particles.
///
/// Matrices must have fewer than `usize::BITS` rows; the engine rejects
/// larger inputs before reaching this point.
pub fn permanent<T>(matrix: &DMatrix<T>) -> T
where
    T: Scalar + Copy + Num + Neg<Output = T>,
{
    let n = matrix.nrows();
    debug_assert_eq!(n, matrix.ncols(), "permanent of a non-square matrix");
    debug_assert!(n < usize::BITS as usize, "Gray-code subsets of {} columns do not fit in usize", n);
    match n {
        0 => return T::one(),
        1 => return matrix[(0, 0)],
        2 => return matrix[(0, 0)] * matrix[(1, 1)] + matrix[(0, 1)] * matrix[(1, 0)],
        _ => {}
    }

    let mut row_sums = vec![T::zero(); n];
    let mut total = T::zero();
    let mut gray: usize = 0;
    for k in 1..(1usize << n) {
        // Column flipped between consecutive Gray codes
        let j = k.trailing_zeros() as usize;
        gray ^= 1 << j;
        if gray & (1 << j) != 0 {
            for (i, s) in row_sums.iter_mut().enumerate() {
                *s = *s + matrix[(i, j)];
            }
        } else {
            for (i, s) in row_sums.iter_mut().enumerate() {
                *s = *s - matrix[(i, j)];
            }
        }
        let product = row_sums.iter().fold(T::one(), |acc, &s| acc * s);
        if gray.count_ones() % 2 == 0 {
            total = total + product;
        } else {
            total = total - product;
        }
    }
    if n % 2 == 1 { -total } else { total }
}

/// The `rows.len() × cols.len()` matrix `M[a][b] = U[rows[a]][cols[b]]`.
///
/// With `rows` the output mode list and `cols` the input mode list (see
/// [`ModeOccupation::mode_list`](crate::core::ModeOccupation::mode_list)) this
/// is the submatrix whose permanent gives the transition amplitude.
pub fn submatrix(u: &DMatrix<Complex<f64>>, rows: &[usize], cols: &[usize]) -> DMatrix<Complex<f64>> {
    DMatrix::from_fn(rows.len(), cols.len(), |a, b| u[(rows[a], cols[b])])
}

/// Rearranges `perm` into the next permutation in lexicographic order.
///
/// Returns `false` (leaving `perm` as the last permutation) once all have been visited.
pub(crate) fn next_permutation(perm: &mut [usize]) -> bool {
    let n = perm.len();
    if n < 2 {
        return false;
    }
    let Some(i) = (0..n - 1).rev().find(|&i| perm[i] < perm[i + 1]) else {
        return false;
    };
    let Some(j) = (i + 1..n).rev().find(|&j| perm[j] > perm[i]) else {
        return false;
    };
    perm.swap(i, j);
    perm[i + 1..].reverse();
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Permanent straight from the definition, for cross-checking.
    fn naive_permanent(m: &DMatrix<Complex<f64>>) -> Complex<f64> {
        let n = m.nrows();
        let mut perm: Vec<usize> = (0..n).collect();
        let mut total = Complex::new(0.0, 0.0);
        loop {
            total += (0..n).map(|i| m[(i, perm[i])]).fold(Complex::new(1.0, 0.0), |acc, x| acc * x);
            if !next_permutation(&mut perm) {
                break;
            }
        }
        total
    }

    #[test]
    fn test_small_permanents() {
        let ones = DMatrix::from_element(3, 3, 1.0_f64);
        assert_eq!(permanent(&ones), 6.0); // 3!
        let identity = DMatrix::<f64>::identity(4, 4);
        assert_eq!(permanent(&identity), 1.0);
        let empty = DMatrix::<f64>::zeros(0, 0);
        assert_eq!(permanent(&empty), 1.0);
        let m = DMatrix::from_row_slice(3, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0]);
        assert_eq!(permanent(&m), 450.0);
    }

    #[test]
    fn test_ryser_matches_definition() {
        for n in 1..7 {
            let m = DMatrix::from_fn(n, n, |i, j| {
                Complex::new(((i * 7 + j * 3) % 5) as f64 - 2.0, ((i + 2 * j) % 3) as f64 * 0.5)
            });
            let fast = permanent(&m);
            let slow = naive_permanent(&m);
            assert!((fast - slow).norm() < 1e-9, "n = {}: {} vs {}", n, fast, slow);
        }
    }

    #[test]
    fn test_next_permutation_visits_all() {
        let mut perm = vec![0, 1, 2, 3];
        let mut count = 1;
        while next_permutation(&mut perm) {
            count += 1;
        }
        assert_eq!(count, 24);
        assert_eq!(perm, vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_submatrix_repeats_rows() {
        let u = DMatrix::from_fn(3, 3, |i, j| Complex::new((3 * i + j) as f64, 0.0));
        let s = submatrix(&u, &[2, 2], &[0, 1]);
        assert_eq!(s[(0, 0)], Complex::new(6.0, 0.0));
        assert_eq!(s[(1, 1)], Complex::new(7.0, 0.0));
    }
}
