// src/core/interferometer.rs

//! Linear optical interferometers and their lossy embeddings.
//!
//! A lossless interferometer is an `m×m` unitary. A lossy one is a `2m×2m`
//! unitary whose upper-left `m×m` block is the physical transmission; modes
//! `m..2m` are inaccessible environment modes that collect lost photons.

use super::error::BosonError;
use super::random::complex_normal;
use crate::core::constants::bosim_constants::{TAU, UNITARITY_TOLERANCE};
use crate::validation::{check_unitarity, min_hermitian_eigenvalue};
use nalgebra::{DMatrix, DVector, SymmetricEigen};
use num_complex::Complex;
use num_traits::{One, Zero};
use rand::rngs::StdRng;
use std::fmt;
use tracing::trace;

/// Eigenvalues below this are treated as exact zeros when taking the square
/// root of `I − A†A`; round-off there would otherwise surface as `~1e-8` entries.
const DILATION_EIGENVALUE_FLOOR: f64 = 1e-12;

/// A loss channel structure that turns an `m×m` unitary into its `2m×2m` lossy embedding.
///
/// Implementors describe loss as an attenuation `L` (a contraction) applied
/// after the unitary, so the physical transmission block is `A = L·U`. The
/// default [`embed`](Self::embed) dilates `A` into a unitary; models with
/// diagonal `L` may override it with a beam-splitter-to-environment form.
pub trait LossModel {
    /// Short label recorded on the resulting interferometer.
    fn name(&self) -> String;

    /// The attenuation `L` acting on `m` modes.
    fn attenuation(&self, m: usize) -> Result<DMatrix<Complex<f64>>, BosonError>;

    /// The `2m×2m` unitary embedding of `u`.
    fn embed(&self, u: &DMatrix<Complex<f64>>) -> Result<DMatrix<Complex<f64>>, BosonError> {
        let physical = self.attenuation(u.nrows())? * u;
        unitary_dilation(&physical, UNITARITY_TOLERANCE)
    }
}

/// Every mode transmits the same amplitude `η` (intensity `η²`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniformLoss {
    /// Transmission amplitude `η ∈ [0, 1]`.
    pub transmission_amplitude: f64,
}

impl LossModel for UniformLoss {
    fn name(&self) -> String {
        format!("UniformLoss(η = {})", self.transmission_amplitude)
    }

    fn attenuation(&self, m: usize) -> Result<DMatrix<Complex<f64>>, BosonError> {
        ModeLoss { transmission_amplitudes: vec![self.transmission_amplitude; m] }.attenuation(m)
    }

    fn embed(&self, u: &DMatrix<Complex<f64>>) -> Result<DMatrix<Complex<f64>>, BosonError> {
        ModeLoss { transmission_amplitudes: vec![self.transmission_amplitude; u.nrows()] }.embed(u)
    }
}

/// Each output mode `i` transmits its own amplitude `η_i`.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeLoss {
    /// One transmission amplitude per mode, each in `[0, 1]`.
    pub transmission_amplitudes: Vec<f64>,
}

impl LossModel for ModeLoss {
    fn name(&self) -> String {
        format!("ModeLoss(η = {:?})", self.transmission_amplitudes)
    }

    fn attenuation(&self, m: usize) -> Result<DMatrix<Complex<f64>>, BosonError> {
        if self.transmission_amplitudes.len() != m {
            return Err(BosonError::dimension(format!(
                "{} transmission amplitudes for {} modes",
                self.transmission_amplitudes.len(),
                m
            )));
        }
        if let Some(eta) = self.transmission_amplitudes.iter().find(|eta| !(0.0..=1.0).contains(*eta)) {
            return Err(BosonError::interferometer(format!("transmission amplitude {} outside [0, 1]", eta)));
        }
        let diag = DVector::from_iterator(m, self.transmission_amplitudes.iter().map(|&eta| Complex::new(eta, 0.0)));
        Ok(DMatrix::from_diagonal(&diag))
    }

    /// `[[D·U, R], [R·U, −D]]` with `R = √(I − D²)`: a beam splitter per mode
    /// coupling it to its own environment mode after `U`.
    fn embed(&self, u: &DMatrix<Complex<f64>>) -> Result<DMatrix<Complex<f64>>, BosonError> {
        let m = u.nrows();
        let d = self.attenuation(m)?;
        let r = DMatrix::from_fn(m, m, |i, j| {
            if i == j { Complex::new((1.0 - d[(i, i)].re.powi(2)).max(0.0).sqrt(), 0.0) } else { Complex::zero() }
        });
        let mut w = DMatrix::zeros(2 * m, 2 * m);
        w.view_mut((0, 0), (m, m)).copy_from(&(&d * u));
        w.view_mut((0, m), (m, m)).copy_from(&r);
        w.view_mut((m, 0), (m, m)).copy_from(&(&r * u));
        w.view_mut((m, m), (m, m)).copy_from(&(-&d));
        Ok(w)
    }
}

/// Arbitrary attenuation `L` (any contraction, e.g. lossy crosstalk), embedded by unitary dilation.
#[derive(Debug, Clone, PartialEq)]
pub struct GeneralLoss {
    /// The attenuation applied after the unitary; its operator norm must not exceed 1.
    pub attenuation: DMatrix<Complex<f64>>,
}

impl LossModel for GeneralLoss {
    fn name(&self) -> String {
        format!("GeneralLoss({}x{})", self.attenuation.nrows(), self.attenuation.ncols())
    }

    fn attenuation(&self, m: usize) -> Result<DMatrix<Complex<f64>>, BosonError> {
        if self.attenuation.nrows() != m || self.attenuation.ncols() != m {
            return Err(BosonError::dimension(format!(
                "attenuation is {}x{}, interferometer has {} modes",
                self.attenuation.nrows(),
                self.attenuation.ncols(),
                m
            )));
        }
        Ok(self.attenuation.clone())
    }
}

/// Square root of a Hermitian positive semidefinite matrix.
fn hermitian_sqrt(matrix: DMatrix<Complex<f64>>) -> DMatrix<Complex<f64>> {
    let eigen = SymmetricEigen::new(matrix);
    let roots = eigen.eigenvalues.map(|lambda| {
        let lambda = if lambda < DILATION_EIGENVALUE_FLOOR { 0.0 } else { lambda };
        Complex::new(lambda.sqrt(), 0.0)
    });
    &eigen.eigenvectors * DMatrix::from_diagonal(&roots) * eigen.eigenvectors.adjoint()
}

/// Embeds a contraction `A` into the unitary `[[A, √(I − AA†)], [√(I − A†A), −A†]]`.
///
/// # Errors
/// `BosonError::InvalidInterferometer` if `A` is not square or amplifies some input beyond `tolerance`.
pub fn unitary_dilation(a: &DMatrix<Complex<f64>>, tolerance: f64) -> Result<DMatrix<Complex<f64>>, BosonError> {
    if a.nrows() != a.ncols() {
        return Err(BosonError::interferometer(format!("physical block must be square, got {}x{}", a.nrows(), a.ncols())));
    }
    let m = a.nrows();
    let identity = DMatrix::<Complex<f64>>::identity(m, m);
    let defect_in = &identity - a.adjoint() * a;
    let headroom = min_hermitian_eigenvalue(&defect_in);
    if headroom < -tolerance {
        return Err(BosonError::interferometer(format!(
            "physical block amplifies light (smallest eigenvalue of I − A†A is {:.3e})",
            headroom
        )));
    }
    let defect_out = &identity - a * a.adjoint();
    let mut w = DMatrix::zeros(2 * m, 2 * m);
    w.view_mut((0, 0), (m, m)).copy_from(a);
    w.view_mut((0, m), (m, m)).copy_from(&hermitian_sqrt(defect_out));
    w.view_mut((m, 0), (m, m)).copy_from(&hermitian_sqrt(defect_in));
    w.view_mut((m, m), (m, m)).copy_from(&(-a.adjoint()));
    trace!(m, headroom, "dilated physical block into 2m-mode unitary");
    Ok(w)
}

/// A linear map over modes.
#[derive(Debug, Clone, PartialEq)]
pub struct Interferometer {
    /// The full unitary (`2m×2m` when lossy).
    u: DMatrix<Complex<f64>>,
    /// Physically accessible modes.
    m_real: usize,
    /// Label of the loss model, `None` when lossless.
    loss: Option<String>,
}

impl Interferometer {
    /// Wraps a unitary after checking it within `tolerance` (default 1e-8).
    ///
    /// # Errors
    /// `BosonError::InvalidInterferometer` if `u` is not square or not unitary.
    pub fn new(u: DMatrix<Complex<f64>>, tolerance: Option<f64>) -> Result<Self, BosonError> {
        check_unitarity(&u, tolerance)?;
        let m_real = u.nrows();
        Ok(Self { u, m_real, loss: None })
    }

    /// Builds a lossy interferometer from a physical contraction `a` (`m×m`).
    ///
    /// # Errors
    /// `BosonError::InvalidInterferometer` if `a` is not a contraction.
    pub fn from_physical_block(a: &DMatrix<Complex<f64>>, label: impl Into<String>) -> Result<Self, BosonError> {
        let u = unitary_dilation(a, UNITARITY_TOLERANCE)?;
        Ok(Self { u, m_real: a.nrows(), loss: Some(label.into()) })
    }

    /// Identity on `m` modes.
    pub fn identity(m: usize) -> Self {
        Self { u: DMatrix::identity(m, m), m_real: m, loss: None }
    }

    /// Two-mode beam splitter `[[t, r], [r, −t]]` with transmission amplitude `t`, `r = √(1 − t²)`.
    ///
    /// # Errors
    /// `BosonError::InvalidInterferometer` unless `0 ≤ t ≤ 1`.
    pub fn beam_splitter(transmission_amplitude: f64) -> Result<Self, BosonError> {
        Ok(Self::identity(2).with_matrix(beam_splitter_matrix(transmission_amplitude)?))
    }

    /// Balanced `m`-mode Fourier interferometer `F[j][k] = e^(2πi jk/m) / √m`.
    pub fn fourier(m: usize) -> Self {
        let norm = (m as f64).sqrt();
        let u = DMatrix::from_fn(m, m, |j, k| {
            Complex::from_polar(1.0, TAU * ((j * k) % m.max(1)) as f64 / m as f64) / norm
        });
        Self { u, m_real: m, loss: None }
    }

    /// Haar-random unitary (QR of a complex Gaussian matrix, with the phase of `R`'s diagonal removed).
    pub fn random(m: usize, rng: &mut StdRng) -> Self {
        let z = DMatrix::from_fn(m, m, |_, _| complex_normal(rng));
        let qr = z.qr();
        let (q, r) = (qr.q(), qr.r());
        let phases = DVector::from_fn(m, |i, _| {
            let d = r[(i, i)];
            if d.norm() > 0.0 { d / d.norm() } else { Complex::one() }
        });
        let u = q * DMatrix::from_diagonal(&phases);
        Self { u, m_real: m, loss: None }
    }

    fn with_matrix(mut self, u: DMatrix<Complex<f64>>) -> Self {
        self.m_real = u.nrows();
        self.u = u;
        self
    }

    /// Total number of modes (`2·m_real` when lossy).
    pub fn m(&self) -> usize {
        self.u.nrows()
    }

    /// Physically accessible modes.
    pub fn m_real(&self) -> usize {
        self.m_real
    }

    /// `true` for an embedded lossy interferometer.
    pub fn is_lossy(&self) -> bool {
        self.loss.is_some()
    }

    /// Loss model label, if lossy.
    pub fn loss_model(&self) -> Option<&str> {
        self.loss.as_deref()
    }

    /// The full unitary.
    pub fn u(&self) -> &DMatrix<Complex<f64>> {
        &self.u
    }

    /// The physical `m_real × m_real` transmission block (the whole matrix when lossless).
    pub fn u_physical(&self) -> DMatrix<Complex<f64>> {
        self.u.view((0, 0), (self.m_real, self.m_real)).into_owned()
    }

    /// The lossy embedding of this interferometer under `model`.
    ///
    /// # Errors
    /// * `BosonError::InvalidOperation` if already lossy.
    /// * Whatever the loss model reports for invalid parameters.
    pub fn to_lossy(&self, model: &dyn LossModel) -> Result<Interferometer, BosonError> {
        if self.is_lossy() {
            return Err(BosonError::invalid("interferometer already includes environment modes; to_lossy applied twice"));
        }
        let u = model.embed(&self.u)?;
        check_unitarity(&u, None)?;
        Ok(Interferometer { u, m_real: self.m_real, loss: Some(model.name()) })
    }

    /// Shorthand for [`to_lossy`](Self::to_lossy) with [`UniformLoss`].
    pub fn to_lossy_uniform(&self, transmission_amplitude: f64) -> Result<Interferometer, BosonError> {
        self.to_lossy(&UniformLoss { transmission_amplitude })
    }
}

/// `[[t, r], [r, −t]]`
pub(crate) fn beam_splitter_matrix(transmission_amplitude: f64) -> Result<DMatrix<Complex<f64>>, BosonError> {
    if !(0.0..=1.0).contains(&transmission_amplitude) {
        return Err(BosonError::interferometer(format!(
            "transmission amplitude {} outside [0, 1]",
            transmission_amplitude
        )));
    }
    let t = Complex::new(transmission_amplitude, 0.0);
    let r = Complex::new((1.0 - transmission_amplitude.powi(2)).sqrt(), 0.0);
    Ok(DMatrix::from_row_slice(2, 2, &[t, r, r, -t]))
}

impl fmt::Display for Interferometer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.loss {
            Some(label) => writeln!(f, "Interferometer[{} modes, lossy: {}]", self.m_real, label)?,
            None => writeln!(f, "Interferometer[{} modes]", self.m_real)?,
        }
        for i in 0..self.m() {
            write!(f, "  ")?;
            for j in 0..self.m() {
                write!(f, "{}{:.4}", if j > 0 { ", " } else { "" }, self.u[(i, j)])?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::random::rng_from_seed;

    #[test]
    fn test_standard_interferometers_are_unitary() -> Result<(), BosonError> {
        check_unitarity(Interferometer::fourier(5).u(), None)?;
        check_unitarity(Interferometer::beam_splitter(0.3)?.u(), None)?;
        let mut rng = rng_from_seed(Some(5));
        check_unitarity(Interferometer::random(6, &mut rng).u(), Some(1e-10))?;
        assert!(Interferometer::beam_splitter(1.5).is_err());
        Ok(())
    }

    #[test]
    fn test_uniform_loss_embedding() -> Result<(), BosonError> {
        let u = Interferometer::fourier(3);
        let lossy = u.to_lossy_uniform(0.8)?;
        assert_eq!(lossy.m(), 6);
        assert_eq!(lossy.m_real(), 3);
        assert!(lossy.is_lossy());
        check_unitarity(lossy.u(), None)?;
        let expected = u.u() * Complex::new(0.8, 0.0);
        let diff = (lossy.u_physical() - expected).norm();
        assert!(diff < 1e-12);
        assert!(!u.is_lossy(), "expansion must not touch the original");
        assert!(matches!(lossy.to_lossy_uniform(0.8), Err(BosonError::InvalidOperation { .. })));
        Ok(())
    }

    #[test]
    fn test_general_loss_dilation_is_unitary() -> Result<(), BosonError> {
        let mut rng = rng_from_seed(Some(9));
        let u = Interferometer::random(3, &mut rng);
        // lossy crosstalk: a scaled random unitary is a strict contraction
        let attenuation = Interferometer::random(3, &mut rng).u() * Complex::new(0.7, 0.0);
        let lossy = u.to_lossy(&GeneralLoss { attenuation: attenuation.clone() })?;
        check_unitarity(lossy.u(), None)?;
        let diff = (lossy.u_physical() - attenuation * u.u()).norm();
        assert!(diff < 1e-10);
        Ok(())
    }

    #[test]
    fn test_dilation_of_unitary_has_no_coupling() -> Result<(), BosonError> {
        let u = Interferometer::fourier(3);
        let w = unitary_dilation(u.u(), UNITARITY_TOLERANCE)?;
        assert!(w.view((0, 3), (3, 3)).norm() < 1e-12);
        assert!(w.view((3, 0), (3, 3)).norm() < 1e-12);
        Ok(())
    }

    #[test]
    fn test_dilation_rejects_amplifier() {
        let a = DMatrix::<Complex<f64>>::identity(2, 2) * Complex::new(1.1, 0.0);
        assert!(matches!(unitary_dilation(&a, UNITARITY_TOLERANCE), Err(BosonError::InvalidInterferometer { .. })));
    }
}
