// tests/loss_tests.rs

use bosim::core::random::rng_from_seed;
use bosim::{
    BosonError, CircuitBuilder, GeneralLoss, Input, Interferometer, LossModel, ModeLoss, ModeOccupation,
    OutputMeasurement, Event, Partition, Simulator, Subset, UniformLoss, check_unitarity,
};
use nalgebra::DMatrix;
use num_complex::Complex;
use std::f64::consts::FRAC_1_SQRT_2;

const TEST_TOLERANCE: f64 = 1e-9;

fn occupation(state: &[usize]) -> ModeOccupation {
    ModeOccupation::new(state.to_vec())
}

#[test]
fn test_full_transmission_reproduces_lossless() -> Result<(), BosonError> {
    let simulator = Simulator::new();
    let mut rng = rng_from_seed(Some(12));
    let lossless = Interferometer::random(3, &mut rng);
    let lossy = lossless.to_lossy_uniform(1.0)?;
    assert!(lossy.is_lossy());
    assert_eq!(lossy.m(), 6);

    let photons = occupation(&[1, 1, 0]);
    let lossless_input = Input::bosonic(photons.clone());
    let lossy_input = Input::bosonic(photons.to_lossy()?);
    for output in ModeOccupation::all_with(2, 3) {
        let expected = simulator.probability(&lossless_input, &lossless, &output)?;
        let got = simulator.probability(&lossy_input, &lossy, &output.to_lossy()?)?;
        assert!((got - expected).abs() < TEST_TOLERANCE, "{}: {} vs {}", output, got, expected);
    }
    Ok(())
}

#[test]
fn test_single_photon_survives_with_intensity_transmission() -> Result<(), BosonError> {
    let simulator = Simulator::new();
    let eta: f64 = 0.8;
    let lossy = Interferometer::fourier(3).to_lossy_uniform(eta)?;
    let input = Input::bosonic(occupation(&[0, 1, 0]).to_lossy()?);
    let mut survival = 0.0;
    for output in ModeOccupation::all_with(1, 3) {
        survival += simulator.probability(&input, &lossy, &output.to_lossy()?)?;
    }
    assert!((survival - eta * eta).abs() < TEST_TOLERANCE);

    // the same number through the binned distribution: one bin for the physical modes
    let bins = Partition::from_bins(3, &[&[0, 1, 2]])?;
    let distribution = simulator.partition_distribution(&input, &lossy, &bins)?;
    assert!((distribution.get_counts(&[1, 0]).unwrap_or(0.0) - eta * eta).abs() < TEST_TOLERANCE);
    assert!((distribution.get_counts(&[0, 1]).unwrap_or(0.0) - (1.0 - eta * eta)).abs() < TEST_TOLERANCE);
    Ok(())
}

#[test]
fn test_mode_dependent_loss() -> Result<(), BosonError> {
    let simulator = Simulator::new();
    let model = ModeLoss { transmission_amplitudes: vec![1.0, 0.5] };
    let lossy = Interferometer::identity(2).to_lossy(&model)?;
    assert_eq!(lossy.loss_model(), Some(model.name().as_str()));
    let input = Input::distinguishable(occupation(&[1, 1]).to_lossy()?);
    let both = simulator.probability(&input, &lossy, &occupation(&[1, 1, 0, 0]))?;
    assert!((both - 0.25).abs() < TEST_TOLERANCE);

    let wrong_length = ModeLoss { transmission_amplitudes: vec![1.0] };
    assert!(matches!(Interferometer::identity(2).to_lossy(&wrong_length), Err(BosonError::DimensionMismatch { .. })));
    Ok(())
}

#[test]
fn test_general_loss_dilation() -> Result<(), BosonError> {
    // lossy crosstalk: not diagonal, operator norm below 1
    let attenuation = DMatrix::from_row_slice(
        2,
        2,
        &[Complex::new(0.6, 0.0), Complex::new(0.2, 0.1), Complex::new(0.0, 0.3), Complex::new(0.7, 0.0)],
    );
    let lossy = Interferometer::identity(2).to_lossy(&GeneralLoss { attenuation: attenuation.clone() })?;
    check_unitarity(lossy.u(), None)?;
    assert!((lossy.u_physical() - attenuation).norm() < TEST_TOLERANCE);

    let amplifier = GeneralLoss { attenuation: DMatrix::from_element(1, 1, Complex::new(1.2, 0.0)) };
    assert!(matches!(Interferometer::identity(1).to_lossy(&amplifier), Err(BosonError::InvalidInterferometer { .. })));
    Ok(())
}

#[test]
fn test_expansion_happens_once() -> Result<(), BosonError> {
    let subset = Subset::from_modes(3, &[0, 2])?;
    let expanded = subset.to_lossy()?;
    assert_eq!(expanded.m(), 6);
    assert_eq!(expanded.modes(), vec![0, 2]);
    assert!(matches!(expanded.to_lossy(), Err(BosonError::InvalidOperation { .. })));

    let occupation = occupation(&[1, 0]).to_lossy()?;
    assert!(matches!(occupation.to_lossy(), Err(BosonError::InvalidOperation { .. })));

    let lossy = Interferometer::fourier(2).to_lossy(&UniformLoss { transmission_amplitude: 0.9 })?;
    assert!(matches!(lossy.to_lossy_uniform(0.9), Err(BosonError::InvalidOperation { .. })));
    Ok(())
}

#[test]
fn test_lossy_circuit() -> Result<(), BosonError> {
    let simulator = Simulator::new();
    let eta: f64 = 0.7;
    let circuit = CircuitBuilder::new().beam_splitter(0, 1, FRAC_1_SQRT_2).lossy_line(0, eta).build();
    let interferometer = circuit.interferometer(2)?;
    assert!(interferometer.is_lossy());

    // one photon in mode 1: reaches mode 0 half of the time, then survives with η²
    let input = Input::bosonic(occupation(&[0, 1]).to_lossy()?);
    let p0 = simulator.probability(&input, &interferometer, &occupation(&[1, 0, 0, 0]))?;
    let p1 = simulator.probability(&input, &interferometer, &occupation(&[0, 1, 0, 0]))?;
    assert!((p0 - 0.5 * eta * eta).abs() < TEST_TOLERANCE);
    assert!((p1 - 0.5).abs() < TEST_TOLERANCE);

    // samples cover every mode and photons are conserved across physical and environment modes
    let mut event = Event::new(
        Input::bosonic(occupation(&[1, 1]).to_lossy()?),
        interferometer,
        OutputMeasurement::RealisticDetectorsFockSample { p_dark: 0.0, p_no_count: 0.0 },
    );
    simulator.evaluate(&mut event)?;
    let sample = event.sample().map(|s| (s.m(), s.n()));
    assert_eq!(sample, Some((4, 2)));
    Ok(())
}
