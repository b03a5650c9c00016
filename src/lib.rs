// src/lib.rs

//! `bosim` - A library for computing boson sampling probabilities
//!
//! Photons (indistinguishable, partially distinguishable or fully
//! distinguishable) enter a linear interferometer. The library computes exact
//! photon-count probabilities, draws output samples, and computes binned
//! count distributions over partitions of the output modes, for lossless and
//! lossy interferometers.

pub mod core;
pub mod operations;
pub mod circuits;
pub mod simulation;
pub mod validation;

// Re-export the most common types for easier top-level use
pub use core::{
    BosonError, Distinguishability, GeneralLoss, GramMatrix, GramModel, Input, Interferometer, LossModel, ModeLoss,
    ModeOccupation, OutputMeasurement, Partition, Subset, UniformLoss,
};
pub use operations::OpticalElement;
pub use circuits::{Circuit, CircuitBuilder};
pub use simulation::{
    CancellationToken, Completion, CountDistribution, Event, EventResult, EventState, Simulator, SimulatorConfig,
};
pub use validation::{check_gram_matrix, check_normalization, check_unitarity};

// Example 1: Hong-Ou-Mandel interference
// Two photons meeting on a balanced beam splitter never leave through
// different ports when they are indistinguishable.
/// ```
/// use bosim::{BosonError, Event, Input, Interferometer, ModeOccupation, OutputMeasurement, Simulator};
///
/// let splitter = Interferometer::beam_splitter(std::f64::consts::FRAC_1_SQRT_2)?;
/// let photons = ModeOccupation::new(vec![1, 1]);
/// let simulator = Simulator::new();
///
/// let mut coincidence = Event::new(
///     Input::bosonic(photons.clone()),
///     splitter.clone(),
///     OutputMeasurement::FockDetection(ModeOccupation::new(vec![1, 1])),
/// );
/// simulator.evaluate(&mut coincidence)?;
/// assert!(coincidence.probability().is_some_and(|p| p.abs() < 1e-12));
///
/// // classical particles split half of the time
/// let classical = simulator.probability(
///     &Input::distinguishable(photons),
///     &splitter,
///     &ModeOccupation::new(vec![1, 1]),
/// )?;
/// assert!((classical - 0.5).abs() < 1e-12);
/// # Ok::<(), BosonError>(())
/// ```
#[doc(hidden)]
const _: () = (); // Attaches the preceding doc comment block to a hidden item

// Example 2: Binned counts through a lossy interferometer
// The distribution over {modes 0-1} / {modes 2-3} / {lost photons}.
/// ```
/// use bosim::{BosonError, Input, Interferometer, ModeOccupation, Partition, Simulator};
///
/// let lossy = Interferometer::fourier(4).to_lossy_uniform(0.9)?;
/// let input = Input::bosonic(ModeOccupation::new(vec![1, 1, 0, 0]).to_lossy()?);
/// let bins = Partition::from_bins(4, &[&[0, 1], &[2, 3]])?;
///
/// let distribution = Simulator::new().partition_distribution(&input, &lossy, &bins)?;
/// // the environment modes form a third bin
/// assert_eq!(distribution.partition().len(), 3);
/// assert!((distribution.total() - 1.0).abs() < 1e-9);
/// // both photons survive with probability η⁴
/// let survived: f64 = [[2, 0, 0], [1, 1, 0], [0, 2, 0]]
///     .iter()
///     .filter_map(|counts| distribution.get_counts(counts))
///     .sum();
/// assert!((survived - 0.9_f64.powi(4)).abs() < 1e-9);
/// # Ok::<(), BosonError>(())
/// ```
#[doc(hidden)]
const _: () = ();
