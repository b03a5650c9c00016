// src/simulation/mod.rs

//! Evaluates `bosim::simulation::Event`s.
//! This module contains the `Simulator` entry point, its configuration, and the
//! internal `SimulationEngine` that validates an event, selects an algorithm
//! from the dispatch table and runs it.

mod cancel;
mod detection;
pub(crate) mod engine;
mod event;
mod partition;
mod permanent;
mod results;
mod sampling;

// Re-export the main public interface types
pub use cancel::{CancellationToken, Completion};
pub use event::{Event, EventState};
pub use permanent::{permanent, submatrix};
pub use results::{CountDistribution, EventResult};

use crate::core::constants::bosim_constants::{GRAM_TOLERANCE, NORMALIZATION_TOLERANCE, UNITARITY_TOLERANCE};
use crate::core::random::{fork, rng_from_seed};
use crate::core::{BosonError, Input, Interferometer, ModeOccupation, OutputMeasurement, Partition};
use engine::SimulationEngine;
use rand::rngs::StdRng;
use std::sync::Mutex;
use tracing::debug;

/// Tunable behaviour of a [`Simulator`].
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatorConfig {
    /// Accepted deviation of `U†U` from the identity.
    pub unitarity_tolerance: f64,
    /// Accepted deviation for Gram-matrix checks.
    pub gram_tolerance: f64,
    /// Accepted deviation of a partition distribution's total from 1.
    pub normalization_tolerance: f64,
    /// Seed for the sampling generator; `None` seeds from OS entropy through the thread RNG.
    pub seed: Option<u64>,
    /// Threads used to evaluate partition grid points.
    pub worker_threads: usize,
    /// Re-check unitarity at evaluation time.
    pub validate_interferometer: bool,
}

impl Default for SimulatorConfig {
    fn default() -> Self {
        Self {
            unitarity_tolerance: UNITARITY_TOLERANCE,
            gram_tolerance: GRAM_TOLERANCE,
            normalization_tolerance: NORMALIZATION_TOLERANCE,
            seed: None,
            worker_threads: std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
            validate_interferometer: true,
        }
    }
}

impl SimulatorConfig {
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_unitarity_tolerance(mut self, tolerance: f64) -> Self {
        self.unitarity_tolerance = tolerance;
        self
    }

    pub fn with_gram_tolerance(mut self, tolerance: f64) -> Self {
        self.gram_tolerance = tolerance;
        self
    }

    pub fn with_normalization_tolerance(mut self, tolerance: f64) -> Self {
        self.normalization_tolerance = tolerance;
        self
    }

    /// At least one thread is always used.
    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = threads.max(1);
        self
    }

    pub fn with_interferometer_validation(mut self, enabled: bool) -> Self {
        self.validate_interferometer = enabled;
        self
    }
}

/// The probability engine.
///
/// A simulator holds only its configuration and the generator used by the
/// samplers; events carry everything else. It can be shared between threads:
/// each evaluation forks its own generator under a briefly held lock and then
/// runs without synchronisation.
pub struct Simulator {
    config: SimulatorConfig,
    rng: Mutex<StdRng>,
}

impl Default for Simulator {
    fn default() -> Self {
        Self::with_config(SimulatorConfig::default())
    }
}

impl Simulator {
    /// Creates a new Simulator with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a simulator with the given configuration. A configured seed
    /// makes every sampling event reproducible.
    pub fn with_config(config: SimulatorConfig) -> Self {
        let rng = Mutex::new(rng_from_seed(config.seed));
        Self { config, rng }
    }

    pub fn config(&self) -> &SimulatorConfig {
        &self.config
    }

    /// Evaluates `event` and records the result on it.
    ///
    /// An event that is already evaluated is returned as is; call
    /// [`Event::reset`] to recompute (or redraw a sample).
    ///
    /// # Arguments
    /// * `event` - The experiment to evaluate.
    ///
    /// # Returns
    /// * `Ok(&EventResult)` the recorded result.
    /// * `Err(BosonError)` if the event fails a boundary check (dimensions,
    ///   photon numbers, unitarity, unsupported combinations). The event is
    ///   left unevaluated.
    pub fn evaluate<'e>(&self, event: &'e mut Event) -> Result<&'e EventResult, BosonError> {
        match self.evaluate_with(event, &CancellationToken::new())? {
            Completion::Done(result) => Ok(result),
            Completion::Cancelled => Err(BosonError::invalid("evaluation stopped without a cancellation request")),
        }
    }

    /// Like [`evaluate`](Self::evaluate), polling `cancel` between permanent
    /// evaluations.
    ///
    /// # Returns
    /// * `Ok(Completion::Done(&EventResult))` when the computation finished.
    /// * `Ok(Completion::Cancelled)` when `cancel` fired first; the event stays
    ///   [`EventState::Unevaluated`].
    /// * `Err(BosonError)` as for [`evaluate`](Self::evaluate).
    pub fn evaluate_with<'e>(
        &self,
        event: &'e mut Event,
        cancel: &CancellationToken,
    ) -> Result<Completion<&'e EventResult>, BosonError> {
        if !event.is_evaluated() {
            let mut rng = {
                let mut shared = self
                    .rng
                    .lock()
                    .map_err(|_| BosonError::invalid("sampling generator poisoned by a panicked evaluation"))?;
                fork(&mut shared)
            };
            let outcome = SimulationEngine::init(&self.config, &mut rng, cancel).run(event)?;
            match outcome {
                Completion::Done(result) => event.record(result),
                Completion::Cancelled => {
                    debug!(measurement = event.measurement().kind(), "evaluation cancelled");
                    return Ok(Completion::Cancelled);
                }
            }
        }
        event
            .result()
            .map(Completion::Done)
            .ok_or_else(|| BosonError::invalid("evaluated event holds no result"))
    }

    /// Probability of detecting `target`.
    pub fn probability(
        &self,
        input: &Input,
        interferometer: &Interferometer,
        target: &ModeOccupation,
    ) -> Result<f64, BosonError> {
        let mut event =
            Event::new(input.clone(), interferometer.clone(), OutputMeasurement::FockDetection(target.clone()));
        self.evaluate(&mut event)?;
        event.probability().ok_or_else(|| BosonError::invalid("detection event produced no probability"))
    }

    /// One pattern drawn from the ideal output distribution.
    pub fn sample(&self, input: &Input, interferometer: &Interferometer) -> Result<ModeOccupation, BosonError> {
        let mut event = Event::new(input.clone(), interferometer.clone(), OutputMeasurement::FockSample);
        self.evaluate(&mut event)?;
        event.sample().cloned().ok_or_else(|| BosonError::invalid("sampling event produced no sample"))
    }

    /// Full count distribution over the bins of `partition`.
    pub fn partition_distribution(
        &self,
        input: &Input,
        interferometer: &Interferometer,
        partition: &Partition,
    ) -> Result<CountDistribution, BosonError> {
        let mut event = Event::new(
            input.clone(),
            interferometer.clone(),
            OutputMeasurement::PartitionCountsAll(partition.clone()),
        );
        self.evaluate(&mut event)?;
        event.distribution().cloned().ok_or_else(|| BosonError::invalid("partition event produced no distribution"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::FRAC_1_SQRT_2;

    const TEST_TOLERANCE: f64 = 1e-10;

    fn seeded(seed: u64) -> Simulator {
        Simulator::with_config(SimulatorConfig::default().with_seed(seed).with_worker_threads(2))
    }

    #[test]
    fn test_evaluate_records_and_caches() -> Result<(), BosonError> {
        let simulator = seeded(3);
        let mut event = Event::new(
            Input::bosonic(ModeOccupation::new(vec![1, 1, 0])),
            Interferometer::fourier(3),
            OutputMeasurement::FockSample,
        );
        assert_eq!(event.state(), &EventState::Unevaluated);
        let first = simulator.evaluate(&mut event)?.clone();
        assert!(event.is_evaluated());
        // a second evaluation returns the recorded draw
        for _ in 0..5 {
            assert_eq!(simulator.evaluate(&mut event)?, &first);
        }
        event.reset();
        assert!(!event.is_evaluated());
        Ok(())
    }

    #[test]
    fn test_seeded_simulators_agree() -> Result<(), BosonError> {
        let input = Input::distinguishable(ModeOccupation::new(vec![1, 1, 1, 0]));
        let interferometer = Interferometer::fourier(4);
        let (a, b) = (seeded(11), seeded(11));
        for _ in 0..10 {
            assert_eq!(a.sample(&input, &interferometer)?, b.sample(&input, &interferometer)?);
        }
        Ok(())
    }

    #[test]
    fn test_failed_validation_leaves_event_unevaluated() -> Result<(), BosonError> {
        let simulator = Simulator::new();
        let mut event = Event::new(
            Input::bosonic(ModeOccupation::new(vec![1, 1])),
            Interferometer::beam_splitter(FRAC_1_SQRT_2)?,
            OutputMeasurement::FockDetection(ModeOccupation::new(vec![1, 0])),
        );
        let result = simulator.evaluate(&mut event);
        assert_eq!(result, Err(BosonError::PhotonNumberMismatch { input: 2, output: 1 }));
        assert!(!event.is_evaluated());
        Ok(())
    }

    #[test]
    fn test_cancelled_evaluation() -> Result<(), BosonError> {
        let simulator = Simulator::new();
        let token = CancellationToken::new();
        token.cancel();
        let mut event = Event::new(
            Input::bosonic(ModeOccupation::new(vec![1, 1, 1])),
            Interferometer::fourier(3),
            OutputMeasurement::PartitionCountsAll(Partition::singletons(3)?),
        );
        assert!(simulator.evaluate_with(&mut event, &token)?.is_cancelled());
        assert_eq!(event.state(), &EventState::Unevaluated);

        // the same event completes with a fresh token
        let distribution = simulator.evaluate_with(&mut event, &CancellationToken::new())?.done();
        assert!(distribution.is_some());
        assert!(event.distribution().is_some_and(|d| (d.total() - 1.0).abs() < TEST_TOLERANCE));
        Ok(())
    }

    #[test]
    fn test_evaluations_run_concurrently() -> Result<(), BosonError> {
        let simulator = seeded(4);
        let mut rng = rng_from_seed(Some(4));
        // twelve photons over six bins: hundreds of thousands of 12x12 permanents
        let bins: Vec<Vec<usize>> = (0..5).map(|b| (4 * b..4 * b + 4).collect()).collect();
        let bins: Vec<&[usize]> = bins.iter().map(Vec::as_slice).collect();
        let mut large = Event::new(
            Input::bosonic(ModeOccupation::first_modes(12, 24)?),
            Interferometer::random(24, &mut rng),
            OutputMeasurement::PartitionCountsAll(Partition::from_bins(24, &bins)?),
        );
        let small = Input::bosonic(ModeOccupation::new(vec![1, 0]));
        let target = ModeOccupation::new(vec![1, 0]);
        let token = CancellationToken::new();

        let (p, background) = std::thread::scope(|scope| {
            let background = scope.spawn(|| simulator.evaluate_with(&mut large, &token).map(|c| c.is_cancelled()));
            std::thread::sleep(std::time::Duration::from_millis(50));
            // completes while the large evaluation is still running
            let p = simulator.probability(&small, &Interferometer::identity(2), &target);
            token.cancel();
            (p, background.join())
        });
        assert!((p? - 1.0).abs() < TEST_TOLERANCE);
        let cancelled = background.map_err(|_| BosonError::invalid("background evaluation panicked"))??;
        assert!(cancelled);
        assert!(!large.is_evaluated());
        Ok(())
    }

    #[test]
    fn test_config_builders() {
        let config = SimulatorConfig::default()
            .with_seed(1)
            .with_unitarity_tolerance(1e-6)
            .with_gram_tolerance(1e-7)
            .with_normalization_tolerance(1e-5)
            .with_worker_threads(0)
            .with_interferometer_validation(false);
        assert_eq!(config.seed, Some(1));
        assert_eq!(config.worker_threads, 1);
        assert!(!config.validate_interferometer);
        assert_eq!(Simulator::with_config(config.clone()).config(), &config);
    }
}
