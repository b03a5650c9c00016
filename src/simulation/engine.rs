// src/simulation/engine.rs
use super::cancel::{CancellationToken, Completion};
use super::detection::{bosonic_probability, distinguishable_probability, partdist_probability};
use super::event::Event;
use super::partition::{grid_points, partition_distribution};
use super::results::{CountDistribution, EventResult};
use super::sampling::{
    apply_detector_noise, sample_bosonic, sample_direct, sample_distinguishable, sample_one_parameter,
};
use super::SimulatorConfig;
use crate::core::constants::bosim_constants::MAX_PHOTONS;
use crate::core::{
    BosonError, Distinguishability, GramModel, Input, Interferometer, ModeOccupation, OutputMeasurement, Partition,
};
use crate::validation::{check_gram_matrix, check_normalization, check_probability, check_unitarity};
use rand::rngs::StdRng;
use std::fmt;
use tracing::{debug, trace};

/// The closed dispatch table: one entry per algorithm the engine can run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Algorithm {
    /// `|Perm(M)|²`
    BosonicPermanent,
    /// `Perm(|M|²)`
    DistinguishablePermanent,
    /// Gram-weighted sum of permanents over permutations.
    WeightedPermanentSum,
    /// Independent photons, one categorical draw each.
    DistinguishableSampler,
    /// Clifford–Clifford chain sampling.
    ChainSampler,
    /// One-parameter mixture of a coherent group and classical photons.
    MixtureSampler(f64),
    /// Inverse-CDF walk over every output pattern.
    DirectSampler,
    /// Generating function on the roots-of-unity grid plus inverse DFT.
    GeneratingFunction,
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Algorithm::MixtureSampler(x) => write!(f, "MixtureSampler(x = {})", x),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Chooses the algorithm for an (input, measurement) pair.
///
/// # Errors
/// `BosonError::UnsupportedCombination` for a partially distinguishable
/// input that places photons with overlap other than 1 in the same mode; the
/// photon-count state of such an input is not described by one occupation.
pub(crate) fn select_algorithm(
    input: &Input,
    measurement: &OutputMeasurement,
    gram_tolerance: f64,
) -> Result<Algorithm, BosonError> {
    let distinguishability = input.distinguishability();
    if distinguishability == Distinguishability::PartDist {
        check_shared_modes(input, gram_tolerance)?;
    }
    let collision_free = input.occupation().is_collision_free();
    let algorithm = match (distinguishability, measurement) {
        (_, OutputMeasurement::PartitionCountsAll(_)) => Algorithm::GeneratingFunction,
        (Distinguishability::Bosonic, OutputMeasurement::FockDetection(_)) => Algorithm::BosonicPermanent,
        (Distinguishability::Distinguishable, OutputMeasurement::FockDetection(_)) => {
            Algorithm::DistinguishablePermanent
        }
        (Distinguishability::PartDist, OutputMeasurement::FockDetection(_)) => Algorithm::WeightedPermanentSum,
        (
            distinguishability,
            OutputMeasurement::FockSample | OutputMeasurement::RealisticDetectorsFockSample { .. },
        ) => match (distinguishability, input.gram().model()) {
            (Distinguishability::Distinguishable, _) | (Distinguishability::PartDist, GramModel::Distinguishable) => {
                Algorithm::DistinguishableSampler
            }
            (Distinguishability::Bosonic, _) | (Distinguishability::PartDist, GramModel::Bosonic)
                if collision_free =>
            {
                Algorithm::ChainSampler
            }
            (Distinguishability::PartDist, GramModel::OneParameter(x)) if collision_free => {
                Algorithm::MixtureSampler(x)
            }
            _ => Algorithm::DirectSampler,
        },
    };
    Ok(algorithm)
}

/// Photons sharing an input mode must be identical.
fn check_shared_modes(input: &Input, tolerance: f64) -> Result<(), BosonError> {
    let modes = input.occupation().mode_list();
    for a in 0..modes.len() {
        for b in (a + 1)..modes.len() {
            if modes[a] == modes[b] && (input.gram().overlap(a, b).re - 1.0).abs() > tolerance {
                return Err(BosonError::UnsupportedCombination {
                    message: format!(
                        "photons {} and {} share input mode {} but have overlap {}",
                        a,
                        b,
                        modes[a],
                        input.gram().overlap(a, b)
                    ),
                });
            }
        }
    }
    Ok(())
}

/// The partition actually evaluated: expanded to the environment modes of a
/// lossy interferometer when given over the physical modes, then completed.
fn effective_partition(interferometer: &Interferometer, requested: &Partition) -> Result<Partition, BosonError> {
    if interferometer.is_lossy() && requested.m() == interferometer.m_real() {
        Ok(requested.to_lossy()?.completed())
    } else {
        Ok(requested.completed())
    }
}

/// Runs one event. Borrows the simulator's configuration and a generator
/// private to this evaluation.
pub(crate) struct SimulationEngine<'a> {
    config: &'a SimulatorConfig,
    rng: &'a mut StdRng,
    cancel: &'a CancellationToken,
}

impl<'a> SimulationEngine<'a> {
    pub(crate) fn init(config: &'a SimulatorConfig, rng: &'a mut StdRng, cancel: &'a CancellationToken) -> Self {
        Self { config, rng, cancel }
    }

    /// Every boundary check, performed before any numeric work.
    ///
    /// # Errors
    /// * `InvalidInterferometer` if the matrix is not unitary within the configured tolerance.
    /// * `InvalidGramMatrix` if a partially distinguishable input's Gram matrix fails the configured tolerance.
    /// * `DimensionMismatch` if input, interferometer and measurement disagree on `m`.
    /// * `PhotonNumberMismatch` for a detection target with the wrong photon number.
    /// * `InvalidOperation` for detector probabilities outside `[0, 1]`, more
    ///   than `MAX_PHOTONS` photons, or a partition grid beyond `MAX_GRID_POINTS`.
    pub(crate) fn validate(&self, event: &Event) -> Result<(), BosonError> {
        let interferometer = event.interferometer();
        let input = event.input();
        if input.n() > MAX_PHOTONS {
            return Err(BosonError::invalid(format!(
                "{} photons exceed the supported maximum of {}",
                input.n(),
                MAX_PHOTONS
            )));
        }
        if self.config.validate_interferometer {
            check_unitarity(interferometer.u(), Some(self.config.unitarity_tolerance))?;
        }
        if input.distinguishability() == Distinguishability::PartDist {
            check_gram_matrix(input.gram().matrix(), Some(self.config.gram_tolerance))?;
        }
        if input.m() != interferometer.m() {
            return Err(BosonError::dimension(format!(
                "input has {} modes, interferometer has {}",
                input.m(),
                interferometer.m()
            )));
        }
        match event.measurement() {
            OutputMeasurement::FockDetection(target) => {
                if target.m() != interferometer.m() {
                    return Err(BosonError::dimension(format!(
                        "detection pattern has {} modes, interferometer has {}",
                        target.m(),
                        interferometer.m()
                    )));
                }
                if target.n() != input.n() {
                    return Err(BosonError::PhotonNumberMismatch { input: input.n(), output: target.n() });
                }
            }
            OutputMeasurement::PartitionCountsAll(partition) => {
                let fits = partition.m() == interferometer.m()
                    || (interferometer.is_lossy() && partition.m() == interferometer.m_real());
                if !fits {
                    return Err(BosonError::dimension(format!(
                        "partition has {} modes, interferometer has {}",
                        partition.m(),
                        interferometer.m()
                    )));
                }
                grid_points(input.n(), effective_partition(interferometer, partition)?.len())?;
            }
            OutputMeasurement::RealisticDetectorsFockSample { p_dark, p_no_count } => {
                check_probability("p_dark", *p_dark)?;
                check_probability("p_no_count", *p_no_count)?;
            }
            OutputMeasurement::FockSample => {}
        }
        Ok(())
    }

    /// Validates, dispatches and runs `event`'s computation.
    pub(crate) fn run(&mut self, event: &Event) -> Result<Completion<EventResult>, BosonError> {
        self.validate(event)?;
        let input = event.input();
        let measurement = event.measurement();
        let algorithm = select_algorithm(input, measurement, self.config.gram_tolerance)?;
        debug!(
            input = %input.distinguishability(),
            measurement = measurement.kind(),
            n = input.n(),
            m = input.m(),
            %algorithm,
            "dispatch"
        );

        let interferometer = event.interferometer();
        match measurement {
            OutputMeasurement::FockDetection(target) => {
                Ok(self.detection(algorithm, interferometer, input, target)?.map(EventResult::Probability))
            }
            OutputMeasurement::FockSample => {
                Ok(self.sample(algorithm, interferometer, input)?.map(EventResult::Sample))
            }
            OutputMeasurement::RealisticDetectorsFockSample { p_dark, p_no_count } => {
                let Completion::Done(ideal) = self.sample(algorithm, interferometer, input)? else {
                    return Ok(Completion::Cancelled);
                };
                trace!(%ideal, "ideal sample before detection");
                let noisy = apply_detector_noise(ideal, interferometer.m_real(), *p_dark, *p_no_count, self.rng)?;
                Ok(Completion::Done(EventResult::Sample(noisy)))
            }
            OutputMeasurement::PartitionCountsAll(partition) => {
                Ok(self.partition(interferometer, input, partition)?.map(EventResult::Distribution))
            }
        }
    }

    fn detection(
        &self,
        algorithm: Algorithm,
        interferometer: &Interferometer,
        input: &Input,
        target: &ModeOccupation,
    ) -> Result<Completion<f64>, BosonError> {
        let u = interferometer.u();
        let occupation = input.occupation();
        match algorithm {
            Algorithm::BosonicPermanent => Ok(Completion::Done(bosonic_probability(u, occupation, target))),
            Algorithm::DistinguishablePermanent => {
                Ok(Completion::Done(distinguishable_probability(u, occupation, target)))
            }
            Algorithm::WeightedPermanentSum => partdist_probability(u, occupation, target, input.gram(), self.cancel),
            other => Err(BosonError::invalid(format!("{} does not compute detection probabilities", other))),
        }
    }

    fn sample(
        &mut self,
        algorithm: Algorithm,
        interferometer: &Interferometer,
        input: &Input,
    ) -> Result<Completion<ModeOccupation>, BosonError> {
        let u = interferometer.u();
        let occupation = input.occupation();
        match algorithm {
            Algorithm::DistinguishableSampler => {
                Ok(Completion::Done(sample_distinguishable(u, occupation, self.rng)?))
            }
            Algorithm::ChainSampler => sample_bosonic(u, occupation, self.rng, self.cancel),
            Algorithm::MixtureSampler(x) => sample_one_parameter(u, occupation, x, self.rng, self.cancel),
            Algorithm::DirectSampler => {
                let cancel = self.cancel;
                sample_direct(input.n(), interferometer.m(), self.rng, cancel, |pattern| {
                    match input.distinguishability() {
                        Distinguishability::Bosonic => Ok(Completion::Done(bosonic_probability(u, occupation, pattern))),
                        Distinguishability::Distinguishable => {
                            Ok(Completion::Done(distinguishable_probability(u, occupation, pattern)))
                        }
                        Distinguishability::PartDist => {
                            partdist_probability(u, occupation, pattern, input.gram(), cancel)
                        }
                    }
                })
            }
            other => Err(BosonError::invalid(format!("{} does not draw samples", other))),
        }
    }

    fn partition(
        &self,
        interferometer: &Interferometer,
        input: &Input,
        requested: &Partition,
    ) -> Result<Completion<CountDistribution>, BosonError> {
        let partition = effective_partition(interferometer, requested)?;
        if partition.len() != requested.len() {
            trace!(bins = partition.len(), "partition completed with the uncovered modes");
        }
        let outcome = partition_distribution(
            interferometer.u(),
            input,
            &partition,
            self.config.worker_threads,
            self.config.normalization_tolerance,
            self.cancel,
        )?;
        if let Completion::Done(distribution) = &outcome {
            check_normalization(distribution.probabilities().values(), Some(self.config.normalization_tolerance))?;
        }
        Ok(outcome)
    }
}
