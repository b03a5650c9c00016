// src/simulation/event.rs
use super::results::{CountDistribution, EventResult};
use crate::core::{Input, Interferometer, ModeOccupation, OutputMeasurement};
use std::fmt;

/// Evaluation state of an [`Event`].
#[derive(Debug, Clone, PartialEq, Default)]
pub enum EventState {
    /// Nothing has been computed yet, or the last evaluation was cancelled.
    #[default]
    Unevaluated,
    /// The result of the most recent successful evaluation.
    Evaluated(EventResult),
}

/// An experiment: photons prepared in `input`, sent through `interferometer`,
/// observed according to `measurement`.
///
/// Events are plain data. A [`Simulator`](super::Simulator) fills in the
/// state; once evaluated, a second evaluation returns the recorded result
/// unless [`reset`](Self::reset) is called first.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    input: Input,
    interferometer: Interferometer,
    measurement: OutputMeasurement,
    state: EventState,
}

impl Event {
    /// Creates an unevaluated event. Dimensions are checked at evaluation time.
    pub fn new(input: Input, interferometer: Interferometer, measurement: OutputMeasurement) -> Self {
        Self { input, interferometer, measurement, state: EventState::Unevaluated }
    }

    pub fn input(&self) -> &Input {
        &self.input
    }

    pub fn interferometer(&self) -> &Interferometer {
        &self.interferometer
    }

    pub fn measurement(&self) -> &OutputMeasurement {
        &self.measurement
    }

    pub fn state(&self) -> &EventState {
        &self.state
    }

    /// The recorded result, if evaluated.
    pub fn result(&self) -> Option<&EventResult> {
        match &self.state {
            EventState::Evaluated(result) => Some(result),
            EventState::Unevaluated => None,
        }
    }

    pub fn is_evaluated(&self) -> bool {
        matches!(self.state, EventState::Evaluated(_))
    }

    /// Recorded probability of a `FockDetection` event.
    pub fn probability(&self) -> Option<f64> {
        match self.result() {
            Some(EventResult::Probability(p)) => Some(*p),
            _ => None,
        }
    }

    /// Recorded sample of a sampling event.
    pub fn sample(&self) -> Option<&ModeOccupation> {
        match self.result() {
            Some(EventResult::Sample(sample)) => Some(sample),
            _ => None,
        }
    }

    /// Recorded distribution of a `PartitionCountsAll` event.
    pub fn distribution(&self) -> Option<&CountDistribution> {
        match self.result() {
            Some(EventResult::Distribution(distribution)) => Some(distribution),
            _ => None,
        }
    }

    /// Forgets the recorded result, so the next evaluation recomputes (and,
    /// for sampling events, redraws).
    pub fn reset(&mut self) {
        self.state = EventState::Unevaluated;
    }

    pub(crate) fn record(&mut self, result: EventResult) {
        self.state = EventState::Evaluated(result);
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Event:")?;
        writeln!(f, "  input: {}", self.input)?;
        writeln!(f, "  interferometer: {} modes{}", self.interferometer.m_real(), match self.interferometer.loss_model() {
            Some(label) => format!(" ({})", label),
            None => String::new(),
        })?;
        writeln!(f, "  measurement: {}", self.measurement)?;
        match &self.state {
            EventState::Unevaluated => writeln!(f, "  unevaluated"),
            EventState::Evaluated(result) => write!(f, "  {}", result),
        }
    }
}
