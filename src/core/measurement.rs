// src/core/measurement.rs

use super::occupation::{ModeOccupation, Partition};
use std::fmt;

/// What is observed at the output of the interferometer.
///
/// Each variant fixes which algorithm the engine runs (see
/// [`Simulator::evaluate`](crate::simulation::Simulator::evaluate)).
#[derive(Debug, Clone, PartialEq)]
pub enum OutputMeasurement {
    /// Exact probability of detecting this photon-count pattern.
    FockDetection(ModeOccupation),

    /// One output pattern drawn from the ideal output distribution.
    FockSample,

    /// Full distribution of photon counts over the bins of a partition.
    /// Modes outside every bin are gathered into one extra, final bin.
    PartitionCountsAll(Partition),

    /// An ideal sample read out by imperfect detectors.
    RealisticDetectorsFockSample {
        /// Probability that a detector reports one extra (dark) count.
        p_dark: f64,
        /// Probability that a detector holding photons reports none.
        p_no_count: f64,
    },
}

impl OutputMeasurement {
    /// Variant name, used in logs and error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            OutputMeasurement::FockDetection(_) => "FockDetection",
            OutputMeasurement::FockSample => "FockSample",
            OutputMeasurement::PartitionCountsAll(_) => "PartitionCountsAll",
            OutputMeasurement::RealisticDetectorsFockSample { .. } => "RealisticDetectorsFockSample",
        }
    }

    /// Number of modes the measurement refers to, if it fixes one.
    pub fn m(&self) -> Option<usize> {
        match self {
            OutputMeasurement::FockDetection(target) => Some(target.m()),
            OutputMeasurement::PartitionCountsAll(partition) => Some(partition.m()),
            OutputMeasurement::FockSample | OutputMeasurement::RealisticDetectorsFockSample { .. } => None,
        }
    }
}

impl fmt::Display for OutputMeasurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputMeasurement::FockDetection(target) => write!(f, "FockDetection({})", target),
            OutputMeasurement::FockSample => write!(f, "FockSample"),
            OutputMeasurement::PartitionCountsAll(partition) => write!(f, "PartitionCountsAll({})", partition),
            OutputMeasurement::RealisticDetectorsFockSample { p_dark, p_no_count } => {
                write!(f, "RealisticDetectorsFockSample(p_dark = {}, p_no_count = {})", p_dark, p_no_count)
            }
        }
    }
}
