// src/simulation/results.rs
use crate::core::{BosonError, ModeOccupation, Partition};
use std::collections::HashMap;
use std::fmt;

/// The value an evaluated event carries. Which variant appears is fixed by the
/// event's measurement.
#[derive(Debug, Clone, PartialEq)]
pub enum EventResult {
    /// `FockDetection`: probability of the target pattern.
    Probability(f64),
    /// `FockSample` / `RealisticDetectorsFockSample`: one drawn output pattern.
    Sample(ModeOccupation),
    /// `PartitionCountsAll`: the full bin-count distribution.
    Distribution(CountDistribution),
}

impl fmt::Display for EventResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EventResult::Probability(p) => writeln!(f, "Probability: {:.6}", p),
            EventResult::Sample(sample) => writeln!(f, "Sample: {}", sample),
            EventResult::Distribution(distribution) => write!(f, "{}", distribution),
        }
    }
}

/// Probabilities of every photon-count tuple over the bins of a partition.
///
/// Keys are bin-count patterns: entry `l` of the key is the number of photons
/// found in bin `l`. Every tuple summing to `n` is present, zeros included.
#[derive(Debug, Clone, PartialEq)]
pub struct CountDistribution {
    /// The (completed) partition the counts refer to.
    partition: Partition,
    /// Maps bin counts to their probabilities.
    probabilities: HashMap<ModeOccupation, f64>,
}

impl CountDistribution {
    pub(crate) fn new(partition: Partition, probabilities: HashMap<ModeOccupation, f64>) -> Self {
        Self { partition, probabilities }
    }

    /// The partition whose bins index the counts. Includes the complement bin
    /// when the requested partition did not cover every mode.
    pub fn partition(&self) -> &Partition {
        &self.partition
    }

    /// Probability of the given bin counts, `None` if the tuple is not part of
    /// the distribution (wrong number of bins or wrong photon number).
    pub fn get(&self, counts: &ModeOccupation) -> Option<f64> {
        self.probabilities.get(counts).copied()
    }

    /// Shorthand for [`get`](Self::get) with a plain count slice.
    pub fn get_counts(&self, counts: &[usize]) -> Option<f64> {
        self.get(&ModeOccupation::new(counts.to_vec()))
    }

    /// Probability of finding the photons of `occupation` binned as it would be
    /// by this partition.
    ///
    /// # Errors
    /// `BosonError::DimensionMismatch` if `occupation` has the wrong number of modes.
    pub fn probability_of(&self, occupation: &ModeOccupation) -> Result<f64, BosonError> {
        let counts = self.partition.counts_of(occupation)?;
        Ok(self.get(&counts).unwrap_or(0.0))
    }

    /// Sum over all entries; 1 up to the normalisation tolerance.
    pub fn total(&self) -> f64 {
        self.probabilities.values().sum()
    }

    /// Number of count tuples.
    pub fn len(&self) -> usize {
        self.probabilities.len()
    }

    /// `true` when the distribution holds no tuples.
    pub fn is_empty(&self) -> bool {
        self.probabilities.is_empty()
    }

    /// Entries in descending count-tuple order, so tuples with more photons in
    /// the first bins come first.
    pub fn sorted(&self) -> Vec<(&ModeOccupation, f64)> {
        let mut entries: Vec<_> = self.probabilities.iter().map(|(k, &p)| (k, p)).collect();
        entries.sort_by(|a, b| b.0.cmp(a.0));
        entries
    }

    /// Read-only view of the underlying map.
    pub fn probabilities(&self) -> &HashMap<ModeOccupation, f64> {
        &self.probabilities
    }
}

impl fmt::Display for CountDistribution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Count distribution over {}:", self.partition)?;
        if self.probabilities.is_empty() {
            writeln!(f, "  (empty)")?;
        }
        for (counts, p) in self.sorted() {
            writeln!(f, "  {}: {:.6}", counts, p)?;
        }
        Ok(())
    }
}
