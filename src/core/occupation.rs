// src/core/occupation.rs

//! Combinatorial description of photons over modes: [`ModeOccupation`],
//! the 0/1 marker [`Subset`] and the bin structure [`Partition`].

use super::error::BosonError;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Add;

/// Photon counts per mode: entry `i` is the number of photons in mode `i`.
///
/// `m()` is the number of modes and `n()` the number of photons. Non-negativity
/// is carried by the element type. An occupation produced by [`to_lossy`](Self::to_lossy)
/// remembers that it already contains environment modes, so a second expansion
/// is reported as a caller error instead of silently doubling again.
///
/// Equality, hashing and ordering only look at the counts.
#[derive(Debug, Clone)]
pub struct ModeOccupation {
    state: Vec<usize>,
    lossy: bool,
}

impl ModeOccupation {
    /// Creates an occupation from explicit per-mode counts.
    pub fn new(state: Vec<usize>) -> Self {
        Self { state, lossy: false }
    }

    /// The vacuum over `m` modes.
    pub fn zeros(m: usize) -> Self {
        Self::new(vec![0; m])
    }

    /// Single photons in the first `n` of `m` modes, the usual boson sampling input.
    pub fn first_modes(n: usize, m: usize) -> Result<Self, BosonError> {
        if n > m {
            return Err(BosonError::dimension(format!("cannot place {} single photons in {} modes", n, m)));
        }
        let mut state = vec![0; m];
        state.iter_mut().take(n).for_each(|s| *s = 1);
        Ok(Self::new(state))
    }

    /// Number of modes.
    pub fn m(&self) -> usize {
        self.state.len()
    }

    /// Number of photons.
    pub fn n(&self) -> usize {
        self.state.iter().sum()
    }

    /// Read-only access to the per-mode counts.
    pub fn state(&self) -> &[usize] {
        &self.state
    }

    /// `true` once the occupation has been expanded with environment modes.
    pub fn is_lossy(&self) -> bool {
        self.lossy
    }

    /// `true` when no mode holds more than one photon.
    pub fn is_collision_free(&self) -> bool {
        self.state.iter().all(|&s| s <= 1)
    }

    /// Each mode index repeated once per photon it holds, in increasing order.
    ///
    /// This is the row/column selector used to build the `n×n` submatrix of `U`.
    pub fn mode_list(&self) -> Vec<usize> {
        self.state
            .iter()
            .enumerate()
            .flat_map(|(mode, &count)| std::iter::repeat_n(mode, count))
            .collect()
    }

    /// `∏ s_i!`, the bosonic normalisation of this occupation.
    pub fn factorial_product(&self) -> f64 {
        self.state.iter().map(|&s| factorial(s)).product()
    }

    /// Elementwise sum, failing when the mode counts differ.
    pub fn checked_add(&self, other: &ModeOccupation) -> Result<ModeOccupation, BosonError> {
        if self.m() != other.m() {
            return Err(BosonError::dimension(format!(
                "cannot add occupations over {} and {} modes",
                self.m(),
                other.m()
            )));
        }
        let state = self.state.iter().zip(&other.state).map(|(a, b)| a + b).collect();
        Ok(Self { state, lossy: self.lossy && other.lossy })
    }

    /// Concatenates two occupations, `self` first.
    pub fn concat(&self, other: &ModeOccupation) -> ModeOccupation {
        let mut state = self.state.clone();
        state.extend_from_slice(&other.state);
        Self::new(state)
    }

    /// Returns the `2m`-mode lossy counterpart: the same counts followed by `m`
    /// empty environment modes.
    ///
    /// # Errors
    /// `BosonError::InvalidOperation` if `self` is already a lossy expansion.
    pub fn to_lossy(&self) -> Result<ModeOccupation, BosonError> {
        if self.lossy {
            return Err(BosonError::invalid("occupation already includes environment modes; to_lossy applied twice"));
        }
        let mut expanded = self.concat(&ModeOccupation::zeros(self.m()));
        expanded.lossy = true;
        Ok(expanded)
    }

    pub(crate) fn with_lossy_flag(mut self, lossy: bool) -> Self {
        self.lossy = lossy;
        self
    }

    pub(crate) fn state_mut(&mut self) -> &mut [usize] {
        &mut self.state
    }

    /// Iterates over every occupation of `n` photons in `m` modes.
    ///
    /// Patterns start at `[n, 0, .., 0]` and end at `[0, .., 0, n]`; there are
    /// `C(n+m-1, n)` of them.
    pub fn all_with(n: usize, m: usize) -> OccupationIter {
        let first = if m == 0 {
            (n == 0).then(Vec::new)
        } else {
            let mut v = vec![0; m];
            v[0] = n;
            Some(v)
        };
        OccupationIter { next: first }
    }
}

impl PartialEq for ModeOccupation {
    fn eq(&self, other: &Self) -> bool {
        self.state == other.state
    }
}

impl Eq for ModeOccupation {}

impl Hash for ModeOccupation {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.state.hash(state);
    }
}

impl PartialOrd for ModeOccupation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ModeOccupation {
    fn cmp(&self, other: &Self) -> Ordering {
        self.state.cmp(&other.state)
    }
}

impl From<Vec<usize>> for ModeOccupation {
    fn from(state: Vec<usize>) -> Self {
        Self::new(state)
    }
}

impl Add for &ModeOccupation {
    type Output = Result<ModeOccupation, BosonError>;

    fn add(self, rhs: &ModeOccupation) -> Self::Output {
        self.checked_add(rhs)
    }
}

impl fmt::Display for ModeOccupation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "|")?;
        for (i, s) in self.state.iter().enumerate() {
            write!(f, "{}{}", if i > 0 { "," } else { "" }, s)?;
        }
        write!(f, ">")
    }
}

/// Iterator returned by [`ModeOccupation::all_with`].
#[derive(Debug, Clone)]
pub struct OccupationIter {
    next: Option<Vec<usize>>,
}

impl Iterator for OccupationIter {
    type Item = ModeOccupation;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next.take()?;
        let m = current.len();
        if m > 0 {
            // Move one photon rightwards past the last occupied non-final mode,
            // gathering everything that sat in the final mode behind it.
            let mut state = current.clone();
            let tail = state[m - 1];
            state[m - 1] = 0;
            if let Some(i) = (0..m - 1).rev().find(|&i| state[i] > 0) {
                state[i] -= 1;
                state[i + 1] = tail + 1;
                self.next = Some(state);
            }
        }
        Some(ModeOccupation::new(current))
    }
}

pub(crate) fn factorial(k: usize) -> f64 {
    (1..=k).map(|i| i as f64).product()
}

/// A 0/1 marker over modes identifying a region of interest (a bin, a loss region).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subset {
    occupation: ModeOccupation,
}

impl Subset {
    /// Wraps a 0/1 occupation.
    ///
    /// # Errors
    /// `BosonError::InvalidOperation` if any entry is larger than 1.
    pub fn new(occupation: ModeOccupation) -> Result<Self, BosonError> {
        if let Some((mode, v)) = occupation.state().iter().enumerate().find(|(_, v)| **v > 1) {
            return Err(BosonError::invalid(format!("subset entries must be 0 or 1, mode {} holds {}", mode, v)));
        }
        Ok(Self { occupation })
    }

    /// Marks the listed `modes` out of `m`.
    pub fn from_modes(m: usize, modes: &[usize]) -> Result<Self, BosonError> {
        let mut state = vec![0; m];
        for &mode in modes {
            if mode >= m {
                return Err(BosonError::dimension(format!("mode {} out of range for {} modes", mode, m)));
            }
            state[mode] = 1;
        }
        Ok(Self { occupation: ModeOccupation::new(state) })
    }

    /// Number of modes the marker is defined over.
    pub fn m(&self) -> usize {
        self.occupation.m()
    }

    /// Whether `mode` is marked.
    pub fn contains(&self, mode: usize) -> bool {
        self.occupation.state().get(mode).is_some_and(|&v| v == 1)
    }

    /// Indices of the marked modes.
    pub fn modes(&self) -> Vec<usize> {
        self.occupation.mode_list()
    }

    /// Number of marked modes.
    pub fn len(&self) -> usize {
        self.occupation.n()
    }

    /// `true` if no mode is marked.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The underlying 0/1 occupation.
    pub fn occupation(&self) -> &ModeOccupation {
        &self.occupation
    }

    /// `true` if the two subsets share no marked mode.
    pub fn is_disjoint(&self, other: &Subset) -> bool {
        self.occupation
            .state()
            .iter()
            .zip(other.occupation.state())
            .all(|(a, b)| a * b == 0)
    }

    /// The unmarked modes.
    pub fn complement(&self) -> Subset {
        let state = self.occupation.state().iter().map(|&v| 1 - v).collect();
        Subset { occupation: ModeOccupation::new(state).with_lossy_flag(self.occupation.is_lossy()) }
    }

    /// Same marking pattern over `2m` modes; environment modes are unmarked.
    ///
    /// # Errors
    /// `BosonError::InvalidOperation` if already expanded.
    pub fn to_lossy(&self) -> Result<Subset, BosonError> {
        Ok(Subset { occupation: self.occupation.to_lossy()? })
    }
}

impl fmt::Display for Subset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Subset{:?}", self.modes())
    }
}

/// Ordered, pairwise disjoint subsets used as photon-counting bins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    subsets: Vec<Subset>,
}

impl Partition {
    /// Builds a partition from disjoint subsets over the same number of modes.
    ///
    /// # Errors
    /// * `BosonError::InvalidOperation` for an empty list or overlapping subsets.
    /// * `BosonError::DimensionMismatch` when subsets disagree on the mode count.
    pub fn new(subsets: Vec<Subset>) -> Result<Self, BosonError> {
        let Some(first) = subsets.first() else {
            return Err(BosonError::invalid("a partition needs at least one subset"));
        };
        let m = first.m();
        for (i, s) in subsets.iter().enumerate() {
            if s.m() != m {
                return Err(BosonError::dimension(format!("subset {} has {} modes, expected {}", i, s.m(), m)));
            }
            if subsets[..i].iter().any(|other| !other.is_disjoint(s)) {
                return Err(BosonError::invalid(format!("subset {} overlaps an earlier subset", i)));
            }
        }
        Ok(Self { subsets })
    }

    /// Convenience: bins given as lists of mode indices out of `m`.
    pub fn from_bins(m: usize, bins: &[&[usize]]) -> Result<Self, BosonError> {
        let subsets = bins.iter().map(|b| Subset::from_modes(m, b)).collect::<Result<Vec<_>, _>>()?;
        Self::new(subsets)
    }

    /// One bin per mode.
    pub fn singletons(m: usize) -> Result<Self, BosonError> {
        let subsets = (0..m).map(|i| Subset::from_modes(m, &[i])).collect::<Result<Vec<_>, _>>()?;
        Self::new(subsets)
    }

    /// Number of modes the bins are defined over.
    pub fn m(&self) -> usize {
        self.subsets[0].m()
    }

    /// Number of bins.
    pub fn len(&self) -> usize {
        self.subsets.len()
    }

    /// Always `false`; a partition holds at least one subset.
    pub fn is_empty(&self) -> bool {
        self.subsets.is_empty()
    }

    /// The bins in order.
    pub fn subsets(&self) -> &[Subset] {
        &self.subsets
    }

    /// `true` if every mode belongs to some bin.
    pub fn covers_all_modes(&self) -> bool {
        (0..self.m()).all(|mode| self.bin_of(mode).is_some())
    }

    /// Index of the bin containing `mode`, if any.
    pub fn bin_of(&self, mode: usize) -> Option<usize> {
        self.subsets.iter().position(|s| s.contains(mode))
    }

    /// Returns the partition itself when it covers all modes, otherwise the
    /// partition with the uncovered modes appended as one extra, final bin.
    pub fn completed(&self) -> Partition {
        if self.covers_all_modes() {
            return self.clone();
        }
        let state = (0..self.m()).map(|mode| usize::from(self.bin_of(mode).is_none())).collect();
        let mut subsets = self.subsets.clone();
        subsets.push(Subset { occupation: ModeOccupation::new(state) });
        Partition { subsets }
    }

    /// Expands every bin to `2m` modes.
    pub fn to_lossy(&self) -> Result<Partition, BosonError> {
        let subsets = self.subsets.iter().map(Subset::to_lossy).collect::<Result<Vec<_>, _>>()?;
        Ok(Partition { subsets })
    }

    /// Bin counts of a fine-grained occupation.
    pub fn counts_of(&self, occupation: &ModeOccupation) -> Result<ModeOccupation, BosonError> {
        if occupation.m() != self.m() {
            return Err(BosonError::dimension(format!(
                "occupation over {} modes, partition over {}",
                occupation.m(),
                self.m()
            )));
        }
        let counts = self
            .subsets
            .iter()
            .map(|s| s.modes().iter().map(|&mode| occupation.state()[mode]).sum())
            .collect();
        Ok(ModeOccupation::new(counts))
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Partition[")?;
        for (i, s) in self.subsets.iter().enumerate() {
            write!(f, "{}{:?}", if i > 0 { ", " } else { "" }, s.modes())?;
        }
        write!(f, "]")
    }
}
