// src/circuits/mod.rs

//! Defines structures for representing and building ordered sequences of
//! optical elements (`bosim::operations::OpticalElement`).
//!
//! A `Circuit` is composed into an [`Interferometer`] by multiplying the
//! element matrices in order. Circuits containing lossy lines produce a
//! contraction, which is embedded into a lossy interferometer by unitary
//! dilation ([`GeneralLoss`]).

use crate::core::{BosonError, GeneralLoss, Interferometer};
use crate::operations::OpticalElement;
use nalgebra::DMatrix;
use num_complex::Complex;
use std::collections::HashSet;
use std::fmt;
use tracing::trace;

/// Represents an ordered sequence of optical elements. Elements are applied
/// in insertion order: the first added acts first on the photons.
#[derive(Clone, PartialEq)]
pub struct Circuit {
    /// Every mode touched by some element.
    modes: HashSet<usize>,

    /// The ordered element sequence.
    elements: Vec<OpticalElement>,
}

impl Circuit {
    /// Creates a new, empty circuit.
    pub fn new() -> Self {
        Self { modes: HashSet::new(), elements: Vec::new() }
    }

    /// Adds a single element to the end of the circuit.
    ///
    /// # Arguments
    /// * `element` - The `OpticalElement` to append.
    pub fn add_element(&mut self, element: OpticalElement) {
        for mode in element.involved_modes() {
            self.modes.insert(mode);
        }
        self.elements.push(element);
    }

    /// Adds multiple elements from an iterator to the end of the circuit.
    pub fn add_elements<I>(&mut self, elements: I)
    where
        I: IntoIterator<Item = OpticalElement>,
    {
        for element in elements {
            self.add_element(element);
        }
    }

    /// Returns the set of modes touched by the circuit.
    pub fn modes(&self) -> &HashSet<usize> {
        &self.modes
    }

    /// Returns the ordered element sequence.
    pub fn elements(&self) -> &[OpticalElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// `true` if any element attenuates.
    pub fn is_lossy(&self) -> bool {
        self.elements.iter().any(OpticalElement::is_lossy)
    }

    /// The `m×m` transfer matrix `E_k ⋯ E_2 E_1` of the elements.
    ///
    /// # Errors
    /// Whatever an element reports for its own matrix (see [`OpticalElement::matrix`]).
    pub fn matrix(&self, m: usize) -> Result<DMatrix<Complex<f64>>, BosonError> {
        let mut total = DMatrix::identity(m, m);
        for element in &self.elements {
            total = element.matrix(m)? * total;
        }
        Ok(total)
    }

    /// Composes the circuit into an interferometer over `m` modes.
    ///
    /// A lossless circuit gives an `m×m` unitary. A circuit with lossy lines
    /// gives a lossy interferometer over `2m` modes whose physical block is
    /// the circuit's transfer matrix.
    ///
    /// # Errors
    /// * Element errors (see [`OpticalElement::matrix`]).
    /// * `BosonError::InvalidInterferometer` if the product fails the unitarity check.
    pub fn interferometer(&self, m: usize) -> Result<Interferometer, BosonError> {
        let transfer = self.matrix(m)?;
        if self.is_lossy() {
            trace!(m, elements = self.len(), "embedding lossy circuit");
            Interferometer::identity(m).to_lossy(&GeneralLoss { attenuation: transfer })
        } else {
            Interferometer::new(transfer, None)
        }
    }
}

// Implement Default for convenient creation of empty circuits.
impl Default for Circuit {
    fn default() -> Self {
        Self::new()
    }
}

//-------------------------------------------------------------------------
// Circuit Builder
//-------------------------------------------------------------------------

/// A helper struct for programmatically constructing `Circuit` instances using method chaining.
pub struct CircuitBuilder {
    circuit: Circuit,
}

impl CircuitBuilder {
    /// Creates a new, empty CircuitBuilder.
    pub fn new() -> Self {
        Self { circuit: Circuit::new() }
    }

    /// Adds a single element to the circuit being built.
    ///
    /// Returns `self` to allow for continued method chaining.
    pub fn add_element(mut self, element: OpticalElement) -> Self {
        self.circuit.add_element(element);
        self
    }

    /// Adds multiple elements from an iterator to the circuit being built.
    pub fn add_elements<I>(mut self, elements: I) -> Self
    where
        I: IntoIterator<Item = OpticalElement>,
    {
        self.circuit.add_elements(elements);
        self
    }

    pub fn beam_splitter(self, a: usize, b: usize, transmission_amplitude: f64) -> Self {
        self.add_element(OpticalElement::BeamSplitter { modes: (a, b), transmission_amplitude })
    }

    pub fn phase_shift(self, mode: usize, phase: f64) -> Self {
        self.add_element(OpticalElement::PhaseShift { mode, phase })
    }

    pub fn lossy_line(self, mode: usize, transmission_amplitude: f64) -> Self {
        self.add_element(OpticalElement::LossyLine { mode, transmission_amplitude })
    }

    /// Finalizes the construction process and returns the built `Circuit`.
    pub fn build(self) -> Circuit {
        self.circuit
    }
}

// Implement Default for convenient creation of builders.
impl Default for CircuitBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.elements.is_empty() {
            return writeln!(f, "bosim::Circuit[0 elements on 0 modes]");
        }

        let num_elements = self.elements.len();
        // Draw every mode up to the highest one touched so the wires line up with mode indices
        let num_rows = self.modes.iter().max().map_or(0, |&max| max + 1);
        let max_label_width = format!("{}", num_rows.saturating_sub(1)).len();
        let label_padding = " ".repeat(max_label_width + 2);

        const GATE_WIDTH: usize = 7;
        const WIRE: &str = "───────";
        const V_WIRE: char = '│';
        const H_WIRE: char = '─';

        // grid[row][time] holds the wire segment, v_connect[row][time] the connector below it
        let mut grid: Vec<Vec<String>> = vec![vec![WIRE.to_string(); num_elements]; num_rows];
        let mut v_connect: Vec<Vec<char>> = vec![vec![' '; num_elements]; num_rows];

        fn format_gate(symbol: &str) -> String {
            let slen = symbol.chars().count();
            if slen >= GATE_WIDTH {
                symbol.chars().take(GATE_WIDTH).collect()
            } else {
                let total_dashes = GATE_WIDTH - slen;
                let pre_dashes = total_dashes / 2;
                let post_dashes = total_dashes - pre_dashes;
                format!("{}{}{}", H_WIRE.to_string().repeat(pre_dashes), symbol, H_WIRE.to_string().repeat(post_dashes))
            }
        }

        for (t, element) in self.elements.iter().enumerate() {
            let modes = element.involved_modes();
            for &mode in &modes {
                grid[mode][t] = format_gate(element.symbol());
            }
            if let (Some(&r_min), Some(&r_max)) = (modes.iter().min(), modes.iter().max()) {
                for row in v_connect.iter_mut().take(r_max).skip(r_min) {
                    row[t] = V_WIRE;
                }
            }
        }

        writeln!(f, "bosim::Circuit[{} elements on {} modes]", num_elements, self.modes.len())?;
        for r in 0..num_rows {
            let label = format!("{}: ", r);
            write!(f, "{:<width$}", label, width = max_label_width + 2)?;
            writeln!(f, "{}", grid[r].join(""))?;

            if r < num_rows - 1 {
                write!(f, "{}", label_padding)?;
                for t in 0..num_elements {
                    let padding_needed = GATE_WIDTH.saturating_sub(1);
                    let pre_pad = padding_needed / 2;
                    let post_pad = padding_needed - pre_pad;
                    write!(f, "{}{}{}", " ".repeat(pre_pad), v_connect[r][t], " ".repeat(post_pad))?;
                }
                writeln!(f)?;
            }
        }
        Ok(())
    }
}

// Keep the Debug impl delegating to Display
impl fmt::Debug for Circuit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
