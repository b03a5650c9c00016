//! Hong-Ou-Mandel dip: two photons on a balanced beam splitter, scanned from
//! fully distinguishable to fully indistinguishable.

use bosim::{
    BosonError, CircuitBuilder, Event, GramMatrix, Input, ModeOccupation, OutputMeasurement, Simulator,
    SimulatorConfig,
};
use std::f64::consts::FRAC_1_SQRT_2;

fn run() -> Result<(), BosonError> {
    let circuit = CircuitBuilder::new().beam_splitter(0, 1, FRAC_1_SQRT_2).build();
    println!("{}", circuit);
    let splitter = circuit.interferometer(2)?;

    let simulator = Simulator::with_config(SimulatorConfig::default().with_seed(7));
    let photons = ModeOccupation::new(vec![1, 1]);
    let coincidence = ModeOccupation::new(vec![1, 1]);

    println!("overlap  P(1,1)");
    for step in 0..=10 {
        let x = step as f64 / 10.0;
        let input = Input::part_dist(photons.clone(), GramMatrix::one_parameter(2, x)?)?;
        let p = simulator.probability(&input, &splitter, &coincidence)?;
        println!("  {:.1}    {:.4}", x, p);
    }

    // A few samples from indistinguishable photons: always bunched
    let mut event = Event::new(Input::bosonic(photons), splitter, OutputMeasurement::FockSample);
    for _ in 0..5 {
        simulator.evaluate(&mut event)?;
        if let Some(sample) = event.sample() {
            println!("sample: {}", sample);
        }
        event.reset();
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Hong-Ou-Mandel demo failed: {}", e);
        std::process::exit(1);
    }
}
