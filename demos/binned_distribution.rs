//! Binned photon counts for six photons in a lossy twelve-mode interferometer,
//! computed without enumerating the fine-grained output patterns.

use bosim::core::random::rng_from_seed;
use bosim::{
    BosonError, CancellationToken, Completion, Event, GramMatrix, Input, Interferometer, ModeOccupation,
    OutputMeasurement, Partition, Simulator, SimulatorConfig,
};

fn run() -> Result<(), BosonError> {
    let m = 12;
    let n = 6;
    let mut rng = rng_from_seed(Some(2025));
    let interferometer = Interferometer::random(m, &mut rng).to_lossy_uniform(0.95)?;
    let photons = ModeOccupation::first_modes(n, m)?.to_lossy()?;
    let input = Input::part_dist(photons, GramMatrix::one_parameter(n, 0.9)?)?;

    let left: Vec<usize> = (0..m / 2).collect();
    let bins = Partition::from_bins(m, &[left.as_slice()])?;
    let simulator = Simulator::with_config(SimulatorConfig::default().with_seed(1));

    let mut event = Event::new(input, interferometer, OutputMeasurement::PartitionCountsAll(bins));
    match simulator.evaluate_with(&mut event, &CancellationToken::new())? {
        Completion::Done(result) => print!("{}", result),
        Completion::Cancelled => println!("cancelled"),
    }
    if let Some(distribution) = event.distribution() {
        println!("bins: {}", distribution.partition());
        println!("total probability: {:.9}", distribution.total());
    }
    Ok(())
}

fn main() {
    if let Err(e) = run() {
        eprintln!("Binned distribution demo failed: {}", e);
        std::process::exit(1);
    }
}
