//! Prints every binding the platform audio library reports.
//!
//! Run with: `cargo run --example enumerate`

use duplex_audio::Catalog;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let catalog = Catalog::probe()?;
    println!("systems: {:?}", catalog.systems());
    println!("sample rates: {:?}", catalog.sample_rates());
    println!();

    for binding in &catalog {
        println!(
            "{:10} {:6} {:40} in {:2} / out {:2}  latency {:6.1}..{:6.1} ms  rates {:?}",
            binding.system(),
            binding.type_name(),
            binding.device(),
            binding.max_input_channels(),
            binding.max_output_channels(),
            1e3 * binding.min_latency(),
            1e3 * binding.max_latency(),
            binding.sample_rates(),
        );
    }

    if let Some(input) = catalog.default_input() {
        println!("\ndefault input:  {} / {}", input.system(), input.device());
    }
    if let Some(output) = catalog.default_output() {
        println!("default output: {} / {}", output.system(), output.device());
    }
    Ok(())
}
